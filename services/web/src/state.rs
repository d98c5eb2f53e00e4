use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use axum::extract::FromRef;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use schoolhub_auth_types::token::SessionKeys;
use schoolhub_web_migration::{Migrator, MigratorTrait};

use crate::config::WebConfig;
use crate::infra::db::{DbOtpRepository, DbSchoolRepository, DbUserRepository};
use crate::infra::mailer::Mailer;
use crate::infra::storage::ImageStore;

/// Per-deployment knobs read by handlers.
#[derive(Debug, Clone)]
pub struct Settings {
    pub otp_ttl: chrono::Duration,
    /// Echo freshly issued codes in the request-otp response. Development only.
    pub expose_code: bool,
    pub secure_cookies: bool,
    pub staging_dir: PathBuf,
}

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub session: SessionKeys,
    pub mailer: Mailer,
    pub images: ImageStore,
    pub settings: Arc<Settings>,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        state.session.clone()
    }
}

impl AppState {
    /// Build every collaborator from configuration and open the pool.
    pub async fn connect(config: &WebConfig) -> anyhow::Result<Self> {
        let mailer = Mailer::from_settings(&config.mail_settings()?)?;
        let images = ImageStore::from_settings(&config.image_settings()?)?;
        let settings = Settings {
            otp_ttl: config.otp_ttl()?,
            expose_code: config.is_development(),
            secure_cookies: !config.is_development(),
            staging_dir: config.upload_staging_dir.clone(),
        };

        let mut options = ConnectOptions::new(config.database_url.clone());
        options
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(config.database_acquire_timeout_secs))
            .sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .context("connect to database")?;

        if config.run_migrations {
            Migrator::up(&db, None)
                .await
                .context("apply database migrations")?;
            tracing::info!("database migrations applied");
        }

        Ok(Self::new(
            db,
            SessionKeys::new(&config.jwt_secret),
            mailer,
            images,
            settings,
        ))
    }

    pub fn new(
        db: DatabaseConnection,
        session: SessionKeys,
        mailer: Mailer,
        images: ImageStore,
        settings: Settings,
    ) -> Self {
        Self {
            db: Arc::new(db),
            session,
            mailer,
            images,
            settings: Arc::new(settings),
        }
    }

    /// Close the connection pool. Call after the server has drained.
    pub async fn close(self) -> anyhow::Result<()> {
        match Arc::try_unwrap(self.db) {
            Ok(db) => db.close().await.context("close database pool"),
            Err(_) => {
                tracing::warn!("database pool still shared at shutdown; leaving it to drop");
                Ok(())
            }
        }
    }

    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: Arc::clone(&self.db),
        }
    }

    pub fn otp_repo(&self) -> DbOtpRepository {
        DbOtpRepository {
            db: Arc::clone(&self.db),
        }
    }

    pub fn school_repo(&self) -> DbSchoolRepository {
        DbSchoolRepository {
            db: Arc::clone(&self.db),
        }
    }
}
