use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Select, TransactionTrait, sea_query::OnConflict,
};
use uuid::Uuid;

use schoolhub_web_schema::{otp_codes, schools, users};

use crate::domain::repository::{OtpRepository, SchoolRepository, UserRepository};
use crate::domain::types::{OtpCode, School, User};
use crate::error::WebServiceError;

// ── User repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: Arc<DatabaseConnection>,
}

impl UserRepository for DbUserRepository {
    async fn record_login(&self, email: &str, name: &str) -> Result<User, WebServiceError> {
        let now = Utc::now();
        let model = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            email: Set(email.to_owned()),
            name: Set(name.to_owned()),
            is_admin: Set(false),
            last_login: Set(Some(now)),
            created_at: Set(now),
        };
        // Existing rows only get last_login refreshed; RETURNING yields the stored row.
        let stored = users::Entity::insert(model)
            .on_conflict(
                OnConflict::column(users::Column::Email)
                    .update_column(users::Column::LastLogin)
                    .to_owned(),
            )
            .exec_with_returning(&*self.db)
            .await
            .context("upsert user on login")?;
        Ok(user_from_model(stored))
    }
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        name: model.name,
        is_admin: model.is_admin,
        last_login: model.last_login,
        created_at: model.created_at,
    }
}

// ── OTP repository ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOtpRepository {
    pub db: Arc<DatabaseConnection>,
}

impl OtpRepository for DbOtpRepository {
    async fn replace(&self, code: &OtpCode) -> Result<(), WebServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let code = code.clone();
                Box::pin(async move {
                    otp_codes::Entity::delete_many()
                        .filter(otp_codes::Column::Email.eq(code.email.as_str()))
                        .exec(txn)
                        .await?;
                    insert_otp_code(txn, &code).await
                })
            })
            .await
            .context("replace otp code")?;
        Ok(())
    }

    async fn consume(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, WebServiceError> {
        // Lookup and delete in one statement; only one concurrent caller can remove the row.
        let result = otp_codes::Entity::delete_many()
            .filter(otp_codes::Column::Email.eq(email))
            .filter(otp_codes::Column::Code.eq(code))
            .filter(otp_codes::Column::ExpiresAt.gt(now))
            .exec(&*self.db)
            .await
            .context("consume otp code")?;
        Ok(result.rows_affected > 0)
    }
}

async fn insert_otp_code(txn: &DatabaseTransaction, code: &OtpCode) -> Result<(), sea_orm::DbErr> {
    otp_codes::Entity::insert(otp_codes::ActiveModel {
        id: Set(code.id),
        email: Set(code.email.clone()),
        code: Set(code.code.clone()),
        expires_at: Set(code.expires_at),
        created_at: Set(code.created_at),
    })
    .exec_without_returning(txn)
    .await?;
    Ok(())
}

// ── School repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSchoolRepository {
    pub db: Arc<DatabaseConnection>,
}

impl SchoolRepository for DbSchoolRepository {
    async fn create(&self, school: &School) -> Result<(), WebServiceError> {
        schools::Entity::insert(schools::ActiveModel {
            id: Set(school.id),
            name: Set(school.name.clone()),
            address: Set(school.address.clone()),
            city: Set(school.city.clone()),
            state: Set(school.state.clone()),
            contact: Set(school.contact.clone()),
            email: Set(school.email.clone()),
            image: Set(school.image.clone()),
            created_at: Set(school.created_at),
        })
        .exec_without_returning(&*self.db)
        .await
        .context("insert school")?;
        Ok(())
    }

    async fn list_latest_first(&self) -> Result<Vec<School>, WebServiceError> {
        let models = latest_first()
            .all(&*self.db)
            .await
            .context("list schools")?;
        Ok(models.into_iter().map(school_from_model).collect())
    }
}

/// Newest first; the time-ordered id breaks ties between rows created in the same instant.
fn latest_first() -> Select<schools::Entity> {
    schools::Entity::find()
        .order_by_desc(schools::Column::CreatedAt)
        .order_by_desc(schools::Column::Id)
}

fn school_from_model(model: schools::Model) -> School {
    School {
        id: model.id,
        name: model.name,
        address: model.address,
        city: model.city,
        state: model.state,
        contact: model.contact,
        email: model.email,
        image: model.image,
        created_at: model.created_at,
    }
}
