use chrono::Utc;
use schoolhub_domain::school::SchoolFields;
use uuid::Uuid;

use crate::domain::repository::{ImageStorage, SchoolRepository};
use crate::domain::types::{ImageUpload, School};
use crate::error::WebServiceError;

// ── CreateSchool ──────────────────────────────────────────────────────────────

pub struct CreateSchoolInput<'a> {
    pub fields: SchoolFields,
    pub image: Option<ImageUpload<'a>>,
}

pub struct CreateSchoolUseCase<R, S>
where
    R: SchoolRepository,
    S: ImageStorage,
{
    pub schools: R,
    pub images: S,
}

impl<R, S> CreateSchoolUseCase<R, S>
where
    R: SchoolRepository,
    S: ImageStorage,
{
    pub async fn execute(&self, input: CreateSchoolInput<'_>) -> Result<School, WebServiceError> {
        let valid = input
            .fields
            .validate()
            .map_err(WebServiceError::InvalidFields)?;
        let image = input
            .image
            .ok_or_else(|| WebServiceError::Validation("School image is required".to_owned()))?;

        let reference = self
            .images
            .store(image)
            .await
            .map_err(WebServiceError::StorageFailed)?;

        let school = School {
            id: Uuid::now_v7(),
            name: valid.name,
            address: valid.address,
            city: valid.city,
            state: valid.state,
            contact: valid.contact,
            email: valid.email,
            image: reference,
            created_at: Utc::now(),
        };

        if let Err(err) = self.schools.create(&school).await {
            if let Err(cleanup) = self.images.remove(&school.image).await {
                tracing::warn!(
                    image = %school.image,
                    error = format!("{cleanup:#}"),
                    "failed to remove orphaned school image"
                );
            }
            return Err(err);
        }

        tracing::info!(school_id = %school.id, "school created");
        Ok(school)
    }
}

// ── ListSchools ───────────────────────────────────────────────────────────────

pub struct ListSchoolsUseCase<R: SchoolRepository> {
    pub schools: R,
}

impl<R: SchoolRepository> ListSchoolsUseCase<R> {
    pub async fn execute(&self) -> Result<Vec<School>, WebServiceError> {
        self.schools.list_latest_first().await
    }
}
