use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use schoolhub_auth_types::identity::MaybeUser;
use schoolhub_core::serde::to_rfc3339_ms;

use crate::domain::types::School;
use crate::error::WebServiceError;
use crate::handlers::upload::read_submission;
use crate::state::AppState;
use crate::usecase::school::{CreateSchoolInput, CreateSchoolUseCase, ListSchoolsUseCase};

// ── POST /api/addSchool ───────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSchoolResponse {
    pub success: bool,
    pub message: &'static str,
    pub school_id: Uuid,
}

pub async fn add_school(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    WithRejection(multipart, _): WithRejection<Multipart, WebServiceError>,
) -> Result<impl IntoResponse, WebServiceError> {
    // The staged image is removed when `submission` drops, whatever the outcome.
    let submission = read_submission(multipart, &state.settings.staging_dir).await?;

    let usecase = CreateSchoolUseCase {
        schools: state.school_repo(),
        images: state.images.clone(),
    };
    let school = usecase
        .execute(CreateSchoolInput {
            fields: submission.fields,
            image: submission.image.as_ref().map(|staged| staged.upload()),
        })
        .await?;

    let submitted_by = user.map(|u| u.id);
    tracing::info!(school_id = %school.id, ?submitted_by, "school added");
    Ok((
        StatusCode::CREATED,
        Json(AddSchoolResponse {
            success: true,
            message: "School added successfully",
            school_id: school.id,
        }),
    ))
}

// ── GET /api/getSchools ───────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SchoolView {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub email: String,
    pub image: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<School> for SchoolView {
    fn from(s: School) -> Self {
        Self {
            id: s.id,
            name: s.name,
            address: s.address,
            city: s.city,
            state: s.state,
            contact: s.contact,
            email: s.email,
            image: s.image,
            created_at: s.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct SchoolListResponse {
    pub success: bool,
    pub data: Vec<SchoolView>,
}

pub async fn get_schools(
    State(state): State<AppState>,
) -> Result<Json<SchoolListResponse>, WebServiceError> {
    let usecase = ListSchoolsUseCase {
        schools: state.school_repo(),
    };
    let schools = usecase.execute().await?;
    Ok(Json(SchoolListResponse {
        success: true,
        data: schools.into_iter().map(SchoolView::from).collect(),
    }))
}
