use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::{CookieJar, WithRejection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use schoolhub_auth_types::{
    cookie::{clear_session_cookie, set_session_cookie},
    identity::MaybeUser,
};

use crate::error::WebServiceError;
use crate::state::AppState;
use crate::usecase::otp::{
    Delivery, RequestCodeInput, RequestCodeUseCase, VerifyCodeInput, VerifyCodeUseCase,
};

#[derive(Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

// ── POST /api/auth/request-otp ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct RequestOtpResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

pub async fn request_otp(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RequestOtpRequest>, WebServiceError>,
) -> Result<Json<RequestOtpResponse>, WebServiceError> {
    let usecase = RequestCodeUseCase {
        codes: state.otp_repo(),
        mailer: state.mailer.clone(),
        ttl: state.settings.otp_ttl,
    };
    let issued = usecase
        .execute(RequestCodeInput { email: body.email })
        .await?;

    if let Delivery::Failed(e) = issued.delivery {
        return Err(WebServiceError::DeliveryFailed(e));
    }

    let (message, otp) = if state.settings.expose_code {
        (
            "Development mode: OTP generated. Check server console for the code.".to_owned(),
            Some(issued.code),
        )
    } else {
        (
            format!(
                "OTP sent to {}. Please check your inbox and spam folder.",
                issued.email
            ),
            None,
        )
    };

    Ok(Json(RequestOtpResponse {
        success: true,
        message,
        email: issued.email,
        otp,
    }))
}

// ── POST /api/auth/verify-otp ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: UserView,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<VerifyOtpRequest>, WebServiceError>,
) -> Result<impl IntoResponse, WebServiceError> {
    let usecase = VerifyCodeUseCase {
        codes: state.otp_repo(),
        users: state.user_repo(),
        keys: state.session.clone(),
    };
    let out = usecase
        .execute(VerifyCodeInput {
            email: body.email,
            otp: body.otp,
            name: body.name,
        })
        .await?;

    let jar = set_session_cookie(jar, out.session.token, state.settings.secure_cookies);
    let body = LoginResponse {
        success: true,
        message: "Login successful",
        user: UserView {
            id: out.user.id,
            email: out.user.email,
            name: out.user.name,
        },
    };
    Ok((StatusCode::OK, jar, Json(body)))
}

// ── GET|POST /api/auth/logout ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Sessions are stateless; logging out only tells the client to drop its cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = clear_session_cookie(jar, state.settings.secure_cookies);
    (
        jar,
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully",
        }),
    )
}

// ── GET /api/auth/me ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: Option<UserView>,
}

pub async fn me(MaybeUser(user): MaybeUser) -> Json<MeResponse> {
    let user = user.map(|u| UserView {
        id: u.id,
        email: u.email,
        name: u.name,
    });
    Json(MeResponse {
        success: user.is_some(),
        user,
    })
}
