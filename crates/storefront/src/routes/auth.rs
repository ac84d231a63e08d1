//! Authentication route handlers.
//!
//! Registration and login put a [`CurrentUser`] in the session; logout
//! drops the session entirely.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::{Result, add_breadcrumb};
use crate::extract::Json;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::session::CurrentUser;
use crate::models::user::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub display_name: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn log_in(session: &Session, user: &User) -> Result<()> {
    // New identity, new session id
    session.cycle_id().await?;
    set_current_user(
        session,
        &CurrentUser {
            id: user.id,
            email: user.email.clone(),
        },
    )
    .await?;
    Ok(())
}

/// Create an account and log it in.
///
/// POST /api/auth/register
#[instrument(skip(state, session, body))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register_with_password(
            &body.email,
            &body.password,
            &body.password_confirm,
            body.display_name.as_deref(),
        )
        .await?;

    log_in(&session, &user).await?;
    info!(user_id = %user.id, "User registered");
    add_breadcrumb("auth", "Registered", None);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with email and password.
///
/// POST /api/auth/login
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await?;

    log_in(&session, &user).await?;
    info!(user_id = %user.id, "User logged in");
    add_breadcrumb("auth", "Logged in", None);

    Ok(Json(user))
}

/// Log out and drop the session, including any checkout draft.
///
/// POST /api/auth/logout
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<impl IntoResponse> {
    clear_current_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
