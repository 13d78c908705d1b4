use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::token::ResetToken;

use super::{extract::ResetRequest, AppState, Error, Result};

#[derive(Debug, Serialize)]
struct ResetResponse {
    message: &'static str,
}

#[instrument(skip_all)]
async fn send_reset_email(
    State(state): State<AppState>,
    req: ResetRequest,
) -> Result<Json<ResetResponse>> {
    let Some(email) = req.email else {
        warn!("No email address provided.");
        return Err(Error::EmailRequired);
    };

    let token = ResetToken::generate();
    let message = state.email.password_reset(&email, &token)?;

    state.email.send(message).await?;

    info!("Password reset email sent to: {email}");

    Ok(Json(ResetResponse {
        message: "Password reset email sent successfully.",
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/send-reset-email", post(send_reset_email))
}
