//! Guest-token issuance.
//!
//! Anonymous participants acquire a short-lived signed credential here
//! before connecting; the grant carries a generated `guest-` id and
//! verifies like any other bearer token while it lasts.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::info;

use crate::services::auth::now_ms;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GuestTokenResponse {
    pub token: String,
    #[serde(rename = "guestId")]
    pub guest_id: String,
}

pub async fn issue_guest_token(State(state): State<AppState>) -> Json<GuestTokenResponse> {
    let grant = state.signer.issue_guest(now_ms());
    info!(guest_id = %grant.guest_id, "guest token issued");
    Json(GuestTokenResponse { token: grant.token, guest_id: grant.guest_id })
}
