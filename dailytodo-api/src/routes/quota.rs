//! Daily usage endpoint
//!
//! ```text
//! GET /users/:user_id/quota
//! ```
//!
//! ```json
//! {
//!   "allowed": true,
//!   "day": "2025-05-20",
//!   "current": 1,
//!   "limit": 3,
//!   "remaining": 2
//! }
//! ```
//!
//! Advisory only: a concurrent create can use the remaining quota before the
//! caller acts on it.

use super::parse_id;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use dailytodo_shared::quota::QuotaCheckResult;

/// Usage handler
pub async fn get_usage(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<QuotaCheckResult>> {
    let user_id = parse_id(&user_id, "User")?;
    Ok(Json(state.enforcer.usage(user_id).await?))
}
