//! Operational endpoints

use axum::extract::{Extension, Query, State};
use axum::Json;
use serde::Deserialize;

use medroute_billing::InvariantChecker;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InvariantQuery {
    /// Run a single named check instead of the full battery
    pub check: Option<String>,
}

/// Run the billing invariant checks.
///
/// With `?check=<name>`, runs one check and returns its violations; with
/// no parameter, runs everything and returns the summary.
pub async fn run_invariants(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<InvariantQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require_staff()?;

    let checker = &state.billing.invariants;

    let value = match query.check {
        Some(name) => {
            if !InvariantChecker::available_checks().contains(&name.as_str()) {
                return Err(ApiError::Validation(format!(
                    "unknown invariant check '{}'",
                    name
                )));
            }
            let violations = checker.run_check(&name).await?;
            serde_json::json!({
                "check": name,
                "violations": violations,
            })
        }
        None => {
            let summary = checker.run_all_checks().await?;
            serde_json::to_value(summary).map_err(|_| ApiError::Internal)?
        }
    };

    Ok(Json(value))
}
