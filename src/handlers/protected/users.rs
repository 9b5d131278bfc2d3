use axum::extract::{Extension, Query, State};

use super::TpaQuery;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::model::DirectoryUser;

/// GET /api/users - Directory entries derived from the tenant's brokers and employers
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<TpaQuery>,
) -> ApiResult<Vec<DirectoryUser>> {
    let tpa_id = caller.resolve_tpa_id(query.requested())?;

    let tpa = state
        .repository
        .get_tpa_by_id(&tpa_id)
        .await?
        .ok_or_else(|| ApiError::not_found("TPA not found"))?;

    Ok(ApiResponse::success(tpa.directory()))
}
