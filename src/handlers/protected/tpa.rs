use axum::extract::{Extension, Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::TpaQuery;
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::{present, JsonBody};
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::model::{Broker, Tpa, TpaPatch};
use crate::types::EntityKind;

#[derive(Debug, Deserialize)]
pub struct TpaRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brokers: Option<Vec<Broker>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TpaSaved {
    pub message: &'static str,
    pub tpa_id: String,
    pub tpa: Tpa,
}

/// GET /api/tpas - List every tenant (admin only)
pub async fn list(State(state): State<AppState>, Extension(caller): Extension<Caller>) -> ApiResult<Vec<Tpa>> {
    caller.require_admin()?;

    let config = state.repository.get_config().await?;
    Ok(ApiResponse::success(config.tpas))
}

/// POST /api/tpas - Create or update a tenant (admin only)
pub async fn upsert(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(request): JsonBody<TpaRequest>,
) -> ApiResult<TpaSaved> {
    caller.require_admin()?;

    let name = present(request.name).ok_or_else(|| ApiError::bad_request("TPA name is required"))?;

    let tpa_id = present(request.id).unwrap_or_else(|| EntityKind::Tpa.generate_id());
    let tpa = state
        .repository
        .update_tpa(TpaPatch {
            id: tpa_id.clone(),
            name: Some(name),
            brokers: request.brokers,
            extra: request.extra,
        })
        .await?;

    Ok(ApiResponse::success(TpaSaved {
        message: "TPA updated successfully",
        tpa_id,
        tpa,
    }))
}

async fn show_tpa(state: &AppState, caller: &Caller, requested: Option<&str>) -> ApiResult<Tpa> {
    let tpa_id = caller.resolve_tpa_id(requested)?;

    match state.repository.get_tpa_by_id(&tpa_id).await? {
        Some(tpa) => Ok(ApiResponse::success(tpa)),
        None => Err(ApiError::not_found("TPA not found")),
    }
}

/// GET /api/tpa - The caller's tenant (admins may pick one with ?tpaId= or ?id=)
pub async fn show(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<TpaQuery>,
) -> ApiResult<Tpa> {
    show_tpa(&state, &caller, query.requested()).await
}

/// GET /api/tpa/:id - A specific tenant (the id is honoured for admins only)
pub async fn show_by_id(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(tpa_id): Path<String>,
) -> ApiResult<Tpa> {
    show_tpa(&state, &caller, Some(&tpa_id)).await
}
