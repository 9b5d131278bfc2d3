use axum::extract::{Extension, Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::TpaQuery;
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::{present, JsonBody};
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::model::{Broker, BrokerPatch, Employer};
use crate::types::EntityKind;

/// Body of `POST /api/brokers`. `tpaId` only routes the request and is never stored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tpa_id: Option<String>,
    #[serde(default)]
    pub employers: Option<Vec<Employer>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerSaved {
    pub message: &'static str,
    pub broker_id: String,
    pub broker: Broker,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub message: &'static str,
    pub deleted: bool,
}

/// POST /api/brokers - Create or update a broker in the caller's tenant
pub async fn upsert(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(request): JsonBody<BrokerRequest>,
) -> ApiResult<BrokerSaved> {
    let name = present(request.name).ok_or_else(|| ApiError::bad_request("Broker name is required"))?;

    let tpa_id = caller.resolve_tpa_id(request.tpa_id.as_deref())?;
    let broker_id = present(request.id).unwrap_or_else(|| EntityKind::Broker.generate_id());

    let broker = state
        .repository
        .update_broker(
            &tpa_id,
            BrokerPatch {
                id: broker_id.clone(),
                name: Some(name),
                employers: request.employers,
                extra: request.extra,
            },
        )
        .await?;

    Ok(ApiResponse::success(BrokerSaved {
        message: "Broker updated successfully",
        broker_id,
        broker,
    }))
}

/// DELETE /api/brokers/:brokerId - Remove a broker and all of its employers
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(broker_id): Path<String>,
    Query(query): Query<TpaQuery>,
) -> ApiResult<Deleted> {
    let tpa_id = caller.resolve_tpa_id(query.requested())?;

    let removed = state.repository.delete_broker(&tpa_id, &broker_id).await?;

    Ok(ApiResponse::success(Deleted {
        message: "Broker deleted successfully",
        deleted: removed.is_some(),
    }))
}
