use axum::extract::{Extension, Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::brokers::Deleted;
use super::TpaQuery;
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::{present, JsonBody};
use crate::middleware::{ApiResponse, ApiResult, Caller};
use crate::model::{Employer, EmployerPatch};
use crate::types::EntityKind;

/// Body of `POST /api/employers`. `brokerId` and `tpaId` locate the employer and are never stored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub broker_id: Option<String>,
    #[serde(default)]
    pub tpa_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerSaved {
    pub message: &'static str,
    pub employer_id: String,
    pub employer: Employer,
}

/// POST /api/employers - Create or update an employer under a broker
pub async fn upsert(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    JsonBody(request): JsonBody<EmployerRequest>,
) -> ApiResult<EmployerSaved> {
    let (Some(name), Some(broker_id)) = (present(request.name), present(request.broker_id)) else {
        return Err(ApiError::bad_request("Employer name and broker ID are required"));
    };

    let tpa_id = caller.resolve_tpa_id(request.tpa_id.as_deref())?;
    let employer_id = present(request.id).unwrap_or_else(|| EntityKind::Employer.generate_id());

    let employer = state
        .repository
        .update_employer(
            &tpa_id,
            &broker_id,
            EmployerPatch {
                id: employer_id.clone(),
                name: Some(name),
                extra: request.extra,
            },
        )
        .await?;

    Ok(ApiResponse::success(EmployerSaved {
        message: "Employer updated successfully",
        employer_id,
        employer,
    }))
}

/// DELETE /api/brokers/:brokerId/employers/:employerId - Remove one employer
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((broker_id, employer_id)): Path<(String, String)>,
    Query(query): Query<TpaQuery>,
) -> ApiResult<Deleted> {
    let tpa_id = caller.resolve_tpa_id(query.requested())?;

    let removed = state
        .repository
        .delete_employer(&tpa_id, &broker_id, &employer_id)
        .await?;

    Ok(ApiResponse::success(Deleted {
        message: "Employer deleted successfully",
        deleted: removed.is_some(),
    }))
}
