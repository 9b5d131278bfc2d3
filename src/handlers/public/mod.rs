// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None. The quote intake may require an API key.
// Route Prefix: none (/, /health, /quotes)
pub mod quotes;

use axum::response::Json;
use serde_json::{json, Value};

/// GET / - Service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "TPA Admin API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "TPA, broker and employer administration with quote intake",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "quotes": "/quotes (public, optional API key)",
                "tpas": "/api/tpas (admin)",
                "tpa": "/api/tpa[/:id] (protected)",
                "brokers": "/api/brokers[/:brokerId] (protected)",
                "employers": "/api/employers, /api/brokers/:brokerId/employers/:employerId (protected)",
                "users": "/api/users (protected)",
            }
        }
    }))
}

/// GET /health - Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "message": "Service is healthy",
            "timestamp": chrono::Utc::now(),
        }
    }))
}
