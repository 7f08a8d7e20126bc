pub mod crew;
pub mod incidents;

use axum::Json;
use serde_json::{json, Value};

pub use crate::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
