use axum::Json;
use serde_json::{json, Value};

/// GET /
/// Liveness check. The body text is fixed; the frontend polls for it.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "Server is running"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_server_running() {
        let Json(body) = health_handler().await;
        assert_eq!(body, json!({"status": "Server is running"}));
    }
}
