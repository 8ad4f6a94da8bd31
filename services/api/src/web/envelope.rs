//! services/api/src/web/envelope.rs
//!
//! The uniform success envelope every endpoint answers with. The failure
//! half lives in `crate::error`.

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 200 with a data payload.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: None,
        data: Some(data),
    })
}

/// 201 with a data payload.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            message: None,
            data: Some(data),
        }),
    )
}

/// 200 with a human-readable message and no payload.
pub fn message(text: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: Some(text.to_string()),
        data: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_empty_fields() {
        let rendered = serde_json::to_value(&ok(42).0).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({"success": true, "data": 42})
        );

        let rendered = serde_json::to_value(&message("done").0).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({"success": true, "message": "done"})
        );
    }
}
