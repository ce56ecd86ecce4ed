use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Wrapper for API responses that adds the success envelope:
/// `{"success": true, "count"?, "data"?, "message"?}`
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub message: Option<String>,
    pub count: Option<usize>,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            message: None,
            count: None,
            status_code: StatusCode::OK,
        }
    }

    /// 201 Created with data and a confirmation message
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            message: Some(message.into()),
            count: None,
            status_code: StatusCode::CREATED,
        }
    }

    /// 200 OK with data and a confirmation message
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            message: Some(message.into()),
            count: None,
            status_code: StatusCode::OK,
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// 200 OK listing response; `count` mirrors the number of items
    pub fn list(items: Vec<T>) -> Self {
        Self {
            count: Some(items.len()),
            data: Some(items),
            message: None,
            status_code: StatusCode::OK,
        }
    }
}

impl ApiResponse<()> {
    /// 200 OK confirmation with no data payload
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            count: None,
            status_code: StatusCode::OK,
        }
    }
}

/// Assemble the envelope body; `data` is omitted when absent or null
fn envelope(data: Option<Value>, count: Option<usize>, message: Option<&str>) -> Value {
    let mut body = json!({ "success": true });
    if let Some(count) = count {
        body["count"] = json!(count);
    }
    match data {
        Some(Value::Null) | None => {}
        Some(value) => body["data"] = value,
    }
    if let Some(message) = message {
        body["message"] = json!(message);
    }
    body
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data_value = match self.data.as_ref().map(serde_json::to_value).transpose() {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Failed to serialize response data" })),
                )
                    .into_response();
            }
        };

        let body = envelope(data_value, self.count, self.message.as_deref());
        (self.status_code, Json(body)).into_response()
    }
}

// Convenience type alias used by all handlers
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
