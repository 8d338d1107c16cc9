//! Standard JSON envelope: `{"success": .., "message": .., ...extra}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    status: StatusCode,
}

impl Envelope {
    #[must_use]
    pub fn new(message: &str, status: StatusCode, success: bool) -> Self {
        Self {
            success,
            message: message.to_string(),
            extra: Map::new(),
            status,
        }
    }

    /// Merge the fields of a JSON object into the body. Non-object values are
    /// stored under `data`.
    #[must_use]
    pub fn with_extra(mut self, extra: Value) -> Self {
        match extra {
            Value::Object(fields) => self.extra.extend(fields),
            Value::Null => {}
            other => {
                self.extra.insert("data".to_string(), other);
            }
        }
        self
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    #[test]
    fn serialises_flat() {
        let envelope = Envelope::new("Login Successfully", StatusCode::OK, true)
            .with_extra(json!({ "token": "generated-token" }));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": true,
                "message": "Login Successfully",
                "token": "generated-token"
            })
        );
    }

    #[test]
    fn non_object_extra_goes_under_data() {
        let envelope = Envelope::new("ok", StatusCode::OK, true).with_extra(json!([1, 2]));
        assert_eq!(envelope.extra.get("data"), Some(&json!([1, 2])));
    }

    #[test]
    fn status_is_kept_as_given() {
        let envelope = Envelope::new("Email already used", StatusCode::CONFLICT, false);
        assert_eq!(envelope.status(), StatusCode::CONFLICT);
        assert!(serde_json::to_value(&envelope).unwrap().get("status").is_none());
    }

    #[tokio::test]
    async fn response_uses_status() -> anyhow::Result<()> {
        let response = Envelope::new("Authorization needed", StatusCode::UNAUTHORIZED, false)
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let json: Value = serde_json::from_slice(&body)?;
        assert_eq!(json, json!({ "success": false, "message": "Authorization needed" }));
        Ok(())
    }
}
