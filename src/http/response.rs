//! Rendering resource results as HTTP responses.
//!
//! # Responsibilities
//! - Pick the status code for each request type
//! - Emit `ETag` for revisions and `Location` for creations
//! - Copy accumulated advice into response headers
//! - Map errors to `{code, reason, message}` JSON bodies
//!
//! # Design Decisions
//! - Advice is read after the handler finishes; an advice header that fails
//!   to convert is logged and skipped rather than failing the response
//! - Field filtering happens here so handlers may return whole resources

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use serde_json::{json, Value};

use crate::error::ResourceError;
use crate::request::{RequestType, Response};

const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";

/// Everything the renderer needs besides the handler's result.
#[derive(Debug, Default)]
pub struct RenderOptions<'a> {
    pub request_type: Option<RequestType>,
    pub fields: &'a [String],
    pub pretty_print: bool,
    /// Path of a created resource, when the handler did not report its id.
    pub location_base: Option<String>,
    pub advice: BTreeMap<String, Vec<String>>,
}

fn to_body(value: &Value, pretty_print: bool) -> Body {
    let text = if pretty_print {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    // Serializing a Value cannot fail; fall back to an empty body regardless.
    Body::from(text.unwrap_or_default())
}

fn json_response(status: StatusCode, value: &Value, pretty_print: bool) -> HttpResponse {
    let mut response = HttpResponse::new(to_body(value, pretty_print));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(CONTENT_TYPE_JSON),
    );
    response
}

fn set_header(response: &mut HttpResponse, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(e) => tracing::warn!(header = %name, error = %e, "Dropping unrepresentable header"),
    }
}

fn apply_advice(response: &mut HttpResponse, advice: &BTreeMap<String, Vec<String>>) {
    for (name, values) in advice {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            tracing::warn!(advice = %name, "Dropping advice with an invalid header name");
            continue;
        };
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    response.headers_mut().append(name.clone(), value);
                }
                Err(e) => tracing::warn!(advice = %name, error = %e, "Dropping advice value"),
            }
        }
    }
}

/// Render an error as a JSON body with the matching status.
pub fn error_response(error: &ResourceError, pretty_print: bool) -> HttpResponse {
    let status =
        StatusCode::from_u16(error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({
        "code": status.as_u16(),
        "reason": error.reason(),
        "message": error.to_string(),
    });
    json_response(status, &body, pretty_print)
}

/// Render a handler result.
pub fn render(result: Result<Response, ResourceError>, options: RenderOptions<'_>) -> HttpResponse {
    let response = match result {
        Ok(response) => response,
        Err(error) => {
            let mut rendered = error_response(&error, options.pretty_print);
            apply_advice(&mut rendered, &options.advice);
            return rendered;
        }
    };

    let mut rendered = match response.filter_fields(options.fields) {
        Response::Action(action) if action.content.is_null() => {
            StatusCode::NO_CONTENT.into_response()
        }
        Response::Resource(resource) => {
            let status = if options.request_type == Some(RequestType::Create) {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            let mut rendered = json_response(status, &resource.to_json(), options.pretty_print);
            if let Some(revision) = &resource.revision {
                set_header(&mut rendered, header::ETAG, &format!("\"{}\"", revision));
            }
            if status == StatusCode::CREATED {
                let location = match (&options.location_base, &resource.id) {
                    (Some(base), Some(id)) => Some(format!("{}/{}", base.trim_end_matches('/'), id)),
                    (Some(base), None) => Some(base.clone()),
                    (None, _) => None,
                };
                if let Some(location) = location {
                    set_header(&mut rendered, header::LOCATION, &location);
                }
            }
            rendered
        }
        other => json_response(StatusCode::OK, &other.to_json(), options.pretty_print),
    };
    apply_advice(&mut rendered, &options.advice);
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ActionResponse, ResourceResponse};

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body() {
        let error = ResourceError::NotFound("users/7".into());
        let response = error_response(&error, false);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], 404);
        assert_eq!(body["reason"], "Not Found");
    }

    #[tokio::test]
    async fn test_created_resource() {
        let resource = ResourceResponse::new(
            Some("bjensen".into()),
            Some("1".into()),
            json!({"name": "Babs", "mail": "b@example.com"}),
        );
        let fields = vec!["/name".to_string()];
        let mut advice = BTreeMap::new();
        advice.insert("X-Warning".to_string(), vec!["a".to_string(), "b".to_string()]);

        let response = render(
            Ok(resource.into()),
            RenderOptions {
                request_type: Some(RequestType::Create),
                fields: &fields,
                location_base: Some("/users".into()),
                advice,
                ..Default::default()
            },
        );
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::ETAG], "\"1\"");
        assert_eq!(response.headers()[header::LOCATION], "/users/bjensen");
        assert_eq!(response.headers().get_all("x-warning").iter().count(), 2);

        let body = body_json(response).await;
        assert_eq!(body["name"], "Babs");
        assert!(body.get("mail").is_none());
        assert_eq!(body["_id"], "bjensen");
    }

    #[test]
    fn test_empty_action_is_no_content() {
        let response = render(
            Ok(ActionResponse::new(Value::Null).into()),
            RenderOptions {
                request_type: Some(RequestType::Action),
                ..Default::default()
            },
        );
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
