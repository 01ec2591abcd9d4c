//! Turns binding failures and callback outcomes into HTTP responses.
//!
//! Every error status carries the body `{"error": "<message>"}`; successful values are sent as
//! `200 OK` json documents, and callbacks without a value produce `204 No Content`.

use crate::body::ResponseBody;
use crate::error::{HttpError, ResolveError};
use crate::reply::Outcome;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use serde::Serialize;
use tracing::{error, warn};

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn response_to(self) -> Response<ResponseBody>;
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// A json response with the given status.
fn json_response(status: StatusCode, body: Vec<u8>) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<ResponseBody> {
    match serde_json::to_vec(&ErrorBody { error: message }) {
        Ok(body) => json_response(status, body),
        Err(e) => {
            error!(cause = %e, "failed to encode error body");
            let mut response = Response::new(ResponseBody::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

impl Responder for HttpError {
    fn response_to(self) -> Response<ResponseBody> {
        error_response(self.status(), self.message())
    }
}

/// Binding failures are the client's fault.
impl Responder for ResolveError {
    fn response_to(self) -> Response<ResponseBody> {
        error_response(StatusCode::BAD_REQUEST, &self.to_string())
    }
}

impl Responder for Outcome {
    fn response_to(self) -> Response<ResponseBody> {
        match self {
            Outcome::Empty => {
                let mut response = Response::new(ResponseBody::empty());
                *response.status_mut() = StatusCode::NO_CONTENT;
                response
            }

            Outcome::Value(Ok(body)) => json_response(StatusCode::OK, body),

            Outcome::Value(Err(e)) => {
                error!(cause = %e, "failed to encode response value");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &format!("encode response: {e}"))
            }

            Outcome::Failed(e) => match HttpError::find(&*e) {
                Some(http_error) => {
                    if http_error.status().is_server_error() {
                        warn!(status = %http_error.status(), cause = %e, "callback failed");
                    }
                    error_response(http_error.status(), http_error.message())
                }
                None => {
                    warn!(cause = %e, "callback failed");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use serde_json::{Value, json};
    use thiserror::Error;

    fn json_of(response: &Response<ResponseBody>) -> Value {
        serde_json::from_slice(response.body().as_bytes()).unwrap()
    }

    #[test]
    fn resolve_error_is_bad_request() {
        let response = ResolveError::CookieNotFound { name: "session".into() }.response_to();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(json_of(&response), json!({"error": "resolve cookie \"session\": named cookie not present"}));
    }

    #[test]
    fn http_error_keeps_its_status() {
        let response = HttpError::forbidden("no access").response_to();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_of(&response), json!({"error": "no access"}));
    }

    #[test]
    fn empty_outcome_is_no_content() {
        let response = Outcome::Empty.response_to();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().as_bytes().is_empty());
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn value_outcome_is_json() {
        let response = Outcome::Value(Ok(br#"{"id":1}"#.to_vec())).response_to();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(json_of(&response), json!({"id": 1}));
    }

    #[test]
    fn plain_failure_is_internal_error() {
        let response = Outcome::Failed("boom".into()).response_to();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_of(&response), json!({"error": "boom"}));
    }

    #[derive(Debug, Error)]
    #[error("save order")]
    struct SaveOrder(#[source] HttpError);

    #[test]
    fn wrapped_http_error_keeps_its_status() {
        let e: BoxError = Box::new(SaveOrder(HttpError::conflict("order exists")));
        let response = Outcome::Failed(e).response_to();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_of(&response), json!({"error": "order exists"}));
    }

    #[test]
    fn unencodable_value_is_internal_error() {
        use serde::ser::Error as _;

        let response = Outcome::Value(Err(serde_json::Error::custom("not encodable"))).response_to();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
