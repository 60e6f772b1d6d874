//! Health Check API Handler
//!
//! Answers the container healthcheck probe.

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};

/// Body returned to a successful probe
pub const UP_MESSAGE: &str = "Container is up and running";

/// ANY /{uri}
/// `GET` reports the container as up; every other method is rejected
pub async fn health_check(method: Method) -> Response {
    if method == Method::GET {
        (StatusCode::OK, UP_MESSAGE).into_response()
    } else {
        StatusCode::METHOD_NOT_ALLOWED.into_response()
    }
}
