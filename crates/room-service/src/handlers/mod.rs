//! HTTP handlers for the room API.

pub mod rooms;
pub mod secure;

use crate::cookies::{apply_cookies, SetCookie};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Serialize a JSON body and attach `Set-Cookie` headers.
pub(crate) fn json_with_cookies<T: Serialize>(body: T, cookies: &[SetCookie]) -> Response {
    let mut response = Json(body).into_response();
    apply_cookies(&mut response, cookies);
    response
}
