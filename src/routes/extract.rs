use axum::extract::{FromRequest, FromRequestParts};

use crate::error::Error;

/// `axum::Json` whose rejections use the API's JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` whose rejections use the API's JSON error body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);
