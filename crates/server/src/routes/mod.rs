use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

pub mod accounts;
pub mod comments;
pub mod contributors;
pub mod health;
pub mod issues;
pub mod projects;

/// `Json` whose rejections answer with the standard error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejections answer with the standard error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
