//! `Json` and `Query` extractors that reject with the error envelope instead
//! of axum's plain-text bodies.

use std::borrow::Cow;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::envelope::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        rejected("invalid request body", &rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        rejected("invalid query string", &rejection.body_text())
    }
}

// axum renders a rejection as `<summary>: <path>: <serde message>`, with the
// path left out for syntax errors and root-level failures.
fn rejected(summary: &str, text: &str) -> ApiError {
    let detail = text.split_once(": ").map_or(text, |(_, rest)| rest);
    let field = detail
        .split_once(": ")
        .map(|(path, _)| path)
        .filter(|path| is_field_path(path));
    ApiError::Validation {
        field: field.map(|f| Cow::Owned(f.to_owned())),
        message: format!("{summary}: {detail}"),
    }
}

fn is_field_path(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}
