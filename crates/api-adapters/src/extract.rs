//! Resolves the acting viewer from the `Authorization: Bearer` header.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use domains::Viewer;

use crate::{error::ApiError, state::AppState};

/// The request's viewer. Missing or unusable tokens yield `Viewer::Anonymous`;
/// the access gate decides what anonymous callers may do.
#[derive(Debug, Clone)]
pub struct CurrentViewer(pub Viewer);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for CurrentViewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let viewer = state.accounts.resolve_viewer(bearer_token(parts)).await?;
        Ok(CurrentViewer(viewer))
    }
}
