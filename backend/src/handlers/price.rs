use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::engine::CacheEngine;
use shared::dto::price::TokenPriceData;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `GET /prices/:token` — the read API's sole entrypoint (spec.md §4.6).
/// A cache miss that cannot be admitted (derivation failure, bad token,
/// no paths) surfaces as 404 rather than 500: the cache simply has
/// nothing to say about the token yet.
pub async fn get_price(
    State(engine): State<Arc<CacheEngine>>,
    Path(token): Path<String>,
) -> Result<(StatusCode, Json<TokenPriceData>), (StatusCode, Json<ErrorResponse>)> {
    info!(token, "price request");

    match engine.get_price(&token).await {
        Some(price) => Ok((StatusCode::OK, Json(price))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no price available for {}", token),
            }),
        )),
    }
}
