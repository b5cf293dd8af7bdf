//! Counter and category routing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Counter, CounterPatch, NewCounter};
use order_store::OrderStore;
use serde::Deserialize;

use super::parse_counter_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CategoriesRequest {
    #[serde(default)]
    pub categories: Vec<String>,
}

/// GET /counters — list every counter.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<Counter>> {
    Json(state.counters.list_counters().await)
}

/// POST /counters — create a counter. PINs must be unique.
#[tracing::instrument(skip(state, new_counter))]
pub async fn create<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(new_counter): Json<NewCounter>,
) -> Result<(StatusCode, Json<Counter>), ApiError> {
    let id = state.counters.create_counter(new_counter).await?;
    let counter = state.counters.get_counter(id).await?;
    Ok((StatusCode::CREATED, Json(counter)))
}

/// PUT /counters/{id} — update a counter.
#[tracing::instrument(skip(state, patch))]
pub async fn update<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(patch): Json<CounterPatch>,
) -> Result<Json<Counter>, ApiError> {
    let counter_id = parse_counter_id(&id)?;
    state.counters.update_counter(counter_id, patch).await?;
    Ok(Json(state.counters.get_counter(counter_id).await?))
}

/// DELETE /counters/{id} — delete a counter and its category routes.
#[tracing::instrument(skip(state))]
pub async fn delete<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let counter_id = parse_counter_id(&id)?;
    state.counters.delete_counter(counter_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /counters/reset — remove every counter and category route.
#[tracing::instrument(skip(state))]
pub async fn reset<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> StatusCode {
    state.counters.reset_all().await;
    StatusCode::NO_CONTENT
}

/// POST /counters/{id}/categories — route categories to a counter.
#[tracing::instrument(skip(state, req))]
pub async fn assign_categories<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CategoriesRequest>,
) -> Result<Json<Counter>, ApiError> {
    let counter_id = parse_counter_id(&id)?;
    let categories: Vec<String> = req
        .categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    state
        .counters
        .assign_categories(counter_id, categories)
        .await?;
    Ok(Json(state.counters.get_counter(counter_id).await?))
}

/// GET /counters/{id}/categories — categories routed to a counter.
#[tracing::instrument(skip(state))]
pub async fn categories<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let counter_id = parse_counter_id(&id)?;
    Ok(Json(state.counters.categories_for(counter_id).await?))
}

/// GET /categories — every routed category.
#[tracing::instrument(skip(state))]
pub async fn all_categories<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<String>> {
    Json(state.counters.all_categories().await)
}
