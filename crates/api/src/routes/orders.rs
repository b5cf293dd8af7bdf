//! Order endpoints.
//!
//! Every successful mutation publishes its change so connected terminals
//! see it.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{ItemStatus, NewOrder, Order, OrderPatch, OrderStatus};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use super::{parse_counter_id, parse_order_id};
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ItemStatusRequest {
    pub order_id: OrderId,
    pub item_index: usize,
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct ClearedResponse {
    pub removed: usize,
}

// -- Handlers --

/// GET /orders — list every order.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_orders().await?))
}

/// POST /orders — create an order and route its items to counters.
#[tracing::instrument(skip(state, new_order))]
pub async fn create<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(new_order): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let result = state.orders.create_order(new_order).await?;
    state.publisher.publish(result.change);
    Ok((StatusCode::CREATED, Json(result.order)))
}

/// GET /orders/{id} — load one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.orders.get_order(order_id).await?))
}

/// PUT /orders/{id} — update descriptive fields.
#[tracing::instrument(skip(state, patch))]
pub async fn update<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    if patch.is_empty() {
        return Ok(Json(state.orders.get_order(order_id).await?));
    }
    let result = state.orders.update_order(order_id, patch).await?;
    state.publisher.publish(result.change);
    Ok(Json(result.order))
}

/// DELETE /orders/{id} — delete one order.
#[tracing::instrument(skip(state))]
pub async fn delete<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&id)?;
    let result = state.orders.delete_order(order_id).await?;
    state.publisher.publish(result.change);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /orders/{id}/update_status — set the status of a whole order.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let status: OrderStatus = req.status.parse()?;
    let result = state.orders.update_status(order_id, status).await?;
    state.publisher.publish(result.change);
    Ok(Json(result.order))
}

/// POST /orders/update-item-status — set the status of one item.
#[tracing::instrument(skip(state, req), fields(order_id = %req.order_id, item_index = req.item_index))]
pub async fn update_item_status<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ItemStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let status: ItemStatus = req.status.parse()?;
    let result = state
        .orders
        .update_item_status(req.order_id, req.item_index, status)
        .await?;
    state.publisher.publish(result.change);
    Ok(Json(result.order))
}

/// GET /orders/by_status?status= — orders in one status.
#[tracing::instrument(skip(state, query))]
pub async fn by_status<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let status: OrderStatus = query
        .status
        .ok_or_else(|| ApiError::BadRequest("Status parameter is required".to_string()))?
        .parse()?;
    Ok(Json(state.orders.orders_by_status(status).await?))
}

/// GET /orders/ready-to-serve — orders whose items are all ready.
#[tracing::instrument(skip(state))]
pub async fn ready_to_serve<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.ready_to_serve().await?))
}

/// GET /orders/counter/{counter_id} — orders reduced to one counter's items.
#[tracing::instrument(skip(state))]
pub async fn for_counter<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(counter_id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let counter_id = parse_counter_id(&counter_id)?;
    Ok(Json(state.orders.orders_for_counter(counter_id).await?))
}

/// DELETE /orders/clear_all — delete every order.
#[tracing::instrument(skip(state))]
pub async fn clear_all<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ClearedResponse>, ApiError> {
    let (removed, change) = state.orders.clear_orders().await?;
    state.publisher.publish(change);
    Ok(Json(ClearedResponse { removed }))
}
