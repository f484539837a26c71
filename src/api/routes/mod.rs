//! Route tables, one module per resource.

mod accounting;
mod family;
mod incentives;
mod misc;
mod reminders;
mod risk;
mod transactions;

use super::AppState;
use axum::Router;

/// Every `/api/v1` route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(transactions::routes())
        .merge(accounting::routes())
        .merge(incentives::routes())
        .merge(family::routes())
        .merge(risk::routes())
        .merge(reminders::routes())
        .merge(misc::routes())
}
