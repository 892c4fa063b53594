//! Order history endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::db::{CustomerRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::orders::{OrderView, sync_orders};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    /// Optional explicit provider customer ref; must match the caller's
    /// linked ref.
    pub customer: Option<String>,
}

/// GET /api/orders
///
/// Reconciles the caller's provider charges into local records and returns
/// the merged order list, newest first. A customer with no linked provider
/// ref has never checked out and gets a 400.
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<OrderView>>> {
    let customers = CustomerRepository::new(state.pool());
    let linked = customers.stripe_ref(user.id).await?;

    let customer = match (query.customer, linked) {
        (Some(param), Some(linked)) if param == linked.as_str() => linked,
        (Some(_), _) => {
            return Err(AppError::BadRequest(
                "Customer ID does not match your account".to_owned(),
            ));
        }
        (None, Some(linked)) => linked,
        (None, None) => return Err(AppError::BadRequest("Missing customer ID".to_owned())),
    };

    let orders = OrderRepository::new(state.pool());
    let views = sync_orders(state.stripe(), &orders, &customer).await?;

    Ok(Json(views))
}
