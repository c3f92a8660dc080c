//! Customer REST API Routes
//!
//! Thin handlers over [`CustomerService`]: extract, validate, delegate.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use clientele_core::{Customer, CustomerFields, CustomerId, Validate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::services::{CustomerService, DEFAULT_PAGE_LIMIT};

// ============================================================================
// TYPES
// ============================================================================

/// Pagination parameters for listing customers.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct ListCustomersQuery {
    /// Number of customers to skip (default 0)
    pub skip: Option<i64>,
    /// Maximum number of customers to return (default 100)
    pub limit: Option<i64>,
}

/// Confirmation returned by a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteResponse {
    pub message: String,
}

impl DeleteResponse {
    pub fn deleted() -> Self {
        Self {
            message: "Customer deleted successfully".to_string(),
        }
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/customers - Create a new customer
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    tag = "Customers",
    request_body = CustomerFields,
    responses(
        (status = 200, description = "Customer created", body = Customer),
        (status = 400, description = "Invalid request or duplicate email", body = ApiError),
        (status = 503, description = "Record store unavailable", body = ApiError),
    ),
)]
pub async fn create_customer(
    State(service): State<Arc<CustomerService>>,
    body: Result<Json<CustomerFields>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let Json(fields) = body?;
    fields.validate()?;

    let customer = service.create(&fields).await?;
    Ok(Json(customer))
}

/// GET /api/v1/customers - List customers by ascending id
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    tag = "Customers",
    params(ListCustomersQuery),
    responses(
        (status = 200, description = "Page of customers", body = Vec<Customer>),
        (status = 400, description = "Negative skip or limit", body = ApiError),
    ),
)]
pub async fn list_customers(
    State(service): State<Arc<CustomerService>>,
    query: Result<Query<ListCustomersQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Customer>>> {
    let Query(params) = query?;
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    let customers = service.list(skip, limit).await?;
    Ok(Json(customers))
}

/// GET /api/v1/customers/{id} - Read a customer (cache first)
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    tag = "Customers",
    params(
        ("id" = i64, Path, description = "Customer ID")
    ),
    responses(
        (status = 200, description = "Customer found", body = Customer),
        (status = 404, description = "Customer not found", body = ApiError),
    ),
)]
pub async fn get_customer(
    State(service): State<Arc<CustomerService>>,
    id: Result<Path<CustomerId>, PathRejection>,
) -> ApiResult<Json<Customer>> {
    let Path(id) = id?;
    let customer = service.get(id).await?;
    Ok(Json(customer))
}

/// PUT /api/v1/customers/{id} - Replace a customer's fields
#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    tag = "Customers",
    params(
        ("id" = i64, Path, description = "Customer ID")
    ),
    request_body = CustomerFields,
    responses(
        (status = 200, description = "Customer updated", body = Customer),
        (status = 400, description = "Invalid request or duplicate email", body = ApiError),
        (status = 404, description = "Customer not found", body = ApiError),
    ),
)]
pub async fn update_customer(
    State(service): State<Arc<CustomerService>>,
    id: Result<Path<CustomerId>, PathRejection>,
    body: Result<Json<CustomerFields>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let Path(id) = id?;
    let Json(fields) = body?;
    fields.validate()?;

    let customer = service.update(id, &fields).await?;
    Ok(Json(customer))
}

/// DELETE /api/v1/customers/{id} - Delete a customer
#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    tag = "Customers",
    params(
        ("id" = i64, Path, description = "Customer ID")
    ),
    responses(
        (status = 200, description = "Customer deleted", body = DeleteResponse),
        (status = 404, description = "Customer not found", body = ApiError),
    ),
)]
pub async fn delete_customer(
    State(service): State<Arc<CustomerService>>,
    id: Result<Path<CustomerId>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    service.delete(id).await?;
    Ok(Json(DeleteResponse::deleted()))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the customer router, mounted at `{prefix}/customers`.
pub fn create_router(service: Arc<CustomerService>) -> Router {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_response_message() {
        let json = serde_json::to_value(DeleteResponse::deleted()).unwrap_or_default();
        assert_eq!(json["message"], "Customer deleted successfully");
    }

    #[test]
    fn test_list_query_defaults_to_none() {
        let query: ListCustomersQuery = serde_json::from_str("{}").unwrap_or_default();
        assert!(query.skip.is_none());
        assert!(query.limit.is_none());
    }
}
