//! Order route handlers.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use orderflow_core::{
    CreateOrderRequest, Money, OrderCode, OrderId, OrderStatus, ProofReference, Tracking,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::middleware::{JsonBody, RequireOperator};
use crate::services::{Notification, NotificationReport};
use crate::state::AppState;

/// Trimmed, non-blank value.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// An identifier-like field that clients send as a string or a number.
/// Blank strings read as absent.
fn scalar_text(
    value: Option<&Value>,
    field: &str,
) -> std::result::Result<Option<String>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(present(Some(s.as_str())).map(str::to_owned)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(ValidationError::invalid(field, "must be a string or number")),
    }
}

// =============================================================================
// Create
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CreatedOrderResponse {
    pub id: OrderId,
    pub code: OrderCode,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total: Money,
    pub total_mismatch: bool,
    pub notifications: NotificationReport,
}

/// Create an order from a checkout submission.
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreatedOrderResponse>)> {
    let created = state.lifecycle().create_order(&request).await?;
    let order = created.order;

    Ok((
        StatusCode::CREATED,
        Json(CreatedOrderResponse {
            id: order.id,
            code: order.code,
            created_at: order.created_at,
            status: order.status,
            total: order.total,
            total_mismatch: order.total_mismatch,
            notifications: created.notifications,
        }),
    ))
}

// =============================================================================
// Payment proof
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProofRequest {
    #[serde(rename = "orderId", alias = "order_id", alias = "id")]
    pub order_id: Option<Value>,
    #[serde(rename = "imageData", alias = "image_data")]
    pub image_data: Option<String>,
    pub email: Option<String>,
    pub method: Option<String>,
    pub amount: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ProofResponse {
    pub ok: bool,
    pub key: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub email: Option<String>,
    pub method: Option<String>,
    pub amount: Option<Value>,
    pub status: OrderStatus,
    pub message: &'static str,
}

/// Store a customer's payment screenshot against their order.
///
/// `email`, `method` and `amount` are echoed back untouched.
#[tracing::instrument(skip_all)]
pub async fn upload_proof(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ProofRequest>,
) -> Result<Json<ProofResponse>> {
    let order_ref = scalar_text(request.order_id.as_ref(), "orderId")?.unwrap_or_default();
    let attached = state
        .lifecycle()
        .attach_proof(&order_ref, request.image_data.as_deref().unwrap_or_default())
        .await?;

    let message = if attached.order.status == OrderStatus::Pending {
        "Payment proof received. We will confirm your payment shortly."
    } else {
        "Payment proof received. Your order is marked as paid."
    };

    Ok(Json(ProofResponse {
        ok: true,
        key: attached.key,
        order_id: order_ref.trim().to_owned(),
        email: request.email,
        method: request.method,
        amount: request.amount,
        status: attached.order.status,
        message,
    }))
}

// =============================================================================
// Mark paid (operator)
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct MarkPaidRequest {
    #[serde(alias = "orderId")]
    pub id: Option<Value>,
    #[serde(alias = "proof")]
    pub payment_proof: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkPaidResponse {
    pub ok: bool,
    pub id: OrderId,
    pub status: OrderStatus,
    pub changed: bool,
}

/// Operator confirmation that an order's payment arrived.
#[tracing::instrument(skip_all)]
pub async fn mark_paid(
    _operator: RequireOperator,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<MarkPaidRequest>,
) -> Result<Json<MarkPaidResponse>> {
    let id = scalar_text(request.id.as_ref(), "id")?
        .ok_or_else(|| ValidationError::missing("id"))?;
    let proof = request
        .payment_proof
        .as_deref()
        .and_then(ProofReference::from_client);

    let result = state.lifecycle().confirm_payment(&id, proof).await?;

    Ok(Json(MarkPaidResponse {
        ok: true,
        id: result.order.id,
        status: result.order.status,
        changed: result.changed,
    }))
}

// =============================================================================
// Tracking (operator)
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TrackingRequest {
    #[serde(alias = "orderId")]
    pub id: Option<Value>,
    #[serde(alias = "trackingNumber")]
    pub tracking_number: Option<Value>,
    pub carrier: Option<String>,
    #[serde(alias = "trackingUrl")]
    pub tracking_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackingResponse {
    pub ok: bool,
    pub id: OrderId,
    pub status: OrderStatus,
    pub tracking: Option<Tracking>,
    pub notification: Notification,
}

/// Operator assignment of shipment tracking; emails the customer.
#[tracing::instrument(skip_all)]
pub async fn update_tracking(
    _operator: RequireOperator,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<TrackingRequest>,
) -> Result<Json<TrackingResponse>> {
    let mut errors = ValidationError::new();
    let id = match scalar_text(request.id.as_ref(), "id") {
        Ok(Some(id)) => Some(id),
        Ok(None) => {
            errors.push_missing("id");
            None
        }
        Err(e) => {
            errors.extend(e);
            None
        }
    };
    let tracking = match scalar_text(request.tracking_number.as_ref(), "tracking_number") {
        Err(e) => {
            errors.extend(e);
            None
        }
        Ok(None) => {
            errors.push_missing("tracking_number");
            None
        }
        Ok(Some(number)) => Tracking::new(
            &number,
            request.carrier.as_deref(),
            request.tracking_url.as_deref(),
        )
        .map_err(|e| errors.extend(e))
        .ok(),
    };

    let (Some(id), Some(tracking)) = (id, tracking) else {
        return Err(errors.into());
    };

    let result = state.lifecycle().assign_tracking(&id, tracking).await?;

    Ok(Json(TrackingResponse {
        ok: true,
        id: result.order.id,
        status: result.order.status,
        tracking: result.order.tracking,
        notification: result.notification,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_scalar_text_accepts_strings_and_numbers() {
        assert_eq!(
            scalar_text(Some(&json!(" AB1234567 ")), "id").unwrap().as_deref(),
            Some("AB1234567")
        );
        assert_eq!(
            scalar_text(Some(&json!(9_400_100_000_u64)), "id").unwrap().as_deref(),
            Some("9400100000")
        );
        assert_eq!(scalar_text(Some(&json!("  ")), "id").unwrap(), None);
        assert_eq!(scalar_text(Some(&Value::Null), "id").unwrap(), None);
        assert_eq!(scalar_text(None, "id").unwrap(), None);
    }

    #[test]
    fn test_scalar_text_rejects_structures() {
        let err = scalar_text(Some(&json!({ "id": 1 })), "orderId").unwrap_err();
        assert_eq!(err.fields(), vec!["orderId"]);
        assert!(scalar_text(Some(&json!(true)), "id").is_err());
    }
}
