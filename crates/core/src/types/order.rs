//! The order record and create-order validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::address::{Address, AddressFields, AddressRole};
use super::email::Email;
use super::id::{OrderCode, OrderId};
use super::line_item::{self, LineItem, order_total};
use super::payment::PaymentMethod;
use super::price::Money;
use super::proof::ProofReference;
use super::status::OrderStatus;
use super::tracking::Tracking;
use super::validation::ValidationError;

/// Who placed the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Server-computed total compared against what the client claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalCheck {
    pub computed: Money,
    pub client: Option<Money>,
    pub mismatch: bool,
}

impl TotalCheck {
    #[must_use]
    pub fn new(computed: Money, client: Option<Money>) -> Self {
        Self {
            computed,
            client,
            mismatch: client.is_some_and(|c| c != computed),
        }
    }
}

/// Raw create-order body.
///
/// Storefront checkouts send several shapes (flat or nested addresses,
/// snake_case or camelCase keys, items as an array or keyed object), so the
/// body is kept as a JSON object and normalized by [`Self::validate`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CreateOrderRequest(pub Map<String, Value>);

impl CreateOrderRequest {
    /// Normalize and validate the body.
    ///
    /// Billing defaults to the shipping address when no billing fields are
    /// present. `default_country` fills an absent country.
    ///
    /// # Errors
    ///
    /// Returns every failing field at once.
    pub fn validate(&self, default_country: Option<&str>) -> Result<NewOrder, ValidationError> {
        let body = &self.0;
        let mut errors = ValidationError::new();

        let email = match text(body, &["email", "customer_email", "customerEmail"]) {
            None => {
                errors.push_missing("email");
                None
            }
            Some(raw) => match Email::parse(&raw) {
                Ok(email) => Some(email),
                Err(e) => {
                    errors.push_invalid("email", e.to_string());
                    None
                }
            },
        };

        let items = line_item::parse_line_items(body.get("items"))
            .map_err(|e| errors.extend(e))
            .ok();

        let payment_method = text(body, &["payment_method", "paymentMethod", "method"])
            .and_then(|m| PaymentMethod::parse(&m));
        if payment_method.is_none() {
            errors.push_missing("payment_method");
        }

        let shipping = AddressFields::extract(body, AddressRole::Shipping)
            .validate(AddressRole::Shipping, default_country)
            .map_err(|e| errors.extend(e))
            .ok();

        let billing_fields = AddressFields::extract(body, AddressRole::Billing);
        let billing = if billing_fields.is_empty() {
            None
        } else {
            billing_fields
                .validate(AddressRole::Billing, default_country)
                .map_err(|e| errors.extend(e))
                .ok()
        };

        let client_total = match client_total(body) {
            Ok(total) => total,
            Err(e) => {
                errors.extend(e);
                None
            }
        };

        let total = items
            .as_deref()
            .map(order_total)
            .transpose()
            .map_err(|e| errors.extend(e))
            .ok()
            .flatten();

        match (email, items, payment_method, shipping, total) {
            (Some(email), Some(items), Some(payment_method), Some(shipping), Some(total))
                if errors.is_empty() =>
            {
                let check = TotalCheck::new(total, client_total);
                Ok(NewOrder {
                    customer: Customer {
                        email,
                        name: text(body, &["name", "customer_name", "customerName", "full_name", "fullName"]),
                        phone: text(body, &["phone", "customer_phone", "customerPhone"]),
                    },
                    billing: billing.unwrap_or_else(|| shipping.clone()),
                    shipping,
                    items,
                    total: check.computed,
                    client_total: check.client,
                    total_mismatch: check.mismatch,
                    payment_method,
                })
            }
            _ => Err(errors),
        }
    }
}

fn text(body: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| body.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

/// `total` (decimal) wins over `subtotal_cents` (integer cents). Either must
/// lie between zero and [`Money::MAX`].
fn client_total(body: &Map<String, Value>) -> Result<Option<Money>, ValidationError> {
    let out_of_range = |field: &str| {
        ValidationError::invalid(field, format!("must be between $0.00 and {}", Money::MAX))
    };

    if let Some(value) = body.get("total").filter(|v| !v.is_null()) {
        let total = line_item::decimal(value)
            .ok_or_else(|| ValidationError::invalid("total", "must be a number"))?;
        return Money::bounded(total)
            .filter(|t| !t.is_negative())
            .map(Some)
            .ok_or_else(|| out_of_range("total"));
    }
    let cents = ["subtotal_cents", "subtotalCents"]
        .iter()
        .find_map(|k| body.get(*k).filter(|v| !v.is_null()));
    match cents {
        None => Ok(None),
        Some(value) => {
            let cents = value.as_i64().ok_or_else(|| {
                ValidationError::invalid("subtotal_cents", "must be a whole number of cents")
            })?;
            let total = Money::from_cents(cents);
            if total.is_negative() || total > Money::MAX {
                return Err(out_of_range("subtotal_cents"));
            }
            Ok(Some(total))
        }
    }
}

/// A validated order that has not been assigned an identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer: Customer,
    pub shipping: Address,
    pub billing: Address,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub client_total: Option<Money>,
    pub total_mismatch: bool,
    pub payment_method: PaymentMethod,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub code: OrderCode,
    pub status: OrderStatus,
    pub customer: Customer,
    pub shipping: Address,
    pub billing: Address,
    pub items: Vec<LineItem>,
    pub total: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_total: Option<Money>,
    #[serde(default)]
    pub total_mismatch: bool,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_proof: Option<ProofReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<Tracking>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Assign identity to a validated order. The order starts `pending`.
    #[must_use]
    pub fn new(id: OrderId, code: OrderCode, new: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            id,
            code,
            status: OrderStatus::Pending,
            customer: new.customer,
            shipping: new.shipping,
            billing: new.billing,
            items: new.items,
            total: new.total,
            client_total: new.client_total,
            total_mismatch: new.total_mismatch,
            payment_method: new.payment_method,
            payment_proof: None,
            tracking: None,
            created_at: now,
            updated_at: now,
        }
    }
}
