//! Cart line items and the authoritative order total.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::price::Money;
use super::validation::ValidationError;

/// One purchased product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Unit price as sent; rounding happens once, on the order total.
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// `unit_price × quantity`, unrounded. `None` if the product overflows.
    #[must_use]
    pub fn extended_price(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Sum of `price × qty` over all items, rounded to cents.
///
/// # Errors
///
/// Returns a field error when a line or the whole order exceeds
/// [`Money::MAX`].
pub fn order_total(items: &[LineItem]) -> Result<Money, ValidationError> {
    let mut sum = Decimal::ZERO;
    for (index, item) in items.iter().enumerate() {
        let line = item
            .extended_price()
            .filter(|line| Money::bounded(*line).is_some())
            .ok_or_else(|| {
                ValidationError::invalid(
                    format!("items[{index}].price"),
                    format!("line total cannot exceed {}", Money::MAX),
                )
            })?;
        sum = sum.checked_add(line).ok_or_else(total_too_large)?;
    }
    Money::bounded(sum).ok_or_else(total_too_large)
}

fn total_too_large() -> ValidationError {
    ValidationError::invalid("items", format!("order total cannot exceed {}", Money::MAX))
}

/// Parse the `items` member of a create-order request.
///
/// Accepts an array of items or an object whose values are items (taken in
/// key order). Each item needs a `name`, a non-negative `price`
/// (`unit_price`/`unitPrice` also accepted; number or decimal string) and a
/// `qty`/`quantity` of at least 1.
///
/// # Errors
///
/// Returns every failing field. An absent or empty cart is reported as a
/// missing `items` field.
pub fn parse_line_items(value: Option<&Value>) -> Result<Vec<LineItem>, ValidationError> {
    let raw: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(items)) => items.values().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(ValidationError::invalid("items", "must be a list of items")),
    };

    if raw.is_empty() {
        return Err(ValidationError::missing("items"));
    }

    let mut errors = ValidationError::new();
    let mut items = Vec::with_capacity(raw.len());
    for (index, item) in raw.into_iter().enumerate() {
        match parse_item(index, item) {
            Ok(item) => items.push(item),
            Err(e) => errors.extend(e),
        }
    }

    errors.into_result(items)
}

fn parse_item(index: usize, value: &Value) -> Result<LineItem, ValidationError> {
    let field = |name: &str| format!("items[{index}].{name}");
    let Some(obj) = value.as_object() else {
        return Err(ValidationError::invalid(format!("items[{index}]"), "must be an object"));
    };

    let text = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| obj.get(*k))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_owned)
    };

    let mut errors = ValidationError::new();

    let name = text(&["name", "title"]);
    if name.is_none() {
        errors.push_missing(field("name"));
    }

    let price = ["price", "unit_price", "unitPrice"]
        .iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()));
    let unit_price = match price.map(decimal) {
        None => {
            errors.push_missing(field("price"));
            None
        }
        Some(None) => {
            errors.push_invalid(field("price"), "must be a number");
            None
        }
        Some(Some(p)) if p.is_sign_negative() && !p.is_zero() => {
            errors.push_invalid(field("price"), "cannot be negative");
            None
        }
        Some(Some(p)) if Money::bounded(p).is_none() => {
            errors.push_invalid(field("price"), format!("cannot exceed {}", Money::MAX));
            None
        }
        Some(Some(p)) => Some(p),
    };

    let qty = ["qty", "quantity"]
        .iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()));
    let quantity = match qty.map(quantity) {
        None => {
            errors.push_missing(field("qty"));
            None
        }
        Some(Some(q)) if q >= 1 => Some(q),
        Some(_) => {
            errors.push_invalid(field("qty"), "must be a whole number of at least 1");
            None
        }
    };

    match (name, unit_price, quantity) {
        (Some(name), Some(unit_price), Some(quantity)) if errors.is_empty() => Ok(LineItem {
            name,
            sku: text(&["sku", "id", "variant_id"]),
            size: text(&["size", "variant"]),
            unit_price,
            quantity,
        }),
        _ => Err(errors),
    }
}

/// A decimal from a JSON number or numeric string.
pub(crate) fn decimal(value: &Value) -> Option<Decimal> {
    let s = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().trim_start_matches('$').to_owned(),
        _ => return None,
    };
    Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()
}

fn quantity(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|q| u32::try_from(q).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_total_widget_gadget() {
        let items = parse_line_items(Some(&json!([
            { "name": "Widget", "price": 9.99, "qty": 2 },
            { "name": "Gadget", "price": 5.00, "qty": 1 }
        ])))
        .unwrap();
        assert_eq!(order_total(&items).unwrap(), Money::from_cents(2498));
    }

    #[test]
    fn test_total_rounds_once() {
        let items = parse_line_items(Some(&json!([
            { "name": "Bolt", "price": "0.3333", "quantity": 3 }
        ])))
        .unwrap();
        assert_eq!(order_total(&items).unwrap(), Money::from_cents(100));
    }

    #[test]
    fn test_price_above_max_rejected() {
        let err = parse_line_items(Some(&json!([
            { "name": "X", "price": "79228162514264337593543950335", "qty": 2 }
        ])))
        .unwrap_err();
        assert_eq!(err.fields(), vec!["items[0].price"]);
    }

    #[test]
    fn test_line_overflow_is_field_error() {
        let items = vec![LineItem {
            name: "X".into(),
            sku: None,
            size: None,
            unit_price: Decimal::MAX,
            quantity: 2,
        }];
        assert_eq!(items[0].extended_price(), None);
        let err = order_total(&items).unwrap_err();
        assert_eq!(err.fields(), vec!["items[0].price"]);
    }

    #[test]
    fn test_order_total_above_max() {
        let items = parse_line_items(Some(&json!([
            { "name": "Yacht", "price": "6000000000", "qty": 1 },
            { "name": "Dinghy", "price": "5000000000", "qty": 1 }
        ])))
        .unwrap();
        let err = order_total(&items).unwrap_err();
        assert_eq!(err.fields(), vec!["items"]);

        let at_max = parse_line_items(Some(&json!([
            { "name": "Pallet", "price": "1999999999.998", "qty": 5 }
        ])))
        .unwrap();
        assert_eq!(order_total(&at_max).unwrap(), Money::MAX);

        let over = parse_line_items(Some(&json!([
            { "name": "Pallet", "price": "2000000000", "qty": 5 }
        ])))
        .unwrap();
        assert_eq!(order_total(&over).unwrap_err().fields(), vec!["items[0].price"]);
    }

    #[test]
    fn test_object_form_and_optional_fields() {
        let items = parse_line_items(Some(&json!({
            "0": { "name": "Tee", "price": "$12.50", "qty": "2", "sku": "TEE-1", "size": "M" }
        })))
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sku.as_deref(), Some("TEE-1"));
        assert_eq!(items[0].size.as_deref(), Some("M"));
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn test_empty_cart_is_missing() {
        for value in [None, Some(json!([])), Some(json!(null)), Some(json!({}))] {
            let err = parse_line_items(value.as_ref()).unwrap_err();
            assert_eq!(err.missing_fields(), vec!["items"]);
        }
    }

    #[test]
    fn test_item_errors_are_indexed() {
        let err = parse_line_items(Some(&json!([
            { "name": "Ok", "price": 1, "qty": 1 },
            { "price": -2, "qty": 0 },
            "junk"
        ])))
        .unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["items[1].name", "items[1].price", "items[1].qty", "items[2]"]
        );
    }
}
