//! Postal addresses and request-shape normalization.
//!
//! Checkout clients send addresses in several shapes:
//!
//! ```text
//! { "address_line1": "...", "city": "...", "ship_country": "US" }     flat
//! { "address": { "line1": "...", "postalCode": "..." } }              nested
//! { "shippingAddress": { "addressLine1": "..." } }                    camelCase
//! ```
//!
//! [`AddressFields::extract`] reads any of them. Flat fields win over nested
//! ones, and every key is also looked up in its camelCase spelling. Only the
//! normalized [`Address`] is persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::validation::ValidationError;

/// Which address of the order is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRole {
    /// Where the parcel goes.
    Shipping,
    /// Optional billing address, defaults to shipping.
    Billing,
}

impl AddressRole {
    /// Prefixes for flat top-level keys, in priority order.
    const fn flat_prefixes(self) -> &'static [&'static str] {
        match self {
            Self::Shipping => &["", "address_", "ship_", "shipping_"],
            Self::Billing => &["bill_", "billing_"],
        }
    }

    /// Keys under which a nested address object may appear.
    const fn nested_keys(self) -> &'static [&'static str] {
        match self {
            Self::Shipping => &["address", "shipping_address", "shipping"],
            Self::Billing => &["billing_address", "billing"],
        }
    }

    /// Prefix used for field names in validation errors.
    const fn error_prefix(self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::Billing => "billing",
        }
    }
}

const LINE1: &[&str] = &["line1", "address1", "address_line1", "street"];
const LINE2: &[&str] = &["line2", "address2", "address_line2"];
const CITY: &[&str] = &["city"];
const STATE: &[&str] = &["state", "region", "province"];
const POSTAL_CODE: &[&str] = &["postal_code", "postal", "zip", "zip_code"];
const COUNTRY: &[&str] = &["country", "country_code"];

/// A normalized postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Single-line rendering for emails and logs.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut out = self.line1.clone();
        if let Some(line2) = &self.line2 {
            out.push_str(", ");
            out.push_str(line2);
        }
        format!(
            "{out}, {}, {} {}, {}",
            self.city, self.state, self.postal_code, self.country
        )
    }
}

/// Raw address fields pulled out of a request body, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFields {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl AddressFields {
    /// Read the address for `role` from a request body.
    #[must_use]
    pub fn extract(body: &Map<String, Value>, role: AddressRole) -> Self {
        let nested: Vec<&Map<String, Value>> = role
            .nested_keys()
            .iter()
            .filter_map(|key| lookup(body, key))
            .filter_map(Value::as_object)
            .collect();

        let field = |suffixes: &[&str]| -> Option<String> {
            for prefix in role.flat_prefixes() {
                for suffix in suffixes {
                    if let Some(v) = lookup(body, &format!("{prefix}{suffix}")).and_then(text) {
                        return Some(v);
                    }
                }
            }
            nested.iter().find_map(|obj| {
                suffixes
                    .iter()
                    .find_map(|suffix| lookup(obj, suffix).and_then(text))
            })
        };

        Self {
            line1: field(LINE1),
            line2: field(LINE2),
            city: field(CITY),
            state: field(STATE),
            postal_code: field(POSTAL_CODE),
            country: field(COUNTRY),
        }
    }

    /// Whether no field was supplied at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.line1.is_none()
            && self.line2.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }

    /// Validate into an [`Address`], applying `default_country` when the
    /// country is absent.
    ///
    /// # Errors
    ///
    /// Returns every missing required field, named `<role>.<field>`.
    pub fn validate(
        self,
        role: AddressRole,
        default_country: Option<&str>,
    ) -> Result<Address, ValidationError> {
        let prefix = role.error_prefix();
        let mut errors = ValidationError::new();
        let mut require = |value: Option<String>, name: &str| {
            if value.is_none() {
                errors.push_missing(format!("{prefix}.{name}"));
            }
            value.unwrap_or_default()
        };

        let country = self
            .country
            .or_else(|| default_country.map(str::to_owned))
            .map(|c| normalize_country(&c));

        let address = Address {
            line1: require(self.line1, "line1"),
            line2: self.line2,
            city: require(self.city, "city"),
            state: require(self.state, "state"),
            postal_code: require(self.postal_code, "postal_code"),
            country: require(country, "country"),
        };

        errors.into_result(address)
    }
}

/// Look a key up in its snake_case spelling, then its camelCase spelling.
fn lookup<'a>(obj: &'a Map<String, Value>, snake: &str) -> Option<&'a Value> {
    obj.get(snake).or_else(|| {
        let camel = camel_case(snake);
        if camel == snake { None } else { obj.get(&camel) }
    })
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Trimmed, non-blank text. Numbers are accepted (numeric zip codes).
fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn normalize_country(country: &str) -> String {
    let country = country.trim();
    if country.len() == 2 {
        country.to_ascii_uppercase()
    } else {
        country.to_owned()
    }
}
