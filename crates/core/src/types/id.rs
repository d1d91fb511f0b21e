//! Order identifiers.
//!
//! Every order carries two identifiers:
//! - [`OrderId`] - the primary, system-generated UUID
//! - [`OrderCode`] - a short human-readable code (`AB1234567`) quoted in
//!   emails and payment notes
//!
//! [`OrderRef`] accepts either form from clients that only know one of them.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for OrderId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<OrderId> for Uuid {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Uuid as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Uuid as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <Uuid as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(id))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Uuid as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Errors that can occur when parsing an [`OrderCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderCodeError {
    /// Wrong overall length.
    #[error("order code must be {expected} characters")]
    Length {
        /// Required length.
        expected: usize,
    },
    /// The two-letter prefix contains something other than ASCII letters.
    #[error("order code must start with two letters")]
    Prefix,
    /// The numeric part contains something other than ASCII digits.
    #[error("order code must end with seven digits")]
    Digits,
}

/// Human-readable order code: two uppercase letters followed by seven digits.
///
/// ```
/// use orderflow_core::OrderCode;
///
/// let code = OrderCode::parse("ab0012345").unwrap();
/// assert_eq!(code.as_str(), "AB0012345");
/// assert!(OrderCode::parse("A12345678").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderCode(String);

impl OrderCode {
    /// Number of prefix letters.
    pub const LETTERS: usize = 2;
    /// Number of trailing digits.
    pub const DIGITS: usize = 7;
    /// Exclusive upper bound of the numeric part.
    pub const NUMBER_BOUND: u32 = 10_000_000;
    /// Number of distinct codes.
    pub const SPACE: u64 = 26 * 26 * 10_000_000;

    /// Parse an order code, normalizing the prefix to uppercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not two ASCII letters followed by
    /// seven ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OrderCodeError> {
        let s = s.trim();
        if s.len() != Self::LETTERS + Self::DIGITS {
            return Err(OrderCodeError::Length {
                expected: Self::LETTERS + Self::DIGITS,
            });
        }

        let (prefix, digits) = s.split_at(Self::LETTERS);
        if !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(OrderCodeError::Prefix);
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(OrderCodeError::Digits);
        }

        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Build a code from two letters and a number below 10,000,000.
    ///
    /// Letters are uppercased; the number is zero-padded to seven digits.
    ///
    /// # Errors
    ///
    /// Returns an error if either letter is not ASCII alphabetic or the
    /// number does not fit in seven digits.
    pub fn from_parts(first: char, second: char, number: u32) -> Result<Self, OrderCodeError> {
        if !first.is_ascii_alphabetic() || !second.is_ascii_alphabetic() {
            return Err(OrderCodeError::Prefix);
        }
        if number >= Self::NUMBER_BOUND {
            return Err(OrderCodeError::Digits);
        }
        Ok(Self(format!(
            "{}{}{number:07}",
            first.to_ascii_uppercase(),
            second.to_ascii_uppercase()
        )))
    }

    /// The code at position `index` in `AA0000000..ZZ9999999`, wrapping
    /// modulo [`Self::SPACE`].
    #[must_use]
    pub fn from_index(index: u64) -> Self {
        let index = index % Self::SPACE;
        let bound = u64::from(Self::NUMBER_BOUND);
        let (letters, number) = (index / bound, index % bound);
        let letter = |n: u64| char::from(b'A' + u8::try_from(n % 26).unwrap_or_default());
        Self(format!(
            "{}{}{number:07}",
            letter(letters / 26),
            letter(letters % 26)
        ))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderCode {
    type Err = OrderCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderCode {
    type Error = OrderCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderCode> for String {
    fn from(code: OrderCode) -> Self {
        code.0
    }
}

/// A client-supplied reference to an order, by id or by code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRef {
    /// Primary identifier.
    Id(OrderId),
    /// Human-readable code.
    Code(OrderCode),
}

impl OrderRef {
    /// Interpret a client string as an order id or code.
    ///
    /// Returns `None` when the string is neither.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(id) = s.parse::<OrderId>() {
            return Some(Self::Id(id));
        }
        OrderCode::parse(s).ok().map(Self::Code)
    }
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Code(code) => write!(f, "{code}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_code_parse_valid() {
        assert_eq!(OrderCode::parse("AB1234567").unwrap().as_str(), "AB1234567");
        assert_eq!(OrderCode::parse(" zq0000001 ").unwrap().as_str(), "ZQ0000001");
    }

    #[test]
    fn test_order_code_parse_invalid() {
        assert_eq!(
            OrderCode::parse("AB123456"),
            Err(OrderCodeError::Length { expected: 9 })
        );
        assert_eq!(OrderCode::parse("A11234567"), Err(OrderCodeError::Prefix));
        assert_eq!(OrderCode::parse("AB12345X7"), Err(OrderCodeError::Digits));
    }

    #[test]
    fn test_order_code_from_parts_pads() {
        let code = OrderCode::from_parts('k', 'Z', 42).unwrap();
        assert_eq!(code.as_str(), "KZ0000042");
        assert!(OrderCode::from_parts('K', 'Z', 10_000_000).is_err());
        assert!(OrderCode::from_parts('1', 'Z', 5).is_err());
    }

    #[test]
    fn test_order_code_from_index() {
        assert_eq!(OrderCode::from_index(0).as_str(), "AA0000000");
        assert_eq!(OrderCode::from_index(10_000_001).as_str(), "AB0000001");
        assert_eq!(OrderCode::from_index(OrderCode::SPACE - 1).as_str(), "ZZ9999999");
        assert_eq!(OrderCode::from_index(OrderCode::SPACE), OrderCode::from_index(0));
    }

    #[test]
    fn test_order_code_serde() {
        let code: OrderCode = serde_json::from_str("\"cd7654321\"").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"CD7654321\"");
        assert!(serde_json::from_str::<OrderCode>("\"nope\"").is_err());
    }

    #[test]
    fn test_order_ref_parse() {
        let id = OrderId::generate();
        assert_eq!(OrderRef::parse(&id.to_string()), Some(OrderRef::Id(id)));
        assert!(matches!(
            OrderRef::parse("AB1234567"),
            Some(OrderRef::Code(_))
        ));
        assert_eq!(OrderRef::parse("../etc/passwd"), None);
    }
}
