//! Payment methods and customer payment instructions.
//!
//! Payments happen outside the system (peer-to-peer apps, bank transfer,
//! crypto), so the order confirmation email tells the customer how to pay.
//! The wording comes from a lookup table keyed by method with a fallback
//! entry, so unknown methods still get usable instructions.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::OrderCode;
use super::price::Money;

/// How the customer intends to pay.
///
/// The set is open: unrecognized tags are kept verbatim in [`Self::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaymentMethod {
    CashApp,
    Venmo,
    Zelle,
    Bitcoin,
    PayPal,
    /// Any other tag, lower-cased.
    Other(String),
}

impl PaymentMethod {
    /// Parse a client-supplied method tag.
    ///
    /// Matching ignores case, spaces, hyphens and underscores, so
    /// `"Cash App"`, `"cash-app"` and `"cashapp"` are the same method.
    /// Returns `None` for a blank tag.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return None;
        }
        let key: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        Some(match key.as_str() {
            "cashapp" => Self::CashApp,
            "venmo" => Self::Venmo,
            "zelle" => Self::Zelle,
            "bitcoin" | "btc" => Self::Bitcoin,
            "paypal" => Self::PayPal,
            _ => Self::Other(trimmed.to_lowercase()),
        })
    }

    /// Stable tag used in storage and JSON.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CashApp => "cashapp",
            Self::Venmo => "venmo",
            Self::Zelle => "zelle",
            Self::Bitcoin => "bitcoin",
            Self::PayPal => "paypal",
            Self::Other(tag) => tag,
        }
    }

    /// Customer-facing name.
    #[must_use]
    pub fn label(&self) -> String {
        instruction_entry(self).label.map_or_else(
            || self.as_str().to_uppercase(),
            str::to_owned,
        )
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "payment method cannot be empty".to_owned())
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        method.as_str().to_owned()
    }
}

/// One row of the instruction table.
struct InstructionEntry {
    tag: &'static str,
    /// `None` means "use the uppercased tag".
    label: Option<&'static str>,
    /// Placeholders: `{total}`, `{code}`, `{method}`.
    template: &'static str,
}

const INSTRUCTIONS: &[InstructionEntry] = &[
    InstructionEntry {
        tag: "cashapp",
        label: Some("Cash App"),
        template: "Send {total} with Cash App and put order code {code} in the note.",
    },
    InstructionEntry {
        tag: "venmo",
        label: Some("Venmo"),
        template: "Send {total} with Venmo (friends & family) and put order code {code} in the note.",
    },
    InstructionEntry {
        tag: "zelle",
        label: Some("Zelle"),
        template: "Send {total} with Zelle and put order code {code} in the memo.",
    },
    InstructionEntry {
        tag: "bitcoin",
        label: Some("Bitcoin"),
        template: "Send the BTC equivalent of {total} at today's rate and reply with the transaction id and order code {code}.",
    },
    InstructionEntry {
        tag: "paypal",
        label: Some("PayPal"),
        template: "Send {total} with PayPal (friends & family) and put order code {code} in the note.",
    },
];

const FALLBACK: InstructionEntry = InstructionEntry {
    tag: "",
    label: None,
    template: "Complete your payment of {total} via {method} and reference order code {code}. Reply to this email if you need payment details.",
};

fn instruction_entry(method: &PaymentMethod) -> &'static InstructionEntry {
    INSTRUCTIONS
        .iter()
        .find(|entry| entry.tag == method.as_str())
        .unwrap_or(&FALLBACK)
}

/// Payment instructions for an order.
///
/// A pure function of its inputs; always returns non-empty text.
///
/// ```
/// use orderflow_core::{Money, OrderCode, PaymentMethod, payment_instructions};
///
/// let code = OrderCode::parse("AB1234567").unwrap();
/// let text = payment_instructions(&PaymentMethod::Zelle, &code, Money::from_cents(2498));
/// assert!(text.contains("$24.98"));
/// assert!(text.contains("AB1234567"));
/// ```
#[must_use]
pub fn payment_instructions(method: &PaymentMethod, code: &OrderCode, total: Money) -> String {
    instruction_entry(method)
        .template
        .replace("{total}", &total.to_string())
        .replace("{code}", code.as_str())
        .replace("{method}", &method.label())
}
