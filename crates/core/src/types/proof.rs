//! Payment-proof images.
//!
//! Customers upload a screenshot of their payment as a data URI
//! (`data:image/jpeg;base64,...`). The bytes go to a blob store under a key
//! derived from the order reference and upload time; the order keeps only a
//! [`ProofReference`].

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationError;

/// MIME type used when the upload carries no usable data-URI tag.
pub const DEFAULT_PROOF_MIME: &str = "image/png";

const LENIENT_CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_CONFIG);
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_CONFIG);

/// Errors raised while decoding or keying a proof upload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// The order reference is blank.
    #[error("order id is required")]
    MissingOrderId,
    /// The order reference has no characters that are safe in a key.
    #[error("order id contains no usable characters")]
    InvalidOrderId,
    /// No image data was sent.
    #[error("image data is required")]
    MissingPayload,
    /// The payload is not base64.
    #[error("image data is not valid base64")]
    Undecodable,
    /// The payload decoded to nothing.
    #[error("image data is empty")]
    Empty,
    /// The decoded image exceeds the size limit.
    #[error("image must be at most {max} bytes")]
    TooLarge {
        /// Limit in bytes.
        max: usize,
    },
}

impl From<ProofError> for ValidationError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::MissingOrderId => Self::missing("orderId"),
            ProofError::InvalidOrderId => Self::invalid("orderId", err.to_string()),
            ProofError::MissingPayload => Self::missing("imageData"),
            ProofError::Undecodable | ProofError::Empty | ProofError::TooLarge { .. } => {
                Self::invalid("imageData", err.to_string())
            }
        }
    }
}

/// A decoded image upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    /// Decode `data:image/<type>;base64,<payload>` or a bare base64 payload.
    ///
    /// A missing or malformed tag falls back to [`DEFAULT_PROOF_MIME`].
    /// Decoding tolerates missing padding, trailing bits, embedded whitespace
    /// and the URL-safe alphabet.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError`] if the input is blank, is not base64, decodes to
    /// zero bytes, or is larger than `max_bytes`.
    pub fn decode(input: &str, max_bytes: usize) -> Result<Self, ProofError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ProofError::MissingPayload);
        }

        let (content_type, payload) = split_tag(input);
        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

        // Base64 inflates by 4/3; reject obviously oversized input before decoding.
        if payload.len() / 4 * 3 > max_bytes.saturating_add(3) {
            return Err(ProofError::TooLarge { max: max_bytes });
        }

        let engine = if payload.contains(['-', '_']) {
            &LENIENT_URL_SAFE
        } else {
            &LENIENT_STANDARD
        };
        let bytes = engine
            .decode(payload.as_bytes())
            .map_err(|_| ProofError::Undecodable)?;

        if bytes.is_empty() {
            return Err(ProofError::Empty);
        }
        if bytes.len() > max_bytes {
            return Err(ProofError::TooLarge { max: max_bytes });
        }

        Ok(Self {
            content_type,
            bytes,
        })
    }

    /// File extension derived from the MIME subtype (`image/svg+xml` → `svg`).
    #[must_use]
    pub fn extension(&self) -> String {
        extension_for(&self.content_type)
    }
}

/// Split a data URI into MIME type and payload.
fn split_tag(input: &str) -> (String, &str) {
    let Some(rest) = input.strip_prefix("data:") else {
        return (DEFAULT_PROOF_MIME.to_owned(), input);
    };
    let Some((mime, payload)) = rest.split_once(";base64,") else {
        return (DEFAULT_PROOF_MIME.to_owned(), input);
    };

    let valid = mime.strip_prefix("image/").is_some_and(|subtype| {
        !subtype.is_empty()
            && subtype
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '.' | '-'))
    });

    if valid {
        (mime.to_ascii_lowercase(), payload)
    } else {
        (DEFAULT_PROOF_MIME.to_owned(), payload)
    }
}

fn extension_for(content_type: &str) -> String {
    let subtype = content_type.split_once('/').map_or("", |(_, s)| s);
    let subtype = subtype.split('+').next().unwrap_or("");
    let ext = sanitize_key_segment(subtype);
    if ext.is_empty() { "png".to_owned() } else { ext }
}

/// Keep only `[A-Za-z0-9_-]`.
#[must_use]
pub fn sanitize_key_segment(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

/// Storage key for a proof: `<sanitized order ref>-<unix millis>.<ext>`.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use orderflow_core::proof_key;
///
/// let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
/// assert_eq!(
///     proof_key("../AB1234567", at, "image/jpeg").unwrap(),
///     "AB1234567-1700000000123.jpeg"
/// );
/// ```
///
/// # Errors
///
/// Returns [`ProofError`] if the reference is blank or sanitizes to nothing.
pub fn proof_key(
    order_ref: &str,
    at: DateTime<Utc>,
    content_type: &str,
) -> Result<String, ProofError> {
    if order_ref.trim().is_empty() {
        return Err(ProofError::MissingOrderId);
    }
    let id = sanitize_key_segment(order_ref);
    if id.is_empty() {
        return Err(ProofError::InvalidOrderId);
    }
    Ok(format!(
        "{id}-{}.{}",
        at.timestamp_millis(),
        extension_for(content_type)
    ))
}

/// Where an order's payment proof lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProofReference {
    /// Stored in the proof store under `key`.
    Stored {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    /// Legacy clients send the whole data URI and expect it kept on the order.
    Inline { data_url: String },
}

impl ProofReference {
    /// Interpret a client-supplied reference: data URIs are kept inline,
    /// anything else is treated as a proof-store key.
    ///
    /// Returns `None` for a blank string.
    #[must_use]
    pub fn from_client(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else if raw.starts_with("data:") {
            Some(Self::Inline {
                data_url: raw.to_owned(),
            })
        } else {
            Some(Self::Stored {
                key: raw.to_owned(),
                content_type: None,
            })
        }
    }
}
