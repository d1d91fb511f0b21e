//! Shipment tracking details.

use serde::{Deserialize, Serialize};

use super::validation::ValidationError;

/// Known carriers and their public tracking page templates.
const CARRIERS: &[(&str, &str, &str)] = &[
    ("usps", "USPS", "https://tools.usps.com/go/TrackConfirmAction?tLabels={number}"),
    ("ups", "UPS", "https://www.ups.com/track?tracknum={number}"),
    ("fedex", "FedEx", "https://www.fedex.com/fedextrack/?trknbr={number}"),
    ("dhl", "DHL", "https://www.dhl.com/en/express/tracking.html?AWB={number}"),
];

/// Carrier, tracking number and link for a shipped order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Tracking {
    /// Build tracking details from client input.
    ///
    /// Known carrier names are canonicalized (`fedex` becomes `FedEx`). When
    /// no URL is supplied and the carrier is known, the carrier's tracking
    /// page is used.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the tracking number is blank, or if it
    /// contains characters other than letters, digits, spaces and hyphens.
    pub fn new(
        number: &str,
        carrier: Option<&str>,
        url: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let number = number.trim();
        if number.is_empty() {
            return Err(ValidationError::missing("tracking_number"));
        }
        if !number
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
        {
            return Err(ValidationError::invalid(
                "tracking_number",
                "may only contain letters, digits, spaces and hyphens",
            ));
        }
        let number: String = number.chars().filter(|c| *c != ' ').collect();

        let carrier = carrier.map(str::trim).filter(|c| !c.is_empty());
        let known = carrier.and_then(|c| {
            let key: String = c
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .flat_map(|c| c.to_lowercase())
                .collect();
            CARRIERS.iter().find(|(k, _, _)| *k == key)
        });

        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_owned)
            .or_else(|| known.map(|(_, _, template)| template.replace("{number}", &number)));

        Ok(Self {
            carrier: known
                .map(|(_, name, _)| (*name).to_owned())
                .or_else(|| carrier.map(str::to_owned)),
            number,
            url,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_carrier_derives_url() {
        let t = Tracking::new("9400 1000 0000", Some("usps"), None).unwrap();
        assert_eq!(t.carrier.as_deref(), Some("USPS"));
        assert_eq!(t.number, "940010000000");
        assert_eq!(
            t.url.as_deref(),
            Some("https://tools.usps.com/go/TrackConfirmAction?tLabels=940010000000")
        );
    }

    #[test]
    fn test_explicit_url_wins() {
        let t = Tracking::new("1Z999", Some("Fed-Ex"), Some("https://example.test/t/1Z999")).unwrap();
        assert_eq!(t.carrier.as_deref(), Some("FedEx"));
        assert_eq!(t.url.as_deref(), Some("https://example.test/t/1Z999"));
    }

    #[test]
    fn test_unknown_carrier_kept() {
        let t = Tracking::new("ABC-1", Some("Local Courier"), None).unwrap();
        assert_eq!(t.carrier.as_deref(), Some("Local Courier"));
        assert_eq!(t.url, None);
    }

    #[test]
    fn test_number_validation() {
        assert_eq!(
            Tracking::new("  ", None, None).unwrap_err().missing_fields(),
            vec!["tracking_number"]
        );
        assert!(Tracking::new("<script>", None, None).is_err());
    }
}
