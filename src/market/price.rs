//! Mandi price rows and their display formatting.

use serde::Deserialize;

/// One commodity quote, in rupees per quintal (100 kg).
#[derive(Debug, Clone, PartialEq)]
pub struct MarketPrice {
    pub commodity: String,
    pub variety: String,
    pub market: String,
    pub min_price: f64,
    pub max_price: f64,
}

impl MarketPrice {
    /// `"₹2,150 - ₹2,400"`, or a single amount when min and max agree.
    pub fn display_range(&self) -> String {
        let min = format_rupees(self.min_price);
        let max = format_rupees(self.max_price);
        if min == max {
            min
        } else {
            format!("{min} - {max}")
        }
    }
}

/// A row as the model returned it; every field may be missing or junk.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawPrice {
    commodity: Option<String>,
    variety: Option<String>,
    market: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
}

/// Why a raw row was rejected.
#[derive(Debug, PartialEq)]
pub(crate) enum RowRejection {
    MissingField(&'static str),
    InvalidPrice,
    InvertedRange,
}

impl RawPrice {
    /// Validate into a [`MarketPrice`]: non-empty strings, finite
    /// non-negative prices, `min <= max`.
    pub(crate) fn validate(self) -> Result<MarketPrice, RowRejection> {
        fn text(v: Option<String>, name: &'static str) -> Result<String, RowRejection> {
            match v.map(|s| s.trim().to_string()) {
                Some(s) if !s.is_empty() => Ok(s),
                _ => Err(RowRejection::MissingField(name)),
            }
        }

        let commodity = text(self.commodity, "commodity")?;
        let variety = text(self.variety, "variety")?;
        let market = text(self.market, "market")?;

        let (min_price, max_price) = match (self.min_price, self.max_price) {
            (Some(min), Some(max)) => (min, max),
            (None, _) => return Err(RowRejection::MissingField("minPrice")),
            (_, None) => return Err(RowRejection::MissingField("maxPrice")),
        };
        let valid = |p: f64| p.is_finite() && p >= 0.0;
        if !valid(min_price) || !valid(max_price) {
            return Err(RowRejection::InvalidPrice);
        }
        if min_price > max_price {
            return Err(RowRejection::InvertedRange);
        }

        Ok(MarketPrice {
            commodity,
            variety,
            market,
            min_price,
            max_price,
        })
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Group digits the Indian way: last three, then pairs (`12,34,567`).
pub fn group_indian(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, last3) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{last3}", groups.join(","))
}

/// `₹` + [`group_indian`] of the rounded amount.
pub fn format_rupees(amount: f64) -> String {
    let rounded = if amount.is_finite() && amount > 0.0 {
        amount.round() as u64
    } else {
        0
    };
    format!("₹{}", group_indian(rounded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(min: f64, max: f64) -> RawPrice {
        RawPrice {
            commodity: Some("Onion".into()),
            variety: Some("Red".into()),
            market: Some("Lasalgaon".into()),
            min_price: Some(min),
            max_price: Some(max),
        }
    }

    #[test]
    fn valid_row_is_trimmed() {
        let mut r = raw(1800.0, 2200.0);
        r.commodity = Some("  Onion ".into());
        let p = r.validate().unwrap();
        assert_eq!(p.commodity, "Onion");
        assert_eq!(p.min_price, 1800.0);
    }

    #[test]
    fn equal_min_max_is_valid() {
        assert!(raw(2000.0, 2000.0).validate().is_ok());
    }

    #[test]
    fn inverted_range_rejected() {
        assert_eq!(raw(2500.0, 2000.0).validate(), Err(RowRejection::InvertedRange));
    }

    #[test]
    fn negative_or_nan_rejected() {
        assert_eq!(raw(-1.0, 2000.0).validate(), Err(RowRejection::InvalidPrice));
        assert_eq!(raw(1.0, f64::NAN).validate(), Err(RowRejection::InvalidPrice));
    }

    #[test]
    fn blank_or_missing_field_rejected() {
        let mut r = raw(1.0, 2.0);
        r.variety = Some("   ".into());
        assert_eq!(r.validate(), Err(RowRejection::MissingField("variety")));

        let mut r = raw(1.0, 2.0);
        r.min_price = None;
        assert_eq!(r.validate(), Err(RowRejection::MissingField("minPrice")));
    }

    #[test]
    fn indian_grouping() {
        assert_eq!(group_indian(0), "0");
        assert_eq!(group_indian(999), "999");
        assert_eq!(group_indian(1000), "1,000");
        assert_eq!(group_indian(12345), "12,345");
        assert_eq!(group_indian(123456), "1,23,456");
        assert_eq!(group_indian(1234567), "12,34,567");
        assert_eq!(group_indian(123456789), "12,34,56,789");
    }

    #[test]
    fn rupee_formatting_rounds() {
        assert_eq!(format_rupees(2150.4), "₹2,150");
        assert_eq!(format_rupees(2150.5), "₹2,151");
        assert_eq!(format_rupees(f64::INFINITY), "₹0");
    }

    #[test]
    fn display_range_collapses_equal_bounds() {
        let p = raw(2000.0, 2000.0).validate().unwrap();
        assert_eq!(p.display_range(), "₹2,000");
        let p = raw(1800.0, 125000.0).validate().unwrap();
        assert_eq!(p.display_range(), "₹1,800 - ₹1,25,000");
    }
}
