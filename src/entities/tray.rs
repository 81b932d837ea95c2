//! Tray - the bottom layer; one container of stock in a column

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::{LayerId, LayerKind};
use crate::core::layer::{LayerFields, LayerNode, Node};

/// Best-before window of a tray's contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryRange {
    /// Start of the window, epoch milliseconds
    pub from: i64,
    /// End of the window (exclusive), epoch milliseconds
    pub to: i64,
    pub label: String,
}

impl ExpiryRange {
    pub fn new(from: i64, to: i64, label: impl Into<String>) -> Self {
        Self {
            from,
            to,
            label: label.into(),
        }
    }

    /// The whole of a calendar year
    pub fn year(year: i32) -> Option<Self> {
        let from = start_of(NaiveDate::from_ymd_opt(year, 1, 1)?)?;
        let to = start_of(NaiveDate::from_ymd_opt(year + 1, 1, 1)?)?;
        Some(Self::new(from, to, year.to_string()))
    }

    /// One calendar month (1-based)
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self::new(
            start_of(first)?,
            start_of(next)?,
            first.format("%b %Y").to_string(),
        ))
    }
}

fn start_of(date: NaiveDate) -> Option<i64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight).timestamp_millis())
}

/// Fields stored on a tray document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrayFields {
    /// Id of a [`Category`](crate::entities::Category) on the owning warehouse
    pub category: Option<LayerId>,

    pub expiry: Option<ExpiryRange>,

    /// Weight in kilograms
    pub weight: Option<f64>,

    /// Free-text note
    pub comment: Option<String>,

    /// Position within the column, counted from the bottom
    pub index: u32,
}

/// A tray node
pub type Tray = Node<TrayFields>;

impl TrayFields {
    /// An empty tray at the given column position
    pub fn at_index(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: Option<LayerId>) -> Self {
        self.category = category;
        self
    }

    pub fn with_expiry(mut self, expiry: Option<ExpiryRange>) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_weight(mut self, weight: Option<f64>) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }
}

impl LayerFields for TrayFields {
    const KIND: LayerKind = LayerKind::Tray;

    fn sort_key(&self) -> (u32, String) {
        (self.index, String::new())
    }

    fn wrap(node: Node<Self>) -> LayerNode {
        LayerNode::Tray(node)
    }

    fn peel(node: &LayerNode) -> Option<&Node<Self>> {
        match node {
            LayerNode::Tray(n) => Some(n),
            _ => None,
        }
    }

    fn peel_mut(node: &mut LayerNode) -> Option<&mut Node<Self>> {
        match node {
            LayerNode::Tray(n) => Some(n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_year_spans_whole_year() {
        let range = ExpiryRange::year(2024).unwrap();
        assert_eq!(range.label, "2024");
        assert_eq!(range.from, 1_704_067_200_000);
        assert_eq!(range.to, 1_735_689_600_000);
    }

    #[test]
    fn test_expiry_month_wraps_december() {
        let range = ExpiryRange::month(2023, 12).unwrap();
        assert_eq!(range.label, "Dec 2023");
        assert_eq!(range.to, ExpiryRange::year(2024).unwrap().from);
        assert!(ExpiryRange::month(2023, 13).is_none());
    }

    #[test]
    fn test_tray_serializes_unset_fields_as_null() {
        let json = serde_json::to_value(TrayFields::at_index(2)).unwrap();
        assert!(json["weight"].is_null());
        assert_eq!(json["index"], 2);
    }
}
