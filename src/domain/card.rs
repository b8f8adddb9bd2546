use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::review::Level;
use crate::error::Error;
use crate::srs::params::{DEFAULT_EASE_FACTOR, DEFAULT_WEIGHTS};

/// Label every missing or blank category/subcategory collapses to.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Normalize a raw category or subcategory label.
///
/// `None`, empty and whitespace-only labels become [`UNCATEGORIZED`]; anything
/// else is returned untouched. Case variants such as `"AWS"` and `"aws"` stay
/// distinct buckets.
pub fn normalize_label(raw: Option<&str>) -> &str {
  match raw {
    Some(label) if !label.trim().is_empty() => label,
    _ => UNCATEGORIZED,
  }
}

/// Parse an RFC 3339 timestamp coming from the card store.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Error> {
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::InvalidTimestamp(raw.to_string(), e.to_string()))
}

fn default_true() -> bool {
  true
}

fn default_difficulty() -> f64 {
  5.0
}

fn default_stability() -> f64 {
  DEFAULT_WEIGHTS[0]
}

fn default_ease_factor() -> f64 {
  DEFAULT_EASE_FACTOR
}

/// One flashcard's persistent scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
  pub id: String,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub sub_category: Option<String>,
  #[serde(default = "default_true")]
  pub active: bool,
  #[serde(default)]
  pub starred: bool,

  // FSRS fields
  #[serde(default = "default_difficulty")]
  pub difficulty: f64,
  #[serde(default = "default_stability")]
  pub stability: f64,

  // Legacy SM-2 multiplier, display only
  #[serde(default = "default_ease_factor")]
  pub ease_factor: f64,

  #[serde(default)]
  pub interval: u32,
  #[serde(default)]
  pub repetitions: u32,
  #[serde(default)]
  pub review_count: u32,

  /// `None` means never scheduled; such cards are due immediately.
  #[serde(default)]
  pub due_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub last_reviewed: Option<DateTime<Utc>>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,

  /// Explicit display level; derived from the FSRS fields when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub level: Option<Level>,
}

impl Card {
  pub fn new(id: impl Into<String>, category: Option<String>, sub_category: Option<String>) -> Self {
    Self {
      id: id.into(),
      category,
      sub_category,
      active: true,
      starred: false,
      difficulty: default_difficulty(),
      stability: default_stability(),
      ease_factor: DEFAULT_EASE_FACTOR,
      interval: 0,
      repetitions: 0,
      review_count: 0,
      due_date: None,
      last_reviewed: None,
      created_at: None,
      level: None,
    }
  }

  /// Normalized category; the only way consumers should read it.
  pub fn category_label(&self) -> &str {
    normalize_label(self.category.as_deref())
  }

  /// Normalized subcategory.
  pub fn sub_category_label(&self) -> &str {
    normalize_label(self.sub_category.as_deref())
  }

  /// `"category::subcategory"` key used by per-subcategory snapshot counts.
  pub fn scoped_sub_category_key(&self) -> String {
    scoped_key(self.category_label(), self.sub_category_label())
  }

  pub fn is_new(&self) -> bool {
    self.review_count == 0
  }
}

/// Build the `"category::subcategory"` key from already-normalized labels.
pub fn scoped_key(category: &str, sub_category: &str) -> String {
  format!("{}::{}", category, sub_category)
}
