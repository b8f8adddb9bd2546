use serde::{Deserialize, Serialize};

/// Label shown for "no restriction" in category pickers.
pub const ALL: &str = "All";

/// A category or subcategory selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selection {
  #[default]
  All,
  Only(String),
}

impl Selection {
  /// Compare against an already-normalized label.
  pub fn matches(&self, label: &str) -> bool {
    match self {
      Self::All => true,
      Self::Only(selected) => selected == label,
    }
  }

  pub fn as_only(&self) -> Option<&str> {
    match self {
      Self::All => None,
      Self::Only(selected) => Some(selected),
    }
  }
}

impl From<String> for Selection {
  fn from(raw: String) -> Self {
    if raw == ALL { Self::All } else { Self::Only(raw) }
  }
}

impl From<&str> for Selection {
  fn from(raw: &str) -> Self {
    Self::from(raw.to_string())
  }
}

impl From<Selection> for String {
  fn from(selection: Selection) -> Self {
    match selection {
      Selection::All => ALL.to_string(),
      Selection::Only(label) => label,
    }
  }
}

/// What the user currently has selected in the deck view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
  pub selected_category: Selection,
  pub selected_sub_category: Selection,
  pub show_due_today_only: bool,
  pub show_starred_only: bool,
}

impl FilterConfig {
  /// Every active card, no restriction.
  pub fn all() -> Self {
    Self::default()
  }

  pub fn category(mut self, category: impl Into<Selection>) -> Self {
    self.selected_category = category.into();
    self
  }

  pub fn sub_category(mut self, sub_category: impl Into<Selection>) -> Self {
    self.selected_sub_category = sub_category.into();
    self
  }

  pub fn due_today_only(mut self) -> Self {
    self.show_due_today_only = true;
    self
  }

  pub fn starred_only(mut self) -> Self {
    self.show_starred_only = true;
    self
  }
}
