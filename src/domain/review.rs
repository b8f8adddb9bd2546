use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Outcome the user submits for a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
  Again,
  Hard,
  Good,
  Easy,
}

impl Rating {
  pub const ALL: [Rating; 4] = [Self::Again, Self::Hard, Self::Good, Self::Easy];

  /// Parse the numeric button index (1 = again ... 4 = easy).
  pub fn from_u8(value: u8) -> Result<Self, Error> {
    match value {
      1 => Ok(Self::Again),
      2 => Ok(Self::Hard),
      3 => Ok(Self::Good),
      4 => Ok(Self::Easy),
      _ => Err(Error::InvalidRating(value.to_string())),
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Again => "again",
      Self::Hard => "hard",
      Self::Good => "good",
      Self::Easy => "easy",
    }
  }

  /// FSRS grade value (1-4).
  pub fn grade(&self) -> f64 {
    match self {
      Self::Again => 1.0,
      Self::Hard => 2.0,
      Self::Good => 3.0,
      Self::Easy => 4.0,
    }
  }

  pub fn is_correct(&self) -> bool {
    !matches!(self, Self::Again)
  }
}

impl FromStr for Rating {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "again" => Ok(Self::Again),
      "hard" => Ok(Self::Hard),
      "good" => Ok(Self::Good),
      "easy" => Ok(Self::Easy),
      _ => Err(Error::InvalidRating(s.to_string())),
    }
  }
}

impl std::fmt::Display for Rating {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Display/statistics bucket for a card.
///
/// Either stored explicitly on the card or derived by
/// [`crate::srs::infer_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  Again,
  Hard,
  Good,
  Easy,
  New,
}

impl Level {
  pub const ALL: [Level; 5] = [Self::Again, Self::Hard, Self::Good, Self::Easy, Self::New];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Again => "again",
      Self::Hard => "hard",
      Self::Good => "good",
      Self::Easy => "easy",
      Self::New => "new",
    }
  }
}

impl From<Rating> for Level {
  fn from(rating: Rating) -> Self {
    match rating {
      Rating::Again => Self::Again,
      Rating::Hard => Self::Hard,
      Rating::Good => Self::Good,
      Rating::Easy => Self::Easy,
    }
  }
}
