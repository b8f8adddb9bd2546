use crate::domain::{Card, Level};

/// Classify a card for display and statistics.
///
/// An explicit `card.level` wins. Otherwise the first matching rule applies:
/// difficulty >= 8 is `Again`, difficulty >= 7 is `Hard`, difficulty <= 3 with
/// ease factor >= 2.8 is `Easy`, interval >= 4 is `Good`, anything else `New`.
pub fn infer_level(card: &Card) -> Level {
  if let Some(level) = card.level {
    return level;
  }
  if card.difficulty >= 8.0 {
    Level::Again
  } else if card.difficulty >= 7.0 {
    Level::Hard
  } else if card.difficulty <= 3.0 && card.ease_factor >= 2.8 {
    Level::Easy
  } else if card.interval >= 4 {
    Level::Good
  } else {
    Level::New
  }
}
