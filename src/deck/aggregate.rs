//! Filter & aggregation engine.
//!
//! Every count the UI shows (category picker, subcategory picker, session
//! totals, level breakdown) comes out of [`aggregate`], computed in a single
//! pass over the card collection so the parts always add up to the whole.

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::due::DueWindow;
use super::filter::FilterConfig;
use crate::domain::{scoped_key, Card, Level};
use crate::srs::infer_level;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation<'a> {
  pub visible_cards: Vec<&'a Card>,
  /// Normalized categories available for selection, sorted.
  pub categories: Vec<String>,
  /// Normalized subcategories available for selection, sorted.
  pub sub_categories: Vec<String>,
  /// Visible cards per category, zero for listed categories without any.
  pub category_counts: BTreeMap<String, usize>,
  /// Visible cards per subcategory, zero for listed subcategories without any.
  pub sub_category_counts: BTreeMap<String, usize>,
  /// Visible cards per `"category::subcategory"`.
  pub scoped_sub_category_counts: BTreeMap<String, usize>,
  /// Visible cards per inferred level; every level is present.
  pub level_counts: BTreeMap<Level, usize>,
}

impl Aggregation<'_> {
  /// The "All" count.
  pub fn total(&self) -> usize {
    self.visible_cards.len()
  }

  pub fn category_count(&self, category: &str) -> usize {
    self.category_counts.get(category).copied().unwrap_or(0)
  }

  pub fn sub_category_count(&self, sub_category: &str) -> usize {
    self.sub_category_counts.get(sub_category).copied().unwrap_or(0)
  }
}

/// Filter `cards` and count them, using the local day of `now` as the due
/// window.
///
/// Stages, in order: inactive cards dropped, starred filter, category,
/// subcategory, due window. The category list ignores the category and
/// subcategory selection; the subcategory list ignores only the subcategory
/// selection. With `show_due_today_only` both lists only contain labels that
/// still have a due card.
pub fn aggregate<'a, Tz: TimeZone>(
  cards: &'a [Card],
  filter: &FilterConfig,
  now: &DateTime<Tz>,
) -> Aggregation<'a> {
  aggregate_in_window(cards, filter, &DueWindow::for_day(now))
}

pub fn aggregate_in_window<'a>(
  cards: &'a [Card],
  filter: &FilterConfig,
  window: &DueWindow,
) -> Aggregation<'a> {
  let mut categories = BTreeSet::new();
  let mut sub_categories = BTreeSet::new();
  let mut scoped = BTreeSet::new();
  let mut result = Aggregation::default();

  for card in cards {
    if !card.active || (filter.show_starred_only && !card.starred) {
      continue;
    }
    if filter.show_due_today_only && !window.contains(card) {
      continue;
    }

    let category = card.category_label();
    categories.insert(category);
    if !filter.selected_category.matches(category) {
      continue;
    }

    let sub_category = card.sub_category_label();
    sub_categories.insert(sub_category);
    scoped.insert((category, sub_category));
    if !filter.selected_sub_category.matches(sub_category) {
      continue;
    }

    result.visible_cards.push(card);
    *result.category_counts.entry(category.to_string()).or_insert(0) += 1;
    *result.sub_category_counts.entry(sub_category.to_string()).or_insert(0) += 1;
    *result
      .scoped_sub_category_counts
      .entry(scoped_key(category, sub_category))
      .or_insert(0) += 1;
    *result.level_counts.entry(infer_level(card)).or_insert(0) += 1;
  }

  // Zero rows for everything listed; the consumer decides whether to hide them
  for category in categories.iter().copied().chain(filter.selected_category.as_only()) {
    result.category_counts.entry(category.to_string()).or_insert(0);
  }
  for sub_category in sub_categories.iter().copied().chain(filter.selected_sub_category.as_only()) {
    result.sub_category_counts.entry(sub_category.to_string()).or_insert(0);
  }
  for (category, sub_category) in &scoped {
    result
      .scoped_sub_category_counts
      .entry(scoped_key(category, sub_category))
      .or_insert(0);
  }
  for level in Level::ALL {
    result.level_counts.entry(level).or_insert(0);
  }

  result.categories = categories.into_iter().map(str::to_string).collect();
  result.sub_categories = sub_categories.into_iter().map(str::to_string).collect();

  tracing::trace!(
    visible = result.visible_cards.len(),
    categories = result.categories.len(),
    sub_categories = result.sub_categories.len(),
    "Aggregated cards"
  );

  result
}

/// Visible cards in study order: never-scheduled first, then by due date,
/// ties broken by id.
pub fn study_queue<'a, Tz: TimeZone>(
  cards: &'a [Card],
  filter: &FilterConfig,
  now: &DateTime<Tz>,
) -> Vec<&'a Card> {
  let mut queue = aggregate(cards, filter, now).visible_cards;
  queue.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
  queue
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::deck::filter::Selection;
  use crate::domain::UNCATEGORIZED;
  use chrono::{Duration, FixedOffset, Utc};

  fn tz() -> FixedOffset {
    FixedOffset::east_opt(-5 * 3600).unwrap()
  }

  fn now() -> DateTime<FixedOffset> {
    tz().with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
  }

  fn card(id: &str, category: Option<&str>, sub_category: Option<&str>) -> Card {
    let mut card = Card::new(id, category.map(String::from), sub_category.map(String::from));
    card.due_date = Some((now() - Duration::hours(1)).with_timezone(&Utc));
    card
  }

  fn due_tomorrow(mut card: Card) -> Card {
    card.due_date = Some(tz().with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap().with_timezone(&Utc));
    card
  }

  fn assert_sums(result: &Aggregation, filter: &FilterConfig) {
    let category_total: usize = result.category_counts.values().sum();
    assert_eq!(category_total, result.total());

    let scoped_total: usize = result.scoped_sub_category_counts.values().sum();
    assert_eq!(scoped_total, result.total());

    let level_total: usize = result.level_counts.values().sum();
    assert_eq!(level_total, result.total());

    if let Some(category) = filter.selected_category.as_only() {
      let sub_total: usize = result.sub_category_counts.values().sum();
      assert_eq!(sub_total, result.category_count(category));

      let prefix = format!("{}::", category);
      let scoped_in_category: usize = result
        .scoped_sub_category_counts
        .iter()
        .filter(|(key, _)| key.starts_with(&prefix))
        .map(|(_, count)| count)
        .sum();
      assert_eq!(scoped_in_category, result.category_count(category));
    }
  }

  /// Mixed deck exercising every filter stage.
  fn mixed_deck() -> Vec<Card> {
    let categories = [Some("AWS"), Some("aws"), Some("Amazon LP"), Some(""), None];
    let sub_categories = [Some("EC2"), Some("S3"), Some("   "), None, Some("Ownership")];
    (0..80)
      .map(|i| {
        let mut c = card(&format!("c{:02}", i), categories[i % 5], sub_categories[(i / 5) % 5]);
        c.active = i % 7 != 0;
        c.starred = i % 3 == 0;
        c.due_date = match i % 4 {
          0 => None,
          1 => Some((now() - Duration::days(3)).with_timezone(&Utc)),
          2 => Some(tz().with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap().with_timezone(&Utc)),
          _ => Some(tz().with_ymd_and_hms(2024, 3, 2, 0, 0, 1).unwrap().with_timezone(&Utc)),
        };
        c.difficulty = 1.0 + (i % 10) as f64;
        c.interval = (i % 6) as u32;
        c
      })
      .collect()
  }

  #[test]
  fn test_sum_invariants_across_filters() {
    let cards = mixed_deck();
    let category_choices = ["All", "AWS", "aws", "Amazon LP", UNCATEGORIZED, "Missing"];
    let sub_choices = ["All", "EC2", UNCATEGORIZED, "Ownership", "Missing"];

    for category in category_choices {
      for sub_category in sub_choices {
        for due in [false, true] {
          for starred in [false, true] {
            let filter = FilterConfig {
              selected_category: Selection::from(category),
              selected_sub_category: Selection::from(sub_category),
              show_due_today_only: due,
              show_starred_only: starred,
            };
            let result = aggregate(&cards, &filter, &now());
            assert_sums(&result, &filter);

            for visible in &result.visible_cards {
              assert!(visible.active);
              assert!(!starred || visible.starred);
              assert!(filter.selected_category.matches(visible.category_label()));
              assert!(filter.selected_sub_category.matches(visible.sub_category_label()));
            }
          }
        }
      }
    }
  }

  #[test]
  fn test_scenario_uncategorized_subcategories() {
    let mut cards: Vec<Card> = (0..7)
      .map(|i| card(&format!("named{}", i), Some("Amazon LP"), Some(&format!("Principle {}", i))))
      .collect();
    cards.push(card("empty", Some("Amazon LP"), Some("")));
    cards.push(card("spaces", Some("Amazon LP"), Some("   ")));
    cards.push(card("null", Some("Amazon LP"), None));
    // Missing field and explicit null both deserialize to None
    cards.push(serde_json::from_str(r#"{"id": "missing", "category": "Amazon LP"}"#).unwrap());
    cards.push(serde_json::from_str(r#"{"id": "undefined", "category": "Amazon LP", "subCategory": null}"#).unwrap());

    let filter = FilterConfig::all().category("Amazon LP");
    let result = aggregate(&cards, &filter, &now());

    assert_eq!(result.sub_categories.len(), 8);
    assert!(result.sub_categories.iter().any(|s| s == UNCATEGORIZED));
    assert_eq!(result.sub_category_count(UNCATEGORIZED), 5);
    assert_eq!(result.category_count("Amazon LP"), 12);
    assert_sums(&result, &filter);
  }

  #[test]
  fn test_scenario_case_variants_stay_distinct() {
    let cards = vec![card("upper", Some("AWS"), None), card("lower", Some("aws"), None)];
    let result = aggregate(&cards, &FilterConfig::all(), &now());

    assert_eq!(result.categories, vec!["AWS".to_string(), "aws".to_string()]);
    assert_eq!(result.category_count("AWS"), 1);
    assert_eq!(result.category_count("aws"), 1);
  }

  #[test]
  fn test_scenario_starred_and_due() {
    let mut starred_due = card("hit", Some("AWS"), Some("EC2"));
    starred_due.starred = true;
    let mut starred_later = due_tomorrow(card("later", Some("AWS"), Some("S3")));
    starred_later.starred = true;
    let plain_due = card("plain", Some("Amazon LP"), None);
    let mut starred_inactive = card("inactive", Some("AWS"), Some("EC2"));
    starred_inactive.starred = true;
    starred_inactive.active = false;

    let cards = vec![starred_due, starred_later, plain_due, starred_inactive];
    let filter = FilterConfig::all().due_today_only().starred_only();
    let result = aggregate(&cards, &filter, &now());

    assert_eq!(result.total(), 1);
    assert_eq!(result.visible_cards[0].id, "hit");
    assert_eq!(result.category_counts.values().sum::<usize>(), 1);
    assert_eq!(result.sub_category_counts.values().sum::<usize>(), 1);
    assert_eq!(result.scoped_sub_category_counts.values().sum::<usize>(), 1);
    assert_eq!(result.categories, vec!["AWS".to_string()]);
  }

  #[test]
  fn test_due_boundary_end_of_today() {
    let mut last_second = card("last", None, None);
    last_second.due_date = Some(tz().with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap().with_timezone(&Utc));
    let mut after_midnight = card("next", None, None);
    after_midnight.due_date = Some(tz().with_ymd_and_hms(2024, 3, 2, 0, 0, 1).unwrap().with_timezone(&Utc));

    let cards = vec![last_second, after_midnight];
    let result = aggregate(&cards, &FilterConfig::all().due_today_only(), &now());

    assert_eq!(result.total(), 1);
    assert_eq!(result.visible_cards[0].id, "last");
  }

  #[test]
  fn test_inactive_cards_never_counted() {
    let mut inactive = card("off", Some("Retired"), None);
    inactive.active = false;
    let cards = vec![inactive, card("on", Some("AWS"), None)];

    let result = aggregate(&cards, &FilterConfig::all(), &now());
    assert_eq!(result.total(), 1);
    assert!(!result.categories.iter().any(|c| c == "Retired"));
  }

  #[test]
  fn test_category_list_ignores_due_state_without_due_filter() {
    let cards = vec![card("due", Some("AWS"), None), due_tomorrow(card("later", Some("GCP"), None))];

    let result = aggregate(&cards, &FilterConfig::all(), &now());
    assert_eq!(result.categories, vec!["AWS".to_string(), "GCP".to_string()]);

    let due_only = aggregate(&cards, &FilterConfig::all().due_today_only(), &now());
    assert_eq!(due_only.categories, vec!["AWS".to_string()]);
  }

  #[test]
  fn test_category_list_ignores_selection() {
    let cards = vec![card("a", Some("AWS"), Some("EC2")), card("b", Some("GCP"), Some("GKE"))];
    let filter = FilterConfig::all().category("AWS");
    let result = aggregate(&cards, &filter, &now());

    assert_eq!(result.categories.len(), 2);
    assert_eq!(result.sub_categories, vec!["EC2".to_string()]);
    // Unselected categories appear with an explicit zero
    assert_eq!(result.category_counts.get("GCP"), Some(&0));
    assert_eq!(result.category_count("AWS"), 1);
  }

  #[test]
  fn test_sub_category_list_ignores_sub_selection() {
    let cards = vec![
      card("a", Some("AWS"), Some("EC2")),
      card("b", Some("AWS"), Some("S3")),
      card("c", Some("AWS"), None),
    ];
    let filter = FilterConfig::all().category("AWS").sub_category("S3");
    let result = aggregate(&cards, &filter, &now());

    assert_eq!(result.total(), 1);
    assert_eq!(result.sub_categories.len(), 3);
    assert_eq!(result.sub_category_counts.get("EC2"), Some(&0));
    assert_eq!(result.sub_category_count("S3"), 1);
    assert_eq!(result.category_count("AWS"), 1);
  }

  #[test]
  fn test_selected_category_without_cards_counts_zero() {
    let cards = vec![card("a", Some("AWS"), None)];
    let result = aggregate(&cards, &FilterConfig::all().category("Missing"), &now());

    assert_eq!(result.total(), 0);
    assert_eq!(result.category_counts.get("Missing"), Some(&0));
  }

  #[test]
  fn test_uncategorized_selection_matches_blank_categories() {
    let cards = vec![card("a", Some(""), None), card("b", None, None), card("c", Some("AWS"), None)];
    let result = aggregate(&cards, &FilterConfig::all().category(UNCATEGORIZED), &now());
    assert_eq!(result.total(), 2);
  }

  #[test]
  fn test_level_counts_cover_every_level() {
    let mut hard = card("hard", None, None);
    hard.difficulty = 7.5;
    let mut explicit = card("explicit", None, None);
    explicit.level = Some(Level::Easy);
    let cards = vec![hard, explicit, card("new", None, None)];

    let result = aggregate(&cards, &FilterConfig::all(), &now());
    assert_eq!(result.level_counts.len(), Level::ALL.len());
    assert_eq!(result.level_counts[&Level::Hard], 1);
    assert_eq!(result.level_counts[&Level::Easy], 1);
    assert_eq!(result.level_counts[&Level::New], 1);
    assert_eq!(result.level_counts[&Level::Again], 0);
  }

  #[test]
  fn test_empty_collection() {
    let result = aggregate(&[], &FilterConfig::all().due_today_only(), &now());
    assert_eq!(result.total(), 0);
    assert!(result.categories.is_empty());
    assert!(result.category_counts.is_empty());
    assert_eq!(result.level_counts.values().sum::<usize>(), 0);
  }

  #[test]
  fn test_study_queue_order() {
    let mut overdue = card("b-overdue", None, None);
    overdue.due_date = Some((now() - Duration::days(2)).with_timezone(&Utc));
    let fresh = {
      let mut c = card("z-fresh", None, None);
      c.due_date = None;
      c
    };
    let today_a = card("a-today", None, None);
    let today_b = card("b-today", None, None);
    let later = due_tomorrow(card("later", None, None));

    let cards = vec![today_b, later, overdue, today_a, fresh];
    let queue = study_queue(&cards, &FilterConfig::all().due_today_only(), &now());
    let ids: Vec<&str> = queue.iter().map(|c| c.id.as_str()).collect();

    assert_eq!(ids, vec!["z-fresh", "b-overdue", "a-today", "b-today"]);
  }

  #[test]
  fn test_serializes_for_ui() {
    let cards = vec![card("a", Some("AWS"), None)];
    let result = aggregate(&cards, &FilterConfig::all(), &now());
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["categoryCounts"]["AWS"], 1);
    assert_eq!(json["levelCounts"]["new"], 1);
    assert_eq!(json["visibleCards"][0]["id"], "a");
  }
}
