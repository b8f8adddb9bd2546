//! Stable due counts for a study session.
//!
//! Real-time due counts move while the user studies: the clock crosses into
//! new due dates and sibling cards get rescheduled. A [`StableSnapshot`]
//! freezes the due counts once per local calendar day and only goes down as
//! cards are completed. It is expected to drift from the real-time counts
//! during the day (deactivated or renamed cards are not picked up) and is
//! rebuilt from scratch on the next day.

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use crate::db::LogOnError;
use crate::deck::{aggregate, FilterConfig};
use crate::domain::{scoped_key, Card};
use crate::error::{Error, Result};

/// Frozen due-count baseline for one user and one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StableSnapshot {
  pub date: NaiveDate,
  pub initial_due_count_by_category: BTreeMap<String, u32>,
  /// Keyed by `"category::subcategory"`.
  pub initial_due_count_by_sub_category: BTreeMap<String, u32>,
  #[serde(default)]
  pub completed_count_by_category: BTreeMap<String, u32>,
  #[serde(default)]
  pub completed_count_by_sub_category: BTreeMap<String, u32>,
  /// Cards that were counted as due when the snapshot was taken.
  #[serde(default)]
  pub due_card_ids: BTreeSet<String>,
}

fn to_count(n: usize) -> u32 {
  u32::try_from(n).unwrap_or(u32::MAX)
}

impl StableSnapshot {
  /// Count today's due cards across every category.
  pub fn capture<Tz: TimeZone>(cards: &[Card], now: &DateTime<Tz>) -> Self {
    let due = aggregate(cards, &FilterConfig::all().due_today_only(), now);

    Self {
      date: now.date_naive(),
      initial_due_count_by_category: due
        .category_counts
        .iter()
        .map(|(category, n)| (category.clone(), to_count(*n)))
        .collect(),
      initial_due_count_by_sub_category: due
        .scoped_sub_category_counts
        .iter()
        .map(|(key, n)| (key.clone(), to_count(*n)))
        .collect(),
      completed_count_by_category: BTreeMap::new(),
      completed_count_by_sub_category: BTreeMap::new(),
      due_card_ids: due.visible_cards.iter().map(|card| card.id.clone()).collect(),
    }
  }

  pub fn is_for_day<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
    self.date == now.date_naive()
  }

  pub fn was_due_at_snapshot(&self, card: &Card) -> bool {
    self.due_card_ids.contains(&card.id)
  }

  /// Count one completed review against the card's category and subcategory.
  pub fn record_completion(&mut self, card: &Card) {
    let category = self
      .completed_count_by_category
      .entry(card.category_label().to_string())
      .or_insert(0);
    *category = category.saturating_add(1);

    let sub_category = self
      .completed_count_by_sub_category
      .entry(card.scoped_sub_category_key())
      .or_insert(0);
    *sub_category = sub_category.saturating_add(1);
  }

  pub fn remaining_for_category(&self, category: &str) -> u32 {
    remaining(
      &self.initial_due_count_by_category,
      &self.completed_count_by_category,
      category,
    )
  }

  pub fn remaining_for_sub_category(&self, category: &str, sub_category: &str) -> u32 {
    remaining(
      &self.initial_due_count_by_sub_category,
      &self.completed_count_by_sub_category,
      &scoped_key(category, sub_category),
    )
  }

  /// Remaining count for the "All" row: the sum of per-category remainders.
  pub fn remaining_total(&self) -> u32 {
    self
      .initial_due_count_by_category
      .keys()
      .map(|category| self.remaining_for_category(category))
      .fold(0u32, u32::saturating_add)
  }
}

fn remaining(initial: &BTreeMap<String, u32>, completed: &BTreeMap<String, u32>, key: &str) -> u32 {
  let initial = initial.get(key).copied().unwrap_or(0);
  let completed = completed.get(key).copied().unwrap_or(0);
  initial.saturating_sub(completed)
}

/// Return `existing` if it belongs to `now`'s day, otherwise a fresh capture.
pub fn get_or_init_snapshot<Tz: TimeZone>(
  existing: Option<StableSnapshot>,
  cards: &[Card],
  now: &DateTime<Tz>,
) -> StableSnapshot {
  match existing {
    Some(snapshot) if snapshot.is_for_day(now) => snapshot,
    stale => {
      if let Some(old) = stale {
        tracing::info!("Resetting stable due counts from {} to {}", old.date, now.date_naive());
      }
      StableSnapshot::capture(cards, now)
    }
  }
}

/// Persistence seam for snapshots, keyed by user and day.
pub trait SnapshotStore {
  fn load(&self, user_id: &str, date: NaiveDate) -> Result<Option<StableSnapshot>>;
  fn save(&self, user_id: &str, snapshot: &StableSnapshot) -> Result<()>;
  /// Drop snapshots older than `date`, for every user. Returns how many went.
  fn prune_before(&self, date: NaiveDate) -> Result<usize>;
}

/// Process-local store, e.g. for a single-device session.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
  snapshots: Mutex<HashMap<(String, NaiveDate), StableSnapshot>>,
}

impl MemorySnapshotStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl MemorySnapshotStore {
  fn snapshots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, NaiveDate), StableSnapshot>>> {
    self
      .snapshots
      .lock()
      .map_err(|_| Error::Storage("snapshot store lock poisoned".to_string()))
  }

  pub fn snapshot_count(&self) -> Result<usize> {
    Ok(self.snapshots()?.len())
  }
}

impl SnapshotStore for MemorySnapshotStore {
  fn load(&self, user_id: &str, date: NaiveDate) -> Result<Option<StableSnapshot>> {
    Ok(self.snapshots()?.get(&(user_id.to_string(), date)).cloned())
  }

  fn save(&self, user_id: &str, snapshot: &StableSnapshot) -> Result<()> {
    self
      .snapshots()?
      .insert((user_id.to_string(), snapshot.date), snapshot.clone());
    Ok(())
  }

  fn prune_before(&self, date: NaiveDate) -> Result<usize> {
    let mut snapshots = self.snapshots()?;
    let before = snapshots.len();
    snapshots.retain(|(_, day), _| *day >= date);
    Ok(before - snapshots.len())
  }
}

/// Serializes snapshot read-modify-write cycles against a store.
pub struct StableCountTracker<S: SnapshotStore> {
  store: S,
  guard: Mutex<()>,
}

impl<S: SnapshotStore> StableCountTracker<S> {
  pub fn new(store: S) -> Self {
    Self {
      store,
      guard: Mutex::new(()),
    }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Today's snapshot for `user_id`, captured from `cards` on first use.
  ///
  /// Capturing a new day's snapshot also drops snapshots from before
  /// yesterday. Yesterday stays because users in other time zones may still
  /// be on it.
  pub fn snapshot_for<Tz: TimeZone>(
    &self,
    user_id: &str,
    cards: &[Card],
    now: &DateTime<Tz>,
  ) -> Result<StableSnapshot> {
    let _lock = self.lock()?;
    let existing = self.store.load(user_id, now.date_naive())?;
    let captured = existing.is_none();
    let snapshot = get_or_init_snapshot(existing, cards, now);
    if !captured {
      return Ok(snapshot);
    }

    self.store.save(user_id, &snapshot)?;
    if let Some(yesterday) = snapshot.date.pred_opt() {
      self
        .store
        .prune_before(yesterday)
        .log_warn("Failed to prune old stable snapshots");
    }
    tracing::info!(
      user_id,
      date = %snapshot.date,
      due = snapshot.remaining_total(),
      "Captured stable due counts"
    );
    Ok(snapshot)
  }

  /// Record a review of `card` if it was counted as due in today's snapshot.
  ///
  /// Returns the updated snapshot, or `None` when no snapshot exists yet.
  pub fn record_completion<Tz: TimeZone>(
    &self,
    user_id: &str,
    card: &Card,
    now: &DateTime<Tz>,
  ) -> Result<Option<StableSnapshot>> {
    let _lock = self.lock()?;
    let Some(mut snapshot) = self.store.load(user_id, now.date_naive())? else {
      tracing::debug!(user_id, card_id = %card.id, "No stable snapshot for today, completion ignored");
      return Ok(None);
    };

    if !snapshot.was_due_at_snapshot(card) {
      tracing::debug!(user_id, card_id = %card.id, "Card was not due at snapshot time");
      return Ok(Some(snapshot));
    }

    snapshot.record_completion(card);
    self.store.save(user_id, &snapshot)?;
    Ok(Some(snapshot))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
    self
      .guard
      .lock()
      .map_err(|_| Error::Storage("stable count tracker lock poisoned".to_string()))
  }
}
