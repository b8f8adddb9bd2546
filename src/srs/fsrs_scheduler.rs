use chrono::{DateTime, Duration, Utc};
use fsrs::{ItemState, MemoryState, NextStates, FSRS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::params::{
  SchedulerParams, DEFAULT_EASE_FACTOR, MAX_DIFFICULTY, MIN_DIFFICULTY, MIN_EASE_FACTOR, MIN_STABILITY,
};
use crate::domain::{Card, Rating};
use crate::error::Error;

const EASE_BONUS_EASY: f64 = 0.15;
const EASE_PENALTY_HARD: f64 = 0.15;
const EASE_PENALTY_AGAIN: f64 = 0.20;

// FNV-1a offset basis and prime
const SEED_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const SEED_PRIME: u64 = 0x0100_0000_01b3;

/// Next-state candidates for every rating, indexed again/hard/good/easy.
#[derive(Debug, Clone, Copy)]
struct ReviewPlan {
  difficulty: [f64; 4],
  stability: [f64; 4],
  interval: [u32; 4],
}

fn index(rating: Rating) -> usize {
  match rating {
    Rating::Again => 0,
    Rating::Hard => 1,
    Rating::Good => 2,
    Rating::Easy => 3,
  }
}

/// FSRS review scheduler with injected parameters.
///
/// The memory model (difficulty, stability, retention-targeted interval) comes
/// from the `fsrs` crate; this type adds the reset, cap, jitter and clamp rules
/// on top of its next states.
pub struct Scheduler {
  params: SchedulerParams,
  fsrs: FSRS,
}

impl std::fmt::Debug for Scheduler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Scheduler").field("params", &self.params).finish_non_exhaustive()
  }
}

impl Default for Scheduler {
  fn default() -> Self {
    Self::new(SchedulerParams::default()).expect("Default scheduler parameters are valid")
  }
}

impl Scheduler {
  pub fn new(params: SchedulerParams) -> Result<Self, Error> {
    params.validate()?;
    let weights: Vec<f32> = params.weights.iter().map(|w| *w as f32).collect();
    let fsrs = FSRS::new(Some(weights.as_slice()))
      .map_err(|e| Error::InvalidParams("weights".to_string(), e.to_string()))?;
    Ok(Self { params, fsrs })
  }

  pub fn params(&self) -> &SchedulerParams {
    &self.params
  }

  /// Apply `rating` to `card` at `now` and return the updated card.
  ///
  /// Every numeric field of the result is finite and within its domain:
  /// difficulty in [1, 10], stability > 0, interval in [1, maximum_interval],
  /// ease factor >= 1.3. The returned card has no explicit level.
  pub fn schedule(&self, card: &Card, rating: Rating, now: DateTime<Utc>) -> Card {
    let plan = self.plan(card, now);
    let i = index(rating);
    let interval = plan.interval[i];

    let mut next = card.clone();
    next.difficulty = plan.difficulty[i];
    next.stability = plan.stability[i];
    next.interval = interval;
    next.due_date = Some(
      now
        .checked_add_signed(Duration::days(i64::from(interval)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC),
    );
    next.last_reviewed = Some(now);
    if rating.is_correct() {
      next.repetitions = card.repetitions.saturating_add(1);
    }
    next.review_count = card.review_count.saturating_add(1);
    next.ease_factor = next_ease_factor(card.ease_factor, rating);
    next.level = None;

    tracing::debug!(
      card_id = %card.id,
      rating = %rating,
      interval,
      difficulty = next.difficulty,
      stability = next.stability,
      "Scheduled card"
    );

    next
  }

  /// Interval in days each rating would produce, for button labels.
  pub fn preview(&self, card: &Card, now: DateTime<Utc>) -> [(Rating, u32); 4] {
    let plan = self.plan(card, now);
    Rating::ALL.map(|rating| (rating, plan.interval[index(rating)]))
  }

  fn plan(&self, card: &Card, now: DateTime<Utc>) -> ReviewPlan {
    let first_review = card.review_count == 0;
    let difficulty = finite_or(card.difficulty, 5.0).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
    let stability = if card.stability.is_finite() && card.stability > 0.0 {
      card.stability.clamp(MIN_STABILITY, self.max_interval())
    } else {
      self.params.initial_stability()
    };

    // A card that was never reviewed has no memory state yet
    let memory = (!first_review).then_some(MemoryState {
      stability: stability as f32,
      difficulty: difficulty as f32,
    });

    // (difficulty, stability, interval in days) per rating
    let states: [(f64, f64, f64); 4] = match self.next_states(card, memory, elapsed_days(card, now)) {
      Some(next) => [&next.again, &next.hard, &next.good, &next.easy].map(|state: &ItemState| {
        (
          f64::from(state.memory.difficulty),
          f64::from(state.memory.stability),
          f64::from(state.interval),
        )
      }),
      None => [(difficulty, stability, stability); 4],
    };

    let mut plan = ReviewPlan {
      difficulty: [difficulty; 4],
      stability: [stability; 4],
      interval: [1; 4],
    };
    for rating in Rating::ALL {
      let i = index(rating);
      let (next_difficulty, next_stability, _) = states[i];

      let next_difficulty = finite_or(next_difficulty, difficulty);
      // Good never makes a known card harder
      let next_difficulty = if rating == Rating::Good && !first_review {
        next_difficulty.min(difficulty)
      } else {
        next_difficulty
      };
      plan.difficulty[i] = next_difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);

      plan.stability[i] = match rating {
        Rating::Again => self.params.initial_stability(),
        _ => finite_or(next_stability, stability).clamp(MIN_STABILITY, self.max_interval()),
      };
    }

    let jitter = self.jitter(card);
    let good = self.clamp_interval(states[2].2 * (1.0 + jitter));
    let easy = self
      .clamp_interval(states[3].2 * self.params.easy_bonus * (1.0 + jitter))
      .max(good);
    // Hard stays strictly below good whenever good leaves room for it
    let hard = self
      .clamp_interval(self.params.hard_interval * states[1].2)
      .min(good.saturating_sub(1).max(1));

    plan.interval = [self.params.again_interval, hard, good, easy];
    plan
  }

  fn next_states(&self, card: &Card, memory: Option<MemoryState>, elapsed: u32) -> Option<NextStates> {
    match self
      .fsrs
      .next_states(memory, self.params.request_retention as f32, elapsed)
    {
      Ok(next) => Some(next),
      Err(e) => {
        tracing::warn!(card_id = %card.id, "Keeping memory state, FSRS rejected it: {}", e);
        None
      }
    }
  }

  fn clamp_interval(&self, days: f64) -> u32 {
    if days.is_nan() {
      return 1;
    }
    days.round().clamp(1.0, self.max_interval()) as u32
  }

  fn max_interval(&self) -> f64 {
    f64::from(self.params.maximum_interval)
  }

  /// Relative jitter in [-fuzz_factor, fuzz_factor], stable for a given card
  /// state so repeated previews agree with the final schedule.
  fn jitter(&self, card: &Card) -> f64 {
    let fuzz = self.params.fuzz_factor;
    if fuzz <= 0.0 {
      return 0.0;
    }
    StdRng::seed_from_u64(jitter_seed(card)).random_range(-fuzz..=fuzz)
  }
}

/// FNV-1a over the card id and review count.
fn jitter_seed(card: &Card) -> u64 {
  card
    .id
    .bytes()
    .chain(card.review_count.to_le_bytes())
    .fold(SEED_OFFSET, |seed, byte| (seed ^ u64::from(byte)).wrapping_mul(SEED_PRIME))
}

/// Whole days since the last review (or creation), never negative.
fn elapsed_days(card: &Card, now: DateTime<Utc>) -> u32 {
  let anchor = card.last_reviewed.or(card.created_at).unwrap_or(now);
  u32::try_from((now - anchor).num_days().max(0)).unwrap_or(u32::MAX)
}

fn next_ease_factor(current: f64, rating: Rating) -> f64 {
  let current = finite_or(current, DEFAULT_EASE_FACTOR);
  let next = match rating {
    Rating::Again => current - EASE_PENALTY_AGAIN,
    Rating::Hard => current - EASE_PENALTY_HARD,
    Rating::Good => current,
    Rating::Easy => current + EASE_BONUS_EASY,
  };
  next.max(MIN_EASE_FACTOR)
}

fn finite_or(value: f64, fallback: f64) -> f64 {
  if value.is_finite() { value } else { fallback }
}
