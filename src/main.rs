use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flashcard_srs::config::{self, Settings};
use flashcard_srs::db::SqliteSnapshotStore;
use flashcard_srs::deck::{aggregate, FilterConfig};
use flashcard_srs::domain::{Card, Rating};
use flashcard_srs::session::StableCountTracker;
use flashcard_srs::srs::Scheduler;
use flashcard_srs::{Error, Result};

// ══════════════════════════════════════════════════════════════════════════
// CLI Arguments
// ══════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "flashcard-srs")]
#[command(author, version, about = "Spaced repetition scheduling and deck counts", long_about = None)]
struct Args {
  /// Config file (defaults to $FLASHCARD_CONFIG, then ./config.toml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print visible cards and counts for a filter as JSON
  Report {
    /// JSON array of cards
    cards: PathBuf,
    #[arg(long, default_value = "All")]
    category: String,
    #[arg(long, default_value = "All")]
    sub_category: String,
    /// Only cards due before the end of today
    #[arg(long)]
    due: bool,
    #[arg(long)]
    starred: bool,
  },
  /// Apply a rating to one card and write the collection back
  Review {
    cards: PathBuf,
    card_id: String,
    /// again, hard, good or easy
    rating: Rating,
    #[arg(long, default_value = "local")]
    user: String,
  },
  /// Print today's stable due counts next to the real-time ones
  Stable {
    cards: PathBuf,
    #[arg(long, default_value = "local")]
    user: String,
  },
}

// ══════════════════════════════════════════════════════════════════════════
// Main Entry Point
// ══════════════════════════════════════════════════════════════════════════

fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "flashcard_srs=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let args = Args::parse();
  match run(args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!("{}", e);
      eprintln!("Error: {}", e.user_message());
      ExitCode::FAILURE
    }
  }
}

fn run(args: Args) -> Result<()> {
  let settings = config::load_settings(args.config.as_deref())?;

  match args.command {
    Command::Report { cards, category, sub_category, due, starred } => {
      let cards = load_cards(&cards)?;
      let filter = FilterConfig {
        selected_category: category.into(),
        selected_sub_category: sub_category.into(),
        show_due_today_only: due,
        show_starred_only: starred,
      };
      let result = aggregate(&cards, &filter, &Local::now());
      println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Command::Review { cards: path, card_id, rating, user } => {
      review(&settings, &path, &card_id, rating, &user)?;
    }
    Command::Stable { cards, user } => {
      let cards = load_cards(&cards)?;
      let now = Local::now();
      let tracker = open_tracker(&settings)?;
      let snapshot = tracker.snapshot_for(&user, &cards, &now)?;
      let real_time = aggregate(&cards, &FilterConfig::all().due_today_only(), &now);

      println!("{:<30} {:>8} {:>8}", "category", "stable", "now");
      for category in &real_time.categories {
        println!(
          "{:<30} {:>8} {:>8}",
          category,
          snapshot.remaining_for_category(category),
          real_time.category_count(category)
        );
      }
      println!("{:<30} {:>8} {:>8}", "All", snapshot.remaining_total(), real_time.total());
    }
  }
  Ok(())
}

fn review(settings: &Settings, path: &Path, card_id: &str, rating: Rating, user: &str) -> Result<()> {
  let mut cards = load_cards(path)?;
  let scheduler = Scheduler::new(settings.scheduler.clone())?;
  let tracker = open_tracker(settings)?;
  let now = Local::now();

  // Baseline must exist before the card's due date moves
  tracker.snapshot_for(user, &cards, &now)?;

  let index = cards
    .iter()
    .position(|c| c.id == card_id)
    .ok_or_else(|| Error::CardNotFound(card_id.to_string()))?;
  let updated = scheduler.schedule(&cards[index], rating, now.with_timezone(&Utc));
  let snapshot = tracker.record_completion(user, &cards[index], &now)?;
  cards[index] = updated;
  save_cards(path, &cards)?;

  let card = &cards[index];
  println!(
    "{} -> {} day(s), due {}",
    card.id,
    card.interval,
    card.due_date.map(|d| d.with_timezone(&Local).to_rfc3339()).unwrap_or_default()
  );
  if let Some(snapshot) = snapshot {
    println!(
      "{} remaining in {}, {} remaining today",
      snapshot.remaining_for_category(card.category_label()),
      card.category_label(),
      snapshot.remaining_total()
    );
  }
  Ok(())
}

fn open_tracker(settings: &Settings) -> Result<StableCountTracker<SqliteSnapshotStore>> {
  let store = SqliteSnapshotStore::open(&settings.snapshot_db)?;
  Ok(StableCountTracker::new(store))
}

fn load_cards(path: &Path) -> Result<Vec<Card>> {
  let json = std::fs::read_to_string(path)
    .map_err(|e| Error::Io(path.display().to_string(), e.to_string()))?;
  Ok(serde_json::from_str(&json)?)
}

fn save_cards(path: &Path, cards: &[Card]) -> Result<()> {
  let json = serde_json::to_string_pretty(cards)?;
  std::fs::write(path, json).map_err(|e| Error::Io(path.display().to_string(), e.to_string()))
}
