pub mod card;
pub mod review;

pub use card::{normalize_label, parse_timestamp, scoped_key, Card, UNCATEGORIZED};
pub use review::{Level, Rating};
