pub mod aggregate;
pub mod due;
pub mod filter;

pub use aggregate::{aggregate, aggregate_in_window, study_queue, Aggregation};
pub use due::{end_of_day, DueWindow};
pub use filter::{FilterConfig, Selection};
