pub mod fsrs_scheduler;
pub mod level;
pub mod params;

pub use fsrs_scheduler::Scheduler;
pub use level::infer_level;
pub use params::SchedulerParams;
