pub mod config;
pub mod db;
pub mod deck;
pub mod domain;
pub mod error;
pub mod session;
pub mod srs;

pub use error::{Error, Result};
