pub mod config;
pub mod session;
pub mod stats;
pub mod streak;
