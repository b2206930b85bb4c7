mod policy;
mod store;

pub use policy::{next_streak, StreakRecord};
pub use store::{MemoryStreakStore, StreakStore, STREAK_KEY};
