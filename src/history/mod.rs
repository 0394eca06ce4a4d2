//! Generic intent history shared by the animation and voxel domains.

pub mod change;
pub mod intent;
pub mod manager;

pub use change::{ChangeFlags, ChangeSet};
pub use intent::{Intent, Scope, Transaction};
pub use manager::{HistoryAction, HistoryEvent, HistoryManager};
