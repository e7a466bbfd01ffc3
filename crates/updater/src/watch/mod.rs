//! Watch module — event filtering, cooldown bookkeeping, and the watch loop.

pub mod cooldown;
pub mod filter;
pub mod watcher;

pub use cooldown::{CooldownTracker, COOLDOWN_WINDOW_SECS};
pub use watcher::{Dispatch, EventWatcher, StreamEndPolicy, WatchError};
