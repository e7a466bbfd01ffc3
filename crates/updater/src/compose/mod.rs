//! Compose module — the external `docker compose` executor.

pub mod executor;
pub mod fake;

pub use executor::{CommandError, ComposeCli, ComposeOps, ComposeTarget};
