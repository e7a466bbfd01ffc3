//! Client module — the `DockerOps` seam plus its live and fake implementations.

pub mod docker;
pub mod fake;
pub mod live;

pub use docker::{DockerOps, EventStream};
