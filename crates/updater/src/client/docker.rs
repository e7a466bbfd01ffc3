//! Docker trait — abstract interface for the Docker operations the watcher uses.
//!
//! `live.rs` provides the real Bollard-backed implementation.
//! `fake.rs` provides a test double.

use std::pin::Pin;

use crate::docker::client::DockerError;
use crate::docker::event::EventFilter;
use crate::docker::inventory::ContainerInfo;

/// Stream of engine events, boxed so the trait stays object-safe.
pub type EventStream<'a> =
    Pin<Box<dyn tokio_stream::Stream<Item = Result<bollard::models::EventMessage, DockerError>> + Send + 'a>>;

/// Unified async interface over the Docker daemon.
///
/// Object-safe thanks to `Pin<Box<…>>` returns.
/// Implementations must be `Send + Sync` so they can be shared behind an `Arc`.
pub trait DockerOps: Send + Sync {
    // ── Container queries ───────────────────────────────────────

    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerInfo, DockerError>> + Send + 'a>>;

    // ── Events ──────────────────────────────────────────────────

    fn stream_events(&self, filter: EventFilter) -> EventStream<'_>;

    // ── Registry ────────────────────────────────────────────────

    fn registry_login<'a>(
        &'a self,
        server: &'a str,
        username: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>>;
}
