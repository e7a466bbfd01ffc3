//! Filter — which engine events and images the watcher reacts to.

use bollard::models::{EventMessage, EventMessageTypeEnum};

/// Container actions that mean the service went down.
pub const LIFECYCLE_ACTIONS: &[&str] = &["die", "restart"];

/// True for container-scoped events whose action is exactly `die` or `restart`.
pub fn is_lifecycle_event(event: &EventMessage) -> bool {
    event.typ == Some(EventMessageTypeEnum::CONTAINER)
        && event
            .action
            .as_deref()
            .is_some_and(|action| LIFECYCLE_ACTIONS.contains(&action))
}

/// The actor (container) id of an event, if the daemon sent one.
pub fn actor_id(event: &EventMessage) -> Option<&str> {
    event
        .actor
        .as_ref()
        .and_then(|a| a.id.as_deref())
        .filter(|id| !id.is_empty())
}

/// Substring match, so registry-prefixed or digest-qualified references
/// (`ghcr.io/org/app:latest@sha256:…`) still match `ghcr.io/org/app`.
pub fn image_matches(image: &str, tracked: &str) -> bool {
    image.contains(tracked)
}
