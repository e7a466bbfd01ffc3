//! Fake — test double for Docker operations.
//!
//! Provides a deterministic [`FakeDocker`] that implements [`DockerOps`]
//! using in-memory state. Useful for unit-testing the watcher without a
//! running Docker daemon.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bollard::models::{EventActor, EventMessage, EventMessageTypeEnum};

use crate::client::docker::{DockerOps, EventStream};
use crate::docker::client::DockerError;
use crate::docker::event::EventFilter;
use crate::docker::inventory::ContainerInfo;

// ── In-memory state ─────────────────────────────────────────────

/// Mutable inner state protected by a mutex.
#[derive(Default)]
struct Inner {
    containers: HashMap<String, ContainerInfo>,
    /// One entry per future `stream_events` call, consumed in order.
    subscriptions: VecDeque<Vec<Result<EventMessage, DockerError>>>,
    /// Filters seen by `stream_events`, in call order.
    subscribed_with: Vec<EventFilter>,
    /// When set, every inspect fails with `ConnectionFailed(msg)`.
    inspect_failure: Option<String>,
    inspect_calls: usize,
    logins: Vec<(String, String)>,
    login_failure: Option<String>,
}

/// A fake Docker client for deterministic testing.
pub struct FakeDocker {
    inner: Mutex<Inner>,
}

impl FakeDocker {
    /// Create an empty fake Docker client.
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a container into the fake store.
    pub fn add_container(&self, id: &str, name: &str, image: &str) {
        self.state().containers.insert(
            id.to_string(),
            ContainerInfo {
                id: id.to_string(),
                name: name.to_string(),
                image: image.to_string(),
            },
        );
    }

    /// Drop a container so later inspects return `ContainerNotFound`.
    pub fn remove_container(&self, id: &str) {
        self.state().containers.remove(id);
    }

    /// Queue the items the next `stream_events` call yields before ending.
    pub fn push_subscription(&self, items: Vec<Result<EventMessage, DockerError>>) {
        self.state().subscriptions.push_back(items);
    }

    /// Make every subsequent inspect fail with a non-404 error.
    pub fn fail_inspect(&self, message: &str) {
        self.state().inspect_failure = Some(message.to_string());
    }

    /// Make every subsequent login fail.
    pub fn fail_login(&self, message: &str) {
        self.state().login_failure = Some(message.to_string());
    }

    pub fn inspect_calls(&self) -> usize {
        self.state().inspect_calls
    }

    pub fn subscribed_with(&self) -> Vec<EventFilter> {
        self.state().subscribed_with.clone()
    }

    /// `(server, username)` pairs of every login attempt.
    pub fn logins(&self) -> Vec<(String, String)> {
        self.state().logins.clone()
    }
}

impl Default for FakeDocker {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an engine event the way the daemon reports it.
pub fn event(typ: EventMessageTypeEnum, action: &str, actor_id: &str, time: i64) -> EventMessage {
    EventMessage {
        typ: Some(typ),
        action: Some(action.to_string()),
        actor: Some(EventActor {
            id: Some(actor_id.to_string()),
            attributes: None,
        }),
        time: Some(time),
        ..Default::default()
    }
}

/// Shorthand for a container-scoped event.
pub fn container_event(action: &str, actor_id: &str, time: i64) -> EventMessage {
    event(EventMessageTypeEnum::CONTAINER, action, actor_id, time)
}

// ── DockerOps implementation ────────────────────────────────────

impl DockerOps for FakeDocker {
    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerInfo, DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state();
            state.inspect_calls += 1;
            if let Some(msg) = &state.inspect_failure {
                return Err(DockerError::ConnectionFailed(msg.clone()));
            }
            state.containers.get(id)
                .cloned()
                .ok_or_else(|| DockerError::ContainerNotFound(id.to_string()))
        })
    }

    fn stream_events(&self, filter: EventFilter) -> EventStream<'_> {
        let mut state = self.state();
        state.subscribed_with.push(filter);
        let items = state.subscriptions.pop_front().unwrap_or_default();
        Box::pin(tokio_stream::iter(items))
    }

    fn registry_login<'a>(
        &'a self,
        server: &'a str,
        username: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state();
            state.logins.push((server.to_string(), username.to_string()));
            if username.is_empty() || password.is_empty() {
                return Err(DockerError::LoginFailed(
                    "registry username or password is not set".to_string(),
                ));
            }
            match &state.login_failure {
                Some(msg) => Err(DockerError::LoginFailed(msg.clone())),
                None => Ok(()),
            }
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────
