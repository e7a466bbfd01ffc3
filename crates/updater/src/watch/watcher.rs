//! Watcher — consumes the Docker event stream and dispatches restarts.
//!
//! Handling is sequential: while a restart runs, no further events are read,
//! so the daemon's delivery buffer provides backpressure. Every dispatch
//! claims the cooldown entry *before* the restart starts, which keeps a
//! second event that arrives mid-restart from starting another sequence.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bollard::models::EventMessage;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use super::cooldown::CooldownTracker;
use super::filter::{actor_id, image_matches, is_lifecycle_event, LIFECYCLE_ACTIONS};
use crate::client::DockerOps;
use crate::docker::event::EventFilter;
use crate::docker::inventory::normalize_name;
use crate::restart::{RestartState, Restarter};

/// Upper bound for the resubscribe backoff.
const MAX_RESUBSCRIBE_BACKOFF: Duration = Duration::from_secs(60);

/// What to do once the daemon closes the event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamEndPolicy {
    /// Return [`WatchError::StreamEnded`] and let the supervisor restart us.
    #[default]
    Exit,
    /// Wait, then subscribe again from the last seen event time.
    Resubscribe,
}

impl FromStr for StreamEndPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exit" => Ok(StreamEndPolicy::Exit),
            "resubscribe" => Ok(StreamEndPolicy::Resubscribe),
            other => Err(format!(
                "unknown stream end policy '{}' (expected 'exit' or 'resubscribe')",
                other
            )),
        }
    }
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Docker event stream ended")]
    StreamEnded,
}

/// How a single event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not a container `die`/`restart` event, or no actor id or name.
    Ignored,
    /// The container was gone by the time we inspected it.
    Vanished,
    /// Inspection failed for another reason; the event was dropped.
    InspectFailed,
    /// The container runs some other image.
    Untracked,
    /// Tracked, but dispatched too recently.
    CoolingDown { remaining_secs: i64 },
    /// A restart sequence ran to this terminal state.
    Restarted(RestartState),
}

pub struct EventWatcher {
    docker: Arc<dyn DockerOps>,
    cooldown: Arc<CooldownTracker>,
    restarter: Restarter,
    tracked_image: String,
    on_stream_end: StreamEndPolicy,
    resubscribe_backoff: Duration,
}

impl EventWatcher {
    pub fn new(docker: Arc<dyn DockerOps>, restarter: Restarter, tracked_image: impl Into<String>) -> Self {
        Self {
            docker,
            cooldown: Arc::new(CooldownTracker::default()),
            restarter,
            tracked_image: tracked_image.into(),
            on_stream_end: StreamEndPolicy::default(),
            resubscribe_backoff: Duration::from_secs(5),
        }
    }

    /// Share a tracker with other watchers or with test code.
    pub fn with_cooldown(mut self, cooldown: Arc<CooldownTracker>) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_stream_end_policy(mut self, policy: StreamEndPolicy, backoff: Duration) -> Self {
        self.on_stream_end = policy;
        self.resubscribe_backoff = backoff;
        self
    }

    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    pub fn tracked_image(&self) -> &str {
        &self.tracked_image
    }

    /// First wait after an empty subscription, never above the cap.
    fn initial_backoff(&self) -> Duration {
        self.resubscribe_backoff.min(MAX_RESUBSCRIBE_BACKOFF)
    }

    fn subscription_filter(since: Option<i64>) -> EventFilter {
        EventFilter {
            types: vec!["container".to_string()],
            actions: LIFECYCLE_ACTIONS.iter().map(|a| a.to_string()).collect(),
            since,
        }
    }

    /// Watch events until the subscription ends.
    ///
    /// Stream errors are logged and reading continues. What happens when the
    /// stream itself ends depends on the [`StreamEndPolicy`].
    pub async fn run(&self) -> Result<(), WatchError> {
        info!(image = %self.tracked_image, policy = ?self.on_stream_end, "Watching Docker events");

        let mut since: Option<i64> = None;
        let mut backoff = self.initial_backoff();

        loop {
            let mut received: u64 = 0;
            let mut events = self.docker.stream_events(Self::subscription_filter(since));

            while let Some(item) = events.next().await {
                match item {
                    Ok(event) => {
                        received = received.saturating_add(1);
                        if let Some(time) = event.time {
                            since = Some(time);
                        }
                        let dispatch = self.handle_event(&event).await;
                        trace!(?dispatch, "Event handled");
                    }
                    Err(e) => {
                        error!("Error while watching events: {}", e);
                    }
                }
            }
            drop(events);

            match self.on_stream_end {
                StreamEndPolicy::Exit => {
                    error!(received, "Docker event stream ended");
                    return Err(WatchError::StreamEnded);
                }
                StreamEndPolicy::Resubscribe => {
                    if received > 0 {
                        backoff = self.initial_backoff();
                    }
                    warn!(
                        received,
                        since = ?since,
                        "Docker event stream ended, resubscribing in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2).min(MAX_RESUBSCRIBE_BACKOFF);
                }
            }
        }
    }

    pub async fn handle_event(&self, event: &EventMessage) -> Dispatch {
        self.handle_event_at(event, Utc::now()).await
    }

    /// Handle one event as if it were processed at `now`.
    pub async fn handle_event_at(&self, event: &EventMessage, now: DateTime<Utc>) -> Dispatch {
        if !is_lifecycle_event(event) {
            trace!(typ = ?event.typ, action = ?event.action, "Ignoring event");
            return Dispatch::Ignored;
        }
        let Some(id) = actor_id(event) else {
            debug!(action = ?event.action, "Ignoring container event without actor id");
            return Dispatch::Ignored;
        };

        let container = match self.docker.inspect_container(id).await {
            Ok(container) => container,
            Err(e) if e.is_not_found() => {
                debug!(container_id = %id, "Container already removed, ignoring event");
                return Dispatch::Vanished;
            }
            Err(e) => {
                error!(container_id = %id, "Error inspecting container: {}", e);
                return Dispatch::InspectFailed;
            }
        };

        if !image_matches(&container.image, &self.tracked_image) {
            debug!(container = %container.name, image = %container.image, "Container not tracked");
            return Dispatch::Untracked;
        }

        let name = normalize_name(&container.name);
        if name.is_empty() {
            warn!(container_id = %id, "Tracked container has no name, ignoring event");
            return Dispatch::Ignored;
        }
        if let Err(remaining) = self.cooldown.try_claim(&name, now) {
            info!(
                "Skipping container {} (recently processed, {}s cooldown left)",
                name,
                remaining.num_seconds()
            );
            return Dispatch::CoolingDown { remaining_secs: remaining.num_seconds() };
        }

        info!(
            "Container {} with image {} stopped. Updating to latest image...",
            name, self.tracked_image
        );
        Dispatch::Restarted(self.restarter.restart(&name).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{container_event, event, FakeDocker};
    use crate::compose::fake::FakeCompose;
    use crate::compose::{CommandError, ComposeOps};
    use crate::docker::client::DockerError;
    use bollard::models::EventMessageTypeEnum;
    use chrono::TimeDelta;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    const TRACKED: &str = "ghcr.io/org/app";

    struct Harness {
        docker: Arc<FakeDocker>,
        compose: Arc<FakeCompose>,
        watcher: EventWatcher,
    }

    fn harness() -> Harness {
        let docker = Arc::new(FakeDocker::new());
        docker.add_container("c-app", "/app", "ghcr.io/org/app:latest");
        docker.add_container("c-db", "/db", "postgres:16");
        let compose = Arc::new(FakeCompose::new());
        let watcher = EventWatcher::new(docker.clone(), Restarter::new(compose.clone()), TRACKED);
        Harness { docker, compose, watcher }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Records, per step, whether `name` was still eligible at `at`.
    struct EligibilityRecorder {
        cooldown: Arc<CooldownTracker>,
        name: &'static str,
        at: DateTime<Utc>,
        seen: Mutex<Vec<(String, bool)>>,
    }

    impl ComposeOps for EligibilityRecorder {
        fn run<'a>(
            &'a self,
            subcommand: &'a str,
            _args: Vec<String>,
        ) -> Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + 'a>> {
            Box::pin(async move {
                let eligible = self.cooldown.is_eligible(self.name, self.at);
                self.seen.lock().unwrap().push((subcommand.to_string(), eligible));
                Ok(())
            })
        }
    }

    /// Parks the kill step until `release` fires.
    #[derive(Default)]
    struct GatedCompose {
        calls: Mutex<Vec<String>>,
        kill_started: Notify,
        release: Notify,
    }

    impl ComposeOps for GatedCompose {
        fn run<'a>(
            &'a self,
            subcommand: &'a str,
            _args: Vec<String>,
        ) -> Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(subcommand.to_string());
                if subcommand == "kill" {
                    self.kill_started.notify_one();
                    self.release.notified().await;
                }
                Ok(())
            })
        }
    }

    // ── Filtering ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_non_lifecycle_events_never_restart() {
        let h = harness();
        let events = [
            container_event("start", "c-app", 1),
            container_event("stop", "c-app", 1),
            container_event("kill", "c-app", 1),
            event(EventMessageTypeEnum::IMAGE, "die", "c-app", 1),
            event(EventMessageTypeEnum::NETWORK, "restart", "c-app", 1),
        ];
        for ev in &events {
            assert_eq!(h.watcher.handle_event_at(ev, t0()).await, Dispatch::Ignored);
        }
        assert_eq!(h.docker.inspect_calls(), 0);
        assert!(h.compose.calls().is_empty());
    }

    #[tokio::test]
    async fn test_event_without_actor_is_ignored() {
        let h = harness();
        let mut ev = container_event("die", "c-app", 1);
        ev.actor = None;
        assert_eq!(h.watcher.handle_event_at(&ev, t0()).await, Dispatch::Ignored);
        assert_eq!(h.docker.inspect_calls(), 0);
    }

    #[tokio::test]
    async fn test_untracked_image_is_skipped() {
        let h = harness();
        let dispatch = h.watcher.handle_event_at(&container_event("die", "c-db", 1), t0()).await;
        assert_eq!(dispatch, Dispatch::Untracked);
        assert!(h.compose.calls().is_empty());
        assert!(h.watcher.cooldown().is_empty());
    }

    // ── Inspection errors ───────────────────────────────────────

    #[tokio::test]
    async fn test_vanished_container_is_swallowed() {
        let h = harness();
        h.docker.remove_container("c-app");
        let dispatch = h.watcher.handle_event_at(&container_event("die", "c-app", 1), t0()).await;
        assert_eq!(dispatch, Dispatch::Vanished);
        assert!(h.compose.calls().is_empty());
    }

    #[tokio::test]
    async fn test_inspect_failure_drops_event() {
        let h = harness();
        h.docker.fail_inspect("connection reset by peer");
        let dispatch = h.watcher.handle_event_at(&container_event("die", "c-app", 1), t0()).await;
        assert_eq!(dispatch, Dispatch::InspectFailed);
        assert!(h.compose.calls().is_empty());
        assert!(h.watcher.cooldown().is_empty());
    }

    // ── Dispatch ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_tracked_container_restarts_with_stripped_name() {
        let h = harness();
        let dispatch = h.watcher.handle_event_at(&container_event("die", "c-app", 1), t0()).await;

        assert_eq!(dispatch, Dispatch::Restarted(RestartState::Done));
        assert_eq!(h.compose.subcommands(), vec!["kill", "pull", "rm", "up"]);
        assert!(h.compose.calls().iter().all(|c| c.args.last().map(String::as_str) == Some("app")));
    }

    #[tokio::test]
    async fn test_duplicate_events_within_a_second_restart_once() {
        let h = harness();
        let first = h.watcher.handle_event_at(&container_event("die", "c-app", 1), t0()).await;
        let second = h
            .watcher
            .handle_event_at(&container_event("die", "c-app", 1), t0() + TimeDelta::milliseconds(400))
            .await;

        assert!(matches!(first, Dispatch::Restarted(_)));
        assert!(matches!(second, Dispatch::CoolingDown { .. }));
        assert_eq!(h.compose.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_cooldown_scenario_zero_five_sixty_five() {
        let h = harness();

        let at_0 = h.watcher.handle_event_at(&container_event("die", "c-app", 0), t0()).await;
        assert_eq!(at_0, Dispatch::Restarted(RestartState::Done));

        let at_5 = h
            .watcher
            .handle_event_at(&container_event("restart", "c-app", 5), t0() + TimeDelta::seconds(5))
            .await;
        assert_eq!(at_5, Dispatch::CoolingDown { remaining_secs: 55 });
        assert_eq!(h.compose.calls().len(), 4);

        let at_65 = h
            .watcher
            .handle_event_at(&container_event("die", "c-app", 65), t0() + TimeDelta::seconds(65))
            .await;
        assert_eq!(at_65, Dispatch::Restarted(RestartState::Done));
        assert_eq!(
            h.compose.subcommands(),
            vec!["kill", "pull", "rm", "up", "kill", "pull", "rm", "up"]
        );
    }

    #[tokio::test]
    async fn test_failed_restart_still_starts_cooldown() {
        let h = harness();
        h.compose.fail_on("kill", "no such service: app");

        let first = h.watcher.handle_event_at(&container_event("die", "c-app", 1), t0()).await;
        assert!(matches!(first, Dispatch::Restarted(RestartState::Failed { .. })));
        assert_eq!(h.compose.subcommands(), vec!["kill"]);

        let second = h
            .watcher
            .handle_event_at(&container_event("die", "c-app", 2), t0() + TimeDelta::seconds(2))
            .await;
        assert!(matches!(second, Dispatch::CoolingDown { .. }));
    }

    #[tokio::test]
    async fn test_existing_entry_blocks_restart() {
        let h = harness();
        let cooldown = Arc::new(CooldownTracker::default());
        cooldown.mark_processed("app", t0());
        let watcher = EventWatcher::new(h.docker.clone(), Restarter::new(h.compose.clone()), TRACKED)
            .with_cooldown(Arc::clone(&cooldown));

        let dispatch = watcher.handle_event_at(&container_event("die", "c-app", 1), t0()).await;
        assert_eq!(dispatch, Dispatch::CoolingDown { remaining_secs: 60 });
        assert!(h.compose.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cooldown_is_claimed_before_kill_runs() {
        let docker = Arc::new(FakeDocker::new());
        docker.add_container("c-app", "/app", "ghcr.io/org/app:latest");
        let cooldown = Arc::new(CooldownTracker::default());
        let recorder = Arc::new(EligibilityRecorder {
            cooldown: Arc::clone(&cooldown),
            name: "app",
            at: t0() + TimeDelta::seconds(1),
            seen: Mutex::new(Vec::new()),
        });
        let watcher = EventWatcher::new(docker, Restarter::new(recorder.clone()), TRACKED)
            .with_cooldown(cooldown);

        let dispatch = watcher.handle_event_at(&container_event("die", "c-app", 1), t0()).await;
        assert_eq!(dispatch, Dispatch::Restarted(RestartState::Done));

        let seen = recorder.seen.lock().unwrap().clone();
        let steps: Vec<&str> = seen.iter().map(|(sub, _)| sub.as_str()).collect();
        assert_eq!(steps, vec!["kill", "pull", "rm", "up"]);
        assert!(seen.iter().all(|(_, eligible)| !eligible), "eligibility per step: {:?}", seen);
    }

    #[tokio::test]
    async fn test_event_during_restart_is_suppressed() {
        let docker = Arc::new(FakeDocker::new());
        docker.add_container("c-app", "/app", "ghcr.io/org/app:latest");
        let compose = Arc::new(GatedCompose::default());
        let watcher = EventWatcher::new(docker, Restarter::new(compose.clone()), TRACKED);

        let die_event = container_event("die", "c-app", 1);
        let first = watcher.handle_event_at(&die_event, t0());
        let second = async {
            compose.kill_started.notified().await;
            let dispatch = watcher
                .handle_event_at(&container_event("restart", "c-app", 2), t0() + TimeDelta::seconds(2))
                .await;
            compose.release.notify_one();
            dispatch
        };

        let (first, second) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(first, second)
        })
        .await
        .expect("a second restart started while the first was still killing");

        assert_eq!(first, Dispatch::Restarted(RestartState::Done));
        assert_eq!(second, Dispatch::CoolingDown { remaining_secs: 58 });
        assert_eq!(*compose.calls.lock().unwrap(), vec!["kill", "pull", "rm", "up"]);
    }

    #[tokio::test]
    async fn test_nameless_container_is_ignored() {
        let h = harness();
        h.docker.add_container("c-anon", "/", "ghcr.io/org/app:latest");

        let dispatch = h.watcher.handle_event_at(&container_event("die", "c-anon", 1), t0()).await;

        assert_eq!(dispatch, Dispatch::Ignored);
        assert!(h.compose.calls().is_empty());
        assert!(h.watcher.cooldown().is_empty());
    }

    // ── Run loop ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_run_exits_when_stream_ends() {
        let h = harness();
        h.docker.push_subscription(vec![
            Ok(container_event("die", "c-app", 100)),
            Err(DockerError::StreamClosed),
            Ok(container_event("restart", "c-app", 101)),
            Ok(container_event("die", "c-db", 102)),
        ]);

        let result = h.watcher.run().await;

        assert!(matches!(result, Err(WatchError::StreamEnded)));
        assert_eq!(h.compose.subcommands(), vec!["kill", "pull", "rm", "up"]);
        assert_eq!(h.docker.inspect_calls(), 3);

        let filters = h.docker.subscribed_with();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].types, vec!["container"]);
        assert_eq!(filters[0].actions, vec!["die", "restart"]);
        assert_eq!(filters[0].since, None);
    }

    #[tokio::test]
    async fn test_run_resubscribes_from_last_event_time() {
        let h = harness();
        h.docker.push_subscription(vec![
            Ok(container_event("die", "c-db", 1_700_000_000)),
            Ok(container_event("die", "c-db", 1_700_000_007)),
        ]);
        h.docker.push_subscription(vec![Ok(container_event("die", "c-app", 1_700_000_010))]);

        let watcher = h
            .watcher
            .with_stream_end_policy(StreamEndPolicy::Resubscribe, Duration::from_millis(1));

        // Resubscribe never returns on its own.
        let outcome = tokio::time::timeout(Duration::from_millis(200), watcher.run()).await;
        assert!(outcome.is_err());

        let filters = h.docker.subscribed_with();
        assert!(filters.len() >= 3, "subscriptions: {}", filters.len());
        assert_eq!(filters[0].since, None);
        assert_eq!(filters[1].since, Some(1_700_000_007));
        assert_eq!(filters[2].since, Some(1_700_000_010));
        assert_eq!(h.compose.calls().len(), 4);
    }

    // ── StreamEndPolicy ─────────────────────────────────────────

    #[test]
    fn test_initial_backoff_is_capped() {
        let watcher = harness()
            .watcher
            .with_stream_end_policy(StreamEndPolicy::Resubscribe, Duration::from_secs(300));
        assert_eq!(watcher.initial_backoff(), MAX_RESUBSCRIBE_BACKOFF);

        let watcher = harness()
            .watcher
            .with_stream_end_policy(StreamEndPolicy::Resubscribe, Duration::from_secs(5));
        assert_eq!(watcher.initial_backoff(), Duration::from_secs(5));
    }

    #[test]
    fn test_stream_end_policy_parse() {
        assert_eq!("exit".parse::<StreamEndPolicy>().unwrap(), StreamEndPolicy::Exit);
        assert_eq!(" Resubscribe ".parse::<StreamEndPolicy>().unwrap(), StreamEndPolicy::Resubscribe);
        assert!("retry".parse::<StreamEndPolicy>().is_err());
        assert_eq!(StreamEndPolicy::default(), StreamEndPolicy::Exit);
    }
}
