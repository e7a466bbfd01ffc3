//! Event domain — Docker engine event streaming.

use super::client::{DockerClient, DockerError};
use futures_util::stream::StreamExt;

/// Server-side filter applied to every subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Event types (`container`, `image`, ...). Empty means all.
    pub types: Vec<String>,
    /// Event actions (`die`, `restart`, ...). Empty means all.
    pub actions: Vec<String>,
    /// Replay events from this Unix timestamp (seconds).
    pub since: Option<i64>,
}

impl DockerClient {
    /// Stream Docker engine events.
    pub fn stream_events(
        &self,
        filter: EventFilter,
    ) -> impl futures_util::Stream<Item = Result<bollard::models::EventMessage, DockerError>> + '_
    {
        use bollard::query_parameters::EventsOptionsBuilder;
        use std::collections::HashMap;

        let mut filters = HashMap::new();
        if !filter.types.is_empty() {
            filters.insert(
                "type",
                filter.types.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            );
        }
        if !filter.actions.is_empty() {
            filters.insert(
                "event",
                filter.actions.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            );
        }

        let since_str = filter.since.map(|s| s.to_string());

        let mut builder = EventsOptionsBuilder::default();
        builder = builder.filters(&filters);
        if let Some(ref s) = since_str {
            builder = builder.since(s);
        }
        let options = builder.build();

        self.client
            .events(Some(options))
            .map(|r| r.map_err(DockerError::from))
    }
}
