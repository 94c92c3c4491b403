use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::directory::{Directory, InMemoryDirectory};
use crate::repository::{EventRepository, InMemoryEventRepository, InMemoryRequestRepository, RequestRepository};
use crate::stats::StatsClient;

pub const DEFAULT_APP_NAME: &str = "ewm-main-service";

/// Collaborators shared by the event services.
#[derive(Clone)]
pub struct EventContext {
    pub events: Arc<dyn EventRepository>,
    pub requests: Arc<dyn RequestRepository>,
    pub directory: Arc<dyn Directory>,
    pub stats: Arc<dyn StatsClient>,
    pub clock: Arc<dyn Clock>,
    /// Reported as `app` on recorded hits
    pub app_name: String,
}

impl EventContext {
    pub fn new(
        events: Arc<dyn EventRepository>,
        requests: Arc<dyn RequestRepository>,
        directory: Arc<dyn Directory>,
        stats: Arc<dyn StatsClient>,
    ) -> Self {
        Self {
            events,
            requests,
            directory,
            stats,
            clock: Arc::new(SystemClock),
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }

    /// In-memory stores and directory around the given stats client.
    pub fn in_memory(stats: Arc<dyn StatsClient>) -> Self {
        Self::new(
            Arc::new(InMemoryEventRepository::new()),
            Arc::new(InMemoryRequestRepository::new()),
            Arc::new(InMemoryDirectory::new()),
            stats,
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }
}
