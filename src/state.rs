use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::engine::assignment::AssignmentCoordinator;
use crate::engine::earnings::EarningsAggregator;
use crate::engine::payments::PaymentService;
use crate::models::assignment::AssignmentEvent;
use crate::observability::metrics::Metrics;
use crate::stores::memory::MemoryStore;
use crate::stores::notify::ChannelNotifier;

pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub coordinator: AssignmentCoordinator,
    pub payments: PaymentService,
    pub earnings: EarningsAggregator,
    pub assignment_events_tx: broadcast::Sender<AssignmentEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let (assignment_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);
        let notifier = Arc::new(ChannelNotifier::new(assignment_events_tx.clone()));

        let coordinator = AssignmentCoordinator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            notifier,
            store.clone(),
        );
        let payments = PaymentService::new(store.clone(), store.clone(), config.commission_rate);
        let earnings = EarningsAggregator::new(store.clone(), store.clone());

        Self {
            store,
            coordinator,
            payments,
            earnings,
            assignment_events_tx,
            metrics: Metrics::new(),
        }
    }
}
