use chrono::Utc;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{AssignmentEvent, AssignmentEventKind};
use crate::stores::NotificationGateway;

/// Publishes assignment events on a broadcast channel for downstream
/// notification workers. A send error only means nobody is subscribed
/// right now and is ignored.
pub struct ChannelNotifier {
    events_tx: broadcast::Sender<AssignmentEvent>,
}

impl ChannelNotifier {
    pub fn new(events_tx: broadcast::Sender<AssignmentEvent>) -> Self {
        Self { events_tx }
    }

    fn publish(&self, event: AssignmentEvent) {
        let _ = self.events_tx.send(event);
    }
}

impl NotificationGateway for ChannelNotifier {
    fn notify_assigned(&self, booking_id: Uuid, cleaner_id: Uuid) -> Result<(), AppError> {
        info!(booking_id = %booking_id, cleaner_id = %cleaner_id, "notify: booking assigned");
        self.publish(AssignmentEvent {
            booking_id,
            cleaner_id,
            previous_cleaner: None,
            kind: AssignmentEventKind::Assigned,
            at: Utc::now(),
        });
        Ok(())
    }

    fn notify_reassigned(
        &self,
        booking_id: Uuid,
        cleaner_id: Uuid,
        previous_cleaner: Uuid,
    ) -> Result<(), AppError> {
        info!(
            booking_id = %booking_id,
            cleaner_id = %cleaner_id,
            previous_cleaner = %previous_cleaner,
            "notify: booking reassigned"
        );
        self.publish(AssignmentEvent {
            booking_id,
            cleaner_id,
            previous_cleaner: Some(previous_cleaner),
            kind: AssignmentEventKind::Reassigned,
            at: Utc::now(),
        });
        Ok(())
    }
}
