//! Event Publisher Implementation
//!
//! 基于 broadcast 的工作室事件推送

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{StudioEvent, StudioEventsPort};

const CHANNEL_CAPACITY: usize = 100;

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<StudioEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全部事件
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.channel.subscribe()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl StudioEventsPort for EventPublisher {
    fn publish(&self, event: StudioEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::debug!(error = %e, "No active subscribers for studio event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::comic::{PanelId, ProjectId};

    #[tokio::test]
    async fn test_subscribers_see_events_in_order() {
        let publisher = EventPublisher::new();
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        publisher.publish(StudioEvent::WorkspaceChanged);
        publisher.publish(StudioEvent::PanelCompleted {
            project_id: ProjectId::from_raw(1),
            panel_id: PanelId::from_raw(10),
        });

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap(), StudioEvent::WorkspaceChanged);
            assert!(matches!(
                rx.recv().await.unwrap(),
                StudioEvent::PanelCompleted { panel_id, .. } if panel_id == PanelId::from_raw(10)
            ));
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let publisher = EventPublisher::new();
        publisher.publish(StudioEvent::ExportProgress {
            message: "Saving PDF...".to_string(),
        });

        let mut rx = publisher.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        EventPublisher::new().publish(StudioEvent::WorkspaceChanged);
    }
}
