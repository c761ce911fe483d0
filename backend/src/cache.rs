//! Cache-invalidation hook
//!
//! Called after every successful engine write. Delivery is best effort: a
//! failing hook is logged and never fails the operation that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Actor, WorkflowPhase};
use tokio::sync::broadcast;
use uuid::Uuid;

/// What happened to an entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    EntryCreated,
    Transitioned,
    Rejected,
    LotAllotted,
    InspectionRecorded,
    LotClosed,
}

/// Change notification for caches keyed by entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowEvent {
    pub kind: EventKind,
    pub entry_id: Uuid,
    pub from: WorkflowPhase,
    pub to: WorkflowPhase,
    pub actor: Actor,
    pub at: DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn new(kind: EventKind, entry_id: Uuid, from: WorkflowPhase, to: WorkflowPhase, actor: Actor) -> Self {
        Self {
            kind,
            entry_id,
            from,
            to,
            actor,
            at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, event: &WorkflowEvent) -> anyhow::Result<()>;
}

/// Hook used when no cache is attached
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

#[async_trait]
impl CacheInvalidator for NoopInvalidator {
    async fn invalidate(&self, _event: &WorkflowEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fans events out to in-process subscribers
#[derive(Debug, Clone)]
pub struct BroadcastInvalidator {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl BroadcastInvalidator {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl CacheInvalidator for BroadcastInvalidator {
    async fn invalidate(&self, event: &WorkflowEvent) -> anyhow::Result<()> {
        // No subscribers means nothing is cached
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender
            .send(event.clone())
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("failed to broadcast event for entry {}: {}", event.entry_id, e))
    }
}

/// Deliver an event, logging instead of failing
pub async fn notify(invalidator: &Arc<dyn CacheInvalidator>, event: WorkflowEvent) {
    if let Err(e) = invalidator.invalidate(&event).await {
        tracing::warn!(entry_id = %event.entry_id, kind = ?event.kind, "Cache invalidation failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::UserRole;

    struct FailingInvalidator;

    #[async_trait]
    impl CacheInvalidator for FailingInvalidator {
        async fn invalidate(&self, _event: &WorkflowEvent) -> anyhow::Result<()> {
            anyhow::bail!("cache offline")
        }
    }

    fn event() -> WorkflowEvent {
        WorkflowEvent::new(
            EventKind::Transitioned,
            Uuid::new_v4(),
            WorkflowPhase::StaffEntry,
            WorkflowPhase::QualityCheck,
            Actor::new(Uuid::new_v4(), UserRole::Staff),
        )
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let hook = BroadcastInvalidator::new(8);
        let mut rx = hook.subscribe();
        let sent = event();
        hook.invalidate(&sent).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), sent);
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_ok() {
        let hook = BroadcastInvalidator::new(8);
        assert!(hook.invalidate(&event()).await.is_ok());
    }

    #[tokio::test]
    async fn test_notify_swallows_failures() {
        let hook: Arc<dyn CacheInvalidator> = Arc::new(FailingInvalidator);
        notify(&hook, event()).await;
    }
}
