//! # Ledger Events
//!
//! Change notifications published after every committed write.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  settlement / refund / adjust / count / reconcile / snapshot           │
//! │       │ commit OK                                                       │
//! │       ▼                                                                 │
//! │  EventBus::publish(LedgerEvent { version, .. })                        │
//! │       │ tokio::sync::broadcast (capacity 256)                          │
//! │       ├──► register screen   (refresh stock badges)                    │
//! │       ├──► back office       (refresh invoices)                        │
//! │       └──► ...                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery is best effort. A subscriber that lags past the buffer gets
//! `RecvError::Lagged` and should re-read state, using
//! `LedgerService::ledger_version` to tell whether anything changed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_BUFFER: usize = 256;

/// What changed. Every event carries the ledger version it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    CartSettled {
        version: i64,
        cart_id: String,
        product_ids: Vec<String>,
        total_cents: i64,
    },
    SaleRefunded {
        version: i64,
        sale_id: String,
        product_id: Option<String>,
    },
    StockAdjusted {
        version: i64,
        product_id: String,
    },
    StockCounted {
        version: i64,
        product_id: String,
    },
    CatalogChanged {
        version: i64,
    },
    Reconciled {
        version: i64,
        fixed_count: usize,
    },
    SnapshotTaken {
        version: i64,
        snapshot_id: String,
    },
    SnapshotRestored {
        version: i64,
        snapshot_id: String,
        product_ids: Vec<String>,
    },
}

impl LedgerEvent {
    pub fn version(&self) -> i64 {
        match self {
            LedgerEvent::CartSettled { version, .. }
            | LedgerEvent::SaleRefunded { version, .. }
            | LedgerEvent::StockAdjusted { version, .. }
            | LedgerEvent::StockCounted { version, .. }
            | LedgerEvent::CatalogChanged { version }
            | LedgerEvent::Reconciled { version, .. }
            | LedgerEvent::SnapshotTaken { version, .. }
            | LedgerEvent::SnapshotRestored { version, .. } => *version,
        }
    }
}

/// Fan-out of [`LedgerEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LedgerEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        EventBus { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    /// Publishes to current subscribers. No subscribers is fine.
    pub fn publish(&self, event: LedgerEvent) {
        trace!(version = event.version(), "Publishing ledger event");
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(LedgerEvent::StockAdjusted {
            version: 7,
            product_id: "p-1".into(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.version(), 7);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(LedgerEvent::CatalogChanged { version: 1 });
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(LedgerEvent::SaleRefunded {
            version: 3,
            sale_id: "s-1".into(),
            product_id: None,
        })
        .unwrap();
        assert_eq!(json["type"], "sale_refunded");
        assert_eq!(json["version"], 3);
    }
}
