//! # Inventory Snapshots
//!
//! Point-in-time copies of every product's ledger row, and restoring them.
//!
//! ## Restore
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. safety snapshot of the current state                               │
//! │  2. lock every product in the snapshot (sorted)                        │
//! │  3. one write transaction, per product still in the catalog:           │
//! │       target  = snapshot.expected_stock                                 │
//! │       current = product.expected_stock                                  │
//! │       target > current → entry movement (target - current)             │
//! │       target < current → exit  movement (current - target)             │
//! │       real_stock      ← snapshot.real_stock                             │
//! │  4. commit                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counters are never overwritten directly. Restores go through ordinary
//! movements, so history still explains every unit and reconciliation
//! stays clean.

use serde::{Deserialize, Serialize};
use shears_core::validation::{validate_actor_id, validate_optional_text};
use shears_core::{CoreError, InventorySnapshot, MovementKind, SnapshotItem, StockAdjustment};
use shears_db::SnapshotSummary;
use tracing::{debug, info};
use uuid::Uuid;

use crate::context::{not_found_as, now, LedgerContext};
use crate::error::LedgerResult;
use crate::events::LedgerEvent;
use crate::product_ledger::movement_in_tx;

/// One product put back to its snapshot level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredItem {
    pub product_id: String,
    pub product_name: String,
    pub expected_before: i64,
    pub expected_after: i64,
}

/// What a restore did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOutcome {
    pub snapshot_id: String,
    /// Snapshot of the state the restore replaced.
    pub safety_snapshot_id: String,
    pub restored: Vec<RestoredItem>,
    /// Products in the snapshot that no longer exist.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SnapshotManager {
    ctx: LedgerContext,
}

impl SnapshotManager {
    pub fn new(ctx: LedgerContext) -> Self {
        SnapshotManager { ctx }
    }

    /// Copies every product row. Runs in a write transaction so the copy is
    /// consistent with respect to all writers.
    pub async fn create_snapshot(
        &self,
        actor_id: &str,
        note: Option<String>,
    ) -> LedgerResult<InventorySnapshot> {
        validate_actor_id(actor_id)?;
        validate_optional_text("note", note.as_deref())?;

        let mut tx = self.ctx.db.begin_write().await?;
        let items: Vec<SnapshotItem> = tx
            .list_products()
            .await?
            .iter()
            .map(SnapshotItem::from)
            .collect();
        let snapshot = InventorySnapshot {
            id: Uuid::new_v4().to_string(),
            taken_at: now(),
            actor_id: actor_id.to_string(),
            note,
            items,
        };
        tx.insert_snapshot(&snapshot).await?;
        let version = tx.commit().await?;

        info!(
            id = %snapshot.id,
            items = snapshot.items.len(),
            version,
            "Inventory snapshot taken"
        );
        self.ctx.events.publish(LedgerEvent::SnapshotTaken {
            version,
            snapshot_id: snapshot.id.clone(),
        });
        Ok(snapshot)
    }

    /// Headers, newest first.
    pub async fn list_snapshots(&self) -> LedgerResult<Vec<SnapshotSummary>> {
        Ok(self.ctx.db.snapshots().list().await?)
    }

    pub async fn get_snapshot(&self, snapshot_id: &str) -> LedgerResult<InventorySnapshot> {
        self.ctx
            .db
            .snapshots()
            .get_by_id(snapshot_id)
            .await
            .map_err(|e| not_found_as(e, || CoreError::SnapshotNotFound(snapshot_id.to_string())))
    }

    /// Brings every surviving product back to its snapshot level.
    pub async fn restore_snapshot(
        &self,
        snapshot_id: &str,
        actor_id: &str,
    ) -> LedgerResult<RestoreOutcome> {
        validate_actor_id(actor_id)?;
        let snapshot = self.get_snapshot(snapshot_id).await?;
        let safety = self
            .create_snapshot(actor_id, Some(format!("before restore of {snapshot_id}")))
            .await?;

        let _locks = self
            .ctx
            .locks
            .lock_many(snapshot.items.iter().map(|i| i.product_id.as_str()))
            .await;
        let mut tx = self.ctx.db.begin_write().await?;

        let reason = format!("snapshot restore {snapshot_id}");
        let mut restored = Vec::new();
        let mut skipped = Vec::new();

        for item in &snapshot.items {
            let Some(product) = tx.fetch_product(&item.product_id).await? else {
                skipped.push(item.product_id.clone());
                continue;
            };

            let current = product.expected_stock();
            let delta = item.expected_stock - current;
            if delta != 0 {
                let kind = if delta > 0 {
                    MovementKind::Entry
                } else {
                    MovementKind::Exit
                };
                movement_in_tx(
                    &mut tx,
                    &StockAdjustment {
                        product_id: product.id.clone(),
                        kind,
                        quantity: delta.abs(),
                        reason: reason.clone(),
                        cost_cents: None,
                        payment_method: None,
                        actor_id: actor_id.to_string(),
                    },
                )
                .await?;
            }
            tx.set_real_stock(&product.id, item.real_stock).await?;

            debug!(product_id = %product.id, from = current, to = item.expected_stock, "Restored");
            restored.push(RestoredItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                expected_before: current,
                expected_after: item.expected_stock,
            });
        }

        let version = tx.commit().await?;

        info!(
            snapshot_id = %snapshot_id,
            safety_snapshot_id = %safety.id,
            restored = restored.len(),
            skipped = skipped.len(),
            version,
            "Snapshot restored"
        );
        self.ctx.events.publish(LedgerEvent::SnapshotRestored {
            version,
            snapshot_id: snapshot_id.to_string(),
            product_ids: restored.iter().map(|r| r.product_id.clone()).collect(),
        });

        Ok(RestoreOutcome {
            snapshot_id: snapshot_id.to_string(),
            safety_snapshot_id: safety.id,
            restored,
            skipped,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::product_ledger::ProductLedger;
    use crate::reconcile::ConsistencyReconciler;
    use crate::settlement::CartSettlementEngine;
    use crate::test_support::{context, new_product, product_line};
    use shears_core::cart::CartRequest;
    use shears_core::reconcile::ReconcileMode;

    #[tokio::test]
    async fn test_snapshot_captures_rows() {
        let ctx = context().await;
        let ledger = ProductLedger::new(ctx.clone());
        let snapshots = SnapshotManager::new(ctx);
        ledger.create_product(new_product("POM-01", "Pomade", 10)).await.unwrap();
        ledger.create_product(new_product("WAX-01", "Wax", 4)).await.unwrap();

        let snap = snapshots
            .create_snapshot("owner", Some("month end".into()))
            .await
            .unwrap();
        assert_eq!(snap.items.len(), 2);

        let loaded = snapshots.get_snapshot(&snap.id).await.unwrap();
        assert_eq!(loaded, snap);

        let listed = snapshots.list_snapshots().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].item_count, 2);
    }

    #[tokio::test]
    async fn test_missing_snapshot() {
        let snapshots = SnapshotManager::new(context().await);
        let err = snapshots.get_snapshot("nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SnapshotNotFound);
    }

    #[tokio::test]
    async fn test_restore_uses_movements_and_stays_reconcilable() {
        let ctx = context().await;
        let ledger = ProductLedger::new(ctx.clone());
        let engine = CartSettlementEngine::new(ctx.clone());
        let snapshots = SnapshotManager::new(ctx.clone());

        let p = ledger.create_product(new_product("POM-01", "Pomade", 10)).await.unwrap();
        ledger.record_manual_count(&p.id, 10, None, "owner").await.unwrap();
        let snap = snapshots.create_snapshot("owner", None).await.unwrap();

        engine
            .settle(CartRequest {
                barber_id: None,
                client_data: None,
                lines: vec![product_line(&p.id, 3, 1000, "cash")],
            })
            .await
            .unwrap();
        ledger.record_manual_count(&p.id, 6, None, "owner").await.unwrap();
        assert_eq!(ledger.get_available(&p.id).await.unwrap(), 7);

        let outcome = snapshots.restore_snapshot(&snap.id, "owner").await.unwrap();
        assert_eq!(outcome.restored.len(), 1);
        assert_eq!(outcome.restored[0].expected_before, 7);
        assert_eq!(outcome.restored[0].expected_after, 10);
        assert_ne!(outcome.safety_snapshot_id, snap.id);

        let restored = ledger.get_product(&p.id).await.unwrap();
        assert_eq!(restored.expected_stock(), 10);
        assert_eq!(restored.real_stock, Some(10));
        assert_eq!(restored.entries, 3);

        let movements = ledger.movement_history(&p.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].reason, format!("snapshot restore {}", snap.id));

        let outcome = ConsistencyReconciler::new(ctx)
            .reconcile(ReconcileMode::Report)
            .await
            .unwrap();
        assert_eq!(outcome.issue_count(), 0);
        assert_eq!(snapshots.list_snapshots().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_restore_skips_deleted_products() {
        let ctx = context().await;
        let ledger = ProductLedger::new(ctx.clone());
        let snapshots = SnapshotManager::new(ctx);

        let keep = ledger.create_product(new_product("POM-01", "Pomade", 10)).await.unwrap();
        let gone = ledger.create_product(new_product("WAX-01", "Wax", 4)).await.unwrap();
        let snap = snapshots.create_snapshot("owner", None).await.unwrap();
        ledger.delete_product(&gone.id).await.unwrap();

        let outcome = snapshots.restore_snapshot(&snap.id, "owner").await.unwrap();
        assert_eq!(outcome.skipped, vec![gone.id.clone()]);
        assert_eq!(outcome.restored.len(), 1);
        assert_eq!(outcome.restored[0].product_id, keep.id);
    }
}
