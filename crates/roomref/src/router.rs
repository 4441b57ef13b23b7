//
// router.rs
//
// Changeset-to-room routing with self-healing index repair
//

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::RoomrefConfig;
use crate::set_store::AssociativeSetStore;

/// A changeset applied to one resource, as delivered by the change pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteChangeset {
    pub message_id: String,
    pub resource_id: String,
    pub revision: u64,
    #[serde(default)]
    pub operations: Vec<serde_json::Value>,
}

/// One changeset paired with the rooms it must be delivered to.
#[derive(Debug, Clone)]
pub struct RoomChangeResult {
    pub changeset: RemoteChangeset,
    pub room_ids: Vec<String>,
}

/// Maps incoming changesets to target room ids, repairing missing index
/// entries as it goes.
pub struct ChangeRouter {
    store: Arc<dyn AssociativeSetStore>,
    config: RoomrefConfig,
}

impl ChangeRouter {
    pub fn new(store: Arc<dyn AssociativeSetStore>, config: RoomrefConfig) -> Self {
        Self { store, config }
    }

    /// Resolve the target rooms for each changeset.
    ///
    /// A resource with no room association is self-healed: `{room_id}` is
    /// written as its room set and used as the result. A resource whose room
    /// set exists but lags behind (missing the originating room) gets the
    /// room appended to the returned list without a write; the next room
    /// join converges the index. Either way every changeset is routed to at
    /// least the room that produced it.
    pub async fn room_change_results(
        &self,
        room_id: &str,
        changesets: Vec<RemoteChangeset>,
    ) -> Result<Vec<RoomChangeResult>> {
        let begin = Instant::now();
        let mut results: Vec<RoomChangeResult> = Vec::with_capacity(changesets.len());
        for changeset in changesets {
            let resource_key = self.config.resource_key(&changeset.resource_id);
            let mut room_ids = self.store.members(&resource_key).await?;
            if room_ids.is_empty() {
                log::info!(
                    "resource {} belongs to no room, healing with {}",
                    changeset.resource_id,
                    room_id
                );
                room_ids = vec![room_id.to_string()];
                self.store.add(&resource_key, &room_ids).await?;
                self.store
                    .touch(&resource_key, self.config.ref_storage_expire)
                    .await?;
            } else if !room_ids.iter().any(|id| id == room_id) {
                // Index lookup lagged; the originating room still gets its change
                room_ids.push(room_id.to_string());
            }
            results.push(RoomChangeResult {
                changeset,
                room_ids,
            });
        }
        log::debug!(
            "room change result for {} loaded in {:?}",
            room_id,
            begin.elapsed()
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set_store::MemorySetStore;
    use std::time::Duration;

    fn changeset(resource_id: &str) -> RemoteChangeset {
        RemoteChangeset {
            message_id: format!("msg-{}", resource_id),
            resource_id: resource_id.to_string(),
            revision: 1,
            operations: Vec::new(),
        }
    }

    fn router() -> (Arc<MemorySetStore>, ChangeRouter) {
        let store = Arc::new(MemorySetStore::new(Duration::from_secs(60)));
        let router = ChangeRouter::new(store.clone(), RoomrefConfig::default());
        (store, router)
    }

    #[tokio::test]
    async fn test_self_heal_persists_originating_room() {
        let (store, router) = router();
        let results = router
            .room_change_results("dstRoom000", vec![changeset("dstA0000000")])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].room_ids, ["dstRoom000"]);
        // Healed association is visible to subsequent lookups
        let key = RoomrefConfig::default().resource_key("dstA0000000");
        assert!(store.contains(&key, "dstRoom000").await.unwrap());
    }

    #[tokio::test]
    async fn test_append_without_persist() {
        let (store, router) = router();
        let key = RoomrefConfig::default().resource_key("dstA0000000");
        store
            .add(&key, &["dstOther000".to_string()])
            .await
            .unwrap();

        let results = router
            .room_change_results("dstRoom000", vec![changeset("dstA0000000")])
            .await
            .unwrap();

        // The originating room is in the response...
        let mut room_ids = results[0].room_ids.clone();
        room_ids.sort();
        assert_eq!(room_ids, ["dstOther000", "dstRoom000"]);
        // ...but the lagging index was not written on this path
        assert!(!store.contains(&key, "dstRoom000").await.unwrap());
    }

    #[tokio::test]
    async fn test_existing_membership_is_returned_unchanged() {
        let (store, router) = router();
        let key = RoomrefConfig::default().resource_key("dstA0000000");
        store
            .add(&key, &["dstRoom000".to_string(), "dstOther000".to_string()])
            .await
            .unwrap();

        let results = router
            .room_change_results("dstRoom000", vec![changeset("dstA0000000")])
            .await
            .unwrap();

        let mut room_ids = results[0].room_ids.clone();
        room_ids.sort();
        assert_eq!(room_ids, ["dstOther000", "dstRoom000"]);
    }

    #[tokio::test]
    async fn test_each_changeset_routed_independently() {
        let (store, router) = router();
        let key_b = RoomrefConfig::default().resource_key("dstB0000000");
        store
            .add(&key_b, &["dstElse0000".to_string()])
            .await
            .unwrap();

        let results = router
            .room_change_results(
                "dstRoom000",
                vec![changeset("dstA0000000"), changeset("dstB0000000")],
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].changeset.resource_id, "dstA0000000");
        assert_eq!(results[0].room_ids, ["dstRoom000"]);
        let mut rooms_b = results[1].room_ids.clone();
        rooms_b.sort();
        assert_eq!(rooms_b, ["dstElse0000", "dstRoom000"]);
    }

    #[tokio::test]
    async fn test_changeset_wire_shape() {
        let cs: RemoteChangeset = serde_json::from_value(serde_json::json!({
            "messageId": "msg-1",
            "resourceId": "dstA0000000",
            "revision": 7,
        }))
        .unwrap();
        assert_eq!(cs.resource_id, "dstA0000000");
        assert_eq!(cs.revision, 7);
        assert!(cs.operations.is_empty());
    }
}
