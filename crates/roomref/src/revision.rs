//
// revision.rs
//
// Latest-revision aggregation for a room's resource set
//

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::RoomrefConfig;
use crate::resource::{ResourceRevision, ResourceType};
use crate::set_store::AssociativeSetStore;

/// Batched revision lookups against persisted storage, one call shape per
/// resource bucket. Forms and dashboards share a backing table, so they
/// share a bucket.
#[async_trait]
pub trait RevisionStore: Send + Sync {
    async fn datasheet_revisions(&self, ids: &[String]) -> Result<Vec<ResourceRevision>>;
    async fn meta_revisions(&self, ids: &[String]) -> Result<Vec<ResourceRevision>>;
    async fn widget_revisions(&self, ids: &[String]) -> Result<Vec<ResourceRevision>>;
}

/// Answers "what is the current revision of each resource in this room".
pub struct RevisionAggregator {
    store: Arc<dyn AssociativeSetStore>,
    revisions: Arc<dyn RevisionStore>,
    config: RoomrefConfig,
}

impl RevisionAggregator {
    pub fn new(
        store: Arc<dyn AssociativeSetStore>,
        revisions: Arc<dyn RevisionStore>,
        config: RoomrefConfig,
    ) -> Self {
        Self {
            store,
            revisions,
            config,
        }
    }

    /// Latest revision of every resource in the room's set.
    ///
    /// Ids are partitioned by type prefix into three buckets and each
    /// non-empty bucket is fetched with one batched call; empty buckets are
    /// skipped, not queried. Result ordering is unspecified.
    pub async fn resource_revisions(&self, room_id: &str) -> Result<Vec<ResourceRevision>> {
        let resource_ids = self.store.members(&self.config.room_key(room_id)).await?;

        let mut dst_ids: Vec<String> = Vec::new();
        let mut meta_ids: Vec<String> = Vec::new();
        let mut wdt_ids: Vec<String> = Vec::new();
        for id in resource_ids {
            match ResourceType::of(&id) {
                Some(ResourceType::Datasheet) => dst_ids.push(id),
                Some(ResourceType::Form) | Some(ResourceType::Dashboard) => meta_ids.push(id),
                Some(ResourceType::Widget) => wdt_ids.push(id),
                None => log::trace!("skipping untyped resource id {}", id),
            }
        }

        let mut revisions: Vec<ResourceRevision> = Vec::new();
        if !dst_ids.is_empty() {
            revisions.extend(self.revisions.datasheet_revisions(&dst_ids).await?);
        }
        if !meta_ids.is_empty() {
            revisions.extend(self.revisions.meta_revisions(&meta_ids).await?);
        }
        if !wdt_ids.is_empty() {
            revisions.extend(self.revisions.widget_revisions(&wdt_ids).await?);
        }
        Ok(revisions)
    }
}
