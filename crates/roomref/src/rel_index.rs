//
// rel_index.rs
//
// Bidirectional room-resource association over the associative set store
//

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;

use crate::config::RoomrefConfig;
use crate::resource::is_datasheet;
use crate::set_store::AssociativeSetStore;

/// Room-resource two-way association maintenance.
///
/// The relation is stored twice — room -> {resources} and
/// resource -> {rooms} — so both directions are single-key lookups. Each
/// side expires independently; symmetry is eventual, not point-in-time. The
/// index is a cache artifact: document schemas remain the source of truth
/// and the closure resolver can always rebuild an expired entry, so every
/// read path treats an empty set as "unknown", not "no relation".
pub struct RoomResourceIndex {
    store: Arc<dyn AssociativeSetStore>,
    config: RoomrefConfig,
}

impl RoomResourceIndex {
    pub fn new(store: Arc<dyn AssociativeSetStore>, config: RoomrefConfig) -> Self {
        Self { store, config }
    }

    /// Whether the room has a non-empty resource set.
    pub async fn has_resource(&self, room_id: &str) -> Result<bool> {
        let resource_ids = self.store.members(&self.config.room_key(room_id)).await?;
        Ok(!resource_ids.is_empty())
    }

    /// Datasheet rooms referencing a resource.
    ///
    /// With `without_self` false, an unknown resource that is itself a
    /// datasheet id falls back to its own home room (`[resource_id]`); with
    /// `without_self` true an unknown resource yields `[]` so the caller can
    /// tell the miss apart and recompute.
    pub async fn datasheet_room_ids(
        &self,
        resource_id: &str,
        without_self: bool,
    ) -> Result<Vec<String>> {
        let room_ids = self
            .store
            .members(&self.config.resource_key(resource_id))
            .await?;
        if !without_self && room_ids.is_empty() && is_datasheet(resource_id) {
            return Ok(vec![resource_id.to_string()]);
        }
        Ok(room_ids.into_iter().filter(|id| is_datasheet(id)).collect())
    }

    /// Datasheet resources of a room, with the symmetric home-room fallback
    /// when the room's set is unknown and the room id is a datasheet id.
    pub async fn datasheet_resource_ids(&self, room_id: &str) -> Result<Vec<String>> {
        let resource_ids = self.store.members(&self.config.room_key(room_id)).await?;
        if resource_ids.is_empty() && is_datasheet(room_id) {
            return Ok(vec![room_id.to_string()]);
        }
        Ok(resource_ids
            .into_iter()
            .filter(|id| is_datasheet(id))
            .collect())
    }

    /// Create or extend the two-way association between a room and a set of
    /// resources, refreshing the TTL of every touched key.
    ///
    /// The room side is append-mostly: when the key already exists only the
    /// difference against current members is written. Callers have partial
    /// visibility — a client without permission to some resources presents a
    /// subset, and that subset must not clobber members added concurrently
    /// by other instances.
    pub async fn create_or_update_rel(&self, room_id: &str, resource_ids: &[String]) -> Result<()> {
        let room_key = self.config.room_key(room_id);
        if self.store.exists(&room_key).await? {
            log::trace!("room {} already mapped, reconciling", room_id);
            let members: HashSet<String> =
                self.store.members(&room_key).await?.into_iter().collect();
            let diff: Vec<String> = resource_ids
                .iter()
                .filter(|id| !members.contains(*id))
                .cloned()
                .collect();
            if !diff.is_empty() {
                self.store.add(&room_key, &diff).await?;
            }
        } else {
            log::info!("new room {}: mapping {} resources", room_id, resource_ids.len());
            self.store.add(&room_key, resource_ids).await?;
        }
        self.store
            .touch(&room_key, self.config.ref_storage_expire)
            .await?;

        for resource_id in resource_ids {
            let resource_key = self.config.resource_key(resource_id);
            if !self.store.contains(&resource_key, room_id).await? {
                log::trace!("room {} missing from resource {} map, adding", room_id, resource_id);
                let member = [room_id.to_string()];
                self.store.add(&resource_key, &member).await?;
            }
            self.store
                .touch(&resource_key, self.config.ref_storage_expire)
                .await?;
        }
        Ok(())
    }

    /// Remove resources from a room's working set, shrinking both sides.
    ///
    /// The room id itself is never removed from its own home association by
    /// this path. Only the intersection with current members is removed, and
    /// a resource whose room set would empty out loses the whole key.
    pub async fn remove_rel(&self, room_id: &str, remove_resource_ids: &[String]) -> Result<()> {
        let resource_ids: Vec<String> = remove_resource_ids
            .iter()
            .filter(|id| id.as_str() != room_id)
            .cloned()
            .collect();
        if resource_ids.is_empty() {
            return Ok(());
        }

        let room_key = self.config.room_key(room_id);
        if self.store.exists(&room_key).await? {
            let members: HashSet<String> =
                self.store.members(&room_key).await?.into_iter().collect();
            let inter: Vec<String> = resource_ids
                .iter()
                .filter(|id| members.contains(*id))
                .cloned()
                .collect();
            if !inter.is_empty() {
                self.store.remove(&room_key, &inter).await?;
            }
        }

        for resource_id in &resource_ids {
            let resource_key = self.config.resource_key(resource_id);
            if self.store.contains(&resource_key, room_id).await? {
                if self.store.size(&resource_key).await? == 1 {
                    log::trace!("resource {} leaving its last room {}", resource_id, room_id);
                }
                let member = [room_id.to_string()];
                self.store.remove(&resource_key, &member).await?;
            }
        }
        Ok(())
    }
}
