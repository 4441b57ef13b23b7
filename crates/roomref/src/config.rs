//
// config.rs
//
// Configuration for the room-resource reference index
//

use std::time::Duration;

/// Shared expiry applied on every touch of a room or resource key.
///
/// The association is a rebuildable cache artifact, so the TTL only has to
/// be long enough that quiet rooms do not lose their index between visits.
pub const REF_STORAGE_EXPIRE: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Default namespace prefix for room-side keys.
pub const ROOM_RELATE_PREFIX: &str = "roomref:room:";

/// Default namespace prefix for resource-side keys.
pub const RESOURCE_RELATE_PREFIX: &str = "roomref:resource:";

/// Reference index configuration
#[derive(Debug, Clone)]
pub struct RoomrefConfig {
    /// Expiry applied to room and resource keys on every touch
    pub ref_storage_expire: Duration,
    /// Namespace prefix for room-side keys (room -> resources)
    pub room_key_prefix: String,
    /// Namespace prefix for resource-side keys (resource -> rooms)
    pub resource_key_prefix: String,
}

impl Default for RoomrefConfig {
    fn default() -> Self {
        Self {
            ref_storage_expire: REF_STORAGE_EXPIRE,
            room_key_prefix: ROOM_RELATE_PREFIX.to_string(),
            resource_key_prefix: RESOURCE_RELATE_PREFIX.to_string(),
        }
    }
}

impl RoomrefConfig {
    /// Cache key holding the resource set of a room.
    pub fn room_key(&self, room_id: &str) -> String {
        format!("{}{}", self.room_key_prefix, room_id)
    }

    /// Cache key holding the room set of a resource.
    pub fn resource_key(&self, resource_id: &str) -> String {
        format!("{}{}", self.resource_key_prefix, resource_id)
    }
}
