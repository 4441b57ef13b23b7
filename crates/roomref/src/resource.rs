//
// resource.rs
//
// Resource id typing for the room-resource reference index
//

use serde::{Deserialize, Serialize};

/// Length of the type prefix at the front of every resource id.
const PREFIX_LEN: usize = 3;

/// The four kinds of collaborative resource a room can reference.
///
/// Resource ids carry their type as a 3-character prefix; the prefix is
/// decoded once at the boundary and type dispatch happens on this enum,
/// never on raw string prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Datasheet,
    Form,
    Dashboard,
    Widget,
}

impl ResourceType {
    /// The 3-character id prefix of this resource type.
    pub const fn prefix(self) -> &'static str {
        match self {
            ResourceType::Datasheet => "dst",
            ResourceType::Form => "fom",
            ResourceType::Dashboard => "dsb",
            ResourceType::Widget => "wdt",
        }
    }

    /// Decode the resource type of an id from its prefix.
    ///
    /// Returns `None` for ids shorter than the prefix or with an
    /// unrecognized prefix; type-filtered paths skip those ids.
    pub fn of(id: &str) -> Option<ResourceType> {
        match id.get(..PREFIX_LEN)? {
            "dst" => Some(ResourceType::Datasheet),
            "fom" => Some(ResourceType::Form),
            "dsb" => Some(ResourceType::Dashboard),
            "wdt" => Some(ResourceType::Widget),
            _ => None,
        }
    }
}

/// Whether an id names a datasheet. Room ids equal to a datasheet id denote
/// that datasheet's home room, so this test appears on every lookup path.
pub fn is_datasheet(id: &str) -> bool {
    matches!(ResourceType::of(id), Some(ResourceType::Datasheet))
}

/// Latest applied-change sequence number of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRevision {
    pub resource_id: String,
    pub revision: u64,
}
