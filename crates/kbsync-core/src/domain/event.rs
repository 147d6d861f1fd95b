//! Repository node events
//!
//! A [`NodeEvent`] is an immutable snapshot delivered by the content
//! repository when a node is created, updated, or deleted. The engine never
//! owns the repository's data; events carry everything a handler needs to
//! decide whether and how to act.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{AspectName, NodeId};

/// Property key carrying a node's title
pub const PROP_TITLE: &str = "cm:title";

/// Kind of repository event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A node was created
    Created,
    /// A node's name, content, or properties changed
    Updated,
    /// A node was deleted
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Created => f.write_str("created"),
            EventKind::Updated => f.write_str("updated"),
            EventKind::Deleted => f.write_str("deleted"),
        }
    }
}

/// An immutable node event snapshot from the repository
///
/// For `Updated` events the `*_before` fields carry the prior values of the
/// attributes that changed; for `Created` and `Deleted` events they are
/// empty. `ancestors` lists the primary folder hierarchy in root→leaf order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEvent {
    /// What happened to the node
    pub kind: EventKind,
    /// The affected node
    pub node_id: NodeId,
    /// Node name at the time of the event
    pub name: String,
    /// Whether the node is a file (content-bearing)
    pub is_file: bool,
    /// Whether the node is a folder
    pub is_folder: bool,
    /// Primary folder hierarchy, root first
    #[serde(default)]
    pub ancestors: Vec<NodeId>,
    /// Aspects present before the event (Updated only)
    #[serde(default)]
    pub aspects_before: Vec<AspectName>,
    /// Aspects present after the event
    #[serde(default)]
    pub aspects: Vec<AspectName>,
    /// Properties before the event (Updated only)
    #[serde(default)]
    pub properties_before: HashMap<String, String>,
    /// Properties after the event
    #[serde(default)]
    pub properties: HashMap<String, String>,
    /// Content hash before the event, when the content changed
    #[serde(default)]
    pub content_hash_before: Option<String>,
    /// Content hash after the event
    #[serde(default)]
    pub content_hash: Option<String>,
}

impl NodeEvent {
    /// Returns true if the node's content changed in this event
    pub fn content_changed(&self) -> bool {
        match (&self.content_hash_before, &self.content_hash) {
            (Some(before), Some(after)) => before != after,
            (Some(_), None) | (None, Some(_)) => self.kind == EventKind::Updated,
            (None, None) => false,
        }
    }

    /// Returns true if the node's name changed in this event
    pub fn name_changed(&self) -> bool {
        self.properties_before
            .get("cm:name")
            .map(|before| before != &self.name)
            .unwrap_or(false)
    }

    /// Returns true if the node's title property changed in this event
    pub fn title_changed(&self) -> bool {
        match self.properties_before.get(PROP_TITLE) {
            Some(before) => self.properties.get(PROP_TITLE) != Some(before),
            None => false,
        }
    }
}
