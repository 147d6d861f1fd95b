//! Validated newtype wrappers for repository identifiers
//!
//! Using distinct types for node ids, aspect names, and logical folder paths
//! prevents accidentally passing a path where an id is expected. All
//! constructors validate their input and return [`DomainError`] on failure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Separator used in logical folder paths ("Company Home|Knowledge Base")
pub const PATH_SEPARATOR: char = '|';

// ============================================================================
// NodeId
// ============================================================================

/// Repository node identifier (an opaque UUID-like string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a `NodeId`, rejecting empty or whitespace-only values
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidNodeId(id));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// AspectName
// ============================================================================

/// A repository aspect QName such as `ai:synced` or `cm:generalclassifiable`
///
/// Aspects mark folders as belonging to a synchronization scope. The engine
/// never interprets the name beyond equality comparison, but a valid aspect
/// always carries a `prefix:localname` shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectName(String);

impl AspectName {
    /// Creates an `AspectName`, requiring a `prefix:localname` form
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let mut parts = name.splitn(2, ':');
        match (parts.next(), parts.next()) {
            (Some(prefix), Some(local)) if !prefix.is_empty() && !local.is_empty() => {
                Ok(Self(name))
            }
            _ => Err(DomainError::InvalidAspectName(name)),
        }
    }

    /// Returns the aspect name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AspectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// FolderPath
// ============================================================================

/// A logical, pipe-separated folder path rooted at the repository root
///
/// Example: `Company Home|Knowledge Base|Reports`. The first segment must be
/// the repository root name; resolution to a node id happens in the
/// repository adapter, segment by segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderPath(String);

impl FolderPath {
    /// Creates a `FolderPath`, requiring it to start at `root`
    pub fn rooted_at(path: impl Into<String>, root: &str) -> Result<Self, DomainError> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(DomainError::InvalidFolderPath(path));
        }
        if !path.starts_with(root) {
            return Err(DomainError::PathNotRooted {
                root: root.to_string(),
                path,
            });
        }
        Ok(Self(path))
    }

    /// Returns the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the path segments in root→leaf order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Returns a child path with `segment` appended
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}{}{}", self.0, PATH_SEPARATOR, segment))
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
