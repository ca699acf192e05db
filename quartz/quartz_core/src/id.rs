//! Strongly-typed identifiers for the Quartz session supervisor.
//!
//! Each identifier type is a thin wrapper around a UUID with a phantom type
//! parameter, so identifiers for different entities cannot be mixed up even
//! though they share the same underlying representation.
//!
//! # Examples
//!
//! ```
//! use quartz_core::id::{LaunchId, SessionId};
//!
//! let session_id = SessionId::new();
//! let launch_id = LaunchId::new();
//!
//! // Different ID types are different types, even with the same underlying UUID
//! assert_ne!(session_id.to_string(), launch_id.to_string());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A type-safe identifier based on UUID.
///
/// Specialized for different entity types using the phantom type parameter
/// `T`, ensuring that identifiers for different entity types cannot be
/// interchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: std::marker::PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Create an identifier from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Create a nil (all zeros) identifier, usable as a sentinel.
    pub fn nil() -> Self {
        Self {
            uuid: Uuid::nil(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Check if this is a nil identifier.
    pub fn is_nil(&self) -> bool {
        self.uuid == Uuid::nil()
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            uuid: Uuid::parse_str(s)?,
            _marker: std::marker::PhantomData,
        })
    }
}

/// Marker type for sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionMarker;
/// Identifier for one desktop session instance.
pub type SessionId = Id<SessionMarker>;

/// Marker type for module launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchMarker;
/// Identifier for one launch generation of a session module.
///
/// Every spawn of a module process gets a fresh `LaunchId`; exit
/// notifications carry the ID of the generation they belong to, so a
/// notification for a superseded process can be recognized and discarded.
pub type LaunchId = Id<LaunchMarker>;
