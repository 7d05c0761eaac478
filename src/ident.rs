//! Numeric identities for atoms and atom spaces.
//!
//! An atom receives an [`AtomId`] the first time an [`AtomSpace`] admits it;
//! transient atoms have none. Spaces are identified by a [`SpaceId`] drawn
//! from the same allocator, so the two never collide inside one hierarchy.
//!
//! [`AtomSpace`]: crate::space::AtomSpace

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{AtomError, AtomResult};

/// Identity assigned to an atom on first admission into a space.
///
/// Uses `NonZeroU64` so that `Option<AtomId>` is the same size as `AtomId`;
/// the raw value 0 is the "unassigned" marker in atomic storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AtomId(NonZeroU64);

impl AtomId {
    /// Create an `AtomId` from a raw `u64`. Returns `None` for zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(AtomId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for AtomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an atom space (identity table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SpaceId(NonZeroU64);

impl SpaceId {
    /// Create a `SpaceId` from a raw `u64`. Returns `None` for zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(SpaceId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for SpaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe identity allocator.
///
/// Produces monotonically increasing IDs starting from 1. Shared between a
/// space and every frame layered on top of it via `Arc<IdAllocator>`.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Fresh allocator; the first identity handed out is 1.
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocator whose next identity is `start` (clamped to 1).
    pub fn starting_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }

    fn next_raw(&self) -> AtomResult<NonZeroU64> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        NonZeroU64::new(raw).ok_or(AtomError::IdentityExhausted)
    }

    /// Allocate the next atom identity.
    pub fn next_atom_id(&self) -> AtomResult<AtomId> {
        self.next_raw().map(AtomId)
    }

    /// Allocate the next space identity.
    pub fn next_space_id(&self) -> AtomResult<SpaceId> {
        self.next_raw().map(SpaceId)
    }

    /// Next raw identity, not consumed.
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
