//! Shared types for flatworm
//!
//! This crate provides common types used across the flatworm ecosystem,
//! including synthetic fragment identifiers and their allocator.

use serde::{Deserialize, Serialize};

/// Synthetic fragment identifier
///
/// Assigned to fragments that carry no explicit anchor, so that every
/// linkable location still has a stable key (e.g. `api/#42`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sid(pub u64);

impl Sid {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Sid {
    fn from(id: u64) -> Self {
        Sid(id)
    }
}

impl From<Sid> for u64 {
    fn from(id: Sid) -> Self {
        id.0
    }
}

impl std::fmt::Display for Sid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocator for synthetic fragment identifiers
///
/// Owned by whoever numbers a document (the graph assembler); ids are
/// monotonically increasing within one allocator and never reused.
#[derive(Debug, Default)]
pub struct SidAllocator {
    next: u64,
}

impl SidAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> Sid {
        let sid = Sid(self.next);
        self.next += 1;
        sid
    }
}
