//! Resources: exclusive claim domains for physical subsystems.
//!
//! A `Resource` holds at most one owning task and an optional default task.
//! Ownership is only ever mutated by the scheduler; `claim` never interrupts
//! a previous owner on its own, it refuses instead.
//!
//! Requirement sets are `u64` bitmasks indexed by `ResourceId`, so checking
//! a task's requirements against the set of owned resources is a single `&`.

use std::fmt;

use robo_common::consts::MAX_RESOURCES;
use static_assertions::const_assert;

use crate::error::SchedulerError;
use crate::task::TaskId;

const_assert!(MAX_RESOURCES <= u64::BITS as usize);

/// Index of a resource in the scheduler's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u8);

impl ResourceId {
    /// Build an id from its raw index, `None` if it cannot fit a `ResourceSet`.
    ///
    /// Ids are normally obtained from `Scheduler::register_resource`; a raw
    /// id that was never registered is rejected at schedule time.
    #[inline]
    pub const fn from_raw(index: u8) -> Option<Self> {
        if (index as usize) < MAX_RESOURCES {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Raw registry index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    const fn bit(self) -> u64 {
        1u64 << self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Set of resource ids (bit `i` set = resource `i` required).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceSet(u64);

impl ResourceSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Set containing a single resource.
    #[inline]
    pub const fn single(id: ResourceId) -> Self {
        Self(id.bit())
    }

    /// Return a copy of this set with `id` added.
    #[inline]
    #[must_use]
    pub const fn with(self, id: ResourceId) -> Self {
        Self(self.0 | id.bit())
    }

    /// Add `id` to the set.
    #[inline]
    pub fn insert(&mut self, id: ResourceId) {
        self.0 |= id.bit();
    }

    /// Remove `id` from the set.
    #[inline]
    pub fn remove(&mut self, id: ResourceId) {
        self.0 &= !id.bit();
    }

    #[inline]
    pub const fn contains(self, id: ResourceId) -> bool {
        self.0 & id.bit() != 0
    }

    /// True if the two sets share at least one resource.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate ids in ascending order.
    pub fn iter(self) -> ResourceSetIter {
        ResourceSetIter(self.0)
    }
}

impl FromIterator<ResourceId> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = ResourceId>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl IntoIterator for ResourceSet {
    type Item = ResourceId;
    type IntoIter = ResourceSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over a `ResourceSet`.
#[derive(Debug, Clone)]
pub struct ResourceSetIter(u64);

impl Iterator for ResourceSetIter {
    type Item = ResourceId;

    fn next(&mut self) -> Option<ResourceId> {
        if self.0 == 0 {
            return None;
        }
        let index = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(ResourceId(index as u8))
    }
}

/// A registered resource with its ownership token.
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    name: String,
    owner: Option<TaskId>,
    default_task: Option<TaskId>,
}

impl Resource {
    pub(crate) fn new(id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            owner: None,
            default_task: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Task currently owning this resource.
    #[inline]
    pub fn owner(&self) -> Option<TaskId> {
        self.owner
    }

    /// Task re-armed whenever this resource goes idle.
    #[inline]
    pub fn default_task(&self) -> Option<TaskId> {
        self.default_task
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.owner.is_none()
    }

    pub(crate) fn set_default_task(&mut self, task: TaskId) {
        self.default_task = Some(task);
    }

    /// Take ownership for `task`.
    ///
    /// Re-claiming by the current owner is accepted. A different owner is a
    /// conflict: the caller must interrupt it first.
    pub(crate) fn claim(&mut self, task: TaskId) -> Result<(), SchedulerError> {
        match self.owner {
            Some(owner) if owner != task => Err(SchedulerError::ResourceConflict {
                resource: self.id,
                owner,
            }),
            _ => {
                self.owner = Some(task);
                Ok(())
            }
        }
    }

    /// Release ownership if held by `task`. Returns `true` if released.
    pub(crate) fn release(&mut self, task: TaskId) -> bool {
        if self.owner == Some(task) {
            self.owner = None;
            true
        } else {
            false
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
