//! Resource Pool
//!
//! Reusable playback instances with a fixed or growable capacity policy.
//!
//! Every instance lives in exactly one place: the free queue (reused in
//! insertion order) or the in-use set. Handles carry the id of the pool that
//! created them, so a handle can only ever be returned to its owner.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::PoolError;

// ═══════════════════════════════════════════════════════════════════════════════
// IDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Pool identifier
pub type PoolId = u32;

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

#[inline]
fn generate_pool_id() -> PoolId {
    NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a pooled instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    pool: PoolId,
    slot: u32,
}

impl PoolHandle {
    /// Owning pool
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// Instance index within the pool
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POLICY / STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Sizing and growth policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPolicy {
    /// Instances created up front
    #[serde(default = "default_initial_count")]
    pub initial_count: usize,
    /// Create a new instance when the free queue is empty
    #[serde(default)]
    pub growable: bool,
}

fn default_initial_count() -> usize {
    8
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            initial_count: default_initial_count(),
            growable: false,
        }
    }
}

impl PoolPolicy {
    pub fn fixed(initial_count: usize) -> Self {
        Self {
            initial_count,
            growable: false,
        }
    }

    pub fn growable(initial_count: usize) -> Self {
        Self {
            initial_count,
            growable: true,
        }
    }
}

/// Instance state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Free,
    InUse,
}

#[derive(Debug)]
struct PooledInstance<T> {
    instance: T,
    state: InstanceState,
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// Pool of reusable instances
#[derive(Debug)]
pub struct ResourcePool<T> {
    id: PoolId,
    policy: PoolPolicy,
    /// `None` once an instance has been destroyed by `clear`
    slots: Vec<Option<PooledInstance<T>>>,
    free: VecDeque<u32>,
    total_instantiated: usize,
}

impl<T> ResourcePool<T> {
    /// Create the pool and instantiate `policy.initial_count` free instances
    pub fn initialize(policy: PoolPolicy, mut instantiate: impl FnMut() -> T) -> Self {
        let mut pool = Self {
            id: generate_pool_id(),
            policy,
            slots: Vec::with_capacity(policy.initial_count),
            free: VecDeque::with_capacity(policy.initial_count),
            total_instantiated: 0,
        };

        for _ in 0..policy.initial_count {
            let slot = pool.push_instance(instantiate(), InstanceState::Free);
            pool.free.push_back(slot);
        }

        log::debug!(
            "Pool {} initialized with {} instances (growable: {})",
            pool.id,
            policy.initial_count,
            policy.growable
        );

        pool
    }

    fn push_instance(&mut self, instance: T, state: InstanceState) -> u32 {
        let slot = self.slots.len() as u32;
        self.slots.push(Some(PooledInstance { instance, state }));
        self.total_instantiated += 1;
        slot
    }

    fn handle(&self, slot: u32) -> PoolHandle {
        PoolHandle {
            pool: self.id,
            slot,
        }
    }

    /// Take a free instance
    ///
    /// When the queue is empty a growable pool instantiates exactly one new
    /// instance; a fixed pool returns `None`.
    pub fn acquire(&mut self, instantiate: impl FnOnce() -> T) -> Option<PoolHandle> {
        if let Some(slot) = self.free.pop_front() {
            if let Some(Some(entry)) = self.slots.get_mut(slot as usize) {
                entry.state = InstanceState::InUse;
            }
            return Some(self.handle(slot));
        }

        if !self.policy.growable {
            log::debug!("Pool {} exhausted (not growable)", self.id);
            return None;
        }

        let slot = self.push_instance(instantiate(), InstanceState::InUse);
        log::debug!("Pool {} grew to {} instances", self.id, self.total_instantiated);
        Some(self.handle(slot))
    }

    /// Return an instance to the free queue
    ///
    /// The caller resets the instance first. Double release and handles from
    /// other pools are rejected.
    pub fn release(&mut self, handle: PoolHandle) -> Result<(), PoolError> {
        if handle.pool != self.id {
            return Err(PoolError::ForeignHandle(handle));
        }

        let entry = match self.slots.get_mut(handle.slot as usize) {
            Some(Some(entry)) => entry,
            _ => return Err(PoolError::UnknownInstance(handle)),
        };

        if entry.state == InstanceState::Free {
            log::warn!("Pool {}: instance {} released twice", self.id, handle.slot);
            return Err(PoolError::DoubleRelease(handle));
        }

        entry.state = InstanceState::Free;
        self.free.push_back(handle.slot);
        Ok(())
    }

    /// Destroy every free instance
    ///
    /// In-use instances are left alone and can still be released afterwards.
    /// Returns the number of destroyed instances.
    pub fn clear(&mut self, mut destroy: impl FnMut(T)) -> usize {
        let mut destroyed = 0;
        while let Some(slot) = self.free.pop_front() {
            if let Some(entry) = self.slots.get_mut(slot as usize).and_then(Option::take) {
                destroy(entry.instance);
                destroyed += 1;
            }
        }
        log::debug!("Pool {} cleared {} free instances", self.id, destroyed);
        destroyed
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn policy(&self) -> PoolPolicy {
        self.policy
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        if handle.pool != self.id {
            return None;
        }
        self.slots
            .get(handle.slot as usize)
            .and_then(Option::as_ref)
            .map(|e| &e.instance)
    }

    pub fn state(&self, handle: PoolHandle) -> Option<InstanceState> {
        if handle.pool != self.id {
            return None;
        }
        self.slots
            .get(handle.slot as usize)
            .and_then(Option::as_ref)
            .map(|e| e.state)
    }

    pub fn is_free(&self, handle: PoolHandle) -> bool {
        self.state(handle) == Some(InstanceState::Free)
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|e| e.state == InstanceState::InUse)
            .count()
    }

    /// Instances created over the pool's lifetime (not reduced by `clear`)
    pub fn total_instantiated(&self) -> usize {
        self.total_instantiated
    }

    /// Instances that still exist
    pub fn live_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
