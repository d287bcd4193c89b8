//! Pool members: the recyclable capability and the shared handle the pool lends out.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A value that can be recycled through an `ObjectPool`.
///
/// The pool calls `reset` right after the factory produces a member and
/// again on every remand. `initialize` is never called by the pool; it is
/// the borrower's job after a fetch.
pub trait PoolMember: Send + 'static {
    /// Arguments needed to prepare the member for one use.
    type Args;

    /// Prepare the member for use.
    fn initialize(&mut self, args: Self::Args);

    /// Return the member to a clean baseline.
    fn reset(&mut self);
}

/// Pool-assigned identifier of a member, unique within one pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(u64);

impl MemberId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Slot<M> {
    id: MemberId,
    value: Mutex<M>,
}

/// Shared handle to a pooled member.
///
/// Cloning the handle does not clone the member. Two handles are equal
/// only when they point at the same member, which is how the pool tracks
/// membership.
pub struct Member<M> {
    slot: Arc<Slot<M>>,
}

impl<M> Member<M> {
    pub(crate) fn new(id: MemberId, value: M) -> Self {
        Self {
            slot: Arc::new(Slot {
                id,
                value: Mutex::new(value),
            }),
        }
    }

    pub fn id(&self) -> MemberId {
        self.slot.id
    }

    /// Lock the member value for reading or mutation.
    ///
    /// Drop the guard before handing the member back to the pool; remand
    /// locks the member to reset it.
    pub fn lock(&self) -> MutexGuard<'_, M> {
        self.slot.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles refer to the same member.
    pub fn ptr_eq(&self, other: &Member<M>) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<M: PoolMember> Member<M> {
    /// Shorthand for `member.lock().initialize(args)`.
    pub fn initialize(&self, args: M::Args) {
        self.lock().initialize(args);
    }

    pub(crate) fn reset(&self) {
        self.lock().reset();
    }
}

impl<M> Clone for Member<M> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<M> PartialEq for Member<M> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<M> Eq for Member<M> {}

impl<M> fmt::Debug for Member<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member").field("id", &self.slot.id).finish()
    }
}
