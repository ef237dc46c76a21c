//! Slot generations
//!
//! Each arena slot carries a generation counter that moves forward every time
//! the slot is freed. A handle records the generation it was issued with, so a
//! handle to a destroyed node can be told apart from a handle to whatever node
//! later reuses the slot.

/// Generation counter of an arena slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Generation(u32);

impl Generation {
    /// Raw counter value
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Generation given to a slot once its node is freed
    #[inline]
    pub(crate) const fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}
