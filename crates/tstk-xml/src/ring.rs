//! Intrusive sibling ring
//!
//! A circular doubly-linked list threaded through the elements themselves.
//! The list has no head: whoever owns the ring keeps one member as its anchor.
//! A member that belongs to no ring links to itself.
//!
//! Links are addressed by key through a [`RingStore`], which lets an arena keep
//! the links inside its slots and refer to neighbours by index.

/// Previous and next members of a ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLink<K> {
    prev: K,
    next: K,
}

impl<K: Copy> RingLink<K> {
    /// Links of a member alone in its own ring
    #[inline]
    pub fn alone(me: K) -> Self {
        Self { prev: me, next: me }
    }

    /// Previous member
    #[inline]
    pub fn prev(&self) -> K {
        self.prev
    }

    /// Next member
    #[inline]
    pub fn next(&self) -> K {
        self.next
    }
}

/// Keyed access to the ring links of a set of members
pub trait RingStore<K: Copy + Eq> {
    fn link(&self, key: K) -> &RingLink<K>;
    fn link_mut(&mut self, key: K) -> &mut RingLink<K>;
}

/// Check if `key` is alone in its ring
#[inline]
pub fn is_alone<K: Copy + Eq, S: RingStore<K> + ?Sized>(store: &S, key: K) -> bool {
    store.link(key).next == key
}

/// Next member after `key`, `key` itself when alone
#[inline]
pub fn next<K: Copy + Eq, S: RingStore<K> + ?Sized>(store: &S, key: K) -> K {
    store.link(key).next
}

/// Previous member before `key`, `key` itself when alone
#[inline]
pub fn prev<K: Copy + Eq, S: RingStore<K> + ?Sized>(store: &S, key: K) -> K {
    store.link(key).prev
}

/// Remove `key` from its ring, leaving it alone
pub fn remove<K: Copy + Eq, S: RingStore<K> + ?Sized>(store: &mut S, key: K) {
    let RingLink { prev, next } = *store.link(key);
    store.link_mut(prev).next = next;
    store.link_mut(next).prev = prev;
    *store.link_mut(key) = RingLink::alone(key);
}

/// Insert `key` immediately before `anchor` in the anchor's ring
///
/// `key` leaves its current ring first. Since the ring is circular, inserting
/// before the anchor appends at the end of the traversal order.
pub fn insert_before<K: Copy + Eq, S: RingStore<K> + ?Sized>(store: &mut S, key: K, anchor: K) {
    remove(store, key);
    if key == anchor {
        return;
    }
    let prev = store.link(anchor).prev;
    *store.link_mut(key) = RingLink { prev, next: anchor };
    store.link_mut(prev).next = key;
    store.link_mut(anchor).prev = key;
}
