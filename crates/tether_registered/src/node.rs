use core::cell::RefCell;
use core::fmt;
use core::marker::PhantomData;

use slotmap::{SlotMap, new_key_type};

use crate::list::{ListId, corrupted};

// -----------------------------------------------------------------------------
// Arena

new_key_type! {
    /// Generational key of an [`InvalidationNode`] in the per-thread arena.
    ///
    /// A stale key never resolves to a newer slot, so a destroyed node can
    /// not be confused with the one that reuses its storage.
    pub struct NodeKey;
}

/// Link state of one node.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NodeSlot {
    /// The list this node is linked into, if any.
    pub(crate) list: Option<ListId>,
    /// The next node of the same list.
    pub(crate) next: Option<NodeKey>,
}

impl NodeSlot {
    const UNLINKED: Self = Self {
        list: None,
        next: None,
    };
}

pub(crate) type NodeArena = SlotMap<NodeKey, NodeSlot>;

std::thread_local! {
    static NODES: RefCell<NodeArena> = RefCell::new(SlotMap::with_key());
}

/// Runs `f` on this thread's node arena.
///
/// Returns `None` once the arena has been torn down at thread exit; callers
/// then treat every node as unlinked.
///
/// `f` must not call back into this function.
#[inline]
pub(crate) fn with_nodes<R>(f: impl FnOnce(&mut NodeArena) -> R) -> Option<R> {
    NODES.try_with(|nodes| f(&mut nodes.borrow_mut())).ok()
}

// -----------------------------------------------------------------------------
// InvalidationNode

/// The membership record a handle embeds to join a
/// [`RegistrationList`](crate::RegistrationList).
///
/// The node is a key into a per-thread arena, so the value holding it can be
/// moved freely. A node is linked into at most one list at a time, and
/// invalidating it just clears its link.
///
/// Dropping a node that is still linked is a broken invariant and aborts.
pub struct InvalidationNode {
    key: NodeKey,
    _marker: PhantomData<*const ()>,
}

impl InvalidationNode {
    /// Allocates an unlinked node.
    pub fn new() -> Self {
        let key = with_nodes(|nodes| nodes.insert(NodeSlot::UNLINKED)).unwrap_or_default();
        Self {
            key,
            _marker: PhantomData,
        }
    }

    /// The arena key of this node.
    #[inline]
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// The list this node is currently linked into.
    pub fn list(&self) -> Option<ListId> {
        with_nodes(|nodes| nodes.get(self.key).and_then(|slot| slot.list)).flatten()
    }

    /// Returns `true` if the node is linked into some list.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.list().is_some()
    }
}

impl Default for InvalidationNode {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InvalidationNode {
    fn drop(&mut self) {
        let key = self.key;
        let slot = with_nodes(|nodes| nodes.remove(key)).flatten();
        if let Some(NodeSlot {
            list: Some(list), ..
        }) = slot
        {
            corrupted(format_args!("node {key:?} dropped while linked into list {list}"));
        }
    }
}

impl fmt::Debug for InvalidationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationNode")
            .field("key", &self.key)
            .field("list", &self.list())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{InvalidationNode, with_nodes};

    #[test]
    fn fresh_nodes_are_unlinked() {
        let a = InvalidationNode::new();
        let b = InvalidationNode::default();
        assert_ne!(a.key(), b.key());
        assert!(!a.is_linked());
        assert_eq!(b.list(), None);
    }

    #[test]
    fn drop_frees_the_slot() {
        let node = InvalidationNode::new();
        let key = node.key();
        assert_eq!(with_nodes(|nodes| nodes.contains_key(key)), Some(true));

        drop(node);
        assert_eq!(with_nodes(|nodes| nodes.contains_key(key)), Some(false));
    }

    #[test]
    fn moving_keeps_the_key() {
        let node = InvalidationNode::new();
        let key = node.key();
        let boxed = alloc::boxed::Box::new(node);
        assert_eq!(boxed.key(), key);
    }
}
