use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::node::{InvalidationNode, NodeArena, NodeKey, with_nodes};

// -----------------------------------------------------------------------------
// Fatal errors

/// A broken link invariant. The list can not be repaired, so this aborts.
#[cold]
#[inline(never)]
pub(crate) fn corrupted(args: fmt::Arguments<'_>) -> ! {
    log::error!("Registration list corrupted: {args}");
    std::process::abort()
}

#[derive(Debug, Error)]
enum ListFault {
    #[error("node {0:?} has no arena slot")]
    Missing(NodeKey),

    #[error("node {0:?} is linked into {1:?}")]
    Foreign(NodeKey, Option<ListId>),

    #[error("node {0:?} is not reachable from the head")]
    Unreachable(NodeKey),

    #[error("more nodes than the recorded length {0}")]
    Overrun(usize),
}

// -----------------------------------------------------------------------------
// ListId

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identity of a [`RegistrationList`].
///
/// Ids are never reused, so a node can tell which list it belongs to even
/// after that list is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(u64);

impl ListId {
    fn next() -> Self {
        Self(NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// -----------------------------------------------------------------------------
// RegistrationList

/// The set of [`InvalidationNode`]s that refer to one object.
///
/// Nodes are threaded through the per-thread arena by key, newest first.
///
/// - [`register`](Self::register) is O(1).
/// - [`unregister`](Self::unregister) is O(n), O(1) for the newest node.
/// - [`invalidate_all`](Self::invalidate_all) detaches every node in one walk.
///
/// Dropping the list invalidates whatever is still registered.
pub struct RegistrationList {
    id: ListId,
    head: Cell<Option<NodeKey>>,
    len: Cell<usize>,
    _marker: PhantomData<*const ()>,
}

impl RegistrationList {
    /// Creates an empty list with a fresh id.
    pub fn new() -> Self {
        Self {
            id: ListId::next(),
            head: Cell::new(None),
            len: Cell::new(0),
            _marker: PhantomData,
        }
    }

    /// The process-wide identity of this list.
    #[inline]
    pub fn id(&self) -> ListId {
        self.id
    }

    /// Returns the number of registered nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.get()
    }

    /// Returns `true` if no node is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.get().is_none()
    }

    /// Returns `true` if `node` is linked into this list.
    #[inline]
    pub fn contains(&self, node: &InvalidationNode) -> bool {
        node.list() == Some(self.id)
    }

    /// Links `node` at the front of the list.
    ///
    /// # Aborts
    ///
    /// If `node` is already linked into any list.
    pub fn register(&self, node: &InvalidationNode) {
        let key = node.key();
        let id = self.id;
        let head = self.head.get();

        let linked = with_nodes(|nodes| -> Result<(), ListFault> {
            let slot = nodes.get_mut(key).ok_or(ListFault::Missing(key))?;
            if slot.list.is_some() {
                return Err(ListFault::Foreign(key, slot.list));
            }
            slot.list = Some(id);
            slot.next = head;
            Ok(())
        });

        match linked {
            Some(Ok(())) => {
                self.head.set(Some(key));
                self.len.set(self.len.get() + 1);
            }
            Some(Err(fault)) => corrupted(format_args!("cannot register into list {id}: {fault}")),
            None => {}
        }
    }

    /// Splices `node` out of the list.
    ///
    /// # Aborts
    ///
    /// If `node` is not linked into this list.
    pub fn unregister(&self, node: &InvalidationNode) {
        let key = node.key();
        let id = self.id;
        let head = self.head.get();
        let len = self.len.get();

        let unlinked = with_nodes(|nodes| -> Result<Option<NodeKey>, ListFault> {
            let slot = nodes.get(key).ok_or(ListFault::Missing(key))?;
            if slot.list != Some(id) {
                return Err(ListFault::Foreign(key, slot.list));
            }
            let next = slot.next;

            let new_head = if head == Some(key) {
                next
            } else {
                let previous = find_previous(nodes, head, key, len)?;
                if let Some(slot) = nodes.get_mut(previous) {
                    slot.next = next;
                }
                head
            };

            if let Some(slot) = nodes.get_mut(key) {
                slot.list = None;
                slot.next = None;
            }
            Ok(new_head)
        });

        match unlinked {
            Some(Ok(new_head)) => {
                self.head.set(new_head);
                self.len.set(len - 1);
            }
            Some(Err(fault)) => corrupted(format_args!("cannot unregister from list {id}: {fault}")),
            None => {}
        }
    }

    /// Invalidates and detaches every registered node.
    ///
    /// Returns how many nodes were invalidated. An empty list is a no-op.
    ///
    /// # Aborts
    ///
    /// If the chain does not match the recorded membership.
    pub fn invalidate_all(&self) -> usize {
        let id = self.id;
        let Some(head) = self.head.take() else {
            return 0;
        };
        let expected = self.len.replace(0);

        let swept = with_nodes(|nodes| -> Result<usize, ListFault> {
            let mut cursor = Some(head);
            let mut count = 0;
            while let Some(key) = cursor {
                let slot = nodes.get_mut(key).ok_or(ListFault::Missing(key))?;
                if slot.list != Some(id) {
                    return Err(ListFault::Foreign(key, slot.list));
                }
                cursor = slot.next.take();
                slot.list = None;
                count += 1;
                if count > expected {
                    return Err(ListFault::Overrun(expected));
                }
            }
            Ok(count)
        });

        match swept {
            Some(Ok(count)) => {
                log::trace!("Invalidated {count} handle(s) of list {id}");
                count
            }
            Some(Err(fault)) => corrupted(format_args!("cannot invalidate list {id}: {fault}")),
            None => 0,
        }
    }

    /// The keys of all registered nodes, newest first.
    pub fn keys(&self) -> Vec<NodeKey> {
        let mut keys = Vec::with_capacity(self.len());
        with_nodes(|nodes| {
            let mut cursor = self.head.get();
            while let Some(key) = cursor
                && keys.len() < self.len()
            {
                keys.push(key);
                cursor = nodes.get(key).and_then(|slot| slot.next);
            }
        });
        keys
    }
}

/// Finds the node whose `next` is `key`, walking at most `len` nodes.
fn find_previous(
    nodes: &NodeArena,
    head: Option<NodeKey>,
    key: NodeKey,
    len: usize,
) -> Result<NodeKey, ListFault> {
    let mut cursor = head;
    for _ in 0..len {
        let Some(current) = cursor else {
            break;
        };
        let slot = nodes.get(current).ok_or(ListFault::Missing(current))?;
        if slot.next == Some(key) {
            return Ok(current);
        }
        cursor = slot.next;
    }
    Err(ListFault::Unreachable(key))
}

impl Default for RegistrationList {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RegistrationList {
    fn drop(&mut self) {
        self.invalidate_all();
    }
}

impl fmt::Debug for RegistrationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationList")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use proptest::prelude::*;

    use super::RegistrationList;
    use crate::node::InvalidationNode;

    #[test]
    fn register_pushes_front() {
        let a = InvalidationNode::new();
        let b = InvalidationNode::new();
        let c = InvalidationNode::new();
        let list = RegistrationList::new();

        list.register(&a);
        list.register(&b);
        list.register(&c);

        assert_eq!(list.len(), 3);
        assert_eq!(list.keys(), vec![c.key(), b.key(), a.key()]);
        assert!(list.contains(&b));
        assert_eq!(a.list(), Some(list.id()));
    }

    #[test]
    fn unregister_head_middle_and_tail() {
        let nodes: Vec<_> = (0..4).map(|_| InvalidationNode::new()).collect();
        let list = RegistrationList::new();
        nodes.iter().for_each(|n| list.register(n));

        // Front to back: 3, 2, 1, 0.
        list.unregister(&nodes[3]);
        list.unregister(&nodes[1]);
        list.unregister(&nodes[0]);

        assert_eq!(list.keys(), vec![nodes[2].key()]);
        assert!(!nodes[0].is_linked());
        assert!(!nodes[3].is_linked());

        list.unregister(&nodes[2]);
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn invalidate_all_detaches_everything() {
        let list = RegistrationList::new();
        assert_eq!(list.invalidate_all(), 0);

        let a = InvalidationNode::new();
        let b = InvalidationNode::new();
        list.register(&a);
        list.register(&b);

        assert_eq!(list.invalidate_all(), 2);
        assert!(list.is_empty());
        assert!(!a.is_linked());
        assert!(!b.is_linked());

        // Invalidated nodes may join another list.
        let other = RegistrationList::new();
        other.register(&a);
        assert!(other.contains(&a));
        assert!(!list.contains(&a));
        other.unregister(&a);
    }

    #[test]
    fn dropping_the_list_invalidates() {
        let node = InvalidationNode::new();
        {
            let list = RegistrationList::new();
            list.register(&node);
        }
        assert!(!node.is_linked());
    }

    #[test]
    fn ids_are_unique() {
        let a = RegistrationList::new();
        let b = RegistrationList::new();
        assert_ne!(a.id(), b.id());
        assert!(b.id().get() > a.id().get());
    }

    #[derive(Clone, Debug)]
    enum Op {
        Register(usize),
        Unregister(usize),
        InvalidateAll,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8).prop_map(Op::Register),
            (0usize..8).prop_map(Op::Unregister),
            Just(Op::InvalidateAll),
        ]
    }

    proptest! {
        #[test]
        fn list_matches_model(ops in proptest::collection::vec(op(), 0..64)) {
            let nodes: Vec<_> = (0..8).map(|_| InvalidationNode::new()).collect();
            let list = RegistrationList::new();
            // Model: registered indices, newest first.
            let mut model: Vec<usize> = Vec::new();

            for op in ops {
                match op {
                    Op::Register(i) if !model.contains(&i) => {
                        list.register(&nodes[i]);
                        model.insert(0, i);
                    }
                    Op::Unregister(i) if model.contains(&i) => {
                        list.unregister(&nodes[i]);
                        model.retain(|&m| m != i);
                    }
                    Op::InvalidateAll => {
                        prop_assert_eq!(list.invalidate_all(), model.len());
                        model.clear();
                    }
                    _ => {}
                }

                let expected: Vec<_> = model.iter().map(|&i| nodes[i].key()).collect();
                prop_assert_eq!(list.keys(), expected);
                prop_assert_eq!(list.len(), model.len());
                for (i, node) in nodes.iter().enumerate() {
                    prop_assert_eq!(list.contains(node), model.contains(&i));
                }
            }
        }
    }
}
