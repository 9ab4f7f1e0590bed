use core::any::{TypeId, type_name};
use core::fmt;

use tether_utils::TypeIdMap;
use tether_utils::hash::HashSet;

use crate::error::InvalidDeallocationError;
use crate::handle::{TrackedHandle, TrackedPtr};
use crate::tracked::Tracked;

// -----------------------------------------------------------------------------
// AllocationRegistry

/// A ledger of heap objects created through it, one address set per type.
///
/// [`allocate`](Self::allocate) hands out a handle instead of an owner. The
/// object lives until [`deallocate`](Self::deallocate) is called with any
/// handle to it, after which every handle is null. A second `deallocate` is
/// reported as an error instead of freeing twice.
///
/// The registry is an ordinary value. Pass it to the code that allocates and
/// frees; there is no global instance.
///
/// # Examples
///
/// ```
/// use tether_registered::{AllocationRegistry, InvalidDeallocationError};
///
/// let mut registry = AllocationRegistry::new();
/// let handle = registry.allocate(7);
/// assert_eq!(*handle.borrow().unwrap(), 7);
///
/// registry.deallocate(&handle).unwrap();
/// assert!(handle.is_null());
/// assert!(matches!(
///     registry.deallocate(&handle),
///     Err(InvalidDeallocationError::NullHandle { .. }),
/// ));
/// ```
///
/// Addresses enter the ledger only through `allocate`, so an object owned
/// elsewhere can never be recorded and freed behind its owner:
///
/// ```compile_fail
/// use tether_registered::{AllocationRegistry, Tracked, TrackedHandle};
///
/// let mut registry = AllocationRegistry::new();
/// let object = Tracked::new(1);
/// let address = object.ptr().address().unwrap().get();
/// unsafe { registry.track::<i32>(address) };
/// ```
#[derive(Default)]
pub struct AllocationRegistry {
    ledger: TypeIdMap<HashSet<usize>>,
}

impl AllocationRegistry {
    /// Creates an empty registry.
    #[inline]
    pub const fn new() -> Self {
        Self {
            ledger: TypeIdMap::new(),
        }
    }

    /// Records a live `V` allocation at `address`.
    ///
    /// Only [`allocate`](Self::allocate) produces addresses that may be
    /// recorded, so this stays private to the crate.
    ///
    /// # Safety
    ///
    /// [`deallocate`](Self::deallocate) turns a recorded address back into
    /// the owning [`Tracked<V>`] and drops it. `address` must therefore be
    /// either the heap block of a `Tracked<V>` given up through
    /// `Tracked::into_raw`, with no remaining owner, or an address no handle
    /// can ever point at.
    ///
    /// # Panics
    ///
    /// If the address is already recorded for `V`.
    pub(crate) unsafe fn track<V: 'static>(&mut self, address: usize) {
        let inserted = self
            .ledger
            .get_or_insert_type::<V>(HashSet::default)
            .insert(address);
        assert!(
            inserted,
            "`{}` allocation at {address:#x} is already tracked",
            type_name::<V>(),
        );
    }

    /// Forgets the `V` allocation at `address`. Nothing is freed.
    ///
    /// # Errors
    ///
    /// [`InvalidDeallocationError::NotTracked`] if no such allocation is
    /// recorded.
    pub fn release<V: 'static>(&mut self, address: usize) -> Result<(), InvalidDeallocationError> {
        let removed = self
            .ledger
            .get_mut(&TypeId::of::<V>())
            .is_some_and(|addresses| addresses.remove(&address));
        if !removed {
            return Err(InvalidDeallocationError::NotTracked {
                type_name: type_name::<V>(),
                address,
            });
        }
        Ok(())
    }

    /// Returns `true` if a `V` allocation is recorded at `address`.
    pub fn contains<V: 'static>(&self, address: usize) -> bool {
        self.ledger
            .get_type::<V>()
            .is_some_and(|addresses| addresses.contains(&address))
    }

    /// Returns the number of live allocations of all types.
    pub fn len(&self) -> usize {
        self.ledger.values().map(HashSet::len).sum()
    }

    /// Returns `true` if no allocation is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves `value` into a new heap object and returns a handle to it.
    pub fn allocate<V: 'static>(&mut self, value: V) -> TrackedPtr<V> {
        let tracked = Tracked::new(value);
        let handle = tracked.ptr();
        let address = tracked.into_raw().addr().get();
        // SAFETY: `into_raw` released the only owner of the object.
        unsafe { self.track::<V>(address) };
        log::trace!("Allocated `{}` at {address:#x}", type_name::<V>());
        handle
    }

    /// Destroys the object `handle` points at.
    ///
    /// Every handle to the object, `handle` included, is null afterwards.
    ///
    /// # Errors
    ///
    /// - [`InvalidDeallocationError::NullHandle`] if `handle` is null, which
    ///   covers a repeated `deallocate` through the same handle.
    /// - [`InvalidDeallocationError::NotTracked`] if the object was not
    ///   created by this registry.
    pub fn deallocate<V: 'static>(
        &mut self,
        handle: &impl TrackedHandle<V>,
    ) -> Result<(), InvalidDeallocationError> {
        let Some(target) = handle.raw().target() else {
            return Err(InvalidDeallocationError::NullHandle {
                type_name: type_name::<V>(),
            });
        };
        self.release::<V>(target.addr().get())?;
        // SAFETY: only `allocate` records addresses of this type, each from
        // `Tracked::into_raw`, and `release` just removed the only record.
        drop(unsafe { Tracked::from_raw(target) });
        Ok(())
    }
}

impl Drop for AllocationRegistry {
    fn drop(&mut self) {
        let outstanding = self.len();
        if outstanding != 0 {
            log::warn!("AllocationRegistry dropped with {outstanding} live allocation(s), leaking them");
        }
    }
}

impl fmt::Debug for AllocationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationRegistry")
            .field("types", &self.ledger.len())
            .field("allocations", &self.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::AllocationRegistry;
    use crate::{InvalidDeallocationError, Tracked, TrackedConstPtr, TrackedHandle};

    #[test]
    fn allocate_then_deallocate_once() {
        let mut registry = AllocationRegistry::new();
        let handle = registry.allocate(7_i32);
        let copy = handle.clone();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<i32>(handle.address().unwrap().get()));

        assert_eq!(registry.deallocate(&handle), Ok(()));
        assert!(registry.is_empty());
        assert!(handle.is_null() && copy.is_null());

        assert_eq!(
            registry.deallocate(&copy),
            Err(InvalidDeallocationError::NullHandle { type_name: "i32" }),
        );
    }

    #[test]
    fn const_view_can_deallocate() {
        let mut registry = AllocationRegistry::new();
        let handle = registry.allocate(String::from("heap"));
        let view = TrackedConstPtr::from(handle.clone());

        assert_eq!(registry.deallocate(&view), Ok(()));
        assert!(handle.is_null());
    }

    #[test]
    fn foreign_objects_are_rejected() {
        let mut registry = AllocationRegistry::new();
        let local = Tracked::new(1_u64);
        let handle = local.ptr();

        let err = registry.deallocate(&handle).unwrap_err();
        assert!(matches!(err, InvalidDeallocationError::NotTracked { .. }));
        // Nothing was freed.
        assert_eq!(*handle.borrow().unwrap(), 1);
    }

    #[test]
    fn owned_object_survives_a_released_address() {
        let mut registry = AllocationRegistry::new();
        let heap = registry.allocate(1_u32);
        let local = Tracked::new(2_u32);
        let local_handle = local.ptr();

        let address = heap.address().unwrap().get();
        assert_eq!(registry.release::<u32>(address), Ok(()));
        // The ledger no longer knows either object, so neither is freed.
        assert!(matches!(
            registry.deallocate(&heap),
            Err(InvalidDeallocationError::NotTracked { .. })
        ));
        assert!(matches!(
            registry.deallocate(&local_handle),
            Err(InvalidDeallocationError::NotTracked { .. })
        ));
        assert_eq!(*heap.borrow().unwrap(), 1);
        assert_eq!(*local_handle.borrow().unwrap(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn ledgers_are_per_type() {
        let mut registry = AllocationRegistry::new();
        // SAFETY: no object lives at these addresses.
        unsafe {
            registry.track::<u8>(0x10);
            registry.track::<u16>(0x10);
        }
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.release::<u8>(0x10), Ok(()));
        assert!(!registry.contains::<u8>(0x10));
        assert!(registry.contains::<u16>(0x10));
        assert_eq!(
            registry.release::<u8>(0x10),
            Err(InvalidDeallocationError::NotTracked {
                type_name: "u8",
                address: 0x10,
            }),
        );
        assert_eq!(registry.release::<u16>(0x10), Ok(()));
    }

    #[test]
    #[should_panic(expected = "already tracked")]
    fn double_track_panics() {
        let mut registry = AllocationRegistry::new();
        // SAFETY: no object lives at this address.
        unsafe {
            registry.track::<u8>(0x20);
            registry.track::<u8>(0x20);
        }
    }
}
