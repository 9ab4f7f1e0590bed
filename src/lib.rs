#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use tether_poly as poly;
pub use tether_registered as registered;
pub use tether_union as union;
pub use tether_utils as utils;

#[cfg(test)]
mod tests {
    use crate::poly::{Dereference, PolyRef};
    use crate::registered::{AllocationRegistry, InvalidDeallocationError, Tracked, TrackedPtr};
    use crate::union::{TaggedUnion, TypeMismatchError, tagged_union};

    #[test]
    fn dropped_object_nulls_its_handle() {
        let object = Tracked::new(5);
        let handle = object.ptr();
        assert_eq!(*handle.borrow().unwrap(), 5);

        drop(object);
        assert!(handle.is_null());
        assert!(handle.borrow().is_err());
    }

    #[test]
    fn dropping_one_handle_keeps_the_other() {
        let object = Tracked::new(5);
        let first = object.ptr();
        let second = object.ptr();
        assert_eq!(object.handle_count(), 2);

        drop(first);
        assert_eq!(object.handle_count(), 1);
        assert_eq!(*second.borrow().unwrap(), 5);

        drop(object);
        assert!(second.is_null());
    }

    tagged_union! {
        #[derive(Debug)]
        enum Number: NumberTag {
            Int(i32),
            Double(f64),
        }
    }

    #[test]
    fn union_access_is_type_checked() {
        let mut union = TaggedUnion::<Number>::new();
        union.set(42_i32);

        assert_eq!(union.get::<i32>(), Ok(&42));
        assert_eq!(union.tag(), Some(NumberTag::Int));
        assert!(matches!(
            union.get::<f64>(),
            Err(TypeMismatchError::WrongType { .. })
        ));
    }

    #[test]
    fn second_deallocation_is_rejected() {
        let mut registry = AllocationRegistry::new();
        let handle: TrackedPtr<i32> = registry.allocate(7);
        assert_eq!(*handle.borrow().unwrap(), 7);

        assert_eq!(registry.deallocate(&handle), Ok(()));
        assert!(handle.is_null());
        assert!(matches!(
            registry.deallocate(&handle),
            Err(InvalidDeallocationError::NullHandle { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn poly_ref_aliases_the_target() {
        let object = Tracked::new(1);
        let handle = object.ptr();
        let poly = PolyRef::from(handle.clone());
        assert_eq!(*poly.dereference().unwrap(), *handle.borrow().unwrap());

        object.set(2);
        assert_eq!(*poly.dereference().unwrap(), 2);
        assert_eq!(*handle.borrow().unwrap(), 2);
    }
}
