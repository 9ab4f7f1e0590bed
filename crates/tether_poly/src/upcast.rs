use core::fmt;

use tether_registered::NullReferenceError;

use crate::deref::{Dereference, DereferenceMut, Target, TargetMut};

// -----------------------------------------------------------------------------
// Upcast

/// Reads a `P: Dereference<U>` as a `T` through a projection.
///
/// The projection may select a field, or unsize `U` into a trait object it
/// implements. This is how a reference to a concrete type joins a set of
/// references to a more general one.
///
/// # Examples
///
/// ```
/// use core::fmt::Display;
/// use tether_poly::{Dereference, Upcast};
/// use tether_registered::Tracked;
///
/// fn as_display(value: &u32) -> &(dyn Display + 'static) {
///     value
/// }
///
/// let object = Tracked::new(7_u32);
/// let view = Upcast::<_, u32, dyn Display>::new(object.const_ptr(), as_display);
/// assert_eq!(view.dereference().unwrap().to_string(), "7");
/// ```
pub struct Upcast<P, U: ?Sized, T: ?Sized> {
    inner: P,
    project: fn(&U) -> &T,
}

impl<P, U: ?Sized, T: ?Sized> Upcast<P, U, T> {
    /// Wraps `inner` with the projection `project`.
    #[inline]
    pub const fn new(inner: P, project: fn(&U) -> &T) -> Self {
        Self { inner, project }
    }

    /// The wrapped reference.
    #[inline]
    pub fn get_ref(&self) -> &P {
        &self.inner
    }

    /// Unwraps the adapter.
    #[inline]
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Dereference<U>, U: ?Sized, T: ?Sized> Dereference<T> for Upcast<P, U, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        Ok(Target::map(self.inner.dereference()?, self.project))
    }
}

impl<P: Clone, U: ?Sized, T: ?Sized> Clone for Upcast<P, U, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self::new(self.inner.clone(), self.project)
    }
}

impl<P: fmt::Debug, U: ?Sized, T: ?Sized> fmt::Debug for Upcast<P, U, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Upcast").field(&self.inner).finish()
    }
}

// -----------------------------------------------------------------------------
// UpcastMut

/// Reads and writes a `P: DereferenceMut<U>` as a `T`.
///
/// Like [`Upcast`], with a second projection for exclusive access.
pub struct UpcastMut<P, U: ?Sized, T: ?Sized> {
    inner: P,
    project: fn(&U) -> &T,
    project_mut: fn(&mut U) -> &mut T,
}

impl<P, U: ?Sized, T: ?Sized> UpcastMut<P, U, T> {
    /// Wraps `inner` with a shared and an exclusive projection.
    #[inline]
    pub const fn new(inner: P, project: fn(&U) -> &T, project_mut: fn(&mut U) -> &mut T) -> Self {
        Self {
            inner,
            project,
            project_mut,
        }
    }

    /// The wrapped reference.
    #[inline]
    pub fn get_ref(&self) -> &P {
        &self.inner
    }

    /// Unwraps the adapter.
    #[inline]
    pub fn into_inner(self) -> P {
        self.inner
    }

    /// Drops the exclusive projection.
    #[inline]
    pub fn into_const(self) -> Upcast<P, U, T> {
        Upcast::new(self.inner, self.project)
    }
}

impl<P: Dereference<U>, U: ?Sized, T: ?Sized> Dereference<T> for UpcastMut<P, U, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        Ok(Target::map(self.inner.dereference()?, self.project))
    }
}

impl<P: DereferenceMut<U>, U: ?Sized, T: ?Sized> DereferenceMut<T> for UpcastMut<P, U, T> {
    #[inline]
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError> {
        let project_mut = self.project_mut;
        Ok(TargetMut::map(self.inner.dereference_mut()?, project_mut))
    }
}

impl<P: Clone, U: ?Sized, T: ?Sized> Clone for UpcastMut<P, U, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self::new(self.inner.clone(), self.project, self.project_mut)
    }
}

impl<P: fmt::Debug, U: ?Sized, T: ?Sized> fmt::Debug for UpcastMut<P, U, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UpcastMut").field(&self.inner).finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use tether_registered::Tracked;

    use super::{Upcast, UpcastMut};
    use crate::deref::{Dereference, DereferenceMut};

    trait Shape {
        fn area(&self) -> u32;
        fn scale(&mut self, by: u32);
    }

    struct Square(u32);

    impl Shape for Square {
        fn area(&self) -> u32 {
            self.0 * self.0
        }

        fn scale(&mut self, by: u32) {
            self.0 *= by;
        }
    }

    fn as_shape(square: &Square) -> &(dyn Shape + 'static) {
        square
    }

    fn as_shape_mut(square: &mut Square) -> &mut (dyn Shape + 'static) {
        square
    }

    fn side(square: &Square) -> &u32 {
        &square.0
    }

    fn side_mut(square: &mut Square) -> &mut u32 {
        &mut square.0
    }

    #[test]
    fn trait_object_projection() {
        let object = Tracked::new(Square(2));
        let mut shape =
            UpcastMut::<_, Square, dyn Shape>::new(object.ptr(), as_shape, as_shape_mut);

        assert_eq!(shape.dereference().unwrap().area(), 4);
        shape.dereference_mut().unwrap().scale(3);
        assert_eq!(object.borrow().0, 6);

        let view = shape.clone().into_const();
        drop(object);
        assert!(view.dereference().is_err());
        assert!(shape.dereference_mut().is_err());
    }

    #[test]
    fn field_projection() {
        let object = Tracked::new(Square(5));
        let mut field = UpcastMut::<_, Square, u32>::new(object.ptr(), side, side_mut);
        *field.dereference_mut().unwrap() = 9;
        assert_eq!(object.borrow().area(), 81);

        let read_only = Upcast::<_, Square, u32>::new(object.const_ptr(), side);
        assert_eq!(*read_only.dereference().unwrap(), 9);
        assert!(read_only.get_ref().points_to(&object));
    }
}
