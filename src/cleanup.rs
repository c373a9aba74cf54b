//! Element cleanup capability.
//!
//! A container holding a `Cleanup<T>` calls it on an element right
//! before that slot is overwritten, removed, cleared, or torn down with
//! the container. It is called exactly once per such occurrence and
//! never on reads. Moving a value out with `take` hands ownership to the
//! caller and skips the hook.
//!
//! The hook only ever receives `&mut T`; it has no path back to the
//! container that owns it.

/// Hook run on an element immediately before the container lets go of it.
pub trait Cleanup<T> {
    fn cleanup(&mut self, value: &mut T);
}

/// The default: nothing to release beyond `T`'s own `Drop`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoCleanup;

impl<T> Cleanup<T> for NoCleanup {
    #[inline]
    fn cleanup(&mut self, _value: &mut T) {}
}

impl<T, F> Cleanup<T> for F
where
    F: FnMut(&mut T),
{
    #[inline]
    fn cleanup(&mut self, value: &mut T) {
        self(value)
    }
}
