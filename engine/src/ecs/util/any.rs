use std::any::Any;

/// Access to the concrete type behind a trait object.
///
/// Implemented for every sized `'static` type. Trait objects built on top of it (components,
/// systems, managers) get the methods through their vtable, so call them with the trait object as
/// the explicit receiver type, e.g. `AsAny::as_any(boxed.as_ref())`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
