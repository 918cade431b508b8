use crate::{
    all_tuples,
    ecs::component::{Component, Kind, Kinds},
};

/// A compile-time set of component types, used to name kinds without spelling out each one.
///
/// Implemented for every component type, for `()` and for tuples of other sets:
///
/// ```ignore
/// let aspect = Aspect::for_all(kinds.of::<(Position, Velocity)>());
/// ```
pub trait KindSet {
    /// Register each member with `kinds` and append its kind to `out`.
    fn collect(kinds: &Kinds, out: &mut Vec<Kind>);
}

impl KindSet for () {
    fn collect(_kinds: &Kinds, _out: &mut Vec<Kind>) {}
}

impl<C: Component> KindSet for C {
    fn collect(kinds: &Kinds, out: &mut Vec<Kind>) {
        out.push(kinds.register::<C>());
    }
}

macro_rules! tuple_kind_set {
    ($($name: ident),*) => {
        impl<$($name: KindSet),*> KindSet for ($($name,)*) {
            fn collect(kinds: &Kinds, out: &mut Vec<Kind>) {
                $(<$name as KindSet>::collect(kinds, out);)*
            }
        }
    }
}

all_tuples!(tuple_kind_set);
