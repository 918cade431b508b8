/// Invoke a macro once per suffix of the given type list, e.g. `(A, B, C)`, `(B, C)`, `(C)`.
#[macro_export]
macro_rules! for_every_tuple {
    ($m:ident !! $head_ty:ident) => {
        $m!($head_ty);
    };
    ($m:ident !! $head_ty:ident, $($tail_ty:ident),*) => (
        $m!($head_ty, $( $tail_ty ),*);
        $crate::for_every_tuple!($m !! $( $tail_ty ),*);
    );
}

/// Apply a macro to tuples of one up to twelve elements.
///
/// Twelve covers every aspect or entity template the engine has needed so far; larger sets can
/// nest tuples.
#[macro_export]
macro_rules! all_tuples {
    ($m:ident) => {
        $crate::for_every_tuple!($m !! A, B, C, D, E, F, G, H, I, J, K, L);
    };
}

#[cfg(test)]
mod tests {
    trait Arity {
        const ARITY: usize;
    }

    macro_rules! arity {
        ($($name: ident),*) => {
            impl<$($name),*> Arity for ($($name,)*) {
                const ARITY: usize = [$(stringify!($name)),*].len();
            }
        }
    }

    all_tuples!(arity);

    #[test]
    fn every_tuple_length_is_covered() {
        // Then
        assert_eq!(<(u8,)>::ARITY, 1);
        assert_eq!(<(u8, u16)>::ARITY, 2);
        assert_eq!(<(u8, u8, u8, u8, u8, u8)>::ARITY, 6);
        assert_eq!(
            <(u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8)>::ARITY,
            12
        );
    }
}
