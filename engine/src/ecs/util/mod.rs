pub mod any;
pub mod macros;

pub use any::AsAny;
