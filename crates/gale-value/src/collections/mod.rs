//! Collection types: ordered arrays and keyed objects.

pub mod array;
pub mod object;

pub use array::Array;
pub use object::{KeyCase, Object};
