#![allow(dead_code)]
pub mod fixtures;
pub mod test_stack;

pub use fixtures::*;
pub use test_stack::*;
