//! Binary chunk decoding: turns a byte buffer into a [`Prototype`] tree.

pub mod reader;

pub use reader::{load, load_with_limits};
