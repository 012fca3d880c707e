//! Distributive number normalization and entity resolution.

mod normalize;
mod resolve;

pub use normalize::*;
pub use resolve::*;
