//! Ancestor-root resolution.
pub mod roots;

pub use roots::{RootResolver, RootSet};
