//! Utility functions for rule implementations.

pub mod paths;
pub mod suppression;

// Re-export commonly used utilities for rule implementations
#[doc(inline)]
pub use paths::PropertyPath;
#[doc(inline)]
pub use suppression::{check_suppression, SuppressCheck};
