//! Process-wide logging setup.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::{init, init_with_default};
