// cgrid-common - Shared domain values and wire model for the CellGrid client
//
// This crate defines the value objects callers build (keys, mutations,
// ranges, scan and writer options) and the wire-ready equivalents that are
// exchanged with the remote cell store.

pub mod options;
pub mod types;
pub mod wire;

// Re-export for convenience
pub use options::*;
pub use types::*;
pub use wire::*;
