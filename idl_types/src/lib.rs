//! IDL Type Definitions
//!
//! This crate contains the core type definitions for the interface-description
//! IR consumed by the code generators. It provides pure data structures for
//! representing namespaces, data types and routes without any file I/O or
//! code generation logic. The IR is produced (and validated) by an upstream
//! compiler; everything here is read-only to the generators.

pub mod registry;
pub mod types;

// Re-export commonly used types at the crate root
pub use registry::*;
pub use types::*;
