//! Code generation engine for the IDL wire format.
//!
//! Consumes the typed IR from `idl_types` and emits, per namespace, Rust data
//! definitions with hand-rolled serde codec impls that are byte-compatible
//! with the deployed JSON wire contract, plus a self-contained test suite
//! that validates the generated codec against an independent reference
//! encoder.

pub mod cmds;
pub mod codegen;
pub mod errors;
pub mod names;
pub mod testgen;
pub mod unregex;
pub mod writer;
