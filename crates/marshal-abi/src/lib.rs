//! Shared definitions for the primitive marshaling fixture.
//!
//! Both sides of the boundary depend on this crate: the guest uses the
//! transform rules to implement its entry points, and the host uses the same
//! rules (plus the export table) to compute expected results and to validate
//! a loaded module.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  primitive - per-type rule (Primitive)       │
//! │  exports   - entry point names + signatures  │
//! │  cstr      - bounded NUL-terminated buffer   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The crate is `no_std` unless the `std` feature is enabled, so it can be
//! compiled into a `wasm32-unknown-unknown` guest without an allocator.

#![cfg_attr(not(feature = "std"), no_std)]

mod cstr;
mod exports;
mod primitive;

pub use cstr::{AppendError, CStrBuf, GREETING_SUFFIX};
pub use exports::{export_name, find_export, Convention, ExportSpec, Signature, WasmType, EXPORTS};
pub use primitive::{transform_buffer, transform_ref, Char8, Primitive, ScalarKind};
