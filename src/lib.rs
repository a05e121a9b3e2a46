//! Marshal: a host harness for the primitive marshaling fixture
//!
//! The fixture (`marshal-guest`) exports one entry point per primitive type
//! and calling convention. This crate loads a compiled fixture into
//! wasmtime, checks its exports, and proves that every value comes back
//! transformed exactly as the shared rules in `marshal_abi` say.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Marshal Harness            │
//! │                                         │
//! │  config       - suite configuration     │
//! │  conformance  - checks and reports      │
//! │  runtime      - loading, staging, calls │
//! │                                         │
//! ├─────────────────────────────────────────┤
//! │        WASM Execution (wasmtime)        │
//! ├─────────────────────────────────────────┤
//! │   marshal-abi (rules + export table)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! let runtime = Runtime::new();
//! let module = runtime.load_module(&wasm_bytes)?;
//! let mut instance = module.instantiate()?;
//!
//! instance.validate_exports(&ScalarKind::ALL)?;
//! let report = Suite::new(HarnessConfig::default()).run(&mut instance);
//! assert!(report.is_success());
//! ```

pub mod config;
pub mod conformance;
pub mod logging;
pub mod runtime;

pub use marshal_abi as abi;

pub use config::{ConfigError, HarnessConfig, StringCase};
pub use conformance::{CaseError, CaseReport, Outcome, Report, Suite};
pub use runtime::{AppendOutcome, CompiledModule, Instance, Runtime, RuntimeError, WasmPrimitive};
