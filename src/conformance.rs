//! Conformance suite
//!
//! Drives every entry point of a loaded fixture with representative values
//! and compares what comes back against the transform rules in
//! `marshal_abi`.
//!
//! Per kind, the suite runs:
//!
//! ```text
//! value       scalar, idempotence
//! reference   reference, null-reference
//! buffer      buffer, empty-buffer, bounded-count
//! ```
//!
//! plus the four string-append checks when `char` is selected.

use crate::config::{HarnessConfig, StringCase};
use crate::runtime::{AppendOutcome, Instance, RuntimeError, WasmPrimitive};
use marshal_abi::{
    export_name, AppendError, Char8, Convention, Primitive, ScalarKind, GREETING_SUFFIX,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// Why a single case failed.
#[derive(Error, Debug)]
pub enum CaseError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("{0}")]
    Mismatch(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { reason: String },
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub export: &'static str,
    pub kind: ScalarKind,
    pub convention: Convention,
    pub check: &'static str,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub cases: Vec<CaseReport>,
}

impl Report {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| !c.outcome.is_passed())
    }

    pub fn find(&self, export: &str, check: &str) -> Option<&CaseReport> {
        self.cases
            .iter()
            .find(|c| c.export == export && c.check == check)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            match &case.outcome {
                Outcome::Passed => writeln!(f, "ok    {:<24} {}", case.export, case.check)?,
                Outcome::Failed { reason } => writeln!(
                    f,
                    "FAIL  {:<24} {}: {}",
                    case.export, case.check, reason
                )?,
            }
        }
        write!(f, "{} passed, {} failed", self.passed(), self.failed())
    }
}

type Check = fn(&mut Instance, &str) -> Result<(), CaseError>;
type StringCheck = fn(&mut Instance, &str, &StringCase) -> Result<(), CaseError>;

pub struct Suite {
    config: HarnessConfig,
}

impl Suite {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn run(&self, instance: &mut Instance) -> Report {
        let mut report = Report::default();

        for &kind in &self.config.kinds {
            let keep_going = match kind {
                ScalarKind::I8 => self.run_kind::<i8>(instance, &mut report),
                ScalarKind::I16 => self.run_kind::<i16>(instance, &mut report),
                ScalarKind::I32 => self.run_kind::<i32>(instance, &mut report),
                ScalarKind::I64 => self.run_kind::<i64>(instance, &mut report),
                ScalarKind::F32 => self.run_kind::<f32>(instance, &mut report),
                ScalarKind::F64 => self.run_kind::<f64>(instance, &mut report),
                ScalarKind::Char => {
                    self.run_kind::<Char8>(instance, &mut report)
                        && self.run_string(instance, &mut report)
                }
                ScalarKind::Bool => self.run_kind::<bool>(instance, &mut report),
            };
            if !keep_going {
                break;
            }
        }

        info!(
            passed = report.passed(),
            failed = report.failed(),
            "conformance run finished"
        );
        report
    }

    /// Returns false when `fail_fast` says to stop.
    fn run_kind<T: WasmPrimitive>(&self, instance: &mut Instance, report: &mut Report) -> bool {
        let checks: [(Convention, &'static str, Check); 7] = [
            (Convention::Value, "scalar", check_scalar::<T>),
            (Convention::Value, "idempotence", check_idempotence::<T>),
            (Convention::Reference, "reference", check_reference::<T>),
            (Convention::Reference, "null-reference", check_null_reference::<T>),
            (Convention::Buffer, "buffer", check_buffer::<T>),
            (Convention::Buffer, "empty-buffer", check_empty_buffer::<T>),
            (Convention::Buffer, "bounded-count", check_bounded_count::<T>),
        ];

        for (convention, check, run) in checks {
            let Some(export) = export_name(T::KIND, convention) else {
                continue;
            };
            let result = run(instance, export);
            if !self.record(report, export, T::KIND, convention, check, result) {
                return false;
            }
        }
        true
    }

    fn run_string(&self, instance: &mut Instance, report: &mut Report) -> bool {
        let Some(export) = export_name(ScalarKind::Char, Convention::StringAppend) else {
            return true;
        };
        let case = &self.config.string;
        let checks: [(&'static str, StringCheck); 4] = [
            ("string-append", check_string_append),
            ("string-exact-capacity", check_string_exact_capacity),
            ("string-insufficient-capacity", check_string_insufficient_capacity),
            ("string-unterminated", check_string_unterminated),
        ];

        for (check, run) in checks {
            let result = run(instance, export, case);
            if !self.record(
                report,
                export,
                ScalarKind::Char,
                Convention::StringAppend,
                check,
                result,
            ) {
                return false;
            }
        }
        true
    }

    fn record(
        &self,
        report: &mut Report,
        export: &'static str,
        kind: ScalarKind,
        convention: Convention,
        check: &'static str,
        result: Result<(), CaseError>,
    ) -> bool {
        let outcome = match result {
            Ok(()) => Outcome::Passed,
            Err(err) => {
                warn!(export, check, error = %err, "case failed");
                Outcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        let failed = !outcome.is_passed();
        report.cases.push(CaseReport {
            export,
            kind,
            convention,
            check,
            outcome,
        });
        !(failed && self.config.fail_fast)
    }
}

fn expect_same<T: Primitive>(
    what: fmt::Arguments<'_>,
    expected: T,
    actual: T,
) -> Result<(), CaseError> {
    if expected.same(actual) {
        Ok(())
    } else {
        Err(CaseError::Mismatch(format!(
            "{}: expected {:?}, got {:?}",
            what, expected, actual
        )))
    }
}

// ============================================================================
// Per-kind checks
// ============================================================================

fn check_scalar<T: WasmPrimitive>(instance: &mut Instance, export: &str) -> Result<(), CaseError> {
    for &v in T::SAMPLES {
        let actual = instance.call_value(export, v)?;
        expect_same(format_args!("input {:?}", v), v.transform(), actual)?;
    }
    Ok(())
}

/// Two applications: booleans come back to the input, integers are
/// multiplied by four (wrapping), floats by four, characters advance by two.
fn check_idempotence<T: WasmPrimitive>(
    instance: &mut Instance,
    export: &str,
) -> Result<(), CaseError> {
    for &v in T::SAMPLES {
        let once = instance.call_value(export, v)?;
        let twice = instance.call_value(export, once)?;
        expect_same(
            format_args!("input {:?} applied twice", v),
            v.transform().transform(),
            twice,
        )?;
    }
    Ok(())
}

fn check_reference<T: WasmPrimitive>(
    instance: &mut Instance,
    export: &str,
) -> Result<(), CaseError> {
    for &v in T::SAMPLES {
        let actual = instance.call_ref(export, Some(v))?.ok_or_else(|| {
            CaseError::Mismatch("reference call returned no value".to_string())
        })?;
        expect_same(format_args!("cell {:?}", v), v.transform(), actual)?;
    }
    Ok(())
}

fn check_null_reference<T: WasmPrimitive>(
    instance: &mut Instance,
    export: &str,
) -> Result<(), CaseError> {
    let size = T::KIND.size();
    let before = instance.read_memory(0, size)?;
    instance.call_ref::<T>(export, None)?;
    let after = instance.read_memory(0, size)?;
    if before != after {
        return Err(CaseError::Mismatch(format!(
            "null reference wrote to address 0: {:?} -> {:?}",
            before, after
        )));
    }
    Ok(())
}

fn check_buffer<T: WasmPrimitive>(instance: &mut Instance, export: &str) -> Result<(), CaseError> {
    let input = T::SAMPLES;
    let output = instance.call_buffer(export, input, input.len())?;
    for (i, (&v, &actual)) in input.iter().zip(&output).enumerate() {
        expect_same(format_args!("element {} ({:?})", i, v), v.transform(), actual)?;
    }
    Ok(())
}

/// Samples the transform visibly changes, so a write past `count` cannot
/// go unnoticed.
fn changed_samples<T: Primitive>() -> Vec<T> {
    T::SAMPLES
        .iter()
        .copied()
        .filter(|v| !v.transform().same(*v))
        .collect()
}

fn check_empty_buffer<T: WasmPrimitive>(
    instance: &mut Instance,
    export: &str,
) -> Result<(), CaseError> {
    let input = changed_samples::<T>();
    let output = instance.call_buffer(export, &input, 0)?;
    for (i, (&v, &actual)) in input.iter().zip(&output).enumerate() {
        expect_same(format_args!("element {} with count 0", i), v, actual)?;
    }
    Ok(())
}

/// Count n - 1: every announced element changes, the last one does not.
fn check_bounded_count<T: WasmPrimitive>(
    instance: &mut Instance,
    export: &str,
) -> Result<(), CaseError> {
    let input = changed_samples::<T>();
    let count = input.len().saturating_sub(1);
    let output = instance.call_buffer(export, &input, count)?;
    for (i, (&v, &actual)) in input.iter().zip(&output).enumerate() {
        let expected = if i < count { v.transform() } else { v };
        expect_same(format_args!("element {} with count {}", i, count), expected, actual)?;
    }
    Ok(())
}

// ============================================================================
// String checks
// ============================================================================

fn expected_append(case: &StringCase) -> String {
    format!("{}{}", case.input, String::from_utf8_lossy(GREETING_SUFFIX))
}

fn expect_appended(
    outcome: AppendOutcome,
    case: &StringCase,
    capacity: usize,
) -> Result<(), CaseError> {
    let expected = expected_append(case);
    match outcome {
        AppendOutcome::Appended {
            contents,
            reported_len,
        } => {
            if contents != expected {
                return Err(CaseError::Mismatch(format!(
                    "expected {:?}, got {:?}",
                    expected, contents
                )));
            }
            if reported_len != expected.len() {
                return Err(CaseError::Mismatch(format!(
                    "returned length {}, string is {} bytes",
                    reported_len,
                    expected.len()
                )));
            }
            Ok(())
        }
        AppendOutcome::Rejected { error, .. } => Err(CaseError::Mismatch(format!(
            "append into {} bytes rejected: {}",
            capacity, error
        ))),
    }
}

fn expect_rejected(
    outcome: AppendOutcome,
    case: &StringCase,
    accept: fn(&AppendError) -> bool,
) -> Result<(), CaseError> {
    match outcome {
        AppendOutcome::Rejected { error, contents } => {
            if !accept(&error) {
                return Err(CaseError::Mismatch(format!(
                    "rejected for the wrong reason: {}",
                    error
                )));
            }
            if contents != case.input {
                return Err(CaseError::Mismatch(format!(
                    "rejected append modified the buffer: {:?}",
                    contents
                )));
            }
            Ok(())
        }
        AppendOutcome::Appended { contents, .. } => Err(CaseError::Mismatch(format!(
            "expected rejection, got {:?}",
            contents
        ))),
    }
}

fn check_string_append(
    instance: &mut Instance,
    export: &str,
    case: &StringCase,
) -> Result<(), CaseError> {
    let outcome = instance.call_string_append(export, &case.input, case.capacity)?;
    expect_appended(outcome, case, case.capacity)
}

fn check_string_exact_capacity(
    instance: &mut Instance,
    export: &str,
    case: &StringCase,
) -> Result<(), CaseError> {
    let capacity = case.required_capacity();
    let outcome = instance.call_string_append(export, &case.input, capacity)?;
    expect_appended(outcome, case, capacity)
}

fn check_string_insufficient_capacity(
    instance: &mut Instance,
    export: &str,
    case: &StringCase,
) -> Result<(), CaseError> {
    let capacity = case.required_capacity() - 1;
    let outcome = instance.call_string_append(export, &case.input, capacity)?;
    expect_rejected(outcome, case, |e| {
        matches!(e, AppendError::InsufficientCapacity { .. })
    })
}

fn check_string_unterminated(
    instance: &mut Instance,
    export: &str,
    case: &StringCase,
) -> Result<(), CaseError> {
    let outcome = instance.call_string_append(export, &case.input, case.input.len())?;
    expect_rejected(outcome, case, |e| matches!(e, AppendError::Unterminated))
}
