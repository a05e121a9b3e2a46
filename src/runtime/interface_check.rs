//! Export enforcement - validate that a module implements the fixture's entry points

use marshal_abi::{ExportSpec, ScalarKind, WasmType, EXPORTS};
use thiserror::Error;
use wasmtime::{FuncType, Instance, Store, ValType};

/// Errors from export validation
#[derive(Error, Debug)]
pub enum InterfaceError {
    #[error("Missing function '{name}' required by the fixture")]
    MissingFunction { name: String },

    #[error("Function '{name}' has wrong signature: expected {expected}, got {actual}")]
    SignatureMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Missing memory export 'memory'")]
    MissingMemory,
}

/// Validate that a WASM instance exports every entry point for `kinds`
///
/// Checks:
/// - Memory export exists (reference, buffer and string calls need it)
/// - Each value, reference and buffer entry point of each kind exists
/// - The string entry point exists when `ScalarKind::Char` is requested
/// - Every one of them has exactly the expected WASM signature
pub fn validate_exports<T>(
    store: &mut Store<T>,
    instance: &Instance,
    kinds: &[ScalarKind],
) -> Result<(), InterfaceError> {
    if instance.get_memory(&mut *store, "memory").is_none() {
        return Err(InterfaceError::MissingMemory);
    }

    for spec in EXPORTS.iter().filter(|e| kinds.contains(&e.kind)) {
        check_function_export(store, instance, spec)?;
    }

    Ok(())
}

fn check_function_export<T>(
    store: &mut Store<T>,
    instance: &Instance,
    spec: &ExportSpec,
) -> Result<(), InterfaceError> {
    let Some(export) = instance.get_export(&mut *store, spec.name) else {
        return Err(InterfaceError::MissingFunction {
            name: spec.name.to_string(),
        });
    };

    let Some(func) = export.into_func() else {
        return Err(InterfaceError::SignatureMismatch {
            name: spec.name.to_string(),
            expected: spec.signature.to_string(),
            actual: "not a function".to_string(),
        });
    };

    let ty = func.ty(&*store);
    if types_match(ty.params(), spec.signature.params)
        && types_match(ty.results(), spec.signature.results)
    {
        Ok(())
    } else {
        Err(InterfaceError::SignatureMismatch {
            name: spec.name.to_string(),
            expected: spec.signature.to_string(),
            actual: describe(&ty),
        })
    }
}

fn types_match(actual: impl ExactSizeIterator<Item = ValType>, expected: &[WasmType]) -> bool {
    actual.len() == expected.len() && actual.zip(expected).all(|(a, e)| valtype_is(&a, *e))
}

fn valtype_is(ty: &ValType, expected: WasmType) -> bool {
    matches!(
        (ty, expected),
        (ValType::I32, WasmType::I32)
            | (ValType::I64, WasmType::I64)
            | (ValType::F32, WasmType::F32)
            | (ValType::F64, WasmType::F64)
    )
}

fn valtype_name(ty: &ValType) -> String {
    match ty {
        ValType::I32 => "i32".to_string(),
        ValType::I64 => "i64".to_string(),
        ValType::F32 => "f32".to_string(),
        ValType::F64 => "f64".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

/// Render a function type the same way `Signature` displays.
fn describe(ty: &FuncType) -> String {
    let params: Vec<String> = ty.params().map(|t| valtype_name(&t)).collect();
    let results: Vec<String> = ty.results().map(|t| valtype_name(&t)).collect();
    format!("({}) -> ({})", params.join(", "), results.join(", "))
}
