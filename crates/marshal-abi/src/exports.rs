//! Entry point table
//!
//! Every entry point the fixture exports, with its WASM-level signature.
//! The host validates loaded modules against this table; the guest's
//! exported symbol names must match it exactly.

use core::fmt;

use crate::primitive::ScalarKind;

/// How a value crosses the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Convention {
    /// Passed and returned by value.
    Value,
    /// A pointer to a single cell, possibly null.
    Reference,
    /// A pointer to the first element plus an element count.
    Buffer,
    /// A NUL-terminated byte buffer plus its reserved capacity.
    StringAppend,
}

impl Convention {
    pub fn name(self) -> &'static str {
        match self {
            Convention::Value => "value",
            Convention::Reference => "reference",
            Convention::Buffer => "buffer",
            Convention::StringAppend => "string-append",
        }
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Core WASM value types used by the fixture's signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WasmType {
    I32,
    I64,
    F32,
    F64,
}

impl WasmType {
    pub fn name(self) -> &'static str {
        match self {
            WasmType::I32 => "i32",
            WasmType::I64 => "i64",
            WasmType::F32 => "f32",
            WasmType::F64 => "f64",
        }
    }
}

impl fmt::Display for WasmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A WASM function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Signature {
    pub params: &'static [WasmType],
    pub results: &'static [WasmType],
}

impl Signature {
    const fn new(params: &'static [WasmType], results: &'static [WasmType]) -> Self {
        Self { params, results }
    }

    /// The signature an entry point of the given kind and convention must have.
    pub const fn expected(kind: ScalarKind, convention: Convention) -> Signature {
        const I32: &[WasmType] = &[WasmType::I32];
        const I64: &[WasmType] = &[WasmType::I64];
        const F32: &[WasmType] = &[WasmType::F32];
        const F64: &[WasmType] = &[WasmType::F64];
        const PTR_LEN: &[WasmType] = &[WasmType::I32, WasmType::I32];

        match convention {
            Convention::Value => match kind {
                ScalarKind::I64 => Signature::new(I64, I64),
                ScalarKind::F32 => Signature::new(F32, F32),
                ScalarKind::F64 => Signature::new(F64, F64),
                _ => Signature::new(I32, I32),
            },
            Convention::Reference => Signature::new(I32, &[]),
            Convention::Buffer => Signature::new(PTR_LEN, &[]),
            Convention::StringAppend => Signature::new(PTR_LEN, I32),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, types: &[WasmType]) -> fmt::Result {
            f.write_str("(")?;
            for (i, ty) in types.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", ty)?;
            }
            f.write_str(")")
        }
        list(f, self.params)?;
        f.write_str(" -> ")?;
        list(f, self.results)
    }
}

/// One exported entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExportSpec {
    pub name: &'static str,
    pub kind: ScalarKind,
    pub convention: Convention,
    pub signature: Signature,
}

macro_rules! export_rows {
    ($($kind:ident => $value:literal, $reference:literal, $buffer:literal;)*) => {
        [
            $(
                ExportSpec {
                    name: $value,
                    kind: ScalarKind::$kind,
                    convention: Convention::Value,
                    signature: Signature::expected(ScalarKind::$kind, Convention::Value),
                },
                ExportSpec {
                    name: $reference,
                    kind: ScalarKind::$kind,
                    convention: Convention::Reference,
                    signature: Signature::expected(ScalarKind::$kind, Convention::Reference),
                },
                ExportSpec {
                    name: $buffer,
                    kind: ScalarKind::$kind,
                    convention: Convention::Buffer,
                    signature: Signature::expected(ScalarKind::$kind, Convention::Buffer),
                },
            )*
            ExportSpec {
                name: "transform_string",
                kind: ScalarKind::Char,
                convention: Convention::StringAppend,
                signature: Signature::expected(ScalarKind::Char, Convention::StringAppend),
            },
        ]
    };
}

/// All entry points, grouped by kind in `ScalarKind::ALL` order.
pub const EXPORTS: [ExportSpec; 25] = export_rows! {
    I8 => "transform_i8", "transform_i8_ref", "transform_i8_buffer";
    I16 => "transform_i16", "transform_i16_ref", "transform_i16_buffer";
    I32 => "transform_i32", "transform_i32_ref", "transform_i32_buffer";
    I64 => "transform_i64", "transform_i64_ref", "transform_i64_buffer";
    F32 => "transform_f32", "transform_f32_ref", "transform_f32_buffer";
    F64 => "transform_f64", "transform_f64_ref", "transform_f64_buffer";
    Char => "transform_char", "transform_char_ref", "transform_char_buffer";
    Bool => "transform_bool", "transform_bool_ref", "transform_bool_buffer";
};

/// Name of the entry point for a kind and convention.
///
/// `StringAppend` only exists for `Char`; other kinds return `None`.
pub fn export_name(kind: ScalarKind, convention: Convention) -> Option<&'static str> {
    EXPORTS
        .iter()
        .find(|e| e.kind == kind && e.convention == convention)
        .map(|e| e.name)
}

pub fn find_export(name: &str) -> Option<&'static ExportSpec> {
    EXPORTS.iter().find(|e| e.name == name)
}
