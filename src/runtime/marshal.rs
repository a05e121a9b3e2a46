//! Host-side conversions between primitives and their WASM representation.

use std::fmt;

use marshal_abi::{Char8, Primitive};
use wasmtime::{WasmParams, WasmResults, WasmTy};

/// A [`Primitive`] the host can pass to and read back from a WASM guest.
///
/// `Abi` is the core value type the primitive travels as in a call;
/// `write_le`/`read_le` give its layout in linear memory.
pub trait WasmPrimitive: Primitive {
    type Abi: WasmTy + WasmParams + WasmResults + Copy + fmt::Debug;

    fn to_abi(self) -> Self::Abi;

    /// Decode a returned value. `None` if `abi` is not a valid encoding.
    fn from_abi(abi: Self::Abi) -> Option<Self>;

    fn write_le(self, out: &mut Vec<u8>);

    /// Decode one element. `None` if `bytes` is not exactly one element long
    /// or does not hold a valid encoding.
    fn read_le(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_numeric {
    ($($ty:ty => $abi:ty),* $(,)?) => {
        $(
            impl WasmPrimitive for $ty {
                type Abi = $abi;

                fn to_abi(self) -> $abi {
                    self as $abi
                }

                // Sub-word integers come back widened; truncation drops the
                // upper bits the guest may or may not have cleared.
                fn from_abi(abi: $abi) -> Option<Self> {
                    Some(abi as $ty)
                }

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$ty>::from_le_bytes)
                }
            }
        )*
    };
}

impl_numeric!(i8 => i32, i16 => i32, i32 => i32, i64 => i64, f32 => f32, f64 => f64);

impl WasmPrimitive for Char8 {
    type Abi = i32;

    fn to_abi(self) -> i32 {
        self.0 as i32
    }

    fn from_abi(abi: i32) -> Option<Self> {
        Some(Char8(abi as u8))
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self.0);
    }

    fn read_le(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b] => Some(Char8(*b)),
            _ => None,
        }
    }
}

impl WasmPrimitive for bool {
    type Abi = i32;

    fn to_abi(self) -> i32 {
        self as i32
    }

    // Only 0 and 1 are booleans; anything else is a guest bug.
    fn from_abi(abi: i32) -> Option<Self> {
        match abi {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    fn read_le(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0] => Some(false),
            [1] => Some(true),
            _ => None,
        }
    }
}
