//! Per-type transform rules

use core::fmt;

use crate::exports::WasmType;

/// A single-byte character as seen across the boundary.
///
/// C's `char` has platform-dependent signedness; the fixture only cares about
/// the bit pattern, so it is carried as a transparent byte.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Char8(pub u8);

impl From<u8> for Char8 {
    fn from(b: u8) -> Self {
        Char8(b)
    }
}

impl From<Char8> for u8 {
    fn from(c: Char8) -> Self {
        c.0
    }
}

/// The primitive types the fixture exports entry points for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    Bool,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 8] = [
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::Char,
        ScalarKind::Bool,
    ];

    /// Name used in entry point names (`transform_<name>`).
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Char => "char",
            ScalarKind::Bool => "bool",
        }
    }

    pub fn from_name(name: &str) -> Option<ScalarKind> {
        ScalarKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Size in bytes of one element in linear memory.
    pub fn size(self) -> usize {
        match self {
            ScalarKind::I8 | ScalarKind::Char | ScalarKind::Bool => 1,
            ScalarKind::I16 => 2,
            ScalarKind::I32 | ScalarKind::F32 => 4,
            ScalarKind::I64 | ScalarKind::F64 => 8,
        }
    }

    /// The WASM value type a scalar of this kind is passed as.
    ///
    /// Sub-word integers, characters and booleans are widened to `i32`.
    pub fn wasm_type(self) -> WasmType {
        match self {
            ScalarKind::I64 => WasmType::I64,
            ScalarKind::F32 => WasmType::F32,
            ScalarKind::F64 => WasmType::F64,
            _ => WasmType::I32,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A primitive with a fixed transform rule.
///
/// Numeric types double (wrapping for integers), the character increments
/// (wrapping), and booleans negate.
pub trait Primitive: Copy + PartialEq + fmt::Debug + 'static {
    const KIND: ScalarKind;

    /// Representative values, including the edges of the type's range.
    const SAMPLES: &'static [Self];

    fn transform(self) -> Self;

    /// Equality used when checking results. Floats compare bit for bit,
    /// except that any NaN matches any NaN.
    fn same(self, other: Self) -> bool {
        self == other
    }
}

macro_rules! impl_int_primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;
                const SAMPLES: &'static [Self] =
                    &[0, 1, -1, 2, -7, 42, <$ty>::MAX / 2, <$ty>::MAX, <$ty>::MIN];

                fn transform(self) -> Self {
                    self.wrapping_mul(2)
                }
            }
        )*
    };
}

impl_int_primitive!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);

macro_rules! impl_float_primitive {
    ($($ty:ident => $kind:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;
                const SAMPLES: &'static [Self] = &[
                    0.0,
                    -0.0,
                    1.0,
                    -1.5,
                    3.25,
                    core::$ty::consts::PI,
                    $ty::MIN_POSITIVE,
                    $ty::MAX,
                    $ty::INFINITY,
                    $ty::NEG_INFINITY,
                    $ty::NAN,
                ];

                fn transform(self) -> Self {
                    self * 2.0
                }

                fn same(self, other: Self) -> bool {
                    (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

impl_float_primitive!(f32 => F32, f64 => F64);

impl Primitive for Char8 {
    const KIND: ScalarKind = ScalarKind::Char;
    const SAMPLES: &'static [Self] = &[
        Char8(b'A'),
        Char8(b'a'),
        Char8(b'y'),
        Char8(b'0'),
        Char8(b' '),
        Char8(0),
        Char8(0x7F),
        Char8(0xFF),
    ];

    fn transform(self) -> Self {
        Char8(self.0.wrapping_add(1))
    }
}

impl Primitive for bool {
    const KIND: ScalarKind = ScalarKind::Bool;
    const SAMPLES: &'static [Self] = &[true, false];

    fn transform(self) -> Self {
        !self
    }
}

/// Transform the referenced value in place. `None` is a no-op.
pub fn transform_ref<T: Primitive>(value: Option<&mut T>) {
    if let Some(v) = value {
        *v = v.transform();
    }
}

/// Transform every element in index order.
pub fn transform_buffer<T: Primitive>(values: &mut [T]) {
    for v in values.iter_mut() {
        *v = v.transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_double_and_wrap() {
        assert_eq!(21i32.transform(), 42);
        assert_eq!((-5i8).transform(), -10);
        assert_eq!(i8::MAX.transform(), -2);
        assert_eq!(i16::MIN.transform(), 0);
        assert_eq!(i64::MAX.transform(), -2);
    }

    #[test]
    fn integers_twice_multiply_by_four() {
        for &v in i32::SAMPLES {
            assert_eq!(v.transform().transform(), v.wrapping_mul(4));
        }
        for &v in i16::SAMPLES {
            assert_eq!(v.transform().transform(), v.wrapping_mul(4));
        }
    }

    #[test]
    fn floats_double() {
        assert_eq!(1.5f32.transform(), 3.0);
        assert_eq!((-0.25f64).transform(), -0.5);
        assert_eq!(f64::MAX.transform(), f64::INFINITY);
        assert!(f32::NAN.transform().same(f32::NAN));
        assert!(!1.0f32.same(f32::NAN));
    }

    #[test]
    fn float_sign_of_zero_matters() {
        assert!((-0.0f64).transform().same(-0.0));
        assert!(!0.0f64.same(-0.0));
        assert!(!(-0.0f32).same(0.0));
        assert!(f64::NAN.same(-f64::NAN));
    }

    #[test]
    fn char_increments_and_wraps() {
        assert_eq!(Char8(b'A').transform(), Char8(b'B'));
        assert_eq!(Char8(0xFF).transform(), Char8(0));
    }

    #[test]
    fn bool_negates_and_twice_is_identity() {
        assert!(!true.transform());
        assert!(false.transform());
        for &b in bool::SAMPLES {
            assert_eq!(b.transform().transform(), b);
        }
    }

    #[test]
    fn reference_transform_skips_none() {
        let mut x = 7i64;
        transform_ref(Some(&mut x));
        assert_eq!(x, 14);
        transform_ref::<i64>(None);
    }

    #[test]
    fn buffer_transform_covers_every_element() {
        let mut values = [1i16, -2, 3, i16::MAX];
        transform_buffer(&mut values);
        assert_eq!(values, [2, -4, 6, -2]);

        let mut empty: [f64; 0] = [];
        transform_buffer(&mut empty);
    }

    #[test]
    fn kind_metadata() {
        assert_eq!(ScalarKind::from_name("f64"), Some(ScalarKind::F64));
        assert_eq!(ScalarKind::from_name("double"), None);
        assert_eq!(ScalarKind::Char.size(), 1);
        assert_eq!(ScalarKind::I64.wasm_type(), WasmType::I64);
        assert_eq!(ScalarKind::Bool.wasm_type(), WasmType::I32);
        assert_eq!(<Char8 as Primitive>::KIND, ScalarKind::Char);
    }
}
