//! A WAT rendition of the fixture, for driving the harness without a wasm32
//! toolchain. `Fault` variants break one entry point each so negative paths
//! can be exercised.

#![allow(dead_code)]

use marshal::abi::GREETING_SUFFIX;
use marshal::{Instance, Runtime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// `transform_i32` adds one instead of doubling.
    WrongScalar,
    /// `transform_i32_ref` skips the null check and stores a constant.
    NullWrite,
    /// `transform_i16_buffer` handles one element more than announced.
    IgnoresCount,
    /// `transform_f64_buffer` handles one element more than announced.
    IgnoresFloatCount,
    /// `transform_string` never checks capacity.
    IgnoresCapacity,
    /// `transform_f64_ref` is not exported.
    MissingExport,
    /// `transform_i64` takes and returns i32.
    WrongSignature,
}

struct KindWat {
    name: &'static str,
    val: &'static str,
    load: &'static str,
    store: &'static str,
    size: u32,
    op: fn(&str) -> String,
}

fn shl32(e: &str) -> String {
    format!("(i32.shl {} (i32.const 1))", e)
}

fn shl64(e: &str) -> String {
    format!("(i64.shl {} (i64.const 1))", e)
}

fn mul_f32(e: &str) -> String {
    format!("(f32.mul {} (f32.const 2))", e)
}

fn mul_f64(e: &str) -> String {
    format!("(f64.mul {} (f64.const 2))", e)
}

fn inc_byte(e: &str) -> String {
    format!("(i32.and (i32.add {} (i32.const 1)) (i32.const 255))", e)
}

fn negate(e: &str) -> String {
    format!("(i32.eqz {})", e)
}

const KINDS: [KindWat; 8] = [
    KindWat {
        name: "i8",
        val: "i32",
        load: "i32.load8_s",
        store: "i32.store8",
        size: 1,
        op: shl32,
    },
    KindWat {
        name: "i16",
        val: "i32",
        load: "i32.load16_s",
        store: "i32.store16",
        size: 2,
        op: shl32,
    },
    KindWat {
        name: "i32",
        val: "i32",
        load: "i32.load",
        store: "i32.store",
        size: 4,
        op: shl32,
    },
    KindWat {
        name: "i64",
        val: "i64",
        load: "i64.load",
        store: "i64.store",
        size: 8,
        op: shl64,
    },
    KindWat {
        name: "f32",
        val: "f32",
        load: "f32.load",
        store: "f32.store",
        size: 4,
        op: mul_f32,
    },
    KindWat {
        name: "f64",
        val: "f64",
        load: "f64.load",
        store: "f64.store",
        size: 8,
        op: mul_f64,
    },
    KindWat {
        name: "char",
        val: "i32",
        load: "i32.load8_u",
        store: "i32.store8",
        size: 1,
        op: inc_byte,
    },
    KindWat {
        name: "bool",
        val: "i32",
        load: "i32.load8_u",
        store: "i32.store8",
        size: 1,
        op: negate,
    },
];

fn value_func(k: &KindWat, fault: Fault) -> String {
    let name = format!("transform_{}", k.name);
    if fault == Fault::WrongScalar && k.name == "i32" {
        return format!(
            "(func (export \"{}\") (param $x i32) (result i32) (i32.add (local.get $x) (i32.const 1)))\n",
            name
        );
    }
    if fault == Fault::WrongSignature && k.name == "i64" {
        return format!(
            "(func (export \"{}\") (param $x i32) (result i32) (local.get $x))\n",
            name
        );
    }
    format!(
        "(func (export \"{}\") (param $x {}) (result {}) {})\n",
        name,
        k.val,
        k.val,
        (k.op)("(local.get $x)")
    )
}

fn ref_func(k: &KindWat, fault: Fault) -> String {
    let name = format!("transform_{}_ref", k.name);
    if fault == Fault::MissingExport && k.name == "f64" {
        return String::new();
    }
    if fault == Fault::NullWrite && k.name == "i32" {
        return format!(
            "(func (export \"{}\") (param $p i32) (i32.store (local.get $p) (i32.const 0x55)))\n",
            name
        );
    }
    let load = format!("({} (local.get $p))", k.load);
    format!(
        "(func (export \"{}\") (param $p i32)\n  (if (local.get $p) (then ({} (local.get $p) {}))))\n",
        name,
        k.store,
        (k.op)(&load)
    )
}

fn buffer_func(k: &KindWat, fault: Fault) -> String {
    let name = format!("transform_{}_buffer", k.name);
    let overruns = matches!(
        (fault, k.name),
        (Fault::IgnoresCount, "i16") | (Fault::IgnoresFloatCount, "f64")
    );
    let limit = if overruns {
        "(i32.add (local.get $n) (i32.const 1))"
    } else {
        "(local.get $n)"
    };
    let load = format!("({} (local.get $a))", k.load);
    format!(
        r#"(func (export "{name}") (param $p i32) (param $n i32)
  (local $i i32) (local $a i32)
  (block $done
    (loop $next
      (br_if $done (i32.ge_u (local.get $i) {limit}))
      (local.set $a (i32.add (local.get $p) (i32.mul (local.get $i) (i32.const {size}))))
      ({store} (local.get $a) {value})
      (local.set $i (i32.add (local.get $i) (i32.const 1)))
      (br $next))))
"#,
        name = name,
        limit = limit,
        size = k.size,
        store = k.store,
        value = (k.op)(&load),
    )
}

fn string_func(fault: Fault) -> String {
    let suffix_len = GREETING_SUFFIX.len();
    let capacity_check = if fault == Fault::IgnoresCapacity {
        String::new()
    } else {
        format!(
            "(if (i32.gt_u (i32.add (local.get $len) (i32.const {})) (local.get $cap)) (then (return (i32.const -2))))",
            suffix_len + 1
        )
    };
    let mut stores = String::new();
    for (i, b) in GREETING_SUFFIX.iter().enumerate() {
        stores.push_str(&format!(
            "  (i32.store8 offset={} (i32.add (local.get $p) (local.get $len)) (i32.const {}))\n",
            i, b
        ));
    }
    format!(
        r#"(func (export "transform_string") (param $p i32) (param $cap i32) (result i32)
  (local $len i32)
  (if (i32.eqz (local.get $p)) (then (return (i32.const -3))))
  (block $found
    (loop $scan
      (if (i32.ge_u (local.get $len) (local.get $cap)) (then (return (i32.const -1))))
      (br_if $found (i32.eqz (i32.load8_u (i32.add (local.get $p) (local.get $len)))))
      (local.set $len (i32.add (local.get $len) (i32.const 1)))
      (br $scan)))
  {capacity_check}
{stores}  (i32.store8 offset={suffix_len} (i32.add (local.get $p) (local.get $len)) (i32.const 0))
  (i32.add (local.get $len) (i32.const {suffix_len})))
"#,
        capacity_check = capacity_check,
        stores = stores,
        suffix_len = suffix_len,
    )
}

/// WAT source of a complete fixture module.
pub fn fixture_wat(fault: Fault) -> String {
    let mut wat = String::from("(module\n(memory (export \"memory\") 1)\n");
    for k in &KINDS {
        wat.push_str(&value_func(k, fault));
        wat.push_str(&ref_func(k, fault));
        wat.push_str(&buffer_func(k, fault));
    }
    wat.push_str(&string_func(fault));
    wat.push_str(")\n");
    wat
}

pub fn instantiate_wat(src: &str) -> Instance {
    let wasm_bytes = wat::parse_str(src).expect("failed to parse WAT");
    let runtime = Runtime::new();
    let module = runtime.load_module(&wasm_bytes).expect("failed to load module");
    module.instantiate().expect("failed to instantiate")
}

pub fn fixture(fault: Fault) -> Instance {
    instantiate_wat(&fixture_wat(fault))
}
