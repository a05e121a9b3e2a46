//! Primitive marshaling fixture.
//!
//! Exports one `extern "C"` entry point per (type × convention) pair. Build
//! it for `wasm32-unknown-unknown` and load the resulting module with the
//! `marshal` host harness, or link it natively as a `cdylib`.
//!
//! ```text
//! transform_<kind>(x) -> x'              by value
//! transform_<kind>_ref(ptr)              in place, null is a no-op
//! transform_<kind>_buffer(ptr, count)    in place, index order
//! transform_string(ptr, capacity) -> n   append " World!", n < 0 on error
//! ```
//!
//! The raw pointers are turned into an `Option<&mut T>` or a `&mut [T]` at the
//! boundary; the transforms themselves are the safe ones from `marshal_abi`.
//! The guest never allocates.

#![cfg_attr(target_arch = "wasm32", no_std)]

use marshal_abi::{transform_buffer, transform_ref, AppendError, CStrBuf, Char8, Primitive};

pub use marshal_abi::GREETING_SUFFIX;

#[cfg(all(target_arch = "wasm32", not(test)))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    core::arch::wasm32::unreachable()
}

/// Rebuild a slice from a raw `(ptr, count)` pair. Null or empty is `&mut []`.
///
/// # Safety
///
/// A non-null `ptr` must point to `count` valid, exclusively borrowed `T`s.
unsafe fn buffer_from_raw<'a, T>(ptr: *mut T, count: usize) -> &'a mut [T] {
    if ptr.is_null() || count == 0 {
        &mut []
    } else {
        core::slice::from_raw_parts_mut(ptr, count)
    }
}

macro_rules! transform_exports {
    ($($ty:ty => $value:ident, $reference:ident, $buffer:ident;)*) => {
        $(
            #[no_mangle]
            pub extern "C" fn $value(x: $ty) -> $ty {
                x.transform()
            }

            /// # Safety
            ///
            /// `ptr` must be null or point to a valid, exclusively borrowed value.
            #[no_mangle]
            pub unsafe extern "C" fn $reference(ptr: *mut $ty) {
                transform_ref(ptr.as_mut());
            }

            /// # Safety
            ///
            /// `ptr` must be null or point to at least `count` valid elements.
            #[no_mangle]
            pub unsafe extern "C" fn $buffer(ptr: *mut $ty, count: usize) {
                transform_buffer(buffer_from_raw(ptr, count));
            }
        )*
    };
}

transform_exports! {
    i8 => transform_i8, transform_i8_ref, transform_i8_buffer;
    i16 => transform_i16, transform_i16_ref, transform_i16_buffer;
    i32 => transform_i32, transform_i32_ref, transform_i32_buffer;
    i64 => transform_i64, transform_i64_ref, transform_i64_buffer;
    f32 => transform_f32, transform_f32_ref, transform_f32_buffer;
    f64 => transform_f64, transform_f64_ref, transform_f64_buffer;
    Char8 => transform_char, transform_char_ref, transform_char_buffer;
    bool => transform_bool, transform_bool_ref, transform_bool_buffer;
}

/// Append `" World!"` to the NUL-terminated string at `ptr`.
///
/// `capacity` is the total size of the buffer in bytes, terminator included.
/// Returns the new length on success, or the negative code of an
/// [`AppendError`]; on error the buffer is not modified.
///
/// # Safety
///
/// `ptr` must be null or point to `capacity` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn transform_string(ptr: *mut u8, capacity: usize) -> i32 {
    if ptr.is_null() {
        return AppendError::NullBuffer.code();
    }
    let bytes = core::slice::from_raw_parts_mut(ptr, capacity);
    append_greeting(bytes, i32::MAX as usize)
}

/// Append the greeting unless the new length would exceed `max_len`.
fn append_greeting(bytes: &mut [u8], max_len: usize) -> i32 {
    let appended = CStrBuf::new(bytes).and_then(|mut s| {
        if s.len() + GREETING_SUFFIX.len() > max_len {
            return Err(AppendError::LengthOverflow);
        }
        s.append(GREETING_SUFFIX)
    });
    match appended {
        Ok(len) => i32::try_from(len).unwrap_or(AppendError::LengthOverflow.code()),
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ptr;

    #[test]
    fn scalars() {
        assert_eq!(transform_i8(-64), -128);
        assert_eq!(transform_i8(100), -56);
        assert_eq!(transform_i16(1234), 2468);
        assert_eq!(transform_i32(i32::MAX), -2);
        assert_eq!(transform_i64(-3), -6);
        assert_eq!(transform_f32(0.75), 1.5);
        assert_eq!(transform_f64(1e300), 2e300);
        assert_eq!(transform_char(Char8(b'H')), Char8(b'I'));
        assert!(transform_bool(false));
        assert!(transform_bool(transform_bool(true)));
    }

    #[test]
    fn references() {
        let mut x = 21i32;
        unsafe { transform_i32_ref(&mut x) };
        assert_eq!(x, 42);

        let mut c = Char8(b'z');
        unsafe { transform_char_ref(&mut c) };
        assert_eq!(c, Char8(b'{'));

        let mut b = true;
        unsafe { transform_bool_ref(&mut b) };
        assert!(!b);

        unsafe {
            transform_f64_ref(ptr::null_mut());
            transform_bool_ref(ptr::null_mut());
        }
    }

    #[test]
    fn buffers() {
        let mut values = [1.5f32, -2.0, 0.0];
        unsafe { transform_f32_buffer(values.as_mut_ptr(), values.len()) };
        assert_eq!(values, [3.0, -4.0, 0.0]);

        let mut values = [1i64, 2, 3];
        unsafe { transform_i64_buffer(values.as_mut_ptr(), 2) };
        assert_eq!(values, [2, 4, 3]);

        let mut values = [10i16, 20];
        unsafe { transform_i16_buffer(values.as_mut_ptr(), 0) };
        assert_eq!(values, [10, 20]);

        let mut flags = [true, false, true];
        unsafe { transform_bool_buffer(flags.as_mut_ptr(), flags.len()) };
        assert_eq!(flags, [false, true, false]);

        unsafe { transform_i8_buffer(ptr::null_mut(), 4) };
    }

    #[test]
    fn string_append() {
        let mut buf = [0u8; 32];
        buf[..5].copy_from_slice(b"Hello");
        let len = unsafe { transform_string(buf.as_mut_ptr(), buf.len()) };
        assert_eq!(len, 12);
        assert_eq!(&buf[..13], b"Hello World!\0");
    }

    #[test]
    fn string_append_errors() {
        let mut buf = *b"Hello\0______";
        let before = buf;
        let code = unsafe { transform_string(buf.as_mut_ptr(), buf.len()) };
        assert_eq!(code, -2);
        assert_eq!(buf, before);

        let mut unterminated = *b"Hello";
        let code = unsafe { transform_string(unterminated.as_mut_ptr(), unterminated.len()) };
        assert_eq!(code, -1);

        assert_eq!(unsafe { transform_string(ptr::null_mut(), 16) }, -3);
    }

    #[test]
    fn string_length_past_status_range_is_refused() {
        let mut buf = [0u8; 32];
        buf[..5].copy_from_slice(b"Hello");
        let before = buf;
        assert_eq!(append_greeting(&mut buf, 11), -5);
        assert_eq!(buf, before);
        assert_eq!(append_greeting(&mut buf, 12), 12);
    }
}
