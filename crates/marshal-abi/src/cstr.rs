//! Bounded NUL-terminated byte buffers

use core::fmt;

/// The literal the string entry point appends.
pub const GREETING_SUFFIX: &[u8] = b" World!";

/// Why an append was refused.
///
/// Each variant maps to the negative status code the string entry point
/// returns across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendError {
    /// No NUL terminator within the buffer's capacity.
    Unterminated,
    /// The result plus its terminator would not fit.
    InsufficientCapacity { needed: usize, capacity: usize },
    /// The buffer pointer was null.
    NullBuffer,
    /// The suffix itself contains a NUL byte.
    EmbeddedNul,
    /// The new length would not fit in the status code.
    LengthOverflow,
}

impl AppendError {
    pub fn code(&self) -> i32 {
        match self {
            AppendError::Unterminated => -1,
            AppendError::InsufficientCapacity { .. } => -2,
            AppendError::NullBuffer => -3,
            AppendError::EmbeddedNul => -4,
            AppendError::LengthOverflow => -5,
        }
    }

    /// Map a status code back to an error. Capacity details are not carried
    /// by the code, so they come back as zero.
    pub fn from_code(code: i32) -> Option<AppendError> {
        match code {
            -1 => Some(AppendError::Unterminated),
            -2 => Some(AppendError::InsufficientCapacity {
                needed: 0,
                capacity: 0,
            }),
            -3 => Some(AppendError::NullBuffer),
            -4 => Some(AppendError::EmbeddedNul),
            -5 => Some(AppendError::LengthOverflow),
            _ => None,
        }
    }
}

impl fmt::Display for AppendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unterminated => write!(f, "no NUL terminator within capacity"),
            Self::InsufficientCapacity { needed, capacity } => write!(
                f,
                "insufficient capacity: need {} bytes, have {}",
                needed, capacity
            ),
            Self::NullBuffer => write!(f, "null buffer"),
            Self::EmbeddedNul => write!(f, "suffix contains a NUL byte"),
            Self::LengthOverflow => write!(f, "new length does not fit in an i32"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AppendError {}

/// A NUL-terminated string living in a caller-owned buffer.
///
/// Capacity is the length of the wrapped slice; the used length is the
/// position of the first NUL. Appends never write past capacity.
#[derive(Debug)]
pub struct CStrBuf<'a> {
    bytes: &'a mut [u8],
    len: usize,
}

impl<'a> CStrBuf<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Result<Self, AppendError> {
        let len = bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or(AppendError::Unterminated)?;
        Ok(Self { bytes, len })
    }

    /// Used length, excluding the terminator.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes that can still be appended while keeping the terminator.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len - 1
    }

    /// Contents without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Append `suffix` and re-terminate, returning the new length.
    ///
    /// On error the buffer is left untouched.
    pub fn append(&mut self, suffix: &[u8]) -> Result<usize, AppendError> {
        if suffix.contains(&0) {
            return Err(AppendError::EmbeddedNul);
        }
        let needed = self.len + suffix.len() + 1;
        if needed > self.capacity() {
            return Err(AppendError::InsufficientCapacity {
                needed,
                capacity: self.capacity(),
            });
        }
        let end = self.len + suffix.len();
        self.bytes[self.len..end].copy_from_slice(suffix);
        self.bytes[end] = 0;
        self.len = end;
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(contents: &[u8]) -> [u8; 32] {
        let mut buf = [0xAAu8; 32];
        buf[..contents.len()].copy_from_slice(contents);
        buf[contents.len()] = 0;
        buf
    }

    #[test]
    fn hello_world() {
        let mut raw = buffer(b"Hello");
        let mut s = CStrBuf::new(&mut raw).expect("terminated");
        assert_eq!(s.len(), 5);
        assert_eq!(s.append(GREETING_SUFFIX), Ok(12));
        assert_eq!(s.as_bytes(), b"Hello World!");
        assert_eq!(raw[12], 0);
    }

    #[test]
    fn exact_capacity_fits() {
        let mut raw = buffer(b"Hello");
        let mut s = CStrBuf::new(&mut raw[..13]).expect("terminated");
        assert_eq!(s.remaining(), 7);
        assert_eq!(s.append(GREETING_SUFFIX), Ok(12));
    }

    #[test]
    fn short_capacity_is_rejected_untouched() {
        let mut raw = buffer(b"Hello");
        let before = raw;
        let mut s = CStrBuf::new(&mut raw[..12]).expect("terminated");
        assert_eq!(
            s.append(GREETING_SUFFIX),
            Err(AppendError::InsufficientCapacity {
                needed: 13,
                capacity: 12
            })
        );
        assert_eq!(s.as_bytes(), b"Hello");
        assert_eq!(raw, before);
    }

    #[test]
    fn unterminated_is_rejected() {
        let mut raw = *b"Hello";
        assert_eq!(CStrBuf::new(&mut raw).unwrap_err(), AppendError::Unterminated);
    }

    #[test]
    fn embedded_nul_is_rejected() {
        let mut raw = buffer(b"");
        let mut s = CStrBuf::new(&mut raw).expect("terminated");
        assert!(s.is_empty());
        assert_eq!(s.append(b"a\0b"), Err(AppendError::EmbeddedNul));
    }

    #[test]
    fn codes_roundtrip_variant() {
        for err in [
            AppendError::Unterminated,
            AppendError::NullBuffer,
            AppendError::EmbeddedNul,
            AppendError::LengthOverflow,
        ] {
            assert_eq!(AppendError::from_code(err.code()), Some(err));
        }
        assert!(matches!(
            AppendError::from_code(-2),
            Some(AppendError::InsufficientCapacity { .. })
        ));
        assert_eq!(AppendError::from_code(5), None);
    }
}
