//! Bounds-checked big-endian cursor over raw class-file bytes.
//!
//! Every read is checked; running off the end of the buffer is a parse
//! error, never a panic. Internal parse errors carry only a reason string —
//! the public entry points attach the class name and convert to
//! [`palisade_contracts::error::PalisadeError::MalformedClass`].

use palisade_contracts::error::PalisadeError;

/// An internal parse failure: the container is malformed at this point.
#[derive(Debug)]
pub(crate) struct ScanError(pub String);

impl ScanError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<PalisadeError> for ScanError {
    fn from(e: PalisadeError) -> Self {
        Self(e.to_string())
    }
}

pub(crate) type ScanRes<T> = Result<T, ScanError>;

/// Big-endian reader with an explicit position, as the class-file format
/// requires.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub(crate) fn take(&mut self, n: usize) -> ScanRes<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                ScanError::new(format!(
                    "unexpected end of input: need {} bytes at offset {}",
                    n, self.pos
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, n: usize) -> ScanRes<()> {
        self.take(n).map(|_| ())
    }

    pub(crate) fn u8(&mut self) -> ScanRes<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> ScanRes<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> ScanRes<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_integers() {
        let mut r = ByteReader::new(&[0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34]);
        assert_eq!(r.u32().unwrap(), 0xCAFE_BABE);
        assert_eq!(r.u16().unwrap(), 0x0034);
        assert!(r.is_at_end());
    }

    #[test]
    fn reading_past_the_end_errors_instead_of_panicking() {
        let mut r = ByteReader::new(&[0x01]);
        assert!(r.u16().is_err());
    }

    #[test]
    fn take_advances_position() {
        let mut r = ByteReader::new(&[1, 2, 3, 4]);
        assert_eq!(r.take(3).unwrap(), &[1, 2, 3]);
        assert_eq!(r.pos(), 3);
        assert!(r.take(2).is_err());
    }
}
