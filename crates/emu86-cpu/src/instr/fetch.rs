use emu86_types::convert::word_from_bytes;

use crate::error::DecodeError;

/// Cursor over the byte window an instruction is decoded from.
#[derive(Debug, Clone)]
pub struct ByteFetcher<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteFetcher<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Number of bytes handed out so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn next_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = self
            .bytes
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof {
                needed: self.pos + 1,
                available: self.bytes.len(),
            })?;
        self.pos += 1;
        Ok(byte)
    }

    /// Little-endian word.
    pub fn next_u16(&mut self) -> Result<u16, DecodeError> {
        if self.pos + 2 > self.bytes.len() {
            return Err(DecodeError::UnexpectedEof {
                needed: self.pos + 2,
                available: self.bytes.len(),
            });
        }
        let low = self.next_u8()?;
        let high = self.next_u8()?;
        Ok(word_from_bytes(low, high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_words() {
        let mut fetch = ByteFetcher::new(&[0x01, 0x34, 0x12]);
        assert_eq!(fetch.next_u8().unwrap(), 0x01);
        assert_eq!(fetch.next_u16().unwrap(), 0x1234);
        assert_eq!(fetch.consumed(), 3);
    }

    #[test]
    fn reports_how_many_bytes_were_needed() {
        let mut fetch = ByteFetcher::new(&[0x01, 0x34]);
        fetch.next_u8().unwrap();
        assert_eq!(
            fetch.next_u16(),
            Err(DecodeError::UnexpectedEof {
                needed: 3,
                available: 2
            })
        );
        // A failed word read consumes nothing.
        assert_eq!(fetch.consumed(), 1);
    }
}
