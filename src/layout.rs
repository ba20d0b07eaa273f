//! Bounds-checked readers for fixed binary layouts.
//!
//! Account data and logged event payloads are fixed-offset byte structures.
//! Every read goes through the helpers here, so a truncated or malformed
//! buffer yields a `LayoutError` instead of reading out of bounds. Layout
//! owners declare their fields as named [`FieldSpec`] constants and feed them
//! to these readers.

use crate::shared::errors::LayoutError;
use solana_sdk::pubkey::Pubkey;

/// One fixed-position field inside a binary layout.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl FieldSpec {
    pub const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self { name, offset, width }
    }

    pub fn slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], LayoutError> {
        let end = self.offset + self.width;
        if data.len() < end {
            return Err(LayoutError::OutOfBounds {
                field: self.name,
                end,
                have: data.len(),
            });
        }
        Ok(&data[self.offset..end])
    }

    pub fn read_u32_le(&self, data: &[u8]) -> Result<u32, LayoutError> {
        let slice = self.slice(data)?;
        let bytes: [u8; 4] = slice.try_into().map_err(|_| LayoutError::OutOfBounds {
            field: self.name,
            end: self.offset + 4,
            have: data.len(),
        })?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_pubkey(&self, data: &[u8]) -> Result<Pubkey, LayoutError> {
        let slice = self.slice(data)?;
        let bytes: [u8; 32] = slice.try_into().map_err(|_| LayoutError::OutOfBounds {
            field: self.name,
            end: self.offset + 32,
            have: data.len(),
        })?;
        Ok(Pubkey::new_from_array(bytes))
    }
}

/// Read a COption-style field: a u32 tag followed by a 32-byte key at a
/// separate offset. Tag 0 means unset, tag 1 means the key is present; any
/// other tag is malformed data.
pub fn read_optional_key(
    data: &[u8],
    tag: &FieldSpec,
    key: &FieldSpec,
) -> Result<Option<Pubkey>, LayoutError> {
    match tag.read_u32_le(data)? {
        0 => Ok(None),
        1 => Ok(Some(key.read_pubkey(data)?)),
        other => Err(LayoutError::BadOptionTag {
            field: tag.name,
            tag: other,
        }),
    }
}

/// Sequential reader for discriminator-prefixed event payloads where fields
/// sit back to back rather than at independent offsets.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, width: usize, field: &'static str) -> Result<&'a [u8], LayoutError> {
        let end = self.pos + width;
        if self.data.len() < end {
            return Err(LayoutError::OutOfBounds {
                field,
                end,
                have: self.data.len(),
            });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn skip(&mut self, width: usize, field: &'static str) -> Result<(), LayoutError> {
        self.take(width, field).map(|_| ())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, LayoutError> {
        Ok(self.take(1, field)?[0])
    }

    pub fn read_u16_le(&mut self, field: &'static str) -> Result<u16, LayoutError> {
        let slice = self.take(2, field)?;
        Ok(u16::from_le_bytes([slice[0], slice[1]]))
    }

    pub fn read_u64_le(&mut self, field: &'static str) -> Result<u64, LayoutError> {
        let slice = self.take(8, field)?;
        let bytes: [u8; 8] = slice.try_into().map_err(|_| LayoutError::OutOfBounds {
            field,
            end: self.pos,
            have: self.data.len(),
        })?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn read_pubkey(&mut self, field: &'static str) -> Result<Pubkey, LayoutError> {
        let slice = self.take(32, field)?;
        let bytes: [u8; 32] = slice.try_into().map_err(|_| LayoutError::OutOfBounds {
            field,
            end: self.pos,
            have: self.data.len(),
        })?;
        Ok(Pubkey::new_from_array(bytes))
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: FieldSpec = FieldSpec::new("tag", 0, 4);
    const KEY: FieldSpec = FieldSpec::new("key", 4, 32);

    #[test]
    fn test_field_spec_rejects_truncated_buffer() {
        let data = [0u8; 3];
        let err = TAG.read_u32_le(&data).unwrap_err();
        assert_eq!(
            err,
            LayoutError::OutOfBounds {
                field: "tag",
                end: 4,
                have: 3
            }
        );
    }

    #[test]
    fn test_read_optional_key_unset() {
        let data = [0u8; 36];
        assert_eq!(read_optional_key(&data, &TAG, &KEY).unwrap(), None);
    }

    #[test]
    fn test_read_optional_key_set() {
        let key = Pubkey::new_unique();
        let mut data = vec![1, 0, 0, 0];
        data.extend_from_slice(key.as_ref());
        assert_eq!(read_optional_key(&data, &TAG, &KEY).unwrap(), Some(key));
    }

    #[test]
    fn test_read_optional_key_bad_tag_fails_closed() {
        let mut data = vec![7, 0, 0, 0];
        data.extend_from_slice(&[0u8; 32]);
        let err = read_optional_key(&data, &TAG, &KEY).unwrap_err();
        assert_eq!(
            err,
            LayoutError::BadOptionTag {
                field: "tag",
                tag: 7
            }
        );
    }

    #[test]
    fn test_byte_reader_sequence() {
        let key = Pubkey::new_unique();
        let mut data = vec![0xAB];
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&42u64.to_le_bytes());
        data.extend_from_slice(key.as_ref());

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u8("byte").unwrap(), 0xAB);
        assert_eq!(reader.read_u16_le("short").unwrap(), 3);
        assert_eq!(reader.read_u64_le("long").unwrap(), 42);
        assert_eq!(reader.read_pubkey("key").unwrap(), key);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_byte_reader_stops_at_end() {
        let data = [1u8, 2, 3];
        let mut reader = ByteReader::new(&data);
        reader.skip(2, "head").unwrap();
        assert!(reader.read_u64_le("tail").is_err());
        // failed read does not advance past the end
        assert_eq!(reader.remaining(), 1);
    }
}
