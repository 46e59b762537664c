//! PNG tEXt chunk injection
//!
//! Splices textual metadata chunks into an existing PNG byte stream right
//! after the IHDR chunk. Existing chunks are copied byte-for-byte, so the
//! output decodes exactly like the input while carrying the extra entries.

use crate::{MetadataEntry, SnagError};
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderStringWriter;
use std::io::Write;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub const IHDR: [u8; 4] = *b"IHDR";

pub const TEXT: [u8; 4] = *b"tEXt";

pub const PNG_MIME: &str = "image/png";

/// length + type + crc
const CHUNK_OVERHEAD: usize = 12;

const CRC_TABLE: [u32; 256] = generate_crc_table();

const fn generate_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let poly: u32 = 0xEDB88320;

    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ poly;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

#[inline]
fn crc_update(mut crc: u32, data: &[u8]) -> u32 {
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = CRC_TABLE[index] ^ (crc >> 8);
    }
    crc
}

#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    !crc_update(0xFFFFFFFF, data)
}

/// CRC over the chunk type followed by its payload, as stored in the chunk trailer.
#[inline]
pub fn chunk_crc(chunk_type: &[u8; 4], data: &[u8]) -> u32 {
    !crc_update(crc_update(0xFFFFFFFF, chunk_type), data)
}

/// Borrowed view of one chunk inside a container.
#[derive(Debug, Clone, Copy)]
pub struct ChunkView<'a> {
    pub chunk_type: [u8; 4],
    pub data: &'a [u8],
    pub stored_crc: u32,
    /// The full chunk: length, type, data and crc.
    pub raw: &'a [u8],
}

impl ChunkView<'_> {
    pub fn crc_valid(&self) -> bool {
        chunk_crc(&self.chunk_type, self.data) == self.stored_crc
    }
}

/// Walks the chunk sequence that follows the signature.
///
/// Yields `Err` once and then stops if a chunk runs past the end of the buffer.
pub struct ChunkCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ChunkCursor<'a> {
    pub fn new(png: &'a [u8]) -> Result<Self, SnagError> {
        if png.len() < PNG_SIGNATURE.len() {
            return Err(SnagError::Format("data too short for PNG signature".into()));
        }
        if png[..8] != PNG_SIGNATURE {
            return Err(SnagError::Format("missing PNG signature".into()));
        }

        Ok(Self {
            bytes: png,
            pos: PNG_SIGNATURE.len(),
            failed: false,
        })
    }

    fn read_chunk(&mut self) -> Result<ChunkView<'a>, SnagError> {
        let start = self.pos;
        let remaining = self.bytes.len() - start;
        if remaining < 8 {
            return Err(SnagError::Format(format!(
                "truncated chunk header at offset {start}"
            )));
        }

        let header = &self.bytes[start..start + 8];
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let chunk_type = [header[4], header[5], header[6], header[7]];

        let end = start
            .checked_add(CHUNK_OVERHEAD)
            .and_then(|n| n.checked_add(length))
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                SnagError::Format(format!(
                    "chunk {} at offset {start} declares {length} bytes past end of buffer ({} bytes)",
                    String::from_utf8_lossy(&chunk_type),
                    self.bytes.len()
                ))
            })?;

        let data = &self.bytes[start + 8..start + 8 + length];
        let crc_bytes = &self.bytes[end - 4..end];
        let stored_crc = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        self.pos = end;

        Ok(ChunkView {
            chunk_type,
            data,
            stored_crc,
            raw: &self.bytes[start..end],
        })
    }
}

impl<'a> Iterator for ChunkCursor<'a> {
    type Item = Result<ChunkView<'a>, SnagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }

        let chunk = self.read_chunk();
        if chunk.is_err() {
            self.failed = true;
        }
        Some(chunk)
    }
}

/// Serialize one entry as a complete tEXt chunk.
pub fn build_text_chunk(entry: &MetadataEntry) -> Result<Vec<u8>, SnagError> {
    entry.validate()?;

    let payload_len = entry.key.len() + 1 + entry.value.len();
    let length = u32::try_from(payload_len).map_err(|_| {
        SnagError::InvalidMetadata(format!("entry '{}' is too large for a chunk", entry.key))
    })?;

    let mut chunk = Vec::with_capacity(CHUNK_OVERHEAD + payload_len);
    chunk.extend_from_slice(&length.to_be_bytes());
    chunk.extend_from_slice(&TEXT);
    chunk.extend_from_slice(entry.key.as_bytes());
    chunk.push(0);
    chunk.extend_from_slice(entry.value.as_bytes());

    let crc = chunk_crc(&TEXT, &chunk[8..]);
    chunk.extend_from_slice(&crc.to_be_bytes());

    Ok(chunk)
}

/// Copy `png` with one tEXt chunk per entry inserted directly after IHDR.
pub fn inject_text_chunks(png: &[u8], entries: &[MetadataEntry]) -> Result<Vec<u8>, SnagError> {
    let injected = entries
        .iter()
        .map(build_text_chunk)
        .collect::<Result<Vec<_>, _>>()?;
    let extra: usize = injected.iter().map(Vec::len).sum();

    let cursor = ChunkCursor::new(png)?;
    let mut out = Vec::with_capacity(png.len() + extra);
    out.extend_from_slice(&PNG_SIGNATURE);

    let mut saw_header = false;
    for chunk in cursor {
        let chunk = chunk?;
        out.extend_from_slice(chunk.raw);

        if chunk.chunk_type == IHDR && !saw_header {
            saw_header = true;
            for text in &injected {
                out.extend_from_slice(text);
            }
        }
    }

    if !saw_header {
        return Err(SnagError::Format("no IHDR chunk to anchor metadata".into()));
    }

    Ok(out)
}

/// Standard base64, no line wrapping. The encoder is fed `slice_size` bytes
/// at a time; the output does not depend on the slice size.
pub fn encode_base64_sliced(bytes: &[u8], slice_size: usize) -> Result<String, SnagError> {
    if slice_size == 0 {
        return Err(SnagError::ConfigurationError(
            "encoding slice size must be at least 1".into(),
        ));
    }

    let mut encoder = EncoderStringWriter::new(&STANDARD);
    for slice in bytes.chunks(slice_size) {
        encoder.write_all(slice)?;
    }
    Ok(encoder.into_inner())
}

/// Inject `entries` and return the transport encoding of the new container.
pub fn embed_metadata(
    png: &[u8],
    entries: &[MetadataEntry],
    slice_size: usize,
) -> Result<String, SnagError> {
    let bytes = inject_text_chunks(png, entries)?;
    encode_base64_sliced(&bytes, slice_size)
}

pub fn to_data_url(base64: &str) -> String {
    format!("data:{PNG_MIME};base64,{base64}")
}

/// Every tEXt entry in the container, in file order.
///
/// Keys and values are decoded as UTF-8, lossily for foreign Latin-1 text.
pub fn read_text_chunks(png: &[u8]) -> Result<Vec<MetadataEntry>, SnagError> {
    let mut entries = Vec::new();

    for chunk in ChunkCursor::new(png)? {
        let chunk = chunk?;
        if chunk.chunk_type != TEXT {
            continue;
        }

        let split = chunk
            .data
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| SnagError::Format("tEXt chunk without key separator".into()))?;

        entries.push(MetadataEntry::new(
            String::from_utf8_lossy(&chunk.data[..split]),
            String::from_utf8_lossy(&chunk.data[split + 1..]),
        ));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn raw_chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(data);
        out.extend_from_slice(&chunk_crc(chunk_type, data).to_be_bytes());
        out
    }

    fn minimal_png() -> Vec<u8> {
        let ihdr = [0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0];
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend(raw_chunk(b"IHDR", &ihdr));
        png.extend(raw_chunk(b"IDAT", &[0x78, 0x9c, 0x63, 0x00, 0x01]));
        png.extend(raw_chunk(b"IEND", &[]));
        png
    }

    #[test]
    fn test_crc_known_values() {
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"123456789"), 0xCBF43926);
        // CRC of an empty IEND chunk is fixed by the format.
        assert_eq!(chunk_crc(b"IEND", &[]), 0xAE426082);
    }

    #[test]
    fn test_crc_matches_crc32fast() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4099).collect();
        assert_eq!(crc32(&data), crc32fast::hash(&data));
    }

    #[test]
    fn test_text_chunk_layout() {
        let chunk = build_text_chunk(&MetadataEntry::new("Title", "x")).unwrap();
        assert_eq!(&chunk[..4], &7u32.to_be_bytes());
        assert_eq!(&chunk[4..8], b"tEXt");
        assert_eq!(&chunk[8..15], b"Title\0x");
        let crc = u32::from_be_bytes(chunk[15..19].try_into().unwrap());
        assert_eq!(crc, crc32fast::hash(&chunk[4..15]));
    }

    #[test]
    fn test_injects_after_ihdr() {
        let png = minimal_png();
        let out = inject_text_chunks(&png, &[MetadataEntry::new("A", "1")]).unwrap();

        let types: Vec<[u8; 4]> = ChunkCursor::new(&out)
            .unwrap()
            .map(|c| c.unwrap().chunk_type)
            .collect();
        assert_eq!(types, vec![*b"IHDR", *b"tEXt", *b"IDAT", *b"IEND"]);
        assert_eq!(&out[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_original_chunks_copied_verbatim() {
        let png = minimal_png();
        let out = inject_text_chunks(&png, &[MetadataEntry::new("A", "1")]).unwrap();
        let text_len = build_text_chunk(&MetadataEntry::new("A", "1")).unwrap().len();

        let ihdr_end = 8 + 12 + 13;
        assert_eq!(&out[..ihdr_end], &png[..ihdr_end]);
        assert_eq!(&out[ihdr_end + text_len..], &png[ihdr_end..]);
    }

    #[test]
    fn test_no_entries_is_identity() {
        let png = minimal_png();
        assert_eq!(inject_text_chunks(&png, &[]).unwrap(), png);
    }

    #[test]
    fn test_truncated_chunk_is_format_error() {
        let mut png = minimal_png();
        png.truncate(png.len() - 2);
        assert!(matches!(
            inject_text_chunks(&png, &[]),
            Err(SnagError::Format(_))
        ));
    }

    #[test]
    fn test_length_past_end_is_format_error() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&u32::MAX.to_be_bytes());
        png.extend_from_slice(b"IHDR");
        assert!(matches!(
            inject_text_chunks(&png, &[]),
            Err(SnagError::Format(_))
        ));
    }

    #[test]
    fn test_bad_signature_is_format_error() {
        let mut png = minimal_png();
        png[1] = b'X';
        assert!(matches!(
            read_text_chunks(&png),
            Err(SnagError::Format(_))
        ));
    }

    #[test]
    fn test_missing_ihdr_is_format_error() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend(raw_chunk(b"IEND", &[]));
        assert!(matches!(
            inject_text_chunks(&png, &[MetadataEntry::new("k", "v")]),
            Err(SnagError::Format(_))
        ));
    }

    #[test]
    fn test_nul_in_key_is_rejected() {
        let png = minimal_png();
        assert!(matches!(
            inject_text_chunks(&png, &[MetadataEntry::new("a\0b", "v")]),
            Err(SnagError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_sliced_encoding_independent_of_slice_size() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let expected = STANDARD.encode(&data);

        for slice in [1, 2, 3, 7, 1000, crate::DEFAULT_ENCODING_SLICE, data.len() + 5] {
            assert_eq!(encode_base64_sliced(&data, slice).unwrap(), expected);
        }
        assert!(encode_base64_sliced(&data, 0).is_err());
    }

    #[test]
    fn test_data_url_prefix() {
        assert_eq!(to_data_url("AAAA"), "data:image/png;base64,AAAA");
    }
}
