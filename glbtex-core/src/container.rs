//! GLB container parsing and assembly.
//!
//! A GLB file is a 12-byte header (magic, version, total length) followed by
//! chunks, each an 8-byte header (length, type) and a payload. Parsing accepts
//! a JSON chunk followed by any mix of chunks; assembly always writes the
//! canonical JSON + BIN pair, both padded to 4 bytes.

use crate::manifest::Manifest;
use crate::{Error, Result};
use serde::Serialize;

/// `glTF` in ASCII
pub const GLB_MAGIC: [u8; 4] = *b"glTF";
pub const GLB_VERSION: u32 = 2;
pub const HEADER_LEN: usize = 12;
pub const CHUNK_HEADER_LEN: usize = 8;
/// `JSON` read as a little-endian u32
pub const CHUNK_JSON: u32 = 0x4E4F534A;
/// `BIN\0` read as a little-endian u32
pub const CHUNK_BIN: u32 = 0x004E4942;

/// Header and chunk table of a parsed container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub version: u32,
    pub total_length: u32,
    pub chunks: Vec<ChunkInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkInfo {
    pub kind: u32,
    pub length: u32,
}

impl ChunkInfo {
    /// Printable chunk tag (`JSON`, `BIN`, or the raw tag bytes)
    pub fn tag(&self) -> String {
        match self.kind {
            CHUNK_JSON => "JSON".to_string(),
            CHUNK_BIN => "BIN".to_string(),
            other => String::from_utf8_lossy(&other.to_le_bytes())
                .trim_end_matches('\0')
                .to_string(),
        }
    }
}

/// A parsed GLB container: manifest plus the binary payload
#[derive(Debug, Clone)]
pub struct GlbContainer {
    pub summary: ContainerSummary,
    pub manifest: Manifest,
    /// BIN chunk payload (empty when the file carries no BIN chunk)
    pub bin: Vec<u8>,
}

/// Number of bytes needed to bring `len` up to a 4-byte boundary
#[inline]
pub fn padding_for(len: usize) -> usize {
    (4 - len % 4) % 4
}

#[inline]
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Splits GLB bytes into manifest and binary payload, validating the header
/// and chunk framing.
pub fn parse_glb(bytes: &[u8]) -> Result<GlbContainer> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::MalformedContainer(format!(
            "file is {} bytes, shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }
    if bytes[0..4] != GLB_MAGIC {
        return Err(Error::MalformedContainer(format!(
            "bad magic {:?}, expected \"glTF\"",
            String::from_utf8_lossy(&bytes[0..4])
        )));
    }
    let version = read_u32(bytes, 4);
    if version != GLB_VERSION {
        return Err(Error::MalformedContainer(format!(
            "unsupported version {}, expected {}",
            version, GLB_VERSION
        )));
    }
    let total_length = read_u32(bytes, 8);
    let end = total_length as usize;
    if end < HEADER_LEN || end > bytes.len() {
        return Err(Error::MalformedContainer(format!(
            "declared length {} does not fit the {}-byte file",
            total_length,
            bytes.len()
        )));
    }

    let mut chunks = Vec::new();
    let mut manifest = None;
    let mut bin = None;
    let mut offset = HEADER_LEN;

    while offset + CHUNK_HEADER_LEN <= end {
        let length = read_u32(bytes, offset);
        let kind = read_u32(bytes, offset + 4);
        let start = offset + CHUNK_HEADER_LEN;
        let stop = start
            .checked_add(length as usize)
            .filter(|&stop| stop <= end)
            .ok_or_else(|| {
                Error::MalformedContainer(format!(
                    "chunk {} at byte {} declares {} bytes past the end of the file",
                    chunks.len(),
                    offset,
                    length
                ))
            })?;
        let payload = &bytes[start..stop];

        if chunks.is_empty() {
            if kind != CHUNK_JSON {
                return Err(Error::MissingManifest(format!(
                    "first chunk is {:?}, expected JSON",
                    ChunkInfo { kind, length }.tag()
                )));
            }
            manifest = Some(decode_manifest(payload)?);
        } else if kind == CHUNK_BIN && bin.is_none() {
            bin = Some(payload.to_vec());
        }

        chunks.push(ChunkInfo { kind, length });
        offset = stop;
    }

    let manifest = manifest
        .ok_or_else(|| Error::MissingManifest("container has no chunks".to_string()))?;

    Ok(GlbContainer {
        summary: ContainerSummary {
            version,
            total_length,
            chunks,
        },
        manifest,
        bin: bin.unwrap_or_default(),
    })
}

fn decode_manifest(payload: &[u8]) -> Result<Manifest> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| Error::InvalidManifestEncoding(format!("JSON chunk is not UTF-8: {}", e)))?;
    let text = text.trim_end_matches(|c: char| c == ' ' || c == '\0');
    Manifest::from_json(text)
        .map_err(|e| Error::InvalidManifestEncoding(format!("JSON chunk is not a glTF manifest: {}", e)))
}

fn chunk_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        Error::MalformedContainer(format!("{} of {} bytes exceeds the GLB size limit", what, len))
    })
}

/// Writes a GLB container: header, JSON chunk padded with spaces, BIN chunk
/// padded with zeros. The BIN chunk is emitted even when `bin` is empty.
pub fn assemble_glb(manifest: &Manifest, bin: &[u8]) -> Result<Vec<u8>> {
    let json_bytes = manifest.to_json_bytes()?;

    let json_padding = padding_for(json_bytes.len());
    let padded_json_len = json_bytes.len() + json_padding;

    let bin_padding = padding_for(bin.len());
    let padded_bin_len = bin.len() + bin_padding;

    let total_size = HEADER_LEN + CHUNK_HEADER_LEN + padded_json_len + CHUNK_HEADER_LEN + padded_bin_len;
    let total_len = chunk_len(total_size, "container")?;
    let json_len = chunk_len(padded_json_len, "JSON chunk")?;
    let bin_len = chunk_len(padded_bin_len, "BIN chunk")?;

    let mut glb = Vec::with_capacity(total_size);

    // Header
    glb.extend_from_slice(&GLB_MAGIC);
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&total_len.to_le_bytes());

    // JSON chunk
    glb.extend_from_slice(&json_len.to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(&json_bytes);
    glb.resize(glb.len() + json_padding, 0x20);

    // BIN chunk
    glb.extend_from_slice(&bin_len.to_le_bytes());
    glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    glb.extend_from_slice(bin);
    glb.resize(glb.len() + bin_padding, 0x00);

    debug_assert_eq!(glb.len(), total_size);
    Ok(glb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_glb(chunks: &[(u32, &[u8])]) -> Vec<u8> {
        let body: usize = chunks.iter().map(|(_, p)| CHUNK_HEADER_LEN + p.len()).sum();
        let mut out = Vec::new();
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&((HEADER_LEN + body) as u32).to_le_bytes());
        for (kind, payload) in chunks {
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(payload);
        }
        out
    }

    const JSON: &[u8] = br#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":4}]}"#;

    #[test]
    fn parses_json_and_bin() {
        let glb = raw_glb(&[(CHUNK_JSON, JSON), (CHUNK_BIN, &[1, 2, 3, 4])]);
        let parsed = parse_glb(&glb).unwrap();
        assert_eq!(parsed.manifest.buffers[0].byte_length, 4);
        assert_eq!(parsed.bin, vec![1, 2, 3, 4]);
        assert_eq!(parsed.summary.chunks.len(), 2);
        assert_eq!(parsed.summary.chunks[1].tag(), "BIN");
    }

    #[test]
    fn json_only_container_has_empty_payload() {
        let glb = raw_glb(&[(CHUNK_JSON, br#"{"asset":{"version":"2.0"}}  "#)]);
        let parsed = parse_glb(&glb).unwrap();
        assert!(parsed.bin.is_empty());
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let glb = raw_glb(&[
            (CHUNK_JSON, JSON),
            (0x5458_4554, b"meta"),
            (CHUNK_BIN, &[9, 9, 9, 9]),
        ]);
        let parsed = parse_glb(&glb).unwrap();
        assert_eq!(parsed.bin, vec![9, 9, 9, 9]);
        assert_eq!(parsed.summary.chunks.len(), 3);
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut glb = raw_glb(&[(CHUNK_JSON, JSON)]);
        glb[0] = b'x';
        assert!(matches!(parse_glb(&glb), Err(Error::MalformedContainer(_))));

        let mut glb = raw_glb(&[(CHUNK_JSON, JSON)]);
        glb[4] = 1;
        assert!(matches!(parse_glb(&glb), Err(Error::MalformedContainer(_))));

        assert!(matches!(parse_glb(b"glTF"), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn rejects_truncated_chunk() {
        let mut glb = raw_glb(&[(CHUNK_JSON, JSON), (CHUNK_BIN, &[1, 2, 3, 4])]);
        glb.truncate(glb.len() - 2);
        let declared = glb.len() as u32;
        glb[8..12].copy_from_slice(&declared.to_le_bytes());
        assert!(matches!(parse_glb(&glb), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn first_chunk_must_be_json() {
        let glb = raw_glb(&[(CHUNK_BIN, &[0, 0, 0, 0])]);
        assert!(matches!(parse_glb(&glb), Err(Error::MissingManifest(_))));

        let empty = raw_glb(&[]);
        assert!(matches!(parse_glb(&empty), Err(Error::MissingManifest(_))));
    }

    #[test]
    fn rejects_invalid_manifest() {
        let glb = raw_glb(&[(CHUNK_JSON, &[0xff, 0xfe, 0x20, 0x20])]);
        assert!(matches!(parse_glb(&glb), Err(Error::InvalidManifestEncoding(_))));

        let glb = raw_glb(&[(CHUNK_JSON, b"{\"buffers\": 12}")]);
        assert!(matches!(parse_glb(&glb), Err(Error::InvalidManifestEncoding(_))));
    }

    #[test]
    fn assembled_length_matches_formula() {
        let manifest = Manifest::from_json(std::str::from_utf8(JSON).unwrap()).unwrap();
        for bin_len in 0..9 {
            let bin = vec![7u8; bin_len];
            let glb = assemble_glb(&manifest, &bin).unwrap();

            let json_len = manifest.to_json_bytes().unwrap().len();
            let expected = 12 + 8 + json_len + padding_for(json_len) + 8 + bin_len + padding_for(bin_len);
            assert_eq!(glb.len(), expected);
            assert_eq!(read_u32(&glb, 8) as usize, expected);
            assert_eq!(glb.len() % 4, 0);

            let parsed = parse_glb(&glb).unwrap();
            assert_eq!(&parsed.bin[..bin_len], &bin[..]);
            assert!(parsed.bin[bin_len..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn json_padding_uses_spaces() {
        let manifest = Manifest::from_json(r#"{"asset":{"version":"2.0"}}"#).unwrap();
        let glb = assemble_glb(&manifest, &[]).unwrap();
        let json_len = read_u32(&glb, 12) as usize;
        let raw = manifest.to_json_bytes().unwrap();
        assert!(glb[20 + raw.len()..20 + json_len].iter().all(|&b| b == 0x20));
    }

    #[test]
    fn empty_payload_still_emits_bin_chunk() {
        let manifest = Manifest::from_json(r#"{"asset":{"version":"2.0"}}"#).unwrap();
        let glb = assemble_glb(&manifest, &[]).unwrap();
        let json_len = read_u32(&glb, 12) as usize;
        let bin_header = 20 + json_len;
        assert_eq!(read_u32(&glb, bin_header), 0);
        assert_eq!(read_u32(&glb, bin_header + 4), CHUNK_BIN);
        assert_eq!(glb.len(), bin_header + 8);
    }
}
