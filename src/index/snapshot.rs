//! Snapshot format
//!
//! A snapshot at base location `P` is two files written and read together:
//!
//! - `P.vectors`: little-endian binary. Magic `DMVX`, `u32` format version,
//!   `u32` dimension, `u64` record count, then `count * dimension` `f32`s in
//!   insertion order. Values round-trip bit-for-bit.
//! - `P.meta.json`: [`Sidecar`] with texts, metadata and the dimension.
//!
//! Both files are written to temporaries first and renamed into place.

use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::Metadata;
use crate::errors::{RagError, Result};

/// Magic bytes opening every vector artifact
pub const VECTOR_MAGIC: &[u8; 4] = b"DMVX";

/// Current snapshot format version
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Text and metadata half of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub version: u32,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
    pub texts: Vec<String>,
    pub metadata: Vec<Metadata>,
}

/// Fully decoded and validated snapshot
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub dimension: usize,
    /// Row-major, `texts.len() * dimension` values
    pub vectors: Vec<f32>,
    pub texts: Vec<String>,
    pub metadata: Vec<Metadata>,
}

/// Path of the vector artifact for a base location
pub fn vectors_path(location: &Path) -> PathBuf {
    with_suffix(location, ".vectors")
}

/// Path of the sidecar artifact for a base location
pub fn sidecar_path(location: &Path) -> PathBuf {
    with_suffix(location, ".meta.json")
}

/// Whether both artifacts exist at `location`
pub fn exists(location: &Path) -> bool {
    vectors_path(location).is_file() && sidecar_path(location).is_file()
}

fn with_suffix(location: &Path, suffix: &str) -> PathBuf {
    let mut name = location.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Write a snapshot, creating missing parent directories
pub fn write(
    location: &Path,
    dimension: usize,
    vectors: &[f32],
    texts: &[String],
    metadata: &[Metadata],
) -> Result<()> {
    if let Some(parent) = location.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let vector_bytes = encode_vectors(dimension, vectors, texts.len())?;
    let sidecar = Sidecar {
        version: FORMAT_VERSION,
        dimension,
        created_at: Utc::now(),
        texts: texts.to_vec(),
        metadata: metadata.to_vec(),
    };
    let sidecar_bytes = serde_json::to_vec(&sidecar)?;

    let vectors_final = vectors_path(location);
    let sidecar_final = sidecar_path(location);
    let vectors_tmp = with_suffix(&vectors_final, ".tmp");
    let sidecar_tmp = with_suffix(&sidecar_final, ".tmp");

    fs::write(&vectors_tmp, &vector_bytes)?;
    fs::write(&sidecar_tmp, &sidecar_bytes)?;
    fs::rename(&vectors_tmp, &vectors_final)?;
    fs::rename(&sidecar_tmp, &sidecar_final)?;

    Ok(())
}

/// Read and validate a snapshot
pub fn read(location: &Path) -> Result<Snapshot> {
    let vectors_file = vectors_path(location);
    let sidecar_file = sidecar_path(location);

    if !vectors_file.is_file() {
        return Err(RagError::NotFound(vectors_file));
    }
    if !sidecar_file.is_file() {
        return Err(RagError::NotFound(sidecar_file));
    }

    let (dimension, count, vectors) = decode_vectors(&fs::read(&vectors_file)?)?;

    let sidecar: Sidecar = serde_json::from_slice(&fs::read(&sidecar_file)?)
        .map_err(|e| RagError::CorruptData(format!("unreadable sidecar: {}", e)))?;

    if sidecar.version != FORMAT_VERSION {
        return Err(RagError::CorruptData(format!(
            "unsupported sidecar version {}",
            sidecar.version
        )));
    }
    if sidecar.dimension != dimension {
        return Err(RagError::CorruptData(format!(
            "sidecar dimension {} disagrees with vector dimension {}",
            sidecar.dimension, dimension
        )));
    }
    if sidecar.texts.len() != count || sidecar.metadata.len() != count {
        return Err(RagError::CorruptData(format!(
            "{} vectors but {} texts and {} metadata entries",
            count,
            sidecar.texts.len(),
            sidecar.metadata.len()
        )));
    }

    Ok(Snapshot {
        dimension,
        vectors,
        texts: sidecar.texts,
        metadata: sidecar.metadata,
    })
}

fn encode_vectors(dimension: usize, vectors: &[f32], count: usize) -> Result<Vec<u8>> {
    let dim = u32::try_from(dimension)
        .map_err(|_| RagError::CorruptData(format!("dimension {} too large", dimension)))?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + vectors.len() * 4);
    buf.put_slice(VECTOR_MAGIC);
    buf.put_u32_le(FORMAT_VERSION);
    buf.put_u32_le(dim);
    buf.put_u64_le(count as u64);
    for &value in vectors {
        buf.put_f32_le(value);
    }
    Ok(buf.to_vec())
}

fn decode_vectors(raw: &[u8]) -> Result<(usize, usize, Vec<f32>)> {
    if raw.len() < HEADER_LEN {
        return Err(RagError::CorruptData(
            "vector artifact shorter than its header".to_string(),
        ));
    }

    let mut buf = raw;
    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != VECTOR_MAGIC {
        return Err(RagError::CorruptData(
            "vector artifact has wrong magic bytes".to_string(),
        ));
    }

    let version = buf.get_u32_le();
    if version != FORMAT_VERSION {
        return Err(RagError::CorruptData(format!(
            "unsupported vector format version {}",
            version
        )));
    }

    let dimension = buf.get_u32_le() as usize;
    let count = buf.get_u64_le() as usize;

    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| RagError::CorruptData("vector count overflows".to_string()))?;
    if buf.remaining() != expected {
        return Err(RagError::CorruptData(format!(
            "expected {} bytes of vector data for {} x {}, found {}",
            expected,
            count,
            dimension,
            buf.remaining()
        )));
    }

    let mut vectors = Vec::with_capacity(count * dimension);
    while buf.has_remaining() {
        vectors.push(buf.get_f32_le());
    }

    Ok((dimension, count, vectors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn meta(i: usize) -> Metadata {
        json!({ "filename": "a.txt", "chunk_id": i })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_artifact_paths() {
        let base = Path::new("/data/index");
        assert_eq!(vectors_path(base), PathBuf::from("/data/index.vectors"));
        assert_eq!(sidecar_path(base), PathBuf::from("/data/index.meta.json"));
    }

    #[test]
    fn test_write_creates_parent_and_reads_back() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("nested").join("deeper").join("index");
        let vectors = vec![0.6, 0.8, 1.0, 0.0];
        let texts = vec!["one".to_string(), "two".to_string()];

        write(&location, 2, &vectors, &texts, &[meta(0), meta(1)]).unwrap();
        assert!(exists(&location));

        let snapshot = read(&location).unwrap();
        assert_eq!(snapshot.dimension, 2);
        assert_eq!(snapshot.texts, texts);
        assert_eq!(snapshot.metadata[1]["chunk_id"], 1);
        let bits: Vec<u32> = snapshot.vectors.iter().map(|v| v.to_bits()).collect();
        let expected: Vec<u32> = vectors.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits, expected);
    }

    #[test]
    fn test_missing_snapshot_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = read(&temp.path().join("index")).unwrap_err();
        assert!(matches!(err, RagError::NotFound(_)));
    }

    #[test]
    fn test_count_mismatch_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");
        write(&location, 2, &[1.0, 0.0], &["only".to_string()], &[meta(0)]).unwrap();

        let sidecar = Sidecar {
            version: FORMAT_VERSION,
            dimension: 2,
            created_at: Utc::now(),
            texts: vec!["only".to_string(), "extra".to_string()],
            metadata: vec![meta(0), meta(1)],
        };
        fs::write(sidecar_path(&location), serde_json::to_vec(&sidecar).unwrap()).unwrap();

        assert!(matches!(read(&location), Err(RagError::CorruptData(_))));
    }

    #[test]
    fn test_truncated_vectors_are_corrupt() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");
        write(&location, 2, &[1.0, 0.0], &["only".to_string()], &[meta(0)]).unwrap();

        let mut raw = fs::read(vectors_path(&location)).unwrap();
        raw.truncate(raw.len() - 2);
        fs::write(vectors_path(&location), raw).unwrap();

        assert!(matches!(read(&location), Err(RagError::CorruptData(_))));
    }

    #[test]
    fn test_bad_magic_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");
        write(&location, 2, &[1.0, 0.0], &["only".to_string()], &[meta(0)]).unwrap();

        let mut raw = fs::read(vectors_path(&location)).unwrap();
        raw[0] = b'X';
        fs::write(vectors_path(&location), raw).unwrap();

        assert!(matches!(read(&location), Err(RagError::CorruptData(_))));
    }
}
