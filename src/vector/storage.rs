//! Memory-mapped segment files holding the vectors of one collection.
//!
//! # Storage Format
//!
//! - Header (16 bytes): magic, version, dimension, vector count
//! - Records: `u32` id length, UTF-8 id bytes, `dimension` little-endian f32 values
//!
//! A segment is always rewritten as a whole. Upserts happen in memory and
//! the collection writes a fresh segment on persist, so a stale entry can
//! never shadow its replacement.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use crate::vector::types::{VectorDimension, VectorError};

/// Current storage format version.
const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify vector segment files.
const MAGIC_BYTES: &[u8; 4] = b"PVEC";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Number of bytes in the id length prefix.
const BYTES_PER_LEN: usize = 4;

const SEGMENT_FILE: &str = "segment_0.vec";

/// Read-only view over a persisted segment.
#[derive(Debug)]
pub struct MmapVectorStorage {
    path: PathBuf,
    mmap: Mmap,
    dimension: VectorDimension,
    vector_count: usize,
}

impl MmapVectorStorage {
    /// Path of the segment file inside a collection directory.
    pub fn segment_path(dir: &Path) -> PathBuf {
        dir.join(SEGMENT_FILE)
    }

    /// Writes `records` as the complete content of the segment in `dir`.
    ///
    /// The file is written next to the target and renamed over it, so readers
    /// either see the previous segment or the new one.
    pub fn write_segment(
        dir: &Path,
        dimension: VectorDimension,
        records: &[(&str, &[f32])],
    ) -> Result<(), VectorError> {
        for (_, vector) in records {
            dimension.validate_vector(vector)?;
        }

        fs::create_dir_all(dir)?;
        let target = Self::segment_path(dir);
        let tmp = dir.join(format!("{SEGMENT_FILE}.tmp"));

        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(MAGIC_BYTES)?;
            writer.write_all(&STORAGE_VERSION.to_le_bytes())?;
            writer.write_all(&(dimension.get() as u32).to_le_bytes())?;
            writer.write_all(&(records.len() as u32).to_le_bytes())?;

            for (id, vector) in records {
                let id_bytes = id.as_bytes();
                writer.write_all(&(id_bytes.len() as u32).to_le_bytes())?;
                writer.write_all(id_bytes)?;
                for value in *vector {
                    writer.write_all(&value.to_le_bytes())?;
                }
            }
            writer.flush()?;
        }

        fs::rename(&tmp, &target)?;
        Ok(())
    }

    /// Opens an existing segment.
    ///
    /// Returns an error if the file doesn't exist or has invalid format.
    pub fn open(dir: &Path) -> Result<Self, VectorError> {
        let path = Self::segment_path(dir);
        let file = File::open(&path)?;
        // The segment is only ever replaced by rename, never modified in place.
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        let (version, dimension, vector_count) = Self::read_header(&mmap)?;
        if version != STORAGE_VERSION {
            return Err(VectorError::VersionMismatch {
                expected: STORAGE_VERSION,
                actual: version,
            });
        }

        Ok(Self {
            path,
            mmap,
            dimension,
            vector_count,
        })
    }

    /// Reads every record in file order.
    pub fn read_all(&self) -> Result<Vec<(String, Vec<f32>)>, VectorError> {
        let dimension = self.dimension.get();
        let mut records = Vec::with_capacity(self.vector_count);
        let mut offset = HEADER_SIZE;

        for _ in 0..self.vector_count {
            let id_len = self.read_u32(offset)? as usize;
            offset += BYTES_PER_LEN;

            let id_bytes = self.slice(offset, id_len)?;
            let id = std::str::from_utf8(id_bytes)
                .map_err(|e| VectorError::InvalidFormat(format!("Invalid UTF-8 id: {e}")))?
                .to_string();
            offset += id_len;

            let data = self.slice(offset, dimension * BYTES_PER_F32)?;
            let vector = data
                .chunks_exact(BYTES_PER_F32)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            offset += dimension * BYTES_PER_F32;

            records.push((id, vector));
        }

        Ok(records)
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    #[must_use]
    pub fn vector_count(&self) -> usize {
        self.vector_count
    }

    /// Returns the size of the segment file in bytes.
    pub fn file_size(&self) -> Result<u64, std::io::Error> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&[u8], VectorError> {
        self.mmap.get(offset..offset + len).ok_or_else(|| {
            VectorError::InvalidFormat(format!(
                "Unexpected end of segment at byte {offset} (wanted {len} bytes)"
            ))
        })
    }

    fn read_u32(&self, offset: usize) -> Result<u32, VectorError> {
        let b = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_header(mmap: &Mmap) -> Result<(u32, VectorDimension, usize), VectorError> {
        if mmap.len() < HEADER_SIZE {
            return Err(VectorError::InvalidFormat(
                "File too small to contain header".to_string(),
            ));
        }

        if &mmap[0..4] != MAGIC_BYTES {
            return Err(VectorError::InvalidFormat("Invalid magic bytes".to_string()));
        }

        let version = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]);
        let dim_value = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]);
        let dimension = VectorDimension::new(dim_value as usize)?;
        let vector_count = u32::from_le_bytes([mmap[12], mmap[13], mmap[14], mmap[15]]) as usize;

        Ok((version, dimension, vector_count))
    }
}
