use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use memmap2::Mmap;

use kb_tensor::{Matrix, Vector};

use crate::error::{LoadError, Result};
use crate::text::element_count;

/// Size in bytes of one header dimension (u64).
pub const DIM_BYTES: usize = std::mem::size_of::<u64>();

/// Size in bytes of one payload value (f64).
pub const VALUE_BYTES: usize = std::mem::size_of::<f64>();

/// Read `N` native-endian u64 dimensions from the start of a reader.
fn read_header<const N: usize>(reader: &mut impl Read) -> Result<[u64; N]> {
    let mut dims = [0u64; N];
    let mut buf8 = [0u8; DIM_BYTES];
    for d in dims.iter_mut() {
        reader.read_exact(&mut buf8)?;
        *d = u64::from_ne_bytes(buf8);
    }
    Ok(dims)
}

/// Reinterpret raw bytes as native-endian f64 values.
fn decode_values(bytes: &[u8], count: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(count);
    for chunk in bytes.chunks_exact(VALUE_BYTES).take(count) {
        let mut buf8 = [0u8; VALUE_BYTES];
        buf8.copy_from_slice(chunk);
        out.push(f64::from_ne_bytes(buf8));
    }
    out
}

fn payload_bytes(dims: &[u64], count: usize) -> Result<usize> {
    count
        .checked_mul(VALUE_BYTES)
        .ok_or_else(|| LoadError::Overflow(dims.to_vec()))
}

/// Read the payload without trusting the header's size: the buffer only
/// grows as bytes actually arrive.
fn read_payload(reader: &mut impl Read, dims: &[u64], count: usize) -> Result<Vec<f64>> {
    let expected = payload_bytes(dims, count)?;
    let mut bytes = Vec::new();
    reader.take(expected as u64).read_to_end(&mut bytes)?;
    if bytes.len() < expected {
        return Err(LoadError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(decode_values(&bytes, count))
}

/// Parse a header from a file through a buffered reader, then decode the
/// payload that follows it from a memory map of the whole file.
fn map_file<const N: usize>(path: &Path) -> Result<([u64; N], Vec<f64>)> {
    let file = File::open(path)?;
    let dims = read_header::<N>(&mut BufReader::new(&file))?;
    let count = element_count(&dims)?;

    let offset = N * DIM_BYTES;
    let expected = payload_bytes(&dims, count)?
        .checked_add(offset)
        .ok_or_else(|| LoadError::Overflow(dims.to_vec()))?;

    // The file is only read while the map is alive.
    let mmap = unsafe { Mmap::map(&file)? };
    if mmap.len() < expected {
        return Err(LoadError::Truncated {
            expected,
            actual: mmap.len(),
        });
    }

    let data = decode_values(&mmap[offset..expected], count);
    Ok((dims, data))
}

/// Read a binary matrix (`rows`, `cols`, payload) from a stream.
pub fn read_matrix(reader: &mut impl Read) -> Result<Matrix> {
    let dims = read_header::<2>(reader)?;
    let count = element_count(&dims)?;
    let data = read_payload(reader, &dims, count)?;
    Ok(Matrix::new(dims[0] as usize, dims[1] as usize, data)?)
}

/// Read a binary vector (`len`, payload) from a stream.
pub fn read_vector(reader: &mut impl Read) -> Result<Vector> {
    let dims = read_header::<1>(reader)?;
    let count = element_count(&dims)?;
    Ok(Vector::new(read_payload(reader, &dims, count)?))
}

/// Load a binary matrix file via a memory map.
pub fn load_matrix(path: &Path) -> Result<Matrix> {
    let ([rows, cols], data) = map_file::<2>(path)?;
    Ok(Matrix::new(rows as usize, cols as usize, data)?)
}

/// Load a binary vector file via a memory map.
pub fn load_vector(path: &Path) -> Result<Vector> {
    let (_, data) = map_file::<1>(path)?;
    Ok(Vector::new(data))
}

fn write_values(writer: &mut impl Write, values: &[f64]) -> Result<()> {
    for v in values {
        writer.write_all(&v.to_ne_bytes())?;
    }
    Ok(())
}

pub fn write_matrix(writer: &mut impl Write, m: &Matrix) -> Result<()> {
    writer.write_all(&(m.rows() as u64).to_ne_bytes())?;
    writer.write_all(&(m.cols() as u64).to_ne_bytes())?;
    write_values(writer, m.data())
}

pub fn write_vector(writer: &mut impl Write, v: &Vector) -> Result<()> {
    writer.write_all(&(v.len() as u64).to_ne_bytes())?;
    write_values(writer, v.data())
}
