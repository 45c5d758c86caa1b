//! `kb-io` - File encodings for kernel-bench operands.
//!
//! Two encodings are supported for both matrices and vectors:
//! - text: whitespace-delimited, dimension header then row-major values
//! - binary: native-endian u64 dimension header(s) then raw f64 payload

pub mod binary;
pub mod error;
pub mod format;
pub mod text;

pub use error::{LoadError, Result};
pub use format::FileFormat;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use kb_tensor::{Matrix, Vector};

/// Load a matrix from `path` in the given format.
pub fn load_matrix(path: &Path, format: FileFormat) -> Result<Matrix> {
    let m = match format {
        FileFormat::Text => text::parse_matrix(&fs::read_to_string(path)?)?,
        FileFormat::Binary => binary::load_matrix(path)?,
    };
    log::debug!("loaded {} ({format}) as {}", path.display(), m);
    Ok(m)
}

/// Load a vector from `path` in the given format.
pub fn load_vector(path: &Path, format: FileFormat) -> Result<Vector> {
    let v = match format {
        FileFormat::Text => text::parse_vector(&fs::read_to_string(path)?)?,
        FileFormat::Binary => binary::load_vector(path)?,
    };
    log::debug!("loaded {} ({format}) as {}", path.display(), v);
    Ok(v)
}

/// Save a matrix to `path`, replacing any existing file.
pub fn save_matrix(path: &Path, format: FileFormat, m: &Matrix) -> Result<()> {
    if !m.is_allocated() {
        return Err(kb_tensor::TensorError::InvalidInput(format!("cannot save unallocated {m}")).into());
    }
    let mut w = BufWriter::new(File::create(path)?);
    match format {
        FileFormat::Text => text::write_matrix(&mut w, m)?,
        FileFormat::Binary => binary::write_matrix(&mut w, m)?,
    }
    w.flush()?;
    log::debug!("saved {} to {} ({format})", m, path.display());
    Ok(())
}

/// Save a vector to `path`, replacing any existing file.
pub fn save_vector(path: &Path, format: FileFormat, v: &Vector) -> Result<()> {
    if !v.is_allocated() {
        return Err(kb_tensor::TensorError::InvalidInput(format!("cannot save unallocated {v}")).into());
    }
    let mut w = BufWriter::new(File::create(path)?);
    match format {
        FileFormat::Text => text::write_vector(&mut w, v)?,
        FileFormat::Binary => binary::write_vector(&mut w, v)?,
    }
    w.flush()?;
    log::debug!("saved {} to {} ({format})", v, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_matrix_files_in_both_formats() {
        let dir = tempdir().unwrap();
        let m = Matrix::new(2, 3, vec![1.0, -2.5, 3.25, 4.0, 1e20, 6.0]).unwrap();
        for format in [FileFormat::Text, FileFormat::Binary] {
            let path = dir.path().join(format!("m.{format}"));
            save_matrix(&path, format, &m).unwrap();
            assert_eq!(load_matrix(&path, format).unwrap(), m);
        }
    }

    #[test]
    fn test_vector_text_file_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.txt");
        save_vector(&path, FileFormat::Text, &Vector::from(vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "3\n1\n2\n3\n");
        assert_eq!(load_vector(&path, FileFormat::Text).unwrap().data(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_vector(&dir.path().join("nope"), FileFormat::Binary).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_save_unallocated_rejected() {
        let dir = tempdir().unwrap();
        let err = save_matrix(&dir.path().join("m"), FileFormat::Text, &Matrix::default()).unwrap_err();
        assert!(matches!(err, LoadError::Tensor(_)));
    }
}
