//! Whitespace-delimited text encoding.
//!
//! Matrix: `rows cols` followed by `rows * cols` row-major values.
//! Vector: `len` followed by `len` values.
//! Tokens may be split across lines arbitrarily; values beyond the declared
//! count are ignored.

use std::io::{Read, Write};

use kb_tensor::{Matrix, Vector};

use crate::error::{LoadError, Result};

/// Whitespace tokens paired with their 1-based line number.
struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    /// Upper bound on the tokens left: each needs a byte plus a separator.
    max_tokens: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self {
        let inner = src
            .lines()
            .enumerate()
            .flat_map(|(i, line)| line.split_ascii_whitespace().map(move |t| (i + 1, t)));
        Tokens {
            inner: Box::new(inner),
            max_tokens: src.len() / 2 + 1,
        }
    }

    fn dim(&mut self) -> Result<u64> {
        let (line, token) = self
            .inner
            .next()
            .ok_or(LoadError::UnexpectedEof { expected: 1, found: 0 })?;
        token.parse::<u64>().map_err(|_| LoadError::Parse {
            line,
            token: token.to_string(),
            expected: "a dimension",
        })
    }

    fn values(&mut self, count: usize) -> Result<Vec<f64>> {
        // The header is untrusted; size the buffer by what the input can hold.
        let mut out = Vec::with_capacity(count.min(self.max_tokens));
        for (line, token) in self.inner.by_ref().take(count) {
            let v = token.parse::<f64>().map_err(|_| LoadError::Parse {
                line,
                token: token.to_string(),
                expected: "a number",
            })?;
            out.push(v);
        }
        if out.len() != count {
            return Err(LoadError::UnexpectedEof {
                expected: count,
                found: out.len(),
            });
        }
        Ok(out)
    }
}

pub(crate) fn element_count(dims: &[u64]) -> Result<usize> {
    if dims.iter().any(|&d| d == 0) {
        return Err(LoadError::EmptyDimensions(dims.to_vec()));
    }
    dims.iter()
        .try_fold(1usize, |acc, &d| {
            usize::try_from(d).ok().and_then(|d| acc.checked_mul(d))
        })
        .ok_or_else(|| LoadError::Overflow(dims.to_vec()))
}

/// Parse a matrix from its text encoding.
pub fn parse_matrix(src: &str) -> Result<Matrix> {
    let mut tokens = Tokens::new(src);
    let rows = tokens.dim()?;
    let cols = tokens.dim()?;
    let count = element_count(&[rows, cols])?;
    let data = tokens.values(count)?;
    Ok(Matrix::new(rows as usize, cols as usize, data)?)
}

/// Parse a vector from its text encoding.
pub fn parse_vector(src: &str) -> Result<Vector> {
    let mut tokens = Tokens::new(src);
    let len = tokens.dim()?;
    let count = element_count(&[len])?;
    Ok(Vector::new(tokens.values(count)?))
}

pub fn read_matrix(reader: &mut impl Read) -> Result<Matrix> {
    let mut src = String::new();
    reader.read_to_string(&mut src)?;
    parse_matrix(&src)
}

pub fn read_vector(reader: &mut impl Read) -> Result<Vector> {
    let mut src = String::new();
    reader.read_to_string(&mut src)?;
    parse_vector(&src)
}

/// Shortest representation that parses back to the same f64.
///
/// Plain decimal for moderate magnitudes, exponent form otherwise, so very
/// large or small values do not expand into hundreds of digits.
pub fn format_value(v: f64) -> String {
    let mag = v.abs();
    if v == 0.0 || (1e-5..1e16).contains(&mag) || !v.is_finite() {
        format!("{v}")
    } else {
        format!("{v:e}")
    }
}

/// Write a matrix as text: header line, then one line per row.
pub fn write_matrix(writer: &mut impl Write, m: &Matrix) -> Result<()> {
    writeln!(writer, "{} {}", m.rows(), m.cols())?;
    for i in 0..m.rows() {
        let line: Vec<String> = m.row(i).iter().map(|&v| format_value(v)).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    Ok(())
}

/// Write a vector as text: length line, then one value per line.
pub fn write_vector(writer: &mut impl Write, v: &Vector) -> Result<()> {
    writeln!(writer, "{}", v.len())?;
    for &x in v.data() {
        writeln!(writer, "{}", format_value(x))?;
    }
    Ok(())
}
