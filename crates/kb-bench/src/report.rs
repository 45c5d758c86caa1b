use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use kb_io::FileFormat;
use kb_tensor::Matrix;

use crate::cli::Op;

pub const CSV_HEADER: &str = "op,m,n,k,threads,seconds,gflops,speedup,efficiency,format";

/// Problem dimensions as reported in the CSV columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dims {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub len: usize,
}

impl Dims {
    pub fn matmul(m: usize, n: usize, k: usize) -> Self {
        Dims { m, n, k, len: 0 }
    }

    pub fn matvec(m: usize, n: usize) -> Self {
        Dims { m, n, k: 0, len: 0 }
    }

    pub fn vector(len: usize) -> Self {
        Dims { len, ..Dims::default() }
    }
}

/// Floating-point operation count of one kernel call.
pub fn flops(op: Op, dims: Dims) -> f64 {
    match op {
        Op::Mm => 2.0 * dims.m as f64 * dims.n as f64 * dims.k as f64,
        Op::Mv => 2.0 * dims.m as f64 * dims.n as f64,
        Op::Dot | Op::Axpy => 2.0 * dims.len as f64,
        Op::All => 0.0,
    }
}

/// Throughput in GFLOP/s; 0 when the elapsed time is not positive.
pub fn gflops(op: Op, dims: Dims, seconds: f64) -> f64 {
    if seconds <= 0.0 {
        return 0.0;
    }
    flops(op, dims) / 1e9 / seconds
}

/// time(1 worker) / time(N workers); 0 when the parallel time is not positive.
pub fn speedup(seconds_one: f64, seconds_many: f64) -> f64 {
    if seconds_many > 0.0 {
        seconds_one / seconds_many
    } else {
        0.0
    }
}

/// Parallel efficiency in percent.
pub fn efficiency(speedup: f64, workers: usize) -> f64 {
    if workers > 0 {
        100.0 * speedup / workers as f64
    } else {
        0.0
    }
}

/// Human-readable sample of a kernel's output.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Matrix(Matrix),
    Vector(Vec<f64>),
    Dot { one: f64, many: f64 },
    Axpy { alpha: f64, y: Vec<f64> },
}

/// Timing results for one op.
#[derive(Debug, Clone, PartialEq)]
pub struct OpReport {
    pub op: Op,
    pub dims: Dims,
    pub workers: usize,
    pub seconds_one: f64,
    pub seconds_many: f64,
    pub preview: Preview,
}

/// One CSV result line.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub op: Op,
    pub dims: Dims,
    pub threads: usize,
    pub seconds: f64,
    pub gflops: f64,
    pub speedup: f64,
    pub efficiency: f64,
    pub format: FileFormat,
}

impl fmt::Display for CsvRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{:.9},{:.6},{:.4},{:.2},{}",
            self.op,
            self.dims.m,
            self.dims.n,
            self.dims.k,
            self.threads,
            self.seconds,
            self.gflops,
            self.speedup,
            self.efficiency,
            self.format
        )
    }
}

impl OpReport {
    /// Baseline row (1 worker, speedup 1, efficiency 100) and parallel row.
    pub fn csv_rows(&self, format: FileFormat) -> [CsvRow; 2] {
        let sp = speedup(self.seconds_one, self.seconds_many);
        [
            CsvRow {
                op: self.op,
                dims: self.dims,
                threads: 1,
                seconds: self.seconds_one,
                gflops: gflops(self.op, self.dims, self.seconds_one),
                speedup: 1.0,
                efficiency: 100.0,
                format,
            },
            CsvRow {
                op: self.op,
                dims: self.dims,
                threads: self.workers,
                seconds: self.seconds_many,
                gflops: gflops(self.op, self.dims, self.seconds_many),
                speedup: sp,
                efficiency: efficiency(sp, self.workers),
                format,
            },
        ]
    }
}

/// Format like C's `%.6g`: six significant digits, trailing zeros trimmed,
/// exponent form for very small or large magnitudes.
pub fn fmt_g(v: f64) -> String {
    const PRECISION: i32 = 6;
    if v == 0.0 || !v.is_finite() {
        return format!("{v}");
    }
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, v);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{v:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `[a, b, c, ...]` with at most `max` values.
pub fn vector_preview(values: &[f64], max: usize) -> String {
    let shown: Vec<String> = values.iter().take(max).map(|&v| fmt_g(v)).collect();
    let more = if values.len() > max { ", ..." } else { "" };
    format!("[{}{}]", shown.join(", "), more)
}

/// Top-left `max_rows` x `max_cols` corner, one bracketed line per row.
pub fn matrix_preview(m: &Matrix, max_rows: usize, max_cols: usize) -> Vec<String> {
    let mut lines: Vec<String> = (0..m.rows().min(max_rows))
        .map(|i| vector_preview(m.row(i), max_cols))
        .collect();
    if m.rows() > max_rows {
        lines.push("...".to_string());
    }
    lines
}

/// Writes results to a console stream and optionally appends CSV rows to
/// a file.
pub struct Reporter<W: Write> {
    out: W,
    format: FileFormat,
    csv: Option<std::fs::File>,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: FileFormat) -> Self {
        Reporter {
            out,
            format,
            csv: None,
        }
    }

    /// Append rows to `path` as well, writing the header if the file is new
    /// or empty.
    pub fn with_csv_file(mut self, path: &Path) -> io::Result<Self> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{CSV_HEADER}")?;
        }
        self.csv = Some(file);
        Ok(self)
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    pub fn skipped(&mut self, op: Op, needs: &str) -> io::Result<()> {
        writeln!(self.out, "\n[{op}] Skipped: need {needs}")
    }

    pub fn report(&mut self, report: &OpReport) -> io::Result<()> {
        writeln!(self.out, "\n[{}] Results:", report.op)?;
        writeln!(self.out, "{CSV_HEADER}")?;
        for row in report.csv_rows(self.format) {
            writeln!(self.out, "{row}")?;
            if let Some(csv) = self.csv.as_mut() {
                writeln!(csv, "{row}")?;
            }
        }

        match &report.preview {
            Preview::Matrix(c) => {
                writeln!(self.out, "C preview (top-left):")?;
                for line in matrix_preview(c, 4, 4) {
                    writeln!(self.out, "{line}")?;
                }
            }
            Preview::Vector(y) => {
                writeln!(self.out, "y preview:")?;
                writeln!(self.out, "{}", vector_preview(y, 10))?;
            }
            Preview::Dot { one, many } => {
                writeln!(self.out, "dot = {one} (1t), {many} ({}t)", report.workers)?;
            }
            Preview::Axpy { alpha, y } => {
                writeln!(self.out, "alpha={}, y preview:", fmt_g(*alpha))?;
                writeln!(self.out, "{}", vector_preview(y, 10))?;
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flop_counts() {
        assert_eq!(flops(Op::Mm, Dims::matmul(2, 3, 4)), 48.0);
        assert_eq!(flops(Op::Mv, Dims::matvec(10, 5)), 100.0);
        assert_eq!(flops(Op::Dot, Dims::vector(7)), 14.0);
        assert_eq!(flops(Op::Axpy, Dims::vector(7)), 14.0);
    }

    #[test]
    fn test_gflops_speedup_efficiency() {
        assert_relative_eq!(gflops(Op::Mm, Dims::matmul(1000, 1000, 1000), 2.0), 1.0);
        assert_eq!(gflops(Op::Dot, Dims::vector(10), 0.0), 0.0);
        assert_relative_eq!(speedup(4.0, 1.0), 4.0);
        assert_eq!(speedup(4.0, 0.0), 0.0);
        assert_relative_eq!(efficiency(3.0, 4), 75.0);
    }

    #[test]
    fn test_fmt_g() {
        assert_eq!(fmt_g(58.0), "58");
        assert_eq!(fmt_g(0.5), "0.5");
        assert_eq!(fmt_g(1.0 / 3.0), "0.333333");
        assert_eq!(fmt_g(123456789.0), "1.23457e+08");
        assert_eq!(fmt_g(0.00001234), "1.234e-05");
        assert_eq!(fmt_g(-2.5), "-2.5");
        assert_eq!(fmt_g(0.0), "0");
    }

    #[test]
    fn test_previews() {
        assert_eq!(vector_preview(&[1.0, 2.0, 3.0], 10), "[1, 2, 3]");
        assert_eq!(vector_preview(&[1.0, 2.0, 3.0], 2), "[1, 2, ...]");
        let m = Matrix::new(5, 2, (0..10).map(f64::from).collect()).unwrap();
        let lines = matrix_preview(&m, 4, 4);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "[0, 1]");
        assert_eq!(lines[4], "...");
    }

    #[test]
    fn test_csv_rows() {
        let report = OpReport {
            op: Op::Dot,
            dims: Dims::vector(1_000_000),
            workers: 4,
            seconds_one: 0.4,
            seconds_many: 0.2,
            preview: Preview::Dot { one: 1.0, many: 1.0 },
        };
        let [base, par] = report.csv_rows(FileFormat::Binary);
        assert_eq!(base.to_string(), "dot,0,0,0,1,0.400000000,0.005000,1.0000,100.00,bin");
        assert_eq!(par.to_string(), "dot,0,0,0,4,0.200000000,0.010000,2.0000,50.00,bin");
        assert_relative_eq!(par.gflops, 0.01);
    }

    #[test]
    fn test_reporter_writes_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let report = OpReport {
            op: Op::Axpy,
            dims: Dims::vector(3),
            workers: 2,
            seconds_one: 1.0,
            seconds_many: 1.0,
            preview: Preview::Axpy {
                alpha: 2.0,
                y: vec![3.0, 3.0, 3.0],
            },
        };
        for _ in 0..2 {
            let mut reporter = Reporter::new(Vec::new(), FileFormat::Text)
                .with_csv_file(&path)
                .unwrap();
            reporter.report(&report).unwrap();
            let console = String::from_utf8(reporter.into_inner()).unwrap();
            assert!(console.contains("alpha=2, y preview:\n[3, 3, 3]\n"));
        }
        let csv = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("axpy,0,0,0,1,"));
    }
}
