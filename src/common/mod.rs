//! Common functionality.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use flate2::bufread::MultiGzDecoder;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead + Send>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("could not open {:?} for reading: {}", path.as_ref(), e))?;
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let decoder = MultiGzDecoder::new(BufReader::new(file));
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Transparently open a file with a BGZF encoder for `.gz` paths.
pub fn open_write_maybe_gz<P>(path: P) -> Result<Box<dyn Write + Send>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())
        .map_err(|e| anyhow::anyhow!("could not open {:?} for writing: {}", path.as_ref(), e))?;
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as bgzf for writing", path.as_ref());
        Ok(Box::new(noodles_bgzf::Writer::new(BufWriter::new(file))))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path.as_ref());
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Canonicalize chromosome name by stripping a leading `chr` and mapping `M` to `MT`.
pub fn canonicalize(chrom: &str) -> String {
    let stripped = chrom
        .strip_prefix("chr")
        .or_else(|| chrom.strip_prefix("CHR"))
        .unwrap_or(chrom);
    if stripped == "M" {
        String::from("MT")
    } else {
        stripped.to_string()
    }
}

/// Format a floating point value with fixed precision, `nan` for NaN.
pub fn format_float(value: f64, precision: usize) -> String {
    if value.is_nan() {
        String::from("nan")
    } else {
        format!("{:.*}", precision, value)
    }
}

/// Format with `digits` significant digits the way Python's `{:.N}` does.
///
/// Fixed notation keeps at least one decimal; scientific notation is used for
/// exponents below -4 or from `digits - 1` on.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return String::from("nan");
    } else if value.is_infinite() {
        return String::from(if value > 0.0 { "inf" } else { "-inf" });
    }
    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exp) = match scientific
        .split_once('e')
        .and_then(|(mantissa, exp)| Some((mantissa, exp.parse::<i32>().ok()?)))
    {
        Some(parts) => parts,
        None => return scientific,
    };

    if exp < -4 || exp >= digits as i32 - 1 {
        format!(
            "{}e{}{:02}",
            trim_decimals(mantissa),
            if exp < 0 { '-' } else { '+' },
            exp.abs()
        )
    } else {
        let fixed = format!("{:.*}", (digits as i32 - 1 - exp) as usize, value);
        let fixed = trim_decimals(&fixed);
        if fixed.contains('.') {
            fixed.to_string()
        } else {
            format!("{}.0", fixed)
        }
    }
}

/// Strip trailing zeros after the decimal point, and the point itself.
fn trim_decimals(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Return the version of the `strfilter` crate and `x.y.z` in tests.
pub fn crate_version() -> &'static str {
    if cfg!(test) {
        "x.y.z"
    } else {
        env!("CARGO_PKG_VERSION")
    }
}
