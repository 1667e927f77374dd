//! Error types shared by the sub commands.

use crate::callers::VcfType;

/// Problems with the filter configuration.
///
/// These are raised while setting up a run and abort it before any record
/// is processed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("filter {filter} is not supported for caller {caller}")]
    UnsupportedFilterForCaller { filter: String, caller: VcfType },
    #[error("malformed region in set {name}: {chrom}:{start}-{end} (end < start)")]
    MalformedRegion {
        name: String,
        chrom: String,
        start: u64,
        end: u64,
    },
    #[error("threshold for {option} out of range: {value} ({reason})")]
    ThresholdOutOfRange {
        option: String,
        value: f64,
        reason: String,
    },
    #[error("invalid option combination: {0}")]
    InconsistentOptions(String),
    #[error("could not infer VCF type from header: {0}")]
    UnknownVcfType(String),
    #[error("filter {filter} reads FORMAT/{key} which the VCF header does not declare")]
    UndeclaredFormat { filter: String, key: String },
}

/// Problems with a single VCF record.
///
/// The affected record is skipped and counted; the run continues.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecordError {
    #[error("missing mandatory field {0}")]
    MissingField(String),
    #[error("invalid value {value:?} for field {field}")]
    InvalidValue { field: String, value: String },
    #[error("invalid genotype {0:?}")]
    InvalidGenotype(String),
    #[error("genotype references allele {index} but record has {count} alleles")]
    AlleleOutOfRange { index: usize, count: usize },
    #[error("invalid allele {0:?}")]
    InvalidAllele(String),
    #[error("record is not valid UTF-8: {0}")]
    Encoding(String),
    #[error("could not parse record: {0}")]
    Unparsable(String),
}
