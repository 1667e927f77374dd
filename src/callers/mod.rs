//! Normalization of caller-specific FORMAT fields.
//!
//! Each supported STR genotyper writes its own set of per-sample fields. The
//! adapters in this module turn them into a `NormalizedCall` so that filters
//! can be written once against `Field` values.

use enum_map::EnumMap;

use crate::{
    err::{ConfigurationError, MalformedRecordError},
    locus::{Allele, Genotype, Motif},
    vcf::{header, record::non_missing, Header, Record, RecordExt},
};

pub mod advntr;
pub mod eh;
pub mod gangstr;
pub mod hipstr;
pub mod popstr;

/// The supported STR genotypers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VcfType {
    /// HipSTR
    Hipstr,
    /// GangSTR
    Gangstr,
    /// adVNTR
    Advntr,
    /// ExpansionHunter
    Eh,
    /// popSTR
    Popstr,
}

impl VcfType {
    /// Guess the caller from the VCF header meta lines.
    pub fn guess(header: &Header) -> Result<Self, ConfigurationError> {
        let mut found = Vec::new();
        if header::has_meta_prefix(header, "command", "HipSTR") {
            found.push(VcfType::Hipstr);
        }
        if header::has_meta_prefix(header, "command", "GangSTR") {
            found.push(VcfType::Gangstr);
        }
        if header::has_meta_prefix(header, "source", "adVNTR") {
            found.push(VcfType::Advntr);
        }
        if header::has_meta_prefix(header, "source", "ExpansionHunter")
            || header::has_info(header, "REPID")
        {
            found.push(VcfType::Eh);
        }
        if header::has_meta_prefix(header, "command", "popSTR") {
            found.push(VcfType::Popstr);
        }

        match found.as_slice() {
            [vcf_type] => Ok(*vcf_type),
            [] => Err(ConfigurationError::UnknownVcfType(String::from(
                "no known caller signature",
            ))),
            _ => Err(ConfigurationError::UnknownVcfType(format!(
                "ambiguous caller signatures: {:?}",
                found
            ))),
        }
    }

    /// The static profile of this caller.
    pub fn profile(&self) -> &'static CallerProfile {
        match self {
            VcfType::Hipstr => &hipstr::PROFILE,
            VcfType::Gangstr => &gangstr::PROFILE,
            VcfType::Advntr => &advntr::PROFILE,
            VcfType::Eh => &eh::PROFILE,
            VcfType::Popstr => &popstr::PROFILE,
        }
    }
}

/// Caller-agnostic quality fields that filters may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, enum_map::Enum, strum::Display)]
pub enum Field {
    /// Read depth.
    #[strum(serialize = "DP")]
    Dp,
    /// Genotype posterior / quality score.
    #[strum(serialize = "Q")]
    Q,
    /// Fraction of reads with indels in the flanks.
    #[strum(serialize = "FLANKINDEL_RATIO")]
    FlankIndelRatio,
    /// Fraction of reads with stutter artifacts.
    #[strum(serialize = "STUTTER_RATIO")]
    StutterRatio,
    /// Supporting reads per called allele.
    #[strum(serialize = "ALLELE_SUPPORT")]
    AlleleSupport,
    /// Only spanning reads observed.
    #[strum(serialize = "SPAN_ONLY")]
    SpanOnly,
    /// Only spanning and bounded reads observed.
    #[strum(serialize = "SPANBOUND_ONLY")]
    SpanboundOnly,
    /// Maximum likelihood allele outside its confidence interval.
    #[strum(serialize = "BAD_CI")]
    BadCi,
    /// Probability of a heterozygous expansion.
    #[strum(serialize = "EXPANSION_PROB_HET")]
    ExpansionProbHet,
    /// Probability of a homozygous expansion.
    #[strum(serialize = "EXPANSION_PROB_HOM")]
    ExpansionProbHom,
    /// Total probability of an expansion.
    #[strum(serialize = "EXPANSION_PROB_TOTAL")]
    ExpansionProbTotal,
    /// Number of spanning reads.
    #[strum(serialize = "SR")]
    Spanning,
    /// Number of flanking reads.
    #[strum(serialize = "FR")]
    Flanking,
    /// Maximum likelihood score.
    #[strum(serialize = "ML")]
    Ml,
    /// Flanking reads per allele.
    #[strum(serialize = "ADFL")]
    Adfl,
    /// In-repeat reads per allele.
    #[strum(serialize = "ADIR")]
    Adir,
    /// Spanning reads per allele.
    #[strum(serialize = "ADSP")]
    Adsp,
    /// Locus coverage.
    #[strum(serialize = "LC")]
    Lc,
}

/// Value of a normalized field.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldValue {
    /// The active caller does not provide this field.
    #[default]
    NotApplicable,
    /// The caller provides the field but the call has no value.
    Missing,
    Value(f64),
    PerAllele(Vec<f64>),
    Flag(bool),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::NotApplicable => write!(f, "NA"),
            FieldValue::Missing => write!(f, "."),
            FieldValue::Value(value) => write!(f, "{}", value),
            FieldValue::PerAllele(values) => write!(
                f,
                "{}",
                values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            FieldValue::Flag(flag) => write!(f, "{}", if *flag { 1 } else { 0 }),
        }
    }
}

/// Normalized quality fields of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedCall {
    values: EnumMap<Field, FieldValue>,
}

impl NormalizedCall {
    /// Value of `field`.
    pub fn get(&self, field: Field) -> &FieldValue {
        &self.values[field]
    }

    /// Set value of `field`.
    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values[field] = value;
    }

    /// Builder-style variant of `set`.
    pub fn with(mut self, field: Field, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }
}

/// Static description of what a caller writes.
#[derive(Debug)]
pub struct CallerProfile {
    /// FORMAT keys that every record must list.
    pub mandatory_format: &'static [&'static str],
    /// Normalized fields the caller provides, with the FORMAT keys each is read from.
    pub fields: &'static [(Field, &'static [&'static str])],
    /// Whether alleles carry sequences (otherwise only lengths are known).
    pub sequence_alleles: bool,
}

impl CallerProfile {
    /// Whether the caller provides `field`.
    pub fn provides(&self, field: Field) -> bool {
        self.fields.iter().any(|(f, _)| *f == field)
    }

    /// FORMAT keys that `field` is computed from.
    pub fn source_keys(&self, field: Field) -> &'static [&'static str] {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, keys)| *keys)
            .unwrap_or_default()
    }

    /// The provided fields in output order.
    pub fn field_names(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().map(|(field, _)| *field)
    }
}

/// Caller options that are needed for normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerOptions {
    /// Read length for GangSTR allele support computation.
    pub gangstr_readlen: Option<u32>,
}

/// Adapter turning one caller's records into loci.
pub trait Caller: Send + Sync {
    /// The static caller profile.
    fn profile(&self) -> &'static CallerProfile;

    /// Extract the repeat motif of `record`.
    fn motif(&self, record: &Record) -> Result<Motif, MalformedRecordError>;

    /// Alleles of `record`, reference first.
    fn alleles(&self, record: &Record, motif: &Motif) -> Result<Vec<Allele>, MalformedRecordError> {
        record
            .alleles()
            .iter()
            .map(|sequence| Allele::from_sequence(sequence, motif.period))
            .collect()
    }

    /// Normalize the FORMAT fields of `sample`.
    fn normalize(
        &self,
        record: &Record,
        sample: usize,
        genotype: &Genotype,
        motif: &Motif,
    ) -> Result<NormalizedCall, MalformedRecordError>;
}

/// Construct the adapter for `vcf_type`.
pub fn build_caller(vcf_type: VcfType, options: &CallerOptions) -> Box<dyn Caller> {
    match vcf_type {
        VcfType::Hipstr => Box::new(hipstr::HipStr),
        VcfType::Gangstr => Box::new(gangstr::GangStr {
            readlen: options.gangstr_readlen,
        }),
        VcfType::Advntr => Box::new(advntr::AdVntr),
        VcfType::Eh => Box::new(eh::ExpansionHunter),
        VcfType::Popstr => Box::new(popstr::PopStr),
    }
}

fn invalid(field: &str, value: &str) -> MalformedRecordError {
    MalformedRecordError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Parse a number, `.` yields `None`.
pub(crate) fn parse_number(field: &str, raw: Option<&str>) -> Result<Option<f64>, MalformedRecordError> {
    match raw.and_then(non_missing) {
        None => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(field, value)),
    }
}

/// Parse a list of numbers separated by any of `separators`.
pub(crate) fn parse_numbers(
    field: &str,
    raw: Option<&str>,
    separators: &[char],
) -> Result<Option<Vec<f64>>, MalformedRecordError> {
    match raw.and_then(non_missing) {
        None => Ok(None),
        Some(value) => value
            .split(separators)
            .map(|token| token.parse::<f64>().map_err(|_| invalid(field, value)))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
    }
}

/// Read the numeric FORMAT `key` of `sample` as `FieldValue`.
pub(crate) fn format_number(
    record: &Record,
    sample: usize,
    key: &str,
) -> Result<FieldValue, MalformedRecordError> {
    Ok(
        match parse_number(
            &format!("FORMAT/{}", key),
            record.sample_value(sample, key).as_deref(),
        )? {
            Some(value) => FieldValue::Value(value),
            None => FieldValue::Missing,
        },
    )
}

/// Read the motif from the sequence in INFO `key`.
pub(crate) fn motif_from_info(record: &Record, key: &str) -> Result<Motif, MalformedRecordError> {
    let sequence = record.info_value(key);
    let sequence = sequence
        .as_deref()
        .and_then(non_missing)
        .ok_or_else(|| MalformedRecordError::MissingField(format!("INFO/{}", key)))?;
    Ok(Motif {
        period: sequence.len(),
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{Field, FieldValue, NormalizedCall, VcfType};
    use crate::vcf::{testing, Header};

    fn header(meta: &[&str]) -> Header {
        testing::header(&format!(
            "##fileformat=VCFv4.2\n{}\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n",
            meta.join("\n")
        ))
    }

    #[rstest::rstest]
    #[case(&["##command=HipSTR-v0.7 --bams x"], Some(VcfType::Hipstr))]
    #[case(&["##command=GangSTR --bam x"], Some(VcfType::Gangstr))]
    #[case(&["##source=adVNTR ver. 1.3.3"], Some(VcfType::Advntr))]
    #[case(&["##INFO=<ID=REPID,Number=1,Type=String,Description=\"x\">"], Some(VcfType::Eh))]
    #[case(&["##command=popSTR computePnSlippageDefault"], Some(VcfType::Popstr))]
    #[case(&["##source=other"], None)]
    #[case(&["##command=HipSTR", "##command=GangSTR"], None)]
    fn guess(#[case] meta: &[&str], #[case] expected: Option<VcfType>) {
        assert_eq!(VcfType::guess(&header(meta)).ok(), expected);
    }

    #[rstest::rstest]
    #[case(VcfType::Hipstr, "hipstr")]
    #[case(VcfType::Eh, "eh")]
    fn vcf_type_display(#[case] vcf_type: VcfType, #[case] expected: &str) {
        assert_eq!(vcf_type.to_string(), expected);
        assert_eq!(expected.parse::<VcfType>().unwrap(), vcf_type);
    }

    #[test]
    fn normalized_call_defaults_to_not_applicable() {
        let call = NormalizedCall::default().with(Field::Dp, FieldValue::Value(10.0));
        assert_eq!(call.get(Field::Dp), &FieldValue::Value(10.0));
        assert_eq!(call.get(Field::Q), &FieldValue::NotApplicable);
    }

    #[rstest::rstest]
    #[case(FieldValue::NotApplicable, "NA")]
    #[case(FieldValue::Missing, ".")]
    #[case(FieldValue::Value(0.35), "0.35")]
    #[case(FieldValue::Value(20.0), "20")]
    #[case(FieldValue::PerAllele(vec![3.0, 4.0]), "3,4")]
    #[case(FieldValue::Flag(true), "1")]
    fn field_value_display(#[case] value: FieldValue, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }

    #[test]
    fn profile_source_keys() {
        let profile = VcfType::Hipstr.profile();
        assert!(profile.provides(Field::StutterRatio));
        assert!(!profile.provides(Field::Ml));
        assert_eq!(profile.source_keys(Field::StutterRatio), &["DSTUTTER", "DP"]);
        assert!(profile.source_keys(Field::Ml).is_empty());
        assert_eq!(
            profile.field_names().collect::<Vec<_>>(),
            vec![
                Field::Dp,
                Field::Q,
                Field::FlankIndelRatio,
                Field::StutterRatio,
                Field::AlleleSupport
            ]
        );
    }

    #[test]
    fn parse_numbers() {
        assert_eq!(
            super::parse_numbers("X", Some("1,2|3"), &[',', '|']),
            Ok(Some(vec![1.0, 2.0, 3.0]))
        );
        assert_eq!(super::parse_numbers("X", Some("."), &[',']), Ok(None));
        assert!(super::parse_numbers("X", Some("1,a"), &[',']).is_err());
    }
}
