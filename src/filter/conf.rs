//! Filter configuration from the command line or a JSON file.

use std::path::PathBuf;

use crate::err::ConfigurationError;

/// How a region set restricts loci.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RegionMode {
    /// Fail loci overlapping a region of the set.
    #[default]
    Exclude,
    /// Fail loci not overlapping any region of the set.
    Include,
}

/// Thresholds and flags of all filters.
///
/// Unset options disable the corresponding filter.
#[derive(Debug, Default, Clone, PartialEq, clap::Args, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterConfig {
    /// Minimal call rate of a locus.
    #[clap(long)]
    pub min_locus_callrate: Option<f64>,
    /// Maximal call rate of a locus.
    #[clap(long)]
    pub max_locus_callrate: Option<f64>,
    /// Minimal HWE p-value of a locus.
    #[clap(long)]
    pub min_locus_hwep: Option<f64>,
    /// Maximal HWE p-value of a locus.
    #[clap(long)]
    pub max_locus_hwep: Option<f64>,
    /// Minimal observed heterozygosity of a locus.
    #[clap(long)]
    pub min_locus_het: Option<f64>,
    /// Maximal observed heterozygosity of a locus.
    #[clap(long)]
    pub max_locus_het: Option<f64>,
    /// Compare alleles by length rather than sequence for locus statistics.
    #[clap(long)]
    pub use_length: bool,
    /// BED files with region sets, comma separated.
    #[clap(long, value_delimiter = ',')]
    pub filter_regions: Vec<PathBuf>,
    /// Names of the region sets, comma separated; also used as filter tags.
    #[clap(long, value_delimiter = ',')]
    pub filter_regions_names: Vec<String>,
    /// Whether region sets exclude or include loci.
    #[clap(long, value_enum, default_value_t = RegionMode::Exclude)]
    pub filter_regions_mode: RegionMode,
    /// Fail penta- and hexanucleotide loci with a long reference homopolymer run (HipSTR).
    #[clap(long)]
    pub filter_hrun: bool,
    /// Remove failing loci and set failing calls to missing instead of annotating.
    #[clap(long)]
    pub drop_filtered: bool,

    /// Maximal fraction of reads with flank indels.
    #[clap(long)]
    pub hipstr_max_call_flank_indel: Option<f64>,
    /// Maximal fraction of reads with stutter artifacts.
    #[clap(long)]
    pub hipstr_max_call_stutter: Option<f64>,
    /// Minimal number of reads supporting each called allele.
    #[clap(long)]
    pub hipstr_min_supp_reads: Option<u32>,
    #[clap(long = "hipstr-min-call-DP")]
    #[serde(rename = "hipstr-min-call-DP")]
    pub hipstr_min_call_dp: Option<u32>,
    #[clap(long = "hipstr-max-call-DP")]
    #[serde(rename = "hipstr-max-call-DP")]
    pub hipstr_max_call_dp: Option<u32>,
    #[clap(long = "hipstr-min-call-Q")]
    #[serde(rename = "hipstr-min-call-Q")]
    pub hipstr_min_call_q: Option<f64>,

    #[clap(long = "gangstr-min-call-DP")]
    #[serde(rename = "gangstr-min-call-DP")]
    pub gangstr_min_call_dp: Option<u32>,
    #[clap(long = "gangstr-max-call-DP")]
    #[serde(rename = "gangstr-max-call-DP")]
    pub gangstr_max_call_dp: Option<u32>,
    #[clap(long = "gangstr-min-call-Q")]
    #[serde(rename = "gangstr-min-call-Q")]
    pub gangstr_min_call_q: Option<f64>,
    /// Minimal probability of a heterozygous expansion.
    #[clap(long)]
    pub gangstr_expansion_prob_het: Option<f64>,
    /// Minimal probability of a homozygous expansion.
    #[clap(long)]
    pub gangstr_expansion_prob_hom: Option<f64>,
    /// Minimal total probability of an expansion.
    #[clap(long)]
    pub gangstr_expansion_prob_total: Option<f64>,
    /// Fail calls supported only by spanning reads.
    #[clap(long)]
    pub gangstr_filter_span_only: bool,
    /// Fail calls supported only by spanning and bounded reads.
    #[clap(long)]
    pub gangstr_filter_spanbound_only: bool,
    /// Fail calls whose maximum likelihood allele is outside its confidence interval.
    #[clap(long = "gangstr-filter-badCI")]
    #[serde(rename = "gangstr-filter-badCI")]
    pub gangstr_filter_bad_ci: bool,
    /// Minimal number of reads supporting each called allele; needs the read length.
    #[clap(long)]
    pub gangstr_require_support: Option<u32>,
    /// Read length used for GangSTR allele support.
    #[clap(long)]
    pub gangstr_readlen: Option<u32>,

    #[clap(long = "advntr-min-call-DP")]
    #[serde(rename = "advntr-min-call-DP")]
    pub advntr_min_call_dp: Option<u32>,
    #[clap(long = "advntr-max-call-DP")]
    #[serde(rename = "advntr-max-call-DP")]
    pub advntr_max_call_dp: Option<u32>,
    /// Minimal number of spanning reads.
    #[clap(long)]
    pub advntr_min_spanning: Option<u32>,
    /// Minimal number of flanking reads.
    #[clap(long)]
    pub advntr_min_flanking: Option<u32>,
    /// Minimal maximum likelihood score.
    #[clap(long = "advntr-min-ML")]
    #[serde(rename = "advntr-min-ML")]
    pub advntr_min_ml: Option<f64>,

    /// Minimal flanking reads per allele (unverified).
    #[clap(long = "eh-min-ADFL")]
    #[serde(rename = "eh-min-ADFL")]
    pub eh_min_adfl: Option<u32>,
    /// Minimal in-repeat reads per allele (unverified).
    #[clap(long = "eh-min-ADIR")]
    #[serde(rename = "eh-min-ADIR")]
    pub eh_min_adir: Option<u32>,
    /// Minimal spanning reads per allele (unverified).
    #[clap(long = "eh-min-ADSP")]
    #[serde(rename = "eh-min-ADSP")]
    pub eh_min_adsp: Option<u32>,
    /// Minimal locus coverage (unverified).
    #[clap(long = "eh-min-call-LC")]
    #[serde(rename = "eh-min-call-LC")]
    pub eh_min_call_lc: Option<f64>,

    #[clap(long = "popstr-min-call-DP")]
    #[serde(rename = "popstr-min-call-DP")]
    pub popstr_min_call_dp: Option<u32>,
    #[clap(long = "popstr-max-call-DP")]
    #[serde(rename = "popstr-max-call-DP")]
    pub popstr_max_call_dp: Option<u32>,
    /// Minimal number of reads supporting each called allele.
    #[clap(long)]
    pub popstr_require_support: Option<u32>,
}

/// Tags reserved for per-call annotation.
const RESERVED_TAGS: &[&str] = &["PASS", "NOCALL"];

fn check_fraction(option: &str, value: Option<f64>) -> Result<(), ConfigurationError> {
    match value {
        Some(value) if !(0.0..=1.0).contains(&value) => {
            Err(ConfigurationError::ThresholdOutOfRange {
                option: option.to_string(),
                value,
                reason: String::from("must be in [0, 1]"),
            })
        }
        _ => Ok(()),
    }
}

fn check_non_negative(option: &str, value: Option<f64>) -> Result<(), ConfigurationError> {
    match value {
        Some(value) if value.is_nan() || value < 0.0 => {
            Err(ConfigurationError::ThresholdOutOfRange {
                option: option.to_string(),
                value,
                reason: String::from("must be non-negative"),
            })
        }
        _ => Ok(()),
    }
}

fn check_order<T: PartialOrd + Into<f64> + Copy>(
    min_option: &str,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), ConfigurationError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(ConfigurationError::ThresholdOutOfRange {
            option: min_option.to_string(),
            value: min.into(),
            reason: format!("exceeds maximum {}", max.into()),
        }),
        _ => Ok(()),
    }
}

impl FilterConfig {
    /// Load configuration from a JSON file.
    pub fn load_json(path: &std::path::Path) -> Result<Self, anyhow::Error> {
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open config {:?}: {}", path, e))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("could not parse config {:?}: {}", path, e))
    }

    /// Names of the region sets, `FILTER_REGION<i>` unless given.
    pub fn region_names(&self) -> Vec<String> {
        if self.filter_regions_names.is_empty() {
            (0..self.filter_regions.len())
                .map(|i| format!("FILTER_REGION{}", i))
                .collect()
        } else {
            self.filter_regions_names.clone()
        }
    }

    /// Check value ranges and option combinations.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (option, value) in [
            ("min-locus-callrate", self.min_locus_callrate),
            ("max-locus-callrate", self.max_locus_callrate),
            ("min-locus-hwep", self.min_locus_hwep),
            ("max-locus-hwep", self.max_locus_hwep),
            ("min-locus-het", self.min_locus_het),
            ("max-locus-het", self.max_locus_het),
            ("hipstr-max-call-flank-indel", self.hipstr_max_call_flank_indel),
            ("hipstr-max-call-stutter", self.hipstr_max_call_stutter),
            ("hipstr-min-call-Q", self.hipstr_min_call_q),
            ("gangstr-min-call-Q", self.gangstr_min_call_q),
            ("gangstr-expansion-prob-het", self.gangstr_expansion_prob_het),
            ("gangstr-expansion-prob-hom", self.gangstr_expansion_prob_hom),
            ("gangstr-expansion-prob-total", self.gangstr_expansion_prob_total),
            ("advntr-min-ML", self.advntr_min_ml),
        ] {
            check_fraction(option, value)?;
        }
        check_non_negative("eh-min-call-LC", self.eh_min_call_lc)?;

        check_order("min-locus-callrate", self.min_locus_callrate, self.max_locus_callrate)?;
        check_order("min-locus-hwep", self.min_locus_hwep, self.max_locus_hwep)?;
        check_order("min-locus-het", self.min_locus_het, self.max_locus_het)?;
        check_order("hipstr-min-call-DP", self.hipstr_min_call_dp, self.hipstr_max_call_dp)?;
        check_order("gangstr-min-call-DP", self.gangstr_min_call_dp, self.gangstr_max_call_dp)?;
        check_order("advntr-min-call-DP", self.advntr_min_call_dp, self.advntr_max_call_dp)?;
        check_order("popstr-min-call-DP", self.popstr_min_call_dp, self.popstr_max_call_dp)?;

        if self.gangstr_require_support.is_some() && self.gangstr_readlen.is_none() {
            return Err(ConfigurationError::InconsistentOptions(String::from(
                "gangstr-require-support requires gangstr-readlen",
            )));
        }
        if self.gangstr_readlen == Some(0) {
            return Err(ConfigurationError::ThresholdOutOfRange {
                option: String::from("gangstr-readlen"),
                value: 0.0,
                reason: String::from("must be positive"),
            });
        }

        if !self.filter_regions_names.is_empty()
            && self.filter_regions_names.len() != self.filter_regions.len()
        {
            return Err(ConfigurationError::InconsistentOptions(format!(
                "{} region names given for {} region files",
                self.filter_regions_names.len(),
                self.filter_regions.len()
            )));
        }
        let names = self.region_names();
        for (i, name) in names.iter().enumerate() {
            if name.is_empty()
                || name.contains(|c: char| c.is_whitespace() || c == ';' || c == ',')
                || RESERVED_TAGS.contains(&name.as_str())
            {
                return Err(ConfigurationError::InconsistentOptions(format!(
                    "invalid region set name {:?}",
                    name
                )));
            }
            if names[..i].contains(name) {
                return Err(ConfigurationError::InconsistentOptions(format!(
                    "duplicate region set name {:?}",
                    name
                )));
            }
        }

        Ok(())
    }
}
