//! Filter definitions as ordered lists of tagged predicates.

use crate::{
    callers::{Field, FieldValue, VcfType},
    err::ConfigurationError,
    locus::Locus,
    regions::IntervalIndex,
    stats::{LocusStats, Stat},
    vcf::{header::has_format, Header},
};

use super::conf::{FilterConfig, RegionMode};

/// Outcome of evaluating one filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    /// The locus statistic could not be computed; counts as pass.
    NotComputable,
    /// The call field is missing or not applicable; counts as pass.
    Skipped,
}

/// Lower or upper bound on a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Min(f64),
    Max(f64),
}

impl Bound {
    fn passes(&self, value: f64) -> bool {
        match self {
            Bound::Min(min) => value >= *min,
            Bound::Max(max) => value <= *max,
        }
    }

    fn check(&self, stat: Stat) -> Verdict {
        match stat {
            Stat::NotComputable => Verdict::NotComputable,
            Stat::Value(value) if self.passes(value) => Verdict::Pass,
            Stat::Value(_) => Verdict::Fail,
        }
    }
}

/// What a locus filter checks.
#[derive(Debug, Clone, PartialEq)]
pub enum LocusCheck {
    CallRate(Bound),
    Hwep(Bound),
    Het(Bound),
    /// Membership in the region set `name`.
    Region { name: String, mode: RegionMode },
    /// Penta- and hexanucleotide loci with a reference homopolymer run at least
    /// as long as the period.
    Hrun,
}

/// A tagged locus-level filter.
#[derive(Debug, Clone, PartialEq)]
pub struct LocusFilter {
    pub tag: String,
    pub check: LocusCheck,
}

impl LocusFilter {
    pub fn evaluate(&self, locus: &Locus, stats: &LocusStats, regions: &IntervalIndex) -> Verdict {
        match &self.check {
            LocusCheck::CallRate(bound) => bound.check(stats.call_rate),
            LocusCheck::Hwep(bound) => bound.check(stats.hwep),
            LocusCheck::Het(bound) => bound.check(stats.het),
            LocusCheck::Region { name, mode } => {
                let overlaps = regions.contains(name, &locus.chrom, locus.pos.saturating_sub(1));
                match (mode, overlaps) {
                    (RegionMode::Exclude, true) | (RegionMode::Include, false) => Verdict::Fail,
                    _ => Verdict::Pass,
                }
            }
            LocusCheck::Hrun => {
                let period = locus.motif.period;
                if (period == 5 || period == 6) && locus.reference_homopolymer_run() >= period {
                    Verdict::Fail
                } else {
                    Verdict::Pass
                }
            }
        }
    }

    /// Description for the `##FILTER` header line.
    pub fn description(&self) -> String {
        let bound = |what: &str, bound: &Bound| match bound {
            Bound::Min(min) => format!("{} below {}", what, min),
            Bound::Max(max) => format!("{} above {}", what, max),
        };
        match &self.check {
            LocusCheck::CallRate(b) => bound("Locus call rate", b),
            LocusCheck::Hwep(b) => bound("Locus HWE p-value", b),
            LocusCheck::Het(b) => bound("Locus heterozygosity", b),
            LocusCheck::Region { name, mode } => match mode {
                RegionMode::Exclude => format!("Locus overlaps region set {}", name),
                RegionMode::Include => format!("Locus outside region set {}", name),
            },
            LocusCheck::Hrun => String::from(
                "Penta- or hexanucleotide locus with reference homopolymer run of at least the period",
            ),
        }
    }
}

/// Predicate on a normalized call field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    Min(f64),
    Max(f64),
    /// Every called allele must reach the value.
    MinEachAllele(f64),
    /// Fail if the flag is set.
    FailIfSet,
}

/// A tagged call-level filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFilter {
    pub tag: String,
    pub caller: VcfType,
    pub field: Field,
    pub predicate: Predicate,
}

impl CallFilter {
    pub fn evaluate(&self, value: &FieldValue) -> Verdict {
        let passes = match (self.predicate, value) {
            (Predicate::Min(min), FieldValue::Value(value)) => *value >= min,
            (Predicate::Max(max), FieldValue::Value(value)) => *value <= max,
            (Predicate::MinEachAllele(min), FieldValue::PerAllele(values)) => {
                values.iter().all(|v| *v >= min)
            }
            (Predicate::FailIfSet, FieldValue::Flag(flag)) => !flag,
            _ => return Verdict::Skipped,
        };
        if passes {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

/// The configured filters in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub locus: Vec<LocusFilter>,
    pub call: Vec<CallFilter>,
}

/// Collects filters in declared order.
struct Builder {
    result: FilterSet,
}

impl Builder {
    fn locus(&mut self, tag: &str, value: Option<f64>, check: impl Fn(Bound) -> LocusCheck, min: bool) {
        if let Some(value) = value {
            let bound = if min { Bound::Min(value) } else { Bound::Max(value) };
            self.result.locus.push(LocusFilter {
                tag: tag.to_string(),
                check: check(bound),
            });
        }
    }

    fn call(&mut self, tag: &str, caller: VcfType, field: Field, predicate: Option<Predicate>) {
        if let Some(predicate) = predicate {
            self.result.call.push(CallFilter {
                tag: tag.to_string(),
                caller,
                field,
                predicate,
            });
        }
    }
}

fn min(value: Option<impl Into<f64>>) -> Option<Predicate> {
    value.map(|v| Predicate::Min(v.into()))
}

fn max(value: Option<impl Into<f64>>) -> Option<Predicate> {
    value.map(|v| Predicate::Max(v.into()))
}

fn min_each(value: Option<u32>) -> Option<Predicate> {
    value.map(|v| Predicate::MinEachAllele(v.into()))
}

fn flag(value: bool) -> Option<Predicate> {
    value.then_some(Predicate::FailIfSet)
}

impl FilterSet {
    /// Build the filters of `config` for caller `vcf_type`.
    ///
    /// Filters owned by another caller, or reading a field `vcf_type` does not
    /// provide, are rejected.
    pub fn from_config(config: &FilterConfig, vcf_type: VcfType) -> Result<Self, ConfigurationError> {
        use Field::*;
        use VcfType::*;

        let mut builder = Builder {
            result: FilterSet::default(),
        };

        builder.locus("min-locus-callrate", config.min_locus_callrate, LocusCheck::CallRate, true);
        builder.locus("max-locus-callrate", config.max_locus_callrate, LocusCheck::CallRate, false);
        builder.locus("min-locus-hwep", config.min_locus_hwep, LocusCheck::Hwep, true);
        builder.locus("max-locus-hwep", config.max_locus_hwep, LocusCheck::Hwep, false);
        builder.locus("min-locus-het", config.min_locus_het, LocusCheck::Het, true);
        builder.locus("max-locus-het", config.max_locus_het, LocusCheck::Het, false);
        for name in config.region_names() {
            builder.result.locus.push(LocusFilter {
                tag: name.clone(),
                check: LocusCheck::Region {
                    name,
                    mode: config.filter_regions_mode,
                },
            });
        }
        if config.filter_hrun {
            if vcf_type != Hipstr {
                return Err(ConfigurationError::UnsupportedFilterForCaller {
                    filter: String::from("filter-hrun"),
                    caller: vcf_type,
                });
            }
            builder.result.locus.push(LocusFilter {
                tag: String::from("filter-hrun"),
                check: LocusCheck::Hrun,
            });
        }

        let call_filters = [
            ("hipstr-max-call-flank-indel", Hipstr, FlankIndelRatio, max(config.hipstr_max_call_flank_indel)),
            ("hipstr-max-call-stutter", Hipstr, StutterRatio, max(config.hipstr_max_call_stutter)),
            ("hipstr-min-supp-reads", Hipstr, AlleleSupport, min_each(config.hipstr_min_supp_reads)),
            ("hipstr-min-call-DP", Hipstr, Dp, min(config.hipstr_min_call_dp)),
            ("hipstr-max-call-DP", Hipstr, Dp, max(config.hipstr_max_call_dp)),
            ("hipstr-min-call-Q", Hipstr, Q, min(config.hipstr_min_call_q)),
            ("gangstr-min-call-DP", Gangstr, Dp, min(config.gangstr_min_call_dp)),
            ("gangstr-max-call-DP", Gangstr, Dp, max(config.gangstr_max_call_dp)),
            ("gangstr-min-call-Q", Gangstr, Q, min(config.gangstr_min_call_q)),
            ("gangstr-expansion-prob-het", Gangstr, ExpansionProbHet, min(config.gangstr_expansion_prob_het)),
            ("gangstr-expansion-prob-hom", Gangstr, ExpansionProbHom, min(config.gangstr_expansion_prob_hom)),
            ("gangstr-expansion-prob-total", Gangstr, ExpansionProbTotal, min(config.gangstr_expansion_prob_total)),
            ("gangstr-filter-span-only", Gangstr, SpanOnly, flag(config.gangstr_filter_span_only)),
            ("gangstr-filter-spanbound-only", Gangstr, SpanboundOnly, flag(config.gangstr_filter_spanbound_only)),
            ("gangstr-filter-badCI", Gangstr, BadCi, flag(config.gangstr_filter_bad_ci)),
            ("gangstr-require-support", Gangstr, AlleleSupport, min_each(config.gangstr_require_support)),
            ("advntr-min-call-DP", Advntr, Dp, min(config.advntr_min_call_dp)),
            ("advntr-max-call-DP", Advntr, Dp, max(config.advntr_max_call_dp)),
            ("advntr-min-spanning", Advntr, Spanning, min(config.advntr_min_spanning)),
            ("advntr-min-flanking", Advntr, Flanking, min(config.advntr_min_flanking)),
            ("advntr-min-ML", Advntr, Ml, min(config.advntr_min_ml)),
            ("eh-min-ADFL", Eh, Adfl, min_each(config.eh_min_adfl)),
            ("eh-min-ADIR", Eh, Adir, min_each(config.eh_min_adir)),
            ("eh-min-ADSP", Eh, Adsp, min_each(config.eh_min_adsp)),
            ("eh-min-call-LC", Eh, Lc, min(config.eh_min_call_lc)),
            ("popstr-min-call-DP", Popstr, Dp, min(config.popstr_min_call_dp)),
            ("popstr-max-call-DP", Popstr, Dp, max(config.popstr_max_call_dp)),
            ("popstr-require-support", Popstr, AlleleSupport, min_each(config.popstr_require_support)),
        ];
        for (tag, caller, field, predicate) in call_filters {
            builder.call(tag, caller, field, predicate);
        }

        if config.gangstr_readlen.is_some() && vcf_type != Gangstr {
            return Err(ConfigurationError::UnsupportedFilterForCaller {
                filter: String::from("gangstr-readlen"),
                caller: vcf_type,
            });
        }
        let profile = vcf_type.profile();
        if let Some(filter) = builder
            .result
            .call
            .iter()
            .find(|f| f.caller != vcf_type || !profile.provides(f.field))
        {
            return Err(ConfigurationError::UnsupportedFilterForCaller {
                filter: filter.tag.clone(),
                caller: vcf_type,
            });
        }

        Ok(builder.result)
    }

    /// Check that `header` declares every FORMAT key the call filters read.
    pub fn check_header(&self, header: &Header, vcf_type: VcfType) -> Result<(), ConfigurationError> {
        let profile = vcf_type.profile();
        for filter in &self.call {
            if let Some(key) = profile
                .source_keys(filter.field)
                .iter()
                .find(|key| !has_format(header, key))
            {
                return Err(ConfigurationError::UndeclaredFormat {
                    filter: filter.tag.clone(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Tags of all locus filters in order.
    pub fn locus_tags(&self) -> impl Iterator<Item = &str> {
        self.locus.iter().map(|f| f.tag.as_str())
    }

    /// Tags of all call filters in order.
    pub fn call_tags(&self) -> impl Iterator<Item = &str> {
        self.call.iter().map(|f| f.tag.as_str())
    }
}
