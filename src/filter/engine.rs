//! Per-record evaluation of the filters.
//!
//! A record moves through `Unfiltered`, `LocusEvaluated` and `CallsEvaluated`
//! into `Finalized`, which holds everything the output writer needs.

use std::collections::BTreeMap;

use crate::{
    callers::Caller,
    err::MalformedRecordError,
    locus::Locus,
    regions::IntervalIndex,
    stats::{LocusStats, Stat},
    vcf::{Record, RecordExt},
};

use super::specs::{FilterSet, Verdict};

/// Decimals of the INFO annotations.
const INFO_PRECISION: usize = 4;

/// Tags collected for one locus or call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Failing filters in evaluation order.
    pub failed: Vec<String>,
    /// Locus filters whose statistic was not computable.
    pub not_computable: Vec<String>,
    /// Call filters whose field was missing or not applicable.
    pub skipped: Vec<String>,
}

impl FilterOutcome {
    fn record(&mut self, tag: &str, verdict: Verdict) {
        match verdict {
            Verdict::Pass => (),
            Verdict::Fail => self.failed.push(tag.to_string()),
            Verdict::NotComputable => self.not_computable.push(tag.to_string()),
            Verdict::Skipped => self.skipped.push(tag.to_string()),
        }
    }

    pub fn passed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Evaluation state of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    /// Missing genotype; call filters do not apply.
    NoCall,
    /// Not evaluated because the locus is dropped.
    NotEvaluated,
    Evaluated(FilterOutcome),
}

impl CallStatus {
    /// Value of the per-call `FILTER` annotation.
    pub fn label(&self) -> String {
        match self {
            CallStatus::NoCall => String::from("NOCALL"),
            CallStatus::NotEvaluated => String::from("."),
            CallStatus::Evaluated(outcome) if outcome.passed() => String::from("PASS"),
            CallStatus::Evaluated(outcome) => outcome.failed.join(","),
        }
    }

    pub fn failed(&self) -> bool {
        matches!(self, CallStatus::Evaluated(outcome) if !outcome.passed())
    }
}

/// Run-level counters; merging is a plain sum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub loci: usize,
    pub loci_passed: usize,
    /// Loci removed in drop-filtered mode.
    pub loci_dropped: usize,
    pub malformed: usize,
    pub calls_evaluated: usize,
    pub calls_failed: usize,
    pub calls_nocall: usize,
    pub locus_fail_counts: BTreeMap<String, usize>,
    pub call_fail_counts: BTreeMap<String, usize>,
}

impl Summary {
    pub fn merge(&mut self, other: Summary) {
        self.loci += other.loci;
        self.loci_passed += other.loci_passed;
        self.loci_dropped += other.loci_dropped;
        self.malformed += other.malformed;
        self.calls_evaluated += other.calls_evaluated;
        self.calls_failed += other.calls_failed;
        self.calls_nocall += other.calls_nocall;
        for (tag, count) in other.locus_fail_counts {
            *self.locus_fail_counts.entry(tag).or_default() += count;
        }
        for (tag, count) in other.call_fail_counts {
            *self.call_fail_counts.entry(tag).or_default() += count;
        }
    }
}

/// Record with its parsed locus.
#[derive(Debug)]
pub struct Unfiltered {
    record: Record,
    locus: Locus,
}

/// Locus filters have been applied.
#[derive(Debug)]
pub struct LocusEvaluated {
    record: Record,
    locus: Locus,
    stats: LocusStats,
    outcome: FilterOutcome,
}

/// Call filters have been applied.
#[derive(Debug)]
pub struct CallsEvaluated {
    record: Record,
    locus: Locus,
    stats: LocusStats,
    outcome: FilterOutcome,
    calls: Vec<CallStatus>,
}

/// Fully evaluated record.
#[derive(Debug, Clone)]
pub struct Finalized {
    /// Output record, `None` if dropped.
    pub record: Option<Record>,
    pub locus: Locus,
    pub stats: LocusStats,
    pub outcome: FilterOutcome,
    /// Status per call in sample order.
    pub calls: Vec<CallStatus>,
}

impl Unfiltered {
    pub fn new(record: Record, caller: &dyn Caller) -> Result<Self, MalformedRecordError> {
        let locus = Locus::from_record(&record, caller)?;
        Ok(Self { record, locus })
    }

    pub fn evaluate_locus(
        self,
        filters: &FilterSet,
        regions: &IntervalIndex,
        use_length: bool,
    ) -> LocusEvaluated {
        let stats = LocusStats::compute(&self.locus.genotype_keys(use_length));
        let mut outcome = FilterOutcome::default();
        for filter in &filters.locus {
            outcome.record(&filter.tag, filter.evaluate(&self.locus, &stats, regions));
        }
        LocusEvaluated {
            record: self.record,
            locus: self.locus,
            stats,
            outcome,
        }
    }
}

impl LocusEvaluated {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }

    /// Apply the call filters; with `skip` all called genotypes stay unevaluated.
    pub fn evaluate_calls(self, filters: &FilterSet, skip: bool) -> CallsEvaluated {
        let calls = self
            .locus
            .calls
            .iter()
            .map(|call| {
                if call.genotype.is_missing() {
                    CallStatus::NoCall
                } else if skip {
                    CallStatus::NotEvaluated
                } else {
                    let mut outcome = FilterOutcome::default();
                    for filter in &filters.call {
                        outcome.record(&filter.tag, filter.evaluate(call.fields.get(filter.field)));
                    }
                    CallStatus::Evaluated(outcome)
                }
            })
            .collect();
        CallsEvaluated {
            record: self.record,
            locus: self.locus,
            stats: self.stats,
            outcome: self.outcome,
            calls,
        }
    }
}

fn info_value(stat: Stat) -> String {
    stat.format(INFO_PRECISION, ".")
}

impl CallsEvaluated {
    /// Rewrite the record for output.
    ///
    /// When dropping filtered entities, failing loci are removed and failing
    /// calls get a missing genotype; otherwise the record is annotated.
    pub fn finalize(self, drop_filtered: bool) -> Result<Finalized, MalformedRecordError> {
        let CallsEvaluated {
            mut record,
            locus,
            stats,
            outcome,
            calls,
        } = self;

        let record = if drop_filtered {
            if outcome.passed() {
                let missing = locus
                    .calls
                    .iter()
                    .zip(calls.iter())
                    .filter(|(_, status)| status.failed())
                    .map(|(call, _)| (call.sample, call.genotype.to_missing().to_string()))
                    .collect::<Vec<_>>();
                if !missing.is_empty() {
                    record.set_sample_values("GT", &missing)?;
                }
                record.set_filters(&[]);
                Some(record)
            } else {
                None
            }
        } else {
            record.set_filters(&outcome.failed);
            record.set_info("CALLRATE", &info_value(stats.call_rate))?;
            record.set_info("HET", &info_value(stats.het))?;
            record.set_info("HWEP", &info_value(stats.hwep))?;
            let labels = locus
                .calls
                .iter()
                .zip(calls.iter())
                .map(|(call, status)| (call.sample, status.label()))
                .collect::<Vec<_>>();
            record.set_sample_values("FILTER", &labels)?;
            Some(record)
        };

        Ok(Finalized {
            record,
            locus,
            stats,
            outcome,
            calls,
        })
    }
}

impl Finalized {
    /// Counters contributed by this record.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            loci: 1,
            loci_passed: self.outcome.passed() as usize,
            loci_dropped: self.record.is_none() as usize,
            ..Default::default()
        };
        for tag in &self.outcome.failed {
            *summary.locus_fail_counts.entry(tag.clone()).or_default() += 1;
        }
        for status in &self.calls {
            match status {
                CallStatus::NoCall => summary.calls_nocall += 1,
                CallStatus::NotEvaluated => (),
                CallStatus::Evaluated(outcome) => {
                    summary.calls_evaluated += 1;
                    if !outcome.passed() {
                        summary.calls_failed += 1;
                    }
                    for tag in &outcome.failed {
                        *summary.call_fail_counts.entry(tag.clone()).or_default() += 1;
                    }
                }
            }
        }
        summary
    }
}

/// Shared read-only state for evaluating records.
pub struct Engine {
    filters: FilterSet,
    regions: IntervalIndex,
    caller: Box<dyn Caller>,
    use_length: bool,
    drop_filtered: bool,
}

impl Engine {
    /// Construct the engine; alleles are compared by length if `use_length` is
    /// set or the caller only reports lengths.
    pub fn new(
        filters: FilterSet,
        regions: IntervalIndex,
        caller: Box<dyn Caller>,
        use_length: bool,
        drop_filtered: bool,
    ) -> Self {
        let use_length = use_length || !caller.profile().sequence_alleles;
        Self {
            filters,
            regions,
            caller,
            use_length,
            drop_filtered,
        }
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn caller(&self) -> &dyn Caller {
        self.caller.as_ref()
    }

    /// Evaluate one record; malformed records are counted and yield `None`.
    pub fn process(&self, record: Result<Record, MalformedRecordError>) -> (Option<Finalized>, Summary) {
        let malformed = |location: &str, e: MalformedRecordError| {
            tracing::warn!("skipping malformed record {}: {}", location, e);
            (
                None,
                Summary {
                    malformed: 1,
                    ..Default::default()
                },
            )
        };
        let record = match record {
            Ok(record) => record,
            Err(e) => return malformed("line", e),
        };
        let location = format!("{}:{}", record.chrom(), record.pos());
        let unfiltered = match Unfiltered::new(record, self.caller.as_ref()) {
            Ok(unfiltered) => unfiltered,
            Err(e) => return malformed(&location, e),
        };

        let locus_evaluated =
            unfiltered.evaluate_locus(&self.filters, &self.regions, self.use_length);
        let skip_calls = self.drop_filtered && !locus_evaluated.passed();
        let finalized = match locus_evaluated
            .evaluate_calls(&self.filters, skip_calls)
            .finalize(self.drop_filtered)
        {
            Ok(finalized) => finalized,
            Err(e) => return malformed(&location, e),
        };
        let summary = finalized.summary();
        (Some(finalized), summary)
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::{CallStatus, Engine, FilterOutcome, Finalized, Summary};
    use crate::{
        callers::{build_caller, CallerOptions, VcfType},
        filter::{
            conf::{FilterConfig, RegionMode},
            specs::FilterSet,
        },
        regions::{IntervalIndex, Region},
        vcf::{parse_record, testing, RecordExt},
    };

    const HIPSTR_HEADER: &str = "##fileformat=VCFv4.2\n\
        ##command=HipSTR-v0.6.2\n\
        ##INFO=<ID=PERIOD,Number=1,Type=Integer,Description=\"Period\">\n\
        ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
        ##FORMAT=<ID=Q,Number=1,Type=Float,Description=\"Quality\">\n\
        ##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
        ##FORMAT=<ID=DSTUTTER,Number=1,Type=Integer,Description=\"Stutter reads\">\n\
        ##FORMAT=<ID=DFLANKINDEL,Number=1,Type=Integer,Description=\"Flank indel reads\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\tS3\n";

    const HIPSTR: &str = "1\t1000\t.\tACACACACAC\tACACACACACAC\t.\t.\tPERIOD=2\t\
        GT:Q:DP:DSTUTTER:DFLANKINDEL\t0/1:0.95:20:7:0\t0/0:0.99:10:0:0\t./.:.:.:.:.";

    fn engine_for(vcf_type: VcfType, config: FilterConfig, regions: IntervalIndex) -> Engine {
        let filters = FilterSet::from_config(&config, vcf_type).unwrap();
        Engine::new(
            filters,
            regions,
            build_caller(
                vcf_type,
                &CallerOptions {
                    gangstr_readlen: config.gangstr_readlen,
                },
            ),
            config.use_length,
            config.drop_filtered,
        )
    }

    fn engine(config: FilterConfig) -> Engine {
        engine_for(VcfType::Hipstr, config, IntervalIndex::default())
    }

    fn process(engine: &Engine, header: &str, line: &str) -> (Option<Finalized>, Summary) {
        let header = testing::header(header);
        engine.process(parse_record(line.as_bytes(), &header))
    }

    /// Per-call `FILTER` labels of a processed record.
    fn labels(finalized: &Finalized) -> Vec<String> {
        finalized.calls.iter().map(|status| status.label()).collect()
    }

    fn stutter_config(drop_filtered: bool) -> FilterConfig {
        FilterConfig {
            hipstr_max_call_stutter: Some(0.3),
            drop_filtered,
            ..Default::default()
        }
    }

    #[test]
    fn stutter_fails_call() {
        let (finalized, summary) = process(&engine(stutter_config(false)), HIPSTR_HEADER, HIPSTR);
        let finalized = finalized.unwrap();

        assert_eq!(
            finalized.calls[0],
            CallStatus::Evaluated(FilterOutcome {
                failed: vec![String::from("hipstr-max-call-stutter")],
                ..Default::default()
            })
        );
        assert_eq!(finalized.calls[1].label(), "PASS");
        assert_eq!(finalized.calls[2], CallStatus::NoCall);

        let record = finalized.record.unwrap();
        assert_eq!(record.filters().map(|f| f.to_string()).as_deref(), Some("PASS"));
        assert_eq!(
            record.sample_value(0, "FILTER").as_deref(),
            Some("hipstr-max-call-stutter")
        );
        assert_eq!(record.sample_value(1, "FILTER").as_deref(), Some("PASS"));
        assert_eq!(record.sample_value(2, "FILTER").as_deref(), Some("NOCALL"));
        assert_eq!(record.info_value("CALLRATE").as_deref(), Some("0.6667"));
        assert_eq!(record.info_value("HET").as_deref(), Some("0.5000"));

        assert_eq!(summary.calls_evaluated, 2);
        assert_eq!(summary.calls_failed, 1);
        assert_eq!(summary.calls_nocall, 1);
        assert_eq!(summary.call_fail_counts["hipstr-max-call-stutter"], 1);
    }

    #[test]
    fn stutter_drop_filtered() {
        let (finalized, _) = process(&engine(stutter_config(true)), HIPSTR_HEADER, HIPSTR);
        let record = finalized.unwrap().record.unwrap();

        assert_eq!(record.sample_value(0, "GT").as_deref(), Some("./."));
        assert_eq!(record.sample_value(1, "GT").as_deref(), Some("0/0"));
        assert_eq!(record.sample_value(2, "GT").as_deref(), Some("./."));
        assert_eq!(record.sample_value(0, "DP").as_deref(), Some("20"));
        assert!(!record.has_format("FILTER"));
        assert_eq!(record.info_value("CALLRATE"), None);
        assert_eq!(record.filters().map(|f| f.to_string()).as_deref(), Some("PASS"));
    }

    #[rstest::rstest]
    #[case(false)]
    #[case(true)]
    fn locus_filter(#[case] drop_filtered: bool) {
        let config = FilterConfig {
            min_locus_callrate: Some(0.8),
            hipstr_max_call_stutter: Some(0.3),
            drop_filtered,
            ..Default::default()
        };
        let (finalized, summary) = process(&engine(config), HIPSTR_HEADER, HIPSTR);
        let finalized = finalized.unwrap();

        assert_eq!(finalized.outcome.failed, vec![String::from("min-locus-callrate")]);
        assert_eq!(summary.locus_fail_counts["min-locus-callrate"], 1);
        if drop_filtered {
            assert!(finalized.record.is_none());
            assert_eq!(finalized.calls[0], CallStatus::NotEvaluated);
            assert_eq!(summary.loci_dropped, 1);
        } else {
            let record = finalized.record.unwrap();
            assert_eq!(
                record.filters().map(|f| f.to_string()).as_deref(),
                Some("min-locus-callrate")
            );
            assert!(finalized.calls[0].failed());
            assert_eq!(summary.loci_dropped, 0);
        }
    }

    #[test]
    fn single_allele_is_not_computable() {
        let config = FilterConfig {
            min_locus_het: Some(0.1),
            min_locus_hwep: Some(0.05),
            ..Default::default()
        };
        let line = HIPSTR.replace("0/1:", "0/0:");
        let (finalized, _) = process(&engine(config), HIPSTR_HEADER, &line);
        let finalized = finalized.unwrap();

        assert!(finalized.outcome.passed());
        assert_eq!(
            finalized.outcome.not_computable,
            vec![String::from("min-locus-hwep"), String::from("min-locus-het")]
        );
        let record = finalized.record.unwrap();
        assert_eq!(record.info_value("HET").as_deref(), Some("."));
        assert_eq!(record.info_value("HWEP").as_deref(), Some("."));
    }

    #[rstest::rstest]
    #[case(HIPSTR.replace("PERIOD=2", "."))]
    #[case(HIPSTR.replace("\t1000\t", "\tpos\t"))]
    #[case(HIPSTR.replace("0/0:0.99", "0/2:0.99"))]
    fn malformed_record_is_counted(#[case] line: String) {
        let (finalized, summary) = process(&engine(FilterConfig::default()), HIPSTR_HEADER, &line);
        assert!(finalized.is_none());
        assert_eq!(
            summary,
            Summary {
                malformed: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn summary_merge() {
        let engine = engine(stutter_config(false));
        let mut total = Summary::default();
        for _ in 0..2 {
            let (_, summary) = process(&engine, HIPSTR_HEADER, HIPSTR);
            total.merge(summary);
        }
        assert_eq!(total.loci, 2);
        assert_eq!(total.loci_passed, 2);
        assert_eq!(total.call_fail_counts["hipstr-max-call-stutter"], 2);
    }

    #[rstest::rstest]
    #[case(5, "AAAAATGCTG", true)]
    #[case(6, "ACGTTTTTTG", true)]
    #[case(6, "ACGTTTTTGA", false)]
    #[case(5, "ACGTTACGTT", false)]
    #[case(2, "AAAAAAAAAA", false)]
    fn homopolymer_run(#[case] period: usize, #[case] reference: &str, #[case] fails: bool) {
        let config = FilterConfig {
            filter_hrun: true,
            ..Default::default()
        };
        let line = format!(
            "1\t1000\t.\t{}\t{}A\t.\t.\tPERIOD={}\tGT:Q:DP:DSTUTTER:DFLANKINDEL\t\
             0/1:0.95:20:7:0\t0/0:0.99:10:0:0\t./.:.:.:.:.",
            reference, reference, period
        );
        let (finalized, summary) = process(&engine(config), HIPSTR_HEADER, &line);

        let expected = if fails {
            vec![String::from("filter-hrun")]
        } else {
            Vec::new()
        };
        assert_eq!(finalized.unwrap().outcome.failed, expected);
        assert_eq!(summary.loci_passed, !fails as usize);
    }

    #[rstest::rstest]
    #[case(1000, &[])]
    #[case(5000, &["TARGETS"])]
    fn region_include(#[case] pos: u64, #[case] expected: &[&str]) {
        let config = FilterConfig {
            filter_regions: vec![PathBuf::from("targets.bed")],
            filter_regions_names: vec![String::from("TARGETS")],
            filter_regions_mode: RegionMode::Include,
            ..Default::default()
        };
        let mut sets = IndexMap::new();
        sets.insert(
            String::from("TARGETS"),
            vec![Region {
                chrom: String::from("chr1"),
                start: 900,
                end: 1100,
            }],
        );
        let engine = engine_for(VcfType::Hipstr, config, IntervalIndex::load(sets).unwrap());
        let line = HIPSTR.replacen("\t1000\t", &format!("\t{}\t", pos), 1);
        let (finalized, _) = process(&engine, HIPSTR_HEADER, &line);

        assert_eq!(finalized.unwrap().outcome.failed, expected);
    }

    #[test]
    fn gangstr_read_class_and_confidence_flags() {
        let header = "##fileformat=VCFv4.2\n\
            ##command=GangSTR --bam x\n\
            ##INFO=<ID=RU,Number=1,Type=String,Description=\"Repeat unit\">\n\
            ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
            ##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
            ##FORMAT=<ID=Q,Number=1,Type=Float,Description=\"Quality\">\n\
            ##FORMAT=<ID=REPCN,Number=2,Type=Integer,Description=\"Copy numbers\">\n\
            ##FORMAT=<ID=REPCI,Number=1,Type=String,Description=\"Confidence intervals\">\n\
            ##FORMAT=<ID=RC,Number=1,Type=String,Description=\"Read class counts\">\n\
            ##FORMAT=<ID=ENCLREADS,Number=1,Type=String,Description=\"Enclosing reads\">\n\
            ##FORMAT=<ID=FLNKREADS,Number=1,Type=String,Description=\"Flanking reads\">\n\
            ##FORMAT=<ID=QEXP,Number=3,Type=Float,Description=\"Expansion probabilities\">\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\tS3\n";
        let line = "1\t5000\t.\tCAGCAGCAG\tCAGCAGCAGCAG\t.\t.\tRU=CAG\t\
            GT:DP:Q:REPCN:REPCI:RC:ENCLREADS:FLNKREADS:QEXP\t\
            0/1:30:0.9:3,4:3-3,4-5:10,5,0,2:3,6|4,4:NULL:0.8,0.15,0.05\t\
            1/1:12:0.4:4,4:2-3,4-4:0,7,0,0:NULL:4,2|5,1:0.1,0.2,0.7\t\
            0/1:20:0.8:3,4:3-3,4-4:0,3,0,2:NULL:NULL:0.9,0.05,0.05";
        let config = FilterConfig {
            gangstr_filter_span_only: true,
            gangstr_filter_spanbound_only: true,
            gangstr_filter_bad_ci: true,
            ..Default::default()
        };
        let engine = engine_for(VcfType::Gangstr, config, IntervalIndex::default());
        let (finalized, summary) = process(&engine, header, line);

        assert_eq!(
            labels(&finalized.unwrap()),
            vec![
                "PASS",
                "gangstr-filter-span-only,gangstr-filter-spanbound-only,gangstr-filter-badCI",
                "gangstr-filter-spanbound-only",
            ]
        );
        assert_eq!(summary.call_fail_counts["gangstr-filter-spanbound-only"], 2);
        assert_eq!(summary.call_fail_counts["gangstr-filter-badCI"], 1);
    }

    #[test]
    fn eh_per_allele_support() {
        let header = "##fileformat=VCFv4.2\n\
            ##source=ExpansionHunter v3.2.2\n\
            ##INFO=<ID=END,Number=1,Type=Integer,Description=\"End\">\n\
            ##INFO=<ID=REF,Number=1,Type=Integer,Description=\"Reference copy number\">\n\
            ##INFO=<ID=RU,Number=1,Type=String,Description=\"Repeat unit\">\n\
            ##INFO=<ID=REPID,Number=1,Type=String,Description=\"Repeat identifier\">\n\
            ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
            ##FORMAT=<ID=SO,Number=1,Type=String,Description=\"Read support type\">\n\
            ##FORMAT=<ID=REPCN,Number=1,Type=String,Description=\"Copy numbers\">\n\
            ##FORMAT=<ID=REPCI,Number=1,Type=String,Description=\"Confidence intervals\">\n\
            ##FORMAT=<ID=ADSP,Number=1,Type=String,Description=\"Spanning reads\">\n\
            ##FORMAT=<ID=ADFL,Number=1,Type=String,Description=\"Flanking reads\">\n\
            ##FORMAT=<ID=ADIR,Number=1,Type=String,Description=\"In-repeat reads\">\n\
            ##FORMAT=<ID=LC,Number=1,Type=Float,Description=\"Locus coverage\">\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\tS3\n";
        let line = "chrX\t147912050\t.\tC\t<STR31>\t.\tPASS\tEND=147912110;REF=20;RU=CGG;REPID=FMR1\t\
            GT:SO:REPCN:REPCI:ADSP:ADFL:ADIR:LC\t\
            0/1:SPANNING/FLANKING:20/31:20-20/28-34:12/3:10/8:0/0:25.3\t\
            ./.:.:.:.:./.:.:.:.\t\
            1/1:SPANNING/SPANNING:31/31:28-34/28-34:./.:9/9:2/2:20.1";
        let config = FilterConfig {
            eh_min_adfl: Some(8),
            eh_min_adir: Some(1),
            eh_min_adsp: Some(5),
            ..Default::default()
        };
        let engine = engine_for(VcfType::Eh, config, IntervalIndex::default());
        let (finalized, _) = process(&engine, header, line);
        let finalized = finalized.unwrap();

        assert_eq!(
            labels(&finalized),
            vec!["eh-min-ADIR,eh-min-ADSP", "NOCALL", "PASS"]
        );
        assert_eq!(
            finalized.calls[2],
            CallStatus::Evaluated(FilterOutcome {
                skipped: vec![String::from("eh-min-ADSP")],
                ..Default::default()
            })
        );
    }

    #[test]
    fn popstr_depth_and_support() {
        let header = "##fileformat=VCFv4.2\n\
            ##command=popSTR computePnSlippageDefault\n\
            ##INFO=<ID=Motif,Number=1,Type=String,Description=\"Repeat motif\">\n\
            ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
            ##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
            ##FORMAT=<ID=AD,Number=.,Type=Integer,Description=\"Reads per allele\">\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\tS3\n";
        let line = "chr1\t700\t.\tTTTTTTTT\tTTTTTTTTT,TTTTTTT\t.\t.\tMotif=T\t\
            GT:DP:AD\t0/2:17:9,1,7\t1/1:4:0,4,0\t./.:.:.";
        let config = FilterConfig {
            popstr_min_call_dp: Some(10),
            popstr_require_support: Some(5),
            ..Default::default()
        };
        let engine = engine_for(VcfType::Popstr, config, IntervalIndex::default());
        let (finalized, summary) = process(&engine, header, line);

        assert_eq!(
            labels(&finalized.unwrap()),
            vec!["PASS", "popstr-min-call-DP,popstr-require-support", "NOCALL"]
        );
        assert_eq!(summary.calls_failed, 1);
    }

    #[test]
    fn advntr_depth_and_likelihood() {
        let header = "##fileformat=VCFv4.2\n\
            ##source=adVNTR ver. 1.3.3\n\
            ##INFO=<ID=END,Number=1,Type=Integer,Description=\"End\">\n\
            ##INFO=<ID=RU,Number=1,Type=String,Description=\"Repeat unit\">\n\
            ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
            ##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
            ##FORMAT=<ID=SR,Number=1,Type=Integer,Description=\"Spanning reads\">\n\
            ##FORMAT=<ID=FR,Number=1,Type=Integer,Description=\"Flanking reads\">\n\
            ##FORMAT=<ID=ML,Number=1,Type=Float,Description=\"Maximum likelihood\">\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n";
        let line = "chr2\t300\t.\tGGCCTTGGCCTT\tGGCCTT\t.\t.\tEND=311;RU=GGCCTT\t\
            GT:DP:SR:FR:ML\t0/1:25:10:12:0.93\t0/0:19:9:8:0.88";
        let config = FilterConfig {
            advntr_min_call_dp: Some(20),
            advntr_min_ml: Some(0.9),
            ..Default::default()
        };
        let engine = engine_for(VcfType::Advntr, config, IntervalIndex::default());
        let (finalized, _) = process(&engine, header, line);

        assert_eq!(
            labels(&finalized.unwrap()),
            vec!["PASS", "advntr-min-call-DP,advntr-min-ML"]
        );
    }
}
