//! Writing of the filtered VCF and the locus and sample logs.

use std::io::Write;

use itertools::Itertools;

use crate::{
    callers::{CallerProfile, Field},
    common::{crate_version, open_write_maybe_gz},
    stats::Stat,
    vcf::{
        header::{add_filter, add_float_info, add_meta, add_string_format},
        Header,
    },
};

use super::{
    conf::FilterConfig,
    engine::{CallStatus, Finalized, Summary},
    specs::FilterSet,
};

/// Decimals of the statistics in the locus log.
const LOG_PRECISION: usize = 4;

/// Output paths derived from the `--out` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub vcf: String,
    pub loclog: String,
    pub samplog: String,
}

impl OutputPaths {
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            vcf: format!("{}.vcf", prefix),
            loclog: format!("{}.loclog.tab", prefix),
            samplog: format!("{}.samplog.tab", prefix),
        }
    }
}

/// Build the output header from the input header.
pub fn build_output_header(
    input: &Header,
    filters: &FilterSet,
    config: &FilterConfig,
) -> Result<Header, anyhow::Error> {
    let mut header = input.clone();
    for filter in &filters.locus {
        add_filter(&mut header, &filter.tag, &filter.description());
    }
    if !config.drop_filtered {
        for (id, description) in [
            ("CALLRATE", "Fraction of samples with a call"),
            ("HET", "Observed heterozygosity"),
            ("HWEP", "Hardy-Weinberg equilibrium p-value"),
        ] {
            add_float_info(&mut header, id, description)?;
        }
        add_string_format(
            &mut header,
            "FILTER",
            "Call-level filter: PASS, NOCALL or the failing filter tags",
        )?;
    }
    add_meta(
        &mut header,
        "strfilterCommand",
        &format!(
            "version={};config={}",
            crate_version(),
            serde_json::to_string(config)?
        ),
    )?;
    Ok(header)
}

/// One row of the locus log.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
struct LocusLogRow<'a> {
    chrom: &'a str,
    pos: u64,
    end: u64,
    num_called: usize,
    callrate: String,
    het: String,
    hwep: String,
    filters: String,
    not_computable: String,
}

/// Join tags, `empty` if there are none.
fn join_tags(tags: &[String], empty: &str) -> String {
    if tags.is_empty() {
        empty.to_string()
    } else {
        tags.iter().join(",")
    }
}

fn log_stat(stat: Stat) -> String {
    stat.format(LOG_PRECISION, "NA")
}

type TsvWriter = csv::Writer<Box<dyn Write + Send>>;

fn tsv_writer(path: &str) -> Result<TsvWriter, anyhow::Error> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(
            open_write_maybe_gz(path)
                .map_err(|e| anyhow::anyhow!("Cannot open {:?} for writing: {:?}", path, e))?,
        ))
}

/// Writes the output VCF and, unless dropping filtered entities, both logs.
pub struct OutputWriter {
    vcf: noodles_vcf::Writer<Box<dyn Write + Send>>,
    header: Header,
    loclog: Option<TsvWriter>,
    samplog: Option<TsvWriter>,
    samples: Vec<String>,
    fields: Vec<Field>,
}

impl OutputWriter {
    pub fn new(
        paths: &OutputPaths,
        header: &Header,
        profile: &'static CallerProfile,
        drop_filtered: bool,
    ) -> Result<Self, anyhow::Error> {
        let mut vcf = noodles_vcf::Writer::new(
            open_write_maybe_gz(&paths.vcf)
                .map_err(|e| anyhow::anyhow!("Cannot open {:?} for writing: {:?}", &paths.vcf, e))?,
        );
        vcf.write_header(header)?;

        let (loclog, samplog) = if drop_filtered {
            (None, None)
        } else {
            let mut loclog = tsv_writer(&paths.loclog)?;
            loclog.write_record([
                "chrom",
                "pos",
                "end",
                "num_called",
                "callrate",
                "het",
                "hwep",
                "filters",
                "not_computable",
            ])?;
            let mut samplog = tsv_writer(&paths.samplog)?;
            samplog.write_record(
                ["chrom", "pos", "sample", "genotype"]
                    .into_iter()
                    .map(String::from)
                    .chain(profile.field_names().map(|f| f.to_string()))
                    .chain(["filters", "skipped"].into_iter().map(String::from)),
            )?;
            (Some(loclog), Some(samplog))
        };

        Ok(Self {
            vcf,
            loclog,
            samplog,
            header: header.clone(),
            samples: header.sample_names().iter().cloned().collect(),
            fields: profile.field_names().collect(),
        })
    }

    /// Write the output of one record.
    pub fn write(&mut self, finalized: &Finalized) -> Result<(), anyhow::Error> {
        if let Some(record) = &finalized.record {
            self.vcf.write_record(&self.header, record)?;
        }

        let locus = &finalized.locus;
        if let Some(loclog) = self.loclog.as_mut() {
            loclog.serialize(LocusLogRow {
                chrom: &locus.chrom,
                pos: locus.pos,
                end: locus.end,
                num_called: finalized.stats.num_called,
                callrate: log_stat(finalized.stats.call_rate),
                het: log_stat(finalized.stats.het),
                hwep: log_stat(finalized.stats.hwep),
                filters: join_tags(&finalized.outcome.failed, "PASS"),
                not_computable: join_tags(&finalized.outcome.not_computable, "."),
            })?;
        }

        if let Some(samplog) = self.samplog.as_mut() {
            for (call, status) in locus.calls.iter().zip(finalized.calls.iter()) {
                let skipped = match status {
                    CallStatus::Evaluated(outcome) => join_tags(&outcome.skipped, "."),
                    _ => String::from("."),
                };
                let sample = self
                    .samples
                    .get(call.sample)
                    .map(|s| s.as_str())
                    .unwrap_or_default();
                samplog.write_record(
                    [
                        locus.chrom.clone(),
                        locus.pos.to_string(),
                        sample.to_string(),
                        call.genotype.to_string(),
                    ]
                    .into_iter()
                    .chain(self.fields.iter().map(|f| call.fields.get(*f).to_string()))
                    .chain([status.label(), skipped]),
                )?;
            }
        }

        Ok(())
    }

    /// Flush all outputs and append the run summary to the locus log.
    pub fn finish(self, summary: &Summary, filters: &FilterSet) -> Result<(), anyhow::Error> {
        let mut vcf = self.vcf;
        vcf.get_mut().flush()?;
        // Dropping a BGZF writer appends the EOF block.
        drop(vcf);
        if let Some(mut samplog) = self.samplog {
            samplog.flush()?;
        }
        if let Some(loclog) = self.loclog {
            let mut inner = loclog
                .into_inner()
                .map_err(|e| anyhow::anyhow!("problem flushing locus log: {}", e))?;
            for (key, value) in [
                ("loci", summary.loci),
                ("loci_passed", summary.loci_passed),
                ("malformed", summary.malformed),
                ("calls_evaluated", summary.calls_evaluated),
                ("calls_failed", summary.calls_failed),
                ("calls_nocall", summary.calls_nocall),
            ] {
                writeln!(inner, "#{}\t{}", key, value)?;
            }
            for tag in filters.locus_tags() {
                let count = summary.locus_fail_counts.get(tag).copied().unwrap_or_default();
                writeln!(inner, "#locus_filter:{}\t{}", tag, count)?;
            }
            for tag in filters.call_tags() {
                let count = summary.call_fail_counts.get(tag).copied().unwrap_or_default();
                writeln!(inner, "#call_filter:{}\t{}", tag, count)?;
            }
            inner.flush()?;
        }
        Ok(())
    }
}
