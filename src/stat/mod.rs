//! Implementation of the `stats` sub command.
//!
//! Writes one row of per-locus statistics for each record, optionally split
//! into named sample groups.

use std::{io::Write, time::Instant};

use itertools::Itertools;
use thousands::Separable;

use crate::{
    callers::{build_caller, CallerOptions, VcfType},
    common::{canonicalize, format_significant, open_read_maybe_gz, open_write_maybe_gz},
    locus::{AlleleKey, Locus},
    stats::{self, LengthFreqs, Stat},
    vcf,
};

/// Command line arguments for `stats` sub command.
#[derive(Debug, Default, clap::Parser)]
#[command(author, version, about = "Compute per-locus STR statistics", long_about = None)]
pub struct Args {
    /// Path to the input VCF file, optionally gzip compressed.
    #[clap(long)]
    pub vcf: String,
    /// Prefix of the output file, `stdout` to write to standard output.
    #[clap(long)]
    pub out: String,
    /// The caller that produced the VCF, inferred from the header if not given.
    #[clap(long, value_enum)]
    pub vcftype: Option<VcfType>,
    /// Comma-separated files with one sample name per line; one group per file.
    #[clap(long)]
    pub samples: Option<String>,
    /// Comma-separated names of the sample groups, `1,2,...` by default.
    #[clap(long)]
    pub sample_prefixes: Option<String>,
    /// Restrict to loci starting in `chrom:start-end` (1-based, inclusive).
    #[clap(long)]
    pub region: Option<String>,
    /// Number of significant digits for floating point output.
    #[clap(long, default_value_t = 3)]
    pub precision: usize,

    /// Maximal called allele length.
    #[clap(long)]
    pub thresh: bool,
    /// Allele frequencies.
    #[clap(long)]
    pub afreq: bool,
    /// Allele counts.
    #[clap(long)]
    pub acount: bool,
    /// HWE p-value of a binomial test on the number of homozygotes.
    #[clap(long)]
    pub hwep: bool,
    /// Expected heterozygosity.
    #[clap(long)]
    pub het: bool,
    /// Entropy of the allele distribution in bits.
    #[clap(long)]
    pub entropy: bool,
    /// Mean allele length.
    #[clap(long)]
    pub mean: bool,
    /// Most frequent allele length.
    #[clap(long)]
    pub mode: bool,
    /// Variance of the allele length.
    #[clap(long)]
    pub var: bool,
    /// Number of called samples.
    #[clap(long)]
    pub numcalled: bool,
    /// Collapse alleles by length; implied for callers reporting only lengths.
    #[clap(long)]
    pub use_length: bool,
}

/// The statistics that can be selected, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
enum Column {
    Thresh,
    Afreq,
    Acount,
    Hwep,
    Het,
    Entropy,
    Mean,
    Mode,
    Var,
    Numcalled,
}

impl Args {
    fn columns(&self) -> Vec<Column> {
        [
            (self.thresh, Column::Thresh),
            (self.afreq, Column::Afreq),
            (self.acount, Column::Acount),
            (self.hwep, Column::Hwep),
            (self.het, Column::Het),
            (self.entropy, Column::Entropy),
            (self.mean, Column::Mean),
            (self.mode, Column::Mode),
            (self.var, Column::Var),
            (self.numcalled, Column::Numcalled),
        ]
        .into_iter()
        .filter_map(|(selected, column)| selected.then_some(column))
        .collect()
    }
}

/// A `chrom:start-end` region with 1-based inclusive coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Region {
    chrom: String,
    start: u64,
    end: u64,
}

impl std::str::FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chrom, range) = s
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("invalid region {:?}, expected chrom:start-end", s))?;
        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("invalid region {:?}, expected chrom:start-end", s))?;
        let parse = |value: &str| {
            value
                .replace(',', "")
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("invalid coordinate in region {:?}: {}", s, e))
        };
        let (start, end) = (parse(start)?, parse(end)?);
        if end < start {
            anyhow::bail!("invalid region {:?}: end before start", s);
        }
        Ok(Self {
            chrom: chrom.to_string(),
            start,
            end,
        })
    }
}

impl Region {
    fn contains(&self, chrom: &str, pos: u64) -> bool {
        canonicalize(chrom) == canonicalize(&self.chrom) && self.start <= pos && pos <= self.end
    }
}

/// A named group of sample indices; `None` selects all samples.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SampleGroup {
    prefix: Option<String>,
    samples: Option<Vec<usize>>,
}

/// Load the sample groups given on the command line.
fn load_groups(args: &Args, header: &vcf::Header) -> Result<Vec<SampleGroup>, anyhow::Error> {
    let files = match &args.samples {
        Some(samples) => samples.split(',').collect::<Vec<_>>(),
        None => {
            return Ok(vec![SampleGroup {
                prefix: None,
                samples: None,
            }])
        }
    };
    let prefixes = match &args.sample_prefixes {
        Some(prefixes) => prefixes.split(',').map(|s| s.to_string()).collect(),
        None => (1..=files.len()).map(|i| i.to_string()).collect::<Vec<_>>(),
    };
    if prefixes.len() != files.len() {
        anyhow::bail!("--sample-prefixes must be same length as --samples");
    }

    files
        .into_iter()
        .zip(prefixes)
        .map(|(path, prefix)| {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("could not read samples file {:?}: {}", path, e))?;
            let samples = contents
                .lines()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .filter_map(|name| {
                    let idx = header.sample_names().get_index_of(name);
                    if idx.is_none() {
                        tracing::warn!("sample {} from {:?} not in VCF", name, path);
                    }
                    idx
                })
                .collect();
            Ok(SampleGroup {
                prefix: Some(prefix),
                samples: Some(samples),
            })
        })
        .collect()
}

fn header_row(columns: &[Column], groups: &[SampleGroup]) -> Vec<String> {
    let mut result = vec![
        String::from("chrom"),
        String::from("start"),
        String::from("end"),
    ];
    for column in columns {
        for group in groups {
            result.push(match &group.prefix {
                Some(prefix) => format!("{}-{}", column, prefix),
                None => column.to_string(),
            });
        }
    }
    result
}

/// Label of an allele in frequency and count lists; lengths keep a decimal.
fn allele_label(locus: &Locus, key: &AlleleKey) -> String {
    match key {
        AlleleKey::Sequence(sequence) => sequence.clone(),
        AlleleKey::Length(_) => {
            let copies = locus.key_copies(key);
            if copies.fract() == 0.0 {
                format!("{:.1}", copies)
            } else {
                copies.to_string()
            }
        }
    }
}

fn format_stat(stat: Stat, precision: usize) -> String {
    format_significant(stat.value().unwrap_or(f64::NAN), precision)
}

/// Compute the cells of one output row.
fn locus_row(
    locus: &Locus,
    columns: &[Column],
    groups: &[SampleGroup],
    use_length: bool,
    precision: usize,
) -> Vec<String> {
    let mut result = vec![
        locus.chrom.clone(),
        locus.pos.to_string(),
        (locus.pos + locus.alleles.first().map(|a| a.bp_len).unwrap_or_default() as u64)
            .to_string(),
    ];

    let selected = groups
        .iter()
        .map(|group| {
            let genotypes = match &group.samples {
                Some(samples) => locus.genotype_keys_for(use_length, samples),
                None => locus.genotype_keys(use_length),
            };
            let by_length = match &group.samples {
                Some(samples) => locus.genotype_keys_for(true, samples),
                None => locus.genotype_keys(true),
            };
            let lengths: LengthFreqs = stats::allele_freqs(&by_length)
                .iter()
                .map(|(key, freq)| (locus.key_copies(key), *freq))
                .collect();
            (genotypes, lengths)
        })
        .collect::<Vec<_>>();

    for column in columns {
        for (genotypes, lengths) in &selected {
            result.push(match column {
                Column::Thresh => format_stat(stats::thresh(lengths), precision),
                Column::Afreq => {
                    let freqs = stats::allele_freqs(genotypes);
                    if freqs.is_empty() {
                        String::from(".")
                    } else {
                        freqs
                            .iter()
                            .map(|(key, freq)| format!("{}:{:.3}", allele_label(locus, key), freq))
                            .join(",")
                    }
                }
                Column::Acount => {
                    let counts = stats::allele_counts(genotypes);
                    if counts.is_empty() {
                        String::from(".")
                    } else {
                        counts
                            .iter()
                            .map(|(key, count)| format!("{}:{}", allele_label(locus, key), count))
                            .join(",")
                    }
                }
                Column::Hwep => format_stat(stats::hwe_binomial(genotypes), precision),
                Column::Het => format_stat(
                    stats::expected_het(&stats::allele_freqs(genotypes)),
                    precision,
                ),
                Column::Entropy => {
                    format_stat(stats::entropy(&stats::allele_freqs(genotypes)), precision)
                }
                Column::Mean => format_stat(stats::mean(lengths), precision),
                Column::Mode => format_stat(stats::mode(lengths), precision),
                Column::Var => format_stat(stats::variance(lengths), precision),
                Column::Numcalled => stats::num_called(genotypes).to_string(),
            });
        }
    }

    result
}

/// Main entry point for `stats` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let columns = args.columns();
    if columns.is_empty() {
        anyhow::bail!("Please select at least one statistic, see --help for options");
    }
    let region = args
        .region
        .as_ref()
        .map(|region| region.parse::<Region>())
        .transpose()?;

    let mut reader = vcf::Reader::new(open_read_maybe_gz(&args.vcf)?);
    let header = reader.read_header()?;
    let vcf_type = match args.vcftype {
        Some(vcf_type) => vcf_type,
        None => VcfType::guess(&header)?,
    };
    let caller = build_caller(vcf_type, &CallerOptions::default());
    let use_length = args.use_length || !caller.profile().sequence_alleles;
    let groups = load_groups(args, &header)?;

    let output: Box<dyn Write + Send> = if args.out == "stdout" {
        Box::new(std::io::stdout())
    } else {
        open_write_maybe_gz(format!("{}.tab", args.out))?
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(output);
    writer.write_record(header_row(&columns, &groups))?;

    let start = Instant::now();
    let mut prev = Instant::now();
    let mut num_records = 0usize;
    let mut num_malformed = 0usize;
    for record in reader.records(&header) {
        let locus = match record?.and_then(|record| Locus::from_record(&record, caller.as_ref())) {
            Ok(locus) => locus,
            Err(e) => {
                tracing::warn!("skipping malformed record: {}", e);
                num_malformed += 1;
                continue;
            }
        };
        if let Some(region) = &region {
            if !region.contains(&locus.chrom, locus.pos) {
                continue;
            }
        }

        writer.write_record(locus_row(&locus, &columns, &groups, use_length, args.precision))?;
        num_records += 1;

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("  at {} records", num_records.separate_with_commas());
            prev = Instant::now();
        }
    }
    writer.flush()?;

    tracing::info!(
        "  wrote {} records ({} malformed skipped) in {:?}",
        num_records.separate_with_commas(),
        num_malformed.separate_with_commas(),
        start.elapsed()
    );
    tracing::info!(
        "All of `stats` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
