//! Implementation of the `filter` sub command.

pub mod conf;
pub mod engine;
pub mod output;
pub mod specs;

use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;
use thousands::Separable;

use crate::{
    callers::{build_caller, CallerOptions, VcfType},
    common::open_read_maybe_gz,
    regions::{load_bed, IntervalIndex},
    vcf,
};

use self::{
    conf::FilterConfig,
    engine::{Engine, Summary},
    output::{build_output_header, OutputPaths, OutputWriter},
    specs::FilterSet,
};

/// Command line arguments for `filter` sub command.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "Filter STR calls", long_about = None)]
pub struct Args {
    /// Path to the input VCF file, optionally gzip compressed.
    #[clap(long)]
    pub vcf: String,
    /// Prefix of the output files.
    #[clap(long)]
    pub out: String,
    /// The caller that produced the VCF, inferred from the header if not given.
    #[clap(long, value_enum)]
    pub vcftype: Option<VcfType>,
    /// Set the number of threads to use, defaults to number of cores.
    #[clap(long)]
    pub num_threads: Option<usize>,
    /// Number of records to evaluate in parallel at a time.
    #[clap(long, default_value_t = 1_000)]
    pub batch_size: usize,
    /// JSON file with the filter configuration; replaces the filter options.
    #[clap(long)]
    pub path_config: Option<String>,

    #[command(flatten)]
    pub config: FilterConfig,
}

/// Load the region sets named in `config`.
fn load_regions(config: &FilterConfig) -> Result<IntervalIndex, anyhow::Error> {
    let mut sets = IndexMap::new();
    for (name, path) in config.region_names().into_iter().zip(config.filter_regions.iter()) {
        tracing::info!("  loading region set {} from {:?}", name, path);
        sets.insert(name, load_bed(path)?);
    }
    let index = IntervalIndex::load(sets)?;
    tracing::info!("  region sets: {:?}", index.names());
    Ok(index)
}

/// Main entry point for `filter` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    if let Some(num_threads) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| anyhow::anyhow!("building global Rayon thread pool failed: {}", e))?;
    }

    let config = match &args.path_config {
        Some(path) => FilterConfig::load_json(std::path::Path::new(path))?,
        None => args.config.clone(),
    };
    config.validate()?;

    tracing::info!("Opening input VCF...");
    let mut reader = vcf::Reader::new(open_read_maybe_gz(&args.vcf)?);
    let header = reader.read_header()?;
    let vcf_type = match args.vcftype {
        Some(vcf_type) => vcf_type,
        None => VcfType::guess(&header)?,
    };
    tracing::info!("  VCF type is {}", vcf_type);

    let filters = FilterSet::from_config(&config, vcf_type)?;
    filters.check_header(&header, vcf_type)?;
    tracing::info!(
        "  {} locus filters, {} call filters",
        filters.locus.len(),
        filters.call.len()
    );
    let regions = load_regions(&config)?;
    let caller = build_caller(
        vcf_type,
        &CallerOptions {
            gangstr_readlen: config.gangstr_readlen,
        },
    );
    let engine = Engine::new(
        filters,
        regions,
        caller,
        config.use_length,
        config.drop_filtered,
    );

    let paths = OutputPaths::from_prefix(&args.out);
    let out_header = build_output_header(&header, engine.filters(), &config)?;
    let mut writer = OutputWriter::new(
        &paths,
        &out_header,
        engine.caller().profile(),
        config.drop_filtered,
    )?;

    tracing::info!("Filtering records...");
    let start = Instant::now();
    let mut prev = Instant::now();
    let mut summary = Summary::default();
    let mut records = reader.records(&header);
    let batch_size = args.batch_size.max(1);
    loop {
        let batch = records
            .by_ref()
            .take(batch_size)
            .collect::<Result<Vec<_>, _>>()?;
        if batch.is_empty() {
            break;
        }

        let results = batch
            .into_par_iter()
            .map(|record| engine.process(record))
            .collect::<Vec<_>>();
        for (finalized, record_summary) in results {
            if let Some(finalized) = finalized {
                writer.write(&finalized)?;
            }
            summary.merge(record_summary);
        }

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("  at {} loci", summary.loci.separate_with_commas());
            prev = Instant::now();
        }
    }
    writer.finish(&summary, engine.filters())?;

    tracing::info!(
        "  processed {} loci ({} passed, {} dropped, {} malformed) in {:?}",
        summary.loci.separate_with_commas(),
        summary.loci_passed.separate_with_commas(),
        summary.loci_dropped.separate_with_commas(),
        summary.malformed.separate_with_commas(),
        start.elapsed()
    );
    tracing::info!(
        "  {} calls evaluated, {} failed, {} no-calls",
        summary.calls_evaluated.separate_with_commas(),
        summary.calls_failed.separate_with_commas(),
        summary.calls_nocall.separate_with_commas()
    );
    for (tag, count) in summary
        .locus_fail_counts
        .iter()
        .chain(summary.call_fail_counts.iter())
    {
        tracing::info!("    {}: {}", tag, count.separate_with_commas());
    }
    tracing::info!(
        "All of `filter` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
