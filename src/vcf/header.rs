//! Header queries and the header lines added to the output.

use noodles_vcf as vcf;
use vcf::header::{
    record::value::{
        map::{format, info, Filter, Format, Info},
        Collection, Map,
    },
    Number,
};

use super::Header;

/// Whether an unstructured `##key=value` line has a value starting with `prefix`.
pub fn has_meta_prefix(header: &Header, key: &str, prefix: &str) -> bool {
    match header.other_records().get(key) {
        Some(Collection::Unstructured(values)) => values.iter().any(|v| v.starts_with(prefix)),
        _ => false,
    }
}

/// Whether `##INFO` declares `id`.
pub fn has_info(header: &Header, id: &str) -> bool {
    id.parse::<vcf::record::info::field::Key>()
        .map(|key| header.infos().contains_key(&key))
        .unwrap_or(false)
}

/// Whether `##FORMAT` declares `id`.
pub fn has_format(header: &Header, id: &str) -> bool {
    id.parse::<vcf::record::genotypes::keys::Key>()
        .map(|key| header.formats().contains_key(&key))
        .unwrap_or(false)
}

/// Add or replace a `##FILTER` line.
pub fn add_filter(header: &mut Header, id: &str, description: &str) {
    header
        .filters_mut()
        .insert(id.to_string(), Map::<Filter>::new(description));
}

/// Add or replace a single-valued float `##INFO` line.
pub fn add_float_info(header: &mut Header, id: &str, description: &str) -> Result<(), anyhow::Error> {
    let key = id
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid INFO key {}: {}", id, e))?;
    header.infos_mut().insert(
        key,
        Map::<Info>::new(Number::Count(1), info::Type::Float, description),
    );
    Ok(())
}

/// Add or replace a single-valued string `##FORMAT` line.
pub fn add_string_format(
    header: &mut Header,
    id: &str,
    description: &str,
) -> Result<(), anyhow::Error> {
    let key = id
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid FORMAT key {}: {}", id, e))?;
    header.formats_mut().insert(
        key,
        Map::<Format>::new(Number::Count(1), format::Type::String, description),
    );
    Ok(())
}

/// Append an unstructured `##key=value` line.
pub fn add_meta(header: &mut Header, key: &str, value: &str) -> Result<(), anyhow::Error> {
    header
        .insert(
            key.parse()
                .map_err(|e| anyhow::anyhow!("invalid header key {}: {}", key, e))?,
            vcf::header::record::Value::from(value),
        )
        .map_err(|e| anyhow::anyhow!("could not add header line {}: {}", key, e))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::vcf::testing;

    const HEADER: &str = "##fileformat=VCFv4.2\n\
        ##command=HipSTR-v0.6.2 --bams x\n\
        ##FILTER=<ID=HRUN,Description=\"old\">\n\
        ##INFO=<ID=REPID,Number=1,Type=String,Description=\"Repeat identifier\">\n\
        ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n";

    #[test]
    fn queries() {
        let header = testing::header(HEADER);

        assert!(super::has_meta_prefix(&header, "command", "HipSTR"));
        assert!(!super::has_meta_prefix(&header, "command", "GangSTR"));
        assert!(!super::has_meta_prefix(&header, "source", "HipSTR"));
        assert!(super::has_info(&header, "REPID"));
        assert!(!super::has_info(&header, "PERIOD"));
        assert!(super::has_format(&header, "GT"));
        assert!(!super::has_format(&header, "DP"));
    }

    #[test]
    fn additions() -> Result<(), anyhow::Error> {
        let mut header = testing::header(HEADER);
        super::add_filter(&mut header, "HRUN", "new");
        super::add_filter(&mut header, "other", "x");
        super::add_float_info(&mut header, "HET", "Observed heterozygosity")?;
        super::add_string_format(&mut header, "FILTER", "Call-level filter")?;
        super::add_meta(&mut header, "strfilterCommand", "version=x.y.z")?;

        let filters = header.filters().keys().cloned().collect::<Vec<_>>();
        assert_eq!(filters, vec![String::from("HRUN"), String::from("other")]);
        assert_eq!(
            header.filters().get("HRUN").map(|f| f.description().to_string()),
            Some(String::from("new"))
        );
        assert!(super::has_info(&header, "HET"));
        assert!(super::has_format(&header, "FILTER"));
        assert!(super::has_meta_prefix(&header, "strfilterCommand", "version=x.y.z"));

        Ok(())
    }
}
