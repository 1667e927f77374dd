//! ExpansionHunter records.
//!
//! ExpansionHunter writes symbolic alleles `<STRn>` with `n` the repeat copy
//! number; the reference copy number is given in `INFO/REF`. Per-allele read
//! counts `ADSP`, `ADFL` and `ADIR` follow the genotype order as `a/b`.

use crate::{
    err::MalformedRecordError,
    locus::{Allele, Genotype, Motif},
    vcf::{record::non_missing, Record, RecordExt},
};

use super::{
    format_number, motif_from_info, parse_number, parse_numbers, Caller, CallerProfile, Field,
    FieldValue, NormalizedCall,
};

pub static PROFILE: CallerProfile = CallerProfile {
    mandatory_format: &["GT"],
    fields: &[
        (Field::Adfl, &["ADFL"]),
        (Field::Adir, &["ADIR"]),
        (Field::Adsp, &["ADSP"]),
        (Field::Lc, &["LC"]),
    ],
    sequence_alleles: false,
};

/// Adapter for ExpansionHunter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpansionHunter;

/// Copy number of a `<STRn>` allele.
fn symbolic_copies(allele: &str) -> Result<f64, MalformedRecordError> {
    allele
        .strip_prefix("<STR")
        .and_then(|rest| rest.strip_suffix('>'))
        .and_then(|n| n.parse::<f64>().ok())
        .ok_or_else(|| MalformedRecordError::InvalidAllele(allele.to_string()))
}

/// Per-allele count list, missing if any entry is missing.
fn per_allele(record: &Record, sample: usize, key: &str) -> Result<FieldValue, MalformedRecordError> {
    let raw = record.sample_value(sample, key);
    let raw = raw.as_deref();
    if raw
        .and_then(non_missing)
        .map(|raw| raw.split('/').any(|token| non_missing(token).is_none()))
        .unwrap_or(false)
    {
        return Ok(FieldValue::Missing);
    }
    Ok(
        match parse_numbers(&format!("FORMAT/{}", key), raw, &['/'])? {
            Some(values) => FieldValue::PerAllele(values),
            None => FieldValue::Missing,
        },
    )
}

impl Caller for ExpansionHunter {
    fn profile(&self) -> &'static CallerProfile {
        &PROFILE
    }

    fn motif(&self, record: &Record) -> Result<Motif, MalformedRecordError> {
        motif_from_info(record, "RU")
    }

    fn alleles(&self, record: &Record, motif: &Motif) -> Result<Vec<Allele>, MalformedRecordError> {
        let ref_copies = parse_number("INFO/REF", record.info_value("REF").as_deref())?
            .ok_or_else(|| MalformedRecordError::MissingField(String::from("INFO/REF")))?;
        std::iter::once(Ok(Allele::from_copies(ref_copies, motif.period)))
            .chain(record.alleles().iter().skip(1).map(|alt| {
                symbolic_copies(alt).map(|copies| Allele::from_copies(copies, motif.period))
            }))
            .collect()
    }

    fn normalize(
        &self,
        record: &Record,
        sample: usize,
        _genotype: &Genotype,
        _motif: &Motif,
    ) -> Result<NormalizedCall, MalformedRecordError> {
        Ok(NormalizedCall::default()
            .with(Field::Adfl, per_allele(record, sample, "ADFL")?)
            .with(Field::Adir, per_allele(record, sample, "ADIR")?)
            .with(Field::Adsp, per_allele(record, sample, "ADSP")?)
            .with(Field::Lc, format_number(record, sample, "LC")?))
    }
}
