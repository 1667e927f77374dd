//! GangSTR records.

use crate::{
    err::MalformedRecordError,
    locus::{Genotype, Motif},
    vcf::{record::non_missing, Record, RecordExt},
};

use super::{
    format_number, motif_from_info, parse_numbers, Caller, CallerProfile, Field, FieldValue,
    NormalizedCall,
};

pub static PROFILE: CallerProfile = CallerProfile {
    mandatory_format: &["GT"],
    fields: &[
        (Field::Dp, &["DP"]),
        (Field::Q, &["Q"]),
        (Field::SpanOnly, &["RC"]),
        (Field::SpanboundOnly, &["RC"]),
        (Field::BadCi, &["REPCN", "REPCI"]),
        (Field::ExpansionProbHet, &["QEXP"]),
        (Field::ExpansionProbHom, &["QEXP"]),
        (Field::ExpansionProbTotal, &["QEXP"]),
        (Field::AlleleSupport, &["REPCN", "ENCLREADS", "FLNKREADS"]),
    ],
    sequence_alleles: true,
};

/// Adapter for GangSTR.
#[derive(Debug, Default, Clone, Copy)]
pub struct GangStr {
    /// Read length, needed to decide between enclosing and flanking support.
    pub readlen: Option<u32>,
}

/// Flags derived from `RC` (enclosing, spanning, FRR, bounded read counts).
fn read_class_flags(
    record: &Record,
    sample: usize,
) -> Result<(FieldValue, FieldValue), MalformedRecordError> {
    let raw = record.sample_value(sample, "RC");
    match parse_numbers("FORMAT/RC", raw.as_deref(), &[','])? {
        Some(rc) if rc.len() == 4 => {
            let (enclosing, frr, bounded) = (rc[0], rc[2], rc[3]);
            Ok((
                FieldValue::Flag(enclosing == 0.0 && frr == 0.0 && bounded == 0.0),
                FieldValue::Flag(enclosing == 0.0 && frr == 0.0),
            ))
        }
        Some(_) => Err(MalformedRecordError::InvalidValue {
            field: String::from("FORMAT/RC"),
            value: raw.unwrap_or_default(),
        }),
        None => Ok((FieldValue::Missing, FieldValue::Missing)),
    }
}

/// Whether any `REPCN` value lies outside its `REPCI` interval.
fn bad_ci(record: &Record, sample: usize) -> Result<FieldValue, MalformedRecordError> {
    let repcn = parse_numbers(
        "FORMAT/REPCN",
        record.sample_value(sample, "REPCN").as_deref(),
        &[','],
    )?;
    let raw_repci = record.sample_value(sample, "REPCI");
    let repci = parse_numbers("FORMAT/REPCI", raw_repci.as_deref(), &[',', '-'])?;
    match (repcn, repci) {
        (Some(repcn), Some(repci)) if repci.len() == 2 * repcn.len() => Ok(FieldValue::Flag(
            repcn
                .iter()
                .zip(repci.chunks(2))
                .any(|(cn, ci)| *cn < ci[0] || *cn > ci[1]),
        )),
        (Some(_), Some(_)) => Err(MalformedRecordError::InvalidValue {
            field: String::from("FORMAT/REPCI"),
            value: raw_repci.unwrap_or_default(),
        }),
        _ => Ok(FieldValue::Missing),
    }
}

/// Parse a `copies,count|copies,count` list; GangSTR writes `NULL` if empty.
fn read_counts(
    record: &Record,
    sample: usize,
    key: &str,
) -> Result<Option<Vec<(f64, f64)>>, MalformedRecordError> {
    let value = record.sample_value(sample, key);
    let raw = match value.as_deref().and_then(non_missing) {
        Some("NULL") => return Ok(Some(Vec::new())),
        Some(raw) => raw,
        None => return Ok(None),
    };
    raw.split('|')
        .map(|entry| {
            match parse_numbers(&format!("FORMAT/{}", key), Some(entry), &[','])?
                .unwrap_or_default()
                .as_slice()
            {
                [copies, count] => Ok((*copies, *count)),
                _ => Err(MalformedRecordError::InvalidValue {
                    field: format!("FORMAT/{}", key),
                    value: raw.to_string(),
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

impl GangStr {
    /// Reads supporting each called allele.
    ///
    /// Alleles shorter than the read length must be supported by enclosing
    /// reads of exactly that length; longer alleles by flanking reads.
    fn allele_support(
        &self,
        record: &Record,
        sample: usize,
        genotype: &Genotype,
        motif: &Motif,
    ) -> Result<FieldValue, MalformedRecordError> {
        let readlen = match self.readlen {
            Some(readlen) => readlen as f64,
            None => return Ok(FieldValue::NotApplicable),
        };
        if genotype.is_missing() {
            return Ok(FieldValue::Missing);
        }
        let repcn = parse_numbers(
            "FORMAT/REPCN",
            record.sample_value(sample, "REPCN").as_deref(),
            &[','],
        )?;
        let enclosing = read_counts(record, sample, "ENCLREADS")?;
        let flanking = read_counts(record, sample, "FLNKREADS")?;
        let (repcn, enclosing, flanking) = match (repcn, enclosing, flanking) {
            (Some(repcn), Some(enclosing), Some(flanking)) => (repcn, enclosing, flanking),
            _ => return Ok(FieldValue::Missing),
        };

        Ok(FieldValue::PerAllele(
            repcn
                .iter()
                .map(|copies| {
                    if copies * (motif.period as f64) < readlen {
                        enclosing
                            .iter()
                            .filter(|(c, _)| c == copies)
                            .map(|(_, n)| n)
                            .sum()
                    } else {
                        flanking.iter().map(|(_, n)| n).sum()
                    }
                })
                .collect(),
        ))
    }
}

impl Caller for GangStr {
    fn profile(&self) -> &'static CallerProfile {
        &PROFILE
    }

    fn motif(&self, record: &Record) -> Result<Motif, MalformedRecordError> {
        motif_from_info(record, "RU")
    }

    fn normalize(
        &self,
        record: &Record,
        sample: usize,
        genotype: &Genotype,
        motif: &Motif,
    ) -> Result<NormalizedCall, MalformedRecordError> {
        let (span_only, spanbound_only) = read_class_flags(record, sample)?;
        let qexp = record.sample_value(sample, "QEXP");
        let (prob_het, prob_hom, prob_total) =
            match parse_numbers("FORMAT/QEXP", qexp.as_deref(), &[','])? {
                Some(qexp) if qexp.len() == 3 => (
                    FieldValue::Value(qexp[1]),
                    FieldValue::Value(qexp[2]),
                    FieldValue::Value(qexp[1] + qexp[2]),
                ),
                Some(_) => {
                    return Err(MalformedRecordError::InvalidValue {
                        field: String::from("FORMAT/QEXP"),
                        value: qexp.unwrap_or_default(),
                    })
                }
                None => (FieldValue::Missing, FieldValue::Missing, FieldValue::Missing),
            };

        Ok(NormalizedCall::default()
            .with(Field::Dp, format_number(record, sample, "DP")?)
            .with(Field::Q, format_number(record, sample, "Q")?)
            .with(Field::SpanOnly, span_only)
            .with(Field::SpanboundOnly, spanbound_only)
            .with(Field::BadCi, bad_ci(record, sample)?)
            .with(Field::ExpansionProbHet, prob_het)
            .with(Field::ExpansionProbHom, prob_hom)
            .with(Field::ExpansionProbTotal, prob_total)
            .with(
                Field::AlleleSupport,
                self.allele_support(record, sample, genotype, motif)?,
            ))
    }
}
