//! adVNTR records.

use crate::{
    err::MalformedRecordError,
    locus::{Genotype, Motif},
    vcf::Record,
};

use super::{format_number, motif_from_info, Caller, CallerProfile, Field, NormalizedCall};

pub static PROFILE: CallerProfile = CallerProfile {
    mandatory_format: &["GT"],
    fields: &[
        (Field::Dp, &["DP"]),
        (Field::Spanning, &["SR"]),
        (Field::Flanking, &["FR"]),
        (Field::Ml, &["ML"]),
    ],
    sequence_alleles: true,
};

/// Adapter for adVNTR.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdVntr;

impl Caller for AdVntr {
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
        _genotype: &Genotype,
        _motif: &Motif,
    ) -> Result<NormalizedCall, MalformedRecordError> {
        Ok(NormalizedCall::default()
            .with(Field::Dp, format_number(record, sample, "DP")?)
            .with(Field::Spanning, format_number(record, sample, "SR")?)
            .with(Field::Flanking, format_number(record, sample, "FR")?)
            .with(Field::Ml, format_number(record, sample, "ML")?))
    }
}
