//! popSTR records.

use crate::{
    err::MalformedRecordError,
    locus::{Genotype, Motif},
    vcf::{Record, RecordExt},
};

use super::{
    format_number, motif_from_info, parse_numbers, Caller, CallerProfile, Field, FieldValue,
    NormalizedCall,
};

pub static PROFILE: CallerProfile = CallerProfile {
    mandatory_format: &["GT"],
    fields: &[(Field::Dp, &["DP"]), (Field::AlleleSupport, &["AD"])],
    sequence_alleles: true,
};

/// Adapter for popSTR.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopStr;

/// Reads supporting each called allele, looked up in `AD` by allele index.
fn allele_support(
    record: &Record,
    sample: usize,
    genotype: &Genotype,
) -> Result<FieldValue, MalformedRecordError> {
    let ad = match parse_numbers(
        "FORMAT/AD",
        record.sample_value(sample, "AD").as_deref(),
        &[','],
    )? {
        Some(ad) if !genotype.is_missing() => ad,
        _ => return Ok(FieldValue::Missing),
    };
    genotype
        .alleles()
        .iter()
        .map(|&i| {
            ad.get(i)
                .copied()
                .ok_or(MalformedRecordError::AlleleOutOfRange {
                    index: i,
                    count: ad.len(),
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(FieldValue::PerAllele)
}

impl Caller for PopStr {
    fn profile(&self) -> &'static CallerProfile {
        &PROFILE
    }

    fn motif(&self, record: &Record) -> Result<Motif, MalformedRecordError> {
        motif_from_info(record, "Motif")
    }

    fn normalize(
        &self,
        record: &Record,
        sample: usize,
        genotype: &Genotype,
        _motif: &Motif,
    ) -> Result<NormalizedCall, MalformedRecordError> {
        Ok(NormalizedCall::default()
            .with(Field::Dp, format_number(record, sample, "DP")?)
            .with(
                Field::AlleleSupport,
                allele_support(record, sample, genotype)?,
            ))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::{
        callers::{Field, FieldValue},
        locus::Locus,
        vcf::testing,
    };

    const HEADER: &str = "##fileformat=VCFv4.2\n\
        ##command=popSTR computePnSlippageDefault\n\
        ##INFO=<ID=Motif,Number=1,Type=String,Description=\"Repeat motif\">\n\
        ##INFO=<ID=RefLen,Number=1,Type=Integer,Description=\"Reference length\">\n\
        ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
        ##FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"Phred-scaled likelihoods\">\n\
        ##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
        ##FORMAT=<ID=AD,Number=.,Type=Integer,Description=\"Reads per allele\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\tS3\n";

    const LINE: &str = "chr1\t700\t.\tTTTTTTTT\tTTTTTTTTT,TTTTTTT\t.\t.\tMotif=T;RefLen=8\t\
        GT:PL:DP:AD\t0/2:0,30,40,1,2,3:17:9,1,7\t1/1:.:4:0,4,0\t./.:.:.:.";

    fn locus(line: &str) -> Result<Locus, crate::err::MalformedRecordError> {
        let header = testing::header(HEADER);
        Locus::from_record(&testing::record(&header, line), &super::PopStr)
    }

    #[test]
    fn normalize() -> Result<(), anyhow::Error> {
        let locus = locus(LINE)?;

        assert_eq!(locus.motif.period, 1);
        assert_eq!(locus.alleles[2].copies, 7.0);

        let fields = locus.calls.iter().map(|c| c.fields.clone()).collect::<Vec<_>>();
        assert_eq!(fields[0].get(Field::Dp), &FieldValue::Value(17.0));
        assert_eq!(
            fields[0].get(Field::AlleleSupport),
            &FieldValue::PerAllele(vec![9.0, 7.0])
        );
        assert_eq!(
            fields[1].get(Field::AlleleSupport),
            &FieldValue::PerAllele(vec![4.0, 4.0])
        );
        assert_eq!(fields[2].get(Field::AlleleSupport), &FieldValue::Missing);

        Ok(())
    }

    #[test]
    fn short_allele_depths() {
        assert!(locus(&LINE.replace("9,1,7", "9,1")).is_err());
    }
}
