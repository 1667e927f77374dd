//! HipSTR records.
//!
//! Reads `DP`, `Q`, `DFLANKINDEL`, `DSTUTTER`, `GB` and `MALLREADS`; the repeat
//! period comes from `INFO/PERIOD`.

use crate::{
    err::MalformedRecordError,
    locus::{Genotype, Motif},
    vcf::{record::non_missing, Record, RecordExt},
};

use super::{
    format_number, parse_number, parse_numbers, Caller, CallerProfile, Field, FieldValue,
    NormalizedCall,
};

pub static PROFILE: CallerProfile = CallerProfile {
    mandatory_format: &["GT"],
    fields: &[
        (Field::Dp, &["DP"]),
        (Field::Q, &["Q"]),
        (Field::FlankIndelRatio, &["DFLANKINDEL", "DP"]),
        (Field::StutterRatio, &["DSTUTTER", "DP"]),
        (Field::AlleleSupport, &["GB", "MALLREADS"]),
    ],
    sequence_alleles: true,
};

/// Adapter for HipSTR.
#[derive(Debug, Default, Clone, Copy)]
pub struct HipStr;

/// Ratio of `count` over depth `dp`, missing without positive depth.
fn ratio(count: &FieldValue, dp: &FieldValue) -> FieldValue {
    match (count, dp) {
        (FieldValue::Value(count), FieldValue::Value(dp)) if *dp > 0.0 => {
            FieldValue::Value(count / dp)
        }
        _ => FieldValue::Missing,
    }
}

/// Reads supporting each called allele.
///
/// `GB` holds the base pair difference of each called allele to the reference,
/// `MALLREADS` the read counts by base pair difference as `diff|count;...`.
fn allele_support(
    record: &Record,
    sample: usize,
    genotype: &Genotype,
) -> Result<FieldValue, MalformedRecordError> {
    if genotype.is_missing() {
        return Ok(FieldValue::Missing);
    }
    let gb = parse_numbers(
        "FORMAT/GB",
        record.sample_value(sample, "GB").as_deref(),
        &['|', '/'],
    )?;
    let mallreads = record.sample_value(sample, "MALLREADS");
    let (gb, mallreads) = match (gb, mallreads.as_deref().and_then(non_missing)) {
        (Some(gb), Some(mallreads)) => (gb, mallreads),
        _ => return Ok(FieldValue::Missing),
    };

    let counts = mallreads
        .split(';')
        .map(|entry| {
            let pair = parse_numbers("FORMAT/MALLREADS", Some(entry), &['|'])?.unwrap_or_default();
            match pair.as_slice() {
                [diff, count] => Ok((*diff as i64, *count)),
                _ => Err(MalformedRecordError::InvalidValue {
                    field: String::from("FORMAT/MALLREADS"),
                    value: mallreads.to_string(),
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FieldValue::PerAllele(
        gb.iter()
            .map(|diff| {
                counts
                    .iter()
                    .filter(|(d, _)| *d == *diff as i64)
                    .map(|(_, count)| *count)
                    .sum()
            })
            .collect(),
    ))
}

impl Caller for HipStr {
    fn profile(&self) -> &'static CallerProfile {
        &PROFILE
    }

    fn motif(&self, record: &Record) -> Result<Motif, MalformedRecordError> {
        let period = parse_number("INFO/PERIOD", record.info_value("PERIOD").as_deref())?
            .ok_or_else(|| MalformedRecordError::MissingField(String::from("INFO/PERIOD")))?;
        if period < 1.0 {
            return Err(MalformedRecordError::InvalidValue {
                field: String::from("INFO/PERIOD"),
                value: period.to_string(),
            });
        }
        Ok(Motif {
            period: period as usize,
        })
    }

    fn normalize(
        &self,
        record: &Record,
        sample: usize,
        genotype: &Genotype,
        _motif: &Motif,
    ) -> Result<NormalizedCall, MalformedRecordError> {
        let dp = format_number(record, sample, "DP")?;
        let flank_indel = ratio(&format_number(record, sample, "DFLANKINDEL")?, &dp);
        let stutter = ratio(&format_number(record, sample, "DSTUTTER")?, &dp);

        Ok(NormalizedCall::default()
            .with(Field::Q, format_number(record, sample, "Q")?)
            .with(Field::FlankIndelRatio, flank_indel)
            .with(Field::StutterRatio, stutter)
            .with(
                Field::AlleleSupport,
                allele_support(record, sample, genotype)?,
            )
            .with(Field::Dp, dp))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::{
        callers::{Caller, Field, FieldValue},
        locus::Locus,
        vcf::testing,
    };

    const HEADER: &str = "##fileformat=VCFv4.2\n\
        ##command=HipSTR-v0.6.2\n\
        ##INFO=<ID=PERIOD,Number=1,Type=Integer,Description=\"Period\">\n\
        ##INFO=<ID=END,Number=1,Type=Integer,Description=\"End\">\n\
        ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
        ##FORMAT=<ID=GB,Number=1,Type=String,Description=\"Base pair differences\">\n\
        ##FORMAT=<ID=Q,Number=1,Type=Float,Description=\"Quality\">\n\
        ##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
        ##FORMAT=<ID=DSTUTTER,Number=1,Type=Integer,Description=\"Stutter reads\">\n\
        ##FORMAT=<ID=DFLANKINDEL,Number=1,Type=Integer,Description=\"Flank indel reads\">\n\
        ##FORMAT=<ID=MALLREADS,Number=1,Type=String,Description=\"Reads per allele\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\tS3\n";

    const LINE: &str = "1\t1000\t.\tACACACACAC\tACACACACACAC\t.\t.\tPERIOD=2;END=1009\t\
        GT:GB:Q:DP:DSTUTTER:DFLANKINDEL:MALLREADS\t\
        0/1:0|2:0.95:20:7:2:0|12;2|8\t\
        0/0:0|0:0.99:10:0:0:0|10\t\
        ./.:.:.:.:.:.:.";

    fn locus(line: &str) -> Result<Locus, crate::err::MalformedRecordError> {
        let header = testing::header(HEADER);
        Locus::from_record(&testing::record(&header, line), &super::HipStr)
    }

    #[test]
    fn normalize() -> Result<(), anyhow::Error> {
        let locus = locus(LINE)?;

        assert_eq!(locus.motif.period, 2);
        assert_eq!(locus.end, 1009);
        assert_eq!(locus.alleles[1].copies, 6.0);

        let first = &locus.calls[0].fields;
        assert_eq!(first.get(Field::Dp), &FieldValue::Value(20.0));
        assert_eq!(first.get(Field::Q), &FieldValue::Value(0.95));
        assert_eq!(first.get(Field::StutterRatio), &FieldValue::Value(0.35));
        assert_eq!(first.get(Field::FlankIndelRatio), &FieldValue::Value(0.1));
        assert_eq!(
            first.get(Field::AlleleSupport),
            &FieldValue::PerAllele(vec![12.0, 8.0])
        );
        assert_eq!(first.get(Field::Ml), &FieldValue::NotApplicable);

        let second = &locus.calls[1].fields;
        assert_eq!(
            second.get(Field::AlleleSupport),
            &FieldValue::PerAllele(vec![10.0, 10.0])
        );

        let third = &locus.calls[2].fields;
        assert!(locus.calls[2].genotype.is_missing());
        assert_eq!(third.get(Field::Dp), &FieldValue::Missing);
        assert_eq!(third.get(Field::StutterRatio), &FieldValue::Missing);
        assert_eq!(third.get(Field::AlleleSupport), &FieldValue::Missing);

        Ok(())
    }

    #[test]
    fn missing_period() {
        let header = testing::header(HEADER);
        let record = testing::record(&header, &LINE.replace("PERIOD=2;", ""));
        assert!(super::HipStr.motif(&record).is_err());
    }

    #[test]
    fn malformed_mallreads() {
        assert!(locus(&LINE.replace("0|12;2|8", "0|12;2")).is_err());
    }

    #[test]
    fn missing_genotype_column() {
        let line = "1\t1000\t.\tACAC\tACACAC\t.\t.\tPERIOD=2\tDP\t20\t10\t5";
        assert_eq!(
            locus(line),
            Err(crate::err::MalformedRecordError::MissingField(String::from(
                "FORMAT/GT"
            )))
        );
    }
}
