//! Internal representation of one STR locus and its per-sample calls.

use crate::{
    callers::{Caller, NormalizedCall},
    err::MalformedRecordError,
    vcf::{record::non_missing, Record, RecordExt},
};

/// Repeat motif of a locus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Motif {
    /// Motif length in base pairs.
    pub period: usize,
}

/// Identity of an allele for statistics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlleleKey {
    /// Length in base pairs.
    Length(usize),
    /// Full allele sequence.
    Sequence(String),
}

/// One allele of a locus.
#[derive(Debug, Clone, PartialEq)]
pub struct Allele {
    /// Allele sequence; `None` for symbolic alleles.
    pub sequence: Option<String>,
    /// Length in base pairs.
    pub bp_len: usize,
    /// Length in repeat units.
    pub copies: f64,
}

impl Allele {
    /// Construct allele from its sequence.
    pub fn from_sequence(sequence: &str, period: usize) -> Result<Self, MalformedRecordError> {
        if sequence.is_empty()
            || !sequence
                .bytes()
                .all(|b| matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N'))
        {
            return Err(MalformedRecordError::InvalidAllele(sequence.to_string()));
        }
        Ok(Self {
            sequence: Some(sequence.to_string()),
            bp_len: sequence.len(),
            copies: sequence.len() as f64 / period.max(1) as f64,
        })
    }

    /// Construct symbolic allele from its repeat copy number.
    pub fn from_copies(copies: f64, period: usize) -> Self {
        Self {
            sequence: None,
            bp_len: (copies * period as f64).round() as usize,
            copies,
        }
    }

    /// Key under which the allele is counted.
    pub fn key(&self, use_length: bool) -> AlleleKey {
        match (&self.sequence, use_length) {
            (Some(sequence), false) => AlleleKey::Sequence(sequence.to_ascii_uppercase()),
            _ => AlleleKey::Length(self.bp_len),
        }
    }
}

/// Genotype of one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Genotype {
    /// No call, including partially missing genotypes such as `./1`.
    Missing { ploidy: usize, phased: bool },
    /// Called genotype as allele indices.
    Called { alleles: Vec<usize>, phased: bool },
}

impl Genotype {
    /// Parse from the raw `GT` value, checking indices against `num_alleles`.
    pub fn parse(raw: Option<&str>, num_alleles: usize) -> Result<Self, MalformedRecordError> {
        let raw = match raw {
            Some(raw) => raw,
            None => {
                return Ok(Genotype::Missing {
                    ploidy: 2,
                    phased: false,
                })
            }
        };
        let phased = raw.contains('|');
        let tokens = raw.split(['/', '|']).collect::<Vec<_>>();
        if tokens.iter().any(|t| non_missing(t).is_none()) {
            return Ok(Genotype::Missing {
                ploidy: tokens.len(),
                phased,
            });
        }
        let alleles = tokens
            .iter()
            .map(|t| {
                t.parse::<usize>()
                    .map_err(|_| MalformedRecordError::InvalidGenotype(raw.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(&index) = alleles.iter().find(|&&i| i >= num_alleles) {
            return Err(MalformedRecordError::AlleleOutOfRange {
                index,
                count: num_alleles,
            });
        }
        Ok(Genotype::Called { alleles, phased })
    }

    /// Whether the genotype is missing.
    pub fn is_missing(&self) -> bool {
        matches!(self, Genotype::Missing { .. })
    }

    /// The allele indices, empty for missing genotypes.
    pub fn alleles(&self) -> &[usize] {
        match self {
            Genotype::Called { alleles, .. } => alleles,
            Genotype::Missing { .. } => &[],
        }
    }

    /// Missing genotype with the same ploidy and phasing.
    pub fn to_missing(&self) -> Genotype {
        match self {
            Genotype::Called { alleles, phased } => Genotype::Missing {
                ploidy: alleles.len(),
                phased: *phased,
            },
            missing => missing.clone(),
        }
    }
}

impl std::fmt::Display for Genotype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (tokens, phased) = match self {
            Genotype::Missing { ploidy, phased } => (vec![String::from("."); *ploidy], *phased),
            Genotype::Called { alleles, phased } => {
                (alleles.iter().map(|a| a.to_string()).collect(), *phased)
            }
        };
        write!(f, "{}", tokens.join(if phased { "|" } else { "/" }))
    }
}

/// One sample's call at a locus.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Index of the sample in the header.
    pub sample: usize,
    pub genotype: Genotype,
    /// Caller-agnostic quality fields.
    pub fields: NormalizedCall,
}

/// One STR locus.
#[derive(Debug, Clone, PartialEq)]
pub struct Locus {
    pub chrom: String,
    /// 1-based start position.
    pub pos: u64,
    /// 1-based inclusive end position.
    pub end: u64,
    /// Reference allele sequence as written in the record.
    pub reference: String,
    pub motif: Motif,
    /// Alleles, reference first.
    pub alleles: Vec<Allele>,
    /// Calls in header sample order.
    pub calls: Vec<Call>,
}

impl Locus {
    /// Build locus from `record` using the caller-specific `caller`.
    pub fn from_record(record: &Record, caller: &dyn Caller) -> Result<Self, MalformedRecordError> {
        let num_samples = record.num_samples();
        if num_samples > 0 {
            for key in caller.profile().mandatory_format {
                if !record.has_format(key) {
                    return Err(MalformedRecordError::MissingField(format!("FORMAT/{}", key)));
                }
            }
        }

        let motif = caller.motif(record)?;
        let alleles = caller.alleles(record, &motif)?;
        let calls = (0..num_samples)
            .map(|sample| {
                let gt = record.sample_value(sample, "GT");
                let genotype = Genotype::parse(gt.as_deref().and_then(non_missing), alleles.len())?;
                let fields = caller.normalize(record, sample, &genotype, &motif)?;
                Ok(Call {
                    sample,
                    genotype,
                    fields,
                })
            })
            .collect::<Result<Vec<_>, MalformedRecordError>>()?;

        let pos = record.pos();
        let reference = record.reference_bases().to_string();
        let end = match record.info_value("END").as_deref().and_then(non_missing) {
            Some(end) => end
                .parse::<u64>()
                .map_err(|_| MalformedRecordError::InvalidValue {
                    field: String::from("INFO/END"),
                    value: end.to_string(),
                })?,
            None => pos + (reference.len() as u64).saturating_sub(1),
        };

        Ok(Self {
            chrom: record.chrom(),
            pos,
            end,
            reference,
            motif,
            alleles,
            calls,
        })
    }

    /// Allele keys per call, `None` for missing genotypes.
    pub fn genotype_keys(&self, use_length: bool) -> Vec<Option<Vec<AlleleKey>>> {
        self.calls
            .iter()
            .map(|call| match &call.genotype {
                Genotype::Missing { .. } => None,
                Genotype::Called { alleles, .. } => Some(
                    alleles
                        .iter()
                        .map(|&i| self.alleles[i].key(use_length))
                        .collect(),
                ),
            })
            .collect()
    }

    /// Allele keys per call for the given subset of sample indices.
    pub fn genotype_keys_for(
        &self,
        use_length: bool,
        samples: &[usize],
    ) -> Vec<Option<Vec<AlleleKey>>> {
        let all = self.genotype_keys(use_length);
        samples
            .iter()
            .filter_map(|&i| all.get(i).cloned())
            .collect()
    }

    /// Repeat length in copies for an allele key.
    pub fn key_copies(&self, key: &AlleleKey) -> f64 {
        match key {
            AlleleKey::Length(bp_len) => *bp_len as f64 / self.motif.period.max(1) as f64,
            AlleleKey::Sequence(sequence) => {
                sequence.len() as f64 / self.motif.period.max(1) as f64
            }
        }
    }

    /// Longest homopolymer run in the reference allele.
    pub fn reference_homopolymer_run(&self) -> usize {
        let bytes = self.reference.as_bytes();
        let mut best = 0;
        let mut i = 0;
        while i < bytes.len() {
            let mut j = i;
            while j < bytes.len() && bytes[j].eq_ignore_ascii_case(&bytes[i]) {
                j += 1;
            }
            best = best.max(j - i);
            i = j;
        }
        best
    }
}
