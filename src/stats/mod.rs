//! Per-locus population statistics.
//!
//! All functions take the genotypes of the selected calls as lists of allele
//! keys, `None` marking a missing genotype.

use std::collections::BTreeMap;

use crate::locus::AlleleKey;

mod hwe;

pub use hwe::{hwe_binomial, hwe_pvalue};

/// A statistic that may not be computable for a locus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stat {
    Value(f64),
    /// Too few calls or alleles; satisfies every threshold.
    NotComputable,
}

impl Stat {
    pub fn value(&self) -> Option<f64> {
        match self {
            Stat::Value(value) => Some(*value),
            Stat::NotComputable => None,
        }
    }

    /// Format with `precision` decimals, `missing` if not computable.
    pub fn format(&self, precision: usize, missing: &str) -> String {
        match self {
            Stat::Value(value) => crate::common::format_float(*value, precision),
            Stat::NotComputable => missing.to_string(),
        }
    }
}

/// Number of called samples.
pub fn num_called(genotypes: &[Option<Vec<AlleleKey>>]) -> usize {
    genotypes.iter().filter(|gt| gt.is_some()).count()
}

/// Fraction of samples with a call.
pub fn call_rate(genotypes: &[Option<Vec<AlleleKey>>]) -> Stat {
    if genotypes.is_empty() {
        Stat::NotComputable
    } else {
        Stat::Value(num_called(genotypes) as f64 / genotypes.len() as f64)
    }
}

/// Number of called alleles per allele key.
pub fn allele_counts(genotypes: &[Option<Vec<AlleleKey>>]) -> BTreeMap<AlleleKey, usize> {
    let mut result = BTreeMap::new();
    for key in genotypes.iter().flatten().flatten() {
        *result.entry(key.clone()).or_insert(0) += 1;
    }
    result
}

/// Frequency of each called allele key.
pub fn allele_freqs(genotypes: &[Option<Vec<AlleleKey>>]) -> BTreeMap<AlleleKey, f64> {
    let counts = allele_counts(genotypes);
    let total = counts.values().sum::<usize>() as f64;
    counts
        .into_iter()
        .map(|(key, count)| (key, count as f64 / total))
        .collect()
}

/// Fraction of called samples whose alleles are not all identical.
pub fn observed_het(genotypes: &[Option<Vec<AlleleKey>>]) -> Stat {
    let called = genotypes.iter().flatten().collect::<Vec<_>>();
    if called.is_empty() || allele_counts(genotypes).len() < 2 {
        return Stat::NotComputable;
    }
    let het = called
        .iter()
        .filter(|alleles| alleles.iter().any(|a| *a != alleles[0]))
        .count();
    Stat::Value(het as f64 / called.len() as f64)
}

/// Probability that two randomly drawn alleles differ.
pub fn expected_het<K>(freqs: &BTreeMap<K, f64>) -> Stat {
    if freqs.is_empty() {
        Stat::NotComputable
    } else {
        Stat::Value(1.0 - freqs.values().map(|p| p * p).sum::<f64>())
    }
}

/// Entropy of the allele distribution in bits.
pub fn entropy<K>(freqs: &BTreeMap<K, f64>) -> Stat {
    if freqs.is_empty() {
        Stat::NotComputable
    } else {
        Stat::Value(
            -freqs
                .values()
                .filter(|p| **p > 0.0)
                .map(|p| p * p.log2())
                .sum::<f64>(),
        )
    }
}

/// Allele length distribution as `(length, frequency)` sorted by length.
pub type LengthFreqs = Vec<(f64, f64)>;

/// Frequency-weighted mean allele length.
pub fn mean(freqs: &LengthFreqs) -> Stat {
    if freqs.is_empty() {
        Stat::NotComputable
    } else {
        Stat::Value(freqs.iter().map(|(len, p)| len * p).sum())
    }
}

/// Most frequent allele length, the shortest one on ties.
pub fn mode(freqs: &LengthFreqs) -> Stat {
    freqs
        .iter()
        .fold(None, |best: Option<(f64, f64)>, &(len, p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((len, p)),
        })
        .map(|(len, _)| Stat::Value(len))
        .unwrap_or(Stat::NotComputable)
}

/// Frequency-weighted variance of the allele length.
pub fn variance(freqs: &LengthFreqs) -> Stat {
    match mean(freqs) {
        Stat::Value(mean) => Stat::Value(
            freqs
                .iter()
                .map(|(len, p)| p * (len - mean).powi(2))
                .sum(),
        ),
        Stat::NotComputable => Stat::NotComputable,
    }
}

/// Maximal called allele length.
pub fn thresh(freqs: &LengthFreqs) -> Stat {
    freqs
        .iter()
        .map(|(len, _)| *len)
        .reduce(f64::max)
        .map(Stat::Value)
        .unwrap_or(Stat::NotComputable)
}

/// The statistics that locus filters are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocusStats {
    pub num_samples: usize,
    pub num_called: usize,
    pub call_rate: Stat,
    pub het: Stat,
    pub hwep: Stat,
}

impl LocusStats {
    pub fn compute(genotypes: &[Option<Vec<AlleleKey>>]) -> Self {
        Self {
            num_samples: genotypes.len(),
            num_called: num_called(genotypes),
            call_rate: call_rate(genotypes),
            het: observed_het(genotypes),
            hwep: hwe_pvalue(genotypes),
        }
    }
}
