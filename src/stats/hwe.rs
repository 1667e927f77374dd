//! Hardy-Weinberg equilibrium tests.

use std::collections::BTreeMap;

use statrs::distribution::{Binomial, ChiSquared, ContinuousCDF, Discrete};

use crate::locus::AlleleKey;

use super::{allele_freqs, Stat};

/// Minimal expected count per genotype class for the chi-square approximation.
const MIN_EXPECTED: f64 = 5.0;

/// Relative tolerance when collecting outcomes as extreme as the observed one.
const RELATIVE_TOLERANCE: f64 = 1e-7;

/// Sorted allele pairs of the diploid called genotypes and their allele frequencies.
fn diploid_calls(
    genotypes: &[Option<Vec<AlleleKey>>],
) -> (Vec<[AlleleKey; 2]>, BTreeMap<AlleleKey, f64>) {
    let diploid = genotypes
        .iter()
        .flatten()
        .filter(|alleles| alleles.len() == 2)
        .map(|alleles| {
            let mut pair = [alleles[0].clone(), alleles[1].clone()];
            pair.sort();
            pair
        })
        .collect::<Vec<_>>();
    let freqs = allele_freqs(
        &diploid
            .iter()
            .map(|pair| Some(pair.to_vec()))
            .collect::<Vec<_>>(),
    );
    (diploid, freqs)
}

/// Binomial test of the homozygote count against `sum p_i^2`.
fn homozygote_test(diploid: &[[AlleleKey; 2]], freqs: &BTreeMap<AlleleKey, f64>) -> Stat {
    let hom_freq = freqs.values().map(|p| p * p).sum::<f64>();
    let num_hom = diploid.iter().filter(|pair| pair[0] == pair[1]).count();
    binomial_test(num_hom as u64, diploid.len() as u64, hom_freq)
}

/// HWE p-value over the diploid called genotypes.
///
/// Uses a chi-square goodness of fit test over all genotype classes when every
/// expected class count is at least 5, and otherwise an exact two-sided
/// binomial test of the homozygote count against `sum p_i^2`.
pub fn hwe_pvalue(genotypes: &[Option<Vec<AlleleKey>>]) -> Stat {
    let (diploid, freqs) = diploid_calls(genotypes);
    if diploid.is_empty() || freqs.len() < 2 {
        return Stat::NotComputable;
    }

    let n = diploid.len() as f64;
    let alleles = freqs.keys().collect::<Vec<_>>();
    let mut observed = BTreeMap::new();
    for pair in &diploid {
        *observed.entry((&pair[0], &pair[1])).or_insert(0usize) += 1;
    }

    let mut expected = Vec::new();
    for (i, a) in alleles.iter().enumerate() {
        for b in &alleles[i..] {
            let (pa, pb) = (freqs[*a], freqs[*b]);
            let count = if a == b { n * pa * pa } else { 2.0 * n * pa * pb };
            let obs = observed.get(&(*a, *b)).copied().unwrap_or_default() as f64;
            expected.push((obs, count));
        }
    }

    if expected.iter().all(|(_, e)| *e >= MIN_EXPECTED) {
        chi_square(&expected, alleles.len())
    } else {
        homozygote_test(&diploid, &freqs)
    }
}

/// Two-sided binomial test of the homozygote count over all diploid calls.
///
/// This is the test `stats --hwep` reports. A monomorphic locus yields 1.0;
/// only a locus without diploid calls is not computable.
pub fn hwe_binomial(genotypes: &[Option<Vec<AlleleKey>>]) -> Stat {
    let (diploid, freqs) = diploid_calls(genotypes);
    if diploid.is_empty() {
        return Stat::NotComputable;
    }
    homozygote_test(&diploid, &freqs)
}

fn chi_square(classes: &[(f64, f64)], num_alleles: usize) -> Stat {
    let statistic = classes
        .iter()
        .map(|(obs, exp)| (obs - exp).powi(2) / exp)
        .sum::<f64>();
    let freedom = (num_alleles * (num_alleles - 1) / 2) as f64;
    match ChiSquared::new(freedom) {
        Ok(dist) => Stat::Value(dist.sf(statistic)),
        Err(_) => Stat::NotComputable,
    }
}

/// Exact two-sided binomial test, summing all outcomes no more likely than `x`.
pub fn binomial_test(x: u64, n: u64, p: f64) -> Stat {
    let dist = match Binomial::new(p, n) {
        Ok(dist) => dist,
        Err(_) => return Stat::NotComputable,
    };
    let threshold = dist.pmf(x) * (1.0 + RELATIVE_TOLERANCE);
    let pvalue = (0..=n)
        .map(|k| dist.pmf(k))
        .filter(|pmf| *pmf <= threshold)
        .sum::<f64>();
    Stat::Value(pvalue.min(1.0))
}
