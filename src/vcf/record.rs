//! Text-level access to the fields of `noodles` records.
//!
//! Caller adapters interpret values from their VCF text, so typed values are
//! rendered back to text here.

use noodles_vcf as vcf;
use vcf::record::{
    genotypes::{keys::Key, sample::Value, Keys},
    info::field,
    Filters, Genotypes,
};

use crate::err::MalformedRecordError;

use super::Record;

/// Interpret a raw VCF value, `None` for missing (`.` or empty).
pub fn non_missing(value: &str) -> Option<&str> {
    if value.is_empty() || value == "." {
        None
    } else {
        Some(value)
    }
}

fn format_key(key: &str) -> Result<Key, MalformedRecordError> {
    key.parse().map_err(|_| MalformedRecordError::InvalidValue {
        field: String::from("FORMAT"),
        value: key.to_string(),
    })
}

/// Record accessors used by the caller adapters and the filter engine.
pub trait RecordExt {
    /// Chromosome name.
    fn chrom(&self) -> String;
    /// 1-based position.
    fn pos(&self) -> u64;
    /// Reference followed by the alternate alleles.
    fn alleles(&self) -> Vec<String>;
    /// Text of INFO `key`; flags yield an empty string.
    fn info_value(&self, key: &str) -> Option<String>;
    /// Number of sample columns.
    fn num_samples(&self) -> usize;
    /// Whether the FORMAT column lists `key`.
    fn has_format(&self, key: &str) -> bool;
    /// Text of FORMAT `key` for `sample`, `None` if absent or missing.
    fn sample_value(&self, sample: usize, key: &str) -> Option<String>;

    /// Set INFO `key` to the string `value`, replacing an existing entry.
    fn set_info(&mut self, key: &str, value: &str) -> Result<(), MalformedRecordError>;
    /// Set FORMAT `key` for the given samples, adding the key if necessary.
    fn set_sample_values(
        &mut self,
        key: &str,
        values: &[(usize, String)],
    ) -> Result<(), MalformedRecordError>;
    /// Set the FILTER column from failing tags, `PASS` if there are none.
    fn set_filters(&mut self, tags: &[String]);
}

impl RecordExt for Record {
    fn chrom(&self) -> String {
        self.chromosome().to_string()
    }

    fn pos(&self) -> u64 {
        usize::from(self.position()) as u64
    }

    fn alleles(&self) -> Vec<String> {
        std::iter::once(self.reference_bases().to_string())
            .chain(self.alternate_bases().iter().map(|allele| allele.to_string()))
            .collect()
    }

    fn info_value(&self, key: &str) -> Option<String> {
        let key = key.parse::<field::Key>().ok()?;
        match self.info().get(&key)? {
            Some(field::Value::Flag) | None => Some(String::new()),
            Some(value) => Some(value.to_string()),
        }
    }

    fn num_samples(&self) -> usize {
        self.genotypes().values().count()
    }

    fn has_format(&self, key: &str) -> bool {
        key.parse::<Key>()
            .map(|key| self.genotypes().keys().contains(&key))
            .unwrap_or(false)
    }

    fn sample_value(&self, sample: usize, key: &str) -> Option<String> {
        let key = key.parse::<Key>().ok()?;
        let sample = self.genotypes().values().nth(sample)?;
        sample.get(&key).flatten().map(|value| value.to_string())
    }

    fn set_info(&mut self, key: &str, value: &str) -> Result<(), MalformedRecordError> {
        let key = key
            .parse::<field::Key>()
            .map_err(|_| MalformedRecordError::InvalidValue {
                field: String::from("INFO"),
                value: key.to_string(),
            })?;
        self.info_mut()
            .insert(key, Some(field::Value::String(value.to_string())));
        Ok(())
    }

    fn set_sample_values(
        &mut self,
        key: &str,
        values: &[(usize, String)],
    ) -> Result<(), MalformedRecordError> {
        let key = format_key(key)?;
        let genotypes = self.genotypes();
        let mut keys = genotypes.keys().iter().cloned().collect::<Vec<_>>();
        let idx = match keys.iter().position(|k| *k == key) {
            Some(idx) => idx,
            None => {
                keys.push(key);
                keys.len() - 1
            }
        };
        let mut columns = genotypes
            .values()
            .map(|sample| {
                keys.iter()
                    .map(|k| sample.get(k).flatten().cloned())
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        for (sample, value) in values {
            if let Some(column) = columns.get_mut(*sample) {
                column[idx] = Some(Value::String(value.clone()));
            }
        }

        let keys = Keys::try_from(keys).map_err(|e| MalformedRecordError::InvalidValue {
            field: String::from("FORMAT"),
            value: e.to_string(),
        })?;
        *self.genotypes_mut() = Genotypes::new(keys, columns);
        Ok(())
    }

    fn set_filters(&mut self, tags: &[String]) {
        *self.filters_mut() = Some(if tags.is_empty() {
            Filters::Pass
        } else {
            Filters::Fail(tags.iter().cloned().collect())
        });
    }
}
