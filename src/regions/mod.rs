//! Named region sets and their overlap queries.

use std::{collections::HashMap, path::Path, time::Instant};

use bio::data_structures::interval_tree::ArrayBackedIntervalTree;
use indexmap::IndexMap;

use crate::{
    common::{canonicalize, open_read_maybe_gz},
    err::ConfigurationError,
};

/// Alias for the interval tree that we use; data is the region set index.
type IntervalTree = ArrayBackedIntervalTree<u64, usize>;

/// A half-open, 0-based interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

/// Region sets indexed for point queries.
#[derive(Debug, Default)]
pub struct IntervalIndex {
    /// Set names in declared order.
    names: Vec<String>,
    /// Interval trees by canonical chromosome name.
    trees: HashMap<String, IntervalTree>,
}

impl IntervalIndex {
    /// Build the index from named region sets; the sets are immutable afterwards.
    pub fn load(sets: IndexMap<String, Vec<Region>>) -> Result<Self, ConfigurationError> {
        let before_building = Instant::now();
        let mut result = Self::default();
        for (set_idx, (name, regions)) in sets.into_iter().enumerate() {
            for region in regions {
                if region.end < region.start {
                    return Err(ConfigurationError::MalformedRegion {
                        name,
                        chrom: region.chrom,
                        start: region.start,
                        end: region.end,
                    });
                }
                if region.end == region.start {
                    continue;
                }
                result
                    .trees
                    .entry(canonicalize(&region.chrom))
                    .or_default()
                    .insert(region.start..region.end, set_idx);
            }
            result.names.push(name);
        }
        result.trees.values_mut().for_each(|tree| tree.index());
        tracing::debug!("done building itrees in {:?}", before_building.elapsed());

        Ok(result)
    }

    /// Names of the sets with a region containing 0-based `pos`, in declared order.
    pub fn query(&self, chrom: &str, pos: u64) -> Vec<&str> {
        let mut hits = match self.trees.get(&canonicalize(chrom)) {
            Some(tree) => tree
                .find(pos..(pos + 1))
                .iter()
                .map(|entry| *entry.data())
                .collect::<Vec<_>>(),
            None => Vec::new(),
        };
        hits.sort_unstable();
        hits.dedup();
        hits.into_iter().map(|i| self.names[i].as_str()).collect()
    }

    /// Whether `pos` on `chrom` lies in set `name`.
    pub fn contains(&self, name: &str, chrom: &str, pos: u64) -> bool {
        self.query(chrom, pos).contains(&name)
    }

    /// Names of the region sets.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Load the first three columns of a BED file, optionally gzip compressed.
#[tracing::instrument]
pub fn load_bed(path: &Path) -> Result<Vec<Region>, anyhow::Error> {
    tracing::debug!("loading regions from {:?}", path);
    let before_loading = Instant::now();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(open_read_maybe_gz(path)?);

    let mut result = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| anyhow::anyhow!("error reading {:?}: {}", path, e))?;
        let chrom = record.get(0).unwrap_or_default();
        if chrom.is_empty() || chrom.starts_with("track") || chrom.starts_with("browser") {
            continue;
        }
        let parse = |idx: usize| -> Result<u64, anyhow::Error> {
            let value = record.get(idx).unwrap_or_default();
            value.trim().parse::<u64>().map_err(|e| {
                anyhow::anyhow!("invalid coordinate {:?} in {:?}: {}", value, path, e)
            })
        };
        result.push(Region {
            chrom: chrom.to_string(),
            start: parse(1)?,
            end: parse(2)?,
        });
    }
    tracing::debug!(
        "done loading {} regions from {:?} in {:?}",
        result.len(),
        path,
        before_loading.elapsed()
    );

    Ok(result)
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::{IntervalIndex, Region};
    use crate::err::ConfigurationError;

    fn region(chrom: &str, start: u64, end: u64) -> Region {
        Region {
            chrom: chrom.to_string(),
            start,
            end,
        }
    }

    fn index() -> IntervalIndex {
        let mut sets = IndexMap::new();
        sets.insert(
            String::from("segdup"),
            vec![region("chr1", 100, 200), region("1", 150, 250)],
        );
        sets.insert(String::from("repeats"), vec![region("1", 0, 120)]);
        sets.insert(String::from("empty"), vec![region("1", 110, 110)]);
        IntervalIndex::load(sets).unwrap()
    }

    #[rstest::rstest]
    #[case("1", 99, vec!["repeats"])]
    #[case("chr1", 100, vec!["segdup", "repeats"])]
    #[case("1", 160, vec!["segdup"])]
    #[case("1", 250, vec![])]
    #[case("2", 100, vec![])]
    fn query(#[case] chrom: &str, #[case] pos: u64, #[case] expected: Vec<&str>) {
        assert_eq!(index().query(chrom, pos), expected);
    }

    #[test]
    fn contains() {
        let index = index();
        assert!(index.contains("segdup", "1", 199));
        assert!(!index.contains("segdup", "1", 99));
        assert_eq!(index.names(), &["segdup", "repeats", "empty"]);
    }

    #[test]
    fn malformed_region() {
        let mut sets = IndexMap::new();
        sets.insert(String::from("bad"), vec![region("1", 200, 100)]);
        assert_eq!(
            IntervalIndex::load(sets).unwrap_err(),
            ConfigurationError::MalformedRegion {
                name: String::from("bad"),
                chrom: String::from("1"),
                start: 200,
                end: 100,
            }
        );
    }

    #[test]
    fn load_bed() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("regions.bed");
        std::fs::write(
            &path,
            "track name=x\n# comment\nchr1\t10\t20\tname\nchr2\t5\t7\n",
        )?;

        assert_eq!(
            super::load_bed(&path)?,
            vec![region("chr1", 10, 20), region("chr2", 5, 7)]
        );

        Ok(())
    }
}
