//! Grouping eligible rows into request batches
//!
//! Batching is plain partitioning: rows keep file order, rows without a
//! scientific name are skipped, and the last batch may be short.

use crate::dataset::{Dataset, Row};

/// One row scheduled for lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Row position in the dataset
    pub row: usize,
    /// Formatted scientific name sent to the service
    pub name: String,
    /// Formatted common name, used by sources with a search fallback
    pub common_name: Option<String>,
}

impl BatchEntry {
    fn from_row(row: Row<'_>) -> Option<Self> {
        let name = row.formatted_scientific_name();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            row: row.position(),
            name,
            common_name: row.formatted_common_name(),
        })
    }
}

/// A bounded group of entries submitted together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Zero-based batch number
    pub index: usize,
    pub entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Eligible rows of a dataset in file order
pub fn eligible_entries<'a>(dataset: &'a Dataset) -> impl Iterator<Item = BatchEntry> + 'a {
    dataset.rows().filter_map(BatchEntry::from_row)
}

/// Number of rows a run with `limit` will look up
pub fn eligible_count(dataset: &Dataset, limit: Option<usize>) -> usize {
    let eligible = dataset.rows().filter(Row::is_eligible).count();
    limit.map_or(eligible, |l| eligible.min(l))
}

/// Lazy iterator of batches over the first `limit` eligible rows
pub struct NameBatcher<I> {
    entries: I,
    batch_size: usize,
    next_index: usize,
}

impl<'a> NameBatcher<std::iter::Take<Box<dyn Iterator<Item = BatchEntry> + 'a>>> {
    /// `batch_size` of 0 is treated as 1
    pub fn new(dataset: &'a Dataset, batch_size: usize, limit: Option<usize>) -> Self {
        let entries: Box<dyn Iterator<Item = BatchEntry> + 'a> = Box::new(eligible_entries(dataset));
        Self::from_entries(entries.take(limit.unwrap_or(usize::MAX)), batch_size)
    }
}

impl<I: Iterator<Item = BatchEntry>> NameBatcher<I> {
    pub fn from_entries(entries: I, batch_size: usize) -> Self {
        Self {
            entries,
            batch_size: batch_size.max(1),
            next_index: 0,
        }
    }
}

impl<I: Iterator<Item = BatchEntry>> Iterator for NameBatcher<I> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let entries: Vec<BatchEntry> = self.entries.by_ref().take(self.batch_size).collect();
        if entries.is_empty() {
            return None;
        }
        let batch = Batch {
            index: self.next_index,
            entries,
        };
        self.next_index += 1;
        Some(batch)
    }
}

/// Total batches needed for `rows` entries
pub fn batch_count(rows: usize, batch_size: usize) -> usize {
    rows.div_ceil(batch_size.max(1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn dataset(rows: &[(&str, &str)]) -> Dataset {
        let mut csv = String::from("idx,food_com,food_sci\n");
        for (i, (com, sci)) in rows.iter().enumerate() {
            csv.push_str(&format!("{},{},{}\n", i + 1, com, sci));
        }
        Dataset::from_reader(csv.as_bytes(), "test.csv").unwrap()
    }

    #[test]
    fn test_partitions_in_order_with_short_tail() {
        let ds = dataset(&[
            ("a", "Genus one"),
            ("b", "Genus two"),
            ("c", "Genus three"),
            ("d", "Genus four"),
            ("e", "Genus five"),
        ]);
        let batches: Vec<Batch> = NameBatcher::new(&ds, 2, None).collect();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].index, 0);
        assert_eq!(batches[2].index, 2);
        assert_eq!(batches[2].len(), 1);
        let rows: Vec<usize> = batches.iter().flat_map(|b| b.entries.iter().map(|e| e.row)).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_skips_rows_without_scientific_name() {
        let ds = dataset(&[("a", "Genus one"), ("b", ""), ("c", "__"), ("d", "Genus_four")]);
        let entries: Vec<BatchEntry> = NameBatcher::new(&ds, 40, None)
            .flat_map(|b| b.entries)
            .collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].row, 3);
        assert_eq!(entries[1].name, "Genus four");
        assert_eq!(entries[1].common_name.as_deref(), Some("d"));
    }

    #[test]
    fn test_limit_counts_eligible_rows_only() {
        let ds = dataset(&[("a", ""), ("b", "Genus two"), ("c", ""), ("d", "Genus four"), ("e", "Genus five")]);
        let rows: Vec<usize> = NameBatcher::new(&ds, 1, Some(2))
            .flat_map(|b| b.entries.into_iter().map(|e| e.row))
            .collect();

        assert_eq!(rows, vec![1, 3]);
        assert_eq!(eligible_count(&ds, Some(2)), 2);
        assert_eq!(eligible_count(&ds, None), 3);
        assert_eq!(eligible_count(&ds, Some(10)), 3);
    }

    #[test]
    fn test_zero_batch_size_degrades_to_one() {
        let ds = dataset(&[("a", "Genus one"), ("b", "Genus two")]);
        assert_eq!(NameBatcher::new(&ds, 0, None).count(), 2);
    }

    #[test]
    fn test_batch_count() {
        assert_eq!(batch_count(0, 40), 0);
        assert_eq!(batch_count(40, 40), 1);
        assert_eq!(batch_count(41, 40), 2);
        assert_eq!(batch_count(3, 0), 3);
    }
}
