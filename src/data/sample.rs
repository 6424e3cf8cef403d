//! Deterministic row sampling.

use super::Table;
use crate::error::{PlotlineError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::info;

/// Rows drawn from the dataset when no size is given.
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;

/// Sampling seed used when none is given.
pub const DEFAULT_SEED: u64 = 42;

/// Draw `sample_size` distinct rows from `table` using a seeded PRNG.
///
/// The result is a new table whose rows are in sampled order. The same table,
/// size and seed always give the same rows in the same order.
pub fn sample_rows(table: &Table, sample_size: usize, seed: u64) -> Result<Table> {
    if sample_size > table.len() {
        return Err(PlotlineError::Data(format!(
            "Cannot take a sample of {} rows from a dataset of {} rows",
            sample_size,
            table.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let indices = rand::seq::index::sample(&mut rng, table.len(), sample_size).into_vec();

    Ok(table.select(&indices))
}

/// Load a CSV file and sample it.
pub fn load_sample(path: &Path, sample_size: usize, seed: u64) -> Result<Table> {
    let table = Table::from_csv_path(path)?;
    let sample = sample_rows(&table, sample_size, seed)?;
    info!(
        "Sampled {} of {} rows from {} (seed {})",
        sample.len(),
        table.len(),
        path.display(),
        seed
    );
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Table {
        let rows: Vec<Vec<String>> = (0..n).map(|i| vec![i.to_string()]).collect();
        Table::new(["n"], rows)
    }

    fn values(table: &Table) -> Vec<String> {
        table.rows().iter().map(|r| r[0].to_string()).collect()
    }

    #[test]
    fn test_same_seed_same_rows() {
        let table = numbered(50);
        let a = sample_rows(&table, 10, DEFAULT_SEED).unwrap();
        let b = sample_rows(&table, 10, DEFAULT_SEED).unwrap();

        assert_eq!(a.len(), 10);
        assert_eq!(values(&a), values(&b));
    }

    #[test]
    fn test_rows_are_distinct() {
        let table = numbered(20);
        let sample = sample_rows(&table, 20, 7).unwrap();

        let mut seen = values(&sample);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn test_oversized_sample_fails() {
        let table = numbered(3);
        let err = sample_rows(&table, 4, DEFAULT_SEED).unwrap_err();
        assert!(matches!(err, PlotlineError::Data(_)));
    }

    #[test]
    fn test_zero_sample() {
        let table = numbered(3);
        assert!(sample_rows(&table, 0, DEFAULT_SEED).unwrap().is_empty());
    }

    #[test]
    fn test_load_sample_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.csv");
        std::fs::write(&path, "n\n1\n2\n3\n4\n").unwrap();

        let first = load_sample(&path, 2, 42).unwrap();
        let second = load_sample(&path, 2, 42).unwrap();
        assert_eq!(values(&first), values(&second));
    }
}
