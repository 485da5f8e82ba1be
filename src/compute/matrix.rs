//! Weighted directed interaction matrix and its on-disk format.

use std::path::Path;

/// Square matrix of interaction weights in [-1, 1]; zero means no edge.
///
/// Stored row-major: entry `(i, j)` is the effect of species `i` on `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    size: usize,
    weights: Vec<f64>,
}

impl InteractionMatrix {
    /// All-zero matrix of the given side.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            weights: vec![0.0; size * size],
        }
    }

    /// Build from rows; returns `None` unless the rows form a square.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return None;
        }
        Some(Self {
            size,
            weights: rows.into_iter().flatten().collect(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.weights[i * self.size + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.weights[i * self.size + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.weights[i * self.size..(i + 1) * self.size]
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    /// True when there is no edge at all (a "dead" network).
    pub fn is_degenerate(&self) -> bool {
        self.weights.iter().all(|&w| w == 0.0)
    }

    /// Number of nonzero off-diagonal entries.
    pub fn edge_count(&self) -> usize {
        (0..self.size)
            .flat_map(|i| (0..self.size).map(move |j| (i, j)))
            .filter(|&(i, j)| i != j && self.get(i, j) != 0.0)
            .count()
    }

    /// Fraction of possible off-diagonal edges that are present.
    pub fn connectance(&self) -> f64 {
        let possible = self.size * self.size.saturating_sub(1);
        if possible == 0 {
            return 0.0;
        }
        self.edge_count() as f64 / possible as f64
    }

    /// Write one comma-separated row per line. The file is flushed and
    /// closed before this returns.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        for i in 0..self.size {
            writer.write_record(self.row(i).iter().map(|w| w.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_matrix(path: &Path) -> InteractionMatrix {
        let rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap()
            .records()
            .map(|record| {
                record
                    .unwrap()
                    .iter()
                    .map(|field| field.parse::<f64>().unwrap())
                    .collect()
            })
            .collect();
        InteractionMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_zeros_is_degenerate() {
        let matrix = InteractionMatrix::zeros(4);
        assert!(matrix.is_degenerate());
        assert_eq!(matrix.connectance(), 0.0);
    }

    #[test]
    fn test_connectance_ignores_diagonal() {
        let mut matrix = InteractionMatrix::zeros(3);
        matrix.set(0, 0, 0.5);
        matrix.set(0, 1, -0.25);
        matrix.set(2, 1, 1.0);
        assert_eq!(matrix.edge_count(), 2);
        assert!((matrix.connectance() - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_rows_requires_square() {
        assert!(InteractionMatrix::from_rows(vec![vec![0.0, 1.0]]).is_none());
        let matrix = InteractionMatrix::from_rows(vec![vec![0.0, 1.0], vec![-1.0, 0.0]]).unwrap();
        assert_eq!(matrix.get(1, 0), -1.0);
    }

    #[test]
    fn test_csv_file_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("interaction_matrix.dat");

        let matrix =
            InteractionMatrix::from_rows(vec![vec![0.0, 0.25], vec![-0.5, 0.0]]).unwrap();
        matrix.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "0,0.25\n-0.5,0\n");

        let loaded = read_matrix(&path);
        assert_eq!(loaded, matrix);
    }
}
