//! Cosine similarity calculations

use ndarray::{Array1, ArrayView1, ArrayView2};

/// L2 norm of every row
pub fn row_norms(matrix: ArrayView2<'_, f32>) -> Array1<f32> {
    matrix.rows().into_iter().map(|row| row.dot(&row).sqrt()).collect()
}

/// Rank the rows of `matrix` by cosine distance to `query`
///
/// Returns up to `top_k` (row index, distance) pairs, nearest first. Equal
/// distances keep row order, so the result is deterministic for a fixed
/// matrix.
pub fn nearest_rows(
    matrix: ArrayView2<'_, f32>,
    norms: ArrayView1<'_, f32>,
    query: &[f32],
    top_k: usize,
) -> Vec<(usize, f64)> {
    if top_k == 0 || matrix.nrows() == 0 || matrix.ncols() != query.len() {
        return Vec::new();
    }

    let query_view = ArrayView1::from(query);
    let query_norm = query_view.dot(&query_view).sqrt();
    let dots = matrix.dot(&query_view);

    let mut ranked: Vec<(usize, f64)> = dots
        .iter()
        .zip(norms.iter())
        .enumerate()
        .map(|(row, (dot, norm))| {
            let similarity = if *norm == 0.0 || query_norm == 0.0 {
                0.0
            } else {
                (dot / (norm * query_norm)) as f64
            };
            (row, 1.0 - similarity)
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked.truncate(top_k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_nearest_rows_distance_range() {
        let matrix = array![[1.0f32, 2.0, 3.0], [-1.0, -2.0, -3.0], [0.0, 0.0, 0.0]];
        let norms = row_norms(matrix.view());

        let ranked = nearest_rows(matrix.view(), norms.view(), &[1.0, 2.0, 3.0], 3);

        assert_eq!(ranked[0].0, 0);
        assert!(ranked[0].1.abs() < 1e-6, "Identical direction should be at distance ~0.0");
        // Zero vectors have no direction
        assert_eq!(ranked[1].0, 2);
        assert!((ranked[1].1 - 1.0).abs() < 1e-6);
        assert_eq!(ranked[2].0, 1);
        assert!((ranked[2].1 - 2.0).abs() < 1e-6, "Opposite direction should be at distance ~2.0");
    }

    #[test]
    fn test_mismatched_dimensions() {
        let matrix = array![[1.0f32, 0.0]];
        let norms = row_norms(matrix.view());
        assert!(nearest_rows(matrix.view(), norms.view(), &[1.0, 0.0, 0.0], 1).is_empty());
    }

    #[test]
    fn test_nearest_rows() {
        let matrix = array![[0.0f32, 1.0, 0.0], [1.0, 0.0, 0.0], [0.8, 0.6, 0.0]];
        let norms = row_norms(matrix.view());

        let ranked = nearest_rows(matrix.view(), norms.view(), &[1.0, 0.0, 0.0], 2);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, 1);
        assert!(ranked[0].1.abs() < 1e-6);
        assert_eq!(ranked[1].0, 2);
    }

    #[test]
    fn test_nearest_rows_ties_keep_order() {
        let matrix = array![[1.0f32, 0.0], [2.0, 0.0], [0.0, 1.0]];
        let norms = row_norms(matrix.view());
        let ranked = nearest_rows(matrix.view(), norms.view(), &[1.0, 0.0], 3);
        let rows: Vec<usize> = ranked.iter().map(|r| r.0).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }
}
