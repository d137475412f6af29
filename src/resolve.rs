//! Cell-centered to vertex-centered scalar conversion

use crate::accumulate::HEX_ARITY;

/// added to every incidence count so vertices without any cell divide by a non-zero value
pub const INCIDENCE_EPSILON: f64 = 1e-20;

/// Average the scalars of every cell incident to each vertex.
///
/// `hex_indices` holds [`HEX_ARITY`] global vertex indices per cell and `cell_scalars` one value
/// per cell. The result has one value per vertex: the unweighted mean over the cells that use
/// it, or exactly `0.0` for a vertex used by no cell.
///
/// # Panics
///
/// if an index is not below `vertex_count` or there are fewer scalars than cells. Both are
/// guaranteed by [`HexAccumulator`](crate::HexAccumulator).
pub fn cell_to_vertex(
    vertex_count: usize,
    hex_indices: &[usize],
    cell_scalars: &[f64],
) -> Vec<f32> {
    let mut sum = vec![0f64; vertex_count];
    let mut count = vec![0f64; vertex_count];

    for (cell, hex) in hex_indices.chunks_exact(HEX_ARITY).enumerate() {
        let value = cell_scalars[cell];
        for &vertex in hex {
            sum[vertex] += value;
            count[vertex] += 1.;
        }
    }

    sum.into_iter()
        .zip(count)
        .map(|(sum, count)| (sum / (count + INCIDENCE_EPSILON)) as f32)
        .collect()
}

/// number of vertices not referenced by any cell
pub fn isolated_vertices(vertex_count: usize, hex_indices: &[usize]) -> usize {
    let mut used = vec![false; vertex_count];
    hex_indices.iter().for_each(|&vertex| used[vertex] = true);
    used.into_iter().filter(|used| !used).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_vertex_is_averaged() {
        // two hexes sharing the face 4..8 of the first / 0..4 of the second
        let hexes = [0, 1, 2, 3, 4, 5, 6, 7, 4, 5, 6, 7, 8, 9, 10, 11];
        let values = cell_to_vertex(12, &hexes, &[3.0, 7.0]);

        assert_eq!(values.len(), 12);
        assert_eq!(values[0], 3.0);
        assert_eq!(values[4], 5.0);
        assert_eq!(values[7], 5.0);
        assert_eq!(values[11], 7.0);
    }

    #[test]
    fn unreferenced_vertex_is_zero() {
        let hexes = [0, 1, 2, 3, 4, 5, 6, 7];
        let values = cell_to_vertex(10, &hexes, &[42.0]);

        assert_eq!(values[8], 0.0);
        assert_eq!(values[9], 0.0);
        assert_eq!(values[3], 42.0);
        assert_eq!(isolated_vertices(10, &hexes), 2);
    }

    #[test]
    fn repeated_vertex_in_one_cell_counts_twice() {
        // degenerate hex collapsing vertex 0 onto itself
        let hexes = [0, 0, 1, 2, 3, 4, 5, 6, 0, 7, 8, 9, 10, 11, 12, 13];
        let values = cell_to_vertex(14, &hexes, &[1.0, 4.0]);

        // (1 + 1 + 4) / 3
        assert_eq!(values[0], 2.0);
    }

    #[test]
    fn negative_values_average() {
        let hexes = [0, 1, 2, 3, 4, 5, 6, 7, 0, 1, 2, 3, 8, 9, 10, 11];
        let values = cell_to_vertex(12, &hexes, &[-2.0, 1.0]);
        assert_eq!(values[0], -0.5);
        assert_eq!(values[8], 1.0);
    }

    #[test]
    fn no_cells() {
        let values = cell_to_vertex(3, &[], &[]);
        assert_eq!(values, vec![0.0; 3]);
        assert_eq!(isolated_vertices(3, &[]), 3);
    }
}
