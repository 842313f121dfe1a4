//! Primary and secondary cluster location from a cell histogram.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::{CellLabel, ClusterHistogram};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominantClusters {
    pub primary: CellLabel,
    pub primary_count: u64,
    pub secondary: CellLabel,
    pub secondary_count: u64,
}

/// Cells ordered by descending count. The sort is stable, so equal counts
/// keep the fixed SW, S, SE, W, CENTER, E, NW, N, NE order.
pub fn ranked_cells(histogram: &ClusterHistogram) -> [CellLabel; 9] {
    let mut ranked = CellLabel::ALL;
    ranked.sort_by_key(|&label| Reverse(histogram[label]));
    ranked
}

/// The two highest-count cells. An all-zero histogram reports SW and S.
pub fn dominant_clusters(histogram: &ClusterHistogram) -> DominantClusters {
    let ranked = ranked_cells(histogram);
    DominantClusters {
        primary: ranked[0],
        primary_count: histogram[ranked[0]],
        secondary: ranked[1],
        secondary_count: histogram[ranked[1]],
    }
}
