//! Spatial hazard clustering over a 3×3 grid laid on each hazard area.
//!
//! Cell order is a fixed convention, bottom row first, west to east:
//!
//! ```text
//! +----+--------+----+
//! | NW |   N    | NE |
//! +----+--------+----+
//! | W  | CENTER | E  |
//! +----+--------+----+
//! | SW |   S    | SE |
//! +----+--------+----+
//! ```
//!
//! Labels are assigned by position in that sequence, never re-derived from
//! coordinates. The same sequence is the tie-break order when picking
//! dominant cells.

pub mod dominant;
pub mod grid;

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use dominant::{dominant_clusters, DominantClusters};
pub use grid::{cluster_histogram, grid_cells, hazard_total};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellLabel {
    #[serde(rename = "SW")]
    SouthWest,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "SE")]
    SouthEast,
    #[serde(rename = "W")]
    West,
    #[serde(rename = "CENTER")]
    Center,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "NW")]
    NorthWest,
    #[serde(rename = "N")]
    North,
    #[serde(rename = "NE")]
    NorthEast,
}

impl CellLabel {
    pub const ALL: [CellLabel; 9] = [
        CellLabel::SouthWest,
        CellLabel::South,
        CellLabel::SouthEast,
        CellLabel::West,
        CellLabel::Center,
        CellLabel::East,
        CellLabel::NorthWest,
        CellLabel::North,
        CellLabel::NorthEast,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short label, also the attribute field holding the cell's count.
    pub fn as_str(self) -> &'static str {
        match self {
            CellLabel::SouthWest => "SW",
            CellLabel::South => "S",
            CellLabel::SouthEast => "SE",
            CellLabel::West => "W",
            CellLabel::Center => "CENTER",
            CellLabel::East => "E",
            CellLabel::NorthWest => "NW",
            CellLabel::North => "N",
            CellLabel::NorthEast => "NE",
        }
    }
}

impl fmt::Display for CellLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CellLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellLabel::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown cell label '{s}'"))
    }
}

/// Hazard count per grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterHistogram(pub [u64; 9]);

impl ClusterHistogram {
    pub fn iter(&self) -> impl Iterator<Item = (CellLabel, u64)> + '_ {
        CellLabel::ALL.into_iter().zip(self.0.iter().copied())
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Index<CellLabel> for ClusterHistogram {
    type Output = u64;

    fn index(&self, label: CellLabel) -> &u64 {
        &self.0[label.index()]
    }
}

impl IndexMut<CellLabel> for ClusterHistogram {
    fn index_mut(&mut self, label: CellLabel) -> &mut u64 {
        &mut self.0[label.index()]
    }
}

impl fmt::Display for ClusterHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(l, n)| format!("{l}: {n}")).collect();
        f.write_str(&parts.join(", "))
    }
}
