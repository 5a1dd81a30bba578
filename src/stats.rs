use crate::types::CrimeRecord;
use serde::Serialize;

/// Lowest and highest crime rank in a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankRange {
    pub min: f64,
    pub max: f64,
}

impl RankRange {
    /// Returned for an empty dataset. Not a real range: the scale built from
    /// it collapses every stop onto 0.
    pub const EMPTY: RankRange = RankRange { min: 0.0, max: 0.0 };
}

pub fn compute_min_max(records: &[CrimeRecord]) -> RankRange {
    let mut ranks = records.iter().map(|r| r.crime_rank);
    let Some(first) = ranks.next() else {
        return RankRange::EMPTY;
    };

    ranks.fold(RankRange { min: first, max: first }, |range, rank| RankRange {
        min: range.min.min(rank),
        max: range.max.max(rank),
    })
}
