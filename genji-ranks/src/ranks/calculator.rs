//! Rank calculation
//!
//! Walks the ranked buckets in increasing difficulty. Each bucket whose
//! completion count meets its threshold adds one rank; the walk stops at the
//! first bucket that falls short, so ranks are always gapless. The plus
//! sub-tier follows the same walk using gold counts, and only keeps climbing
//! while every earlier bucket also passed the gold test.

use genji_common::RankTable;
use serde::Serialize;

use super::aggregator::CompletionCounts;

/// Computed tier and plus sub-tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankPair {
    pub rank: u32,
    pub rank_plus: u32,
}

impl RankPair {
    pub fn new(rank: u32, rank_plus: u32) -> Self {
        Self { rank, rank_plus }
    }

    /// Whether this pair matches the cached row values
    pub fn matches(&self, rank: i64, rank_plus: i64) -> bool {
        i64::from(self.rank) == rank && i64::from(self.rank_plus) == rank_plus
    }
}

pub fn calculate(counts: &CompletionCounts, table: &RankTable) -> RankPair {
    let mut pair = RankPair::default();

    for bucket in table.ranked() {
        let Some(bucket_counts) = counts.get(&bucket.name) else {
            break;
        };
        if bucket_counts.completions < bucket.threshold {
            break;
        }

        pair.rank += 1;
        if pair.rank_plus + 1 == pair.rank && bucket_counts.gold >= bucket.threshold {
            pair.rank_plus += 1;
        }
    }

    pair
}
