//! Difficulty scale, rank buckets and creator difficulty grades
//!
//! The difficulty scale runs from 0.0 to 10.0 and is cut into seven named
//! buckets. Bucket 0 (Beginner) is the automatic entry tier: it never needs a
//! threshold and its maps never count toward a rank. Buckets 1..=6 are walked
//! in order by the rank calculator.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of the difficulty scale (inclusive)
pub const MAX_DIFFICULTY: f64 = 10.0;

/// One named range of the difficulty scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Position on the ladder. 0 is the automatic tier.
    pub index: usize,
    /// Display name ("Very Hard")
    pub name: String,
    /// Inclusive lower bound
    pub lower: f64,
    /// Exclusive upper bound (inclusive for the top bucket)
    pub upper: f64,
    /// Completions required to clear this bucket (ignored for index 0)
    pub threshold: u32,
}

impl Bucket {
    fn new(index: usize, name: &str, lower: f64, upper: f64, threshold: u32) -> Self {
        Self {
            index,
            name: name.to_string(),
            lower,
            upper,
            threshold,
        }
    }
}

/// Ordered bucket table driving classification and rank calculation
///
/// Index 0 is the automatic tier; `ranked()` yields the remaining buckets in
/// increasing difficulty order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RankTable {
    buckets: Vec<Bucket>,
}

impl Default for RankTable {
    fn default() -> Self {
        Self {
            buckets: vec![
                Bucket::new(0, "Beginner", 0.0, 0.59, 0),
                Bucket::new(1, "Easy", 0.59, 2.35, 10),
                Bucket::new(2, "Medium", 2.35, 4.12, 10),
                Bucket::new(3, "Hard", 4.12, 5.88, 10),
                Bucket::new(4, "Very Hard", 5.88, 7.65, 10),
                Bucket::new(5, "Extreme", 7.65, 9.41, 5),
                Bucket::new(6, "Hell", 9.41, MAX_DIFFICULTY, 2),
            ],
        }
    }
}

impl<'de> Deserialize<'de> for RankTable {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let buckets = Vec::<Bucket>::deserialize(deserializer)?;
        RankTable::new(buckets).map_err(serde::de::Error::custom)
    }
}

impl RankTable {
    /// Build a table, validating ordering and coverage
    ///
    /// Buckets must be indexed 0..n in order, contiguous, ascending, and every
    /// ranked bucket needs a non-zero threshold.
    pub fn new(buckets: Vec<Bucket>) -> Result<Self> {
        if buckets.len() < 2 {
            return Err(Error::Config(
                "rank table needs an entry tier and at least one ranked bucket".to_string(),
            ));
        }

        for (position, bucket) in buckets.iter().enumerate() {
            if bucket.index != position {
                return Err(Error::Config(format!(
                    "bucket '{}' has index {} but is at position {}",
                    bucket.name, bucket.index, position
                )));
            }
            if bucket.lower >= bucket.upper {
                return Err(Error::Config(format!(
                    "bucket '{}' has an empty range [{}, {})",
                    bucket.name, bucket.lower, bucket.upper
                )));
            }
            if position > 0 && bucket.threshold == 0 {
                return Err(Error::Config(format!(
                    "ranked bucket '{}' needs a non-zero threshold",
                    bucket.name
                )));
            }
        }

        for pair in buckets.windows(2) {
            if (pair[0].upper - pair[1].lower).abs() > f64::EPSILON {
                return Err(Error::Config(format!(
                    "buckets '{}' and '{}' are not contiguous",
                    pair[0].name, pair[1].name
                )));
            }
        }

        Ok(Self { buckets })
    }

    /// All buckets including the entry tier
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Ranked buckets in increasing difficulty, entry tier excluded
    pub fn ranked(&self) -> &[Bucket] {
        &self.buckets[1..]
    }

    /// Highest reachable rank
    pub fn max_rank(&self) -> usize {
        self.buckets.len() - 1
    }

    /// Classify a mean difficulty into a ranked bucket
    ///
    /// Values in the entry tier or off the scale return `None`.
    pub fn classify(&self, difficulty: f64) -> Option<&Bucket> {
        let last = self.buckets.len() - 1;
        self.ranked().iter().find(|b| {
            difficulty >= b.lower
                && (difficulty < b.upper || (b.index == last && difficulty <= b.upper))
        })
    }

    pub fn bucket_named(&self, name: &str) -> Option<&Bucket> {
        self.buckets
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Parse a creator grade such as "Hard +", "Very Hard" or "Easy -"
    pub fn parse_grade(&self, raw: &str) -> Result<DifficultyGrade> {
        let trimmed = raw.trim();
        let (name, modifier) = if let Some(rest) = trimmed.strip_suffix('+') {
            (rest, GradeModifier::Plus)
        } else if let Some(rest) = trimmed.strip_suffix('-') {
            (rest, GradeModifier::Minus)
        } else {
            (trimmed, GradeModifier::Flat)
        };

        let bucket = self
            .bucket_named(name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown difficulty '{}'", raw)))?;

        Ok(DifficultyGrade {
            bucket: bucket.name.clone(),
            modifier,
        })
    }

    /// Numeric base difficulty stored for a creator's initial rating
    pub fn base_difficulty(&self, grade: &DifficultyGrade) -> Result<f64> {
        let bucket = self.bucket_named(&grade.bucket).ok_or_else(|| {
            Error::InvalidInput(format!("unknown difficulty '{}'", grade.bucket))
        })?;
        let third = (bucket.upper - bucket.lower) / 3.0;
        let offset = match grade.modifier {
            GradeModifier::Minus => 0.0,
            GradeModifier::Flat => third,
            GradeModifier::Plus => third * 2.0,
        };
        Ok(((bucket.lower + offset) * 100.0).round() / 100.0)
    }
}

/// Position inside a bucket chosen by the creator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeModifier {
    Minus,
    Flat,
    Plus,
}

/// Creator-facing difficulty label, e.g. "Extreme +"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyGrade {
    pub bucket: String,
    pub modifier: GradeModifier,
}

impl fmt::Display for DifficultyGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            GradeModifier::Minus => write!(f, "{} -", self.bucket),
            GradeModifier::Flat => write!(f, "{}", self.bucket),
            GradeModifier::Plus => write!(f, "{} +", self.bucket),
        }
    }
}
