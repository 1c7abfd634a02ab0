//! Completion aggregation
//!
//! Turns a player's completion records into per-bucket counts of completions
//! and medals. One statement per call, so each result is a single snapshot.

use futures::TryStreamExt;
use genji_common::models::{Medal, MedalThresholds, UserId};
use genji_common::RankTable;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::Result;

/// Completion and medal counts for one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub completions: u32,
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
}

impl BucketCounts {
    pub fn new(completions: u32, gold: u32, silver: u32, bronze: u32) -> Self {
        Self {
            completions,
            gold,
            silver,
            bronze,
        }
    }

    fn record(&mut self, medal: Option<Medal>) {
        self.completions += 1;
        match medal {
            Some(Medal::Gold) => self.gold += 1,
            Some(Medal::Silver) => self.silver += 1,
            Some(Medal::Bronze) => self.bronze += 1,
            None => {}
        }
    }
}

/// Bucket name to counts, holding only buckets with at least one completion
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CompletionCounts {
    buckets: BTreeMap<String, BucketCounts>,
}

impl CompletionCounts {
    pub fn get(&self, bucket: &str) -> Option<&BucketCounts> {
        self.buckets.get(bucket)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BucketCounts)> {
        self.buckets.iter().map(|(name, counts)| (name.as_str(), counts))
    }
}

impl<S: Into<String>> FromIterator<(S, BucketCounts)> for CompletionCounts {
    fn from_iter<I: IntoIterator<Item = (S, BucketCounts)>>(iter: I) -> Self {
        Self {
            buckets: iter
                .into_iter()
                .map(|(name, counts)| (name.into(), counts))
                .collect(),
        }
    }
}

/// Best completion of one map by one player
#[derive(Debug, sqlx::FromRow)]
struct CompletionRow {
    map_code: String,
    time: f64,
    difficulty: Option<f64>,
    gold: Option<f64>,
    silver: Option<f64>,
    bronze: Option<f64>,
}

/// Aggregate a player's qualifying completions by difficulty bucket
///
/// Only official, non-archived maps count. A map with no ratings, or whose mean
/// difficulty falls in the entry tier, is skipped.
pub async fn aggregate(
    pool: &SqlitePool,
    table: &RankTable,
    user_id: UserId,
) -> Result<CompletionCounts> {
    let mut rows = sqlx::query_as::<_, CompletionRow>(
        r#"
        SELECT
            r.map_code AS map_code,
            MIN(r.time) AS time,
            (SELECT AVG(mr.difficulty) FROM map_ratings mr WHERE mr.map_code = r.map_code) AS difficulty,
            mm.gold AS gold,
            mm.silver AS silver,
            mm.bronze AS bronze
        FROM records r
        JOIN maps m ON m.map_code = r.map_code
        LEFT JOIN map_medals mm ON mm.map_code = r.map_code
        WHERE r.user_id = ?
          AND m.official = 1
          AND m.archived = 0
        GROUP BY r.map_code
        "#,
    )
    .bind(user_id)
    .fetch(pool);

    let mut counts = CompletionCounts::default();

    while let Some(row) = rows.try_next().await? {
        let Some(bucket) = row.difficulty.and_then(|d| table.classify(d)) else {
            debug!(user_id, map_code = %row.map_code, "Completion outside ranked buckets");
            continue;
        };

        let medals = MedalThresholds {
            gold: row.gold,
            silver: row.silver,
            bronze: row.bronze,
        };

        counts
            .buckets
            .entry(bucket.name.clone())
            .or_default()
            .record(medals.classify(row.time));
    }

    debug!(user_id, buckets = counts.len(), "Completions aggregated");
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genji_common::db::init_memory_database;

    async fn seed_map(pool: &SqlitePool, code: &str, difficulty: f64, official: bool) {
        sqlx::query("INSERT INTO maps (map_code, map_name, checkpoints, official) VALUES (?, ?, 10, ?)")
            .bind(code)
            .bind(format!("Map {}", code))
            .bind(official)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO map_ratings (map_code, user_id, difficulty) VALUES (?, 100, ?)")
            .bind(code)
            .bind(difficulty)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn seed_record(pool: &SqlitePool, user_id: UserId, code: &str, time: f64) {
        sqlx::query("INSERT INTO records (user_id, map_code, time) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(code)
            .bind(time)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn setup() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        for (id, name) in [(100, "rater"), (1, "runner")] {
            sqlx::query("INSERT INTO users (user_id, nickname) VALUES (?, ?)")
                .bind(id)
                .bind(name)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn test_no_completions_is_empty() {
        let pool = setup().await;
        let counts = aggregate(&pool, &RankTable::default(), 1).await.unwrap();
        assert!(counts.is_empty());
    }

    #[tokio::test]
    async fn test_counts_by_bucket_with_medals() {
        let pool = setup().await;
        seed_map(&pool, "EASY1", 1.0, true).await;
        seed_map(&pool, "EASY2", 2.0, true).await;
        seed_map(&pool, "HARD1", 5.0, true).await;
        sqlx::query("INSERT INTO map_medals (map_code, gold, silver, bronze) VALUES ('EASY1', 10, 20, 30)")
            .execute(&pool)
            .await
            .unwrap();

        seed_record(&pool, 1, "EASY1", 15.0).await;
        seed_record(&pool, 1, "EASY2", 99.0).await;
        seed_record(&pool, 1, "HARD1", 50.0).await;

        let counts = aggregate(&pool, &RankTable::default(), 1).await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("Easy"), Some(&BucketCounts::new(2, 0, 1, 0)));
        assert_eq!(counts.get("Hard"), Some(&BucketCounts::new(1, 0, 0, 0)));
        assert!(counts.get("Medium").is_none());
    }

    #[tokio::test]
    async fn test_best_time_decides_medal() {
        let pool = setup().await;
        seed_map(&pool, "EASY1", 1.0, true).await;
        sqlx::query("INSERT INTO map_medals (map_code, gold, silver, bronze) VALUES ('EASY1', 10, 20, 30)")
            .execute(&pool)
            .await
            .unwrap();

        seed_record(&pool, 1, "EASY1", 25.0).await;
        seed_record(&pool, 1, "EASY1", 9.5).await;

        let counts = aggregate(&pool, &RankTable::default(), 1).await.unwrap();
        assert_eq!(counts.get("Easy"), Some(&BucketCounts::new(1, 1, 0, 0)));
    }

    #[tokio::test]
    async fn test_unofficial_archived_and_beginner_maps_excluded() {
        let pool = setup().await;
        seed_map(&pool, "UNOFF", 1.0, false).await;
        seed_map(&pool, "ARCH", 1.0, true).await;
        seed_map(&pool, "BEGIN", 0.3, true).await;
        sqlx::query("UPDATE maps SET archived = 1 WHERE map_code = 'ARCH'")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO maps (map_code, map_name, checkpoints, official) VALUES ('NORATE', 'x', 1, 1)")
            .execute(&pool)
            .await
            .unwrap();

        for code in ["UNOFF", "ARCH", "BEGIN", "NORATE"] {
            seed_record(&pool, 1, code, 10.0).await;
        }

        let counts = aggregate(&pool, &RankTable::default(), 1).await.unwrap();
        assert!(counts.is_empty());
    }

    #[tokio::test]
    async fn test_mean_rating_drives_bucket() {
        let pool = setup().await;
        seed_map(&pool, "MIXED", 1.0, true).await;
        sqlx::query("INSERT INTO map_ratings (map_code, user_id, difficulty) VALUES ('MIXED', 1, 5.0)")
            .execute(&pool)
            .await
            .unwrap();
        seed_record(&pool, 1, "MIXED", 10.0).await;

        // mean of 1.0 and 5.0 is 3.0
        let counts = aggregate(&pool, &RankTable::default(), 1).await.unwrap();
        assert_eq!(counts.get("Medium").map(|c| c.completions), Some(1));
    }
}
