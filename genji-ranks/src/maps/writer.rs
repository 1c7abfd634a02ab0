//! Submission persistence
//!
//! Writes every row of a submission inside the caller's transaction. Nothing
//! here commits; a failing group leaves the transaction to roll back on drop.

use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use super::submission::Submission;
use crate::error::{Error, Result};

/// Rows written for one accepted submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub map_code: String,
    pub official: bool,
    pub base_difficulty: f64,
    pub guides_written: usize,
    pub medals_written: bool,
    pub cooldown_recorded: bool,
}

/// Insert all submission rows, in dependency order
pub async fn write_submission(
    conn: &mut SqliteConnection,
    submission: &Submission,
    privileged: bool,
) -> Result<SubmissionReceipt> {
    let code = submission.map_code();

    sqlx::query(
        "INSERT INTO maps (map_code, map_name, checkpoints, description, official) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(code)
    .bind(submission.map_name())
    .bind(i64::from(submission.checkpoints()))
    .bind(submission.description())
    .bind(privileged)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::Common(genji_common::Error::from_write(e, &format!("Map {}", code))))?;

    insert_tags(conn, "map_types", "map_type", code, submission.map_types()).await?;
    insert_tags(conn, "map_mechanics", "mechanic", code, submission.mechanics()).await?;
    insert_tags(conn, "map_restrictions", "restriction", code, submission.restrictions()).await?;

    sqlx::query("INSERT INTO map_creators (map_code, user_id) VALUES (?, ?)")
        .bind(code)
        .bind(submission.creator())
        .execute(&mut *conn)
        .await?;

    sqlx::query("INSERT INTO map_ratings (map_code, user_id, difficulty) VALUES (?, ?, ?)")
        .bind(code)
        .bind(submission.creator())
        .bind(submission.base_difficulty())
        .execute(&mut *conn)
        .await?;

    let guides: Vec<&str> = submission.written_guides().collect();
    if !guides.is_empty() {
        let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO guides (map_code, url) ");
        query.push_values(&guides, |mut row, url| {
            row.push_bind(code).push_bind(*url);
        });
        query.build().execute(&mut *conn).await?;
    }

    if let Some(medals) = submission.medals() {
        sqlx::query("INSERT INTO map_medals (map_code, gold, silver, bronze) VALUES (?, ?, ?, ?)")
            .bind(code)
            .bind(medals.gold)
            .bind(medals.silver)
            .bind(medals.bronze)
            .execute(&mut *conn)
            .await?;
    }

    if !privileged {
        sqlx::query(
            "INSERT INTO map_submission_dates (user_id, map_code, submitted_at) VALUES (?, ?, ?)",
        )
        .bind(submission.creator())
        .bind(code)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    }

    debug!(map_code = %code, guides = guides.len(), "Submission rows written");

    Ok(SubmissionReceipt {
        map_code: code.to_string(),
        official: privileged,
        base_difficulty: submission.base_difficulty(),
        guides_written: guides.len(),
        medals_written: submission.medals().is_some(),
        cooldown_recorded: !privileged,
    })
}

/// Batch insert `(map_code, column)` rows
async fn insert_tags(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    code: &str,
    values: &[String],
) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }

    let mut query =
        QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (map_code, {}) ", table, column));
    query.push_values(values, |mut row, value| {
        row.push_bind(code).push_bind(value.as_str());
    });
    query.build().execute(&mut *conn).await?;
    Ok(())
}
