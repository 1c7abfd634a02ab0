//! Read-back of an accepted submission

use genji_common::models::{Map, MedalThresholds, UserId};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{Error, Result};

/// A map row joined with everything written alongside it
#[derive(Debug, Clone, Serialize)]
pub struct MapInfo {
    #[serde(flatten)]
    pub map: Map,
    pub map_types: Vec<String>,
    pub mechanics: Vec<String>,
    pub restrictions: Vec<String>,
    pub creators: Vec<UserId>,
    pub guides: Vec<String>,
    /// Mean of every rating; `None` when nobody rated the map
    pub difficulty: Option<f64>,
    pub medals: Option<MedalThresholds>,
}

/// Load one map and its child rows from a single read snapshot
pub async fn map_info(pool: &SqlitePool, map_code: &str) -> Result<MapInfo> {
    let mut tx = pool.begin().await?;

    let map = sqlx::query_as::<_, Map>(
        "SELECT map_code, map_name, checkpoints, description, official, archived FROM maps WHERE map_code = ?",
    )
    .bind(map_code)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::not_found(format!("Map not found: {}", map_code)))?;

    let map_types = tags(
        &mut *tx,
        "SELECT map_type FROM map_types WHERE map_code = ? ORDER BY map_type",
        map_code,
    )
    .await?;
    let mechanics = tags(
        &mut *tx,
        "SELECT mechanic FROM map_mechanics WHERE map_code = ? ORDER BY mechanic",
        map_code,
    )
    .await?;
    let restrictions = tags(
        &mut *tx,
        "SELECT restriction FROM map_restrictions WHERE map_code = ? ORDER BY restriction",
        map_code,
    )
    .await?;
    let guides = tags(
        &mut *tx,
        "SELECT url FROM guides WHERE map_code = ? ORDER BY url",
        map_code,
    )
    .await?;

    let creators = sqlx::query_scalar::<_, UserId>(
        "SELECT user_id FROM map_creators WHERE map_code = ? ORDER BY user_id",
    )
    .bind(map_code)
    .fetch_all(&mut *tx)
    .await?;

    let difficulty = sqlx::query_scalar::<_, Option<f64>>(
        "SELECT AVG(difficulty) FROM map_ratings WHERE map_code = ?",
    )
    .bind(map_code)
    .fetch_one(&mut *tx)
    .await?;

    let medals = sqlx::query_as::<_, (Option<f64>, Option<f64>, Option<f64>)>(
        "SELECT gold, silver, bronze FROM map_medals WHERE map_code = ?",
    )
    .bind(map_code)
    .fetch_optional(&mut *tx)
    .await?
    .map(|(gold, silver, bronze)| MedalThresholds { gold, silver, bronze });

    tx.commit().await?;

    Ok(MapInfo {
        map,
        map_types,
        mechanics,
        restrictions,
        creators,
        guides,
        difficulty,
        medals,
    })
}

async fn tags(conn: &mut SqliteConnection, sql: &str, map_code: &str) -> Result<Vec<String>> {
    let values = sqlx::query_scalar::<_, String>(sql)
        .bind(map_code)
        .fetch_all(&mut *conn)
        .await?;
    Ok(values)
}
