//! Map submission aggregate
//!
//! A `Submission` can only be produced by [`SubmissionBuilder::build`], which
//! validates every field once. The aggregate is immutable afterwards.

use genji_common::models::{MedalThresholds, UserId};
use genji_common::{DifficultyGrade, Error, RankTable, Result};
use serde::Serialize;

/// Validated map submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    creator: UserId,
    map_code: String,
    map_name: String,
    checkpoints: u32,
    description: Option<String>,
    map_types: Vec<String>,
    mechanics: Vec<String>,
    restrictions: Vec<String>,
    guides: Vec<String>,
    medals: Option<MedalThresholds>,
    grade: DifficultyGrade,
    base_difficulty: f64,
}

impl Submission {
    pub fn builder() -> SubmissionBuilder {
        SubmissionBuilder::default()
    }

    pub fn creator(&self) -> UserId {
        self.creator
    }

    pub fn map_code(&self) -> &str {
        &self.map_code
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn checkpoints(&self) -> u32 {
        self.checkpoints
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn map_types(&self) -> &[String] {
        &self.map_types
    }

    pub fn mechanics(&self) -> &[String] {
        &self.mechanics
    }

    pub fn restrictions(&self) -> &[String] {
        &self.restrictions
    }

    /// Guide links as supplied, blanks included
    pub fn guides(&self) -> &[String] {
        &self.guides
    }

    /// Guide links that produce rows
    pub fn written_guides(&self) -> impl Iterator<Item = &str> {
        self.guides
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
    }

    pub fn medals(&self) -> Option<&MedalThresholds> {
        self.medals.as_ref()
    }

    pub fn grade(&self) -> &DifficultyGrade {
        &self.grade
    }

    /// Creator's initial difficulty rating
    pub fn base_difficulty(&self) -> f64 {
        self.base_difficulty
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionBuilder {
    creator: Option<UserId>,
    map_code: Option<String>,
    map_name: Option<String>,
    checkpoints: Option<i64>,
    description: Option<String>,
    map_types: Vec<String>,
    mechanics: Vec<String>,
    restrictions: Vec<String>,
    guides: Vec<String>,
    medals: MedalThresholds,
    difficulty: Option<String>,
}

impl SubmissionBuilder {
    pub fn creator(mut self, user_id: UserId) -> Self {
        self.creator = Some(user_id);
        self
    }

    pub fn map_code(mut self, code: impl Into<String>) -> Self {
        self.map_code = Some(code.into());
        self
    }

    pub fn map_name(mut self, name: impl Into<String>) -> Self {
        self.map_name = Some(name.into());
        self
    }

    pub fn checkpoints(mut self, checkpoints: i64) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn map_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn mechanics<I, S>(mut self, mechanics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mechanics.extend(mechanics.into_iter().map(Into::into));
        self
    }

    pub fn restrictions<I, S>(mut self, restrictions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restrictions.extend(restrictions.into_iter().map(Into::into));
        self
    }

    pub fn guides<I, S>(mut self, guides: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.guides.extend(guides.into_iter().map(Into::into));
        self
    }

    pub fn medals(mut self, medals: MedalThresholds) -> Self {
        self.medals = medals;
        self
    }

    /// Creator grade such as "Hard +"
    pub fn difficulty(mut self, grade: impl Into<String>) -> Self {
        self.difficulty = Some(grade.into());
        self
    }

    pub fn build(self, table: &RankTable) -> Result<Submission> {
        let creator = self.creator.ok_or_else(|| missing("creator"))?;
        let map_code = required(self.map_code, "map code")?.to_uppercase();
        let map_name = required(self.map_name, "map name")?;

        let checkpoints = self.checkpoints.ok_or_else(|| missing("checkpoints"))?;
        let checkpoints = u32::try_from(checkpoints)
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "checkpoints must be a positive number, got {}",
                    checkpoints
                ))
            })?;

        let grade = table.parse_grade(&required(self.difficulty, "difficulty")?)?;
        let base_difficulty = table.base_difficulty(&grade)?;

        let map_types = tags(self.map_types);
        if map_types.is_empty() {
            return Err(missing("map type"));
        }

        let medals = validate_medals(self.medals)?;

        Ok(Submission {
            creator,
            map_code,
            map_name,
            checkpoints,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            map_types,
            mechanics: tags(self.mechanics),
            restrictions: tags(self.restrictions),
            guides: dedup_keep_order(self.guides.into_iter().map(|g| g.trim().to_string())),
            medals,
            grade,
            base_difficulty,
        })
    }
}

fn missing(field: &str) -> Error {
    Error::InvalidInput(format!("submission is missing {}", field))
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(field))
}

/// Trimmed, non-blank, order kept, duplicates dropped
fn tags(values: Vec<String>) -> Vec<String> {
    dedup_keep_order(
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
    )
}

fn dedup_keep_order(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn validate_medals(medals: MedalThresholds) -> Result<Option<MedalThresholds>> {
    let set: Vec<(&str, f64)> = [
        ("gold", medals.gold),
        ("silver", medals.silver),
        ("bronze", medals.bronze),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name, v)))
    .collect();

    for (name, value) in &set {
        if !value.is_finite() || *value < 0.0 {
            return Err(Error::InvalidInput(format!(
                "{} time must be a non-negative number, got {}",
                name, value
            )));
        }
    }

    for pair in set.windows(2) {
        if pair[0].1 > pair[1].1 {
            return Err(Error::InvalidInput(format!(
                "{} time ({}) must not exceed {} time ({})",
                pair[0].0, pair[0].1, pair[1].0, pair[1].1
            )));
        }
    }

    Ok(medals.is_set().then_some(medals))
}
