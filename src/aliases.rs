//! Header alias tables: which raw spreadsheet headers map to which canonical
//! fields, per record kind.

use std::collections::HashSet;
use std::fmt;

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::text_norm::normalize_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Match,
    Performance,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Match => "match",
            RecordKind::Performance => "performance",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchField {
    Timestamp,
    Team,
    Opponent,
    Player,
    SuccessfulPasses,
    TotalPasses,
    TotalShots,
    TacklesOwnHalf,
    TacklesOpponentHalf,
    TotalTackles,
    Goals,
    Assists,
    Minutes,
    YellowCards,
    RedCards,
    Feedback,
}

impl MatchField {
    pub fn name(self) -> &'static str {
        match self {
            MatchField::Timestamp => "Timestamp",
            MatchField::Team => "Team",
            MatchField::Opponent => "Opponent",
            MatchField::Player => "Player",
            MatchField::SuccessfulPasses => "Successful_Passes",
            MatchField::TotalPasses => "Total_Passes",
            MatchField::TotalShots => "Total_Shots",
            MatchField::TacklesOwnHalf => "Tackles_Own_Half",
            MatchField::TacklesOpponentHalf => "Tackles_Opponent_Half",
            MatchField::TotalTackles => "Total_Tackles",
            MatchField::Goals => "Goals",
            MatchField::Assists => "Assists",
            MatchField::Minutes => "Minutes",
            MatchField::YellowCards => "Yellow_Cards",
            MatchField::RedCards => "Red_Cards",
            MatchField::Feedback => "Feedback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PerformanceField {
    Player,
    Exercise,
    Pr1,
    Pr2,
    Pr3,
    Pr4,
}

impl PerformanceField {
    pub fn name(self) -> &'static str {
        match self {
            PerformanceField::Player => "Player",
            PerformanceField::Exercise => "Exercise",
            PerformanceField::Pr1 => "PR1",
            PerformanceField::Pr2 => "PR2",
            PerformanceField::Pr3 => "PR3",
            PerformanceField::Pr4 => "PR4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Match(MatchField),
    Performance(PerformanceField),
}

impl CanonicalField {
    pub fn kind(self) -> RecordKind {
        match self {
            CanonicalField::Match(_) => RecordKind::Match,
            CanonicalField::Performance(_) => RecordKind::Performance,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Match(f) => f.name(),
            CanonicalField::Performance(f) => f.name(),
        }
    }

    pub fn player(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Match => CanonicalField::Match(MatchField::Player),
            RecordKind::Performance => CanonicalField::Performance(PerformanceField::Player),
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<MatchField> for CanonicalField {
    fn from(value: MatchField) -> Self {
        CanonicalField::Match(value)
    }
}

impl From<PerformanceField> for CanonicalField {
    fn from(value: PerformanceField) -> Self {
        CanonicalField::Performance(value)
    }
}

#[derive(Debug, Clone)]
pub struct AliasEntry {
    pub field: CanonicalField,
    pub variants: Vec<String>,
    // Same order as `variants`, already passed through `normalize_key`.
    keys: Vec<String>,
}

impl AliasEntry {
    fn new(field: CanonicalField, variants: &[&str]) -> Self {
        let variants: Vec<String> = variants.iter().map(|v| v.to_string()).collect();
        let mut keys: Vec<String> = Vec::with_capacity(variants.len());
        for variant in &variants {
            let key = normalize_key(variant);
            if !key.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        Self {
            field,
            variants,
            keys,
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn matches_key(&self, normalized: &str) -> bool {
        self.keys.iter().any(|k| k == normalized)
    }
}

/// Immutable alias dictionary for one record kind.
#[derive(Debug, Clone)]
pub struct AliasTable {
    kind: RecordKind,
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    /// Builds a table, rejecting duplicate canonical fields, fields of the
    /// wrong kind, and tables without a player field.
    pub fn new(kind: RecordKind, entries: &[(CanonicalField, &[&str])]) -> Result<Self> {
        let mut seen = HashSet::new();
        for (field, variants) in entries {
            if field.kind() != kind {
                return Err(anyhow!("field {field} does not belong to a {kind} table"));
            }
            if !seen.insert(*field) {
                return Err(anyhow!("duplicate canonical field {field} in {kind} table"));
            }
            if variants.iter().all(|v| normalize_key(v).is_empty()) {
                return Err(anyhow!("field {field} has no usable header variants"));
            }
        }
        if !seen.contains(&CanonicalField::player(kind)) {
            return Err(anyhow!("{kind} table has no player field"));
        }
        Ok(Self::build(kind, entries))
    }

    fn build(kind: RecordKind, entries: &[(CanonicalField, &[&str])]) -> Self {
        Self {
            kind,
            entries: entries
                .iter()
                .map(|(field, variants)| AliasEntry::new(*field, variants))
                .collect(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn player_field(&self) -> CanonicalField {
        CanonicalField::player(self.kind)
    }

    /// Canonical field whose variants include this already-normalized header.
    pub fn field_for_key(&self, normalized: &str) -> Option<CanonicalField> {
        if normalized.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.matches_key(normalized))
            .map(|entry| entry.field)
    }
}

const MATCH_ALIASES: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::Match(MatchField::Timestamp), &["tidsstempel"]),
    (
        CanonicalField::Match(MatchField::Team),
        &["kamp - hvilket hold spillede du for"],
    ),
    (
        CanonicalField::Match(MatchField::Opponent),
        &["modstanderen (hvem spillede du mod)"],
    ),
    (CanonicalField::Match(MatchField::Player), &["navn (fulde navn)"]),
    (
        CanonicalField::Match(MatchField::SuccessfulPasses),
        &["#succesfulde pasninger /indlæg"],
    ),
    (
        CanonicalField::Match(MatchField::TotalPasses),
        &["#total pasninger/indlæg (succesfulde + ikke succesfulde)"],
    ),
    (
        CanonicalField::Match(MatchField::TotalShots),
        &["#total afslutninger"],
    ),
    (
        CanonicalField::Match(MatchField::TacklesOwnHalf),
        &["#succesfulde erobringer på egen bane"],
    ),
    (
        CanonicalField::Match(MatchField::TacklesOpponentHalf),
        &["#succesfulde erobringer på deres bane"],
    ),
    (
        CanonicalField::Match(MatchField::TotalTackles),
        &["#total succesfulde erobringer (egen + deres bane)"],
    ),
    (CanonicalField::Match(MatchField::Goals), &["mål"]),
    (CanonicalField::Match(MatchField::Assists), &["assist"]),
    (CanonicalField::Match(MatchField::Minutes), &["spilleminutter"]),
    (CanonicalField::Match(MatchField::YellowCards), &["gule kort"]),
    (CanonicalField::Match(MatchField::RedCards), &["røde kort"]),
    (
        CanonicalField::Match(MatchField::Feedback),
        &["hvad vil du gøre bedre i næste kamp ?"],
    ),
];

const PERFORMANCE_ALIASES: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Performance(PerformanceField::Player),
        &["navn", "name"],
    ),
    (
        CanonicalField::Performance(PerformanceField::Exercise),
        &["øvelse", "ovelse", "exercise"],
    ),
    (
        CanonicalField::Performance(PerformanceField::Pr1),
        &["1.pr", "1. pr", "1 pr", "pr1"],
    ),
    (
        CanonicalField::Performance(PerformanceField::Pr2),
        &["2.pr", "2. pr", "2 pr", "pr2"],
    ),
    (
        CanonicalField::Performance(PerformanceField::Pr3),
        &["3.pr", "3. pr", "3 pr", "pr3"],
    ),
    (
        CanonicalField::Performance(PerformanceField::Pr4),
        &["4. pr", "4.pr", "4 pr", "pr4"],
    ),
];

static MATCH_TABLE: Lazy<AliasTable> =
    Lazy::new(|| AliasTable::build(RecordKind::Match, MATCH_ALIASES));
static PERFORMANCE_TABLE: Lazy<AliasTable> =
    Lazy::new(|| AliasTable::build(RecordKind::Performance, PERFORMANCE_ALIASES));

pub fn default_match_table() -> &'static AliasTable {
    &MATCH_TABLE
}

pub fn default_performance_table() -> &'static AliasTable {
    &PERFORMANCE_TABLE
}

/// The pair of tables a classifier runs against.
#[derive(Debug, Clone, Copy)]
pub struct AliasTables<'a> {
    pub matches: &'a AliasTable,
    pub performance: &'a AliasTable,
}

impl<'a> AliasTables<'a> {
    pub fn new(matches: &'a AliasTable, performance: &'a AliasTable) -> Self {
        Self {
            matches,
            performance,
        }
    }

    pub fn for_kind(&self, kind: RecordKind) -> &'a AliasTable {
        match kind {
            RecordKind::Match => self.matches,
            RecordKind::Performance => self.performance,
        }
    }
}

impl Default for AliasTables<'static> {
    fn default() -> Self {
        Self::new(default_match_table(), default_performance_table())
    }
}
