//! Canonical column identifiers and their localized display names.
//!
//! Every stage addresses fields through [`Column`]; any name coming from outside the crate (CSV
//! headers, criterion columns in configuration) is mapped back to a [`Column`] by a
//! [`ColumnResolver`] bound to the active language. The tables are validated as total
//! bijections before use, so a resolver can never return a missing name.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};

/// Canonical field identifiers understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    EntryDate,
    ExitDate,
    Age,
    Gender,
    Department,
    Weekday,
    Hour,
    Duration,
    Interval,
}

impl Column {
    /// All canonical columns, in table order.
    pub const ALL: [Column; 9] = [
        Column::EntryDate,
        Column::ExitDate,
        Column::Age,
        Column::Gender,
        Column::Department,
        Column::Weekday,
        Column::Hour,
        Column::Duration,
        Column::Interval,
    ];

    /// Canonical identifier, also used as the English display name.
    pub fn canonical_id(self) -> &'static str {
        match self {
            Column::EntryDate => "entry_date",
            Column::ExitDate => "exit_date",
            Column::Age => "age",
            Column::Gender => "gender",
            Column::Department => "department",
            Column::Weekday => "weekday",
            Column::Hour => "hour",
            Column::Duration => "duration",
            Column::Interval => "interval",
        }
    }

    /// Parse a canonical identifier (exact match).
    pub fn from_canonical_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.canonical_id() == id)
    }

    /// Whether values of this column are discrete enough to be used as a group key.
    pub fn is_groupable(self) -> bool {
        matches!(
            self,
            Column::Gender | Column::Department | Column::Weekday | Column::Hour
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

const BUILTIN_TABLES: [(&str, [&str; 9]); 2] = [
    (
        "en",
        [
            "entry_date",
            "exit_date",
            "age",
            "gender",
            "department",
            "weekday",
            "hour",
            "duration",
            "interval",
        ],
    ),
    (
        "es",
        [
            "fecha_entrada",
            "fecha_salida",
            "edad",
            "sexo",
            "servicio",
            "dia_semana",
            "hora",
            "duracion",
            "intervalo",
        ],
    ),
];

/// Per-language mapping from [`Column`] to localized identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNameTable {
    languages: BTreeMap<String, Vec<String>>,
}

impl Default for ColumnNameTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ColumnNameTable {
    /// The built-in English/Spanish table.
    pub fn builtin() -> Self {
        let languages = BUILTIN_TABLES
            .iter()
            .map(|(code, names)| {
                (
                    (*code).to_string(),
                    names.iter().map(|n| (*n).to_string()).collect(),
                )
            })
            .collect();
        Self { languages }
    }

    /// Build a table from `language -> (canonical id -> localized name)` entries.
    ///
    /// The result is validated with [`Self::validate`].
    pub fn from_entries(
        entries: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> PipelineResult<Self> {
        let mut table = Self {
            languages: BTreeMap::new(),
        };
        table.merge(entries)?;
        Ok(table)
    }

    /// Add or replace languages from `language -> (canonical id -> localized name)` entries.
    pub fn with_overrides(
        mut self,
        entries: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> PipelineResult<Self> {
        self.merge(entries)?;
        Ok(self)
    }

    fn merge(&mut self, entries: &BTreeMap<String, BTreeMap<String, String>>) -> PipelineResult<()> {
        for (language, names) in entries {
            let mut slots: Vec<Option<String>> = vec![None; Column::ALL.len()];
            for (id, localized) in names {
                let column = Column::from_canonical_id(id)
                    .ok_or_else(|| PipelineError::UnknownField { name: id.clone() })?;
                slots[column.index()] = Some(localized.trim().to_string());
            }

            let mut row = Vec::with_capacity(slots.len());
            for (column, slot) in Column::ALL.into_iter().zip(slots) {
                match slot {
                    Some(name) => row.push(name),
                    None => {
                        return Err(PipelineError::IncompleteColumnTable {
                            language: language.clone(),
                            message: format!("missing name for '{}'", column.canonical_id()),
                        });
                    }
                }
            }
            self.languages.insert(language.clone(), row);
        }
        self.validate()
    }

    /// Check that every language maps every column to a distinct, non-empty name.
    ///
    /// A localized name may not equal the canonical identifier of a different column, otherwise
    /// [`ColumnResolver::field_for`] would be ambiguous.
    pub fn validate(&self) -> PipelineResult<()> {
        for (language, names) in &self.languages {
            let incomplete = |message: String| PipelineError::IncompleteColumnTable {
                language: language.clone(),
                message,
            };

            if names.len() != Column::ALL.len() {
                return Err(incomplete(format!(
                    "expected {} names, found {}",
                    Column::ALL.len(),
                    names.len()
                )));
            }

            let mut seen = HashSet::with_capacity(names.len());
            for (column, name) in Column::ALL.into_iter().zip(names) {
                if name.is_empty() {
                    return Err(incomplete(format!(
                        "empty name for '{}'",
                        column.canonical_id()
                    )));
                }
                if !seen.insert(name.as_str()) {
                    return Err(incomplete(format!("name '{name}' is used twice")));
                }
                if let Some(other) = Column::from_canonical_id(name) {
                    if other != column {
                        return Err(incomplete(format!(
                            "name '{name}' for '{}' shadows another canonical column",
                            column.canonical_id()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Supported language codes.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Localized name of `column` in `language`.
    pub fn resolve(&self, column: Column, language: &str) -> PipelineResult<&str> {
        let names = self.names_for(language)?;
        Ok(names[column.index()].as_str())
    }

    /// String-keyed variant of [`Self::resolve`].
    pub fn resolve_id(&self, canonical_id: &str, language: &str) -> PipelineResult<&str> {
        let column =
            Column::from_canonical_id(canonical_id).ok_or_else(|| PipelineError::UnknownField {
                name: canonical_id.to_string(),
            })?;
        self.resolve(column, language)
    }

    /// Bind the table to one language.
    pub fn resolver(&self, language: &str) -> PipelineResult<ColumnResolver> {
        let names = self.names_for(language)?.clone();
        Ok(ColumnResolver {
            language: language.to_string(),
            names,
        })
    }

    fn names_for(&self, language: &str) -> PipelineResult<&Vec<String>> {
        self.languages
            .get(language)
            .ok_or_else(|| PipelineError::UnsupportedLanguage {
                code: language.to_string(),
            })
    }
}

/// A [`ColumnNameTable`] row for the active language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnResolver {
    language: String,
    names: Vec<String>,
}

impl ColumnResolver {
    /// Active language code.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Localized name of `column`.
    pub fn name(&self, column: Column) -> &str {
        &self.names[column.index()]
    }

    /// Map a localized or canonical name to its column.
    ///
    /// Surrounding whitespace is ignored; matching is otherwise exact.
    pub fn field_for(&self, name: &str) -> PipelineResult<Column> {
        let name = name.trim();
        Column::ALL
            .into_iter()
            .find(|c| self.name(*c) == name)
            .or_else(|| Column::from_canonical_id(name))
            .ok_or_else(|| PipelineError::UnknownField {
                name: name.to_string(),
            })
    }
}
