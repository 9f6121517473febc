//! Group-wise statistics over cleaned visits.
//!
//! ```rust
//! use visit_analytics::columns::{Column, ColumnNameTable};
//! use visit_analytics::processing::{Aggregator, GroupValue};
//! use visit_analytics::types::CleanedVisit;
//!
//! let aggregator = Aggregator::new(ColumnNameTable::builtin().resolver("es").unwrap());
//! let visits: Vec<CleanedVisit> = Vec::new();
//! let table = aggregator.group_by(&visits, &[Column::Hour], Column::Duration).unwrap();
//! assert!(table.is_empty());
//! assert_eq!(table.group_columns, vec!["hora".to_string()]);
//! assert_eq!(table.get(&[GroupValue::Int(8)]), None);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::columns::{Column, ColumnResolver};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CleanedVisit, Value};

use super::filter::{filter_by, Filtered};
use super::reduce::{summarize, Stats};

/// One component of a group key.
///
/// Ordering puts [`GroupValue::Missing`] first, then integers, then text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum GroupValue {
    /// The visit has no valid value in the group column.
    Missing,
    Int(i64),
    Text(String),
}

impl GroupValue {
    /// Key component of `visit` for a groupable `column`.
    pub fn of(visit: &CleanedVisit, column: Column) -> PipelineResult<Self> {
        match visit.value(column) {
            Value::Null => Ok(GroupValue::Missing),
            Value::Int64(v) => Ok(GroupValue::Int(v)),
            Value::Utf8(s) => Ok(GroupValue::Text(s)),
            Value::Float64(_) | Value::Timestamp(_) => Err(not_groupable(column)),
        }
    }

    /// Parse a criterion value given as text (e.g. from configuration) for `column`.
    pub fn parse(column: Column, raw: &str) -> PipelineResult<Self> {
        let raw = raw.trim();
        match column {
            Column::Hour | Column::Weekday => {
                raw.parse::<i64>()
                    .map(GroupValue::Int)
                    .map_err(|e| PipelineError::InvalidConfig {
                        message: format!(
                            "criterion '{raw}' for '{}' is not an integer: {e}",
                            column.canonical_id()
                        ),
                    })
            }
            Column::Gender | Column::Department => Ok(GroupValue::Text(raw.to_string())),
            _ => Err(not_groupable(column)),
        }
    }
}

impl From<&str> for GroupValue {
    fn from(value: &str) -> Self {
        GroupValue::Text(value.to_string())
    }
}

impl From<String> for GroupValue {
    fn from(value: String) -> Self {
        GroupValue::Text(value)
    }
}

impl From<i64> for GroupValue {
    fn from(value: i64) -> Self {
        GroupValue::Int(value)
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Missing => f.write_str("missing"),
            GroupValue::Int(v) => write!(f, "{v}"),
            GroupValue::Text(s) => f.write_str(s),
        }
    }
}

/// Statistics for one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: Vec<GroupValue>,
    pub stats: Stats,
}

/// Group key → statistics, ordered by key. Column labels are localized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationTable {
    pub group_columns: Vec<String>,
    pub value_column: String,
    pub rows: Vec<GroupRow>,
}

impl AggregationTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Statistics for `key`, if that group exists.
    pub fn get(&self, key: &[GroupValue]) -> Option<&Stats> {
        self.rows
            .binary_search_by(|row| row.key.as_slice().cmp(key))
            .ok()
            .map(|idx| &self.rows[idx].stats)
    }

    /// Sum of group row counts.
    pub fn total_count(&self) -> usize {
        self.rows.iter().map(|r| r.stats.count).sum()
    }
}

/// Groups and filters visits, labelling output with the resolver's language.
#[derive(Debug, Clone)]
pub struct Aggregator {
    resolver: ColumnResolver,
}

impl Aggregator {
    pub fn new(resolver: ColumnResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ColumnResolver {
        &self.resolver
    }

    /// Statistics of `value` per distinct combination of `group_columns`.
    ///
    /// With no group columns every visit falls in one total group. Empty input gives an empty
    /// table.
    pub fn group_by<'a, I>(
        &self,
        visits: I,
        group_columns: &[Column],
        value: Column,
    ) -> PipelineResult<AggregationTable>
    where
        I: IntoIterator<Item = &'a CleanedVisit>,
    {
        let groups = partition(visits, group_columns)?;
        let rows = groups
            .into_iter()
            .map(|(key, members)| GroupRow {
                stats: summarize(members.iter().copied(), value),
                key,
            })
            .collect();
        Ok(self.table(group_columns, value, rows))
    }

    /// Visits whose `column` equals `value`; [`Filtered::NoData`] when none do.
    pub fn filter_by<'a, I>(
        &self,
        visits: I,
        column: Column,
        value: &GroupValue,
    ) -> PipelineResult<Filtered<'a>>
    where
        I: IntoIterator<Item = &'a CleanedVisit>,
    {
        filter_by(visits, column, value)
    }

    /// Assemble a table from precomputed rows, sorting them by key.
    pub fn table(&self, group_columns: &[Column], value: Column, mut rows: Vec<GroupRow>) -> AggregationTable {
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        AggregationTable {
            group_columns: group_columns
                .iter()
                .map(|c| self.resolver.name(*c).to_string())
                .collect(),
            value_column: self.resolver.name(value).to_string(),
            rows,
        }
    }
}

/// Split visits by their key over `group_columns`.
pub fn partition<'a, I>(
    visits: I,
    group_columns: &[Column],
) -> PipelineResult<BTreeMap<Vec<GroupValue>, Vec<&'a CleanedVisit>>>
where
    I: IntoIterator<Item = &'a CleanedVisit>,
{
    if let Some(column) = group_columns.iter().find(|c| !c.is_groupable()) {
        return Err(not_groupable(*column));
    }

    let mut groups: BTreeMap<Vec<GroupValue>, Vec<&CleanedVisit>> = BTreeMap::new();
    for visit in visits {
        let key = group_columns
            .iter()
            .map(|c| GroupValue::of(visit, *c))
            .collect::<PipelineResult<Vec<_>>>()?;
        groups.entry(key).or_default().push(visit);
    }
    Ok(groups)
}

fn not_groupable(column: Column) -> PipelineError {
    PipelineError::NotGroupable {
        column: column.canonical_id().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Aggregator, GroupValue};
    use crate::columns::{Column, ColumnNameTable};
    use crate::error::PipelineError;
    use crate::types::{Checked, CleanedVisit, DerivedFeatures, InvalidReason};

    fn visit(hour: u32, department: &str, duration: Option<f64>) -> CleanedVisit {
        CleanedVisit {
            entry: NaiveDate::from_ymd_opt(2021, 3, 3)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            exit: Checked::Invalid(InvalidReason::Empty),
            age: Checked::Valid(40.0),
            gender: Checked::Valid("F".to_string()),
            department: if department == "999" {
                Checked::Invalid(InvalidReason::Sentinel(999))
            } else {
                Checked::Valid(department.to_string())
            },
            features: DerivedFeatures {
                hour,
                weekday: 3,
                duration: duration.map_or(Checked::Invalid(InvalidReason::Unpaired), Checked::Valid),
            },
            interval: None,
        }
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(ColumnNameTable::builtin().resolver("en").unwrap())
    }

    #[test]
    fn group_by_hour_counts() {
        let visits = vec![
            visit(8, "1", Some(10.0)),
            visit(8, "2", Some(20.0)),
            visit(9, "1", None),
            visit(14, "1", Some(5.0)),
        ];
        let table = aggregator().group_by(&visits, &[Column::Hour], Column::Duration).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&[GroupValue::Int(8)]).unwrap().count, 2);
        assert_eq!(table.get(&[GroupValue::Int(9)]).unwrap().count, 1);
        assert_eq!(table.get(&[GroupValue::Int(14)]).unwrap().count, 1);
        assert_eq!(table.total_count(), visits.len());

        let eight = table.get(&[GroupValue::Int(8)]).unwrap();
        assert_eq!(eight.mean, Some(15.0));
        assert_eq!(eight.sum, Some(30.0));
        let nine = table.get(&[GroupValue::Int(9)]).unwrap();
        assert_eq!(nine.valid, 0);
        assert_eq!(nine.mean, None);
    }

    #[test]
    fn invalid_group_values_form_a_missing_group() {
        let visits = vec![visit(8, "1", None), visit(9, "999", None), visit(10, "999", None)];
        let table = aggregator()
            .group_by(&visits, &[Column::Department], Column::Duration)
            .unwrap();
        assert_eq!(table.rows[0].key, vec![GroupValue::Missing]);
        assert_eq!(table.rows[0].stats.count, 2);
        assert_eq!(table.total_count(), 3);
    }

    #[test]
    fn multi_column_keys_are_ordered() {
        let visits = vec![visit(9, "2", None), visit(8, "2", None), visit(8, "1", None)];
        let table = aggregator()
            .group_by(&visits, &[Column::Hour, Column::Department], Column::Age)
            .unwrap();
        let keys: Vec<_> = table.rows.iter().map(|r| r.key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                vec![GroupValue::Int(8), GroupValue::from("1")],
                vec![GroupValue::Int(8), GroupValue::from("2")],
                vec![GroupValue::Int(9), GroupValue::from("2")],
            ]
        );
        assert_eq!(table.group_columns, vec!["hour", "department"]);
        assert_eq!(table.value_column, "age");
    }

    #[test]
    fn no_group_columns_is_a_total_aggregation() {
        let visits = vec![visit(8, "1", Some(1.0)), visit(9, "2", Some(3.0))];
        let table = aggregator().group_by(&visits, &[], Column::Duration).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].key, Vec::<GroupValue>::new());
        assert_eq!(table.rows[0].stats.mean, Some(2.0));
    }

    #[test]
    fn continuous_group_column_is_rejected() {
        let visits = vec![visit(8, "1", None)];
        let err = aggregator()
            .group_by(&visits, &[Column::Duration], Column::Age)
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotGroupable { .. }));
    }

    #[test]
    fn empty_filter_result_aggregates_to_empty_table() {
        let visits = vec![visit(8, "1", None)];
        let agg = aggregator();
        let filtered = agg
            .filter_by(&visits, Column::Department, &GroupValue::from("5"))
            .unwrap();
        assert!(filtered.is_empty());
        let table = agg
            .group_by(filtered.visits().iter().copied(), &[Column::Hour], Column::Duration)
            .unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn parse_criterion_values() {
        assert_eq!(GroupValue::parse(Column::Hour, " 8 ").unwrap(), GroupValue::Int(8));
        assert_eq!(GroupValue::parse(Column::Department, "12").unwrap(), GroupValue::from("12"));
        assert!(GroupValue::parse(Column::Weekday, "monday").is_err());
        assert!(GroupValue::parse(Column::Age, "40").is_err());
    }
}
