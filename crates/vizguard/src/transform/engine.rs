//! Engine that applies deterministic transforms to a table.

use chrono::{Datelike, Days, NaiveDate};
use indexmap::IndexMap;

use crate::error::{Result, VizguardError};
use crate::table::{CellValue, Row, Table, format_date};

use super::spec::{Agg, Freq, Operation, TransformSpec};

/// Applies ordered lists of transforms to tables.
///
/// Every call normalizes first (even with zero transforms), so output rows
/// are always date-sorted with numeric-or-null columns. Each applied
/// operation contributes a provenance label; labels are descriptive only.
pub struct TransformEngine;

impl TransformEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply transforms in order, returning the new table and the labels of
    /// every operation that ran.
    pub fn apply(
        &self,
        table: &Table,
        transforms: &[TransformSpec],
    ) -> Result<(Table, Vec<String>)> {
        let mut current = table.normalize()?;
        let mut applied = Vec::new();

        for spec in transforms {
            let operation = Operation::from_spec(spec)?;
            current = self.run(&operation, current)?;
            applied.push(operation.label());
        }

        Ok((current, applied))
    }

    fn run(&self, operation: &Operation, table: Table) -> Result<Table> {
        match operation {
            Operation::MovingAverage { field, window } => {
                self.moving_average(table, field, *window)
            }
            Operation::RebasedIndex { field, base } => self.rebased_index(table, field, *base),
            Operation::Resample { freq, agg } => self.resample(table, *freq, *agg),
            Operation::PctChange { field, periods } => self.pct_change(table, field, *periods),
        }
    }

    fn moving_average(&self, mut table: Table, field: &str, window: usize) -> Result<Table> {
        let values = self.series(&table, field, "moving_average")?;

        let averaged: Vec<Option<f64>> = (0..values.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(window);
                let in_window: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
                if in_window.is_empty() {
                    None
                } else {
                    Some(in_window.iter().sum::<f64>() / in_window.len() as f64)
                }
            })
            .collect();

        self.write_column(&mut table, field, &averaged);
        Ok(table)
    }

    fn rebased_index(&self, mut table: Table, field: &str, base: f64) -> Result<Table> {
        let values = self.series(&table, field, "rebased_index")?;

        let first = values.iter().flatten().copied().next();
        let first = match first {
            Some(v) if v != 0.0 => v,
            _ => {
                return Err(VizguardError::BadData(format!(
                    "Cannot rebase because field {field} has no valid non-zero first value."
                )));
            }
        };

        let rebased: Vec<Option<f64>> = values.iter().map(|v| v.map(|v| v / first * base)).collect();
        self.write_column(&mut table, field, &rebased);
        Ok(table)
    }

    fn pct_change(&self, mut table: Table, field: &str, periods: usize) -> Result<Table> {
        let values = self.series(&table, field, "pct_change")?;

        let changed: Vec<Option<f64>> = (0..values.len())
            .map(|i| {
                if i < periods {
                    return None;
                }
                match (values[i], values[i - periods]) {
                    (Some(current), Some(prev)) => {
                        let change = (current - prev) / prev;
                        change.is_finite().then_some(change)
                    }
                    _ => None,
                }
            })
            .collect();

        self.write_column(&mut table, field, &changed);
        Ok(table)
    }

    fn resample(&self, table: Table, freq: Freq, agg: Agg) -> Result<Table> {
        if table.is_empty() {
            return Err(VizguardError::BadData(
                "Cannot resample empty dataset.".to_string(),
            ));
        }

        let numeric_cols: Vec<String> = table
            .field_names()
            .into_iter()
            .filter(|name| name != "date" && table.is_numeric_column(name))
            .collect();
        if numeric_cols.is_empty() {
            return Err(VizguardError::BadData(
                "No numeric columns to aggregate for resample.".to_string(),
            ));
        }

        // Rows arrive date-sorted, so periods appear in ascending order.
        // Rows whose date failed to parse carry no period and are dropped.
        let mut groups: IndexMap<NaiveDate, Vec<&Row>> = IndexMap::new();
        for (date, row) in table.date_column().iter().zip(&table.rows) {
            if let Some(date) = date {
                groups.entry(period_start(*date, freq)).or_default().push(row);
            }
        }

        let rows = groups
            .into_iter()
            .map(|(period, members)| {
                let mut row = Row::new();
                row.insert("date".to_string(), CellValue::Text(format_date(period)));
                for col in &numeric_cols {
                    let values: Vec<f64> = members
                        .iter()
                        .filter_map(|r| r.get(col).and_then(CellValue::as_f64))
                        .collect();
                    let cell = match aggregate(&values, agg) {
                        Some(v) => CellValue::Number(v),
                        None => CellValue::Null,
                    };
                    row.insert(col.clone(), cell);
                }
                row
            })
            .collect();

        Ok(Table::new(rows))
    }

    /// Numeric view of a field, rejecting absent fields and all-null series.
    fn series(&self, table: &Table, field: &str, op: &str) -> Result<Vec<Option<f64>>> {
        if !table.has_field(field) {
            return Err(VizguardError::BadData(format!(
                "{op} requires existing 'field' in rows: {field}"
            )));
        }
        let values = table.numeric_column(field);
        if values.iter().all(Option::is_none) {
            return Err(VizguardError::BadData(format!(
                "Field {field} contains no numeric data."
            )));
        }
        Ok(values)
    }

    fn write_column(&self, table: &mut Table, field: &str, values: &[Option<f64>]) {
        for (row, value) in table.rows.iter_mut().zip(values) {
            let cell = match value {
                Some(v) => CellValue::Number(*v),
                None => CellValue::Null,
            };
            row.insert(field.to_string(), cell);
        }
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// First day of the period containing `date`.
fn period_start(date: NaiveDate, freq: Freq) -> NaiveDate {
    match freq {
        Freq::Monthly => date.with_day(1).unwrap_or(date),
        Freq::Weekly => {
            let offset = date.weekday().num_days_from_monday() as u64;
            date.checked_sub_days(Days::new(offset)).unwrap_or(date)
        }
        Freq::Daily => date,
    }
}

/// Aggregate a group's non-null values. Sum of an empty group is 0; the
/// other aggregations yield null.
fn aggregate(values: &[f64], agg: Agg) -> Option<f64> {
    match agg {
        Agg::Sum => Some(values.iter().sum()),
        Agg::Mean => {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Agg::Median => {
            if values.is_empty() {
                return None;
            }
            let mut sorted = values.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                Some((sorted[mid - 1] + sorted[mid]) / 2.0)
            } else {
                Some(sorted[mid])
            }
        }
        Agg::First => values.first().copied(),
        Agg::Last => values.last().copied(),
    }
}
