//! Ordered tabular data: rows, cells, and the normalization pass that every
//! transform starts from.

mod value;

pub use value::{CellValue, format_date, parse_date};

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::error::{Result, VizguardError};

/// One row: an ordered mapping from field name to cell value.
pub type Row = IndexMap<String, CellValue>;

/// An ordered sequence of rows.
///
/// After `normalize()` rows are sorted ascending by `date`, field names carry
/// no spaces, and all non-date columns are numeric-or-null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Build a table from JSON rows, coercing each cell.
    ///
    /// Non-object entries become empty rows rather than aborting the whole
    /// conversion.
    pub fn from_values(values: &[Value]) -> Self {
        let rows = values
            .iter()
            .map(|v| match v {
                Value::Object(map) => map
                    .iter()
                    .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
                    .collect(),
                _ => Row::new(),
            })
            .collect();
        Self { rows }
    }

    /// Parse a table from a JSON array of row objects.
    pub fn from_json_str(json: &str) -> Result<Table> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        Ok(Table::from_values(&values))
    }

    /// Render the table back to JSON rows.
    pub fn to_values(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                Value::Object(
                    row.iter()
                        .map(|(k, v)| (k.clone(), v.to_json()))
                        .collect(),
                )
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All field names across rows, in first-seen order.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: IndexSet<String> = IndexSet::new();
        for row in &self.rows {
            for key in row.keys() {
                names.insert(key.clone());
            }
        }
        names.into_iter().collect()
    }

    /// Whether any row carries the given field.
    pub fn has_field(&self, name: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(name))
    }

    /// Per-row numeric view of a column. Missing keys read as null.
    pub fn numeric_column(&self, name: &str) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.get(name).and_then(CellValue::as_f64))
            .collect()
    }

    /// A column is numeric when it holds at least one number and no text
    /// that fails to parse as a number. Nulls are allowed.
    pub fn is_numeric_column(&self, name: &str) -> bool {
        let mut saw_number = false;
        for row in &self.rows {
            match row.get(name) {
                Some(CellValue::Number(_)) => saw_number = true,
                Some(CellValue::Text(s)) => {
                    if s.trim().parse::<f64>().is_err() {
                        return false;
                    }
                    saw_number = true;
                }
                Some(CellValue::Null) | None => {}
            }
        }
        saw_number
    }

    /// Per-row parsed `date` column. Missing keys and bad text read as null.
    pub fn date_column(&self) -> Vec<Option<NaiveDate>> {
        self.rows
            .iter()
            .map(|row| row.get("date").and_then(CellValue::as_date))
            .collect()
    }

    /// Normalize the table for transform work.
    ///
    /// Every row must carry a `date` key; a table where no date parses at
    /// all is rejected. Rows are stably sorted ascending by date with
    /// unparseable dates last, field names lose their spaces, and every
    /// non-date column is coerced to numeric-or-null. Dates are re-rendered
    /// as `YYYY-MM-DD`.
    pub fn normalize(&self) -> Result<Table> {
        if self.rows.is_empty() {
            return Ok(Table::default());
        }

        for row in &self.rows {
            if !row.contains_key("date") {
                return Err(VizguardError::BadData(
                    "Each row must have a 'date' column.".to_string(),
                ));
            }
        }

        let mut dated: Vec<(Option<NaiveDate>, &Row)> = self
            .rows
            .iter()
            .map(|row| (row.get("date").and_then(CellValue::as_date), row))
            .collect();

        if dated.iter().all(|(d, _)| d.is_none()) {
            return Err(VizguardError::BadData(
                "All date values are invalid or could not be parsed.".to_string(),
            ));
        }

        dated.sort_by_key(|(d, _)| (d.is_none(), d.unwrap_or(NaiveDate::MIN)));

        let rows = dated
            .into_iter()
            .map(|(date, row)| {
                row.iter()
                    .map(|(key, cell)| {
                        let name = key.replace(' ', "_");
                        let value = if key == "date" {
                            match date {
                                Some(d) => CellValue::Text(format_date(d)),
                                None => CellValue::Null,
                            }
                        } else {
                            match cell.as_f64() {
                                Some(n) => CellValue::Number(n),
                                None => CellValue::Null,
                            }
                        };
                        (name, value)
                    })
                    .collect()
            })
            .collect();

        Ok(Table::new(rows))
    }
}
