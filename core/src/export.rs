//! JSON and CSV export of store contents.
//!
//! CSV fields are always double-quote wrapped and embedded quotes are
//! doubled, so free text with commas, quotes or newlines survives.

use crate::error::{LumaError, LumaResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = LumaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(LumaError::Config(format!("Unknown export format: {other}"))),
        }
    }
}

/// A record that can be flattened into one CSV row.
pub trait CsvRecord {
    const HEADERS: &'static [&'static str];

    /// One value per header, same order.
    fn csv_fields(&self) -> Vec<String>;
}

pub fn to_json<T: Serialize>(records: &[T]) -> LumaResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn to_csv<T: CsvRecord>(records: &[T]) -> String {
    let mut out = csv_line(T::HEADERS.iter().map(|h| h.to_string()));
    for record in records {
        out.push('\n');
        out.push_str(&csv_line(record.csv_fields()));
    }
    out
}

pub fn export<T: CsvRecord + Serialize>(records: &[T], format: ExportFormat) -> LumaResult<String> {
    match format {
        ExportFormat::Json => to_json(records),
        ExportFormat::Csv => Ok(to_csv(records)),
    }
}

fn csv_line<I: IntoIterator<Item = String>>(fields: I) -> String {
    fields
        .into_iter()
        .map(|f| quote(&f))
        .collect::<Vec<_>>()
        .join(",")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
