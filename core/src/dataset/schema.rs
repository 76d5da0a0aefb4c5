//! Tabular schema sampling.
//!
//! Reads the first few rows of a CSV file and infers one type label per
//! column. The labels follow the pandas dtype vocabulary (`int64`,
//! `float64`, `bool`, `object`) so downstream prompts read naturally for a
//! model that has seen a lot of pandas output.

use std::collections::BTreeMap;
use std::path::Path;

/// Number of data rows sampled per file.
const SAMPLE_ROWS: usize = 5;

/// Read the header plus up to [`SAMPLE_ROWS`] records of `path` and map
/// each column name to an inferred type label.
///
/// A file with no columns yields an empty map. I/O and CSV decoding errors
/// propagate to the caller, which classifies them as a `read` failure.
pub fn sample_schema(path: &Path) -> Result<BTreeMap<String, String>, csv::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records().take(SAMPLE_ROWS) {
        let record = record?;
        for (idx, field) in record.iter().enumerate() {
            if idx < columns.len() {
                columns[idx].push(field.trim().to_string());
            }
        }
    }

    Ok(headers
        .into_iter()
        .zip(columns)
        .map(|(name, values)| (name, infer_dtype(&values).to_string()))
        .collect())
}

fn infer_dtype(values: &[String]) -> &'static str {
    let sampled: Vec<&str> = values
        .iter()
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .collect();

    if sampled.is_empty() {
        return "object";
    }
    if sampled.iter().all(|value| value.parse::<i64>().is_ok()) {
        return "int64";
    }
    if sampled.iter().all(|value| value.parse::<f64>().is_ok()) {
        return "float64";
    }
    if sampled
        .iter()
        .all(|value| value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false"))
    {
        return "bool";
    }
    "object"
}
