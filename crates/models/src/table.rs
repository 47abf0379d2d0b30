//! CSV tables held as polars data frames.
//!
//! Every stage exchanges flat CSV files whose exact column set depends on
//! what the stats API returned. Files are read with every column as text and
//! each stage parses the columns it needs by name.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

use polars::prelude::*;

use crate::error::{HoopError, Result};

/// Reads a CSV file with every column as text. A missing file maps to
/// [`HoopError::MissingFile`] and a repeated header is rejected.
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(HoopError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    check_unique(&path.display().to_string(), reader.headers()?.iter())?;

    let frame = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;
    Ok(frame)
}

/// Writes a table as CSV, creating parent directories as needed.
pub fn write_csv(frame: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame.clone())?;
    Ok(())
}

/// Builds a text table from positional rows. Short rows are padded with
/// nulls; cells beyond the header are ignored.
pub fn from_rows(source: &str, headers: &[String], rows: &[Vec<Option<String>>]) -> Result<DataFrame> {
    check_unique(source, headers.iter().map(String::as_str))?;
    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<Option<&str>> = rows
                .iter()
                .map(|row| row.get(idx).and_then(Option::as_deref))
                .collect();
            Column::new(name.as_str().into(), values)
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Stacks tables vertically over the union of their columns, in first-seen
/// order. Cells absent on either side stay null.
pub fn concat(frames: Vec<DataFrame>) -> Result<DataFrame> {
    if frames.len() <= 1 {
        return Ok(frames.into_iter().next().unwrap_or_default());
    }
    let lazy: Vec<LazyFrame> = frames.into_iter().map(DataFrame::lazy).collect();
    Ok(concat_lf_diagonal(lazy, UnionArgs::default())?.collect()?)
}

/// Sets one text column to the same value on every row, adding it if absent.
pub fn fill_column(frame: &mut DataFrame, name: &str, value: &str) -> Result<()> {
    let height = frame.height();
    frame.with_column(Column::new(name.into(), vec![value.to_string(); height]))?;
    Ok(())
}

pub fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_index(name).is_some()
}

pub fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Names from `wanted` that are not columns of `frame`.
pub fn missing_columns<'a>(frame: &DataFrame, wanted: &[&'a str]) -> Vec<&'a str> {
    wanted
        .iter()
        .copied()
        .filter(|c| !has_column(frame, c))
        .collect()
}

/// Trimmed cell text of one column; null and blank cells read as `None`.
pub fn text_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = frame.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|cell| {
            cell.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect())
}

/// Numeric values of one column. Null, blank and `NaN` cells read as `None`;
/// `True`/`False` read as 1 and 0.
pub fn numeric_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    text_column(frame, name)?
        .into_iter()
        .map(|cell| match cell {
            None => Ok(None),
            Some(raw) => parse_number(&raw).ok_or_else(|| HoopError::InvalidValue {
                column: name.to_string(),
                value: raw,
            }),
        })
        .collect()
}

fn parse_number(raw: &str) -> Option<Option<f64>> {
    if raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    match raw {
        "True" | "true" => Some(Some(1.0)),
        "False" | "false" => Some(Some(0.0)),
        _ => raw.parse::<f64>().ok().filter(|v| !v.is_nan()).map(Some),
    }
}

fn check_unique<'a>(source: &str, headers: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for header in headers {
        if !seen.insert(header) {
            return Err(HoopError::DuplicateColumn {
                table: source.to_string(),
                column: header.to_string(),
            });
        }
    }
    Ok(())
}
