//! CSV decoding into a `polars` [`DataFrame`].

use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Cell spellings read as missing values, on top of empty cells.
const NA_VALUES: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

fn read_options() -> CsvReadOptions {
    let na: Vec<PlSmallStr> = NA_VALUES.iter().map(|s| (*s).into()).collect();
    let parse = CsvParseOptions::default()
        .with_null_values(Some(NullValues::AllColumns(na)))
        .with_try_parse_dates(false);
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(parse)
}

/// Trims whitespace around header names.
fn trim_headers(df: &mut DataFrame) -> PolarsResult<()> {
    let renames: Vec<(String, String)> = df
        .get_column_names()
        .into_iter()
        .filter(|n| n.trim() != n.as_str())
        .map(|n| (n.to_string(), n.trim().to_string()))
        .collect();
    for (old, new) in renames {
        df.rename(&old, new.into())?;
    }
    Ok(())
}

/// Reads a CSV file from disk. See [`parse_csv`].
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut df = read_options()
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("parse {}", path.display()))?;
    trim_headers(&mut df)?;
    debug!(rows = df.height(), cols = df.width(), "Parsed CSV");
    Ok(df)
}

/// Decodes in-memory CSV with a header row.
///
/// The whole input is scanned for schema inference: a column is `Int64` when
/// every present cell is an integer, `Float64` when every present cell is a
/// number, and `String` otherwise. Dates are left as text for the loader.
pub fn parse_csv(bytes: &[u8]) -> Result<DataFrame> {
    let mut df = read_options()
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .context("parse CSV")?;
    trim_headers(&mut df)?;
    Ok(df)
}
