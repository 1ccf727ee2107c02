use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::Result;
use crate::model::{records_frame, ProductionRecord};

/// Comma-separated export of records with a header row. Numbers are written
/// unquoted and missing values as empty fields.
pub fn records_csv<'a>(records: impl IntoIterator<Item = &'a ProductionRecord>) -> Result<String> {
    let mut df = records_frame(records)?;
    let mut buf: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn write_records_csv<'a>(
    records: impl IntoIterator<Item = &'a ProductionRecord>,
    path: &Path,
) -> Result<()> {
    let mut df = records_frame(records)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}
