//! Spreadsheet converter (xlsx, xlsm, xls, ods)

use calamine::{Data, Reader};
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Collection, Record, SourceKind, Value};

use super::collection_name_for;

/// Largest integer an f64 holds exactly (2^53)
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Converts the active sheet of a workbook into a collection named after the file stem
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetConverter;

impl SpreadsheetConverter {
    pub fn new() -> Self {
        Self
    }

    pub fn convert(&self, path: &Path) -> Result<Collection> {
        let source = path.display().to_string();
        let name = collection_name_for(path)?;

        let mut workbook = calamine::open_workbook_auto(path)
            .map_err(|e| Error::source_unavailable(&source, format!("Failed to open workbook: {}", e)))?;

        let sheet_names = workbook.sheet_names().to_vec();
        let sheet_name = select_sheet(path, &sheet_names)
            .ok_or_else(|| Error::malformed(&source, "workbook has no sheets"))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| Error::source_unavailable(&source, format!("Failed to read sheet '{}': {}", sheet_name, e)))?;

        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| Error::malformed(&source, format!("sheet '{}' has no rows", sheet_name)))?;

        let field_names: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(idx, cell)| header_name(idx, cell))
            .collect();

        let records: Vec<Record> = rows
            .map(|row| Record::from_row(&field_names, row.iter().map(cell_value)))
            .collect();

        tracing::debug!(
            "Read {} rows ({} columns) from sheet '{}' of {}",
            records.len(),
            field_names.len(),
            sheet_name,
            source
        );

        Ok(Collection::new(name, SourceKind::Spreadsheet, records))
    }
}

/// Pick the active sheet when the workbook records one, else the first sheet
fn select_sheet(path: &Path, sheet_names: &[String]) -> Option<String> {
    let index = active_tab(path).unwrap_or(0);
    sheet_names
        .get(index)
        .or_else(|| sheet_names.first())
        .cloned()
}

/// Read `activeTab` from `xl/workbook.xml` of an OOXML package
fn active_tab(path: &Path) -> Option<usize> {
    use quick_xml::events::Event;

    let ext = path.extension()?.to_str()?.to_lowercase();
    if ext != "xlsx" && ext != "xlsm" {
        return None;
    }

    let file = std::fs::File::open(path).ok()?;
    let mut archive = zip::ZipArchive::new(file).ok()?;
    let mut xml = String::new();
    archive
        .by_name("xl/workbook.xml")
        .ok()?
        .read_to_string(&mut xml)
        .ok()?;

    let mut reader = quick_xml::Reader::from_str(&xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() != b"workbookView" {
                    continue;
                }
                return e.attributes().flatten().find_map(|attr| {
                    if attr.key.local_name().as_ref() == b"activeTab" {
                        std::str::from_utf8(&attr.value).ok()?.trim().parse().ok()
                    } else {
                        None
                    }
                });
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                tracing::debug!("Could not read workbook view of {}: {}", path.display(), e);
                return None;
            }
            _ => {}
        }
    }
}

/// Header cell to field name; blank headers are named by column position
fn header_name(idx: usize, cell: &Data) -> String {
    match cell_value(cell) {
        Value::Null => format!("column_{}", idx + 1),
        Value::String(s) if s.trim().is_empty() => format!("column_{}", idx + 1),
        value => value.to_text(),
    }
}

/// Cell to value, keeping the native scalar type
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => {
            // Whole numbers are stored as floats in OOXML; report them as integers
            if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_INT {
                Value::Int(*f as i64)
            } else {
                Value::Float(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Value::String(d.to_string()))
            .unwrap_or(Value::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(e.to_string()),
    }
}
