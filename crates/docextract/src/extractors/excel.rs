//! Spreadsheet extractor for XLSX, XLS and ODS via `calamine`.

use crate::core::config::ExtractionConfig;
use crate::core::execution::run_blocking;
use crate::core::io::Document;
use crate::error::Result;
use crate::plugins::ExtractionOutcome;
use crate::types::{RawExtraction, Table, TextSegment};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::Value;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    pub const NAME: &'static str = "spreadsheet";

    pub async fn extract(&self, doc: &Document, config: &ExtractionConfig) -> Result<ExtractionOutcome> {
        let bytes = doc.content.clone();
        let extract_tables = config.extract_tables;
        let raw = run_blocking(move || parse_workbook(&bytes, extract_tables)).await?;
        Ok(ExtractionOutcome::Extracted(raw))
    }
}

/// One segment per sheet with tab-separated rows; `page` is the sheet's position.
pub fn parse_workbook(bytes: &[u8], extract_tables: bool) -> Result<RawExtraction> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let sheet_names = workbook.sheet_names();

    let mut segments = Vec::with_capacity(sheet_names.len());
    let mut tables = Vec::new();

    for (index, name) in sheet_names.iter().enumerate() {
        let range = match workbook.worksheet_range(name) {
            Ok(range) => range,
            Err(e) => {
                tracing::debug!("Skipping sheet '{}': {}", name, e);
                continue;
            }
        };

        let cells: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(format_cell).collect())
            .collect();

        let text = cells
            .iter()
            .map(|row| row.join("\t").trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        segments.push(TextSegment::on_page(text, index + 1));

        if extract_tables && !cells.is_empty() {
            tables.push(Table::from_cells(cells, index + 1));
        }
    }

    let mut raw = RawExtraction::from_segments(segments)
        .with_metadata("sheet_count", sheet_names.len())
        .with_metadata(
            "sheet_names",
            Value::Array(sheet_names.iter().cloned().map(Value::from).collect()),
        );
    if extract_tables {
        raw.tables = Some(tables);
    }
    Ok(raw)
}

fn format_cell(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR: {e:?}"),
    }
}
