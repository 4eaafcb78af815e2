//! PPTX extractor: one segment per slide.

use crate::core::config::ExtractionConfig;
use crate::core::execution::run_blocking;
use crate::core::io::Document;
use crate::error::Result;
use crate::extractors::office::{self, is_element};
use crate::plugins::ExtractionOutcome;
use crate::types::{RawExtraction, Table, TextSegment};
use roxmltree::Node;

#[derive(Debug, Clone, Copy, Default)]
pub struct PptxExtractor;

impl PptxExtractor {
    pub const NAME: &'static str = "pptx";

    pub async fn extract(&self, doc: &Document, config: &ExtractionConfig) -> Result<ExtractionOutcome> {
        let bytes = doc.content.clone();
        let extract_tables = config.extract_tables;
        let raw = run_blocking(move || parse_pptx(&bytes, extract_tables)).await?;
        Ok(ExtractionOutcome::Extracted(raw))
    }
}

/// Slide number of `ppt/slides/slideN.xml`.
fn slide_number(path: &str) -> Option<usize> {
    path.strip_prefix("ppt/slides/slide")?.strip_suffix(".xml")?.parse().ok()
}

pub fn parse_pptx(bytes: &[u8], extract_tables: bool) -> Result<RawExtraction> {
    let mut archive = office::open_archive(bytes, "PPTX")?;

    let mut slides: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut segments = Vec::with_capacity(slides.len());
    let mut tables = Vec::new();

    for (number, path) in &slides {
        let Some(xml) = office::read_entry(&mut archive, path)? else {
            continue;
        };
        let slide = office::parse_xml(&xml, path)?;
        let root = slide.root_element();

        let text = root
            .descendants()
            .filter(|n| is_element(n, "p"))
            .map(office::paragraph_runs)
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        segments.push(TextSegment::on_page(text, *number));

        if extract_tables {
            tables.extend(
                root.descendants()
                    .filter(|n: &Node<'_, '_>| is_element(n, "tbl"))
                    .map(office::table_cells)
                    .filter(|cells| !cells.is_empty())
                    .map(|cells| Table::from_cells(cells, *number)),
            );
        }
    }

    let mut raw = RawExtraction::from_segments(segments).with_metadata("slide_count", slides.len());
    raw.metadata.extend(office::core_properties(&mut archive));
    if extract_tables {
        raw.tables = Some(tables);
    }
    Ok(raw)
}
