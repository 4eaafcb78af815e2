//! DOCX extractor.
//!
//! Walks `word/document.xml` in body order. Explicit page breaks
//! (`<w:br w:type="page"/>`) start a new segment, so segment pages follow the
//! author's breaks rather than Word's layout.

use crate::core::config::ExtractionConfig;
use crate::core::execution::run_blocking;
use crate::core::io::Document;
use crate::error::{DocExtractError, Result};
use crate::extractors::office::{self, attribute, child_elements, is_element};
use crate::plugins::ExtractionOutcome;
use crate::types::{RawExtraction, Table, TextSegment};
use roxmltree::Node;

const DOCUMENT_XML: &str = "word/document.xml";

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    pub const NAME: &'static str = "docx";

    pub async fn extract(&self, doc: &Document, config: &ExtractionConfig) -> Result<ExtractionOutcome> {
        let bytes = doc.content.clone();
        let extract_tables = config.extract_tables;
        let raw = run_blocking(move || parse_docx(&bytes, extract_tables)).await?;
        Ok(ExtractionOutcome::Extracted(raw))
    }
}

#[derive(Default)]
struct PageWriter {
    pages: Vec<String>,
    current: String,
    tables: Vec<Table>,
}

impl PageWriter {
    fn page_number(&self) -> usize {
        self.pages.len() + 1
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
    }

    fn finish(mut self) -> (Vec<String>, Vec<Table>) {
        self.break_page();
        (self.pages, self.tables)
    }
}

pub fn parse_docx(bytes: &[u8], extract_tables: bool) -> Result<RawExtraction> {
    let mut archive = office::open_archive(bytes, "DOCX")?;
    let xml = office::read_entry(&mut archive, DOCUMENT_XML)?
        .ok_or_else(|| DocExtractError::malformed("DOCX has no word/document.xml"))?;
    let document = office::parse_xml(&xml, DOCUMENT_XML)?;

    let body = document
        .descendants()
        .find(|n| is_element(n, "body"))
        .ok_or_else(|| DocExtractError::malformed("DOCX document has no body"))?;

    let mut writer = PageWriter::default();
    write_block_content(body, &mut writer, extract_tables);
    let (pages, tables) = writer.finish();

    let segments = pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextSegment::on_page(text, i + 1))
        .collect::<Vec<_>>();
    let page_count = segments.len();

    let mut raw = RawExtraction::from_segments(segments).with_metadata("page_count", page_count);
    raw.metadata.extend(office::core_properties(&mut archive));
    if extract_tables {
        raw.tables = Some(tables);
    }
    Ok(raw)
}

/// Paragraphs and tables of a body-like container, in order.
fn write_block_content(container: Node<'_, '_>, writer: &mut PageWriter, extract_tables: bool) {
    for node in container.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "p" => write_paragraph(node, writer),
            "tbl" => write_table(node, writer, extract_tables),
            // Content controls wrap ordinary block content.
            "sdt" => {
                for content in child_elements(node, "sdtContent") {
                    write_block_content(content, writer, extract_tables);
                }
            }
            _ => {}
        }
    }
}

fn write_paragraph(paragraph: Node<'_, '_>, writer: &mut PageWriter) {
    for node in paragraph.descendants().filter(Node::is_element) {
        match node.tag_name().name() {
            "t" => writer.current.push_str(node.text().unwrap_or_default()),
            "tab" => writer.current.push('\t'),
            "br" if attribute(&node, "type") == Some("page") => writer.break_page(),
            "br" | "cr" => writer.current.push('\n'),
            _ => {}
        }
    }
    writer.current.push('\n');
}

fn write_table(table: Node<'_, '_>, writer: &mut PageWriter, extract_tables: bool) {
    let cells = office::table_cells(table);
    for row in &cells {
        writer.current.push_str(&row.join("\t"));
        writer.current.push('\n');
    }
    if extract_tables && !cells.is_empty() {
        let page = writer.page_number();
        writer.tables.push(Table::from_cells(cells, page));
    }
}
