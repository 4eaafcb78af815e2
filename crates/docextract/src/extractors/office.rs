//! ZIP and XML plumbing shared by the Office Open XML extractors.

use crate::error::{DocExtractError, Result};
use roxmltree::Node;
use serde_json::Value;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

pub(crate) type OfficeArchive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Dublin Core and `cp:` fields read from `docProps/core.xml`, with the metadata key they map to.
const CORE_PROPERTIES: &[(&str, &str)] = &[
    ("title", "title"),
    ("subject", "subject"),
    ("creator", "author"),
    ("keywords", "keywords"),
    ("description", "description"),
    ("lastModifiedBy", "last_modified_by"),
    ("created", "created"),
    ("modified", "modified"),
    ("language", "language"),
];

pub(crate) fn open_archive<'a>(bytes: &'a [u8], kind: &str) -> Result<OfficeArchive<'a>> {
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| DocExtractError::malformed_with_source(format!("Failed to open {kind} as ZIP"), e))
}

/// Read an archive member as UTF-8. Missing members are `None`.
pub(crate) fn read_entry(archive: &mut OfficeArchive<'_>, path: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(DocExtractError::malformed_with_source(format!("Failed to read {path}"), e)),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| DocExtractError::malformed_with_source(format!("Failed to read {path}"), e))?;
    Ok(Some(content))
}

pub(crate) fn parse_xml<'a>(xml: &'a str, path: &str) -> Result<roxmltree::Document<'a>> {
    roxmltree::Document::parse(xml).map_err(|e| DocExtractError::malformed_with_source(format!("Failed to parse {path}"), e))
}

/// Core properties as metadata. A missing or broken `core.xml` yields nothing.
pub(crate) fn core_properties(archive: &mut OfficeArchive<'_>) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();
    let xml = match read_entry(archive, "docProps/core.xml") {
        Ok(Some(xml)) => xml,
        Ok(None) => return metadata,
        Err(e) => {
            tracing::debug!("Skipping core properties: {}", e);
            return metadata;
        }
    };
    let Ok(doc) = roxmltree::Document::parse(&xml) else {
        tracing::debug!("Skipping unparseable docProps/core.xml");
        return metadata;
    };

    let root = doc.root_element();
    for (element, key) in CORE_PROPERTIES {
        let text = root
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == *element)
            .and_then(|n| n.text())
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(text) = text {
            metadata.insert(key.to_string(), Value::from(text));
        }
    }
    metadata
}

pub(crate) fn is_element(node: &Node<'_, '_>, local_name: &str) -> bool {
    node.is_element() && node.tag_name().name() == local_name
}

pub(crate) fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    local_name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| is_element(n, local_name))
}

/// Attribute by local name, ignoring its namespace.
pub(crate) fn attribute<'a>(node: &Node<'a, '_>, local_name: &str) -> Option<&'a str> {
    node.attributes().find(|a| a.name() == local_name).map(|a| a.value())
}

/// Rows of a table element (`w:tbl` or `a:tbl`), each cell's paragraphs joined with a space.
pub(crate) fn table_cells(table: Node<'_, '_>) -> Vec<Vec<String>> {
    child_elements(table, "tr")
        .map(|row| {
            child_elements(row, "tc")
                .map(|cell| {
                    cell.descendants()
                        .filter(|n| is_element(n, "p"))
                        .map(paragraph_runs)
                        .filter(|t| !t.trim().is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect()
        })
        .collect()
}

/// Plain text of one paragraph: text runs, tabs as `\t`, line breaks as `\n`.
pub(crate) fn paragraph_runs(paragraph: Node<'_, '_>) -> String {
    let mut text = String::new();
    for node in paragraph.descendants().filter(Node::is_element) {
        match node.tag_name().name() {
            "t" => text.push_str(node.text().unwrap_or_default()),
            "tab" => text.push('\t'),
            "br" | "cr" => text.push('\n'),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_core_properties() {
        let bytes = zip_with(&[(
            "docProps/core.xml",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                xmlns:dc="http://purl.org/dc/elements/1.1/">
                <dc:title>Quarterly Report</dc:title>
                <dc:creator>Jane Doe</dc:creator>
                <dc:subject>  </dc:subject>
            </cp:coreProperties>"#,
        )]);
        let mut archive = open_archive(&bytes, "DOCX").unwrap();
        let metadata = core_properties(&mut archive);
        assert_eq!(metadata["title"], "Quarterly Report");
        assert_eq!(metadata["author"], "Jane Doe");
        assert!(!metadata.contains_key("subject"));
    }

    #[test]
    fn test_missing_entry_is_none() {
        let bytes = zip_with(&[("a.xml", "<a/>")]);
        let mut archive = open_archive(&bytes, "DOCX").unwrap();
        assert!(read_entry(&mut archive, "b.xml").unwrap().is_none());
        assert!(core_properties(&mut archive).is_empty());
    }

    #[test]
    fn test_not_a_zip() {
        let err = open_archive(b"plain bytes", "PPTX").unwrap_err();
        assert!(matches!(err, DocExtractError::Extraction { .. }));
    }

    #[test]
    fn test_paragraph_runs_and_table_cells() {
        let xml = r#"<w:tbl xmlns:w="w"><w:tr><w:tc><w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t></w:r></w:p></w:tc>
            <w:tc><w:p><w:r><w:t>c</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(table_cells(doc.root_element()), vec![vec!["a\tb".to_string(), "c".to_string()]]);
    }
}
