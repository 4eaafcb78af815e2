//! Page rasterization for OCR fallback.

use crate::Result;
use crate::ocr::process::EngineCommand;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DPI: u32 = 300;

/// One rendered page as PNG bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedPage {
    /// 1-indexed page number.
    pub page: usize,
    pub png: Vec<u8>,
}

/// Renders PDF pages to images for the OCR extractor.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    fn name(&self) -> &str;

    /// Render every page in page order.
    async fn rasterize(&self, pdf: &[u8], dpi: u32, timeout: Duration) -> Result<Vec<RasterizedPage>>;
}

/// Rasterizer backed by poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
        }
    }
}

impl PdftoppmRasterizer {
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    async fn rasterize(&self, pdf: &[u8], dpi: u32, timeout: Duration) -> Result<Vec<RasterizedPage>> {
        let workdir = tempfile::Builder::new().prefix("docextract-raster-").tempdir()?;
        let input = workdir.path().join("input.pdf");
        tokio::fs::write(&input, pdf).await?;

        EngineCommand::new("pdftoppm", &self.binary)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(&input)
            .arg(workdir.path().join("page"))
            .run(timeout)
            .await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(workdir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(page) = page_number(&entry.path()) {
                pages.push(RasterizedPage {
                    page,
                    png: tokio::fs::read(entry.path()).await?,
                });
            }
        }
        pages.sort_by_key(|p| p.page);
        Ok(pages)
    }
}

/// Page number of a `page-07.png` style output file; zero-padding varies with page count.
fn page_number(path: &Path) -> Option<usize> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    path.file_stem()?.to_str()?.strip_prefix("page-")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DocExtractError, OcrFailure};

    #[test]
    fn test_page_number_parsing() {
        assert_eq!(page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/x/input.pdf")), None);
        assert_eq!(page_number(Path::new("/tmp/x/page-1.ppm")), None);
    }

    #[tokio::test]
    async fn test_missing_pdftoppm_is_missing_binary() {
        let rasterizer = PdftoppmRasterizer::with_binary("/nonexistent/pdftoppm");
        let err = rasterizer
            .rasterize(b"%PDF-1.4", DEFAULT_DPI, Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            DocExtractError::OcrEngine { engine, cause } => {
                assert_eq!(engine, "pdftoppm");
                assert!(matches!(cause, OcrFailure::MissingBinary { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
