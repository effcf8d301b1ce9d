use crate::error::{PipelineError, Result};
use crate::models::PageDocument;
use crate::traits::PdfExtractor;
use lopdf::Document;
use std::path::Path;

/// Loader backed by `lopdf`. Pages with no extractable text are skipped;
/// a document with no readable text at all is an input error.
#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageDocument>> {
        if !path.exists() {
            return Err(PipelineError::Input(format!(
                "pdf not found: {}",
                path.display()
            )));
        }

        let document = Document::load(path).map_err(|error| {
            PipelineError::Input(format!("not a readable pdf {}: {error}", path.display()))
        })?;

        let source = path.to_string_lossy().to_string();
        let mut pages = Vec::new();

        for (page_no, _page_id) in document.get_pages() {
            let text = document.extract_text(&[page_no]).map_err(|error| {
                PipelineError::Input(format!(
                    "pdf page {page_no} unreadable in {}: {error}",
                    path.display()
                ))
            })?;

            if !text.trim().is_empty() {
                pages.push(PageDocument {
                    text,
                    page: page_no,
                    source: source.clone(),
                });
            }
        }

        if pages.is_empty() {
            return Err(PipelineError::Input(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::LopdfExtractor;
    use crate::error::PipelineError;
    use crate::traits::PdfExtractor;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_an_input_error() {
        let result = LopdfExtractor.extract_pages(std::path::Path::new("/nonexistent/doc.pdf"));
        assert!(matches!(result, Err(PipelineError::Input(_))));
    }

    #[test]
    fn garbage_bytes_are_an_input_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%not actually a pdf")?;

        let result = LopdfExtractor.extract_pages(&path);
        assert!(matches!(result, Err(PipelineError::Input(_))));
        Ok(())
    }
}
