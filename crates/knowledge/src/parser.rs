//! Manual loading: PDF bytes to per-page text.

use patriot_core::{AppError, AppResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A single page of extracted manual text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualPage {
    /// One-based page number
    pub number: u32,
    pub text: String,
}

/// The owner's manual as extracted text.
#[derive(Debug, Clone, Serialize)]
pub struct Manual {
    /// Source PDF path
    pub path: PathBuf,

    /// Pages in document order
    pub pages: Vec<ManualPage>,

    /// SHA-256 of the source bytes (hex)
    pub digest: String,
}

impl Manual {
    /// Build a manual from already extracted page texts.
    ///
    /// The digest is taken over the page texts, so identical text yields an
    /// identical digest.
    pub fn from_pages(path: impl Into<PathBuf>, pages: Vec<String>) -> Self {
        let mut hasher = Sha256::new();
        for page in &pages {
            hasher.update(page.as_bytes());
            hasher.update([0u8]);
        }
        let digest = format!("{:x}", hasher.finalize());
        Self::with_digest(path, pages, digest)
    }

    fn with_digest(path: impl Into<PathBuf>, pages: Vec<String>, digest: String) -> Self {
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| ManualPage {
                number: i as u32 + 1,
                text,
            })
            .collect();

        Self {
            path: path.into(),
            pages,
            digest,
        }
    }

    /// Whole manual as one string with a `--- Page N ---` marker before each page.
    pub fn full_text(&self) -> String {
        let mut text = String::new();
        for page in &self.pages {
            text.push_str(&format!("\n--- Page {} ---\n", page.number));
            text.push_str(&page.text);
        }
        text
    }

    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }
}

/// Load the manual PDF and extract its text page by page.
pub fn load_manual(path: &Path) -> AppResult<Manual> {
    if !path.exists() {
        return Err(AppError::Manual(format!(
            "Manual PDF not found at {}",
            path.display()
        )));
    }

    tracing::info!("Loading manual from {:?}", path);

    let bytes = std::fs::read(path).map_err(|e| {
        AppError::Manual(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let digest = format!("{:x}", Sha256::digest(&bytes));

    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
        AppError::Manual(format!(
            "Failed to extract text from {}: {}",
            path.display(),
            e
        ))
    })?;

    let manual = Manual::with_digest(path, pages, digest);

    tracing::info!("Loaded {} pages from PDF", manual.page_count());
    Ok(manual)
}
