//! Corpus assembly: flatten captured pages into one publishable document.

use sha2::{Digest, Sha256};
use sitesage_shared::PageCapture;
use tracing::debug;

/// A site's flattened content, ready for upload.
#[derive(Debug, Clone)]
pub struct Corpus {
    /// The serialized document.
    pub text: String,
    /// Pages that contributed to the text.
    pub page_count: usize,
    /// Sections across all pages.
    pub section_count: usize,
    /// SHA-256 of `text`, hex-encoded.
    pub sha256: String,
}

/// Serialize captured pages into a single corpus document.
///
/// Pages appear in crawl order, each opened by a `===== <url> =====`
/// header and separated by a blank line. A page with zero sections still
/// contributes its header, so the corpus records every URL that was seen.
pub fn build_corpus(pages: &[PageCapture]) -> Corpus {
    let mut text = String::new();
    let mut section_count = 0;

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        text.push_str("===== ");
        text.push_str(&page.url);
        text.push_str(" =====\n");

        for section in &page.sections {
            section_count += 1;
            text.push_str("## ");
            text.push_str(&section.title);
            text.push('\n');
            if !section.content.is_empty() {
                text.push_str(&section.content);
                text.push('\n');
            }
        }
    }

    let sha256 = {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    };

    debug!(
        pages = pages.len(),
        sections = section_count,
        bytes = text.len(),
        "corpus built"
    );

    Corpus {
        text,
        page_count: pages.len(),
        section_count,
        sha256,
    }
}
