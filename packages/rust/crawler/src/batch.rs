//! Fixed-size URL batching.
//!
//! The crawl list is split into contiguous batches before fetching; the
//! engine runs one batch at a time, so the batch size is also the ceiling
//! on concurrent requests.

/// URLs fetched concurrently per batch when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// A contiguous slice of the crawl list, tagged with the offset of its
/// first URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBatch {
    /// Offset of the first URL within the full crawl list.
    pub index: usize,
    /// URLs in sitemap order.
    pub urls: Vec<String>,
}

/// Split `urls` into batches of at most `size`, preserving order.
///
/// Batch `k` starts at offset `k * size` and carries that offset as its
/// `index`. A `size` of zero produces no batches.
pub fn chunk(urls: &[String], size: usize) -> Vec<UrlBatch> {
    if size == 0 {
        return Vec::new();
    }

    urls.chunks(size)
        .enumerate()
        .map(|(k, slice)| UrlBatch {
            index: k * size,
            urls: slice.to_vec(),
        })
        .collect()
}
