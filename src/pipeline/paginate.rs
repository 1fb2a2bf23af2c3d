// src/pipeline/paginate.rs

//! Page walking with content-hash deduplication.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::models::Record;
use crate::pipeline::parse::RecordParser;
use crate::services::{AuthenticatedFetcher, FetchedPage, TextExtractor};
use crate::utils::page_url;
use crate::utils::shutdown::Shutdown;

/// SHA-256 of a page body, hex encoded.
pub fn fingerprint(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Lazy walk over the pages of one list.
///
/// Yields pages in index order and ends at the page ceiling or at the first
/// page whose content was already seen during this walk. A walk cannot be
/// restarted; build a new one for the next pass.
pub struct PageWalk<'a> {
    fetcher: &'a dyn AuthenticatedFetcher,
    base_url: &'a str,
    page_limit: usize,
    next_index: usize,
    seen: HashSet<String>,
    finished: bool,
}

impl<'a> PageWalk<'a> {
    pub fn new(fetcher: &'a dyn AuthenticatedFetcher, base_url: &'a str, page_limit: usize) -> Self {
        Self {
            fetcher,
            base_url,
            page_limit,
            next_index: 0,
            seen: HashSet::new(),
            finished: false,
        }
    }

    /// Next new page, or `None` once the walk has ended.
    pub async fn next_page(&mut self) -> Result<Option<(usize, FetchedPage)>, FetchError> {
        if self.finished || self.next_index >= self.page_limit {
            self.finished = true;
            return Ok(None);
        }

        let index = self.next_index;
        let url = page_url(self.base_url, index);
        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };
        info!(
            url = %url,
            page = index,
            status = page.status,
            bytes = page.body.len(),
            content_type = %page.content_type,
            "Fetched page"
        );

        if !self.seen.insert(fingerprint(&page.body)) {
            info!(page = index, "Page repeats earlier content, stopping pagination");
            self.finished = true;
            return Ok(None);
        }

        self.next_index += 1;
        Ok(Some((index, page)))
    }

    pub fn pages_seen(&self) -> usize {
        self.seen.len()
    }
}

/// Records gathered from one list.
#[derive(Debug, Default)]
pub struct ListScan {
    pub records: Vec<Record>,
    pub pages: usize,
    pub interrupted: bool,
}

/// Walks a list and turns its pages into records.
pub struct PaginatedFetcher<'a> {
    fetcher: &'a dyn AuthenticatedFetcher,
    extractor: &'a dyn TextExtractor,
    parser: &'a RecordParser,
    page_limit: usize,
}

impl<'a> PaginatedFetcher<'a> {
    pub fn new(
        fetcher: &'a dyn AuthenticatedFetcher,
        extractor: &'a dyn TextExtractor,
        parser: &'a RecordParser,
        page_limit: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            parser,
            page_limit,
        }
    }

    /// Fetch and parse every distinct page of the list at `base_url`.
    pub async fn scan(
        &self,
        base_url: &str,
        list_label: &str,
        shutdown: &Shutdown,
    ) -> Result<ListScan, FetchError> {
        let mut walk = PageWalk::new(self.fetcher, base_url, self.page_limit);
        let mut scan = ListScan::default();

        loop {
            if shutdown.is_requested() {
                info!(list = list_label, "Shutdown requested, abandoning list");
                scan.interrupted = true;
                break;
            }

            let Some((index, page)) = walk.next_page().await? else {
                break;
            };

            let lines = self.extractor.extract(&page.body, page.kind);
            if lines.is_empty() {
                warn!(list = list_label, page = index, "No text extracted from page");
            }
            let records = self.parser.parse_page(list_label, index, &lines);
            debug!(
                list = list_label,
                page = index,
                lines = lines.len(),
                "Extracted lines"
            );
            info!(list = list_label, page = index, records = records.len(), "Matching records");
            scan.records.extend(records);
        }

        scan.pages = walk.pages_seen();
        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::AuthError;
    use crate::models::{ContentKind, LoginConfig};

    struct PagedSite {
        pages: HashMap<String, &'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl PagedSite {
        fn new(pages: &[(&str, &'static str)]) -> Self {
            Self {
                pages: pages.iter().map(|(u, b)| (u.to_string(), *b)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthenticatedFetcher for PagedSite {
        async fn login(&self, _login: &LoginConfig) -> Result<(), AuthError> {
            Ok(())
        }

        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(body) => Ok(FetchedPage::new(url, 200, body.as_bytes().to_vec(), "text/plain")),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    struct Lines;

    impl TextExtractor for Lines {
        fn extract(&self, body: &[u8], _kind: ContentKind) -> Vec<String> {
            String::from_utf8_lossy(body).lines().map(str::to_string).collect()
        }
    }

    fn parser() -> RecordParser {
        RecordParser::new(&["A1234".to_string()]).unwrap()
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(fingerprint(b"a"), fingerprint(b"b"));
    }

    #[tokio::test]
    async fn test_stops_on_any_repeated_page() {
        let site = PagedSite::new(&[
            ("https://x.test/l/0", "1 A1234"),
            ("https://x.test/l/1", "2 A1234"),
            ("https://x.test/l/2", "1 A1234"),
            ("https://x.test/l/3", "3 A1234"),
        ]);
        let parser = parser();
        let pager = PaginatedFetcher::new(&site, &Lines, &parser, 20);

        let scan = pager
            .scan("https://x.test/l", "Rappel", &Shutdown::never())
            .await
            .unwrap();

        assert_eq!(site.calls().len(), 3);
        assert_eq!(scan.pages, 2);
        let ranks: Vec<u32> = scan.records.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert!(!scan.interrupted);
    }

    #[tokio::test]
    async fn test_stops_at_page_limit() {
        let site = PagedSite::new(&[
            ("https://x.test/l/0", "1 A1234"),
            ("https://x.test/l/1", "2 A1234"),
            ("https://x.test/l/2", "3 A1234"),
        ]);
        let parser = parser();
        let pager = PaginatedFetcher::new(&site, &Lines, &parser, 2);

        let scan = pager
            .scan("https://x.test/l", "Rappel", &Shutdown::never())
            .await
            .unwrap();

        assert_eq!(site.calls(), vec!["https://x.test/l/0", "https://x.test/l/1"]);
        assert_eq!(scan.records.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let site = PagedSite::new(&[("https://x.test/l/0", "1 A1234")]);
        let parser = parser();
        let pager = PaginatedFetcher::new(&site, &Lines, &parser, 5);

        let err = pager
            .scan("https://x.test/l", "Rappel", &Shutdown::never())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_shutdown_stops_between_pages() {
        let site = PagedSite::new(&[("https://x.test/l/0", "1 A1234")]);
        let parser = parser();
        let pager = PaginatedFetcher::new(&site, &Lines, &parser, 5);

        let (trigger, shutdown) = Shutdown::new();
        trigger.fire();
        let scan = pager.scan("https://x.test/l", "Rappel", &shutdown).await.unwrap();

        assert!(scan.interrupted);
        assert!(site.calls().is_empty());
    }
}
