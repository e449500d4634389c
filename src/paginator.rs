use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::error::{truncate_chars, ScrapeError, SNIPPET_CHARS};
use crate::progress::{Event, Observer};
use crate::record::{RawRecord, ResultPage};
use crate::settings::Endpoint;
use crate::transport::Transport;

/// Per-request transport timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for one traversal.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub hits_per_page: u32,
    pub delay: Duration,
    /// Upper bound on pages fetched; `None` fetches everything declared.
    pub max_pages: Option<u64>,
    /// Value of the `categoryId` filter.
    pub category: String,
}

impl PageSettings {
    pub fn filter(&self) -> String {
        format!("categoryId:{}", self.category)
    }

    /// Declared page count clamped by the cap. Page 0 is always fetched.
    pub fn pages_to_fetch(&self, declared: u64) -> u64 {
        let capped = match self.max_pages {
            Some(cap) if cap > 0 => declared.min(cap),
            _ => declared,
        };
        capped.max(1)
    }
}

/// Query body for one page of the category listing.
pub fn build_payload(page: u64, settings: &PageSettings) -> Value {
    json!({
        "attributesToHighlight": ["productName", "shortDescription", "description"],
        "attributesToRetrieve": ["*"],
        "clickAnalytics": true,
        "facets": ["*"],
        "filters": settings.filter(),
        "highlightPostTag": "</em>",
        "highlightPreTag": "<em>",
        "hitsPerPage": settings.hits_per_page,
        "maxValuesPerFacet": 100,
        "page": page,
    })
}

pub fn fetch_page<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &Endpoint,
    page: u64,
    settings: &PageSettings,
) -> Result<ResultPage, ScrapeError> {
    let payload = build_payload(page, settings);
    debug!(page, "POST {}", endpoint.url);
    let resp = transport.post(&endpoint.url, &endpoint.headers, &payload, REQUEST_TIMEOUT)?;
    if !resp.is_success() {
        return Err(ScrapeError::Request {
            status: resp.status,
            body: truncate_chars(&resp.body, SNIPPET_CHARS),
        });
    }
    parse_page(&resp.body)
}

/// Decode a successful response body. `hits` is mandatory; missing totals
/// default to one page and zero hits.
pub fn parse_page(body: &str) -> Result<ResultPage, ScrapeError> {
    let value: Value = serde_json::from_str(body)?;
    let shape_error = |value: &Value| ScrapeError::ResponseShape {
        keys: value
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default(),
        snippet: truncate_chars(&value.to_string(), SNIPPET_CHARS),
    };

    let hits = match value.get("hits") {
        Some(Value::Array(hits)) => hits.clone(),
        _ => return Err(shape_error(&value)),
    };

    Ok(ResultPage {
        total_hits: value.get("nbHits").and_then(Value::as_u64).unwrap_or(0),
        total_pages: value.get("nbPages").and_then(Value::as_u64).unwrap_or(1),
        records: hits.into_iter().map(RawRecord::from_value).collect(),
    })
}

/// Lazy, sequential traversal of every page of the listing.
///
/// Page 0 is fetched on the first call to `next`; its declared page count
/// decides how many follow. Pages are requested in ascending order with
/// `delay` slept before each one after the first. The first error is yielded
/// once and ends the iteration.
pub struct Paginator<'a, T: ?Sized, O: ?Sized> {
    transport: &'a T,
    endpoint: &'a Endpoint,
    settings: &'a PageSettings,
    observer: &'a mut O,
    next_page: u64,
    pages_to_fetch: Option<u64>,
    total_rows: usize,
    finished: bool,
}

impl<'a, T, O> Paginator<'a, T, O>
where
    T: Transport + ?Sized + 'a,
    O: Observer + ?Sized + 'a,
{
    pub fn new(
        transport: &'a T,
        endpoint: &'a Endpoint,
        settings: &'a PageSettings,
        observer: &'a mut O,
    ) -> Self {
        Paginator {
            transport,
            endpoint,
            settings,
            observer,
            next_page: 0,
            pages_to_fetch: None,
            total_rows: 0,
            finished: false,
        }
    }

    /// Flatten pages into individual hits.
    pub fn records(self) -> impl Iterator<Item = Result<RawRecord, ScrapeError>> + 'a {
        self.flat_map(|page| match page {
            Ok(page) => page.records.into_iter().map(Ok).collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        })
    }
}

impl<'a, T, O> Iterator for Paginator<'a, T, O>
where
    T: Transport + ?Sized,
    O: Observer + ?Sized,
{
    type Item = Result<ResultPage, ScrapeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if matches!(self.pages_to_fetch, Some(n) if self.next_page >= n) {
            self.finished = true;
            return None;
        }

        let page = self.next_page;
        if page > 0 && !self.settings.delay.is_zero() {
            thread::sleep(self.settings.delay);
        }

        let result = match fetch_page(self.transport, self.endpoint, page, self.settings) {
            Ok(result) => result,
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        let pages_to_fetch = match self.pages_to_fetch {
            Some(n) => n,
            None => {
                let n = self.settings.pages_to_fetch(result.total_pages);
                self.pages_to_fetch = Some(n);
                self.observer.observe(&Event::Started {
                    total_hits: result.total_hits,
                    total_pages: result.total_pages,
                    pages_to_fetch: n,
                    hits_per_page: self.settings.hits_per_page,
                    filter: self.settings.filter(),
                });
                n
            }
        };

        self.total_rows += result.records.len();
        self.observer.observe(&Event::PageFetched {
            page,
            pages_to_fetch,
            total_rows: self.total_rows,
        });
        self.next_page += 1;
        Some(Ok(result))
    }
}
