//! Structured progress events emitted by the paginator and the cleaner.
//!
//! The core only produces [`Event`]s; formatting belongs to an [`Observer`].

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// First page received; totals are what the index declared.
    Started {
        total_hits: u64,
        total_pages: u64,
        pages_to_fetch: u64,
        hits_per_page: u32,
        filter: String,
    },
    /// `page` is zero-based; `total_rows` is cumulative across pages.
    PageFetched {
        page: u64,
        pages_to_fetch: u64,
        total_rows: usize,
    },
    DroppedEmptyReference { before: usize, after: usize },
    Deduplicated { before: usize, after: usize },
}

pub trait Observer {
    fn observe(&mut self, event: &Event);
}

/// Discards everything.
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&mut self, _event: &Event) {}
}

/// One log line per event.
pub struct LogObserver;

impl Observer for LogObserver {
    fn observe(&mut self, event: &Event) {
        log_event(event);
    }
}

fn log_event(event: &Event) {
    match event {
        Event::Started {
            total_hits,
            total_pages,
            hits_per_page,
            filter,
            ..
        } => info!(
            "nbHits={}, nbPages={}, hitsPerPage={}, filter={}",
            total_hits, total_pages, hits_per_page, filter
        ),
        Event::PageFetched {
            page,
            pages_to_fetch,
            total_rows,
        } => info!(
            "fetched page {}/{} | total_rows={}",
            page + 1,
            pages_to_fetch,
            total_rows
        ),
        Event::DroppedEmptyReference { before, after } => {
            info!("[QA] drop empty reference_code: {} -> {}", before, after)
        }
        Event::Deduplicated { before, after } => {
            info!("[QA] dedup by reference_code: {} -> {}", before, after)
        }
    }
}

/// Terminal progress bar over pages; cleaning steps go to the log.
#[derive(Default)]
pub struct BarObserver {
    bar: Option<ProgressBar>,
}

impl BarObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn finish(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl Observer for BarObserver {
    fn observe(&mut self, event: &Event) {
        match event {
            Event::Started { pages_to_fetch, .. } => {
                log_event(event);
                let pb = ProgressBar::new(*pages_to_fetch);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages | {msg}")
                {
                    pb.set_style(style.progress_chars("=> "));
                }
                self.bar = Some(pb);
            }
            Event::PageFetched {
                page,
                pages_to_fetch,
                total_rows,
            } => {
                let Some(pb) = self.bar.clone() else {
                    log_event(event);
                    return;
                };
                pb.set_position(page + 1);
                pb.set_message(format!("{} rows", total_rows));
                if page + 1 >= *pages_to_fetch {
                    self.finish();
                }
            }
            _ => {
                self.finish();
                log_event(event);
            }
        }
    }
}

impl Drop for BarObserver {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Keeps every event, for assertions.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Vec<Event>,
}

#[cfg(test)]
impl Observer for RecordingObserver {
    fn observe(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}
