use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::clean::clean;
use crate::error::ScrapeError;
use crate::normalize::Normalizer;
use crate::paginator::{PageSettings, Paginator};
use crate::progress::Observer;
use crate::record::Dataset;
use crate::settings::Endpoint;
use crate::sink;
use crate::transport::Transport;

/// Fetch every page, normalize each hit, then clean. Any fetch error aborts
/// the whole run; nothing partial is returned.
pub fn scrape_all<T, O>(
    transport: &T,
    endpoint: &Endpoint,
    settings: &PageSettings,
    normalizer: &Normalizer,
    observer: &mut O,
) -> Result<Dataset, ScrapeError>
where
    T: Transport + ?Sized,
    O: Observer + ?Sized,
{
    let mut rows = Vec::new();
    for record in Paginator::new(transport, endpoint, settings, &mut *observer).records() {
        rows.push(normalizer.normalize(&record?));
    }
    Ok(clean(rows, observer))
}

/// [`scrape_all`] followed by the CSV sink. The file is only created once the
/// dataset is complete.
pub fn run_to_csv<T, O>(
    transport: &T,
    endpoint: &Endpoint,
    settings: &PageSettings,
    normalizer: &Normalizer,
    observer: &mut O,
    out_dir: &Path,
    out_name: &str,
) -> Result<(Dataset, PathBuf)>
where
    T: Transport + ?Sized,
    O: Observer + ?Sized,
{
    let dataset = scrape_all(transport, endpoint, settings, normalizer, observer)?;
    info!("[QA] currency top: {:?}", dataset.currency_counts(10));
    let path = sink::save_csv(&dataset, out_dir, out_name)?;
    Ok((dataset, path))
}
