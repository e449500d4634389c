use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::record::{CanonicalRow, Dataset};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn now_ts() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Write `dataset` to `{out_dir}/{base_name}_{timestamp}.csv`. Never
/// overwrites: a clashing name gets a `_1`, `_2`, ... suffix.
pub fn save_csv(dataset: &Dataset, out_dir: &Path, base_name: &str) -> Result<PathBuf> {
    save_csv_stamped(dataset, out_dir, base_name, &now_ts())
}

pub fn save_csv_stamped(
    dataset: &Dataset,
    out_dir: &Path,
    base_name: &str,
    stamp: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    let (path, file) = create_unique(out_dir, base_name, stamp)?;
    write_csv(dataset, file).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        "[OK] saved: {} | rows={} cols={}",
        path.display(),
        dataset.len(),
        dataset.column_count()
    );
    Ok(path)
}

fn create_unique(dir: &Path, base_name: &str, stamp: &str) -> Result<(PathBuf, File)> {
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => format!("{}_{}.csv", base_name, stamp),
            n => format!("{}_{}_{}.csv", base_name, stamp, n),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()))
            }
        }
    }
}

/// Header row plus one line per row, prefixed by a UTF-8 BOM.
pub fn write_csv<W: Write>(dataset: &Dataset, mut out: W) -> Result<()> {
    out.write_all(UTF8_BOM)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    writer.write_record(CanonicalRow::COLUMNS)?;
    for row in dataset.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean;
    use crate::progress::NoopObserver;
    use rust_decimal::Decimal;

    fn dataset() -> Dataset {
        clean(
            vec![
                CanonicalRow {
                    reference_code: "CRWSTA0030".into(),
                    local_reference: "WSTA0030".into(),
                    title: "Santos, grand modèle".into(),
                    price: Some(Decimal::new(735000, 2)),
                    currency: "EUR".into(),
                    url: "https://www.cartier.com/x".into(),
                    collection: "Santos".into(),
                    source_id: "1".into(),
                },
                CanonicalRow {
                    reference_code: "CRWGTA0041".into(),
                    currency: "EUR".into(),
                    ..Default::default()
                },
            ],
            &mut NoopObserver,
        )
    }

    #[test]
    fn csv_layout() {
        let mut buf = Vec::new();
        write_csv(&dataset(), &mut buf).unwrap();
        assert!(buf.starts_with(UTF8_BOM));
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "reference_code,local_reference,title,price,currency,url,collection,source_id",
                "CRWSTA0030,WSTA0030,\"Santos, grand modèle\",7350.00,EUR,https://www.cartier.com/x,Santos,1",
                "CRWGTA0041,,,,EUR,,,",
            ]
        );
    }

    #[test]
    fn empty_dataset_still_has_header() {
        let mut buf = Vec::new();
        write_csv(&Dataset::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("raw");
        let ds = dataset();
        let a = save_csv_stamped(&ds, &out, "current", "20260101_000000").unwrap();
        let b = save_csv_stamped(&ds, &out, "current", "20260101_000000").unwrap();
        assert_eq!(a.file_name().unwrap(), "current_20260101_000000.csv");
        assert_eq!(b.file_name().unwrap(), "current_20260101_000000_1.csv");
        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    }

    #[test]
    fn timestamp_format() {
        let ts = now_ts();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
    }
}
