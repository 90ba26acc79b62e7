// Backup pipeline: fetch -> select -> rank -> transfer -> report.
// Every stage runs sequentially on the calling thread.

use chrono::{DateTime, Local};
use std::path::PathBuf;

use crate::destination::Destination;
use crate::error::{Error, Result};
use crate::report::{self, TransferResult};
use crate::selection::{self, SelectedPhoto};
use crate::ui;
use crate::vk::PhotoRecord;

/// Supplier of photo metadata and content.
pub trait PhotoSource {
    fn list_photos(&self) -> Result<Vec<PhotoRecord>>;
    fn fetch_content(&self, url: &str) -> Result<Vec<u8>>;
}

/// State shared by every stage of a single run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub started_at: DateTime<Local>,
    pub deep: usize,
    pub report_path: PathBuf,
    pub show_progress: bool,
}

impl RunContext {
    pub fn new(deep: usize, report_path: PathBuf) -> Self {
        RunContext {
            started_at: Local::now(),
            deep,
            report_path,
            show_progress: false,
        }
    }

    /// Name of the run directory or Drive folder, e.g. `2024-05-01-120000`.
    pub fn folder_name(&self) -> String {
        self.started_at.format("%Y-%m-%d-%H%M%S").to_string()
    }
}

fn transfer(
    source: &dyn PhotoSource,
    destination: &mut dyn Destination,
    photo: &SelectedPhoto,
) -> Result<TransferResult> {
    let file_name = photo.file_name();
    let content = source.fetch_content(&photo.url)?;
    destination.store(&file_name, &content)?;
    Ok(TransferResult {
        file_name,
        size: photo.size_type.clone(),
    })
}

/// Run the backup and write the report if anything was transferred.
///
/// VK application errors on the photo list end the run with no transfers.
/// Per-item remote failures are logged and skipped; local filesystem
/// failures abort the run.
pub fn run(
    ctx: &RunContext,
    source: &dyn PhotoSource,
    destination: &mut dyn Destination,
) -> Result<Vec<TransferResult>> {
    let records = match source.list_photos() {
        Ok(records) => records,
        Err(Error::VkApi { code, message }) => {
            tracing::error!("VK API error {}: {}", code, message);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let ranked = selection::rank(selection::select_all(&records), ctx.deep);
    tracing::info!(
        "{} of {} photo(s) selected for {}",
        ranked.len(),
        records.len(),
        destination.describe()
    );

    let progress = ui::transfer_progress(ctx.show_progress, ranked.len() as u64);
    let mut results = Vec::with_capacity(ranked.len());
    for photo in &ranked {
        progress.set_message(photo.file_name());
        match transfer(source, destination, photo) {
            Ok(result) => results.push(result),
            Err(e) if e.is_fatal() => {
                progress.abandon();
                return Err(e);
            }
            Err(e) => tracing::warn!("Failed to transfer {}: {}", photo.file_name(), e),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if let Err(e) = destination.finish() {
        if e.is_fatal() {
            return Err(e);
        }
        tracing::warn!("Failed to finalize {}: {}", destination.describe(), e);
    }

    if results.is_empty() {
        tracing::info!("No photos transferred; report left untouched");
    } else {
        report::save_report(&ctx.report_path, &results)?;
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vk::{Likes, Size};
    use std::cell::RefCell;
    use std::collections::HashSet;

    struct FakeSource {
        photos: std::result::Result<Vec<PhotoRecord>, (i64, String)>,
        failing_urls: HashSet<String>,
        fetched: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn with(photos: Vec<PhotoRecord>) -> Self {
            FakeSource {
                photos: Ok(photos),
                failing_urls: HashSet::new(),
                fetched: RefCell::new(Vec::new()),
            }
        }

        fn api_error(message: &str) -> Self {
            FakeSource {
                photos: Err((5, message.into())),
                failing_urls: HashSet::new(),
                fetched: RefCell::new(Vec::new()),
            }
        }
    }

    impl PhotoSource for FakeSource {
        fn list_photos(&self) -> Result<Vec<PhotoRecord>> {
            match &self.photos {
                Ok(photos) => Ok(photos.clone()),
                Err((code, message)) => Err(Error::VkApi {
                    code: *code,
                    message: message.clone(),
                }),
            }
        }

        fn fetch_content(&self, url: &str) -> Result<Vec<u8>> {
            self.fetched.borrow_mut().push(url.to_string());
            if self.failing_urls.contains(url) {
                return Err(Error::Drive {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    #[derive(Default)]
    struct MemoryDestination {
        stored: Vec<(String, Vec<u8>)>,
        fail_with_io: bool,
        finished: bool,
    }

    impl Destination for MemoryDestination {
        fn store(&mut self, file_name: &str, content: &[u8]) -> Result<()> {
            if self.fail_with_io {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.stored.push((file_name.to_string(), content.to_vec()));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".into()
        }
    }

    fn photo(date: i64, likes: u64, sizes: &[(&str, &str)]) -> PhotoRecord {
        PhotoRecord {
            id: date,
            owner_id: 1,
            date,
            likes: Likes { count: likes },
            sizes: sizes
                .iter()
                .map(|(code, url)| Size {
                    type_: code.to_string(),
                    url: url.to_string(),
                    width: None,
                    height: None,
                })
                .collect(),
        }
    }

    fn context(dir: &tempfile::TempDir, deep: usize) -> RunContext {
        RunContext::new(deep, dir.path().join("result.json"))
    }

    #[test]
    fn test_newest_photo_is_transferred() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, 1);
        let source = FakeSource::with(vec![
            photo(100, 3, &[("z", "u1")]),
            photo(200, 1, &[("y", "u2")]),
        ]);
        let mut dest = MemoryDestination::default();

        let results = run(&ctx, &source, &mut dest).unwrap();

        assert_eq!(
            results,
            vec![TransferResult {
                file_name: "200_1.jpg".into(),
                size: "y".into(),
            }]
        );
        assert_eq!(dest.stored, vec![("200_1.jpg".to_string(), b"u2".to_vec())]);
        assert!(dest.finished);
        assert_eq!(report::load_report(&ctx.report_path).unwrap(), results);
    }

    #[test]
    fn test_unsupported_size_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, 5);
        let source = FakeSource::with(vec![photo(300, 0, &[("x", "u3")])]);
        let mut dest = MemoryDestination::default();

        let results = run(&ctx, &source, &mut dest).unwrap();

        assert!(results.is_empty());
        assert!(dest.stored.is_empty());
        assert!(source.fetched.borrow().is_empty());
        assert!(!ctx.report_path.exists());
    }

    #[test]
    fn test_api_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, 5);
        let source = FakeSource::api_error("invalid token");
        let mut dest = MemoryDestination::default();

        let results = run(&ctx, &source, &mut dest).unwrap();

        assert!(results.is_empty());
        assert!(dest.stored.is_empty());
        assert!(!ctx.report_path.exists());
    }

    #[test]
    fn test_zero_deep_makes_no_transfer_calls() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, 0);
        let source = FakeSource::with(vec![photo(100, 3, &[("z", "u1")])]);
        let mut dest = MemoryDestination::default();

        let results = run(&ctx, &source, &mut dest).unwrap();

        assert!(results.is_empty());
        assert!(source.fetched.borrow().is_empty());
        assert!(dest.stored.is_empty());
        assert!(!ctx.report_path.exists());
    }

    #[test]
    fn test_transfers_in_ranked_order_up_to_deep() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, 3);
        let source = FakeSource::with(vec![
            photo(100, 1, &[("z", "a")]),
            photo(400, 2, &[("y", "b"), ("z", "b-z")]),
            photo(300, 3, &[("y", "c")]),
            photo(400, 4, &[("z", "d")]),
            photo(200, 5, &[("z", "e")]),
        ]);
        let mut dest = MemoryDestination::default();

        let results = run(&ctx, &source, &mut dest).unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["400_2.jpg", "400_4.jpg", "300_3.jpg"]);
        assert_eq!(*source.fetched.borrow(), vec!["b-z", "d", "c"]);
        assert_eq!(results[2].size, "y");
    }

    #[test]
    fn test_remote_failure_skips_item() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, 5);
        let mut source = FakeSource::with(vec![
            photo(300, 1, &[("z", "ok-1")]),
            photo(200, 2, &[("z", "broken")]),
            photo(100, 3, &[("z", "ok-2")]),
        ]);
        source.failing_urls.insert("broken".into());
        let mut dest = MemoryDestination::default();

        let results = run(&ctx, &source, &mut dest).unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["300_1.jpg", "100_3.jpg"]);
        assert_eq!(source.fetched.borrow().len(), 3);
        assert_eq!(report::load_report(&ctx.report_path).unwrap(), results);
    }

    #[test]
    fn test_filesystem_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, 5);
        let source = FakeSource::with(vec![
            photo(300, 1, &[("z", "u1")]),
            photo(200, 2, &[("z", "u2")]),
        ]);
        let mut dest = MemoryDestination {
            fail_with_io: true,
            ..Default::default()
        };

        let err = run(&ctx, &source, &mut dest).unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(source.fetched.borrow().len(), 1);
        assert!(!ctx.report_path.exists());
    }

    #[test]
    fn test_folder_name_is_sortable_timestamp() {
        let mut ctx = RunContext::new(5, PathBuf::from("result.json"));
        ctx.started_at = chrono::TimeZone::with_ymd_and_hms(&Local, 2024, 5, 1, 9, 3, 7).unwrap();
        assert_eq!(ctx.folder_name(), "2024-05-01-090307");
    }
}
