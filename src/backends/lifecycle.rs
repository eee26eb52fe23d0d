//! File backend lifecycle shared by the rotating and unique backends
//!
//! Covers the on-disk naming contract, directory bootstrap, opening files for
//! append and age-based retention cleanup. Retention only ever touches regular
//! files whose names parse under the backend's naming scheme.

use crate::core::error::{LoggerError, Result};
use crate::core::fs::FileSystem;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const DAILY_LAYOUT: &str = "DDDD-DD-DD";
const UNIQUE_LAYOUT: &str = "DDDD-DD-DD_DD-DD-DD-DDD";

/// Check `text` against a layout where `D` stands for an ASCII digit.
fn matches_layout(text: &str, layout: &str) -> bool {
    text.len() == layout.len()
        && text
            .bytes()
            .zip(layout.bytes())
            .all(|(t, l)| if l == b'D' { t.is_ascii_digit() } else { t == l })
}

/// UTC calendar date of a millisecond timestamp
pub fn utc_date(timestamp_ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(timestamp_ms)
        .unwrap_or_default()
        .date_naive()
}

/// `YYYY-MM-DD.log`
pub fn daily_file_name(date: NaiveDate) -> String {
    format!("{}.log", date.format("%Y-%m-%d"))
}

/// Date embedded in a daily file name, accepting `.log` and `.log.gz`.
pub fn parse_daily_file_name(name: &str) -> Option<NaiveDate> {
    let stem = name
        .strip_suffix(".log.gz")
        .or_else(|| name.strip_suffix(".log"))?;
    if !matches_layout(stem, DAILY_LAYOUT) {
        return None;
    }
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

/// `YYYY-MM-DD_HH-MM-SS-mmm-<hash>.log`
pub fn unique_file_name(timestamp_ms: i64, hash: &str) -> String {
    let time = DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default();
    format!("{}-{}.log", time.format("%Y-%m-%d_%H-%M-%S-%3f"), hash)
}

/// Timestamp embedded in a unique file name. The hash segment must be
/// non-empty ASCII alphanumeric.
pub fn parse_unique_file_name(name: &str) -> Option<NaiveDateTime> {
    let rest = name.strip_suffix(".log")?;
    let (stamp, hash) = (rest.get(..UNIQUE_LAYOUT.len())?, rest.get(UNIQUE_LAYOUT.len()..)?);
    let hash = hash.strip_prefix('-')?;
    if hash.is_empty() || !hash.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    if !matches_layout(stamp, UNIQUE_LAYOUT) {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d_%H-%M-%S-%3f").ok()
}

/// Create the log directory (recursively) if needed.
///
/// # Errors
///
/// Returns a filesystem error if the directory cannot be created
pub fn ensure_directory(fs: &dyn FileSystem, directory: &Path) -> Result<()> {
    fs.create_dir_all(directory)
        .map_err(|e| LoggerError::filesystem("creating log directory", directory, e))
}

/// Open `path` for appending, creating it if missing.
///
/// # Errors
///
/// Returns a filesystem error if the file cannot be opened
pub fn open_append(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggerError::filesystem("opening log file", path, e))?;
    Ok(BufWriter::new(file))
}

/// Create `path`, failing if it already exists.
pub fn create_new(path: &Path) -> std::io::Result<BufWriter<File>> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(BufWriter::new(file))
}

/// Oldest date retention keeps: anything dated before it is expired.
pub fn retention_cutoff(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Outcome of one retention pass
#[derive(Debug, Default)]
pub struct RetentionReport {
    pub removed: Vec<PathBuf>,
    /// Failures are reported here and on stderr, never returned as errors
    pub failures: Vec<LoggerError>,
}

/// Delete expired log files in `directory`.
///
/// A file is expired when `parse_date` recognizes its name and the date is
/// before `cutoff`. Files for which `keep` returns true are skipped. Errors
/// are collected and reported, never propagated.
pub fn cleanup_expired(
    fs: &dyn FileSystem,
    directory: &Path,
    cutoff: NaiveDate,
    parse_date: impl Fn(&str) -> Option<NaiveDate>,
    keep: impl Fn(&Path) -> bool,
) -> RetentionReport {
    let mut report = RetentionReport::default();

    let entries = match fs.list_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!(
                "[WARN] Failed to list log directory {} for cleanup: {}",
                directory.display(),
                e
            );
            report
                .failures
                .push(LoggerError::retention_cleanup(directory, e));
            return report;
        }
    };

    for path in entries {
        if !fs.is_file(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(date) = parse_date(name) else {
            continue;
        };
        if date >= cutoff || keep(&path) {
            continue;
        }
        match fs.remove_file(&path) {
            Ok(()) => report.removed.push(path),
            Err(e) => {
                eprintln!("[WARN] Failed to remove expired log {}: {}", path.display(), e);
                report.failures.push(LoggerError::retention_cleanup(&path, e));
            }
        }
    }
    report
}

/// Gzip `path` into `<path>.gz` and remove the original.
///
/// The archive is written to a temporary file first and renamed into place;
/// the original is only removed once the archive is complete.
#[cfg(feature = "compression")]
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    use std::io::{BufReader, Read, Write};

    let mut gz_name = path.as_os_str().to_os_string();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);
    let mut tmp_name = gz_path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let temp_gz_path = PathBuf::from(tmp_name);

    let input = File::open(path)
        .map_err(|e| LoggerError::filesystem("opening log file for compression", path, e))?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_gz_path)
        .map_err(|e| LoggerError::filesystem("creating compressed log", &temp_gz_path, e))?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let mut buffer = vec![0u8; 64 * 1024];
    let streamed = loop {
        match reader.read(&mut buffer) {
            Ok(0) => break Ok(()),
            Ok(n) => {
                if let Err(e) = encoder.write_all(&buffer[..n]) {
                    break Err(e);
                }
            }
            Err(e) => break Err(e),
        }
    };
    let finished = streamed.and_then(|()| encoder.finish()?.flush());
    if let Err(e) = finished {
        let _ = std::fs::remove_file(&temp_gz_path);
        return Err(LoggerError::filesystem("compressing log file", path, e));
    }

    std::fs::rename(&temp_gz_path, &gz_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_gz_path);
        LoggerError::filesystem("renaming compressed log", &gz_path, e)
    })?;

    if let Err(e) = std::fs::remove_file(path) {
        eprintln!(
            "[WARN] Compression succeeded but failed to remove original file {}: {}",
            path.display(),
            e
        );
    }
    Ok(gz_path)
}

#[cfg(not(feature = "compression"))]
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    Err(LoggerError::config(
        "RotatingFileBackend",
        format!(
            "cannot compress '{}': built without the `compression` feature",
            path.display()
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs::LocalFileSystem;
    use std::io;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_names() {
        let day = date(2024, 1, 5);
        assert_eq!(daily_file_name(day), "2024-01-05.log");
        assert_eq!(parse_daily_file_name("2024-01-05.log"), Some(day));
        assert_eq!(parse_daily_file_name("2024-01-05.log.gz"), Some(day));
        assert_eq!(parse_daily_file_name("2024-1-5.log"), None);
        assert_eq!(parse_daily_file_name("2024-02-30.log"), None);
        assert_eq!(parse_daily_file_name("2024-01-05.txt"), None);
        assert_eq!(parse_daily_file_name("app.log"), None);
        assert_eq!(parse_daily_file_name("+2024-01-05.log"), None);
    }

    #[test]
    fn test_unique_names() {
        let name = unique_file_name(1_704_450_030_042, "aB3dE5fG");
        assert_eq!(name, "2024-01-05_10-20-30-042-aB3dE5fG.log");

        let parsed = parse_unique_file_name(&name).unwrap();
        assert_eq!(parsed.and_utc().timestamp_millis(), 1_704_450_030_042);

        assert!(parse_unique_file_name("2024-01-05_10-20-30-042-.log").is_none());
        assert!(parse_unique_file_name("2024-01-05_10-20-30-042-ab_c.log").is_none());
        assert!(parse_unique_file_name("2024-01-05_10-20-30-042.log").is_none());
        assert!(parse_unique_file_name("2024-01-05.log").is_none());
        assert!(parse_unique_file_name("2024-01-05_10-20-30-042-é.log").is_none());
    }

    #[test]
    fn test_utc_date() {
        assert_eq!(utc_date(1_704_499_199_999), date(2024, 1, 5));
        assert_eq!(utc_date(1_704_499_200_000), date(2024, 1, 6));
    }

    #[test]
    fn test_retention_cutoff() {
        assert_eq!(retention_cutoff(date(2024, 3, 1), 30), date(2024, 1, 31));
        assert_eq!(retention_cutoff(date(2024, 3, 1), 0), date(2024, 3, 1));
    }

    #[test]
    fn test_cleanup_expired_keeps_recent_and_foreign_files() {
        let dir = tempdir().unwrap();
        let today = date(2024, 6, 15);
        let names = [
            daily_file_name(today - Days::new(40)),
            daily_file_name(today - Days::new(10)),
            daily_file_name(today),
            "notes.txt".to_string(),
            "2020-01-01.backup".to_string(),
        ];
        for name in &names {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("2000-01-01.log")).unwrap();

        let report = cleanup_expired(
            &LocalFileSystem,
            dir.path(),
            retention_cutoff(today, 30),
            parse_daily_file_name,
            |_| false,
        );

        assert_eq!(report.removed, vec![dir.path().join(&names[0])]);
        assert!(report.failures.is_empty());
        for name in &names[1..] {
            assert!(dir.path().join(name).exists(), "{} should survive", name);
        }
        assert!(dir.path().join("2000-01-01.log").is_dir());
    }

    #[test]
    fn test_cleanup_respects_keep() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("2000-01-01.log");
        std::fs::write(&old, "x").unwrap();
        let report = cleanup_expired(
            &LocalFileSystem,
            dir.path(),
            date(2024, 1, 1),
            parse_daily_file_name,
            |p| p == old,
        );
        assert!(report.removed.is_empty());
        assert!(old.exists());
    }

    struct ReadOnlyFs;

    impl FileSystem for ReadOnlyFs {
        fn create_dir_all(&self, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
        fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
            LocalFileSystem.list_dir(path)
        }
        fn exists(&self, path: &Path) -> bool {
            path.exists()
        }
        fn is_file(&self, path: &Path) -> bool {
            path.is_file()
        }
        fn remove_file(&self, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test]
    fn test_cleanup_failures_are_reported_not_raised() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("2000-01-01.log"), "x").unwrap();

        let report = cleanup_expired(
            &ReadOnlyFs,
            dir.path(),
            date(2024, 1, 1),
            parse_daily_file_name,
            |_| false,
        );
        assert!(report.removed.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0].kind(),
            crate::core::error::ErrorKind::RetentionCleanup
        );

        let missing = cleanup_expired(
            &LocalFileSystem,
            &dir.path().join("missing"),
            date(2024, 1, 1),
            parse_daily_file_name,
            |_| false,
        );
        assert_eq!(missing.failures.len(), 1);
    }

    #[test]
    fn test_ensure_directory_error() {
        let err = ensure_directory(&ReadOnlyFs, Path::new("/nowhere")).unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Filesystem);
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_compress_file() {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let dir = tempdir().unwrap();
        let path = dir.path().join("2024-01-05.log");
        std::fs::write(&path, "line one\nline two\n").unwrap();

        let gz_path = compress_file(&path).unwrap();
        assert_eq!(gz_path, dir.path().join("2024-01-05.log.gz"));
        assert!(!path.exists());
        assert!(!dir.path().join("2024-01-05.log.gz.tmp").exists());

        let mut text = String::new();
        GzDecoder::new(File::open(&gz_path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "line one\nline two\n");
        assert_eq!(parse_daily_file_name("2024-01-05.log.gz"), Some(date(2024, 1, 5)));
    }
}
