//! Dataset acquisition.
//!
//! Downloads a Kaggle dataset, inventories the CSV files it contains and
//! samples a schema for each, reporting everything through a single
//! [`AcquisitionResult`]. The pipeline never panics and never returns an
//! error to the caller: every failure is folded into an error-shaped result
//! so the agent can inspect `status` instead of catching anything.
//!
//! All I/O here is blocking by design; async callers run [`acquire`] inside
//! a blocking task.

pub mod kaggle;
pub mod schema;
pub mod slug;

pub use kaggle::{KaggleClient, KaggleCredentials, KaggleError};
pub use slug::{extract_slug, DatasetSlug, SlugError};

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

/// Download directory used when the caller does not supply one.
pub const DEFAULT_DOWNLOAD_PATH: &str = "./datasets";

/// Phase that produced an error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStep {
    UrlParsing,
    Auth,
    Download,
    Read,
    Unexpected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Context attached to every result.
///
/// Success carries `total_files` and `elapsed_seconds`; errors carry
/// `error_step`. The optional fields are skipped during serialization so the
/// JSON key set stays exact for each shape.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_step: Option<ErrorStep>,
}

/// The uniform return value of [`acquire`].
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionResult {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub dataset_slug: Option<String>,
    pub folder_path: Option<PathBuf>,
    pub csv_files: Vec<String>,
    pub schemas: BTreeMap<String, BTreeMap<String, String>>,
    pub metadata: Metadata,
}

impl AcquisitionResult {
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    fn ok(
        slug: &DatasetSlug,
        folder: PathBuf,
        csv_files: Vec<String>,
        schemas: BTreeMap<String, BTreeMap<String, String>>,
        elapsed_seconds: f64,
    ) -> Self {
        Self {
            status: Status::Ok,
            error_message: None,
            dataset_slug: Some(slug.to_string()),
            folder_path: Some(folder),
            metadata: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                total_files: Some(csv_files.len()),
                elapsed_seconds: Some(elapsed_seconds),
                error_step: None,
            },
            csv_files,
            schemas,
        }
    }

    /// Build an error-shaped result.
    ///
    /// Public because callers that fail before a client exists (credential
    /// resolution) report through the same shape.
    pub fn error(
        message: impl Into<String>,
        step: ErrorStep,
        slug: Option<&DatasetSlug>,
        folder: Option<PathBuf>,
    ) -> Self {
        let message = message.into();
        error!(step = ?step, "{message}");
        Self {
            status: Status::Error,
            error_message: Some(message),
            dataset_slug: slug.map(DatasetSlug::to_string),
            folder_path: folder,
            csv_files: Vec::new(),
            schemas: BTreeMap::new(),
            metadata: Metadata {
                timestamp: Utc::now().to_rfc3339(),
                total_files: None,
                elapsed_seconds: None,
                error_step: Some(step),
            },
        }
    }
}

/// Download the dataset referenced by `link` into `download_path` and
/// describe what arrived.
///
/// Phases run in order and abort independently: slug resolution
/// (`url_parsing`), directory preparation, download-and-unpack (`download`),
/// CSV inventory, per-file schema sampling (`read`). Failures outside the
/// classified phases are reported as `unexpected` with `folder_path` left as
/// the original, unresolved input path.
pub fn acquire(
    client: &KaggleClient,
    link: &str,
    download_path: impl AsRef<Path>,
) -> AcquisitionResult {
    let download_path = download_path.as_ref();
    info!(link, path = %download_path.display(), "starting dataset download");
    let started = Instant::now();

    let slug = match extract_slug(link) {
        Ok(slug) => slug,
        Err(err) => {
            return AcquisitionResult::error(
                format!("failed to parse dataset link: {err}"),
                ErrorStep::UrlParsing,
                None,
                None,
            );
        }
    };
    info!(%slug, "resolved dataset slug");

    let folder = match prepare_download_dir(download_path) {
        Ok(folder) => folder,
        Err(err) => {
            return AcquisitionResult::error(
                format!("unexpected error: {err}"),
                ErrorStep::Unexpected,
                None,
                Some(download_path.to_path_buf()),
            );
        }
    };

    if let Err(err) = client.download_dataset(&slug, &folder) {
        return AcquisitionResult::error(
            format!("download failed: {err}"),
            ErrorStep::Download,
            Some(&slug),
            Some(folder),
        );
    }
    info!(folder = %folder.display(), "dataset downloaded and unpacked");

    let csv_files = match list_csv_files(&folder) {
        Ok(files) => files,
        Err(err) => {
            return AcquisitionResult::error(
                format!("unexpected error: {err}"),
                ErrorStep::Unexpected,
                None,
                Some(download_path.to_path_buf()),
            );
        }
    };
    if csv_files.is_empty() {
        warn!("no CSV files found in downloaded dataset");
    }

    let mut schemas = BTreeMap::new();
    for name in &csv_files {
        match schema::sample_schema(&folder.join(name)) {
            Ok(columns) => {
                schemas.insert(name.clone(), columns);
            }
            Err(err) => {
                // Fail fast: the first unreadable file aborts the scan and the
                // partially built schema map is discarded with it.
                return AcquisitionResult::error(
                    format!("failed to read {name}: {err}"),
                    ErrorStep::Read,
                    Some(&slug),
                    Some(folder),
                );
            }
        }
    }

    let elapsed_seconds = started.elapsed().as_secs_f64();
    info!(
        total_files = csv_files.len(),
        elapsed_seconds, "dataset processing complete"
    );
    AcquisitionResult::ok(&slug, folder, csv_files, schemas, elapsed_seconds)
}

/// Resolve `path` to an absolute directory, creating it (and parents) if
/// absent. Re-running against an existing directory is not an error.
fn prepare_download_dir(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    let absolute: PathBuf = absolute
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();

    fs::create_dir_all(&absolute)?;
    Ok(absolute)
}

/// Files directly under `dir` whose name ends in `.csv`, case-sensitive,
/// sorted for a stable inventory. Subdirectories are not descended into.
fn list_csv_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut files: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".csv"))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::kaggle::tests::{serve_once, zip_fixture};
    use super::*;
    use std::collections::BTreeSet;

    fn test_client(base: String) -> KaggleClient {
        KaggleClient::with_api_base(KaggleCredentials::new("tester", "secret"), base)
    }

    fn json_keys(value: &serde_json::Value) -> BTreeSet<String> {
        value
            .as_object()
            .expect("object")
            .keys()
            .cloned()
            .collect()
    }

    fn assert_error_shape(result: &AcquisitionResult, step: ErrorStep) {
        assert_eq!(result.status, Status::Error);
        assert!(result.csv_files.is_empty());
        assert!(result.schemas.is_empty());
        assert_eq!(result.metadata.error_step, Some(step));

        let value = serde_json::to_value(result).expect("serialize");
        let expected: BTreeSet<String> = [
            "status",
            "error_message",
            "dataset_slug",
            "folder_path",
            "csv_files",
            "schemas",
            "metadata",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        assert_eq!(json_keys(&value), expected);

        let metadata_expected: BTreeSet<String> = ["timestamp", "error_step"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(json_keys(&value["metadata"]), metadata_expected);
    }

    #[test]
    fn bad_url_yields_url_parsing_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = test_client("http://127.0.0.1:9".to_string());
        let result = acquire(&client, "https://www.kaggle.com/", dir.path());

        assert_error_shape(&result, ErrorStep::UrlParsing);
        assert_eq!(result.dataset_slug, None);
        assert_eq!(result.folder_path, None);
    }

    #[test]
    fn unreachable_service_yields_download_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = test_client("http://127.0.0.1:9".to_string());
        let result = acquire(
            &client,
            "https://www.kaggle.com/datasets/user/name",
            dir.path(),
        );

        assert_error_shape(&result, ErrorStep::Download);
        // The slug and resolved folder survive into the error so the caller
        // can diagnose or retry by hand.
        assert_eq!(result.dataset_slug.as_deref(), Some("user/name"));
        assert_eq!(result.folder_path.as_deref(), Some(dir.path()));
    }

    #[test]
    fn successful_run_inventories_every_csv() {
        let body = zip_fixture(&[
            ("AAPL.csv", "Date,Close,Volume\n2020-01-02,300.35,33870100\n"),
            ("GOOG.csv", "Date,Close,Volume\n2020-01-02,1367.37,1406600\n"),
            ("notes.txt", "not tabular"),
        ]);
        let base = serve_once("200 OK", body);

        let dir = tempfile::tempdir().expect("temp dir");
        let client = test_client(base);
        let result = acquire(
            &client,
            "https://www.kaggle.com/datasets/user/stocks?resource=download",
            dir.path(),
        );

        assert!(result.is_ok(), "unexpected error: {:?}", result.error_message);
        assert_eq!(result.csv_files, vec!["AAPL.csv", "GOOG.csv"]);
        assert_eq!(result.schemas.len(), 2);
        assert_eq!(result.schemas["AAPL.csv"]["Close"], "float64");
        assert_eq!(result.schemas["AAPL.csv"]["Volume"], "int64");
        assert_eq!(result.schemas["AAPL.csv"]["Date"], "object");
        assert_eq!(result.dataset_slug.as_deref(), Some("user/stocks"));
        assert_eq!(result.metadata.total_files, Some(2));
        assert!(result.metadata.elapsed_seconds.is_some());
        assert!(result.metadata.error_step.is_none());

        // Success JSON carries no error_message key at all.
        let value = serde_json::to_value(&result).expect("serialize");
        assert!(value.get("error_message").is_none());
        let metadata_expected: BTreeSet<String> =
            ["timestamp", "total_files", "elapsed_seconds"]
                .into_iter()
                .map(str::to_string)
                .collect();
        assert_eq!(json_keys(&value["metadata"]), metadata_expected);
    }

    #[test]
    fn dataset_without_csv_files_is_still_ok() {
        let body = zip_fixture(&[("README.md", "no tables here")]);
        let base = serve_once("200 OK", body);

        let dir = tempfile::tempdir().expect("temp dir");
        let result = acquire(
            &test_client(base),
            "https://www.kaggle.com/datasets/user/name",
            dir.path(),
        );

        assert!(result.is_ok());
        assert!(result.csv_files.is_empty());
        assert!(result.schemas.is_empty());
        assert_eq!(result.metadata.total_files, Some(0));
    }

    #[test]
    fn unreadable_csv_discards_partial_schemas() {
        // "broken.csv" carries invalid UTF-8 and sorts after "AAPL.csv", so a
        // schema for AAPL has already been computed when the scan aborts.
        let body = {
            let mut cursor = std::io::Cursor::new(Vec::new());
            {
                use std::io::Write as _;
                let mut writer = zip::ZipWriter::new(&mut cursor);
                writer
                    .start_file("AAPL.csv", zip::write::SimpleFileOptions::default())
                    .expect("start");
                writer.write_all(b"a,b\n1,2\n").expect("write");
                writer
                    .start_file("broken.csv", zip::write::SimpleFileOptions::default())
                    .expect("start");
                writer.write_all(b"a,b\n\xff\xfe,1\n").expect("write");
                writer.finish().expect("finish");
            }
            cursor.into_inner()
        };

        let base = serve_once("200 OK", body);
        let dir = tempfile::tempdir().expect("temp dir");
        let result = acquire(
            &test_client(base),
            "https://www.kaggle.com/datasets/user/name",
            dir.path(),
        );

        assert_error_shape(&result, ErrorStep::Read);
        assert!(result
            .error_message
            .as_deref()
            .expect("message")
            .contains("broken.csv"));
        assert_eq!(result.dataset_slug.as_deref(), Some("user/name"));
    }

    #[test]
    fn existing_download_directory_is_reused() {
        let dir = tempfile::tempdir().expect("temp dir");
        let nested = dir.path().join("datasets");

        let first = prepare_download_dir(&nested).expect("first");
        let second = prepare_download_dir(&nested).expect("second");
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn relative_paths_are_resolved_against_cwd() {
        let resolved = prepare_download_dir(Path::new("./target/test-datasets"))
            .expect("resolve");
        assert!(resolved.is_absolute());
        assert!(!resolved.to_string_lossy().contains("/./"));
        let _ = fs::remove_dir_all(&resolved);
    }

    #[test]
    fn inventory_is_non_recursive_and_case_sensitive() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("b.csv"), "x\n1\n").expect("write");
        fs::write(dir.path().join("a.csv"), "x\n1\n").expect("write");
        fs::write(dir.path().join("upper.CSV"), "x\n1\n").expect("write");
        fs::write(dir.path().join("notes.txt"), "x").expect("write");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("nested").join("c.csv"), "x\n1\n").expect("write");

        let files = list_csv_files(dir.path()).expect("list");
        assert_eq!(files, vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn credential_failure_shape_matches_the_contract() {
        let result = AcquisitionResult::error(
            "Kaggle authentication failed: no credentials".to_string(),
            ErrorStep::Auth,
            None,
            Some(PathBuf::from("./datasets")),
        );
        assert_error_shape(&result, ErrorStep::Auth);
        assert_eq!(result.dataset_slug, None);
        assert_eq!(result.folder_path.as_deref(), Some(Path::new("./datasets")));
    }
}
