//! Kaggle API client: credential resolution and dataset download.
//!
//! Credentials are threaded in explicitly wherever possible; only
//! [`KaggleCredentials::from_env`] touches the ambient environment
//! (`KAGGLE_USERNAME`/`KAGGLE_KEY`, then `~/.kaggle/kaggle.json`), so tests
//! can inject fakes by constructing a client directly.

use std::env;
use std::fs;
use std::io;
use std::path::Path;

use base64::Engine as _;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Production API base. Overridable for tests via [`KaggleClient::with_api_base`].
pub const DEFAULT_API_BASE: &str = "https://www.kaggle.com/api/v1";

#[derive(Debug, Error)]
pub enum KaggleError {
    #[error(
        "no Kaggle credentials found: set KAGGLE_USERNAME and KAGGLE_KEY, \
         or create ~/.kaggle/kaggle.json"
    )]
    MissingCredentials,

    #[error("malformed credential file: {0}")]
    MalformedCredentialFile(#[from] serde_json::Error),

    #[error("dataset download request failed: {0}")]
    Request(#[from] Box<ureq::Error>),

    #[error("failed to unpack dataset archive: {0}")]
    Unpack(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A Kaggle username/key pair.
#[derive(Debug, Clone, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl KaggleCredentials {
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
        }
    }

    /// Resolve credentials from the ambient environment.
    ///
    /// `KAGGLE_USERNAME`/`KAGGLE_KEY` win; `~/.kaggle/kaggle.json` (the file
    /// the official CLI writes) is the fallback.
    pub fn from_env() -> Result<Self, KaggleError> {
        if let (Ok(username), Ok(key)) = (env::var("KAGGLE_USERNAME"), env::var("KAGGLE_KEY")) {
            if !username.is_empty() && !key.is_empty() {
                return Ok(Self { username, key });
            }
        }

        if let Some(path) = dirs::home_dir().map(|home| home.join(".kaggle").join("kaggle.json")) {
            if path.exists() {
                debug!(path = %path.display(), "reading Kaggle credential file");
                let content = fs::read_to_string(&path)?;
                return Ok(serde_json::from_str(&content)?);
            }
        }

        Err(KaggleError::MissingCredentials)
    }
}

/// Synchronous client for the Kaggle datasets API.
pub struct KaggleClient {
    credentials: KaggleCredentials,
    api_base: String,
    agent: ureq::Agent,
}

impl KaggleClient {
    pub fn new(credentials: KaggleCredentials) -> Self {
        Self::with_api_base(credentials, DEFAULT_API_BASE)
    }

    pub fn with_api_base(credentials: KaggleCredentials, api_base: impl Into<String>) -> Self {
        Self {
            credentials,
            api_base: api_base.into(),
            agent: ureq::agent(),
        }
    }

    /// Build a client from explicit credentials when available, falling back
    /// to the ambient environment.
    pub fn resolve(
        explicit: Option<KaggleCredentials>,
        api_base: Option<String>,
    ) -> Result<Self, KaggleError> {
        let credentials = match explicit {
            Some(credentials) => credentials,
            None => KaggleCredentials::from_env()?,
        };
        Ok(match api_base {
            Some(base) => Self::with_api_base(credentials, base),
            None => Self::new(credentials),
        })
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    fn auth_header(&self) -> String {
        let token = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            self.credentials.username, self.credentials.key
        ));
        format!("Basic {token}")
    }

    /// Download the archive for `owner/name` and unpack it into `dest`.
    ///
    /// The archive is spooled to an unnamed temporary file rather than held
    /// in memory; datasets can run to gigabytes.
    pub fn download_dataset(
        &self,
        slug: &super::slug::DatasetSlug,
        dest: &Path,
    ) -> Result<(), KaggleError> {
        let url = format!(
            "{}/datasets/download/{}/{}",
            self.api_base,
            slug.owner(),
            slug.name()
        );
        debug!(%url, "requesting dataset archive");

        let response = self
            .agent
            .get(&url)
            .set("Authorization", &self.auth_header())
            .call()
            .map_err(Box::new)?;

        let mut spool = tempfile::tempfile()?;
        io::copy(&mut response.into_reader(), &mut spool)?;

        let mut archive = zip::ZipArchive::new(spool)?;
        archive.extract(dest)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dataset::slug::extract_slug;
    use std::io::{Read as _, Write as _};
    use std::net::TcpListener;

    /// Serve exactly one HTTP response on a random local port, then exit.
    /// Returns the base URL to point a client at.
    pub(crate) fn serve_once(status_line: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base = format!("http://{}", listener.local_addr().expect("addr"));

        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                // Drain the request head before answering.
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);

                let head = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
            }
        });

        base
    }

    /// A zip archive holding the given (name, contents) entries.
    pub(crate) fn zip_fixture(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, contents) in entries {
                writer
                    .start_file(*name, zip::write::SimpleFileOptions::default())
                    .expect("start file");
                writer.write_all(contents.as_bytes()).expect("write entry");
            }
            writer.finish().expect("finish zip");
        }
        cursor.into_inner()
    }

    fn test_client(base: String) -> KaggleClient {
        KaggleClient::with_api_base(KaggleCredentials::new("tester", "secret"), base)
    }

    #[test]
    fn download_unpacks_archive_entries() {
        let body = zip_fixture(&[("prices.csv", "a,b\n1,2\n"), ("README.txt", "hello")]);
        let base = serve_once("200 OK", body);

        let dest = tempfile::tempdir().expect("temp dir");
        let slug = extract_slug("https://www.kaggle.com/datasets/user/name").expect("slug");
        test_client(base)
            .download_dataset(&slug, dest.path())
            .expect("download");

        assert!(dest.path().join("prices.csv").is_file());
        assert!(dest.path().join("README.txt").is_file());
    }

    #[test]
    fn http_error_status_is_a_request_error() {
        let base = serve_once("403 Forbidden", b"permission denied".to_vec());

        let dest = tempfile::tempdir().expect("temp dir");
        let slug = extract_slug("https://www.kaggle.com/datasets/user/name").expect("slug");
        let err = test_client(base)
            .download_dataset(&slug, dest.path())
            .expect_err("should fail");
        assert!(matches!(err, KaggleError::Request(_)));
    }

    #[test]
    fn unreachable_service_is_a_request_error() {
        // Port 9 (discard) is a safe never-listening target.
        let dest = tempfile::tempdir().expect("temp dir");
        let slug = extract_slug("https://www.kaggle.com/datasets/user/name").expect("slug");
        let err = test_client("http://127.0.0.1:9".to_string())
            .download_dataset(&slug, dest.path())
            .expect_err("should fail");
        assert!(matches!(err, KaggleError::Request(_)));
    }

    #[test]
    fn garbage_archive_is_an_unpack_error() {
        let base = serve_once("200 OK", b"this is not a zip file".to_vec());

        let dest = tempfile::tempdir().expect("temp dir");
        let slug = extract_slug("https://www.kaggle.com/datasets/user/name").expect("slug");
        let err = test_client(base)
            .download_dataset(&slug, dest.path())
            .expect_err("should fail");
        assert!(matches!(err, KaggleError::Unpack(_)));
    }
}
