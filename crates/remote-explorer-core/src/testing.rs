// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - In-memory remote used by unit tests

use crate::client::RemoteFileClient;
use crate::types::{
    Breadcrumb, ClientError, ClipboardOperation, DirectoryListing, FileEntry, FileInfo, ServerInfo,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub(crate) fn file(path: &str) -> FileEntry {
    FileEntry {
        name: path.rsplit('/').next().unwrap().to_string(),
        relative_path: path.to_string(),
        is_directory: false,
        size_display: "1 KB".to_string(),
        modified_display: "2024-01-01 00:00".to_string(),
        is_image: false,
        is_video: false,
    }
}

pub(crate) fn dir(path: &str) -> FileEntry {
    FileEntry {
        is_directory: true,
        size_display: "-".to_string(),
        ..file(path)
    }
}

fn server_error() -> ClientError {
    ClientError::HttpStatus {
        code: 500,
        message: Some("boom".to_string()),
    }
}

/// Scriptable stand-in for the HTTP client. Records every call it receives.
pub(crate) struct FakeRemote {
    base_url: Mutex<Option<Url>>,
    listings: Mutex<HashMap<String, Vec<FileEntry>>>,
    failing_paths: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    pub fail_marks: AtomicBool,
    pub fail_paste: AtomicBool,
    /// Status of `GET /`; `None` = unreachable
    pub liveness: Mutex<Option<u16>>,
    pub server_info: Mutex<Option<ServerInfo>>,
    pub payload: Mutex<Vec<u8>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            base_url: Mutex::new(None),
            listings: Mutex::new(HashMap::new()),
            failing_paths: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            fail_marks: AtomicBool::new(false),
            fail_paste: AtomicBool::new(false),
            liveness: Mutex::new(Some(200)),
            server_info: Mutex::new(None),
            payload: Mutex::new(b"hello".to_vec()),
        }
    }

    pub fn with_dir(self, path: &str, entries: Vec<FileEntry>) -> Self {
        self.listings.lock().unwrap().insert(path.to_string(), entries);
        self
    }

    /// Listing, download and info of `path` fail with a 500
    pub fn failing(self, path: &str) -> Self {
        self.failing_paths.lock().unwrap().insert(path.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, path: &str) -> Result<(), ClientError> {
        if self.failing_paths.lock().unwrap().contains(path) {
            Err(server_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteFileClient for FakeRemote {
    fn set_base_url(&self, url: Option<Url>) {
        *self.base_url.lock().unwrap() = url;
    }

    fn base_url(&self) -> Option<Url> {
        self.base_url.lock().unwrap().clone()
    }

    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ClientError> {
        self.record(format!("list:{}", path));
        self.check(path)?;

        let items = self
            .listings
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or(ClientError::HttpStatus {
                code: 404,
                message: Some("Directory not found".to_string()),
            })?;

        let mut breadcrumbs = vec![Breadcrumb::new("Home", "")];
        let mut acc = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !acc.is_empty() {
                acc.push('/');
            }
            acc.push_str(segment);
            breadcrumbs.push(Breadcrumb::new(segment.to_uppercase(), acc.clone()));
        }

        Ok(DirectoryListing {
            items,
            current_path: path.to_string(),
            breadcrumbs,
        })
    }

    async fn fetch_info(&self, path: &str) -> Result<FileInfo, ClientError> {
        self.record(format!("info:{}", path));
        self.check(path)?;
        Ok(FileInfo {
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            full_path: format!("/srv/{}", path),
            relative_path: path.to_string(),
            is_directory: false,
            is_file: true,
            size_formatted: Some("5 B".to_string()),
            size_bytes: Some(5),
            modified: "2024-01-01 00:00".to_string(),
            created: None,
            accessed: None,
            mime_type: Some("text/plain".to_string()),
            extension: Some("txt".to_string()),
            is_readable: Some(true),
            is_writable: Some(true),
            is_executable: Some(false),
        })
    }

    async fn download(
        &self,
        path: &str,
        on_progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<Bytes, ClientError> {
        self.record(format!("download:{}", path));
        on_progress(0.0);
        self.check(path)?;
        on_progress(0.5);
        on_progress(1.0);
        Ok(Bytes::from(self.payload.lock().unwrap().clone()))
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        target_dir: &str,
    ) -> Result<(), ClientError> {
        self.record(format!("upload:{}:{}:{}", file_name, target_dir, bytes.len()));
        self.check(target_dir)
    }

    async fn create_file(
        &self,
        name: &str,
        _content: &str,
        target_dir: &str,
    ) -> Result<(), ClientError> {
        self.record(format!("create_file:{}:{}", name, target_dir));
        self.check(target_dir)
    }

    async fn create_folder(&self, name: &str, target_dir: &str) -> Result<(), ClientError> {
        self.record(format!("create_folder:{}:{}", name, target_dir));
        self.check(target_dir)
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<(), ClientError> {
        self.record(format!("rename:{}:{}", path, new_name));
        self.check(path)
    }

    async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.record(format!("delete:{}", path));
        self.check(path)
    }

    async fn mark_copy(&self, path: &str) -> Result<(), ClientError> {
        self.record(format!("mark_copy:{}", path));
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(())
    }

    async fn mark_cut(&self, path: &str) -> Result<(), ClientError> {
        self.record(format!("mark_cut:{}", path));
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(())
    }

    async fn paste(
        &self,
        source_path: &str,
        target_dir: &str,
        operation: ClipboardOperation,
    ) -> Result<(), ClientError> {
        self.record(format!(
            "paste:{}:{}:{}",
            source_path,
            target_dir,
            operation.as_str()
        ));
        if self.fail_paste.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(())
    }

    async fn move_entry(&self, path: &str, target_dir: &str) -> Result<(), ClientError> {
        self.record(format!("move:{}:{}", path, target_dir));
        self.check(path)
    }

    async fn test_connection(&self, candidate: &str) -> Result<bool, ClientError> {
        self.record(format!("test_connection:{}", candidate));
        match *self.liveness.lock().unwrap() {
            Some(code) => Ok(code == 200 || code == 404),
            None => Err(ClientError::Unreachable("connection refused".to_string())),
        }
    }

    async fn fetch_server_info(&self, candidate: &str) -> Result<Option<ServerInfo>, ClientError> {
        self.record(format!("server_info:{}", candidate));
        Ok(self.server_info.lock().unwrap().clone())
    }

    async fn check_connection(&self) -> Result<bool, ClientError> {
        self.record("check_connection".to_string());
        Ok(*self.liveness.lock().unwrap() == Some(200))
    }
}
