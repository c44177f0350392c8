// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - HTTP client for the remote file API
//
// One method per remote capability. Every call checks the response status
// against an explicit allow-list; anything else becomes `HttpStatus`.

use crate::navigator::normalize_path;
use crate::types::{
    AppError, ClientError, ClientSettings, ClipboardOperation, DirectoryListing, FileInfo,
    FileInfoEnvelope, ServerInfo,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::{
    multipart::{Form, Part},
    Client, Response, Url,
};
use serde::de::DeserializeOwned;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Status codes accepted as success, per call
const OK: &[u16] = &[200];
const OK_OR_NO_CONTENT: &[u16] = &[200, 204];
/// A 404 on `/` still proves an HTTP server is answering
const ALIVE: &[u16] = &[200, 404];

/// The remote file-management API as seen by the rest of the core.
#[async_trait]
pub trait RemoteFileClient: Send + Sync {
    /// Point subsequent calls at `url`, or detach with `None`
    fn set_base_url(&self, url: Option<Url>);

    fn base_url(&self) -> Option<Url>;

    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ClientError>;

    async fn fetch_info(&self, path: &str) -> Result<FileInfo, ClientError>;

    /// Emits 0 before the request and exactly 1 once every byte has arrived.
    async fn download(
        &self,
        path: &str,
        on_progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<Bytes, ClientError>;

    async fn upload(&self, bytes: Vec<u8>, file_name: &str, target_dir: &str)
        -> Result<(), ClientError>;

    async fn create_file(&self, name: &str, content: &str, target_dir: &str)
        -> Result<(), ClientError>;

    async fn create_folder(&self, name: &str, target_dir: &str) -> Result<(), ClientError>;

    async fn rename(&self, path: &str, new_name: &str) -> Result<(), ClientError>;

    async fn delete(&self, path: &str) -> Result<(), ClientError>;

    /// Stage `path` for a later copy. Nothing moves yet.
    async fn mark_copy(&self, path: &str) -> Result<(), ClientError>;

    /// Stage `path` for a later move. Nothing moves yet.
    async fn mark_cut(&self, path: &str) -> Result<(), ClientError>;

    async fn paste(
        &self,
        source_path: &str,
        target_dir: &str,
        operation: ClipboardOperation,
    ) -> Result<(), ClientError>;

    /// Direct move without staging
    async fn move_entry(&self, path: &str, target_dir: &str) -> Result<(), ClientError>;

    /// Liveness check of a server that is not configured yet
    async fn test_connection(&self, candidate: &str) -> Result<bool, ClientError>;

    /// `Ok(None)` when the server has no info endpoint
    async fn fetch_server_info(&self, candidate: &str) -> Result<Option<ServerInfo>, ClientError>;

    /// Check the configured server again
    async fn check_connection(&self) -> Result<bool, ClientError>;
}

/// Parse an already-normalized server address
pub fn parse_server_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidAddress(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ClientError::InvalidAddress(raw.to_string()));
    }

    Ok(url)
}

/// Pull the message out of a `{"error": ...}` body
pub fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        serde_json::Value::String(message) if !message.is_empty() => Some(message.clone()),
        serde_json::Value::String(_) | serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    if err.is_builder() {
        ClientError::InvalidAddress(err.to_string())
    } else if err.is_timeout() {
        ClientError::Unreachable(format!("Request timed out: {}", err))
    } else {
        ClientError::Unreachable(err.to_string())
    }
}

async fn expect_status(response: Response, allowed: &[u16]) -> Result<Response, ClientError> {
    let code = response.status().as_u16();
    if allowed.contains(&code) {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::HttpStatus {
        code,
        message: error_message(&body),
    })
}

fn decode_str<T: DeserializeOwned>(raw: String) -> Result<T, ClientError> {
    serde_json::from_str(&raw).map_err(|e| ClientError::DecodeFailure {
        reason: e.to_string(),
        raw,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let raw = response.text().await.map_err(transport_error)?;
    decode_str(raw)
}

/// Append route and path segments to `base`, percent-encoding each segment.
fn join_segments(mut url: Url, route: &[&str], path: &str) -> Result<Url, ClientError> {
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ClientError::InvalidAddress("Address cannot carry a path".to_string()))?;
        segments.pop_if_empty();
        segments.extend(route);
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

/// Client for a remote file-management server over HTTP
pub struct HttpFileClient {
    /// Metadata calls, bounded by the request timeout
    http_client: Client,
    /// Transfers: no overall timeout, stalls are caught by the read timeout
    transfer_client: Client,
    base_url: RwLock<Option<Url>>,
    progress_step_bytes: u64,
}

impl HttpFileClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

        let transfer_client = Client::builder()
            .read_timeout(Duration::from_secs(settings.read_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            transfer_client,
            base_url: RwLock::new(None),
            progress_step_bytes: settings.progress_step_bytes.max(1),
        })
    }

    fn base(&self) -> Result<Url, ClientError> {
        self.base_url()
            .ok_or_else(|| ClientError::InvalidAddress("No server configured".to_string()))
    }

    fn endpoint(&self, route: &[&str], path: &str) -> Result<Url, ClientError> {
        join_segments(self.base()?, route, path)
    }

    async fn get(&self, url: Url) -> Result<Response, ClientError> {
        tracing::debug!("GET {}", url);
        self.http_client
            .get(url)
            .send()
            .await
            .map_err(transport_error)
    }

    async fn post_form(
        &self,
        route: &str,
        form: &[(&str, &str)],
        allowed: &[u16],
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&[route], "")?;
        tracing::debug!("POST {}", url);

        let response = self
            .http_client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(transport_error)?;

        expect_status(response, allowed).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteFileClient for HttpFileClient {
    fn set_base_url(&self, url: Option<Url>) {
        *self.base_url.write().unwrap_or_else(PoisonError::into_inner) = url;
    }

    fn base_url(&self) -> Option<Url> {
        self.base_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ClientError> {
        let mut url = self.endpoint(&["explorer"], path)?;
        url.query_pairs_mut().append_pair("json", "true");

        let response = expect_status(self.get(url).await?, OK).await?;
        let mut listing: DirectoryListing = decode(response).await?;

        for entry in &mut listing.items {
            entry.relative_path = normalize_path(&entry.relative_path);
        }
        listing.current_path = normalize_path(&listing.current_path);

        Ok(listing)
    }

    async fn fetch_info(&self, path: &str) -> Result<FileInfo, ClientError> {
        let url = self.endpoint(&["file_info"], path)?;
        let response = expect_status(self.get(url).await?, OK).await?;

        let raw = response.text().await.map_err(transport_error)?;
        let envelope: FileInfoEnvelope = decode_str(raw.clone())?;
        if !envelope.success {
            return Err(ClientError::DecodeFailure {
                reason: "Server reported success=false".to_string(),
                raw,
            });
        }

        Ok(envelope.info)
    }

    async fn download(
        &self,
        path: &str,
        on_progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<Bytes, ClientError> {
        let url = self.endpoint(&["download"], path)?;
        on_progress(0.0);

        tracing::debug!("GET {}", url);
        let response = self
            .transfer_client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        let response = expect_status(response, OK).await?;

        let total = response.content_length().filter(|len| *len > 0);
        let mut buffer = BytesMut::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        let mut last_reported = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport_error)?;
            buffer.extend_from_slice(&chunk);

            // Intermediate values stay strictly below 1; the final 1 is sent once the body ends.
            if let Some(total) = total {
                let received = buffer.len() as u64;
                if received < total && received - last_reported >= self.progress_step_bytes {
                    last_reported = received;
                    on_progress(received as f64 / total as f64);
                }
            }
        }

        on_progress(1.0);
        Ok(buffer.freeze())
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        target_dir: &str,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["upload"], "")?;
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.essence_str())
            .map_err(|e| ClientError::InvalidAddress(format!("Invalid upload part: {}", e)))?;

        let mut form = Form::new().part("file", part);
        if !target_dir.is_empty() {
            form = form.text("directory", target_dir.to_string());
        }

        tracing::debug!("POST {} ({})", url, file_name);
        let response = self
            .transfer_client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        expect_status(response, OK).await?;
        Ok(())
    }

    async fn create_file(
        &self,
        name: &str,
        content: &str,
        target_dir: &str,
    ) -> Result<(), ClientError> {
        let mut form = vec![("filename", name), ("content", content)];
        if !target_dir.is_empty() {
            form.push(("directory", target_dir));
        }
        self.post_form("create_file", &form, OK).await
    }

    async fn create_folder(&self, name: &str, target_dir: &str) -> Result<(), ClientError> {
        let mut form = vec![("foldername", name)];
        if !target_dir.is_empty() {
            form.push(("directory", target_dir));
        }
        self.post_form("create_folder", &form, OK).await
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<(), ClientError> {
        self.post_form("rename", &[("filepath", path), ("new_name", new_name)], OK)
            .await
    }

    async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.post_form("delete", &[("filepath", path)], OK_OR_NO_CONTENT)
            .await
    }

    async fn mark_copy(&self, path: &str) -> Result<(), ClientError> {
        self.post_form("copy", &[("filepath", path)], OK).await
    }

    async fn mark_cut(&self, path: &str) -> Result<(), ClientError> {
        self.post_form("cut", &[("filepath", path)], OK).await
    }

    async fn paste(
        &self,
        source_path: &str,
        target_dir: &str,
        operation: ClipboardOperation,
    ) -> Result<(), ClientError> {
        self.post_form(
            "paste",
            &[
                ("source_path", source_path),
                ("target_dir", target_dir),
                ("operation", operation.as_str()),
            ],
            OK,
        )
        .await
    }

    async fn move_entry(&self, path: &str, target_dir: &str) -> Result<(), ClientError> {
        self.post_form("move", &[("filepath", path), ("target_dir", target_dir)], OK)
            .await
    }

    async fn test_connection(&self, candidate: &str) -> Result<bool, ClientError> {
        let url = join_segments(parse_server_url(candidate)?, &[""], "")?;
        let response = self.get(url).await?;
        let code = response.status().as_u16();
        tracing::debug!("Liveness check of {} returned {}", candidate, code);
        Ok(ALIVE.contains(&code))
    }

    async fn fetch_server_info(&self, candidate: &str) -> Result<Option<ServerInfo>, ClientError> {
        let url = join_segments(parse_server_url(candidate)?, &["api", "info"], "")?;
        let response = self.get(url).await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        let response = expect_status(response, OK).await?;
        decode(response).await.map(Some)
    }

    async fn check_connection(&self) -> Result<bool, ClientError> {
        let url = self.endpoint(&[""], "")?;
        let response = self.get(url).await?;
        Ok(response.status().as_u16() == 200)
    }
}
