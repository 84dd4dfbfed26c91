//! Background download of remotely stored citation files.
//!
//! Source nodes that point at a remote pipeline are served from a local path
//! (`output/<remote-store>/<pipelineId>$<fileName>`). The first time such a
//! node shows up, [`FileHydrator::schedule`] spawns a download to that path.
//! The stream never waits for it.

use crate::config::FileConfig;
use crate::error::{ChatFrontError, Result};
use crate::types::source::{
    resolve_under, validate_path_component, SourceNode, SourceNodeFactory,
};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;

/// Source of remote file bytes.
#[async_trait]
pub trait RemoteFileFetcher: Send + Sync + 'static {
    async fn fetch(&self, pipeline_id: &str, file_name: &str) -> anyhow::Result<Bytes>;
}

/// Fetches `<base>/<pipelineId>/<fileName>` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFileFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFileFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ChatFrontError::Configuration(format!("invalid remote file base URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ChatFrontError::Configuration(format!(
                "remote file base URL '{}' cannot be a base",
                base_url
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    fn file_url(&self, pipeline_id: &str, file_name: &str) -> anyhow::Result<Url> {
        // `push("..")` would pop a segment of the base path
        validate_path_component(pipeline_id)?;
        validate_path_component(file_name)?;
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .push(pipeline_id)
            .push(file_name);
        Ok(url)
    }
}

#[async_trait]
impl RemoteFileFetcher for HttpFileFetcher {
    async fn fetch(&self, pipeline_id: &str, file_name: &str) -> anyhow::Result<Bytes> {
        let url = self.file_url(pipeline_id, file_name)?;
        tracing::debug!(url = %url, "Fetching remote file");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    }
}

struct Inner {
    fetcher: Arc<dyn RemoteFileFetcher>,
    file_root: PathBuf,
    /// Local paths claimed by this process (downloaded or in flight)
    claimed: DashSet<String>,
}

/// Deduplicating, fire-and-forget downloader for remote source files.
#[derive(Clone)]
pub struct FileHydrator {
    inner: Arc<Inner>,
    source_factory: SourceNodeFactory,
}

impl std::fmt::Debug for FileHydrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHydrator")
            .field("file_root", &self.inner.file_root)
            .field("claimed", &self.inner.claimed.len())
            .finish()
    }
}

impl FileHydrator {
    pub fn new(fetcher: Arc<dyn RemoteFileFetcher>, file_root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                file_root: file_root.into(),
                claimed: DashSet::new(),
            }),
            source_factory: SourceNodeFactory::default(),
        }
    }

    /// Factory used to re-derive the local path of each scheduled node
    pub fn with_source_factory(mut self, source_factory: SourceNodeFactory) -> Self {
        self.source_factory = source_factory;
        self
    }

    /// HTTP-backed hydrator, or `None` when no remote base URL is configured
    pub fn from_config(config: &FileConfig) -> Result<Option<Self>> {
        match &config.remote_base_url {
            Some(base_url) => {
                let fetcher = HttpFileFetcher::new(base_url)?;
                Ok(Some(
                    Self::new(Arc::new(fetcher), config.file_root.clone())
                        .with_source_factory(SourceNodeFactory::from_config(config)),
                ))
            }
            None => Ok(None),
        }
    }

    /// Spawn one download per remote node whose local path is not yet claimed.
    ///
    /// Nodes resolving to the same path trigger at most one download. A node
    /// whose identifiers are unsafe, or whose `filePath` differs from the path
    /// derived from them, is skipped.
    /// The returned handles may be dropped; downloads keep running.
    pub fn schedule(&self, nodes: &[SourceNode]) -> Vec<JoinHandle<()>> {
        nodes
            .iter()
            .filter_map(|node| {
                let pipeline_id = node.pipeline_id()?.to_string();
                let file_name = node.file_name.clone()?;
                let file_path = self
                    .checked_file_path(&pipeline_id, &file_name, node.file_path.as_deref()?)
                    .inspect_err(|e| {
                        tracing::warn!(node_id = %node.id, error = %e, "Refusing to hydrate source node")
                    })
                    .ok()?;
                if !self.inner.claimed.insert(file_path.clone()) {
                    tracing::debug!(file_path = %file_path, "Download already claimed");
                    return None;
                }
                tracing::debug!(file_path = %file_path, pipeline_id = %pipeline_id, "Scheduling file download");
                let hydrator = self.clone();
                Some(tokio::spawn(async move {
                    hydrator.hydrate(&pipeline_id, &file_name, &file_path).await
                }))
            })
            .collect()
    }

    fn checked_file_path(
        &self,
        pipeline_id: &str,
        file_name: &str,
        file_path: &str,
    ) -> Result<String> {
        let derived = self
            .source_factory
            .derive_file_path(Some(pipeline_id), file_name)?;
        if derived != file_path {
            return Err(ChatFrontError::PathRejected(format!(
                "'{}' does not match derived path '{}'",
                file_path, derived
            )));
        }
        Ok(derived)
    }

    async fn hydrate(&self, pipeline_id: &str, file_name: &str, file_path: &str) {
        match self.download(pipeline_id, file_name, file_path).await {
            Ok(Some(size)) => {
                tracing::info!(file_path = %file_path, size, "Downloaded remote file")
            }
            Ok(None) => tracing::debug!(file_path = %file_path, "File already present"),
            Err(e) => {
                tracing::warn!(file_path = %file_path, error = %e, "Failed to download remote file");
                // let a later turn retry
                self.inner.claimed.remove(file_path);
            }
        }
    }

    async fn download(
        &self,
        pipeline_id: &str,
        file_name: &str,
        file_path: &str,
    ) -> anyhow::Result<Option<usize>> {
        let target = resolve_under(&self.inner.file_root, file_path)?;
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Ok(None);
        }
        let bytes = self.inner.fetcher.fetch(pipeline_id, file_name).await?;
        write_atomically(&target, &bytes).await?;
        Ok(Some(bytes.len()))
    }

    /// Whether `file_path` has been claimed for download in this process
    pub fn is_claimed(&self, file_path: &str) -> bool {
        self.inner.claimed.contains(file_path)
    }
}

async fn write_atomically(target: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut partial = target.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);
    tokio::fs::write(&partial, bytes).await?;
    tokio::fs::rename(&partial, target).await?;
    Ok(())
}
