//! Media load probes
//!
//! A probe answers one question for a source: has it finished loading? It
//! carries no payload. Probes run as fire-and-forget tasks; the component that
//! started one decides on completion whether the answer is still relevant.

use crate::{
    types::{MediaSource, SourceLocation},
    Error, Result,
};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

/// Asynchronous load-completion check keyed by source
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Resolve once `source` has fully loaded; an error means it never will
    async fn probe(&self, source: &MediaSource) -> Result<()>;
}

/// Probe that fetches remote media over HTTP and reads local files
///
/// A source counts as loaded once its full body has been received. There are
/// no retries: a failed fetch is reported once.
pub struct DefaultProbe {
    client: Client,
}

impl DefaultProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaProbe for DefaultProbe {
    #[instrument(skip_all, fields(source = %source))]
    async fn probe(&self, source: &MediaSource) -> Result<()> {
        match source.location()? {
            SourceLocation::Remote(url) => {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(Error::ProbeStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                let body = response.bytes().await?;
                debug!(bytes = body.len(), "Remote media loaded");
            }
            SourceLocation::Local(path) => {
                let metadata = tokio::fs::metadata(&path).await?;
                if !metadata.is_file() {
                    return Err(Error::probe(source.as_str(), "not a regular file"));
                }
                let body = tokio::fs::read(&path).await?;
                debug!(bytes = body.len(), "Local media loaded");
            }
        }
        Ok(())
    }
}

/// Scripted outcome for one source in a [`SimulatedProbe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeScript {
    /// Report completion after the delay
    LoadAfter(Duration),
    /// Report failure after the delay
    FailAfter(Duration),
    /// Never resolve
    Never,
}

/// Probe with scripted latencies, for demos and tests on virtual time
#[derive(Debug)]
pub struct SimulatedProbe {
    fallback: ProbeScript,
    scripts: HashMap<MediaSource, ProbeScript>,
    started: AtomicUsize,
}

impl SimulatedProbe {
    /// Every source loads after `latency` unless scripted otherwise
    pub fn new(latency: Duration) -> Self {
        Self {
            fallback: ProbeScript::LoadAfter(latency),
            scripts: HashMap::new(),
            started: AtomicUsize::new(0),
        }
    }

    pub fn script(mut self, source: impl Into<MediaSource>, script: ProbeScript) -> Self {
        self.scripts.insert(source.into(), script);
        self
    }

    /// Number of probes started so far
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProbe for SimulatedProbe {
    async fn probe(&self, source: &MediaSource) -> Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.get(source).copied().unwrap_or(self.fallback);
        match script {
            ProbeScript::LoadAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            ProbeScript::FailAfter(delay) => {
                tokio::time::sleep(delay).await;
                Err(Error::probe(source.as_str(), "simulated failure"))
            }
            ProbeScript::Never => std::future::pending().await,
        }
    }
}
