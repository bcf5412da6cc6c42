//! HTTP client for the Nomad agent API

use super::{AgentSelf, ClusterApi};
use crate::error::{BridgeError, Result};
use crate::models::{Allocation, NodeResources};
use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Local agent address used when none is configured
pub const DEFAULT_NOMAD_ADDR: &str = "http://127.0.0.1:4646";

/// TLS material for talking to a TLS-enabled agent
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    /// CA certificate used to verify the agent
    pub ca_cert: Option<PathBuf>,
    /// Client certificate, only used together with `client_key`
    pub client_cert: Option<PathBuf>,
    /// Client private key, only used together with `client_cert`
    pub client_key: Option<PathBuf>,
    /// Skip verification of the agent certificate
    pub insecure: bool,
}

impl TlsSettings {
    /// Whether a client identity is configured
    pub fn has_identity(&self) -> bool {
        self.client_cert.is_some() && self.client_key.is_some()
    }

    /// CA or insecure options that take no effect without a client identity
    pub fn has_ignored_options(&self) -> bool {
        !self.has_identity() && (self.ca_cert.is_some() || self.insecure)
    }
}

/// Nomad API client
pub struct NomadClient {
    client: Client,
    base_url: Url,
}

impl NomadClient {
    /// Create a client without TLS customisation
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_tls(base_url, &TlsSettings::default())
    }

    /// Create a client, applying the TLS settings
    ///
    /// Requests carry no timeout; a hung agent hangs the run.
    pub fn with_tls(base_url: &str, tls: &TlsSettings) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            BridgeError::Configuration(format!("invalid Nomad address {}: {}", base_url, e))
        })?;

        let mut builder = Client::builder().use_rustls_tls();

        if let (Some(cert), Some(key)) = (&tls.client_cert, &tls.client_key) {
            let mut pem = read_pem(cert, "client certificate")?;
            pem.push(b'\n');
            pem.extend(read_pem(key, "client key")?);
            let identity = Identity::from_pem(&pem).map_err(|e| {
                BridgeError::Configuration(format!("invalid client certificate or key: {}", e))
            })?;
            builder = builder.identity(identity);

            if let Some(ca) = &tls.ca_cert {
                let ca_pem = read_pem(ca, "CA certificate")?;
                let ca = Certificate::from_pem(&ca_pem).map_err(|e| {
                    BridgeError::Configuration(format!("invalid CA certificate: {}", e))
                })?;
                builder = builder.add_root_certificate(ca);
            }

            if tls.insecure {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let client = builder
            .build()
            .map_err(|e| BridgeError::Configuration(format!("building HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET a path under the agent address and decode the JSON body
    async fn get<T: DeserializeOwned>(&self, what: &str, path: &str) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| BridgeError::query(what, e))?;

        debug!(url = %url, "Querying Nomad");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::query(what, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::query(
                what,
                format!("API error ({}): {}", status, body.trim()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| BridgeError::query(what, e))
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        BridgeError::Configuration(format!("reading {} from {:?}: {}", what, path, e))
    })
}

#[async_trait]
impl ClusterApi for NomadClient {
    async fn self_info(&self) -> Result<AgentSelf> {
        self.get("agent info", "/v1/agent/self").await
    }

    async fn node_info(&self, node_id: &str) -> Result<NodeResources> {
        self.get("node", &format!("/v1/node/{}", node_id)).await
    }

    async fn node_allocations(&self, node_id: &str) -> Result<Vec<Allocation>> {
        self.get("node allocations", &format!("/v1/node/{}/allocations", node_id))
            .await
    }
}
