//! Kubernetes deployer
//!
//! Runs each unit as a bare pod in one namespace, talking to the API server's
//! REST endpoints directly. Create and delete check current state first and
//! treat "already exists" / "not found" answers as success.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Certificate, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use shared::{process_debug, ProcessId};

use crate::error::{SyncerError, SyncerResult};
use crate::traits::Deployer;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Connection and pod template settings
#[derive(Debug, Clone)]
pub struct KubernetesConfig {
    /// API server base URL, e.g. `https://10.96.0.1:443`
    pub api_url: String,
    pub token: Option<String>,
    /// PEM bundle trusted in addition to the system roots
    pub ca_cert_pem: Option<Vec<u8>>,
    pub namespace: String,
    pub container_name: String,
    pub image: String,
    /// Value of the `app.kubernetes.io/managed-by` label put on created pods
    pub manager: String,
    pub request_timeout: Duration,
}

impl KubernetesConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: None,
            ca_cert_pem: None,
            namespace: "default".to_string(),
            container_name: "algorithm-container".to_string(),
            image: "algorithm-image".to_string(),
            manager: "algo-syncer".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Settings for a syncer running inside the cluster under a service account
    pub fn from_in_cluster() -> SyncerResult<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| SyncerError::config("KUBERNETES_SERVICE_HOST is not set"))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = std::fs::read_to_string(dir.join("token"))?;
        let ca_cert_pem = std::fs::read(dir.join("ca.crt"))?;

        let mut config = Self::new(format!("https://{host}:{port}"));
        config.token = Some(token.trim().to_string());
        config.ca_cert_pem = Some(ca_cert_pem);
        if let Ok(namespace) = std::fs::read_to_string(dir.join("namespace")) {
            config.namespace = namespace.trim().to_string();
        }
        Ok(config)
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Deserialize)]
struct Pod {
    metadata: PodMetadata,
}

#[derive(Deserialize)]
struct PodMetadata {
    name: String,
}

/// Statuses meaning the orchestrator itself could not serve us, rather than refusing this request
fn is_unavailable_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn transport_error(err: reqwest::Error) -> SyncerError {
    SyncerError::orchestrator_unavailable(format!("kubernetes API request failed: {err}"))
}

/// Status plus the API server's `message` field when the body is a Status object
async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    if message.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {message}")
    }
}

pub struct KubernetesDeployer {
    client: Client,
    config: KubernetesConfig,
}

impl KubernetesDeployer {
    pub fn new(config: KubernetesConfig) -> SyncerResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| SyncerError::config("kubernetes token contains invalid characters"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout);
        if let Some(pem) = &config.ca_cert_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| SyncerError::config(format!("invalid kubernetes CA bundle: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| SyncerError::config(format!("failed to build kubernetes client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &KubernetesConfig {
        &self.config
    }

    fn pods_url(&self) -> String {
        format!(
            "{}/api/v1/namespaces/{}/pods",
            self.config.api_url.trim_end_matches('/'),
            self.config.namespace
        )
    }

    fn pod_url(&self, name: &str) -> String {
        format!("{}/{}", self.pods_url(), name)
    }

    fn pod_manifest(&self, name: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": name,
                "labels": { MANAGED_BY_LABEL: self.config.manager },
            },
            "spec": {
                "containers": [{
                    "name": self.config.container_name,
                    "image": self.config.image,
                }],
            },
        })
    }

    async fn pod_exists(&self, name: &str) -> SyncerResult<bool> {
        let response = self
            .client
            .get(self.pod_url(name))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(SyncerError::orchestrator_unavailable(format!(
                "failed to read pod {name}: {}",
                describe_failure(response).await
            ))),
        }
    }
}

#[async_trait]
impl Deployer for KubernetesDeployer {
    async fn create_unit(&self, name: &str) -> SyncerResult<()> {
        if self.pod_exists(name).await? {
            return Ok(());
        }

        let response = self
            .client
            .post(self.pods_url())
            .json(&self.pod_manifest(name))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                process_debug!(ProcessId::current(), "🚀 Created pod {} in {}", name, self.config.namespace);
                Ok(())
            }
            // Created concurrently between our read and write
            StatusCode::CONFLICT => Ok(()),
            status if is_unavailable_status(status) => Err(SyncerError::orchestrator_unavailable(
                describe_failure(response).await,
            )),
            _ => Err(SyncerError::CreateFailed {
                unit: name.to_string(),
                reason: describe_failure(response).await,
            }),
        }
    }

    async fn delete_unit(&self, name: &str) -> SyncerResult<()> {
        let response = self
            .client
            .delete(self.pod_url(name))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                process_debug!(ProcessId::current(), "🗑️ Deleted pod {} in {}", name, self.config.namespace);
                Ok(())
            }
            StatusCode::NOT_FOUND => Ok(()),
            status if is_unavailable_status(status) => Err(SyncerError::orchestrator_unavailable(
                describe_failure(response).await,
            )),
            _ => Err(SyncerError::DeleteFailed {
                unit: name.to_string(),
                reason: describe_failure(response).await,
            }),
        }
    }

    async fn list_units(&self) -> SyncerResult<Vec<String>> {
        let response = self
            .client
            .get(self.pods_url())
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(SyncerError::orchestrator_unavailable(format!(
                "failed to list pods: {}",
                describe_failure(response).await
            )));
        }

        let pods: PodList = response
            .json()
            .await
            .map_err(|e| SyncerError::orchestrator_unavailable(format!("malformed pod list: {e}")))?;
        Ok(pods.items.into_iter().map(|pod| pod.metadata.name).collect())
    }
}
