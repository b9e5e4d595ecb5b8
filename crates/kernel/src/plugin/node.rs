//! Access to a running node's plugin state.
//!
//! A node exposes a small JSON admin API:
//!
//! | Method | Path                     | Body / response            |
//! |--------|--------------------------|----------------------------|
//! | GET    | `/health`                | any 2xx means alive        |
//! | GET    | `/admin/plugins/active`  | `{"plugins": [..]}`        |
//! | POST   | `/admin/plugins/enable`  | `{"plugins": [..]}`        |
//! | POST   | `/admin/plugins/disable` | `{"plugins": [..]}`        |
//!
//! Transport failures are always reported as [`NodeError::Down`], never as an
//! application error, so callers can tell "node gone" from "node said no".

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::error::PluginError;
use super::set::PluginSet;

/// Failure of a call to a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The node could not be reached, or went away mid-call.
    #[error("node is down")]
    Down,

    /// The node answered with an error.
    #[error("node returned an error: {payload}")]
    Remote { payload: String },
}

/// Request and response body for the plugin endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginList {
    pub plugins: PluginSet,
}

/// Remote plugin control for a single node.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Display name of the node, used in messages.
    fn name(&self) -> &str;

    /// Cheap reachability check, separate from the plugin calls.
    async fn is_alive(&self) -> bool;

    /// Plugins currently running on the node.
    async fn active_plugins(&self) -> Result<PluginSet, NodeError>;

    /// Start the given plugins on the node.
    async fn enable(&self, plugins: &PluginSet) -> Result<(), NodeError>;

    /// Stop the given plugins on the node.
    async fn disable(&self, plugins: &PluginSet) -> Result<(), NodeError>;
}

/// What a node reported when asked for its active plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveState {
    Reachable(PluginSet),
    Unreachable { node: String },
}

impl ActiveState {
    /// Query the node, mapping node loss to [`ActiveState::Unreachable`].
    ///
    /// An application error from the node is not a reachability answer and is
    /// returned as [`PluginError::Node`].
    pub async fn probe<N: NodeClient + ?Sized>(node: &N) -> Result<Self, PluginError> {
        match node.active_plugins().await {
            Ok(active) => {
                debug!(node = %node.name(), count = active.len(), "node reported active plugins");
                Ok(Self::Reachable(active))
            }
            Err(NodeError::Down) => {
                debug!(node = %node.name(), "node unreachable");
                Ok(Self::Unreachable {
                    node: node.name().to_string(),
                })
            }
            Err(NodeError::Remote { payload }) => Err(PluginError::Node {
                node: node.name().to_string(),
                payload,
            }),
        }
    }

    /// The reported set, if the node was reachable.
    pub fn plugins(&self) -> Option<&PluginSet> {
        match self {
            Self::Reachable(set) => Some(set),
            Self::Unreachable { .. } => None,
        }
    }
}

/// [`NodeClient`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpNodeClient {
    name: String,
    base: Url,
    http: reqwest::Client,
    probe_timeout: Duration,
}

impl HttpNodeClient {
    /// Create a client for `node`, given as `host:port` or a full URL.
    pub fn new(node: &str, probe_timeout: Duration) -> anyhow::Result<Self> {
        let base = parse_node_url(node)?;
        Ok(Self {
            name: node.to_string(),
            base,
            http: reqwest::Client::new(),
            probe_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, NodeError> {
        self.base.join(path).map_err(|e| NodeError::Remote {
            payload: format!("invalid endpoint {path}: {e}"),
        })
    }

    async fn post_plugins(&self, path: &str, plugins: &PluginSet) -> Result<(), NodeError> {
        let body = PluginList {
            plugins: plugins.clone(),
        };
        let response = self
            .http
            .post(self.endpoint(path)?)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response).await.map(|_| ())
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_alive(&self) -> bool {
        let Ok(url) = self.endpoint("health") else {
            return false;
        };
        match self.http.get(url).timeout(self.probe_timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(node = %self.name, error = %e, "liveness probe failed");
                false
            }
        }
    }

    async fn active_plugins(&self) -> Result<PluginSet, NodeError> {
        let response = self
            .http
            .get(self.endpoint("admin/plugins/active")?)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let list: PluginList = response.json().await.map_err(|e| {
            if e.is_decode() {
                NodeError::Remote {
                    payload: format!("malformed plugin list: {e}"),
                }
            } else {
                transport_error(e)
            }
        })?;
        Ok(list.plugins)
    }

    async fn enable(&self, plugins: &PluginSet) -> Result<(), NodeError> {
        self.post_plugins("admin/plugins/enable", plugins).await
    }

    async fn disable(&self, plugins: &PluginSet) -> Result<(), NodeError> {
        self.post_plugins("admin/plugins/disable", plugins).await
    }
}

/// Accept `host:port`, `host` or a full `http(s)://` URL.
fn parse_node_url(node: &str) -> anyhow::Result<Url> {
    let node = node.trim();
    if node.is_empty() {
        anyhow::bail!("node address is empty");
    }

    let raw = if node.contains("://") {
        node.to_string()
    } else {
        format!("http://{node}")
    };

    let mut url = Url::parse(&raw).with_context(|| format!("invalid node address '{node}'"))?;
    if url.host_str().is_none() {
        anyhow::bail!("invalid node address '{node}': missing host");
    }
    // Endpoints are joined relative to the base, so it must end in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn transport_error(e: reqwest::Error) -> NodeError {
    debug!(error = %e, "node transport error");
    NodeError::Down
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, NodeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.map_err(transport_error)?;
    let payload = if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    };
    Err(NodeError::Remote { payload })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_port() {
        let url = parse_node_url("node-1:3000").unwrap();
        assert_eq!(url.as_str(), "http://node-1:3000/");
    }

    #[test]
    fn parses_full_url_with_prefix() {
        let url = parse_node_url("https://ops.example.com/node-a").unwrap();
        assert_eq!(url.as_str(), "https://ops.example.com/node-a/");
        assert_eq!(
            url.join("admin/plugins/active").unwrap().as_str(),
            "https://ops.example.com/node-a/admin/plugins/active"
        );
    }

    #[test]
    fn rejects_empty_node() {
        assert!(parse_node_url("  ").is_err());
    }

    #[test]
    fn plugin_list_wire_format() {
        let list = PluginList {
            plugins: ["b", "a"].into_iter().collect(),
        };
        assert_eq!(
            serde_json::to_string(&list).unwrap(),
            r#"{"plugins":["a","b"]}"#
        );
    }
}
