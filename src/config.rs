//! Client configuration
//!
//! Connection settings for the API server. The binary fills these from CLI
//! flags and environment variables.

use crate::error::{Error, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How to reach and authenticate to the API server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Kubeconfig file; in-cluster or default discovery when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Override of the API server URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,

    /// Client certificate file for TLS authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,

    /// Client private key file matching `cert_file`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    /// PEM bundle of certificate authorities trusted for the API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,

    /// Bearer token; replaces any token from the kubeconfig
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,

    /// Leave node-derived kinds out of sync snapshots
    #[serde(default)]
    pub disable_node_poll: bool,
}

impl ClientConfig {
    /// Build the `kube` client configuration.
    pub async fn to_kube_config(&self) -> Result<Config> {
        let mut config = match &self.kubeconfig {
            Some(path) => {
                debug!(path = %path.display(), "Loading kubeconfig");
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::Configuration(format!(
                        "failed to read kubeconfig {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| Error::Configuration(format!("invalid kubeconfig: {}", e)))?
            }
            None => Config::infer()
                .await
                .map_err(|e| Error::Configuration(format!("failed to infer kubeconfig: {}", e)))?,
        };

        if let Some(endpoint) = &self.api_endpoint {
            config.cluster_url = endpoint.parse().map_err(|e| {
                Error::Configuration(format!("invalid API endpoint {:?}: {}", endpoint, e))
            })?;
        }
        if let Some(cert) = &self.cert_file {
            config.auth_info.client_certificate = Some(cert.display().to_string());
            config.auth_info.client_certificate_data = None;
        }
        if let Some(key) = &self.key_file {
            config.auth_info.client_key = Some(key.display().to_string());
            config.auth_info.client_key_data = None;
        }
        if let Some(ca) = &self.ca_file {
            config.root_cert = Some(read_ca_bundle(ca)?);
        }
        if let Some(token) = &self.api_token {
            config.auth_info.token = Some(token.clone().into());
            config.auth_info.token_file = None;
        }
        if self.insecure_skip_tls_verify {
            config.accept_invalid_certs = true;
        }
        Ok(config)
    }
}

/// DER encodings of every certificate in a PEM bundle.
fn read_ca_bundle(path: &Path) -> Result<Vec<Vec<u8>>> {
    let data = std::fs::read(path).map_err(|e| {
        Error::Configuration(format!("failed to read CA file {}: {}", path.display(), e))
    })?;
    let certs: Vec<Vec<u8>> = pem::parse_many(&data)
        .map_err(|e| {
            Error::Configuration(format!("invalid CA file {}: {}", path.display(), e))
        })?
        .into_iter()
        .map(|p| p.into_contents())
        .collect();
    if certs.is_empty() {
        return Err(Error::Configuration(format!(
            "no certificates in CA file {}",
            path.display()
        )));
    }
    debug!(path = %path.display(), count = certs.len(), "Loaded CA bundle");
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: test
  cluster:
    server: https://10.0.0.1:6443
contexts:
- name: test
  context:
    cluster: test
    user: test
current-context: test
users:
- name: test
  user:
    token: abc123
"#;

    fn write_kubeconfig(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("kdd-{}-{}.yaml", name, std::process::id()));
        std::fs::write(&path, KUBECONFIG).unwrap();
        path
    }

    #[tokio::test]
    async fn test_kubeconfig_file() {
        let path = write_kubeconfig("plain");
        let config = ClientConfig {
            kubeconfig: Some(path.clone()),
            ..Default::default()
        }
        .to_kube_config()
        .await
        .unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(config.cluster_url.host(), Some("10.0.0.1"));
        assert!(!config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_endpoint_override_and_insecure() {
        let path = write_kubeconfig("override");
        let config = ClientConfig {
            kubeconfig: Some(path.clone()),
            api_endpoint: Some("https://127.0.0.1:7443".into()),
            insecure_skip_tls_verify: true,
            ..Default::default()
        }
        .to_kube_config()
        .await
        .unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(config.cluster_url.host(), Some("127.0.0.1"));
        assert_eq!(config.cluster_url.port_u16(), Some(7443));
        assert!(config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_credential_overrides() {
        let path = write_kubeconfig("credentials");
        let dir = std::env::temp_dir();
        let ca = dir.join(format!("kdd-ca-{}.pem", std::process::id()));
        std::fs::write(
            &ca,
            "-----BEGIN CERTIFICATE-----\nAQID\n-----END CERTIFICATE-----\n\
             -----BEGIN CERTIFICATE-----\nBAUG\n-----END CERTIFICATE-----\n",
        )
        .unwrap();

        let config = ClientConfig {
            kubeconfig: Some(path.clone()),
            cert_file: Some("/etc/kdd/client.crt".into()),
            key_file: Some("/etc/kdd/client.key".into()),
            ca_file: Some(ca.clone()),
            api_token: Some("override".into()),
            ..Default::default()
        }
        .to_kube_config()
        .await
        .unwrap();
        std::fs::remove_file(path).ok();
        std::fs::remove_file(ca).ok();

        assert_eq!(
            config.auth_info.client_certificate.as_deref(),
            Some("/etc/kdd/client.crt")
        );
        assert_eq!(config.auth_info.client_key.as_deref(), Some("/etc/kdd/client.key"));
        assert_eq!(config.root_cert, Some(vec![vec![1, 2, 3], vec![4, 5, 6]]));
        let auth = serde_json::to_value(&config.auth_info).unwrap();
        assert_eq!(auth["token"], "override");
    }

    #[tokio::test]
    async fn test_ca_file_without_certificates() {
        let path = write_kubeconfig("bad-ca");
        let ca = std::env::temp_dir().join(format!("kdd-bad-ca-{}.pem", std::process::id()));
        std::fs::write(&ca, "not a certificate").unwrap();

        let result = ClientConfig {
            kubeconfig: Some(path.clone()),
            ca_file: Some(ca.clone()),
            ..Default::default()
        }
        .to_kube_config()
        .await;
        std::fs::remove_file(path).ok();
        std::fs::remove_file(ca).ok();

        assert_matches!(result, Err(Error::Configuration(_)));
    }

    #[test]
    fn test_serde_names() {
        let config: ClientConfig = serde_json::from_value(serde_json::json!({
            "certFile": "/c",
            "keyFile": "/k",
            "caFile": "/ca",
            "apiToken": "t",
            "disableNodePoll": true,
        }))
        .unwrap();
        assert_eq!(config.cert_file, Some(PathBuf::from("/c")));
        assert_eq!(config.ca_file, Some(PathBuf::from("/ca")));
        assert_eq!(config.api_token.as_deref(), Some("t"));
        assert!(config.disable_node_poll);
    }

    #[tokio::test]
    async fn test_missing_kubeconfig() {
        let config = ClientConfig {
            kubeconfig: Some("/nonexistent/kdd/kubeconfig".into()),
            ..Default::default()
        };
        assert_matches!(config.to_kube_config().await, Err(Error::Configuration(_)));
    }
}
