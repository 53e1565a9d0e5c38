//! Kubernetes client wrapper for the bootstrap workflow

use std::collections::BTreeMap;
use std::path::Path;

use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod, ServiceAccount};
use kube::{
    api::{Api, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Wrapper around `kube::Client` with the point queries the bootstrap
/// workflow needs: namespace, service account and pod existence.
///
/// Construction failures are plain errors; deciding whether they are
/// fatal belongs to the orchestration layer, not here.
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Create a client from the default kubeconfig or in-cluster config.
    #[instrument(skip_all)]
    pub async fn new() -> Result<Self> {
        let config = Config::infer().await?;
        let client = Client::try_from(config)?;

        info!("Connected to Kubernetes cluster");

        Ok(Self { client })
    }

    /// Create a client from an explicit kubeconfig file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn from_kubeconfig(path: impl AsRef<Path>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path.as_ref())?;
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        let client = Client::try_from(config)?;

        info!("Connected to Kubernetes cluster");

        Ok(Self { client })
    }

    /// Get the inner kube Client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Check whether a namespace with the given name exists.
    ///
    /// A 404 from the API is `Ok(false)`; transport and auth errors
    /// propagate so the caller can tell absence from an unreachable
    /// cluster.
    #[instrument(skip(self))]
    pub async fn namespace_exists(&self, name: &str) -> Result<bool> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        match namespaces.get(name).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a service account exists in the given namespace.
    #[instrument(skip(self))]
    pub async fn service_account_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let accounts: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        match accounts.get(name).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether any pod matching the label selector exists in the
    /// namespace. Phase is deliberately ignored: a terminated pod still
    /// counts, so a namespace with a stale delegate pod is rejected by
    /// the resolver rather than silently reused.
    #[instrument(skip(self))]
    pub async fn pod_exists(&self, namespace: &str, label_selector: &str) -> Result<bool> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default().labels(label_selector))
            .await?;
        debug!(count = list.items.len(), "listed pods by label");
        Ok(!list.items.is_empty())
    }
}

/// Read a config map's data by name and namespace.
///
/// Resolves its own cluster connection from the environment; this read
/// path is independent of any identity resolved elsewhere in the
/// workflow.
#[instrument]
pub async fn read_config_map(name: &str, namespace: &str) -> Result<BTreeMap<String, String>> {
    let client = Client::try_default().await?;
    let config_maps: Api<ConfigMap> = Api::namespaced(client, namespace);
    let cm = config_maps.get(name).await?;
    Ok(cm.data.unwrap_or_default())
}
