//! [`ClusterApi`] over a `kube::Client`.

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::path::Path;

use crate::cluster::{ClusterApi, ClusterError, NamespaceSummary, PodSummary};

#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl std::fmt::Debug for KubeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCluster")
            .field("default_namespace", &self.client.default_namespace())
            .finish()
    }
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Load configuration from `kubeconfig` when given, otherwise from the in-cluster
    /// service account, and build a client from it.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, ClusterError> {
        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| ClusterError::Config(e.to_string()))?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| ClusterError::Config(e.to_string()))?
            }
            None => Config::incluster().map_err(|e| ClusterError::Config(e.to_string()))?,
        };

        let client = Client::try_from(config).map_err(|e| ClusterError::Config(e.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    #[tracing::instrument(skip(self))]
    async fn list_namespaces(&self) -> Result<Vec<NamespaceSummary>, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = api
            .list(&ListParams::default())
            .await
            .map_err(|e| ClusterError::Api(e.to_string()))?;

        Ok(namespaces
            .items
            .iter()
            .map(NamespaceSummary::from_namespace)
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSummary>, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default())
            .await
            .map_err(|e| ClusterError::Api(e.to_string()))?;

        let now = Utc::now();
        tracing::debug!(count = pods.items.len(), "Listed pods");
        Ok(pods
            .items
            .iter()
            .map(|pod| PodSummary::from_pod(pod, now))
            .collect())
    }
}
