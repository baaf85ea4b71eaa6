//! Read-only access to the Kubernetes API for kubeapps.
//!
//! [`ClusterApi`] is the port the HTTP layer talks to; [`KubeCluster`] implements it
//! over a `kube::Client` loaded from a kubeconfig file or the in-cluster service
//! account.

pub mod client;
pub mod cluster;

pub use client::KubeCluster;
pub use cluster::{
    format_age, pod_readiness, pod_restarts, ClusterApi, ClusterError, NamespaceSummary,
    PodSummary, DEFAULT_NAMESPACE,
};
