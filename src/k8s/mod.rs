//! Kubernetes integration for the bootstrap workflow:
//! - Point existence queries (namespace, service account, pod)
//! - Self-access-review permission probing
//! - Delegate pod readiness watching
//! - Single-shot config map reads

mod access;
mod client;
mod watcher;

pub use access::{PermissionDecision, PermissionQuery};
pub use client::{read_config_map, K8sClient};
pub use watcher::watch_delegate_ready;
