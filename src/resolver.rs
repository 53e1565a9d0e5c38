//! Namespace and service-account resolution
//!
//! Interactive retry loop that settles where the chaos delegate will be
//! installed. A namespace is accepted only if it is either existing and
//! free of a delegate, or nonexistent and creatable by the current
//! identity; anything else re-prompts. The loop talks to the cluster
//! through [`ClusterOps`] so it can be driven against a mock in tests.

use async_trait::async_trait;
use tracing::instrument;

use crate::error::Result;
use crate::k8s::{K8sClient, PermissionDecision, PermissionQuery};
use crate::notify::{Notifier, Progress, Prompter};

/// Namespace used when the prompt receives empty input.
pub const DEFAULT_NAMESPACE: &str = "litmus";

/// Service account used when the prompt receives empty input.
pub const DEFAULT_SERVICE_ACCOUNT: &str = "litmus";

/// Cluster queries the resolver depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterOps: Send + Sync {
    async fn namespace_exists(&self, name: &str) -> Result<bool>;
    async fn service_account_exists(&self, namespace: &str, name: &str) -> Result<bool>;
    async fn pod_exists(&self, namespace: &str, label_selector: &str) -> Result<bool>;
    async fn check_permission(&self, query: &PermissionQuery) -> Result<PermissionDecision>;
}

#[async_trait]
impl ClusterOps for K8sClient {
    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        K8sClient::namespace_exists(self, name).await
    }

    async fn service_account_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        K8sClient::service_account_exists(self, namespace, name).await
    }

    async fn pod_exists(&self, namespace: &str, label_selector: &str) -> Result<bool> {
        K8sClient::pod_exists(self, namespace, label_selector).await
    }

    async fn check_permission(&self, query: &PermissionQuery) -> Result<PermissionDecision> {
        K8sClient::check_permission(self, query).await
    }
}

/// Whether the prompt offers only existing namespaces or allows a new
/// one to be created downstream by the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceMode {
    ExistingOnly,
    CreateOrExisting,
}

/// Accepted namespace plus whether it already existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSelection {
    pub name: String,
    /// `false` means the manifest apply is expected to create it.
    pub preexisting: bool,
}

/// Accepted service account plus whether it already existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountSelection {
    pub name: String,
    /// `false` means the manifest must create it.
    pub preexisting: bool,
}

/// The fully resolved install target, owned by the caller for the rest
/// of the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterIdentity {
    pub namespace: String,
    pub namespace_preexisting: bool,
    pub service_account: String,
    pub service_account_preexisting: bool,
}

/// Resolve a namespace for the delegate, re-prompting until one is
/// acceptable.
///
/// An existing namespace already occupied by a delegate-labeled pod is
/// never reused, and a nonexistent namespace the identity cannot create
/// is never skipped past silently; both reject and re-prompt. Transport
/// errors from the existence check or the permission probe propagate to
/// the caller, which owns the terminate-or-retry policy.
#[instrument(skip(ops, prompter, notifier))]
pub async fn resolve_namespace(
    ops: &impl ClusterOps,
    prompter: &mut impl Prompter,
    notifier: &dyn Notifier,
    mode: NamespaceMode,
    delegate_label: &str,
) -> Result<NamespaceSelection> {
    loop {
        let input = prompter.prompt_namespace(mode)?;
        let namespace = if input.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            input
        };

        if ops.namespace_exists(&namespace).await? {
            if ops.pod_exists(&namespace, delegate_label).await? {
                notifier.notify(Progress::DelegateAlreadyPresent {
                    namespace: namespace.clone(),
                });
                continue;
            }
            notifier.notify(Progress::UsingNamespace {
                namespace: namespace.clone(),
            });
            return Ok(NamespaceSelection {
                name: namespace,
                preexisting: true,
            });
        }

        let query = PermissionQuery::new("create", "namespace").in_namespace(&namespace);
        let decision = ops.check_permission(&query).await?;
        if !decision.allowed {
            notifier.notify(Progress::NamespaceCreateDenied {
                namespace: namespace.clone(),
                reason: decision.reason,
            });
            continue;
        }

        notifier.notify(Progress::NamespaceWillBeCreated {
            namespace: namespace.clone(),
        });
        return Ok(NamespaceSelection {
            name: namespace,
            preexisting: false,
        });
    }
}

/// Resolve the service account for the delegate. Single pass: the
/// caller uses `preexisting` to decide whether the manifest must create
/// the account.
#[instrument(skip(ops, prompter, notifier))]
pub async fn resolve_service_account(
    ops: &impl ClusterOps,
    prompter: &mut impl Prompter,
    notifier: &dyn Notifier,
    namespace: &str,
) -> Result<ServiceAccountSelection> {
    let input = prompter.prompt_service_account()?;
    let name = if input.is_empty() {
        DEFAULT_SERVICE_ACCOUNT.to_string()
    } else {
        input
    };

    let preexisting = ops.service_account_exists(namespace, &name).await?;
    if preexisting {
        notifier.notify(Progress::UsingExistingServiceAccount { name: name.clone() });
    } else {
        notifier.notify(Progress::ServiceAccountWillBeCreated { name: name.clone() });
    }

    Ok(ServiceAccountSelection { name, preexisting })
}

/// Resolve namespace and service account in one pass.
pub async fn resolve_identity(
    ops: &impl ClusterOps,
    prompter: &mut impl Prompter,
    notifier: &dyn Notifier,
    mode: NamespaceMode,
    delegate_label: &str,
) -> Result<ClusterIdentity> {
    let namespace = resolve_namespace(ops, prompter, notifier, mode, delegate_label).await?;
    let account = resolve_service_account(ops, prompter, notifier, &namespace.name).await?;

    Ok(ClusterIdentity {
        namespace: namespace.name,
        namespace_preexisting: namespace.preexisting,
        service_account: account.name,
        service_account_preexisting: account.preexisting,
    })
}
