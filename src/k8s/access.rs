//! Self-access-review permission probing
//!
//! Asks the API server whether the current identity may perform a verb
//! on a resource. Denial is an expected answer, not a failure: the
//! resolver interprets it as "pick another namespace".

use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
};
use kube::api::{Api, PostParams};
use tracing::{debug, instrument};

use super::client::K8sClient;
use crate::error::Result;

/// A single permission question, fully constructed before the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionQuery {
    pub verb: String,
    pub resource: String,
    pub group: Option<String>,
    pub namespace: Option<String>,
    pub subresource: Option<String>,
    pub resource_name: Option<String>,
}

impl PermissionQuery {
    pub fn new(verb: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            resource: resource.into(),
            group: None,
            namespace: None,
            subresource: None,
            resource_name: None,
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn subresource(mut self, subresource: impl Into<String>) -> Self {
        self.subresource = Some(subresource.into());
        self
    }

    pub fn resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }
}

/// The server's answer to a [`PermissionQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionDecision {
    pub allowed: bool,
    /// Server-supplied justification when the request is denied.
    pub reason: Option<String>,
    /// Authorization-webhook evaluation error, if the server reported one.
    pub evaluation_error: Option<String>,
}

impl K8sClient {
    /// Submit a self-subject access review for the given query.
    ///
    /// Transport errors propagate; a denied decision is returned as a
    /// normal value with whatever diagnostics the server attached.
    #[instrument(skip(self))]
    pub async fn check_permission(&self, query: &PermissionQuery) -> Result<PermissionDecision> {
        let review = SelfSubjectAccessReview {
            spec: SelfSubjectAccessReviewSpec {
                resource_attributes: Some(ResourceAttributes {
                    verb: Some(query.verb.clone()),
                    resource: Some(query.resource.clone()),
                    group: query.group.clone(),
                    namespace: query.namespace.clone(),
                    subresource: query.subresource.clone(),
                    name: query.resource_name.clone(),
                    ..Default::default()
                }),
                non_resource_attributes: None,
            },
            ..Default::default()
        };

        let reviews: Api<SelfSubjectAccessReview> = Api::all(self.inner().clone());
        let response = reviews.create(&PostParams::default(), &review).await?;

        let status = response.status.unwrap_or_default();
        let decision = PermissionDecision {
            allowed: status.allowed,
            reason: status.reason,
            evaluation_error: status.evaluation_error,
        };

        debug!(
            verb = %query.verb,
            resource = %query.resource,
            allowed = decision.allowed,
            reason = ?decision.reason,
            "access review answered"
        );

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_fills_optional_attributes() {
        let query = PermissionQuery::new("create", "namespace")
            .in_namespace("litmus")
            .group("")
            .subresource("status")
            .resource_name("litmus");

        assert_eq!(query.verb, "create");
        assert_eq!(query.resource, "namespace");
        assert_eq!(query.namespace.as_deref(), Some("litmus"));
        assert_eq!(query.subresource.as_deref(), Some("status"));
        assert_eq!(query.resource_name.as_deref(), Some("litmus"));
    }

    #[test]
    fn minimal_query_leaves_attributes_unset() {
        let query = PermissionQuery::new("list", "pods");
        assert_eq!(query.namespace, None);
        assert_eq!(query.group, None);
        assert_eq!(query.subresource, None);
        assert_eq!(query.resource_name, None);
    }
}
