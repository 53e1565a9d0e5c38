//! Pre-flight validation and bootstrap workflow for installing a chaos
//! delegate into a Kubernetes cluster.
//!
//! Before any workload is deployed the workflow answers three questions:
//! does a usable namespace exist (or can one be created), does the acting
//! identity hold the right permissions, and does the manifest apply
//! cleanly and converge to a running pod. The pieces:
//!
//! - [`resolver`]: interactive namespace/service-account resolution with
//!   a conflict rule (no namespace already running a delegate) and a
//!   permission rule (no namespace the identity cannot create)
//! - [`k8s`]: existence checks, self-access-review probing, pod
//!   readiness watching and config map reads
//! - [`manifest`]: local or remotely fetched manifest, applied through
//!   an external `kubectl apply`
//! - [`notify`]: prompting and progress reporting seams, kept out of
//!   the core so it stays testable

pub mod config;
pub mod error;
pub mod k8s;
pub mod manifest;
pub mod notify;
pub mod resolver;

pub use error::{Error, Result};
