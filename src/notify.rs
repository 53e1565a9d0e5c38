//! User-facing messaging seams.
//!
//! The resolver and watcher never print anything themselves; they report
//! typed [`Progress`] events through a [`Notifier`] and collect input
//! through a [`Prompter`]. The terminal implementations live here, the
//! core stays silent and testable.

use std::io::{self, BufRead, Write};

use tracing::info;

use crate::error::Result;
use crate::resolver::NamespaceMode;

/// Progress events emitted during resolution and readiness watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// A delegate-labeled pod already runs in the chosen namespace.
    DelegateAlreadyPresent { namespace: String },
    /// The identity may not create the (nonexistent) namespace.
    NamespaceCreateDenied {
        namespace: String,
        reason: Option<String>,
    },
    /// An existing, delegate-free namespace was accepted.
    UsingNamespace { namespace: String },
    /// A nonexistent namespace was accepted; the manifest will create it.
    NamespaceWillBeCreated { namespace: String },
    /// The named service account already exists in the namespace.
    UsingExistingServiceAccount { name: String },
    /// The service account is absent; the manifest must create it.
    ServiceAccountWillBeCreated { name: String },
    /// A pod event arrived but the delegate is not yet Running.
    DelegateConnecting,
    /// The delegate pod reached the Running phase.
    DelegateRunning,
}

/// Sink for [`Progress`] events.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Progress);
}

/// Notifier that reports progress through the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: Progress) {
        match event {
            Progress::DelegateAlreadyPresent { namespace } => {
                info!(
                    namespace,
                    "a chaos delegate is already installed in this namespace, choose another"
                );
            }
            Progress::NamespaceCreateDenied { namespace, reason } => {
                info!(
                    namespace,
                    ?reason,
                    "no permission to create this namespace, choose an existing one"
                );
            }
            Progress::UsingNamespace { namespace } => {
                info!(namespace, "continuing with existing namespace");
            }
            Progress::NamespaceWillBeCreated { namespace } => {
                info!(namespace, "namespace will be created during manifest apply");
            }
            Progress::UsingExistingServiceAccount { name } => {
                info!(name, "using the existing service account");
            }
            Progress::ServiceAccountWillBeCreated { name } => {
                info!(name, "service account will be created during manifest apply");
            }
            Progress::DelegateConnecting => {
                info!("connecting chaos delegate to ChaosCenter");
            }
            Progress::DelegateRunning => {
                info!("chaos delegate is running");
            }
        }
    }
}

/// Source of interactive answers for the resolver.
///
/// Implementations return the raw line; empty input means "use the
/// default" and is interpreted by the resolver, not here.
pub trait Prompter {
    fn prompt_namespace(&mut self, mode: NamespaceMode) -> Result<String>;
    fn prompt_service_account(&mut self) -> Result<String>;
}

/// Prompter backed by the process stdin/stdout.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    fn read_line(&self, prompt: &str) -> Result<String> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl Prompter for StdinPrompter {
    fn prompt_namespace(&mut self, mode: NamespaceMode) -> Result<String> {
        let prompt = match mode {
            NamespaceMode::ExistingOnly => format!(
                "Enter the namespace (existing namespace) [Default: {}]: ",
                crate::resolver::DEFAULT_NAMESPACE
            ),
            NamespaceMode::CreateOrExisting => format!(
                "Enter the namespace (new or existing namespace) [Default: {}]: ",
                crate::resolver::DEFAULT_NAMESPACE
            ),
        };
        self.read_line(&prompt)
    }

    fn prompt_service_account(&mut self) -> Result<String> {
        let prompt = format!(
            "Enter service account [Default: {}]: ",
            crate::resolver::DEFAULT_SERVICE_ACCOUNT
        );
        self.read_line(&prompt)
    }
}
