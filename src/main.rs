use std::time::Duration;

use anyhow::{bail, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use delegate_bootstrap::{
    config::Config,
    k8s::{watch_delegate_ready, K8sClient},
    manifest::{ManifestApplier, ManifestSource},
    notify::{StdinPrompter, TracingNotifier},
    resolver::{resolve_identity, NamespaceMode},
};

/// Thin orchestration over the bootstrap workflow. This is the only
/// place where an error terminates the process; the library layers
/// return everything to their caller.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting chaos delegate bootstrap");

    let config = Config::load()?;

    let client = match &config.kubeconfig {
        Some(path) => K8sClient::from_kubeconfig(path).await?,
        None => K8sClient::new().await?,
    };

    let mut prompter = StdinPrompter;
    let notifier = TracingNotifier;

    let identity = resolve_identity(
        &client,
        &mut prompter,
        &notifier,
        NamespaceMode::CreateOrExisting,
        &config.delegate_label,
    )
    .await?;
    tracing::info!(
        namespace = %identity.namespace,
        service_account = %identity.service_account,
        "install target resolved"
    );

    let source = match (&config.manifest, &config.endpoint, &config.token) {
        (Some(path), _, _) => ManifestSource::local(path),
        (None, Some(endpoint), Some(token)) => {
            ManifestSource::remote(endpoint, &config.yaml_path, token)
                .cache_to(&config.cache_path)
        }
        _ => bail!("no manifest configured: set MANIFEST or ENDPOINT and TOKEN"),
    };

    let mut applier = ManifestApplier::new();
    if let Some(kubeconfig) = &config.kubeconfig {
        applier = applier.with_kubeconfig(kubeconfig);
    }
    let output = applier.apply(&source).await?;
    tracing::info!("{}", output.trim_end());

    let deadline = config.watch_timeout_secs.map(Duration::from_secs);
    watch_delegate_ready(
        &client,
        &identity.namespace,
        &config.delegate_label,
        deadline,
        &notifier,
    )
    .await?;

    tracing::info!("chaos delegate bootstrap complete");
    Ok(())
}
