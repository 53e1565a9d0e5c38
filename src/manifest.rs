//! Manifest source resolution and apply
//!
//! A manifest is either a local file or fetched from ChaosCenter and
//! cached to disk, then handed to an external `kubectl apply`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};

/// Fixed cache filename for remotely fetched manifests. Overwritten on
/// every fetch; no versioning.
pub const DEFAULT_CACHE_FILE: &str = "chaos-delegate-manifest.yaml";

/// Where the delegate manifest comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// A manifest file already on disk, used as-is.
    Local { path: PathBuf },
    /// A manifest served by ChaosCenter at
    /// `{endpoint}/{yaml_path}/{token}.yaml`, materialized to
    /// `cache_path` before apply.
    Remote {
        endpoint: String,
        yaml_path: String,
        token: String,
        cache_path: PathBuf,
    },
}

impl ManifestSource {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    pub fn remote(
        endpoint: impl Into<String>,
        yaml_path: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self::Remote {
            endpoint: endpoint.into(),
            yaml_path: yaml_path.into(),
            token: token.into(),
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }

    /// Override the cache file used for remote manifests.
    pub fn cache_to(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::Remote {
                endpoint,
                yaml_path,
                token,
                ..
            } => Self::Remote {
                endpoint,
                yaml_path,
                token,
                cache_path: path.into(),
            },
            local => local,
        }
    }

    /// The fetch URL for a remote source, `None` for local files.
    pub fn url(&self) -> Option<String> {
        match self {
            Self::Local { .. } => None,
            Self::Remote {
                endpoint,
                yaml_path,
                token,
                ..
            } => Some(format!("{}/{}/{}.yaml", endpoint, yaml_path, token)),
        }
    }

    /// Materialize the manifest to a local path.
    ///
    /// Local sources pass through untouched. Remote sources are fetched
    /// with a plain unauthenticated GET and the full response body is
    /// written verbatim to the cache file, overwriting any prior
    /// content. Fetch or write failures abort with that error.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> Result<PathBuf> {
        match self {
            Self::Local { path } => Ok(path.clone()),
            Self::Remote {
                endpoint,
                yaml_path,
                token,
                cache_path,
            } => {
                let url = format!("{}/{}/{}.yaml", endpoint, yaml_path, token);
                info!(%url, "fetching delegate manifest");
                let body = reqwest::get(&url).await?.bytes().await?;
                tokio::fs::write(cache_path, &body).await?;
                debug!(bytes = body.len(), cache = %cache_path.display(), "cached manifest");
                Ok(cache_path.clone())
            }
        }
    }
}

/// Runs `kubectl apply` against a resolved manifest path.
#[derive(Debug, Clone)]
pub struct ManifestApplier {
    kubectl: PathBuf,
    kubeconfig: Option<PathBuf>,
}

impl Default for ManifestApplier {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestApplier {
    pub fn new() -> Self {
        Self {
            kubectl: PathBuf::from("kubectl"),
            kubeconfig: None,
        }
    }

    /// Scope the apply to an explicit kubeconfig file instead of the
    /// tool's default resolution.
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Use a specific `kubectl` binary instead of resolving from PATH.
    pub fn with_kubectl(mut self, program: impl Into<PathBuf>) -> Self {
        self.kubectl = program.into();
        self
    }

    /// Resolve the source and apply it.
    pub async fn apply(&self, source: &ManifestSource) -> Result<String> {
        let path = source.resolve().await?;
        self.apply_file(&path).await
    }

    /// Apply a manifest file, capturing stdout and stderr separately.
    ///
    /// On a non-zero exit, any captured stderr text is promoted verbatim
    /// as the error and stdout is dropped; with nothing on stderr the
    /// exit status itself is the error. On success stdout is the result.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn apply_file(&self, path: &Path) -> Result<String> {
        let mut cmd = Command::new(&self.kubectl);
        cmd.arg("apply").arg("-f").arg(path);
        if let Some(kubeconfig) = &self.kubeconfig {
            cmd.arg("--kubeconfig").arg(kubeconfig);
        }

        let output = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            info!("manifest applied");
            return Ok(stdout.to_string());
        }

        if !stderr.is_empty() {
            return Err(Error::Apply(stderr.to_string()));
        }
        Err(Error::ApplyExit(output.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn remote_url_joins_endpoint_path_and_token() {
        let source = ManifestSource::remote("https://cc.example", "manifests", "tok123");
        assert_eq!(
            source.url().unwrap(),
            "https://cc.example/manifests/tok123.yaml"
        );
    }

    #[test]
    fn local_source_has_no_url() {
        assert_eq!(ManifestSource::local("delegate.yaml").url(), None);
    }

    #[tokio::test]
    async fn local_source_resolves_to_its_own_path() {
        let source = ManifestSource::local("/tmp/delegate.yaml");
        let path = source.resolve().await.unwrap();
        assert_eq!(path, PathBuf::from("/tmp/delegate.yaml"));
    }

    #[tokio::test]
    async fn remote_fetch_writes_body_verbatim_to_cache() {
        let server = MockServer::start().await;
        let body = "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: litmus\n";
        Mock::given(method("GET"))
            .and(path("/manifests/tok123.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("delegate-manifest.yaml");
        let source =
            ManifestSource::remote(server.uri(), "manifests", "tok123").cache_to(&cache);

        let resolved = source.resolve().await.unwrap();
        assert_eq!(resolved, cache);
        assert_eq!(std::fs::read_to_string(&cache).unwrap(), body);
    }

    #[tokio::test]
    async fn remote_fetch_overwrites_previous_cache_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifests/tok123.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("new"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("delegate-manifest.yaml");
        std::fs::write(&cache, "stale content from a previous install").unwrap();

        let source =
            ManifestSource::remote(server.uri(), "manifests", "tok123").cache_to(&cache);
        source.resolve().await.unwrap();

        assert_eq!(std::fs::read_to_string(&cache).unwrap(), "new");
    }

    #[cfg(unix)]
    fn fake_kubectl(dir: &Path, script_body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-kubectl");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script_body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn apply_failure_promotes_stderr_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let kubectl = fake_kubectl(
            dir.path(),
            "printf 'permission denied: default/x' >&2\nexit 1",
        );

        let applier = ManifestApplier::new().with_kubectl(&kubectl);
        let err = applier
            .apply_file(Path::new("delegate.yaml"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "permission denied: default/x");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn apply_failure_with_empty_stderr_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let kubectl = fake_kubectl(dir.path(), "exit 3");

        let applier = ManifestApplier::new().with_kubectl(&kubectl);
        let err = applier
            .apply_file(Path::new("delegate.yaml"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ApplyExit(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn apply_success_returns_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let kubectl = fake_kubectl(dir.path(), "printf 'namespace/litmus created'");

        let applier = ManifestApplier::new().with_kubectl(&kubectl);
        let output = applier.apply_file(Path::new("delegate.yaml")).await.unwrap();

        assert_eq!(output, "namespace/litmus created");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn apply_passes_kubeconfig_flag_through() {
        let dir = tempfile::tempdir().unwrap();
        // Echo the argv back so the test can assert the flag placement.
        let kubectl = fake_kubectl(dir.path(), "printf '%s ' \"$@\"");

        let applier = ManifestApplier::new()
            .with_kubectl(&kubectl)
            .with_kubeconfig("/home/user/.kube/config");
        let output = applier.apply_file(Path::new("delegate.yaml")).await.unwrap();

        assert_eq!(
            output,
            "apply -f delegate.yaml --kubeconfig /home/user/.kube/config "
        );
    }

    #[tokio::test]
    async fn missing_apply_binary_is_an_io_error() {
        let applier = ManifestApplier::new().with_kubectl("/nonexistent/kubectl");
        let err = applier
            .apply_file(Path::new("delegate.yaml"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
    }
}
