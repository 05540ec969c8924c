//! Envoy proxy introspection via the `istioctl` CLI.
//!
//! Every operation shells out to `istioctl` with a hard 30 second budget.
//! On timeout the child is killed and its output discarded; a non-zero exit
//! surfaces the exit status together with the combined stdout/stderr so the
//! caller sees the CLI's own diagnostic.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::errors::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Section of the Envoy configuration to dump for a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Clusters,
    Listeners,
    Routes,
    Endpoints,
    Bootstrap,
    /// Full configuration dump
    All,
}

impl ConfigSection {
    fn arg(&self) -> &'static str {
        match self {
            ConfigSection::Clusters => "cluster",
            ConfigSection::Listeners => "listener",
            ConfigSection::Routes => "route",
            ConfigSection::Endpoints => "endpoint",
            ConfigSection::Bootstrap => "bootstrap",
            ConfigSection::All => "all",
        }
    }
}

/// Client for the external proxy-inspection CLI.
#[derive(Debug, Clone)]
pub struct ProxyConfigClient {
    kubeconfig: Option<PathBuf>,
    binary: PathBuf,
    timeout: Duration,
}

impl ProxyConfigClient {
    /// Create a client. `kubeconfig` is forwarded via `--kubeconfig` when
    /// present; otherwise istioctl resolves credentials on its own.
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self { kubeconfig, binary: PathBuf::from("istioctl"), timeout: DEFAULT_TIMEOUT }
    }

    /// Override the CLI binary. Used by tests to substitute a stub.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Override the subprocess timeout. Used by tests.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Dump one section of a pod proxy's Envoy configuration as JSON.
    pub async fn proxy_config(
        &self,
        section: ConfigSection,
        namespace: &str,
        pod: &str,
    ) -> Result<String> {
        let target = pod_identity(pod, namespace);
        self.exec(&["proxy-config", section.arg(), &target, "-o", "json"]).await
    }

    /// Sync status for every proxy in the mesh.
    pub async fn status_all(&self) -> Result<String> {
        self.exec(&["proxy-status"]).await
    }

    /// Sync status for one pod proxy.
    pub async fn status_for_pod(&self, namespace: &str, pod: &str) -> Result<String> {
        let target = pod_identity(pod, namespace);
        self.exec(&["proxy-status", &target]).await
    }

    /// Run configuration analysis, cluster-wide or scoped to one namespace.
    pub async fn analyze(&self, namespace: Option<&str>) -> Result<String> {
        match namespace {
            Some(ns) => self.exec(&["analyze", "-n", ns]).await,
            None => self.exec(&["analyze"]).await,
        }
    }

    async fn exec(&self, args: &[&str]) -> Result<String> {
        let operation = format!("istioctl {}", args.join(" "));
        debug!(command = %operation, "running istioctl");

        let mut cmd = Command::new(&self.binary);
        if let Some(path) = &self.kubeconfig {
            cmd.arg("--kubeconfig").arg(path);
        }
        cmd.args(args);
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        // Dropping the output future at the timeout must take the child with it.
        cmd.kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result
                .map_err(|e| Error::io(format!("failed to run {}", operation), e))?,
            Err(_) => {
                return Err(Error::Timeout {
                    operation,
                    duration_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(Error::CommandFailed { status, output: combined });
        }

        Ok(combined)
    }
}

/// Target identity istioctl expects for pod-scoped commands.
fn pod_identity(pod: &str, namespace: &str) -> String {
    format!("{}.{}", pod, namespace)
}
