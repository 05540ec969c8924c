//! # Configuration
//!
//! Runtime settings and kubeconfig resolution for meshlens.
//!
//! The server is flag-driven: there is no configuration file of its own.
//! The only external configuration source is the kubeconfig, resolved in
//! kubectl's priority order: an explicit `--kubeconfig` path, then the
//! `$KUBECONFIG` environment variable (which may name several files), then
//! `~/.kube/config`.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

/// Runtime settings assembled from the CLI
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Explicit kubeconfig path, if any
    pub kubeconfig: Option<PathBuf>,
    /// Port for the HTTP transport binding; stdio is served when absent
    pub http_port: Option<u16>,
}

/// The resolved kubeconfig source: which on-disk file(s) back the cluster
/// credentials.
///
/// All contributing files are watched for changes so that a credential
/// rotation triggers a backend reload. The explicit path (when one was
/// given) is also forwarded to the proxy-inspection CLI via `--kubeconfig`;
/// when the source was resolved from defaults the CLI is left to do its own
/// resolution, matching kubectl-family behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeconfigSource {
    explicit: Option<PathBuf>,
    paths: Vec<PathBuf>,
}

impl KubeconfigSource {
    /// Resolve the kubeconfig source from an optional explicit path.
    ///
    /// Resolution never touches the filesystem; a path that does not exist
    /// yet is still a valid source (client construction will report the
    /// real error with context).
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve_from(explicit, env::var_os("KUBECONFIG"), env::var_os("HOME"))
    }

    fn resolve_from(
        explicit: Option<&Path>,
        env_value: Option<OsString>,
        home: Option<OsString>,
    ) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self {
                explicit: Some(path.to_path_buf()),
                paths: vec![path.to_path_buf()],
            });
        }

        if let Some(value) = env_value {
            let paths: Vec<PathBuf> =
                env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()).collect();
            if !paths.is_empty() {
                return Ok(Self { explicit: None, paths });
            }
        }

        let home = home.map(PathBuf::from).ok_or_else(|| {
            Error::config("cannot resolve kubeconfig: no --kubeconfig given, $KUBECONFIG unset and $HOME unset")
        })?;
        Ok(Self { explicit: None, paths: vec![home.join(".kube").join("config")] })
    }

    /// All files contributing to the merged configuration, in precedence order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// The explicit `--kubeconfig` path, if one was given
    pub fn explicit_path(&self) -> Option<&Path> {
        self.explicit.as_deref()
    }
}
