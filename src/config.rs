//! Container configuration via `rivet.toml`
//!
//! A container reads its executor, naming and remote-reference settings from
//! one TOML file. `Container::open_dir` writes a commented default on first
//! use; edit it and restart to change settings.

use rivet_core::{EndpointDescriptor, Error, Result};
use rivet_naming::{FailurePolicy, LookupName, DEFAULT_PREFIX};
use rivet_runtime::{
    AbortPolicy, CallerRunsPolicy, DiscardPolicy, RejectionPolicy, RuntimeConfig, ShutdownPolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Config file name placed in the container directory.
pub const CONFIG_FILE_NAME: &str = "rivet.toml";

/// `[executor]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Worker threads (default 4)
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Pending tasks allowed beyond idle workers (default 1024)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// `"abort"` (default), `"discard"` or `"caller_runs"`
    #[serde(default = "default_rejection_policy")]
    pub rejection_policy: String,
    /// `"drain"` (default) or `"abandon"`
    #[serde(default = "default_shutdown")]
    pub shutdown: String,
}

fn default_worker_threads() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_rejection_policy() -> String {
    "abort".to_string()
}

fn default_shutdown() -> String {
    "drain".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            queue_capacity: default_queue_capacity(),
            rejection_policy: default_rejection_policy(),
            shutdown: default_shutdown(),
        }
    }
}

impl ExecutorConfig {
    /// Build the configured rejection policy.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unrecognized policy name.
    pub fn rejection_policy(&self) -> Result<Arc<dyn RejectionPolicy>> {
        match self.rejection_policy.as_str() {
            "abort" => Ok(Arc::new(AbortPolicy)),
            "discard" => Ok(Arc::new(DiscardPolicy)),
            "caller_runs" => Ok(Arc::new(CallerRunsPolicy)),
            other => Err(Error::Config(format!(
                "Invalid rejection_policy '{}' in rivet.toml. Expected \"abort\", \"discard\" or \"caller_runs\".",
                other
            ))),
        }
    }

    /// Parse the shutdown mode.
    pub fn shutdown_policy(&self) -> Result<ShutdownPolicy> {
        match self.shutdown.as_str() {
            "drain" => Ok(ShutdownPolicy::Drain),
            "abandon" => Ok(ShutdownPolicy::Abandon),
            other => Err(Error::Config(format!(
                "Invalid shutdown '{}' in rivet.toml. Expected \"drain\" or \"abandon\".",
                other
            ))),
        }
    }

    /// Runtime sizing derived from this section.
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        if self.worker_threads == 0 {
            return Err(Error::Config(
                "worker_threads in rivet.toml must be at least 1".to_string(),
            ));
        }
        Ok(RuntimeConfig {
            worker_threads: self.worker_threads,
            queue_capacity: self.queue_capacity,
            shutdown: self.shutdown_policy()?,
        })
    }
}

/// `[naming]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamingConfig {
    /// Accepted name prefixes (default `["java"]`)
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
    /// `"retry"` (default) or `"cache"`
    #[serde(default = "default_failure_policy")]
    pub failure_policy: String,
}

fn default_prefixes() -> Vec<String> {
    vec![DEFAULT_PREFIX.to_string()]
}

fn default_failure_policy() -> String {
    "retry".to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            prefixes: default_prefixes(),
            failure_policy: default_failure_policy(),
        }
    }
}

impl NamingConfig {
    /// Parse the failure policy.
    pub fn failure_policy(&self) -> Result<FailurePolicy> {
        match self.failure_policy.as_str() {
            "retry" => Ok(FailurePolicy::Retry),
            "cache" => Ok(FailurePolicy::CacheFailure),
            other => Err(Error::Config(format!(
                "Invalid failure_policy '{}' in rivet.toml. Expected \"retry\" or \"cache\".",
                other
            ))),
        }
    }
}

/// One `[[remote]]` entry: a name bound to an object exported by a peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Name to bind, e.g. `"java:global/Calculator"`
    pub name: String,
    /// Endpoint URI, e.g. `"rpc://calc-host:4201"`
    pub uri: String,
    /// Export id on the peer
    pub object: String,
    /// Interface the proxy implements; must be registered with the container
    pub interface: String,
}

impl RemoteConfig {
    /// Parse the endpoint URI
    pub fn endpoint(&self) -> Result<EndpointDescriptor> {
        EndpointDescriptor::parse(&self.uri)
    }
}

/// Container configuration loaded from `rivet.toml`.
///
/// # Example
///
/// ```toml
/// [executor]
/// worker_threads = 4
/// rejection_policy = "abort"
///
/// [naming]
/// failure_policy = "retry"
///
/// [[remote]]
/// name = "java:global/Calculator"
/// uri = "rpc://calc-host:4201"
/// object = "Calculator"
/// interface = "Calculator"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Task runtime settings
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Naming scope settings
    #[serde(default)]
    pub naming: NamingConfig,
    /// Remote references bound at open
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote: Vec<RemoteConfig>,
}

impl ContainerConfig {
    /// Check every setting, so a bad file fails at open rather than at first use.
    pub fn validate(&self) -> Result<()> {
        self.executor.runtime_config()?;
        self.executor.rejection_policy()?;
        self.naming.failure_policy()?;

        if self.naming.prefixes.is_empty() {
            return Err(Error::Config(
                "naming.prefixes in rivet.toml must not be empty".to_string(),
            ));
        }
        for prefix in &self.naming.prefixes {
            if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::Config(format!(
                    "Invalid name prefix '{}' in rivet.toml",
                    prefix
                )));
            }
        }

        let mut seen = HashSet::new();
        for remote in &self.remote {
            let name = LookupName::parse(&remote.name)
                .map_err(|e| Error::Config(format!("[[remote]] {}: {}", remote.name, e)))?;
            if !seen.insert(name.path()) {
                return Err(Error::Config(format!(
                    "[[remote]] name '{}' appears more than once",
                    remote.name
                )));
            }
            remote
                .endpoint()
                .map_err(|e| Error::Config(format!("[[remote]] {}: {}", remote.name, e)))?;
            if remote.object.trim().is_empty() || remote.interface.trim().is_empty() {
                return Err(Error::Config(format!(
                    "[[remote]] {}: object and interface must not be empty",
                    remote.name
                )));
            }
        }
        Ok(())
    }

    /// Parse config from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ContainerConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse rivet.toml: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Rivet container configuration

[executor]
# Worker threads running submitted tasks (default: 4)
worker_threads = 4
# Pending tasks allowed beyond what idle workers can take (default: 1024)
queue_capacity = 1024
# What a refused task does after its listener is told:
#   "abort"       = submit fails with TaskRejected (default)
#   "discard"     = task is dropped, submit succeeds
#   "caller_runs" = task runs on the submitting thread
rejection_policy = "abort"
# Queued tasks at shutdown: "drain" (run them, default) or "abandon" (cancel them)
shutdown = "drain"

[naming]
# Accepted name prefixes, e.g. "java:comp/env/jdbc/Orders"
prefixes = ["java"]
# After a failed resolution: "retry" on next lookup (default) or "cache" the failure
failure_policy = "retry"

# Remote references bound when the container opens.
# [[remote]]
# name = "java:global/Calculator"
# uri = "rpc://calc-host:4201"
# object = "Calculator"
# interface = "Calculator"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
