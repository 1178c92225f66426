use cf_ddns_provider::ProviderError;
use std::fmt;
use thiserror::Error;

/// Startup configuration problems; every variant is fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("validation failed: {0}")]
    Validate(#[from] validator::ValidationErrors),

    #[error("invalid schedule `{expr}`: {reason}")]
    Schedule { expr: String, reason: String },
}

/// Step of a reconciliation cycle, carried by errors for log context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    ResolveIp,
    FindRecord,
    CreateRecord,
    UpdateRecord,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::ResolveIp => "resolve public IP",
            Operation::FindRecord => "find record",
            Operation::CreateRecord => "create record",
            Operation::UpdateRecord => "update record",
        })
    }
}

/// Anything that ends a cycle early. Never escapes the cycle boundary.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("{op}: network error: {message}")]
    Network { op: Operation, message: String },

    #[error("{op}: {source}")]
    Provider {
        op: Operation,
        #[source]
        source: ProviderError,
    },
}

impl CycleError {
    /// Transport failures count as network errors, everything else the
    /// provider reports stays a provider error.
    pub fn from_provider(op: Operation, err: ProviderError) -> Self {
        if err.is_transport() {
            CycleError::Network {
                op,
                message: format!("{:#}", anyhow::Error::new(err)),
            }
        } else {
            CycleError::Provider { op, source: err }
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            CycleError::Network { op, .. } | CycleError::Provider { op, .. } => *op,
        }
    }
}
