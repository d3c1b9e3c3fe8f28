use std::path::PathBuf;

use reqwest::StatusCode;

/// Failures the commands distinguish when choosing an exit code.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("profile '{profile}' not found in config file {}", .path.display())]
    ProfileNotFound { profile: String, path: PathBuf },

    #[error("cannot read config file {}: {reason}", .path.display())]
    ConfigUnreadable { path: PathBuf, reason: String },

    #[error("{kind} with OCID '{id}' not found")]
    ResourceNotFound { kind: &'static str, id: String },

    #[error("tag key '{namespace}.{key}' does not exist for this resource")]
    TagNotPresent { namespace: String, key: String },

    #[error("compartment '{0}' not found")]
    CompartmentNotFound(String),

    #[error("malformed compartment hierarchy at '{id}': {reason}")]
    MalformedHierarchy { id: String, reason: &'static str },

    #[error("OCI error {status}: {body}")]
    Api { status: StatusCode, body: String },
}

impl Error {
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::ProfileNotFound { .. } | Error::ConfigUnreadable { .. } => 2,
            Error::ResourceNotFound { .. } | Error::TagNotPresent { .. } => 3,
            Error::CompartmentNotFound(_)
            | Error::MalformedHierarchy { .. }
            | Error::Api { .. } => 1,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

/// Exit code for any error reaching `main`.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::exit_code)
        .unwrap_or(1)
}
