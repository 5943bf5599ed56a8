use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::Serialize;
use thiserror::Error;

use crate::keystore::KeyStoreError;
use crate::token_signer::SigningError;
use crate::token_verifier::VerificationError;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenIdErrorType {
    InvalidRequest,
    InvalidToken,
    ServerError,
}

impl OpenIdErrorType {
    pub fn status_code(&self) -> u16 {
        match self {
            OpenIdErrorType::InvalidRequest => 400,
            OpenIdErrorType::InvalidToken => 401,
            OpenIdErrorType::ServerError => 500,
        }
    }
}

impl Display for OpenIdErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenIdErrorType::InvalidRequest => write!(f, "invalid_request"),
            OpenIdErrorType::InvalidToken => write!(f, "invalid_token"),
            OpenIdErrorType::ServerError => write!(f, "server_error"),
        }
    }
}

#[derive(Error, Debug, Serialize)]
#[error("OpenId error: {:?}, description: {}", .error_type, .description)]
pub struct OpenIdError {
    #[serde(rename = "error")]
    error_type: OpenIdErrorType,
    #[serde(rename = "error_description")]
    description: String,
    #[serde(skip)]
    #[source]
    source: Option<anyhow::Error>,
}

impl OpenIdError {
    fn new<D: Into<String>>(
        error_type: OpenIdErrorType,
        description: D,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            error_type,
            description: description.into(),
            source,
        }
    }

    pub fn invalid_request<D: Into<String>>(description: D) -> Self {
        Self::new(OpenIdErrorType::InvalidRequest, description, None)
    }

    pub fn invalid_request_with_source<D: Into<String>, T: Into<anyhow::Error>>(
        description: D,
        source: T,
    ) -> Self {
        Self::new(
            OpenIdErrorType::InvalidRequest,
            description,
            Some(source.into()),
        )
    }

    pub fn invalid_token<D: Into<String>>(description: D) -> Self {
        Self::new(OpenIdErrorType::InvalidToken, description, None)
    }

    pub fn invalid_token_with_source<D: Into<String>, T: Into<anyhow::Error>>(
        description: D,
        source: T,
    ) -> Self {
        Self::new(
            OpenIdErrorType::InvalidToken,
            description,
            Some(source.into()),
        )
    }

    pub fn server_error<T>(source: T) -> Self
    where
        T: Into<anyhow::Error>,
    {
        let error = source.into();
        Self::new(OpenIdErrorType::ServerError, error.to_string(), Some(error))
    }

    pub fn error_type(&self) -> OpenIdErrorType {
        self.error_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status_code(&self) -> u16 {
        self.error_type.status_code()
    }
}

impl From<KeyStoreError> for OpenIdError {
    fn from(err: KeyStoreError) -> Self {
        OpenIdError::server_error(err)
    }
}

impl From<SigningError> for OpenIdError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::InvalidClaims(ref description) => {
                OpenIdError::invalid_request_with_source(description.clone(), err)
            }
            SigningError::KeyStore(_) | SigningError::Encoding(_) => OpenIdError::server_error(err),
        }
    }
}

impl From<VerificationError> for OpenIdError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Malformed(_) => {
                OpenIdError::invalid_request_with_source("Malformed token", err)
            }
            VerificationError::UnknownKey(_) => {
                OpenIdError::invalid_token_with_source("Token signed by unknown key", err)
            }
            VerificationError::SignatureInvalid(_) => {
                OpenIdError::invalid_token_with_source("Invalid token signature", err)
            }
            VerificationError::Expired => OpenIdError::invalid_token_with_source("Token expired", err),
            VerificationError::NotYetValid => {
                OpenIdError::invalid_token_with_source("Token not yet valid", err)
            }
        }
    }
}

impl From<anyhow::Error> for OpenIdError {
    fn from(err: anyhow::Error) -> Self {
        OpenIdError::server_error(err)
    }
}

pub fn build_report<E>(err: &E) -> String
where
    E: std::error::Error,
    E: Send + Sync,
{
    let mut count = 0;
    let mut current_err: &dyn Error = err;
    let mut report = format!("[ERROR] - {}", current_err);
    if current_err.source().is_some() {
        report.push_str("\nCaused by:");
    }
    while let Some(cause) = current_err.source() {
        count += 1;
        report.push_str(&format!("\n    {}: {}", count, cause));
        current_err = cause;
    }
    report
}
