use std::fmt::Debug;
use std::str::Utf8Error;

use base64::DecodeError;
use josekit::JoseError;
use thiserror::Error;

use crate::jose::jws::ParseAlgError;

#[derive(Debug, Error)]
pub enum JWTError {
    #[error("Error decoding b64 jwt part")]
    B64DecodeError(#[from] DecodeError),
    #[error("JWT has an invalid format: {}", .0)]
    InvalidJwtFormat(String),
    #[error("Unable to parse jwt to json")]
    SerDeParseError(#[from] serde_json::Error),
    #[error("Unable to parse jwt header from json")]
    HeaderParseError(#[source] JoseError),
    #[error("Unable to parse jwt payload from json")]
    PayloadParseError(#[source] JoseError),
    #[error("Error creating JWT")]
    JoseCreationError(#[source] JoseError),
    #[error("Missing algorithm in JWT")]
    JWKAlgorithmNotFound,
    #[error("Missing key id in JWT")]
    MissingKeyId,
    #[error("Error parsing JWK to signer")]
    SignerCreationError(#[source] JoseError),
    #[error("Error parsing JWK to verifier")]
    VerifierCreationError(#[source] JoseError),
    #[error("Invalid JWS Signature")]
    InvalidSignature(#[source] JoseError),
    #[error("Invalid JWS algorithm")]
    ParseAlg(#[from] ParseAlgError),
    #[error("Invalid encoding of payload")]
    NoUTF8(#[from] Utf8Error),
    #[error("Invalid JWK")]
    InvalidJwk(#[source] JoseError),
    #[error("JWK is missing required parameter '{}'", .0)]
    MissingJwkParameter(&'static str),
}
