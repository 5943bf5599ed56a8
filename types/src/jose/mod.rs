use josekit::jwk::Jwk;
use josekit::jws::JwsHeader;

use crate::jose::error::JWTError;

pub mod error;
pub mod jwk_ext;
pub mod jwk_set;
pub mod jws;
pub mod jwt;

pub trait JwsHeaderExt: Sized {
    fn from_key(key: &Jwk) -> Result<Self, JWTError>;
}

impl JwsHeaderExt for JwsHeader {
    fn from_key(key: &Jwk) -> Result<Self, JWTError> {
        let alg = key.algorithm().ok_or(JWTError::JWKAlgorithmNotFound)?;
        let kid = key.key_id().ok_or(JWTError::MissingKeyId)?;
        let mut header = JwsHeader::new();
        header.set_token_type("JWT");
        header.set_algorithm(alg);
        header.set_key_id(kid);
        Ok(header)
    }
}
