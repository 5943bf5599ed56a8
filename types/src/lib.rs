pub mod claims;
pub mod discovery;
pub mod issuer;
pub mod jose;
pub mod nonce;
pub mod subject;
