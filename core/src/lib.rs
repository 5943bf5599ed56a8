pub mod configuration;
pub mod error;
pub mod id_token;
pub mod id_token_builder;
pub mod key_material;
pub mod keystore;
pub mod services;
pub mod token_signer;
pub mod token_verifier;

#[cfg(test)]
pub(crate) mod test_utils;
