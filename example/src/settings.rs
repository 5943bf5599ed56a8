use std::env;
use std::str::FromStr;

use anyhow::Context;
use url::Url;

use idp_core::configuration::{ProviderConfiguration, ProviderConfigurationBuilder};
use idp_types::issuer::Issuer;
use idp_types::jose::jws::SigningAlgorithm;

const ISSUER_VAR: &str = "IDP_ISSUER";
const SIGNING_ALG_VAR: &str = "IDP_SIGNING_ALG";

/// Reads the provider configuration from the environment, loading `.env`
/// first when one exists.
pub fn from_env() -> anyhow::Result<ProviderConfiguration> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }
    let mut builder = ProviderConfigurationBuilder::default();
    if let Ok(issuer) = env::var(ISSUER_VAR) {
        let issuer = Url::parse(&issuer)
            .with_context(|| format!("{} must be an absolute url", ISSUER_VAR))?;
        builder = builder.issuer(Issuer::new(issuer));
    }
    if let Ok(alg) = env::var(SIGNING_ALG_VAR) {
        let alg = SigningAlgorithm::from_str(&alg)
            .with_context(|| format!("{} has an unsupported value", SIGNING_ALG_VAR))?;
        builder = builder.signing_algorithm(alg);
    }
    builder.build().context("Invalid provider configuration")
}
