use derive_builder::Builder;
use getset::Getters;
use thiserror::Error;

use idp_types::discovery::{
    OIDCProviderMetadata, OIDCProviderMetadataBuilder, OIDCProviderMetadataBuilderError,
};
use idp_types::issuer::Issuer;
use idp_types::jose::jws::SigningAlgorithm;

use crate::configuration::clock::ClockProvider;
use crate::configuration::routes::Routes;
use crate::configuration::ttl::TTL;

const DEFAULT_ISSUER: &str = "http://localhost:7000/auth";
const MIN_RSA_KEY_SIZE: u32 = 2048;

#[derive(Builder, Getters)]
#[builder(
    pattern = "owned",
    setter(into),
    default,
    build_fn(validate = "Self::validate")
)]
#[getset(get = "pub")]
pub struct ProviderConfiguration {
    issuer: Issuer,
    routes: Routes,
    signing_algorithm: SigningAlgorithm,
    rsa_key_size: u32,
    ttl: TTL,
    clock: ClockProvider,
    response_types_supported: Vec<String>,
    subject_types_supported: Vec<String>,
    scopes_supported: Vec<String>,
    claims_supported: Vec<String>,
    token_endpoint_auth_methods_supported: Vec<String>,
    grant_types_supported: Vec<String>,
}

impl ProviderConfigurationBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ttl) = &self.ttl {
            if ttl.id_token <= time::Duration::ZERO {
                return Err("id_token ttl must be positive".to_owned());
            }
            if ttl.rotation_interval <= time::Duration::ZERO {
                return Err("rotation interval must be positive".to_owned());
            }
            if ttl.signing_key <= ttl.rotation_interval + ttl.id_token {
                return Err(format!(
                    "signing key lifetime ({}) must exceed rotation interval ({}) plus id_token ttl ({})",
                    ttl.signing_key, ttl.rotation_interval, ttl.id_token
                ));
            }
        }
        // applies to every RSA key, including ones added by a later rotation
        if let Some(bits) = self.rsa_key_size {
            if bits < MIN_RSA_KEY_SIZE {
                return Err(format!(
                    "rsa key size must be at least {} bits",
                    MIN_RSA_KEY_SIZE
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Invalid endpoint url")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("Error building provider metadata")]
    Metadata(#[from] OIDCProviderMetadataBuilderError),
}

impl ProviderConfiguration {
    pub fn discovery_url(&self) -> Result<url::Url, url::ParseError> {
        self.issuer.endpoint(self.routes.discovery)
    }

    /// Assembles the `/.well-known/openid-configuration` document.
    pub fn discovery(&self) -> Result<OIDCProviderMetadata, DiscoveryError> {
        let issuer = &self.issuer;
        let metadata = OIDCProviderMetadataBuilder::default()
            .issuer(issuer.clone())
            .token_endpoint(issuer.endpoint(self.routes.token)?)
            .userinfo_endpoint(issuer.endpoint(self.routes.userinfo)?)
            .jwks_uri(issuer.endpoint(self.routes.jwks)?)
            .response_types_supported(self.response_types_supported.clone())
            .subject_types_supported(self.subject_types_supported.clone())
            .id_token_signing_alg_values_supported(vec![self.signing_algorithm])
            .scopes_supported(self.scopes_supported.clone())
            .token_endpoint_auth_methods_supported(
                self.token_endpoint_auth_methods_supported.clone(),
            )
            .claims_supported(self.claims_supported.clone())
            .grant_types_supported(self.grant_types_supported.clone())
            .build()?;
        Ok(metadata)
    }
}

impl Default for ProviderConfiguration {
    fn default() -> Self {
        ProviderConfiguration {
            issuer: Issuer::new(DEFAULT_ISSUER),
            routes: Routes::default(),
            signing_algorithm: SigningAlgorithm::Rs256,
            rsa_key_size: MIN_RSA_KEY_SIZE,
            ttl: TTL::default(),
            clock: ClockProvider::default(),
            response_types_supported: vec!["id_token".to_owned()],
            subject_types_supported: vec!["public".to_owned()],
            scopes_supported: vec!["openid".to_owned()],
            claims_supported: vec!["sub".to_owned()],
            token_endpoint_auth_methods_supported: Vec::new(),
            grant_types_supported: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use idp_types::jose::jws::SigningAlgorithm;

    use crate::configuration::provider::{ProviderConfiguration, ProviderConfigurationBuilder};
    use crate::configuration::ttl::TTL;

    #[test]
    fn can_modify_default_configuration() {
        let config = ProviderConfigurationBuilder::default()
            .issuer("https://id.example.com")
            .signing_algorithm(SigningAlgorithm::Es256)
            .build()
            .unwrap();

        assert_eq!("https://id.example.com/", config.issuer().as_str());
        assert_eq!(SigningAlgorithm::Es256, *config.signing_algorithm());
        assert_eq!("/v1/token", config.routes().token);
    }

    #[test]
    fn rejects_key_lifetime_shorter_than_token_window() {
        let result = ProviderConfigurationBuilder::default()
            .ttl(TTL {
                id_token: Duration::hours(1),
                signing_key: Duration::days(7),
                rotation_interval: Duration::days(7),
            })
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn rejects_weak_rsa_keys() {
        let result = ProviderConfigurationBuilder::default()
            .rsa_key_size(1024u32)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn rejects_weak_rsa_keys_for_any_algorithm() {
        let result = ProviderConfigurationBuilder::default()
            .signing_algorithm(SigningAlgorithm::Es256)
            .rsa_key_size(1024u32)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn discovery_url_keeps_issuer_path() {
        let config = ProviderConfiguration::default();

        assert_eq!(
            "http://localhost:7000/auth/.well-known/openid-configuration",
            config.discovery_url().unwrap().as_str()
        );
    }

    #[test]
    fn discovery_document_matches_defaults() {
        let config = ProviderConfiguration::default();

        let metadata = config.discovery().unwrap();
        let value = serde_json::to_value(&metadata).unwrap();

        assert_eq!("http://localhost:7000/auth", value["issuer"]);
        assert_eq!("http://localhost:7000/auth/v1/token", value["token_endpoint"]);
        assert_eq!(
            "http://localhost:7000/auth/v1/userinfo",
            value["userinfo_endpoint"]
        );
        assert_eq!(
            "http://localhost:7000/auth/.well-known/jwks.json",
            value["jwks_uri"]
        );
        assert_eq!(serde_json::json!(["id_token"]), value["response_types_supported"]);
        assert_eq!(serde_json::json!(["public"]), value["subject_types_supported"]);
        assert_eq!(
            serde_json::json!(["RS256"]),
            value["id_token_signing_alg_values_supported"]
        );
        assert_eq!(serde_json::json!(["openid"]), value["scopes_supported"]);
        assert_eq!(serde_json::json!(["sub"]), value["claims_supported"]);
        assert_eq!(
            serde_json::json!([]),
            value["token_endpoint_auth_methods_supported"]
        );
        assert_eq!(serde_json::json!([]), value["grant_types_supported"]);
    }
}
