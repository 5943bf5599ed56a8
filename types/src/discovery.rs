use derive_builder::Builder;
use serde::Serialize;
use serde_with::skip_serializing_none;
use url::Url;

use crate::issuer::Issuer;
use crate::jose::jws::SigningAlgorithm;

#[skip_serializing_none]
#[derive(Debug, Serialize, Builder)]
#[builder(setter(into))]
pub struct OIDCProviderMetadata {
    issuer: Issuer,
    token_endpoint: Url,
    userinfo_endpoint: Url,
    jwks_uri: Url,
    response_types_supported: Vec<String>,
    subject_types_supported: Vec<String>,
    id_token_signing_alg_values_supported: Vec<SigningAlgorithm>,
    scopes_supported: Vec<String>,
    token_endpoint_auth_methods_supported: Vec<String>,
    claims_supported: Vec<String>,
    grant_types_supported: Vec<String>,
    #[builder(default, setter(strip_option))]
    service_documentation: Option<Url>,
}

impl OIDCProviderMetadata {
    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }
}
