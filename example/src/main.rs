use std::sync::Arc;

use serde_json::json;
use tracing::info;

use idp_core::error::{build_report, OpenIdError};
use idp_core::keystore::KeyStore;
use idp_core::services::rotation::KeyRotationService;
use idp_core::token_signer::TokenSigner;
use idp_core::token_verifier::TokenVerifier;
use idp_types::claims::Claims;

mod settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let provider = Arc::new(settings::from_env()?);
    let keystore = Arc::new(KeyStore::generate(provider.clone())?);
    let rotation = KeyRotationService::new(provider.clone(), keystore.clone()).spawn();

    info!("Discovery document served at {}", provider.discovery_url()?);
    println!("{}", serde_json::to_string_pretty(&provider.discovery()?)?);
    println!("{}", serde_json::to_string_pretty(&keystore.jwks())?);

    let signer = TokenSigner::new(provider.clone(), keystore.clone());
    let verifier = TokenVerifier::new(provider.clone(), keystore.clone());

    let claims = Claims::new()
        .with_subject("1d8fca3b-a2f1-48c2-924d-843e5173a951")
        .with_claim("name", "Xose Vinicius Almanara");
    let token = signer.issue(claims, "example-client", provider.ttl().id_token)?;
    info!("Issued id_token with key {:?}", token.key_id());
    println!("{}", token.serialized());

    let verified = verifier.verify(token.serialized())?;
    println!("{}", serde_json::to_string_pretty(&verified)?);

    if let Err(err) = verifier.verify(&format!("{}x", token.serialized())) {
        let err = OpenIdError::from(err);
        info!("Rejected tampered token with status {}", err.status_code());
        println!("{}", json!(err));
        println!("{}", build_report(&err));
    }

    rotation.shutdown().await;
    Ok(())
}
