use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use idp_types::claims::{Claims, NOT_BEFORE};
use idp_types::jose::jwt::SignedJWT;

use crate::configuration::clock::Clock;
use crate::configuration::ProviderConfiguration;
use crate::keystore::KeyStore;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Malformed token: {}", .0)]
    Malformed(String),
    #[error("No verification key with id {}", .0)]
    UnknownKey(String),
    #[error("Invalid token signature: {}", .0)]
    SignatureInvalid(String),
    #[error("Token has expired")]
    Expired,
    #[error("Token is not valid yet")]
    NotYetValid,
}

pub struct TokenVerifier {
    provider: Arc<ProviderConfiguration>,
    keystore: Arc<KeyStore>,
}

impl TokenVerifier {
    pub fn new(provider: Arc<ProviderConfiguration>, keystore: Arc<KeyStore>) -> Self {
        Self { provider, keystore }
    }

    /// Checks structure, key, signature and time window, in that order, and
    /// returns the verified claims.
    pub fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        self.check(token).map_err(|err| {
            debug!("Rejected token: {}", err);
            err
        })
    }

    fn check(&self, token: &str) -> Result<Claims, VerificationError> {
        let jwt = SignedJWT::decode_no_verify(token)
            .map_err(|err| VerificationError::Malformed(err.to_string()))?;
        let algorithm = jwt
            .alg()
            .map_err(|err| VerificationError::Malformed(err.to_string()))?;
        let kid = jwt
            .kid()
            .ok_or_else(|| VerificationError::Malformed("missing kid".to_owned()))?;
        let claims = Claims::from(jwt.payload().claims_set().clone());
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| VerificationError::Malformed("missing or invalid exp".to_owned()))?;
        let not_before = match claims.get(NOT_BEFORE) {
            None => None,
            Some(_) => Some(claims.not_before().ok_or_else(|| {
                VerificationError::Malformed("invalid nbf".to_owned())
            })?),
        };

        let key = self
            .keystore
            .find_verification_key(kid)
            .ok_or_else(|| VerificationError::UnknownKey(kid.to_owned()))?;

        if key.algorithm() != algorithm {
            return Err(VerificationError::SignatureInvalid(format!(
                "{} token for {} key",
                algorithm,
                key.algorithm()
            )));
        }
        let verifier = key
            .verifier()
            .map_err(|err| VerificationError::SignatureInvalid(err.to_string()))?;
        jwt.verify_with(&*verifier)
            .map_err(|err| VerificationError::SignatureInvalid(err.to_string()))?;

        let now = self.provider.clock().now();
        if now > expires_at {
            return Err(VerificationError::Expired);
        }
        if let Some(not_before) = not_before {
            if now < not_before {
                return Err(VerificationError::NotYetValid);
            }
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::engine::general_purpose::URL_SAFE_NO_PAD as base64_engine;
    use base64::Engine;
    use serde_json::json;
    use time::Duration;

    use idp_types::claims::Claims;
    use idp_types::jose::jws::SigningAlgorithm;

    use crate::keystore::KeyStore;
    use crate::test_utils::{provider, ClockHandle, START};
    use crate::token_signer::TokenSigner;
    use crate::token_verifier::{TokenVerifier, VerificationError};

    struct Fixture {
        signer: TokenSigner,
        verifier: TokenVerifier,
        keystore: Arc<KeyStore>,
        clock: ClockHandle,
    }

    fn fixture(algorithm: SigningAlgorithm) -> Fixture {
        tracing_subscriber::fmt::try_init().ok();
        let (provider, clock) = provider(algorithm);
        let keystore = Arc::new(KeyStore::generate(provider.clone()).unwrap());
        Fixture {
            signer: TokenSigner::new(provider.clone(), keystore.clone()),
            verifier: TokenVerifier::new(provider, keystore.clone()),
            keystore,
            clock,
        }
    }

    fn tamper_signature(token: &str) -> String {
        let (signed, signature) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = signature.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", signed, chars.into_iter().collect::<String>())
    }

    fn encode_segment(value: serde_json::Value) -> String {
        base64_engine.encode(serde_json::to_vec(&value).unwrap())
    }

    fn issue(fixture: &Fixture, ttl: Duration) -> String {
        fixture
            .signer
            .issue(Claims::new().with_subject("u1"), "aud", ttl)
            .unwrap()
            .into_serialized()
    }

    #[test]
    fn test_rs256_round_trip_after_rotation() {
        let fixture = fixture(SigningAlgorithm::Rs256);
        fixture.keystore.rotate(None).unwrap();

        let token = issue(&fixture, Duration::seconds(3600));
        let claims = fixture.verifier.verify(&token).unwrap();

        assert_eq!(Some("u1"), claims.subject());
        assert_eq!(vec!["aud"], claims.audience());
        assert_eq!(
            Some(3600),
            claims
                .expires_at()
                .zip(claims.issued_at())
                .map(|(exp, iat)| (exp - iat).whole_seconds())
        );
        assert!(matches!(
            fixture.verifier.verify(&tamper_signature(&token)),
            Err(VerificationError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_expiry_boundary() {
        let fixture = fixture(SigningAlgorithm::Es256);
        let token = issue(&fixture, Duration::hours(1));

        fixture.clock.set(START + Duration::hours(1));
        assert!(fixture.verifier.verify(&token).is_ok());

        fixture.clock.advance(Duration::seconds(1));
        assert!(matches!(
            fixture.verifier.verify(&token),
            Err(VerificationError::Expired)
        ));
    }

    #[test]
    fn test_forged_expired_token_reports_signature() {
        let fixture = fixture(SigningAlgorithm::Es256);
        let token = issue(&fixture, Duration::hours(1));
        fixture.clock.advance(Duration::hours(2));

        let result = fixture.verifier.verify(&tamper_signature(&token));

        assert!(matches!(result, Err(VerificationError::SignatureInvalid(_))));
    }

    #[test]
    fn test_token_from_previous_key_still_verifies() {
        let fixture = fixture(SigningAlgorithm::Es256);
        let token = issue(&fixture, Duration::hours(1));
        fixture.clock.advance(Duration::minutes(30));

        fixture.keystore.rotate(None).unwrap();

        assert!(fixture.verifier.verify(&token).is_ok());
    }

    #[test]
    fn test_purged_key_is_unknown() {
        let fixture = fixture(SigningAlgorithm::Es256);
        let token = issue(&fixture, Duration::hours(1));
        fixture.keystore.rotate(None).unwrap();
        fixture.clock.advance(Duration::days(31));
        assert_eq!(1, fixture.keystore.purge_expired());

        let result = fixture.verifier.verify(&token);

        assert!(matches!(result, Err(VerificationError::UnknownKey(_))));
    }

    #[test]
    fn test_not_before_is_enforced() {
        let fixture = fixture(SigningAlgorithm::Es256);
        let nbf = (START + Duration::minutes(10)).unix_timestamp();
        let token = fixture
            .signer
            .issue(
                Claims::new().with_subject("u1").with_claim("nbf", nbf),
                "aud",
                Duration::hours(1),
            )
            .unwrap();

        assert!(matches!(
            fixture.verifier.verify(token.serialized()),
            Err(VerificationError::NotYetValid)
        ));
        fixture.clock.advance(Duration::minutes(10));
        assert!(fixture.verifier.verify(token.serialized()).is_ok());
    }

    #[test]
    fn test_structural_problems_are_malformed() {
        let fixture = fixture(SigningAlgorithm::Es256);
        let kid = fixture
            .keystore
            .current_signing_key()
            .unwrap()
            .key_id()
            .to_owned();
        let payload = encode_segment(json!({"sub": "u1", "exp": 4102444800u64}));
        let signature = base64_engine.encode(b"signature");
        let with_header = |header: serde_json::Value| {
            format!("{}.{}.{}", encode_segment(header), payload, signature)
        };

        let cases = [
            "not-a-token".to_owned(),
            "a.b".to_owned(),
            with_header(json!({"alg": "none", "kid": &kid})),
            with_header(json!({"alg": "HS256", "kid": &kid})),
            with_header(json!({"alg": "ES256"})),
            format!(
                "{}.{}.{}",
                encode_segment(json!({"alg": "ES256", "kid": &kid})),
                encode_segment(json!({"sub": "u1"})),
                signature
            ),
        ];

        for case in cases {
            assert!(
                matches!(
                    fixture.verifier.verify(&case),
                    Err(VerificationError::Malformed(_))
                ),
                "{} should be malformed",
                case
            );
        }
    }

    #[test]
    fn test_out_of_range_dates_are_malformed() {
        let fixture = fixture(SigningAlgorithm::Es256);
        let kid = fixture
            .keystore
            .current_signing_key()
            .unwrap()
            .key_id()
            .to_owned();
        let header = encode_segment(json!({"alg": "ES256", "kid": &kid}));
        let signature = base64_engine.encode(b"signature");
        let payloads = [
            json!({"sub": "u1", "exp": 1_000_000_000_000u64}),
            json!({"sub": "u1", "exp": 4102444800u64, "nbf": 1_000_000_000_000u64}),
        ];

        for payload in payloads {
            let token = format!("{}.{}.{}", header, encode_segment(payload), signature);
            assert!(matches!(
                fixture.verifier.verify(&token),
                Err(VerificationError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_unknown_kid() {
        let fixture = fixture(SigningAlgorithm::Es256);
        let token = format!(
            "{}.{}.{}",
            encode_segment(json!({"alg": "ES256", "kid": "missing"})),
            encode_segment(json!({"sub": "u1", "exp": 4102444800u64})),
            base64_engine.encode(b"signature")
        );

        assert!(matches!(
            fixture.verifier.verify(&token),
            Err(VerificationError::UnknownKey(kid)) if kid == "missing"
        ));
    }

    #[test]
    fn test_algorithm_must_match_key() {
        let fixture = fixture(SigningAlgorithm::Es256);
        let token = issue(&fixture, Duration::hours(1));
        let kid = fixture
            .keystore
            .current_signing_key()
            .unwrap()
            .key_id()
            .to_owned();
        let (_, rest) = token.split_once('.').unwrap();
        let swapped = format!(
            "{}.{}",
            encode_segment(json!({"alg": "ES384", "kid": kid, "typ": "JWT"})),
            rest
        );

        let result = fixture.verifier.verify(&swapped);

        assert!(matches!(result, Err(VerificationError::SignatureInvalid(_))));
    }
}
