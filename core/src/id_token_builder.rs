use josekit::jws::JwsHeader;
use josekit::jwt::JwtPayload;
use josekit::{JoseError, Value};
use serde_json::Map;
use thiserror::Error;
use time::OffsetDateTime;

use idp_types::claims::{numeric_date, AUDIENCE, EXPIRES_AT, ISSUED_AT, ISSUER, JWT_ID, NONCE, SUBJECT};
use idp_types::jose::error::JWTError;
use idp_types::jose::jwt::SignedJWT;
use idp_types::jose::JwsHeaderExt;
use idp_types::nonce::Nonce;
use idp_types::subject::Subject;

use crate::id_token::IdentityToken;
use crate::key_material::KeyMaterial;

#[derive(Error, Debug)]
pub enum IdTokenError {
    #[error("Error encoding id_token")]
    EncodingErr {
        #[from]
        source: JWTError,
    },
    #[error("Required id_token claim {} not found", .0)]
    MissingRequiredClaim(String),
    #[error("Invalid claim value")]
    InvalidClaim(#[source] JoseError),
}

const REGISTERED: &[&str] = &[ISSUER, SUBJECT, AUDIENCE, ISSUED_AT, EXPIRES_AT, JWT_ID, NONCE];

#[derive(Debug)]
pub(crate) struct IdTokenBuilder<'a> {
    signing_key: &'a KeyMaterial,
    issuer: Option<String>,
    sub: Option<Subject>,
    audience: Option<String>,
    issued_at: Option<OffsetDateTime>,
    expires_at: Option<OffsetDateTime>,
    jwt_id: Option<String>,
    nonce: Option<Nonce>,
    custom_claims: Map<String, Value>,
}

impl<'a> IdTokenBuilder<'a> {
    pub fn new(signing_key: &'a KeyMaterial) -> Self {
        IdTokenBuilder {
            signing_key,
            issuer: None,
            sub: None,
            audience: None,
            issued_at: None,
            expires_at: None,
            jwt_id: None,
            nonce: None,
            custom_claims: Map::new(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_sub(mut self, sub: Subject) -> Self {
        self.sub = Some(sub);
        self
    }

    pub fn with_audience(mut self, aud: impl Into<String>) -> Self {
        self.audience = Some(aud.into());
        self
    }

    pub fn with_iat(mut self, iat: OffsetDateTime) -> Self {
        self.issued_at = Some(iat);
        self
    }

    pub fn with_exp(mut self, exp: OffsetDateTime) -> Self {
        self.expires_at = Some(exp);
        self
    }

    pub fn with_jti(mut self, jti: impl Into<String>) -> Self {
        self.jwt_id = Some(jti.into());
        self
    }

    pub fn with_nonce(mut self, nonce: Option<Nonce>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Registered claims in `claims` are ignored; they only come from the
    /// dedicated setters.
    pub fn with_custom_claims(mut self, claims: Map<String, Value>) -> Self {
        self.custom_claims.extend(
            claims
                .into_iter()
                .filter(|(name, _)| !REGISTERED.contains(&name.as_str())),
        );
        self
    }

    pub fn build(mut self) -> Result<IdentityToken, IdTokenError> {
        let header = JwsHeader::from_key(self.signing_key.signing_jwk())?;
        let mut payload = JwtPayload::from_map(std::mem::take(&mut self.custom_claims))
            .map_err(IdTokenError::InvalidClaim)?;
        payload.set_issuer(self.issuer.required(ISSUER)?);
        payload.set_subject(self.sub.required(SUBJECT)?.into_inner());
        payload.set_audience(vec![self.audience.required(AUDIENCE)?]);
        payload.set_issued_at(&numeric_date(self.issued_at.required(ISSUED_AT)?));
        payload.set_expires_at(&numeric_date(self.expires_at.required(EXPIRES_AT)?));
        payload.set_jwt_id(self.jwt_id.required(JWT_ID)?);
        if let Some(nonce) = self.nonce.take() {
            payload
                .set_claim(NONCE, Some(Value::String(nonce.into())))
                .map_err(IdTokenError::InvalidClaim)?;
        }

        let jwt = SignedJWT::new(header, payload, self.signing_key.signing_jwk())?;
        Ok(IdentityToken::new(jwt))
    }
}

trait OptionRequiredExt<T> {
    fn required(&mut self, param: &str) -> Result<T, IdTokenError>;
}

impl<T> OptionRequiredExt<T> for Option<T> {
    fn required(&mut self, param: &str) -> Result<T, IdTokenError> {
        if let Some(value) = self.take() {
            Ok(value)
        } else {
            Err(IdTokenError::MissingRequiredClaim(param.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};
    use time::macros::datetime;
    use time::Duration;

    use idp_types::jose::jws::SigningAlgorithm;
    use idp_types::nonce::Nonce;
    use idp_types::subject::Subject;

    use crate::id_token_builder::{IdTokenBuilder, IdTokenError};
    use crate::key_material::KeyMaterial;

    fn key() -> KeyMaterial {
        KeyMaterial::generate(
            SigningAlgorithm::Es256,
            datetime!(2024-01-01 00:00 UTC),
            Duration::days(30),
            2048,
        )
        .unwrap()
    }

    #[test]
    fn test_builds_signed_token_with_header_from_key() {
        let key = key();
        let mut custom = Map::new();
        custom.insert("email".to_owned(), json!("u1@example.com"));
        custom.insert("sub".to_owned(), json!("ignored"));

        let token = IdTokenBuilder::new(&key)
            .with_issuer("https://id.example.com")
            .with_sub(Subject::new("u1"))
            .with_audience("client")
            .with_iat(datetime!(2024-01-01 00:00:00.750 UTC))
            .with_exp(datetime!(2024-01-01 01:00:00.750 UTC))
            .with_jti("jti-1")
            .with_nonce(Some(Nonce::new("n-0S6")))
            .with_custom_claims(custom)
            .build()
            .unwrap();

        let claims = token.claims();
        assert_eq!(Some(key.key_id()), token.key_id());
        assert_eq!(SigningAlgorithm::Es256, token.algorithm().unwrap());
        assert_eq!(Some("u1"), claims.subject());
        assert_eq!(vec!["client"], claims.audience());
        assert_eq!(Some("n-0S6"), claims.nonce());
        assert_eq!(json!(1704067200), claims.get("iat").cloned().unwrap());
        assert_eq!(json!("u1@example.com"), claims.get("email").cloned().unwrap());
    }

    #[test]
    fn test_missing_subject_fails() {
        let key = key();

        let result = IdTokenBuilder::new(&key)
            .with_issuer("https://id.example.com")
            .with_audience("client")
            .with_iat(datetime!(2024-01-01 00:00 UTC))
            .with_exp(datetime!(2024-01-01 01:00 UTC))
            .with_jti("jti-1")
            .build();

        assert!(matches!(result, Err(IdTokenError::MissingRequiredClaim(claim)) if claim == "sub"));
    }
}
