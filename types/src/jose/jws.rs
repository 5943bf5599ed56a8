use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use josekit::jws;
use josekit::jws::{JwsSigner, JwsVerifier};
use josekit::jwk::Jwk;
use josekit::JoseError;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Asymmetric JWS algorithms accepted for identity token signing.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum SigningAlgorithm {
    Rs256,
    Rs384,
    Rs512,
    Ps256,
    Ps384,
    Ps512,
    Es256,
    Es384,
    Es512,
    EdDsa,
}

/// Family of the key a [`SigningAlgorithm`] operates on, named after the JWK `kty`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyType {
    Rsa,
    Ec,
    Okp,
}

impl KeyType {
    pub fn name(&self) -> &'static str {
        match self {
            KeyType::Rsa => "RSA",
            KeyType::Ec => "EC",
            KeyType::Okp => "OKP",
        }
    }
}

impl SigningAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            SigningAlgorithm::Rs256 => "RS256",
            SigningAlgorithm::Rs384 => "RS384",
            SigningAlgorithm::Rs512 => "RS512",
            SigningAlgorithm::Ps256 => "PS256",
            SigningAlgorithm::Ps384 => "PS384",
            SigningAlgorithm::Ps512 => "PS512",
            SigningAlgorithm::Es256 => "ES256",
            SigningAlgorithm::Es384 => "ES384",
            SigningAlgorithm::Es512 => "ES512",
            SigningAlgorithm::EdDsa => "EdDSA",
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            SigningAlgorithm::Rs256
            | SigningAlgorithm::Rs384
            | SigningAlgorithm::Rs512
            | SigningAlgorithm::Ps256
            | SigningAlgorithm::Ps384
            | SigningAlgorithm::Ps512 => KeyType::Rsa,
            SigningAlgorithm::Es256 | SigningAlgorithm::Es384 | SigningAlgorithm::Es512 => {
                KeyType::Ec
            }
            SigningAlgorithm::EdDsa => KeyType::Okp,
        }
    }

    pub fn signer(&self, key: &Jwk) -> Result<Box<dyn JwsSigner>, JoseError> {
        let signer: Box<dyn JwsSigner> = match self {
            SigningAlgorithm::Rs256 => Box::new(jws::RS256.signer_from_jwk(key)?),
            SigningAlgorithm::Rs384 => Box::new(jws::RS384.signer_from_jwk(key)?),
            SigningAlgorithm::Rs512 => Box::new(jws::RS512.signer_from_jwk(key)?),
            SigningAlgorithm::Ps256 => Box::new(jws::PS256.signer_from_jwk(key)?),
            SigningAlgorithm::Ps384 => Box::new(jws::PS384.signer_from_jwk(key)?),
            SigningAlgorithm::Ps512 => Box::new(jws::PS512.signer_from_jwk(key)?),
            SigningAlgorithm::Es256 => Box::new(jws::ES256.signer_from_jwk(key)?),
            SigningAlgorithm::Es384 => Box::new(jws::ES384.signer_from_jwk(key)?),
            SigningAlgorithm::Es512 => Box::new(jws::ES512.signer_from_jwk(key)?),
            SigningAlgorithm::EdDsa => Box::new(jws::EdDSA.signer_from_jwk(key)?),
        };
        Ok(signer)
    }

    pub fn verifier(&self, key: &Jwk) -> Result<Box<dyn JwsVerifier>, JoseError> {
        let verifier: Box<dyn JwsVerifier> = match self {
            SigningAlgorithm::Rs256 => Box::new(jws::RS256.verifier_from_jwk(key)?),
            SigningAlgorithm::Rs384 => Box::new(jws::RS384.verifier_from_jwk(key)?),
            SigningAlgorithm::Rs512 => Box::new(jws::RS512.verifier_from_jwk(key)?),
            SigningAlgorithm::Ps256 => Box::new(jws::PS256.verifier_from_jwk(key)?),
            SigningAlgorithm::Ps384 => Box::new(jws::PS384.verifier_from_jwk(key)?),
            SigningAlgorithm::Ps512 => Box::new(jws::PS512.verifier_from_jwk(key)?),
            SigningAlgorithm::Es256 => Box::new(jws::ES256.verifier_from_jwk(key)?),
            SigningAlgorithm::Es384 => Box::new(jws::ES384.verifier_from_jwk(key)?),
            SigningAlgorithm::Es512 => Box::new(jws::ES512.verifier_from_jwk(key)?),
            SigningAlgorithm::EdDsa => Box::new(jws::EdDSA.verifier_from_jwk(key)?),
        };
        Ok(verifier)
    }
}

impl Display for SigningAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SigningAlgorithm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SigningAlgorithm {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AlgVisitor;

        impl<'de> Visitor<'de> for AlgVisitor {
            type Value = SigningAlgorithm;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("a supported asymmetric jws algorithm.")
            }

            fn visit_str<E>(self, alg: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                SigningAlgorithm::from_str(alg).map_err(|err| Error::custom(err.to_string()))
            }
        }
        deserializer.deserialize_str(AlgVisitor)
    }
}

#[derive(Debug, Error)]
#[error("Unsupported algorithm {}", .0)]
pub struct ParseAlgError(String);

impl FromStr for SigningAlgorithm {
    type Err = ParseAlgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(SigningAlgorithm::Rs256),
            "RS384" => Ok(SigningAlgorithm::Rs384),
            "RS512" => Ok(SigningAlgorithm::Rs512),
            "PS256" => Ok(SigningAlgorithm::Ps256),
            "PS384" => Ok(SigningAlgorithm::Ps384),
            "PS512" => Ok(SigningAlgorithm::Ps512),
            "ES256" => Ok(SigningAlgorithm::Es256),
            "ES384" => Ok(SigningAlgorithm::Es384),
            "ES512" => Ok(SigningAlgorithm::Es512),
            "EdDSA" => Ok(SigningAlgorithm::EdDsa),
            _ => Err(ParseAlgError(s.to_owned())),
        }
    }
}
