use std::fmt::Formatter;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD as base64_engine;
use base64::Engine;
use josekit::jwk::Jwk;
use josekit::jws::{JwsHeader, JwsVerifier};
use josekit::jwt;
use josekit::jwt::JwtPayload;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::jose::error::JWTError;
use crate::jose::jwk_ext::JwkExt;
use crate::jose::jws::SigningAlgorithm;

#[derive(Debug, Clone)]
pub struct SignedJWT {
    header: JwsHeader,
    payload: JwtPayload,
    serialized_repr: String,
}

impl SignedJWT {
    pub fn new(header: JwsHeader, payload: JwtPayload, key: &Jwk) -> Result<Self, JWTError> {
        let signer = key.get_signer()?;
        let result = jwt::encode_with_signer(&payload, &header, &*signer)
            .map_err(JWTError::JoseCreationError)?;
        Ok(SignedJWT {
            header,
            payload,
            serialized_repr: result,
        })
    }

    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    pub fn payload(&self) -> &JwtPayload {
        &self.payload
    }

    pub fn serialized(&self) -> &str {
        &self.serialized_repr
    }

    pub fn serialized_owned(self) -> String {
        self.serialized_repr
    }

    pub fn alg(&self) -> Result<SigningAlgorithm, JWTError> {
        let alg = self
            .header
            .algorithm()
            .ok_or(JWTError::JWKAlgorithmNotFound)?;
        Ok(SigningAlgorithm::from_str(alg)?)
    }

    pub fn kid(&self) -> Option<&str> {
        self.header.key_id()
    }

    pub fn verify(&self, key: &Jwk) -> Result<(), JWTError> {
        let verifier = key.get_verifier()?;
        self.verify_with(&*verifier)
    }

    pub fn verify_with(&self, verifier: &dyn JwsVerifier) -> Result<(), JWTError> {
        let (header_and_payload, signature) = self
            .serialized_repr
            .rsplit_once('.')
            .ok_or_else(|| JWTError::InvalidJwtFormat("missing signature".to_owned()))?;
        let decoded_signature = base64_engine.decode(signature)?;
        verifier
            .verify(header_and_payload.as_bytes(), &decoded_signature)
            .map_err(JWTError::InvalidSignature)
    }

    pub fn decode_no_verify(input: impl AsRef<str>) -> Result<Self, JWTError> {
        let str_jwt = input.as_ref();
        let parts: Vec<&str> = str_jwt.split('.').collect();

        if parts.len() != 3 {
            return Err(JWTError::InvalidJwtFormat(format!(
                "expected 3 segments, found {}",
                parts.len()
            )));
        }

        let header = Self::decode_header(parts[0])?;

        let payload_b64 = base64_engine.decode(parts[1])?;
        let payload: Map<String, Value> = serde_json::from_slice(&payload_b64)?;
        let payload = JwtPayload::from_map(payload).map_err(JWTError::PayloadParseError)?;

        // the signature segment is only decoded during verification
        base64_engine.decode(parts[2])?;

        Ok(SignedJWT {
            header,
            payload,
            serialized_repr: str_jwt.to_owned(),
        })
    }

    pub fn decode_header(header_part: impl AsRef<[u8]>) -> Result<JwsHeader, JWTError> {
        let header_b64 = base64_engine.decode(header_part)?;
        let header: Map<String, Value> = serde_json::from_slice(&header_b64)?;
        JwsHeader::from_map(header).map_err(JWTError::HeaderParseError)
    }
}

impl Serialize for SignedJWT {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.serialized())
    }
}

impl<'de> Deserialize<'de> for SignedJWT {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct JWSVisitor;
        impl<'de> Visitor<'de> for JWSVisitor {
            type Value = SignedJWT;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                formatter.write_str("an signed jws string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                SignedJWT::decode_no_verify(v).map_err(E::custom)
            }
        }
        deserializer.deserialize_str(JWSVisitor)
    }
}
