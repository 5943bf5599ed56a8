use std::convert::TryInto;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize, Serializer};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issuer(Url);

impl Issuer {
    pub fn new<I: TryInto<Url, Error = E>, E: Debug>(identifier: I) -> Self {
        match identifier.try_into() {
            Ok(i) => Issuer(i),
            Err(error) => panic!("Configured issuer should be a valid URL. Err: {:?}", error),
        }
    }

    pub fn inner_ref(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Appends `path` to the issuer, keeping any path the issuer already has.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.0.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}", base, path.trim_start_matches('/')))
    }
}

impl Serialize for Issuer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct("Issuer", &self.0)
    }
}

impl Display for Issuer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Issuer {
    fn from(identifier: &str) -> Self {
        Issuer::new(identifier)
    }
}

impl From<Issuer> for String {
    fn from(iss: Issuer) -> Self {
        iss.0.into()
    }
}

impl From<&Issuer> for String {
    fn from(iss: &Issuer) -> Self {
        iss.0.to_string()
    }
}
