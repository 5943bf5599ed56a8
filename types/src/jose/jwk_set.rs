use std::collections::HashMap;
use std::fmt::Formatter;

use josekit::jwk::Jwk;
use josekit::JoseError;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Clone, PartialEq, Debug)]
pub struct JwkHolder(Jwk);

impl JwkHolder {
    pub fn inner(&self) -> &Jwk {
        &self.0
    }
}

impl From<Jwk> for JwkHolder {
    fn from(jwk: Jwk) -> Self {
        JwkHolder(jwk)
    }
}

#[derive(Serialize, Clone, PartialEq, Debug, Default)]
pub struct JwkSet {
    keys: Vec<JwkHolder>,
    #[serde(skip_serializing)]
    key_map: HashMap<String, usize>,
}

impl JwkSet {
    pub fn new(keys: Vec<Jwk>) -> Self {
        let keys: Vec<JwkHolder> = keys.into_iter().map(JwkHolder).collect();
        let mut key_map = HashMap::with_capacity(keys.len());
        for (idx, key) in keys.iter().enumerate() {
            if let Some(id) = key.0.key_id() {
                key_map.insert(id.to_owned(), idx);
            }
        }
        JwkSet { keys, key_map }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Jwk> {
        self.keys.iter().map(JwkHolder::inner)
    }

    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.key_map.get(kid).map(|idx| &self.keys[*idx].0)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Serialize for JwkHolder {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let key_map: &Map<String, Value> = self.0.as_ref();
        let mut map = serializer.serialize_map(Some(key_map.len()))?;
        for (k, v) in key_map {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for JwkHolder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map_err_fn = |err: JoseError| de::Error::custom(format!("{:?}", err));
        Map::deserialize(deserializer)
            .and_then(|map| Jwk::from_map(map).map_err(map_err_fn))
            .map(JwkHolder)
    }
}

impl<'de> Deserialize<'de> for JwkSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(field_identifier, rename_all = "snake_case")]
        enum Field {
            Keys,
        }

        struct JwkSetVisitor;

        impl<'de> Visitor<'de> for JwkSetVisitor {
            type Value = JwkSet;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                formatter.write_str("an jwkSet object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut keys: Option<Vec<JwkHolder>> = None;
                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Keys => {
                            if keys.is_some() {
                                return Err(de::Error::duplicate_field("keys"));
                            }
                            keys = Some(map.next_value()?);
                        }
                    }
                }
                let keys = keys.ok_or_else(|| de::Error::missing_field("keys"))?;
                Ok(JwkSet::new(keys.into_iter().map(|it| it.0).collect()))
            }
        }
        const FIELDS: &[&str] = &["keys"];
        deserializer.deserialize_struct("JwkSet", FIELDS, JwkSetVisitor)
    }
}
