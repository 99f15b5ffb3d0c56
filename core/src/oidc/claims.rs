//! Identity token claims

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim names set by the issuer; caller-supplied claims never override them.
pub const REGISTERED_CLAIMS: &[&str] = &["iss", "sub", "aud", "exp", "iat", "nbf", "jti"];

/// Identity token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer
    pub iss: String,

    /// Subject
    pub sub: String,

    /// Audience (a single audience serializes as a plain string)
    #[serde(
        serialize_with = "serialize_audience",
        deserialize_with = "deserialize_audience"
    )]
    pub aud: Vec<String>,

    /// Expiration time
    pub exp: u64,

    /// Issued at
    pub iat: u64,

    /// Not before (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    /// Additional claims
    #[serde(flatten)]
    pub custom_claims: Map<String, Value>,
}

impl IdTokenClaims {
    /// Build claims for a single audience, merging `custom_claims` minus any
    /// registered claim names.
    pub fn new(
        issuer: &str,
        subject: &str,
        audience: &str,
        iat: u64,
        exp: u64,
        custom_claims: Map<String, Value>,
    ) -> Self {
        let custom_claims = custom_claims
            .into_iter()
            .filter(|(name, _)| {
                let registered = REGISTERED_CLAIMS.contains(&name.as_str());
                if registered {
                    tracing::debug!(claim = %name, "dropping caller claim that shadows a registered claim");
                }
                !registered
            })
            .collect();

        Self {
            iss: issuer.to_string(),
            sub: subject.to_string(),
            aud: vec![audience.to_string()],
            exp,
            iat,
            nbf: None,
            custom_claims,
        }
    }
}

fn serialize_audience<S>(aud: &[String], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match aud {
        [single] => serializer.serialize_str(single),
        many => many.serialize(serializer),
    }
}

/// Deserialize audience as either string or array
fn deserialize_audience<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct AudienceVisitor;

    impl<'de> Visitor<'de> for AudienceVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("string or array of strings")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Vec<String>, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Vec<String>, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut values = Vec::new();
            while let Some(value) = seq.next_element()? {
                values.push(value);
            }
            Ok(values)
        }
    }

    deserializer.deserialize_any(AudienceVisitor)
}
