use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type StringMap = BTreeMap<String, String>;

/// A stored request, addressed by its logical path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestRecord {
    pub name: String,
    pub description: String,
    pub method: String,
    pub url: String,
    pub headers: StringMap,
    pub cookies: StringMap,
    pub body: String,
    #[serde(rename = "activeBody", skip_serializing_if = "String::is_empty")]
    pub active_body: String,
    pub params: BTreeMap<String, Value>,
    pub timeout: u64,
}

impl Default for RequestRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            method: "GET".to_string(),
            url: String::new(),
            headers: StringMap::new(),
            cookies: StringMap::new(),
            body: String::new(),
            active_body: String::new(),
            params: BTreeMap::new(),
            timeout: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentRecord {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub headers: StringMap,
    pub cookies: StringMap,
    pub auth: AuthConfig,
    pub variables: StringMap,
}

/// Authentication applied to every request resolved against an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAuth", into = "RawAuth")]
pub enum AuthConfig {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
    ApiKey {
        key: String,
        header: String,
    },
}

impl AuthConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::ApiKey { .. } => "api-key",
        }
    }
}

/// On-disk shape of the `auth` object: a `type` tag plus loose fields.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawAuth {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<String>,
}

impl TryFrom<RawAuth> for AuthConfig {
    type Error = String;

    /// Missing fields of a known type read as empty strings.
    fn try_from(raw: RawAuth) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "" | "none" => Ok(AuthConfig::None),
            "bearer" => Ok(AuthConfig::Bearer {
                token: raw.token.unwrap_or_default(),
            }),
            "basic" => Ok(AuthConfig::Basic {
                username: raw.username.unwrap_or_default(),
                password: raw.password.unwrap_or_default(),
            }),
            "api-key" => Ok(AuthConfig::ApiKey {
                key: raw.key.unwrap_or_default(),
                header: raw.header.unwrap_or_default(),
            }),
            other => Err(format!(
                "unknown auth type '{other}' (expected none, bearer, basic or api-key)"
            )),
        }
    }
}

impl From<AuthConfig> for RawAuth {
    fn from(auth: AuthConfig) -> Self {
        let kind = auth.kind().to_string();
        match auth {
            AuthConfig::None => RawAuth {
                kind,
                ..RawAuth::default()
            },
            AuthConfig::Bearer { token } => RawAuth {
                kind,
                token: Some(token),
                ..RawAuth::default()
            },
            AuthConfig::Basic { username, password } => RawAuth {
                kind,
                username: Some(username),
                password: Some(password),
                ..RawAuth::default()
            },
            AuthConfig::ApiKey { key, header } => RawAuth {
                kind,
                key: Some(key),
                header: Some(header),
                ..RawAuth::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_record_tolerates_missing_fields() {
        let record: RequestRecord =
            serde_json::from_str(r#"{"method":"POST","url":"/items"}"#).unwrap();
        assert_eq!(record.method, "POST");
        assert_eq!(record.url, "/items");
        assert!(record.active_body.is_empty());
        assert_eq!(record.timeout, 0);
    }

    #[test]
    fn active_body_is_omitted_when_empty() {
        let record = RequestRecord::default();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("activeBody"));

        let record = RequestRecord {
            active_body: "admin".to_string(),
            ..RequestRecord::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""activeBody":"admin""#));
    }

    #[test]
    fn empty_auth_object_means_none() {
        let env: EnvironmentRecord =
            serde_json::from_str(r#"{"baseURL":"http://x","auth":{}}"#).unwrap();
        assert_eq!(env.auth, AuthConfig::None);
    }

    #[test]
    fn auth_variants_parse_from_tagged_objects() {
        let bearer: AuthConfig = serde_json::from_str(r#"{"type":"bearer","token":"t"}"#).unwrap();
        assert_eq!(
            bearer,
            AuthConfig::Bearer {
                token: "t".to_string()
            }
        );

        let api_key: AuthConfig =
            serde_json::from_str(r#"{"type":"api-key","key":"k","header":"X-Key"}"#).unwrap();
        assert_eq!(
            api_key,
            AuthConfig::ApiKey {
                key: "k".to_string(),
                header: "X-Key".to_string()
            }
        );
    }

    #[test]
    fn unknown_auth_type_fails_loudly() {
        let err = serde_json::from_str::<AuthConfig>(r#"{"type":"oauth2"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown auth type 'oauth2'"));
    }

    #[test]
    fn known_auth_type_with_missing_fields_parses_as_empty() {
        let bearer: AuthConfig = serde_json::from_str(r#"{"type":"bearer"}"#).unwrap();
        assert_eq!(
            bearer,
            AuthConfig::Bearer {
                token: String::new()
            }
        );

        let env: EnvironmentRecord = serde_json::from_str(
            r#"{"baseURL":"http://x","auth":{"type":"api-key","key":"k"}}"#,
        )
        .unwrap();
        assert_eq!(
            env.auth,
            AuthConfig::ApiKey {
                key: "k".to_string(),
                header: String::new()
            }
        );
    }

    #[test]
    fn auth_serializes_back_to_tagged_shape() {
        let auth = AuthConfig::Basic {
            username: "u".to_string(),
            password: "p".to_string(),
        };
        let value = serde_json::to_value(&auth).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "basic", "username": "u", "password": "p"})
        );
    }
}
