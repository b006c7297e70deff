use std::fmt;

use http::Method;
use serde::Deserialize;

use crate::token_reader::{read_auth_token, TokenParser};
use crate::{AuthToken, Result, TokenReaderResult};

/// Where and how a handshake request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(default = "default_method", deserialize_with = "method_serde::deserialize")]
    pub method: Method,
    /// OAuth parameters travel in the `Authorization` header when set,
    /// inline in the query or body otherwise.
    #[serde(default = "default_protected")]
    pub protected: bool,
}

fn default_method() -> Method {
    Method::GET
}

fn default_protected() -> bool {
    true
}

impl Endpoint {
    pub fn new<T>(url: T) -> Self
    where
        T: Into<String>,
    {
        Endpoint {
            url: url.into(),
            method: Method::GET,
            protected: true,
        }
    }

    pub fn method(self, method: Method) -> Self {
        Endpoint { method, ..self }
    }

    pub fn protected(self, protected: bool) -> Self {
        Endpoint { protected, ..self }
    }
}

/// Provider-specific knowledge consumed by the signer and the handshake.
pub trait Provider {
    /// Identifies the provider in the correlation table.
    fn service_id(&self) -> &str;

    fn consumer_key(&self) -> &str;

    fn consumer_secret(&self) -> &str;

    fn realm(&self) -> &str {
        ""
    }

    fn callback_url(&self) -> &str {
        ""
    }

    fn request_token_endpoint(&self) -> &Endpoint;

    fn access_token_endpoint(&self) -> &Endpoint;

    fn authorization_url(&self) -> &str;

    fn authorized_resource_protected(&self) -> bool {
        true
    }

    /// Whether `realm` takes part in the signature base string.
    fn sign_realm(&self) -> bool {
        false
    }

    /// Whether a callback without `oauth_verifier` is rejected.
    fn require_verifier(&self) -> bool {
        false
    }

    fn parse_request_token(&self, body: &str) -> TokenReaderResult<AuthToken> {
        read_auth_token(body)
    }

    fn parse_access_token(&self, body: &str) -> TokenReaderResult<AuthToken> {
        read_auth_token(body)
    }
}

/// Stock [`Provider`] built from plain configuration.
///
/// ```toml
/// service_id = "photos"
/// consumer_key = "dpf43f3p2l4k3l03"
/// consumer_secret = "kd94hf93k423kf44"
/// callback_url = "http://printer.example.com/ready"
/// authorization_url = "https://photos.example.net/authorize"
///
/// [request_token]
/// url = "https://photos.example.net/initiate"
/// method = "POST"
///
/// [access_token]
/// url = "https://photos.example.net/token"
/// method = "POST"
/// ```
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub service_id: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    #[serde(default)]
    pub realm: String,
    #[serde(default)]
    pub callback_url: String,
    pub request_token: Endpoint,
    pub access_token: Endpoint,
    pub authorization_url: String,
    #[serde(default = "default_protected")]
    pub authorized_resource_protected: bool,
    #[serde(default)]
    pub sign_realm: bool,
    #[serde(default)]
    pub require_verifier: bool,
    #[serde(skip, default = "default_parser")]
    pub request_token_parser: TokenParser,
    #[serde(skip, default = "default_parser")]
    pub access_token_parser: TokenParser,
}

fn default_parser() -> TokenParser {
    read_auth_token
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("service_id", &self.service_id)
            .field("consumer_key", &self.consumer_key)
            .field("realm", &self.realm)
            .field("callback_url", &self.callback_url)
            .field("request_token", &self.request_token)
            .field("access_token", &self.access_token)
            .field("authorization_url", &self.authorization_url)
            .field(
                "authorized_resource_protected",
                &self.authorized_resource_protected,
            )
            .field("sign_realm", &self.sign_realm)
            .field("require_verifier", &self.require_verifier)
            .finish()
    }
}

impl ClientConfig {
    pub fn new<TId, TKey, TSecret>(
        service_id: TId,
        consumer_key: TKey,
        consumer_secret: TSecret,
        request_token: Endpoint,
        access_token: Endpoint,
        authorization_url: impl Into<String>,
    ) -> Self
    where
        TId: Into<String>,
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        ClientConfig {
            service_id: service_id.into(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            realm: String::new(),
            callback_url: String::new(),
            request_token,
            access_token,
            authorization_url: authorization_url.into(),
            authorized_resource_protected: true,
            sign_realm: false,
            require_verifier: false,
            request_token_parser: read_auth_token,
            access_token_parser: read_auth_token,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_realm<T>(self, realm: T) -> Self
    where
        T: Into<String>,
    {
        ClientConfig {
            realm: realm.into(),
            ..self
        }
    }

    pub fn with_callback_url<T>(self, callback_url: T) -> Self
    where
        T: Into<String>,
    {
        ClientConfig {
            callback_url: callback_url.into(),
            ..self
        }
    }

    pub fn with_authorized_resource_protected(self, protected: bool) -> Self {
        ClientConfig {
            authorized_resource_protected: protected,
            ..self
        }
    }

    pub fn with_sign_realm(self, sign_realm: bool) -> Self {
        ClientConfig { sign_realm, ..self }
    }

    pub fn with_require_verifier(self, require_verifier: bool) -> Self {
        ClientConfig {
            require_verifier,
            ..self
        }
    }

    pub fn with_request_token_parser(self, parser: TokenParser) -> Self {
        ClientConfig {
            request_token_parser: parser,
            ..self
        }
    }

    pub fn with_access_token_parser(self, parser: TokenParser) -> Self {
        ClientConfig {
            access_token_parser: parser,
            ..self
        }
    }
}

impl Provider for ClientConfig {
    fn service_id(&self) -> &str {
        &self.service_id
    }

    fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    fn realm(&self) -> &str {
        &self.realm
    }

    fn callback_url(&self) -> &str {
        &self.callback_url
    }

    fn request_token_endpoint(&self) -> &Endpoint {
        &self.request_token
    }

    fn access_token_endpoint(&self) -> &Endpoint {
        &self.access_token
    }

    fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    fn authorized_resource_protected(&self) -> bool {
        self.authorized_resource_protected
    }

    fn sign_realm(&self) -> bool {
        self.sign_realm
    }

    fn require_verifier(&self) -> bool {
        self.require_verifier
    }

    fn parse_request_token(&self, body: &str) -> TokenReaderResult<AuthToken> {
        (self.request_token_parser)(body)
    }

    fn parse_access_token(&self, body: &str) -> TokenReaderResult<AuthToken> {
        (self.access_token_parser)(body)
    }
}

mod method_serde {
    use http::Method;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Method, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Method::from_bytes(name.to_ascii_uppercase().as_bytes()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenReaderError;

    const CONFIG: &str = r#"
service_id = "photos"
consumer_key = "dpf43f3p2l4k3l03"
consumer_secret = "kd94hf93k423kf44"
realm = "Photos"
callback_url = "http://printer.example.com/ready"
authorization_url = "https://photos.example.net/authorize"
require_verifier = true

[request_token]
url = "https://photos.example.net/initiate"
method = "post"

[access_token]
url = "https://photos.example.net/token"
method = "POST"
protected = false
"#;

    #[test]
    fn config_loads_from_toml() {
        let config = ClientConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.service_id(), "photos");
        assert_eq!(config.realm(), "Photos");
        assert_eq!(config.request_token_endpoint().method, Method::POST);
        assert!(config.request_token_endpoint().protected);
        assert!(!config.access_token_endpoint().protected);
        assert!(config.authorized_resource_protected());
        assert!(config.require_verifier());
        assert!(!config.sign_realm());
        assert_eq!(
            config
                .parse_request_token("oauth_token=a&oauth_token_secret=b")
                .unwrap(),
            AuthToken::new("a", "b")
        );
    }

    #[test]
    fn config_rejects_missing_fields() {
        let err = ClientConfig::from_toml_str("service_id = \"x\"").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn endpoint_defaults_to_protected_get() {
        let endpoint = Endpoint::new("https://example.com/oauth/request_token");
        assert_eq!(endpoint.method, Method::GET);
        assert!(endpoint.protected);
        let endpoint = endpoint.method(Method::POST).protected(false);
        assert_eq!(endpoint.method, Method::POST);
        assert!(!endpoint.protected);
    }

    fn parse_json_like(body: &str) -> TokenReaderResult<AuthToken> {
        let mut parts = body.split(':');
        match (parts.next(), parts.next()) {
            (Some(t), Some(s)) => Ok(AuthToken::new(t, s)),
            _ => Err(TokenReaderError::EmptyBody),
        }
    }

    #[test]
    fn parser_strategy_is_replaceable() {
        let config = ClientConfig::new(
            "custom",
            "key",
            "secret",
            Endpoint::new("https://example.com/request"),
            Endpoint::new("https://example.com/access"),
            "https://example.com/authorize",
        )
        .with_access_token_parser(parse_json_like);
        assert_eq!(
            config.parse_access_token("tok:sec").unwrap(),
            AuthToken::new("tok", "sec")
        );
        assert!(config.parse_request_token("tok:sec").is_err());
    }
}
