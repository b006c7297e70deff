use std::collections::btree_map::{self, BTreeMap};
use std::iter::FromIterator;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use http::Method;
use sha1::Sha1;
use url::Url;

use crate::encode::{encode, encode_pairs};
use crate::nonce::{Clock, NonceGenerator};
use crate::{
    AuthToken, Provider, SignError, SignResult, OAUTH_CALLBACK_KEY, OAUTH_CONSUMER_KEY,
    OAUTH_NONCE_KEY, OAUTH_SIGNATURE_KEY, OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY,
    OAUTH_TOKEN_KEY, OAUTH_VERSION_KEY, REALM_KEY,
};

type HmacSha1 = Hmac<Sha1>;

pub const HMAC_SHA1: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

/// Ordered multimap of request parameters.
///
/// Names iterate in byte-wise order; values of one name keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    inner: BTreeMap<String, Vec<String>>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Default::default()
    }

    /// Decodes an `application/x-www-form-urlencoded` string.
    pub fn from_query(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Adds a value, keeping the ones already present under `name`.
    pub fn insert<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inner
            .entry(name.into())
            .or_insert_with(Vec::new)
            .push(value.into());
    }

    /// Sets `name` to exactly one value.
    pub fn replace<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inner.insert(name.into(), vec![value.into()]);
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.inner.remove(name)
    }

    /// Removes one `name=value` pair, dropping `name` once it has no values.
    pub fn remove_pair(&mut self, name: &str, value: &str) -> bool {
        let values = match self.inner.get_mut(name) {
            Some(values) => values,
            None => return false,
        };
        let found = match values.iter().position(|v| v == value) {
            Some(index) => {
                values.remove(index);
                true
            }
            None => false,
        };
        if values.is_empty() {
            self.inner.remove(name);
        }
        found
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.inner.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of `name=value` pairs.
    pub fn len(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    /// Every name present in `other` replaces all of its values here.
    /// Names with no values in `other` are ignored.
    pub fn extend_replacing(&mut self, other: ParameterSet) {
        for (name, values) in other.inner {
            if !values.is_empty() {
                self.inner.insert(name, values);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.inner
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// `name=value&...` in iteration order, OAuth-encoded.
    pub fn to_encoded_string(&self) -> String {
        encode_pairs(self.iter())
    }

    /// The normalized parameter string of the signature base string.
    ///
    /// Values of a repeated name are ordered too, so equal multisets of pairs
    /// always normalize identically.
    pub fn normalize(&self) -> String {
        let mut pairs: Vec<(&str, &str)> = self.iter().collect();
        pairs.sort();
        encode_pairs(pairs)
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = ParameterSet::new();
        params.extend(iter);
        params
    }
}

impl<K, V> Extend<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, Vec<String>);
    type IntoIter = btree_map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

/// The URI as it appears in the base string: no query, no fragment.
pub fn base_url(uri: &Url) -> String {
    let mut base = uri.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.to_string()
}

/// `METHOD&encode(base_url)&encode(normalized parameters)`.
pub fn base_string(method: &Method, base_url: &str, params: &ParameterSet) -> String {
    format!(
        "{}&{}&{}",
        method.as_str().to_ascii_uppercase(),
        encode(base_url),
        encode(&params.normalize())
    )
}

/// `encode(consumer_secret)&encode(token_secret)`; the `&` is always there.
pub fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
    format!("{}&{}", encode(consumer_secret), encode(token_secret))
}

/// HMAC-SHA1 of `base_string`, base64 encoded.
pub fn sign(base_string: &str, key: &str) -> SignResult<String> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|_| SignError::InvalidKeyLength(key.len()))?;
    mac.update(base_string.as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(STANDARD.encode(digest).trim().to_string())
}

/// Per-request protocol values: `oauth_nonce` and `oauth_timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthParameters {
    nonce: String,
    timestamp: u64,
}

impl OAuthParameters {
    /// Draws a fresh nonce and the current time.
    pub fn generate(nonces: &NonceGenerator, clock: &dyn Clock) -> Self {
        OAuthParameters {
            nonce: nonces.next_nonce(),
            timestamp: clock.now(),
        }
    }

    /// Pins nonce and timestamp, for reproducible signatures.
    pub fn fixed<T>(nonce: T, timestamp: u64) -> Self
    where
        T: Into<String>,
    {
        OAuthParameters {
            nonce: nonce.into(),
            timestamp,
        }
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Computes `oauth_signature` for one request.
pub struct Signer<'a, P: ?Sized> {
    provider: &'a P,
    parameters: OAuthParameters,
}

impl<'a, P> Signer<'a, P>
where
    P: Provider + ?Sized,
{
    pub fn new(provider: &'a P, parameters: OAuthParameters) -> Self {
        Signer {
            provider,
            parameters,
        }
    }

    /// Builds the complete signed parameter set for a request.
    ///
    /// Sources are the query string of `uri`, then `additional` (a name given
    /// there drops every same-named query value), then the protocol
    /// parameters. The result holds `oauth_signature` and, when configured,
    /// `realm`.
    pub fn sign_parameters(
        self,
        method: &Method,
        uri: &Url,
        credentials: Option<&AuthToken>,
        additional: ParameterSet,
    ) -> SignResult<ParameterSet> {
        let provider = self.provider;
        let mut params = ParameterSet::new();
        params.replace(OAUTH_CONSUMER_KEY, provider.consumer_key());
        params.replace(OAUTH_SIGNATURE_METHOD_KEY, HMAC_SHA1);
        params.replace(OAUTH_TIMESTAMP_KEY, self.parameters.timestamp.to_string());
        params.replace(OAUTH_NONCE_KEY, self.parameters.nonce);
        params.replace(OAUTH_VERSION_KEY, OAUTH_VERSION);
        match credentials {
            Some(token) if !token.token().is_empty() => {
                params.replace(OAUTH_TOKEN_KEY, token.token());
            }
            _ if !provider.callback_url().is_empty() => {
                params.replace(OAUTH_CALLBACK_KEY, provider.callback_url());
            }
            _ => {}
        }

        if let Some(query) = uri.query() {
            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                if !additional.contains(&name) {
                    params.insert(name, value);
                }
            }
        }
        params.extend_replacing(additional);

        let realm = provider.realm();
        if !realm.is_empty() && provider.sign_realm() {
            params.replace(REALM_KEY, realm);
        } else {
            params.remove(REALM_KEY);
        }

        let base = base_string(method, &base_url(uri), &params);
        let token_secret = credentials.map(AuthToken::secret).unwrap_or_default();
        let key = signing_key(provider.consumer_secret(), token_secret);
        let signature = sign(&base, &key)?;
        tracing::debug!(base_string = %base, "computed oauth signature");

        params.replace(OAUTH_SIGNATURE_KEY, signature);
        if !realm.is_empty() {
            params.replace(REALM_KEY, realm);
        }
        Ok(params)
    }
}
