use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use url::Url;

use crate::encode::encode;
use crate::{
    AuthToken, OAuthParameters, ParameterSet, Provider, Result, Signer, OAUTH_CALLBACK_KEY,
    OAUTH_CONSUMER_KEY, OAUTH_NONCE_KEY, OAUTH_SIGNATURE_KEY, OAUTH_SIGNATURE_METHOD_KEY,
    OAUTH_TIMESTAMP_KEY, OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY, OAUTH_VERSION_KEY, REALM_KEY,
};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Protocol parameters moved into the `Authorization` header, in header order.
/// `realm` leads and `oauth_signature` closes the list. `oauth_token` is
/// rendered empty when the request carries no token.
const HEADER_PARAMETERS: &[&str] = &[
    OAUTH_NONCE_KEY,
    OAUTH_TIMESTAMP_KEY,
    OAUTH_VERSION_KEY,
    OAUTH_SIGNATURE_METHOD_KEY,
    OAUTH_CONSUMER_KEY,
    OAUTH_TOKEN_KEY,
    OAUTH_CALLBACK_KEY,
    OAUTH_VERIFIER_KEY,
];

/// A signed, ready-to-send request. Single use: the nonce and timestamp are
/// baked into the signature.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl SignedRequest {
    /// The `Authorization` header, when the request was signed in protected mode.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn into_http(self) -> Result<http::Request<String>> {
        let mut request = http::Request::builder()
            .method(self.method)
            .uri(self.url.as_str())
            .body(self.body.unwrap_or_default())?;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}

/// Assembles and signs one request.
///
/// GET requests carry every parameter in the URL and no body. Any other
/// method keeps its URL as given and sends the parameters form-encoded in
/// the body.
pub struct RequestBuilder<'a, P: ?Sized> {
    provider: &'a P,
    credentials: Option<&'a AuthToken>,
    parameters: OAuthParameters,
    method: Method,
    url: Url,
    params: ParameterSet,
    protected: bool,
    headers: HeaderMap,
    body: Option<String>,
}

impl<'a, P> RequestBuilder<'a, P>
where
    P: Provider + ?Sized,
{
    pub fn new(provider: &'a P, method: Method, url: Url, parameters: OAuthParameters) -> Self {
        RequestBuilder {
            provider,
            credentials: None,
            parameters,
            method,
            url,
            params: ParameterSet::new(),
            protected: true,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Token credentials to sign with. Without them the request carries
    /// `oauth_callback` instead of `oauth_token`.
    pub fn credentials(self, credentials: Option<&'a AuthToken>) -> Self {
        RequestBuilder {
            credentials,
            ..self
        }
    }

    /// Adds caller parameters. A name given here replaces the same name in
    /// the URL query.
    pub fn params(mut self, params: ParameterSet) -> Self {
        self.params.extend_replacing(params);
        self
    }

    pub fn param<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params.insert(name, value);
        self
    }

    /// `true` puts the protocol parameters in the `Authorization` header,
    /// `false` sends them inline with the others.
    pub fn protected(self, protected: bool) -> Self {
        RequestBuilder { protected, ..self }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// A raw body for non-GET requests without form parameters. It is sent
    /// verbatim and is not covered by the signature.
    pub fn body<T>(self, body: T) -> Self
    where
        T: Into<String>,
    {
        RequestBuilder {
            body: Some(body.into()),
            ..self
        }
    }

    pub fn build(self) -> Result<SignedRequest> {
        let RequestBuilder {
            provider,
            credentials,
            parameters,
            method,
            mut url,
            params,
            protected,
            mut headers,
            body,
        } = self;

        let mut params = Signer::new(provider, parameters).sign_parameters(
            &method,
            &url,
            credentials,
            params,
        )?;

        if protected {
            let authorization = authorization_header(&mut params);
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&authorization)?);
        } else {
            params.remove(REALM_KEY);
        }

        let body = if method == Method::GET {
            url.set_query(None);
            url.set_fragment(None);
            if !params.is_empty() {
                url.set_query(Some(&params.to_encoded_string()));
            }
            None
        } else {
            // the URL keeps its own query, so those pairs stay out of the body
            if let Some(query) = url.query() {
                for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                    params.remove_pair(&name, &value);
                }
            }
            if !params.is_empty() {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
                Some(params.to_encoded_string())
            } else {
                body
            }
        };

        Ok(SignedRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Moves the protocol parameters out of `params` into an `Authorization`
/// header value.
fn authorization_header(params: &mut ParameterSet) -> String {
    let mut fields = Vec::with_capacity(HEADER_PARAMETERS.len() + 2);
    if let Some(realm) = take_first(params, REALM_KEY) {
        if !realm.is_empty() {
            fields.push(format!("{}=\"{}\"", REALM_KEY, encode(&realm)));
        }
    }
    for key in HEADER_PARAMETERS {
        match take_first(params, key) {
            Some(value) => fields.push(format!("{}=\"{}\"", key, encode(&value))),
            // the token slot is always rendered, empty before credentials exist
            None if *key == OAUTH_TOKEN_KEY => fields.push(format!("{}=\"\"", key)),
            None => {}
        }
    }
    let signature = take_first(params, OAUTH_SIGNATURE_KEY).unwrap_or_default();
    fields.push(format!("{}=\"{}\"", OAUTH_SIGNATURE_KEY, encode(&signature)));
    format!("OAuth {}", fields.join(","))
}

fn take_first(params: &mut ParameterSet, key: &str) -> Option<String> {
    params.remove(key).and_then(|values| values.into_iter().next())
}
