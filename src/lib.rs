/*!
oauth1-flow: OAuth 1.0a request signing and the three-legged credential
exchange.

# Overview

This library signs HTTP requests with HMAC-SHA1 as described by RFC 5849 and
drives the handshake that turns a consumer key into access credentials:

1. obtain temporary credentials from the provider,
2. send the resource owner to the authorization page,
3. trade the authorized temporary credentials for access credentials.

Provider-specific knowledge (endpoints, realm, callback, response parsing)
lives behind the [`Provider`] trait; [`ClientConfig`] covers the common case
and can be loaded from TOML. Requests go out through a [`Transport`], which
is implemented for `reqwest::blocking::Client` with the `blocking` feature.

# How to use

## Acquiring access credentials

```rust,no_run
use oauth1_flow::{Client, ClientConfig};

# fn main() -> oauth1_flow::Result<()> {
let config = ClientConfig::from_toml_str(
    r#"
service_id = "twitter"
consumer_key = "[CONSUMER_KEY]"
consumer_secret = "[CONSUMER_SECRET]"
callback_url = "http://127.0.0.1:8080/callback"
authorization_url = "https://api.twitter.com/oauth/authorize"

[request_token]
url = "https://api.twitter.com/oauth/request_token"
method = "POST"

[access_token]
url = "https://api.twitter.com/oauth/access_token"
method = "POST"
"#,
)?;
let client = Client::new(config, reqwest::blocking::Client::new());

// step 1: acquire temporary credentials and the page the user has to visit
let authorize = client.begin_handshake()?;
println!("please access to: {}", authorize);

// step 2: the provider redirects back with oauth_token and oauth_verifier
let redirect = "http://127.0.0.1:8080/callback?oauth_token=[TOKEN]&oauth_verifier=[PIN]";

// step 3: acquire access credentials
let access = client.exchange_request_token_for_access(redirect)?;
println!("your token is: {}", access.token());
# Ok(())
# }
```

## Sending a signed request

```rust,no_run
use oauth1_flow::{AuthToken, Client, ClientConfig, ParameterSet, read_body};
use http::Method;

# fn main() -> oauth1_flow::Result<()> {
# let config: ClientConfig = unimplemented!();
let client = Client::new(config, reqwest::blocking::Client::new())
    .with_credentials(AuthToken::new("[ACCESS_TOKEN]", "[TOKEN_SECRET]"));

let mut params = ParameterSet::new();
params.insert("status", "Hello, Twitter!");
let request = client.create_authorized_request(
    Method::POST,
    "https://api.twitter.com/1.1/statuses/update.json",
    params,
    None,
)?;
let body = read_body(client.send(request)?)?;
# Ok(())
# }
```
*/
mod client;
mod correlation;
mod encode;
mod error;
mod nonce;
mod provider;
mod request;
mod secrets;
mod signer;
mod token_reader;
mod transport;

// exposed to external program
pub use client::{CallbackParams, CallbackQuery, Client, HandshakeState};
pub use correlation::{CorrelationTable, CredentialKind, DEFAULT_ACCESS_TTL, DEFAULT_TEMPORARY_TTL};
pub use encode::{decode, encode};
pub use error::{
    BoxError, Error, Result, SignError, SignResult, TokenReaderError, TokenReaderResult,
};
pub use nonce::{Clock, FixedClock, NonceGenerator, SystemClock};
pub use provider::{ClientConfig, Endpoint, Provider};
pub use request::{RequestBuilder, SignedRequest};
pub use secrets::AuthToken;
pub use signer::{
    base_string, base_url, sign, signing_key, OAuthParameters, ParameterSet, Signer, HMAC_SHA1,
    OAUTH_VERSION,
};
pub use token_reader::{read_auth_token, read_oauth_token, TokenParser, TokenResponse};
pub use transport::{read_body, send_async, Response, Transport};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";
/// Represents `oauth_signature_method`.
pub const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
/// Represents `oauth_consumer_key`.
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_signature`.
pub const OAUTH_SIGNATURE_KEY: &str = "oauth_signature";
