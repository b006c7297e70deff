use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;

use http::{HeaderMap, Method};
use url::Url;

use crate::correlation::{CorrelationTable, CredentialKind};
use crate::encode::encode;
use crate::nonce::{Clock, NonceGenerator, SystemClock};
use crate::transport::{self, read_body, Response, Transport};
use crate::{
    AuthToken, Endpoint, Error, OAuthParameters, ParameterSet, Provider, RequestBuilder, Result,
    SignedRequest, TokenReaderError, TokenReaderResult, OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY,
};

/// Where a client stands in the three-legged handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    Unauthenticated,
    TemporaryCredentialsObtained(AuthToken),
    AuthorizationGranted {
        token: String,
        verifier: Option<String>,
    },
    AccessCredentialsObtained(AuthToken),
}

/// Anything the authorization redirect can arrive as.
pub trait CallbackQuery {
    fn callback_query(&self) -> Option<&str>;
}

impl CallbackQuery for Url {
    fn callback_query(&self) -> Option<&str> {
        self.query()
    }
}

impl CallbackQuery for http::Uri {
    fn callback_query(&self) -> Option<&str> {
        self.query()
    }
}

impl<B> CallbackQuery for http::Request<B> {
    fn callback_query(&self) -> Option<&str> {
        self.uri().query()
    }
}

/// A full URL, a path with a query, or a bare query string.
impl CallbackQuery for str {
    fn callback_query(&self) -> Option<&str> {
        let query = match self.find('?') {
            Some(index) => &self[index + 1..],
            None if self.contains('=') => self,
            None => return None,
        };
        Some(query.split('#').next().unwrap_or_default())
    }
}

/// `oauth_token` and `oauth_verifier` taken from an authorization callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub token: String,
    pub verifier: Option<String>,
}

impl CallbackParams {
    /// Fails when `oauth_token` is missing or empty. A missing verifier is
    /// not an error here.
    pub fn parse<C>(callback: &C) -> Result<Self>
    where
        C: CallbackQuery + ?Sized,
    {
        let params = ParameterSet::from_query(callback.callback_query().unwrap_or_default());
        let token = params
            .get(OAUTH_TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .ok_or(Error::MalformedCallback(OAUTH_TOKEN_KEY))?;
        let verifier = params
            .get(OAUTH_VERIFIER_KEY)
            .filter(|verifier| !verifier.is_empty())
            .map(str::to_string);
        Ok(CallbackParams {
            token: token.to_string(),
            verifier,
        })
    }

    pub fn from_query(query: &str) -> Result<Self> {
        Self::parse(query)
    }

    pub fn from_url(url: &Url) -> Result<Self> {
        Self::parse(url)
    }

    pub fn from_uri(uri: &http::Uri) -> Result<Self> {
        Self::parse(uri)
    }
}

/// Drives the OAuth 1.0a handshake for one provider and signs requests with
/// the credentials it obtains.
pub struct Client<P, T> {
    provider: P,
    transport: Arc<T>,
    nonces: NonceGenerator,
    clock: Box<dyn Clock>,
    table: Arc<CorrelationTable>,
    current: RwLock<Option<AuthToken>>,
    state: Mutex<HandshakeState>,
}

impl<P, T> Client<P, T>
where
    P: Provider,
    T: Transport,
{
    pub fn new(provider: P, transport: T) -> Self {
        Client {
            provider,
            transport: Arc::new(transport),
            nonces: NonceGenerator::new(),
            clock: Box::new(SystemClock),
            table: Arc::new(CorrelationTable::new()),
            current: RwLock::new(None),
            state: Mutex::new(HandshakeState::Unauthenticated),
        }
    }

    pub fn with_clock<C>(self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        Client {
            clock: Box::new(clock),
            ..self
        }
    }

    pub fn with_nonce_generator(self, nonces: NonceGenerator) -> Self {
        Client { nonces, ..self }
    }

    /// Shares one table between clients, so a handshake begun by one client
    /// can be completed by another.
    pub fn with_correlation_table(self, table: Arc<CorrelationTable>) -> Self {
        Client { table, ..self }
    }

    /// Starts out with known access credentials.
    pub fn with_credentials(self, credentials: AuthToken) -> Self {
        Client {
            current: RwLock::new(Some(credentials.clone())),
            state: Mutex::new(HandshakeState::AccessCredentialsObtained(credentials)),
            ..self
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn correlation_table(&self) -> &Arc<CorrelationTable> {
        &self.table
    }

    pub fn current_credentials(&self) -> Option<AuthToken> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_current_credentials(&self, credentials: Option<AuthToken>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = credentials;
    }

    pub fn state(&self) -> HandshakeState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: HandshakeState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Forgets the current credentials and starts over.
    pub fn reset(&self) {
        self.set_current_credentials(None);
        self.set_state(HandshakeState::Unauthenticated);
    }

    fn request_builder<'a>(
        &'a self,
        credentials: Option<&'a AuthToken>,
        method: Method,
        uri: &str,
        params: ParameterSet,
        protected: bool,
    ) -> Result<RequestBuilder<'a, P>> {
        let url = Url::parse(uri)?;
        let parameters = OAuthParameters::generate(&self.nonces, self.clock.as_ref());
        Ok(RequestBuilder::new(&self.provider, method, url, parameters)
            .credentials(credentials)
            .params(params)
            .protected(protected))
    }

    /// Signs a request with the current credentials, if there are any.
    pub fn sign_and_build(
        &self,
        method: Method,
        uri: &str,
        params: ParameterSet,
        protected: bool,
    ) -> Result<SignedRequest> {
        let credentials = self.current_credentials();
        self.request_builder(credentials.as_ref(), method, uri, params, protected)?
            .build()
    }

    /// Signs a request for a protected resource with the access credentials.
    pub fn create_authorized_request(
        &self,
        method: Method,
        uri: &str,
        params: ParameterSet,
        body: Option<String>,
    ) -> Result<SignedRequest> {
        self.create_authorized_request_with_headers(method, uri, params, HeaderMap::new(), body)
    }

    /// Like [`Client::create_authorized_request`], sending `headers` along.
    /// `Authorization` and, for form bodies, `Content-Type` are overwritten.
    pub fn create_authorized_request_with_headers(
        &self,
        method: Method,
        uri: &str,
        params: ParameterSet,
        headers: HeaderMap,
        body: Option<String>,
    ) -> Result<SignedRequest> {
        let credentials = self
            .current_credentials()
            .filter(|c| !c.token().is_empty())
            .ok_or(Error::MissingCredentials)?;
        let mut builder = self
            .request_builder(
                Some(&credentials),
                method,
                uri,
                params,
                self.provider.authorized_resource_protected(),
            )?
            .headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        builder.build()
    }

    pub fn send(&self, request: SignedRequest) -> Result<Response> {
        self.transport.send(request)
    }

    /// Sends on a separate thread; `callback` receives the outcome.
    pub fn send_async<F>(&self, request: SignedRequest, callback: F) -> JoinHandle<()>
    where
        T: Send + Sync + 'static,
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        transport::send_async(Arc::clone(&self.transport), request, callback)
    }

    /// Sends a signed request to a handshake endpoint and parses the reply.
    ///
    /// Transport errors come first, then body read errors. A non-empty body
    /// that yields no complete pair is reported verbatim.
    fn exchange(
        &self,
        endpoint: &Endpoint,
        credentials: Option<&AuthToken>,
        params: ParameterSet,
        parse: impl Fn(&str) -> TokenReaderResult<AuthToken>,
    ) -> Result<AuthToken> {
        let request = self
            .request_builder(
                credentials,
                endpoint.method.clone(),
                &endpoint.url,
                params,
                endpoint.protected,
            )?
            .build()?;
        let response = self.transport.send(request)?;
        let status = response.status();
        let body = read_body(response)?;
        match parse(&body) {
            Ok(token) if token.is_complete() => Ok(token),
            _ if !body.trim().is_empty() => {
                tracing::warn!(
                    service = self.provider.service_id(),
                    status = status.as_u16(),
                    "provider rejected token request"
                );
                Err(Error::ProviderRejected(body))
            }
            Err(err) => Err(err.into()),
            Ok(_) => Err(TokenReaderError::EmptyBody.into()),
        }
    }

    /// First leg: fetches temporary credentials and remembers their secret.
    pub fn obtain_temporary_credentials(&self) -> Result<AuthToken> {
        let provider = &self.provider;
        let token = self.exchange(
            provider.request_token_endpoint(),
            None,
            ParameterSet::new(),
            |body| provider.parse_request_token(body),
        )?;
        self.table
            .insert(provider.service_id(), &token, CredentialKind::Temporary);
        tracing::info!(
            service = provider.service_id(),
            token = token.token(),
            "obtained temporary credentials"
        );
        self.set_state(HandshakeState::TemporaryCredentialsObtained(token.clone()));
        Ok(token)
    }

    /// The page the resource owner visits to grant access.
    pub fn authorization_url(&self, temporary: &AuthToken) -> String {
        let base = self.provider.authorization_url();
        let separator = if base.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            base,
            separator,
            OAUTH_TOKEN_KEY,
            encode(temporary.token())
        )
    }

    /// Obtains temporary credentials and returns the authorization URL.
    pub fn begin_handshake(&self) -> Result<Url> {
        let temporary = self.obtain_temporary_credentials()?;
        Ok(Url::parse(&self.authorization_url(&temporary))?)
    }

    /// Last leg: trades authorized temporary credentials for access
    /// credentials and installs them as current.
    ///
    /// The secret comes from the correlation table, or from `temporary`
    /// when the table has none.
    pub fn exchange_for_access(
        &self,
        temporary: &AuthToken,
        verifier: Option<&str>,
    ) -> Result<AuthToken> {
        let credentials = self.resolve_temporary(temporary)?;
        self.exchange_resolved(&credentials, verifier)
    }

    /// Pairs a temporary token with its secret without touching the network.
    fn resolve_temporary(&self, temporary: &AuthToken) -> Result<AuthToken> {
        if temporary.token().is_empty() {
            return Err(Error::MissingCredentials);
        }
        let secret = self
            .table
            .lookup(self.provider.service_id(), temporary.token())
            .or_else(|| Some(temporary.secret().to_string()).filter(|s| !s.is_empty()))
            .ok_or(Error::MissingCredentials)?;
        Ok(AuthToken::new(temporary.token(), secret))
    }

    fn exchange_resolved(
        &self,
        credentials: &AuthToken,
        verifier: Option<&str>,
    ) -> Result<AuthToken> {
        let provider = &self.provider;
        let service = provider.service_id();
        let mut params = ParameterSet::new();
        if let Some(verifier) = verifier.filter(|v| !v.is_empty()) {
            params.replace(OAUTH_VERIFIER_KEY, verifier);
        }
        tracing::debug!(
            service,
            token = credentials.token(),
            verifier = verifier.unwrap_or_default(),
            "exchanging temporary credentials"
        );

        let token = self.exchange(
            provider.access_token_endpoint(),
            Some(credentials),
            params,
            |body| provider.parse_access_token(body),
        )?;
        self.table.remove(service, credentials.token());
        self.table.insert(service, &token, CredentialKind::Access);
        tracing::info!(service, token = token.token(), "obtained access credentials");
        self.set_current_credentials(Some(token.clone()));
        self.set_state(HandshakeState::AccessCredentialsObtained(token.clone()));
        Ok(token)
    }

    /// Completes the handshake from the authorization redirect, reporting
    /// why it failed.
    ///
    /// The state reads `AuthorizationGranted` only while the access exchange
    /// is in flight; any failure leaves the previous state and credentials.
    pub fn exchange_request_token_for_access<C>(&self, callback: &C) -> Result<AuthToken>
    where
        C: CallbackQuery + ?Sized,
    {
        let params = CallbackParams::parse(callback)?;
        if params.verifier.is_none() && self.provider.require_verifier() {
            return Err(Error::MalformedCallback(OAUTH_VERIFIER_KEY));
        }
        let credentials = self.resolve_temporary(&AuthToken::token_only(params.token.as_str()))?;

        let previous = self.state();
        self.set_state(HandshakeState::AuthorizationGranted {
            token: params.token,
            verifier: params.verifier.clone(),
        });
        self.exchange_resolved(&credentials, params.verifier.as_deref())
            .map_err(|err| {
                self.set_state(previous);
                err
            })
    }

    /// Lenient form of [`Client::exchange_request_token_for_access`].
    pub fn complete_handshake<C>(&self, callback: &C) -> bool
    where
        C: CallbackQuery + ?Sized,
    {
        match self.exchange_request_token_for_access(callback) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(
                    service = self.provider.service_id(),
                    error = %err,
                    "authorization not granted"
                );
                false
            }
        }
    }
}
