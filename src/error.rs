use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type SignResult<T> = std::result::Result<T, SignError>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("request failed : {0}")]
    Transport(#[source] BoxError),
    #[error("failed to read response body : {0}")]
    BodyRead(#[from] std::io::Error),
    #[error("token acquisition failed : {0}")]
    ResponseParse(#[from] TokenReaderError),
    #[error("OAuth sign failed : {0}")]
    Signer(#[from] SignError),
    #[error("provider rejected the request : {0}")]
    ProviderRejected(String),
    #[error("no credentials available to sign the request")]
    MissingCredentials,
    #[error("authorization callback has no {0}")]
    MalformedCallback(&'static str),
    #[error("invalid url : {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid request : {0}")]
    InvalidRequest(#[from] http::Error),
    #[error("invalid header value : {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    #[error("invalid configuration : {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Wraps any transport-level failure without altering it.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(err.into())
    }

    /// Raw provider response text, when the error carries one.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Error::ProviderRejected(body) => Some(body),
            Error::ResponseParse(TokenReaderError::TokenKeyNotFound(_, body))
            | Error::ResponseParse(TokenReaderError::EmptyValue(_, body)) => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("HMAC key of {0} bytes was rejected")]
    InvalidKeyLength(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
    #[error("response has empty {0} in {1}")]
    EmptyValue(&'static str, String),
    #[error("response body is empty")]
    EmptyBody,
}
