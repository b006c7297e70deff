use std::collections::HashMap;

use serde::Deserialize;

use crate::{AuthToken, TokenReaderError, TokenReaderResult, OAUTH_TOKEN_KEY};

const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";

/// Signature of the per-provider response parsing strategy.
pub type TokenParser = fn(&str) -> TokenReaderResult<AuthToken>;

/// Represents response of token acquisition.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

impl From<TokenResponse> for AuthToken {
    fn from(resp: TokenResponse) -> Self {
        AuthToken::new(resp.oauth_token, resp.oauth_token_secret)
    }
}

/// Splits an `application/x-www-form-urlencoded` token response.
///
/// Keys may carry empty values; only their absence is an error.
pub fn read_oauth_token(text: &str) -> TokenReaderResult<TokenResponse> {
    let mut destructured = url::form_urlencoded::parse(text.trim().as_bytes())
        .into_owned()
        .collect::<HashMap<String, String>>();
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_KEY,
            text.to_string(),
        )),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text.to_string(),
        )),
    }
}

/// The default [`TokenParser`]: both `oauth_token` and `oauth_token_secret`
/// must be present and non-empty.
pub fn read_auth_token(text: &str) -> TokenReaderResult<AuthToken> {
    if text.trim().is_empty() {
        return Err(TokenReaderError::EmptyBody);
    }
    let resp = read_oauth_token(text)?;
    if resp.oauth_token.is_empty() {
        return Err(TokenReaderError::EmptyValue(OAUTH_TOKEN_KEY, text.to_string()));
    }
    if resp.oauth_token_secret.is_empty() {
        return Err(TokenReaderError::EmptyValue(
            OAUTH_TOKEN_SECRET_KEY,
            text.to_string(),
        ));
    }
    Ok(resp.into())
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn parse_response_typical() {
        let resp_str_sample = "oauth_token=Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik&oauth_token_secret=Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM&oauth_callback_confirmed=true";
        for parsed in &[
            read_oauth_token(resp_str_sample).unwrap(),
            serde_urlencoded::from_str::<TokenResponse>(resp_str_sample).unwrap(),
        ] {
            assert_eq!(
                parsed.oauth_token,
                "Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik"
            );
            assert_eq!(
                parsed.oauth_token_secret,
                "Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM"
            );
            assert_eq!(parsed.remain.len(), 1);
            let oauth_callback_confirmed = parsed.remain.get("oauth_callback_confirmed").unwrap();
            assert_eq!(oauth_callback_confirmed, "true");
        }
    }

    #[test]
    fn parse_response_edge() {
        let resp_str_sample = "oauth_token==&oauth_token_secret=&keyonly=&keyonly2&=&&";
        let parsed = read_oauth_token(resp_str_sample).unwrap();
        assert_eq!(parsed.oauth_token, "=");
        assert_eq!(parsed.oauth_token_secret, "");
        assert_eq!(parsed.remain.len(), 3);
        assert_eq!(parsed.remain.get("keyonly").unwrap(), "");
        assert_eq!(parsed.remain.get("keyonly2").unwrap(), "");
        assert_eq!(parsed.remain.get("").unwrap(), "");
    }

    #[test]
    fn parse_decodes_values() {
        let parsed = read_oauth_token("oauth_token=a%2Fb&oauth_token_secret=c+d").unwrap();
        assert_eq!(parsed.oauth_token, "a/b");
        assert_eq!(parsed.oauth_token_secret, "c d");
    }

    #[test]
    fn parse_token_notfound() {
        let resp_str_sample = "oauth_token_secret=";
        match read_oauth_token(resp_str_sample) {
            Err(TokenReaderError::TokenKeyNotFound(key, resp_str)) => {
                assert_eq!(key, OAUTH_TOKEN_KEY);
                assert_eq!(resp_str, resp_str_sample)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn parse_token_secret_notfound() {
        let resp_str_sample = "oauth_token=";
        match read_oauth_token(resp_str_sample) {
            Err(TokenReaderError::TokenKeyNotFound(key, resp_str)) => {
                assert_eq!(key, OAUTH_TOKEN_SECRET_KEY);
                assert_eq!(resp_str, resp_str_sample)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn auth_token_requires_both_halves() {
        let token =
            read_auth_token("oauth_token=hh5s93j4hdidpola&oauth_token_secret=hdhd0244k9j7ao03")
                .unwrap();
        assert_eq!(token, AuthToken::new("hh5s93j4hdidpola", "hdhd0244k9j7ao03"));

        assert_eq!(
            read_auth_token("oauth_token=hh5s93j4hdidpola&oauth_token_secret="),
            Err(TokenReaderError::EmptyValue(
                OAUTH_TOKEN_SECRET_KEY,
                "oauth_token=hh5s93j4hdidpola&oauth_token_secret=".to_string()
            ))
        );
        assert_eq!(read_auth_token(""), Err(TokenReaderError::EmptyBody));
        assert_eq!(read_auth_token("  \n"), Err(TokenReaderError::EmptyBody));
    }

    #[test]
    fn plain_text_error_is_not_a_token() {
        let body = "Invalid consumer key";
        assert_eq!(
            read_auth_token(body),
            Err(TokenReaderError::TokenKeyNotFound(
                OAUTH_TOKEN_KEY,
                body.to_string()
            ))
        );
    }
}
