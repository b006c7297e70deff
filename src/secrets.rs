use std::fmt;

/// A token/secret pair.
///
/// Depending on the handshake stage this holds temporary credentials or
/// access credentials.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct AuthToken {
    token: String,
    secret: String,
}

impl AuthToken {
    pub fn new<TToken, TSecret>(token: TToken, secret: TSecret) -> Self
    where
        TToken: Into<String>,
        TSecret: Into<String>,
    {
        AuthToken {
            token: token.into(),
            secret: secret.into(),
        }
    }

    /// A pair carrying only the token half, as received in a callback.
    pub fn token_only<T>(token: T) -> Self
    where
        T: Into<String>,
    {
        AuthToken::new(token, String::new())
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn set_token<T>(&mut self, value: T)
    where
        T: Into<String>,
    {
        self.token = value.into();
    }

    pub fn set_secret<T>(&mut self, value: T)
    where
        T: Into<String>,
    {
        self.secret = value.into();
    }

    /// Both halves are present.
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.secret.is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &self.token)
            .field("secret", &if self.secret.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl<T, S> From<(T, S)> for AuthToken
where
    T: Into<String>,
    S: Into<String>,
{
    fn from((token, secret): (T, S)) -> Self {
        AuthToken::new(token, secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_fill_an_empty_token() {
        let mut token = AuthToken::default();
        assert!(!token.is_complete());
        token.set_token("nnch734d00sl2jdk");
        assert!(!token.is_complete());
        token.set_secret("pfkkdhi9sl3r4s00");
        assert!(token.is_complete());
        assert_eq!(token.token(), "nnch734d00sl2jdk");
        assert_eq!(token.secret(), "pfkkdhi9sl3r4s00");
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let token = AuthToken::new("hh5s93j4hdidpola", "hdhd0244k9j7ao03");
        let printed = format!("{:?}", token);
        assert!(printed.contains("hh5s93j4hdidpola"));
        assert!(!printed.contains("hdhd0244k9j7ao03"));
    }

    #[test]
    fn token_only_has_empty_secret() {
        let token = AuthToken::token_only("abc");
        assert_eq!(token, AuthToken::from(("abc", "")));
    }
}
