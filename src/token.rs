//! Password reset tokens.
//!
//! Tokens are neither stored nor verified anywhere; they only end up in the
//! emailed link. They are not suitable as a credential.

use std::fmt::Display;

use rand::{thread_rng, Rng};

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken(String);

impl ResetToken {
    pub const LEN: usize = 10;

    /// Draws a fresh base-36 token.
    pub fn generate() -> Self {
        let mut rng = thread_rng();

        let token = (0..Self::LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();

        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Embeds the token as the `token` query parameter of `base`.
    /// ```
    /// use resetmail::token::ResetToken;
    ///
    /// let token = ResetToken::generate();
    /// let link = token.link("https://pudo.com.tr/reset-password");
    ///
    /// assert_eq!(link, format!("https://pudo.com.tr/reset-password?token={token}"));
    /// ```
    pub fn link(&self, base: &str) -> String {
        format!("{base}?token={}", self.0)
    }
}

impl Display for ResetToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
