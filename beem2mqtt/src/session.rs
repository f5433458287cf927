use crate::beem_api::{BeemBackend, Credentials};
use crate::error::ApiError;
use crate::token::Token;

use chrono::DateTime;
use log::{debug, info};

/// Keeps the access token between cycles and logs in only when it is no longer usable.
pub struct Session {
    credentials: Credentials,
    token: Option<Token>,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            token: None,
        }
    }

    /// Return a usable token, logging in again if the cached one is missing,
    /// malformed or expired.
    pub fn token<B: BeemBackend + ?Sized>(&mut self, backend: &B) -> Result<Token, ApiError> {
        if let Some(token) = self.token.as_ref().filter(|token| token.is_valid()) {
            info!("beem already logged in with existing access token");
            return Ok(token.clone());
        }

        let token = backend.login(&self.credentials)?;
        info!("beem successfully logged in and got access token");
        if let Some(expires) = token.expires_at().and_then(|exp| DateTime::from_timestamp(exp, 0)) {
            debug!("access token expires at {expires}");
        }

        self.token = Some(token.clone());
        Ok(token)
    }

    /// Forget the cached token so the next cycle logs in again.
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}
