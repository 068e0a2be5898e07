use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, User};
use crate::error::{Error, HtmlError};

use super::permissions::{AccountState, ActionType};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, email: String, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }

    pub fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// The authenticated caller, reloaded from the database on every request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub email: String,
    pub name: String,
    pub is_active: bool,
}

impl SessionData {
    pub fn account_state(&self) -> AccountState {
        if self.is_active {
            AccountState::Active
        } else {
            AccountState::Inactive
        }
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(HtmlError::InactiveUser.default());
        }
        Ok(())
    }
}

impl From<User> for SessionData {
    fn from(user: User) -> Self {
        SessionData {
            user_id: user.id,
            email: user.email,
            name: user.name,
            is_active: user.is_active,
        }
    }
}

fn signing_key(secret: &[u8]) -> Result<Hmac<Sha256>, Error> {
    Hmac::new_from_slice(secret).map_err(|e| {
        log::error!("Invalid signing key: {e}");
        HtmlError::Internal.default()
    })
}

pub fn generate_jwt_session(user: &User, secret: &[u8], lifetime_hours: i64) -> Result<String, Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.email.to_owned(), lifetime_hours);

    claims.sign_with_key(&key).map_err(|e| {
        log::error!("Failed to sign session token: {e}");
        HtmlError::Internal.default()
    })
}

pub fn verify_jwt_session(token: &str, secret: &[u8]) -> Result<JwtSessionData, Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| HtmlError::InvalidSession.default())?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(HtmlError::InvalidSession.new("Token has expired."));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    fn user() -> User {
        User {
            id: 7,
            email: String::from("user@example.com"),
            password: String::new(),
            name: String::from("User"),
            is_active: true,
        }
    }

    #[test]
    fn signed_token_round_trips_claims() {
        let token = generate_jwt_session(&user(), SECRET, 1).unwrap();
        let claims = verify_jwt_session(&token, SECRET).unwrap();

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.email, "user@example.com");
        assert!(claims.expires_at() > Local::now().timestamp());
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let token = generate_jwt_session(&user(), b"other-secret", 1).unwrap();
        let error = verify_jwt_session(&token, SECRET).unwrap_err();

        assert_eq!(error.code, 401);
        assert_eq!(error.info.as_deref(), Some("Invalid token."));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = generate_jwt_session(&user(), SECRET, -1).unwrap();
        let error = verify_jwt_session(&token, SECRET).unwrap_err();

        assert_eq!(error.code, 401);
        assert_eq!(error.info.as_deref(), Some("Token has expired."));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_jwt_session("not.a.token", SECRET).is_err());
        assert!(verify_jwt_session("", SECRET).is_err());
    }
}
