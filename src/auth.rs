//! Token authentication for the call envelope.
//!
//! Regular callers present `sha512(account + login + SALT)`. The admin
//! login presents `sha512(YYYYMMDDHH + ADMIN_SALT)` for the current UTC hour.
//! Tokens are lowercase hex and compared in constant time.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::schema::{MethodRequest, ADMIN_LOGIN};

/// Secret mixed into regular callers' tokens.
pub const SALT: &str = "Otus";

/// Secret mixed into the admin's hourly token.
pub const ADMIN_SALT: &str = "42";

/// Who a token is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal<'a> {
    Admin,
    User { account: &'a str, login: &'a str },
}

impl<'a> Principal<'a> {
    pub fn new(account: &'a str, login: &'a str) -> Self {
        if login == ADMIN_LOGIN {
            Principal::Admin
        } else {
            Principal::User { account, login }
        }
    }

    pub fn of(request: &'a MethodRequest) -> Self {
        Self::new(&request.account, &request.login)
    }

    /// The token this principal must present at `now`.
    pub fn expected_token(&self, now: DateTime<Utc>) -> String {
        let mut hasher = Sha512::new();
        match self {
            Principal::Admin => {
                hasher.update(now.format("%Y%m%d%H").to_string().as_bytes());
                hasher.update(ADMIN_SALT.as_bytes());
            }
            Principal::User { account, login } => {
                hasher.update(account.as_bytes());
                hasher.update(login.as_bytes());
                hasher.update(SALT.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// Checks the envelope's token.
pub fn check_auth(request: &MethodRequest, now: DateTime<Utc>) -> bool {
    let expected = Principal::of(request).expected_token(now);
    expected.as_bytes().ct_eq(request.token.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::HasSet;
    use chrono::TimeZone;
    use serde_json::Map;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 13, 45, 0).unwrap()
    }

    fn request(account: &str, login: &str, token: &str) -> MethodRequest {
        MethodRequest {
            account: account.into(),
            login: login.into(),
            token: token.into(),
            method: "online_score".into(),
            arguments: Map::new(),
            has: HasSet::new(),
        }
    }

    #[test]
    fn user_token_is_sha512_of_account_login_salt() {
        let token = Principal::new("horns&hoofs", "h&f").expected_token(now());
        let direct = hex::encode(Sha512::digest(b"horns&hoofsh&fOtus"));
        assert_eq!(token, direct);
        assert_eq!(token.len(), 128);
        assert!(check_auth(&request("horns&hoofs", "h&f", &token), now()));
    }

    #[test]
    fn admin_token_depends_on_hour() {
        let token = Principal::new("anything", "admin").expected_token(now());
        assert_eq!(token, hex::encode(Sha512::digest(b"202406011342")));
        assert!(check_auth(&request("", "admin", &token), now()));

        let next_hour = now() + chrono::Duration::hours(1);
        assert!(!check_auth(&request("", "admin", &token), next_hour));
    }

    #[test]
    fn any_changed_byte_fails() {
        let token = Principal::new("horns&hoofs", "h&f").expected_token(now());
        assert!(!check_auth(&request("horns&hoofz", "h&f", &token), now()));
        assert!(!check_auth(&request("horns&hoofs", "h&g", &token), now()));

        let mut forged = token.clone().into_bytes();
        forged[0] = if forged[0] == b'0' { b'1' } else { b'0' };
        let forged = String::from_utf8(forged).unwrap();
        assert!(!check_auth(&request("horns&hoofs", "h&f", &forged), now()));
    }

    #[test]
    fn empty_token_fails() {
        assert!(!check_auth(&request("horns&hoofs", "h&f", ""), now()));
        assert!(!check_auth(&request("", "admin", ""), now()));
    }
}
