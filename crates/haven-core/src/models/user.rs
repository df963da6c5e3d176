use serde::{Deserialize, Serialize};

/// A registered identity, as exposed outside the credential store.
///
/// Immutable once created; the password never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A stored credential record. Only the credential store and the mock
/// authentication service ever see the password field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl CredentialRecord {
    /// Strip the password, yielding the user-facing identity.
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Successful login/signup response: identity plus a freshly minted token
/// pair. Expiries are absolute epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: User,
    pub access_token: String,
    pub access_token_expiry: i64,
    pub refresh_token: String,
    pub refresh_token_expiry: i64,
}

/// Successful token refresh response. The refresh token is not rotated, so
/// only the new access token and its expiry come back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    pub access_token: String,
    pub access_token_expiry: i64,
}
