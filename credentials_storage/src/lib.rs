use keyring::Entry;
use serde::{Deserialize, Serialize};

#[cfg(not(test))]
const SERVICE_NAME: &str = "dataprep-upload";
const USERNAME: &str = "login-token"; // Fixed username, one token per user account

// Test-specific service name to avoid polluting production keyring
#[cfg(test)]
const TEST_SERVICE_NAME: &str = "dataprep-upload-test";

pub const TOKEN_TYPE_ENV: &str = "DATAPREP_TOKEN_TYPE";
pub const ACCESS_TOKEN_ENV: &str = "DATAPREP_ACCESS_TOKEN";

fn get_service_name() -> &'static str {
    #[cfg(test)]
    {
        TEST_SERVICE_NAME
    }
    #[cfg(not(test))]
    {
        SERVICE_NAME
    }
}

/// Login token sent with every request to the dataset service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthToken {
    pub token_type: String,
    pub access_token: String,
}

impl AuthToken {
    /// Value for the `Authorization` header, `<token type> <token>`.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Errors that can occur when working with credentials
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("No token stored")]
    NoCredentials,

    #[error("Failed to serialize/deserialize token: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Store the login token in the system keyring as JSON.
///
/// # Errors
///
/// Returns an error if the keyring is not accessible or the token cannot be serialized.
pub fn store_token(token: &AuthToken) -> Result<(), CredentialsError> {
    let entry = Entry::new(get_service_name(), USERNAME)?;
    let json = serde_json::to_string(token)?;
    entry.set_password(&json)?;
    Ok(())
}

/// Load the login token from the system keyring.
///
/// # Errors
///
/// Returns `CredentialsError::NoCredentials` if no token is stored.
pub fn load_token() -> Result<AuthToken, CredentialsError> {
    let entry = Entry::new(get_service_name(), USERNAME)?;
    match entry.get_password() {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(keyring::Error::NoEntry) => Err(CredentialsError::NoCredentials),
        Err(e) => Err(CredentialsError::Keyring(e)),
    }
}

/// Load the token from the keyring, falling back to `DATAPREP_TOKEN_TYPE` and
/// `DATAPREP_ACCESS_TOKEN`. The token type defaults to `bearer` when only the
/// access token is set.
pub fn load_token_with_fallback() -> Result<AuthToken, CredentialsError> {
    match load_token() {
        Ok(token) => Ok(token),
        Err(CredentialsError::NoCredentials) | Err(CredentialsError::Keyring(_)) => {
            token_from_env(
                std::env::var(TOKEN_TYPE_ENV).ok(),
                std::env::var(ACCESS_TOKEN_ENV).ok(),
            )
        }
        Err(e) => Err(e),
    }
}

fn token_from_env(
    token_type: Option<String>,
    access_token: Option<String>,
) -> Result<AuthToken, CredentialsError> {
    match access_token.filter(|t| !t.is_empty()) {
        Some(access_token) => Ok(AuthToken {
            token_type: token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "bearer".to_string()),
            access_token,
        }),
        None => Err(CredentialsError::NoCredentials),
    }
}

/// Delete the stored token. Deleting a missing token succeeds.
pub fn delete_token() -> Result<(), CredentialsError> {
    let entry = Entry::new(get_service_name(), USERNAME)?;
    match entry.delete_credential() {
        Ok(_) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
        Err(e) => Err(CredentialsError::Keyring(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // Keyring tests share one test entry, so they run one at a time.

    fn cleanup_test_token() {
        delete_token().ok(); // Ignore errors - might not exist
    }

    fn is_keyring_available() -> bool {
        let entry = match Entry::new(get_service_name(), USERNAME) {
            Ok(e) => e,
            Err(_) => return false,
        };

        match entry.get_password() {
            Ok(_) => true,
            Err(keyring::Error::NoEntry) => true,
            Err(keyring::Error::PlatformFailure(_)) => false,
            Err(keyring::Error::NoStorageAccess(_)) => false,
            Err(_) => true,
        }
    }

    #[test]
    fn test_header_value() {
        let token = AuthToken {
            token_type: "bearer".to_string(),
            access_token: "abc".to_string(),
        };
        assert_eq!(token.header_value(), "bearer abc");
    }

    #[test]
    fn test_token_serialization() {
        let token = AuthToken {
            token_type: "bearer".to_string(),
            access_token: "secret".to_string(),
        };
        let json = serde_json::to_string(&token).unwrap();
        let deserialized: AuthToken = serde_json::from_str(&json).unwrap();
        assert_eq!(token, deserialized);
    }

    #[test]
    fn test_token_from_env_values() {
        let token = token_from_env(None, Some("abc".to_string())).unwrap();
        assert_eq!(token.token_type, "bearer");

        let token = token_from_env(Some("Token".to_string()), Some("abc".to_string())).unwrap();
        assert_eq!(token.header_value(), "Token abc");

        assert!(matches!(
            token_from_env(Some("bearer".to_string()), Some(String::new())),
            Err(CredentialsError::NoCredentials)
        ));
        assert!(matches!(
            token_from_env(None, None),
            Err(CredentialsError::NoCredentials)
        ));
    }

    #[test]
    #[serial]
    fn test_store_load_delete() {
        if !is_keyring_available() {
            eprintln!("Skipping test_store_load_delete: keyring service not available");
            return;
        }

        cleanup_test_token();

        let token = AuthToken {
            token_type: "bearer".to_string(),
            access_token: "test-store-token".to_string(),
        };
        store_token(&token).expect("Failed to store token");
        assert_eq!(load_token().expect("Failed to load token"), token);

        delete_token().unwrap();
        assert!(matches!(load_token(), Err(CredentialsError::NoCredentials)));

        cleanup_test_token();
    }
}
