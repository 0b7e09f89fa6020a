use std::{collections::HashMap, time::Duration};

use core_types::{FileSize, MAX_UPLOAD_FILE_SIZE};
use credentials_storage::CredentialsError;
use dataset_client::DatasetEndpoints;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::error::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum SettingName {
    ApiUrl,
    UploadPath,
    StatusPath,
    GridPath,
    PollIntervalMs,
    ChunkSize,
    MaxFileSize,
    DefaultDelimiter,
}

impl SettingName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingName::ApiUrl => "api_url",
            SettingName::UploadPath => "upload_path",
            SettingName::StatusPath => "status_path",
            SettingName::GridPath => "grid_path",
            SettingName::PollIntervalMs => "poll_interval_ms",
            SettingName::ChunkSize => "chunk_size",
            SettingName::MaxFileSize => "max_file_size",
            SettingName::DefaultDelimiter => "default_delimiter",
        }
    }

    /// Environment variable holding this setting, e.g. `DATAPREP_API_URL`.
    pub fn env_var(&self) -> String {
        format!("DATAPREP_{}", self.as_str().to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Always ends with a slash.
    pub api_url: String,
    pub upload_path: String,
    pub status_path: String,
    pub grid_path: String,
    pub poll_interval: Duration,
    /// 0 uploads the whole file in one request.
    pub chunk_size: u64,
    pub max_file_size: FileSize,
    pub default_delimiter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8180/api/".to_string(),
            upload_path: "preparationdatasets/upload_async".to_string(),
            status_path: "preparationdatasets/upload_async_poll".to_string(),
            grid_path: "preparationdatasets/file".to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            chunk_size: 0,
            max_file_size: MAX_UPLOAD_FILE_SIZE,
            default_delimiter: ",".to_string(),
        }
    }
}

impl TryFrom<HashMap<String, String>> for Settings {
    type Error = Error;

    fn try_from(map: HashMap<String, String>) -> Result<Self, Error> {
        let defaults = Settings::default();
        let get = |name: SettingName| map.get(name.as_str()).filter(|v| !v.is_empty());

        let api_url = get(SettingName::ApiUrl)
            .map(|url| normalize_base_url(url))
            .unwrap_or(defaults.api_url);
        let poll_interval = match get(SettingName::PollIntervalMs) {
            Some(value) => Duration::from_millis(parse_number(SettingName::PollIntervalMs, value)?),
            None => defaults.poll_interval,
        };
        let chunk_size = match get(SettingName::ChunkSize) {
            Some(value) => parse_number(SettingName::ChunkSize, value)?,
            None => defaults.chunk_size,
        };
        let max_file_size = match get(SettingName::MaxFileSize) {
            Some(value) => parse_number(SettingName::MaxFileSize, value)?,
            None => defaults.max_file_size,
        };

        Ok(Self {
            api_url,
            upload_path: get(SettingName::UploadPath)
                .cloned()
                .unwrap_or(defaults.upload_path),
            status_path: get(SettingName::StatusPath)
                .cloned()
                .unwrap_or(defaults.status_path),
            grid_path: get(SettingName::GridPath)
                .cloned()
                .unwrap_or(defaults.grid_path),
            poll_interval,
            chunk_size,
            max_file_size,
            default_delimiter: get(SettingName::DefaultDelimiter)
                .cloned()
                .unwrap_or(defaults.default_delimiter),
        })
    }
}

impl Settings {
    /// Loads settings from `DATAPREP_*` environment variables, reading a `.env` file
    /// first when one exists.
    pub fn from_env() -> Result<Self, Error> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        let map = SettingName::iter()
            .filter_map(|name| {
                std::env::var(name.env_var())
                    .ok()
                    .map(|value| (name.as_str().to_string(), value))
            })
            .collect::<HashMap<_, _>>();
        Settings::try_from(map)
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = normalize_base_url(api_url);
        self
    }

    pub fn upload_url(&self) -> String {
        format!("{}{}", self.api_url, self.upload_path)
    }

    pub fn dataset_endpoints(&self) -> DatasetEndpoints {
        DatasetEndpoints {
            api_url: self.api_url.clone(),
            status_path: self.status_path.clone(),
            grid_path: self.grid_path.clone(),
        }
    }
}

/// Resolves the `Authorization` header from the stored login token. A missing token is
/// not an error; requests then go out unauthenticated.
pub fn load_authorization() -> Result<Option<String>, Error> {
    match credentials_storage::load_token_with_fallback() {
        Ok(token) => Ok(Some(token.header_value())),
        Err(CredentialsError::NoCredentials) => {
            tracing::warn!("No login token found, requests are sent without authorization");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

fn parse_number(name: SettingName, value: &str) -> Result<u64, Error> {
    value.trim().parse::<u64>().map_err(|e| {
        Error::SettingsError(format!("{} must be a number, got '{}': {}", name.as_str(), value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(SettingName, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_empty_map() {
        let settings = Settings::try_from(HashMap::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.poll_interval, Duration::from_millis(1000));
        assert_eq!(settings.max_file_size, 10 * 1024 * 1024 * 1024);
        assert_eq!(settings.default_delimiter, ",");
    }

    #[test]
    fn test_values_override_defaults() {
        let settings = Settings::try_from(map(&[
            (SettingName::ApiUrl, "https://dp.example.com/api"),
            (SettingName::PollIntervalMs, "250"),
            (SettingName::ChunkSize, "1048576"),
            (SettingName::DefaultDelimiter, ";"),
        ]))
        .unwrap();
        assert_eq!(settings.api_url, "https://dp.example.com/api/");
        assert_eq!(
            settings.upload_url(),
            "https://dp.example.com/api/preparationdatasets/upload_async"
        );
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.chunk_size, 1_048_576);
        assert_eq!(settings.default_delimiter, ";");
    }

    #[test]
    fn test_invalid_number_is_settings_error() {
        let result = Settings::try_from(map(&[(SettingName::ChunkSize, "big")]));
        assert!(matches!(result, Err(Error::SettingsError(_))));
    }

    #[test]
    fn test_env_var_names() {
        assert_eq!(SettingName::ApiUrl.env_var(), "DATAPREP_API_URL");
        assert_eq!(
            SettingName::PollIntervalMs.env_var(),
            "DATAPREP_POLL_INTERVAL_MS"
        );
    }
}
