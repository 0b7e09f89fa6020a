use core_types::{GridResponse, ProcessingStatus};
use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::{DatasetClientError, DatasetServiceOps, GridQuery};

#[derive(Debug, Clone)]
pub struct DatasetEndpoints {
    /// Base URL ending with a slash, e.g. `http://localhost:8180/api/`.
    pub api_url: String,
    pub status_path: String,
    pub grid_path: String,
}

impl DatasetEndpoints {
    pub fn status_url(&self, file_key: &str) -> Result<Url, DatasetClientError> {
        let mut url = join(&self.api_url, &self.status_path)?;
        url.query_pairs_mut().append_pair("key", file_key);
        Ok(url)
    }

    pub fn grid_url(&self, query: &GridQuery) -> Result<Url, DatasetClientError> {
        let mut url = join(&self.api_url, &self.grid_path)?;
        url.path_segments_mut()
            .map_err(|_| DatasetClientError::InvalidUrl(self.api_url.clone()))?
            .push(&query.file_key);
        url.query_pairs_mut()
            .append_pair("sheetname", &query.sheet_name)
            .append_pair("delimiter", &query.delimiter)
            .append_pair("fileType", &query.file_type.to_string());
        Ok(url)
    }
}

fn join(base: &str, path: &str) -> Result<Url, DatasetClientError> {
    Url::parse(base)
        .and_then(|base| base.join(path))
        .map_err(|e| DatasetClientError::InvalidUrl(format!("{}{}: {}", base, path, e)))
}

/// HTTP implementation of the dataset service.
///
/// Uses the blocking reqwest client on async-std's blocking pool.
pub struct HttpDatasetService {
    endpoints: DatasetEndpoints,
    client: reqwest::blocking::Client,
}

impl HttpDatasetService {
    pub fn new(
        endpoints: DatasetEndpoints,
        authorization: Option<&str>,
    ) -> Result<Self, DatasetClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if let Some(authorization) = authorization {
            let value = HeaderValue::from_str(authorization)
                .map_err(|e| DatasetClientError::Other(format!("Invalid auth header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { endpoints, client })
    }

    async fn get_json<T>(&self, url: Url) -> Result<T, DatasetClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.client.clone();
        async_std::task::spawn_blocking(move || {
            let response = client.get(url).send()?;
            if !response.status().is_success() {
                return Err(DatasetClientError::Status(response.status().as_u16()));
            }
            let body = response.text()?;
            Ok(serde_json::from_str(&body)?)
        })
        .await
    }
}

#[async_trait::async_trait]
impl DatasetServiceOps for HttpDatasetService {
    async fn check_upload_status(
        &self,
        file_key: &str,
    ) -> Result<ProcessingStatus, DatasetClientError> {
        let url = self.endpoints.status_url(file_key)?;
        tracing::debug!(%url, "Checking upload status");
        self.get_json(url).await
    }

    async fn get_file_grid_info(
        &self,
        query: &GridQuery,
    ) -> Result<GridResponse, DatasetClientError> {
        let url = self.endpoints.grid_url(query)?;
        tracing::debug!(%url, "Fetching grid information");
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::FileType;

    fn endpoints() -> DatasetEndpoints {
        DatasetEndpoints {
            api_url: "http://localhost:8180/api/".to_string(),
            status_path: "preparationdatasets/upload_async_poll".to_string(),
            grid_path: "preparationdatasets/file".to_string(),
        }
    }

    #[test]
    fn test_status_url() {
        let url = endpoints().status_url("abc 1").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8180/api/preparationdatasets/upload_async_poll?key=abc+1"
        );
    }

    #[test]
    fn test_grid_url_encodes_parameters() {
        let url = endpoints()
            .grid_url(&GridQuery {
                file_key: "k1".to_string(),
                sheet_name: "Sheet 1".to_string(),
                delimiter: ";".to_string(),
                file_type: FileType::Xlsx,
            })
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8180/api/preparationdatasets/file/k1?sheetname=Sheet+1&delimiter=%3B&fileType=xlsx"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let endpoints = DatasetEndpoints {
            api_url: "not a url".to_string(),
            ..endpoints()
        };
        assert!(matches!(
            endpoints.status_url("k"),
            Err(DatasetClientError::InvalidUrl(_))
        ));
    }

    #[async_std::test]
    async fn test_unreachable_server_is_request_error() {
        let service = HttpDatasetService::new(
            DatasetEndpoints {
                api_url: "http://127.0.0.1:9/api/".to_string(),
                ..endpoints()
            },
            Some("bearer t"),
        )
        .unwrap();
        let result = service.check_upload_status("k").await;
        assert!(matches!(result, Err(DatasetClientError::RequestFailed(_))));
    }
}
