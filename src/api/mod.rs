//! HTTP client for the image analysis backend
//!
//! Three endpoints, all keyed by the anonymous `userId`:
//!
//! - `POST /images/upload?userId=..` multipart `files` parts, returns ids
//! - `POST /images/analyze` JSON `{userId, s3Urls | imageIdStrings}`
//! - `GET  /images/result?userId=..` returns result records
//!
//! Bodies go through [`normalize`] so envelope drift on the backend does
//! not break the client.

mod error;
pub mod normalize;

pub use error::{AnalyzeError, FetchError, UploadError};
pub use normalize::{AssetId, Extracted, ResultRecord, Shape};

use crate::config::{ClientConfig, Contract};
use reqwest::blocking::{multipart::Form, Client, Response};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, warn};

const UPLOAD_PATH: &str = "images/upload";
const ANALYZE_PATH: &str = "images/analyze";
const RESULT_PATH: &str = "images/result";

pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn contract(&self) -> Contract {
        self.config.contract
    }

    /// Upload images and return the ids the backend assigned to them
    pub fn upload(&self, files: &[PathBuf], identity: &str) -> Result<Vec<AssetId>, UploadError> {
        if files.is_empty() {
            return Err(UploadError::NoFiles);
        }

        let mut form = Form::new().text("userId", identity.to_string());
        for path in files {
            form = form.file("files", path).map_err(|source| UploadError::File {
                path: path.clone(),
                source,
            })?;
        }

        let url = self.config.endpoint(UPLOAD_PATH);
        debug!(url = %url, files = files.len(), "uploading images");

        let response = self
            .http
            .post(&url)
            .query(&[("userId", identity)])
            .multipart(form)
            .send()?;

        let status = response.status();
        let body = read_body(response);
        debug!(status = %status, "upload response");

        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                message: error::failure_message(&body, status),
            });
        }

        let extracted = normalize::extract_ids(&body);
        if !extracted.is_recognized() {
            warn!(body = %body, "upload response has no known id shape");
        }

        let ids = extracted.into_items();
        if ids.is_empty() {
            return Err(UploadError::NoIdentifiers);
        }
        Ok(ids)
    }

    /// Ask the backend to analyze previously uploaded images
    pub fn analyze(&self, asset_ids: &[AssetId], identity: &str) -> Result<(), AnalyzeError> {
        if asset_ids.is_empty() {
            return Err(AnalyzeError::NoAssets);
        }

        let url = self.config.endpoint(ANALYZE_PATH);
        let payload = analyze_payload(self.config.contract, identity, asset_ids);
        debug!(url = %url, assets = asset_ids.len(), contract = %self.config.contract, "requesting analysis");

        let response = self.http.post(&url).json(&payload).send()?;
        let status = response.status();
        let body = read_body(response);
        debug!(status = %status, "analyze response");

        if !status.is_success() {
            return Err(AnalyzeError::Status {
                status: status.as_u16(),
                message: error::failure_message(&body, status),
            });
        }

        if body.get("success") == Some(&Value::Bool(false)) {
            return Err(AnalyzeError::Rejected {
                message: normalize::server_message(&body)
                    .unwrap_or_else(|| "backend reported failure".to_string()),
            });
        }

        Ok(())
    }

    /// Fetch the current results for an identity
    pub fn fetch_results(&self, identity: &str) -> Result<Extracted<ResultRecord>, FetchError> {
        let url = self.config.endpoint(RESULT_PATH);
        debug!(url = %url, "fetching results");

        let response = self.http.get(&url).query(&[("userId", identity)]).send()?;
        let status = response.status();
        let body = read_body(response);

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: error::failure_message(&body, status),
            });
        }

        let extracted = normalize::extract_results(&body);
        if !extracted.is_recognized() {
            warn!(body = %body, "result response has no known shape");
        }
        debug!(records = extracted.len(), shape = ?extracted.shape(), "results fetched");
        Ok(extracted)
    }
}

/// JSON body for the analyze endpoint
pub fn analyze_payload(contract: Contract, identity: &str, asset_ids: &[AssetId]) -> Value {
    let mut payload = Map::new();
    payload.insert("userId".to_string(), Value::from(identity));
    payload.insert(contract.asset_field().to_string(), Value::from(asset_ids.to_vec()));
    Value::Object(payload)
}

fn read_body(response: Response) -> Value {
    match response.bytes() {
        Ok(bytes) => normalize::safe_json(&bytes),
        Err(e) => {
            debug!(error = %e, "failed to read response body");
            Value::Object(Map::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Network behaviour is covered by tests/backend.rs against a mock server

    #[test]
    fn test_payload_s3_urls() {
        let payload = analyze_payload(Contract::S3Urls, "u1", &["a1".to_string(), "a2".to_string()]);
        assert_eq!(payload, json!({"userId": "u1", "s3Urls": ["a1", "a2"]}));
    }

    #[test]
    fn test_payload_image_id_strings() {
        let payload = analyze_payload(Contract::ImageIdStrings, "u1", &["a1".to_string()]);
        assert_eq!(payload, json!({"userId": "u1", "imageIdStrings": ["a1"]}));
        assert!(payload.get("s3Urls").is_none());
    }

    #[test]
    fn test_empty_inputs_rejected_before_network() {
        // Unroutable base: any request attempt would be a transport error
        let config = ClientConfig::new().with_base_url("http://127.0.0.1:9");
        let client = ApiClient::new(&config).unwrap();

        assert!(matches!(client.upload(&[], "u"), Err(UploadError::NoFiles)));
        assert!(matches!(client.analyze(&[], "u"), Err(AnalyzeError::NoAssets)));
    }
}
