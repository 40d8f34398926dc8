// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::ApiError;
use crate::http::{BufferedResponse, HttpClient};

use super::models::{GetByShowNumbersRequest, Show, ShowDetails};

/// Operations the view-model needs from the shows backend.
///
/// Every call is single-shot: no caching and no retry. An empty or `null`
/// response body is reported as an empty result rather than an error.
#[async_trait]
pub trait ShowsApi: Send + Sync {
    /// All known show numbers
    async fn get_show_numbers(&self) -> Result<Vec<u32>, ApiError>;

    /// The shows of `show_name` whose numbers are in `indexes`
    async fn get_by_show_numbers(
        &self,
        show_name: &str,
        indexes: &[u32],
    ) -> Result<Vec<Show>, ApiError>;

    /// The complete catalogue
    async fn get_all_shows(&self) -> Result<Vec<Show>, ApiError>;

    /// Guests and media file of one show
    async fn get_show_details(&self, show_number: u32) -> Result<ShowDetails, ApiError>;
}

/// JSON-over-HTTP implementation of [`ShowsApi`]
#[derive(Clone)]
pub struct HttpShowsApi<C: HttpClient> {
    client: C,
    base_url: String,
    show_name: String,
}

impl<C: HttpClient> HttpShowsApi<C> {
    /// Create a client for `base_url`, listing shows of `show_name`
    pub fn new(client: C, base_url: &str, show_name: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            show_name: show_name.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, ApiError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .await
            .map_err(|e| ApiError::RequestFailed {
                url: url.to_string(),
                source: e,
            })?;
        decode_response(url, response)
    }
}

/// Decode a JSON body, treating an empty body or `null` as no data
fn decode_response<T: DeserializeOwned>(
    url: &str,
    response: BufferedResponse,
) -> Result<Option<T>, ApiError> {
    if response.is_error() {
        return Err(ApiError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice::<Option<T>>(&response.body).map_err(|e| ApiError::DecodeFailed {
        url: url.to_string(),
        source: e,
    })
}

#[async_trait]
impl<C: HttpClient> ShowsApi for HttpShowsApi<C> {
    async fn get_show_numbers(&self) -> Result<Vec<u32>, ApiError> {
        let url = self.endpoint(&format!("shownumbers/{}", self.show_name));
        Ok(self.get_json(&url).await?.unwrap_or_default())
    }

    async fn get_by_show_numbers(
        &self,
        show_name: &str,
        indexes: &[u32],
    ) -> Result<Vec<Show>, ApiError> {
        let url = self.endpoint("getbyshownumbers");
        let request = GetByShowNumbersRequest {
            show_name: show_name.to_string(),
            indexes: indexes.to_vec(),
        };
        let body = Bytes::from(serde_json::to_vec(&request)?);

        debug!("POST {} ({} indexes)", url, indexes.len());
        let response =
            self.client
                .post_json(&url, body)
                .await
                .map_err(|e| ApiError::RequestFailed {
                    url: url.clone(),
                    source: e,
                })?;

        Ok(decode_response::<Vec<Show>>(&url, response)?.unwrap_or_default())
    }

    async fn get_all_shows(&self) -> Result<Vec<Show>, ApiError> {
        let url = self.endpoint(&format!("shows/{}", self.show_name));
        Ok(self.get_json(&url).await?.unwrap_or_default())
    }

    async fn get_show_details(&self, show_number: u32) -> Result<ShowDetails, ApiError> {
        let url = self.endpoint(&format!("showdetails/{}", show_number));
        match self.get_json(&url).await? {
            Some(details) => Ok(details),
            None => Err(ApiError::EmptyResponse { url }),
        }
    }
}
