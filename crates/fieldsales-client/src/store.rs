//! REST implementation of [`ProfileStore`]

use async_trait::async_trait;
use fieldsales_core::{Profile, ProfileId, ProfileStore, ProfileUpdate, StoreError, StoreResult};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::error::ClientResult;

/// Sales-profile store backed by the REST API
#[derive(Debug, Clone)]
pub struct HttpProfileStore {
    client: Client,
    config: ApiConfig,
}

impl HttpProfileStore {
    pub fn new(config: ApiConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Absolute URL of a profile's photo on the media server
    pub fn photo_url(&self, profile: &Profile) -> Option<String> {
        profile.photo_url().and_then(|url| self.config.media(url))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn request_error(e: reqwest::Error) -> StoreError {
    StoreError::Request(e.to_string())
}

/// Map non-2xx responses onto store errors
async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::FORBIDDEN => StoreError::Forbidden,
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        _ => StoreError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

/// Flatten a collection entry into a plain profile object
///
/// Older backends nest fields under `attributes` next to the `id`; newer
/// ones return them flat.
pub(crate) fn flatten_entry(entry: Value) -> Value {
    let Value::Object(mut entry) = entry else {
        return entry;
    };
    match entry.remove("attributes") {
        Some(Value::Object(mut attributes)) => {
            for key in ["id", "documentId"] {
                if let Some(value) = entry.remove(key) {
                    attributes.insert(key.to_string(), value);
                }
            }
            Value::Object(attributes)
        }
        Some(other) => {
            entry.insert("attributes".to_string(), other);
            Value::Object(entry)
        }
        None => Value::Object(entry),
    }
}

/// Pick the first profile out of a collection response
pub(crate) fn first_profile(body: Value) -> StoreResult<Option<Profile>> {
    let entry = match body.get("data") {
        Some(Value::Array(items)) => items.first().cloned(),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(StoreError::Decode(format!(
                "expected a data array, got {other}"
            )));
        }
    };
    entry
        .map(|entry| {
            serde_json::from_value(flatten_entry(entry)).map_err(|e| StoreError::Decode(e.to_string()))
        })
        .transpose()
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    #[instrument(skip(self), err)]
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let request = self
            .client
            .get(self.config.profiles_url())
            .query(&[("filters[email][$eq]", email)]);

        let response = self.authorize(request).send().await.map_err(request_error)?;
        let response = check_status(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let profile = first_profile(body)?;
        debug!(found = profile.is_some(), "Profile lookup finished");
        Ok(profile)
    }

    #[instrument(skip(self), fields(id = %id), err)]
    async fn update(&self, id: &ProfileId, update: ProfileUpdate) -> StoreResult<()> {
        let request = self
            .client
            .put(self.config.profile_url(id.as_str()))
            .json(&update.to_body());

        let response = self.authorize(request).send().await.map_err(request_error)?;
        check_status(response).await?;
        debug!("Profile updated");
        Ok(())
    }
}
