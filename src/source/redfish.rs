// Licensed under the Open Software License version 3.0
use super::{SensorSource, SourceError};
use crate::{
    config::{connection::ConnectionParams, types::RedfishConfig},
    hardware::types::{ContentHint, RawReport, SourceKind},
};
use async_trait::async_trait;
use reqwest::{header::LOCATION, Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use zeroize::Zeroizing;

const SESSIONS_PATH: &str = "/redfish/v1/SessionService/Sessions";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const SESSION_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct SessionRequest<'a> {
    #[serde(rename = "UserName")]
    user_name: &'a str,
    #[serde(rename = "Password")]
    password: &'a str,
}

fn request_error(error: reqwest::Error) -> SourceError {
    SourceError::Unreachable {
        reason: error.to_string(),
    }
}

fn check_status(response: &Response) -> Result<(), SourceError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SourceError::AuthFailed);
    }
    if !status.is_success() {
        return Err(SourceError::HttpError {
            status_code: status.as_u16(),
        });
    }
    Ok(())
}

/// Absolute URLs are kept, paths are resolved against the BMC base URL
fn resolve(base_url: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else {
        format!("{}/{}", base_url, link.trim_start_matches('/'))
    }
}

/// Redfish session, deleted by `close` or, if the fetch gets dropped
/// mid-flight, by a task spawned from `Drop`
struct Session {
    client: Client,
    token: Zeroizing<String>,
    location: Option<String>,
    close_timeout: Duration,
}

impl Session {
    async fn open(
        client: &Client,
        base_url: &str,
        params: &ConnectionParams,
        close_timeout: Duration,
    ) -> Result<Self, SourceError> {
        tracing::trace!("Opening Redfish session on {}", base_url);
        let response = client
            .post(resolve(base_url, SESSIONS_PATH))
            .json(&SessionRequest {
                user_name: params.user(),
                password: params.password(),
            })
            .send()
            .await
            .map_err(request_error)?;
        check_status(&response)?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| resolve(base_url, value));
        let token = response
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| Zeroizing::new(value.to_string()));
        let Some(token) = token else {
            tracing::warn!("{} returned a session without {}", base_url, AUTH_TOKEN_HEADER);
            if let Some(location) = location {
                // Nothing to authenticate with, try anyway
                let result = client.delete(&location).timeout(close_timeout).send().await;
                if let Err(error) = result {
                    tracing::debug!("Failed to close Redfish session {}: {}", location, error);
                }
            }
            return Err(SourceError::AuthFailed);
        };
        if location.is_none() {
            tracing::warn!("{} returned a session without Location", base_url);
        }
        Ok(Self {
            client: client.clone(),
            token,
            location,
            close_timeout,
        })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        tracing::trace!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(AUTH_TOKEN_HEADER, self.token.as_str())
            .send()
            .await
            .map_err(request_error)?;
        check_status(&response)?;
        let body = response.bytes().await.map_err(request_error)?;
        Ok(body.to_vec())
    }

    async fn close(mut self) {
        let Some(location) = self.location.take() else {
            return;
        };
        let result = self
            .client
            .delete(&location)
            .header(AUTH_TOKEN_HEADER, self.token.as_str())
            .timeout(self.close_timeout)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                tracing::trace!("Closed Redfish session {}", location)
            }
            Ok(response) => tracing::warn!(
                "Got {} while closing Redfish session {}",
                response.status(),
                location
            ),
            Err(error) => tracing::warn!("Failed to close Redfish session: {}", error),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let Some(location) = self.location.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Leaking Redfish session {}, no runtime to close it", location);
            return;
        };
        tracing::debug!("Closing abandoned Redfish session {}", location);
        let request = self
            .client
            .delete(&location)
            .header(AUTH_TOKEN_HEADER, self.token.as_str())
            .timeout(self.close_timeout);
        handle.spawn(async move {
            let _ = request.send().await;
        });
    }
}

/// Members that are nothing but `@odata.id` links need one more GET each
fn member_links(document: &Value) -> Option<Vec<String>> {
    let members = document.get("Members")?.as_array()?;
    let mut links = Vec::with_capacity(members.len());
    for member in members {
        let object = member.as_object()?;
        if !object.keys().all(|key| key.starts_with("@odata")) {
            return None;
        }
        links.push(object.get("@odata.id")?.as_str()?.to_string());
    }
    Some(links)
}

pub struct RedfishSource {
    client: Client,
    config: RedfishConfig,
    close_timeout: Duration,
}

impl RedfishSource {
    pub fn new(config: &RedfishConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.get_accept_invalid_certs())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(request_error)?;
        Ok(Self {
            client,
            config: config.clone(),
            close_timeout: SESSION_CLOSE_TIMEOUT,
        })
    }

    #[cfg(test)]
    fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    async fn read_sensors(&self, session: &Session, base_url: &str) -> Result<Vec<u8>, SourceError> {
        let body = session
            .get(&resolve(base_url, &self.config.get_resource()))
            .await?;
        // Anything that isn't a link-only collection is handed to the parser as is
        let links = match serde_json::from_slice::<Value>(&body) {
            Ok(document) => member_links(&document),
            Err(_) => None,
        };
        let Some(links) = links.filter(|links| !links.is_empty()) else {
            return Ok(body);
        };

        tracing::trace!("Expanding {} sensor links", links.len());
        let mut members: Vec<Value> = Vec::with_capacity(links.len());
        for link in links {
            let body = session.get(&resolve(base_url, &link)).await?;
            let member = match serde_json::from_slice::<Value>(&body) {
                Ok(member) => member,
                Err(error) => {
                    // Kept in place so the parser reports which sensor is broken
                    tracing::debug!("{} returned invalid JSON: {}", link, error);
                    Value::String(String::from_utf8_lossy(&body).into_owned())
                }
            };
            members.push(member);
        }
        serde_json::to_vec(&serde_json::json!({ "Members": members })).map_err(|error| {
            SourceError::Unreachable {
                reason: error.to_string(),
            }
        })
    }
}

#[async_trait]
impl SensorSource for RedfishSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Redfish
    }

    async fn fetch(&self, params: &ConnectionParams) -> Result<RawReport, SourceError> {
        let base_url = self.config.base_url(params.host());
        let session = Session::open(&self.client, &base_url, params, self.close_timeout).await?;
        let result = self.read_sensors(&session, &base_url).await;
        // Close on failure too
        session.close().await;
        result.map(|payload| RawReport::new(SourceKind::Redfish, payload, ContentHint::Json))
    }
}
