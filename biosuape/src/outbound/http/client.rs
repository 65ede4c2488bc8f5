//! Reqwest-backed adapter for the field-data REST API.
//!
//! This adapter owns transport details only: bearer attachment, timeout and
//! status mapping, and JSON decoding into domain records. A `401` on an
//! authenticated call tears the session down before the error is returned,
//! and calls made without a session are refused before any request is sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tracing::{debug, warn};

use super::dto::{
    CreateOccurrenceRequestDto, LoginRequestDto, LoginResponseDto, MessageDto, OccurrenceDto,
    OccurrenceListDto, RegisterRequestDto,
};
use crate::domain::ports::{AuthApi, AuthApiError, OccurrenceApi, OccurrenceApiError};
use crate::domain::{
    LoginCredentials, LoginGrant, Occurrence, OccurrencePayload, Registration, SessionManager,
    SessionToken,
};

const USER_AGENT: &str = concat!("biosuape/", env!("CARGO_PKG_VERSION"));

/// Failure to construct an [`ApiHttpClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiClientBuildError {
    /// The base URL cannot carry the API paths.
    #[error("invalid API base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
    /// The reqwest client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

struct Endpoints {
    occurrences: Url,
    my_occurrences: Url,
    login: Url,
    register: Url,
}

impl Endpoints {
    fn under(base: &Url) -> Result<Self, url::ParseError> {
        let mut root = base.clone();
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        Ok(Self {
            occurrences: root.join("occurrences")?,
            my_occurrences: root.join("occurrences/mine")?,
            login: root.join("login")?,
            register: root.join("register")?,
        })
    }
}

/// HTTP client implementing [`OccurrenceApi`] and [`AuthApi`].
pub struct ApiHttpClient {
    client: Client,
    endpoints: Endpoints,
    session: Arc<SessionManager>,
}

impl ApiHttpClient {
    /// Build a client rooted at `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientBuildError`] when the URL cannot be extended with the
    /// API paths or the reqwest client cannot be constructed.
    pub fn new(
        base_url: &Url,
        timeout: Duration,
        session: Arc<SessionManager>,
    ) -> Result<Self, ApiClientBuildError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoints: Endpoints::under(base_url)?,
            session,
        })
    }

    async fn bearer(&self) -> Result<SessionToken, OccurrenceApiError> {
        self.session.bearer_token().await.ok_or_else(|| {
            debug!("refusing authenticated call without a session");
            OccurrenceApiError::unauthorized("no active session; log in first")
        })
    }

    /// Send an authenticated request and return the body of a success.
    async fn send_authenticated(&self, request: RequestBuilder) -> Result<Vec<u8>, OccurrenceApiError> {
        let token = self.bearer().await?;
        let response = request
            .bearer_auth(token.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = read_body(response).await.map_err(map_transport_error)?;
        if status == StatusCode::UNAUTHORIZED {
            warn!("server rejected session token");
            self.session.invalidate().await;
            return Err(OccurrenceApiError::unauthorized(error_message(status, &body)));
        }
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        Ok(body)
    }
}

async fn read_body(response: Response) -> Result<Vec<u8>, reqwest::Error> {
    Ok(response.bytes().await?.to_vec())
}

fn parse_occurrence(body: &[u8]) -> Result<Occurrence, OccurrenceApiError> {
    let decoded: OccurrenceDto = serde_json::from_slice(body).map_err(|error| {
        OccurrenceApiError::decode(format!("invalid occurrence JSON payload: {error}"))
    })?;
    decoded.into_domain().map_err(OccurrenceApiError::decode)
}

fn parse_occurrences(body: &[u8]) -> Result<Vec<Occurrence>, OccurrenceApiError> {
    let decoded: OccurrenceListDto = serde_json::from_slice(body).map_err(|error| {
        OccurrenceApiError::decode(format!("invalid occurrence list JSON payload: {error}"))
    })?;
    Ok(decoded.into_domain())
}

#[async_trait]
impl OccurrenceApi for ApiHttpClient {
    async fn create(&self, payload: &OccurrencePayload) -> Result<Occurrence, OccurrenceApiError> {
        let request = self
            .client
            .post(self.endpoints.occurrences.clone())
            .json(&CreateOccurrenceRequestDto::from(payload));
        let body = self.send_authenticated(request).await?;
        parse_occurrence(&body)
    }

    async fn list(&self) -> Result<Vec<Occurrence>, OccurrenceApiError> {
        let request = self.client.get(self.endpoints.occurrences.clone());
        let body = self.send_authenticated(request).await?;
        parse_occurrences(&body)
    }

    async fn list_mine(&self) -> Result<Vec<Occurrence>, OccurrenceApiError> {
        let request = self.client.get(self.endpoints.my_occurrences.clone());
        let body = self.send_authenticated(request).await?;
        parse_occurrences(&body)
    }
}

#[async_trait]
impl AuthApi for ApiHttpClient {
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginGrant, AuthApiError> {
        let response = self
            .client
            .post(self.endpoints.login.clone())
            .json(&LoginRequestDto::from(credentials))
            .send()
            .await
            .map_err(map_auth_transport_error)?;
        let status = response.status();
        let body = read_body(response).await.map_err(map_auth_transport_error)?;
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST) {
            return Err(AuthApiError::invalid_credentials(error_message(status, &body)));
        }
        if !status.is_success() {
            return Err(AuthApiError::rejected(status.as_u16(), error_message(status, &body)));
        }

        let decoded: LoginResponseDto = serde_json::from_slice(&body).map_err(|error| {
            AuthApiError::decode(format!("invalid login JSON payload: {error}"))
        })?;
        let token = decoded
            .token
            .ok_or_else(|| AuthApiError::decode("login response carried no token"))
            .and_then(|raw| {
                SessionToken::new(raw).map_err(|err| AuthApiError::decode(err.to_string()))
            })?;
        let user = decoded
            .user
            .ok_or_else(|| AuthApiError::decode("login response carried no user"))?;
        Ok(LoginGrant {
            token,
            user: user.into(),
        })
    }

    async fn register(&self, registration: &Registration) -> Result<String, AuthApiError> {
        let response = self
            .client
            .post(self.endpoints.register.clone())
            .json(&RegisterRequestDto::from(registration))
            .send()
            .await
            .map_err(map_auth_transport_error)?;
        let status = response.status();
        let body = read_body(response).await.map_err(map_auth_transport_error)?;
        if !status.is_success() {
            return Err(AuthApiError::rejected(status.as_u16(), error_message(status, &body)));
        }
        let decoded: MessageDto = serde_json::from_slice(&body).unwrap_or_default();
        Ok(decoded
            .message
            .unwrap_or_else(|| "Account created.".to_owned()))
    }
}

fn map_transport_error(error: reqwest::Error) -> OccurrenceApiError {
    if error.is_timeout() {
        OccurrenceApiError::timeout(error.to_string())
    } else {
        OccurrenceApiError::transport(error.to_string())
    }
}

fn map_auth_transport_error(error: reqwest::Error) -> AuthApiError {
    if error.is_timeout() {
        AuthApiError::timeout(error.to_string())
    } else {
        AuthApiError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> OccurrenceApiError {
    let message = error_message(status, body);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            OccurrenceApiError::timeout(message)
        }
        _ => OccurrenceApiError::rejected(status.as_u16(), message),
    }
}

/// Prefer the server's `{ "message": ... }`, falling back to a body preview.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    let from_json = serde_json::from_slice::<MessageDto>(body)
        .ok()
        .and_then(|dto| dto.message)
        .filter(|message| !message.trim().is_empty());
    if let Some(message) = from_json {
        return message;
    }
    let preview = body_preview(body);
    if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
