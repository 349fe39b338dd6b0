use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::errors::Error;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// HTTP client for the API that logs in with a service account and keeps the
/// session cookie, logging in again when the session expires.
pub struct AuthenticatedClient {
    client: Client,
    api_base_url: String,
    username: String,
    password: String,
    cookie: Arc<Mutex<Option<String>>>,
}

impl AuthenticatedClient {
    pub fn new(client: Client, api_base_url: &str, username: String, password: String) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            username,
            password,
            cookie: Arc::new(Mutex::new(None)),
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Log in and store the session cookie.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let login_url = format!("{}/api/auth/login", self.api_base_url);
        debug!("Authenticating with API server as {}", self.username);

        let response = self
            .client
            .post(&login_url)
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::AuthError(format!("Login failed with status {}", response.status())));
        }

        let set_cookie = response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .ok_or_else(|| Error::AuthError("No cookie in response".to_string()))?;
        let cookie_value = set_cookie
            .to_str()
            .map_err(|_| Error::AuthError("Invalid cookie header".to_string()))?;

        // Only the name=value pair, not the attributes
        let cookie = cookie_value
            .split(';')
            .next()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::AuthError("Invalid cookie format".to_string()))?
            .to_string();

        let mut cookie_guard = self
            .cookie
            .lock()
            .map_err(|_| Error::AuthError("Failed to lock cookie mutex".to_string()))?;
        *cookie_guard = Some(cookie);

        debug!("Authentication successful, cookie stored");
        Ok(())
    }

    fn with_cookie(&self, request: RequestBuilder) -> RequestBuilder {
        match self.cookie.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(cookie) => request.header(reqwest::header::COOKIE, cookie),
                None => request,
            },
            Err(_) => request,
        }
    }

    /// Sends the request built by `build`; on 401 logs in once and retries.
    async fn send<F>(&self, build: F) -> Result<Response, Error>
    where
        F: Fn() -> RequestBuilder,
    {
        let response = self.with_cookie(build()).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("Received 401, attempting to re-authenticate");
        self.authenticate().await?;
        Ok(self.with_cookie(build()).send().await?)
    }

    /// POST with automatic authentication.
    pub async fn post<T: Serialize>(&self, path: &str, json_body: &T) -> Result<Response, Error> {
        let url = format!("{}{}", self.api_base_url, path);
        self.send(|| self.client.post(&url).json(json_body)).await
    }

    /// GET with automatic authentication.
    pub async fn get(&self, path: &str) -> Result<Response, Error> {
        let url = format!("{}{}", self.api_base_url, path);
        self.send(|| self.client.get(&url)).await
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        json_or_error(self.get(path).await?).await
    }

    pub async fn post_json<T: Serialize, R: DeserializeOwned>(&self, path: &str, json_body: &T) -> Result<R, Error> {
        json_or_error(self.post(path, json_body).await?).await
    }
}

/// Parses a success body, or turns the status and body into an error.
pub async fn json_or_error<R: DeserializeOwned>(response: Response) -> Result<R, Error> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::ApiError {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}
