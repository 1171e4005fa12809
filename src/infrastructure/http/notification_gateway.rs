use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::ports::{NotificationGateway, SessionProvider};
use crate::infrastructure::http::dto::{CountsDto, NotificationListDto};
use crate::models::{NotificationCounts, NotificationId, NotificationList};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_COUNT_PATH: &str = "/notificacoes/contagem";
pub const DEFAULT_LIST_PATH: &str = "/notificacoes";
pub const DEFAULT_MARK_READ_PATH: &str = "/notificacoes/{id}/lida";
pub const DEFAULT_MARK_ALL_READ_PATH: &str = "/notificacoes/lidas";

/// Longest slice of an error body kept in `SyncError::Http`
const ERROR_BODY_LIMIT: usize = 500;

/// Where the notification endpoints live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEndpoints {
    pub base_url: String,
    pub count_path: String,
    pub list_path: String,
    /// `{id}` is replaced with the notification id
    pub mark_read_path: String,
    pub mark_all_read_path: String,
}

impl NotificationEndpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            count_path: DEFAULT_COUNT_PATH.to_string(),
            list_path: DEFAULT_LIST_PATH.to_string(),
            mark_read_path: DEFAULT_MARK_READ_PATH.to_string(),
            mark_all_read_path: DEFAULT_MARK_ALL_READ_PATH.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn count_url(&self) -> String {
        self.url(&self.count_path)
    }

    pub fn list_url(&self) -> String {
        self.url(&self.list_path)
    }

    pub fn mark_read_url(&self, id: NotificationId) -> String {
        let path = if self.mark_read_path.contains("{id}") {
            self.mark_read_path.replace("{id}", &id.to_string())
        } else {
            format!("{}/{}", self.mark_read_path.trim_end_matches('/'), id)
        };
        self.url(&path)
    }

    pub fn mark_all_read_url(&self) -> String {
        self.url(&self.mark_all_read_path)
    }
}

/// `NotificationGateway` over the console's REST backend
pub struct HttpNotificationGateway {
    client: Client,
    endpoints: NotificationEndpoints,
    session: Arc<dyn SessionProvider>,
}

impl HttpNotificationGateway {
    pub fn new(
        endpoints: NotificationEndpoints,
        session: Arc<dyn SessionProvider>,
        timeout: Duration,
    ) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoints,
            session,
        })
    }

    pub fn endpoints(&self) -> &NotificationEndpoints {
        &self.endpoints
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");

        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder, url: &str) -> SyncResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        debug!(url, status = status.as_u16(), "Notification backend responded");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::Unauthenticated);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Http {
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, e))?;

        // Mutations may answer with an empty body
        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(body)
            .map_err(|e| SyncError::MalformedResponse(format!("{}: {}", url, e)))
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> SyncError {
    let message = if err.is_timeout() {
        format!("Request to {} timed out: {}", url, err)
    } else if err.is_connect() {
        format!("Connection to {} failed: {}", url, err)
    } else if err.is_decode() {
        return SyncError::MalformedResponse(format!("{}: {}", url, err));
    } else {
        format!("Network error calling {}: {}", url, err)
    };
    SyncError::Transport(message)
}

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    async fn fetch_count(&self) -> SyncResult<NotificationCounts> {
        let url = self.endpoints.count_url();
        let dto: CountsDto = self.execute(self.request(Method::GET, &url), &url).await?;
        Ok(dto.into())
    }

    async fn fetch_list(&self, page: u32, page_size: u32) -> SyncResult<NotificationList> {
        let url = self.endpoints.list_url();
        let builder = self
            .request(Method::GET, &url)
            .query(&[("page", page), ("pageSize", page_size)]);

        let dto: NotificationListDto = self.execute(builder, &url).await?;
        Ok(dto.into_list(page))
    }

    async fn mark_read(&self, id: NotificationId) -> SyncResult<NotificationCounts> {
        let url = self.endpoints.mark_read_url(id);
        let dto: CountsDto = self.execute(self.request(Method::POST, &url), &url).await?;
        Ok(dto.into())
    }

    async fn mark_all_read(&self) -> SyncResult<NotificationCounts> {
        let url = self.endpoints.mark_all_read_url();
        let dto: CountsDto = self.execute(self.request(Method::POST, &url), &url).await?;
        Ok(dto.into())
    }
}
