use async_trait::async_trait;
use reqwest::{header, Client, Url};
use sgroupbot_gateway::{bot_token, GatewayError, GatewayResolver, GatewayResult};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::types::{
    GatewayInfo, MessageRequest, MessageResponse, ReplyOutcome, ReplyTarget, MESSAGE_AUDIT_CODE,
};

/// Sends replies to a conversation.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(
        &self,
        target: &ReplyTarget,
        content: &str,
        msg_id: Option<&str>,
    ) -> ApiResult<ReplyOutcome>;
}

/// OpenAPI client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    authorization: String,
}

impl ApiClient {
    pub fn new(base_url: &str, app_id: u64, token: &str, timeout: Duration) -> ApiResult<Self> {
        Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: bot_token(app_id, token),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The `Authorization` value, also used as the gateway identify token.
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Gateway WebSocket endpoint
    pub async fn gateway(&self) -> ApiResult<GatewayInfo> {
        let response = self
            .http
            .get(self.url("/gateway"))
            .header(header::AUTHORIZATION, &self.authorization)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Self::error_from_body(status.as_u16(), &body));
        }

        let info: GatewayInfo = serde_json::from_str(&body)?;
        debug!(url = %info.url, shards = info.shards, "Resolved gateway");
        Ok(info)
    }

    /// POST a message to `target`; an audit hold is returned as `AuditPending`
    pub async fn send_message(
        &self,
        target: &ReplyTarget,
        request: &MessageRequest,
    ) -> ApiResult<ReplyOutcome> {
        let response = self
            .http
            .post(self.url(&target.path()))
            .header(header::AUTHORIZATION, &self.authorization)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: MessageResponse = if body.trim().is_empty() {
            MessageResponse::default()
        } else {
            match serde_json::from_str(&body) {
                Ok(parsed) => parsed,
                Err(_) if !status.is_success() => {
                    return Err(Self::error_from_body(status.as_u16(), &body))
                }
                Err(e) => return Err(e.into()),
            }
        };

        if parsed.code == MESSAGE_AUDIT_CODE {
            if let Some(audit_id) = parsed.audit_id() {
                info!(?target, audit_id, "Reply is pending audit");
                return Ok(ReplyOutcome::AuditPending(audit_id.to_string()));
            }
        }

        if parsed.code != 0 {
            return Err(ApiError::Api {
                code: parsed.code,
                message: parsed.message,
            });
        }

        if !status.is_success() {
            return Err(Self::error_from_body(status.as_u16(), &body));
        }

        debug!(?target, id = ?parsed.id, "Reply delivered");
        Ok(ReplyOutcome::Delivered { id: parsed.id })
    }

    fn error_from_body(status: u16, body: &str) -> ApiError {
        match serde_json::from_str::<MessageResponse>(body) {
            Ok(parsed) if parsed.code != 0 => ApiError::Api {
                code: parsed.code,
                message: parsed.message,
            },
            _ => ApiError::Api {
                code: i64::from(status),
                message: body.to_string(),
            },
        }
    }
}

#[async_trait]
impl ReplySender for ApiClient {
    async fn send_reply(
        &self,
        target: &ReplyTarget,
        content: &str,
        msg_id: Option<&str>,
    ) -> ApiResult<ReplyOutcome> {
        let mut request = MessageRequest::text(content);
        if let Some(msg_id) = msg_id {
            request = request.reply_to(msg_id);
        }
        self.send_message(target, &request).await
    }
}

#[async_trait]
impl GatewayResolver for ApiClient {
    async fn resolve(&self) -> GatewayResult<String> {
        self.gateway()
            .await
            .map(|info| info.url)
            .map_err(|e| GatewayError::Resolve(e.to_string()))
    }
}
