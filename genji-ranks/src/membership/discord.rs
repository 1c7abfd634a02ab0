//! Discord REST API membership client
//!
//! Role grants live on the guild member object. Requests are paced client-side
//! with a direct (unkeyed) governor limiter before Discord's own limits apply.

use async_trait::async_trait;
use genji_common::models::{RoleId, UserId};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Membership, MembershipError, RoleDelta};

pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Connection settings for [`DiscordMembership`]
#[derive(Debug, Clone)]
pub struct DiscordSettings {
    pub token: String,
    pub guild_id: u64,
    pub api_base: String,
    pub requests_per_second: u32,
}

#[derive(Debug, Deserialize)]
struct GuildMember {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DmChannel {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreateDm {
    recipient_id: String,
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

pub struct DiscordMembership {
    client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    settings: DiscordSettings,
}

impl DiscordMembership {
    pub fn new(settings: DiscordSettings) -> Result<Self, MembershipError> {
        let per_second = NonZeroU32::new(settings.requests_per_second).ok_or_else(|| {
            MembershipError::Parse("requests_per_second must be greater than 0".to_string())
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!(
                "DiscordBot (https://genji.pk, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| MembershipError::Network(e.to_string()))?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
            settings,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.settings.api_base.trim_end_matches('/'), path);
        self.client
            .request(method, url)
            .header("Authorization", format!("Bot {}", self.settings.token))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, MembershipError> {
        self.rate_limiter.until_ready().await;
        builder
            .send()
            .await
            .map_err(|e| MembershipError::Network(e.to_string()))
    }

    /// Map non-success responses to errors
    async fn check(response: Response) -> Result<Response, MembershipError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .json::<RateLimitBody>()
                    .await
                    .ok()
                    .and_then(|body| body.retry_after)
                    .map(Duration::from_secs_f64);
                warn!(?retry_after, "Discord rate limit hit");
                Err(MembershipError::RateLimited(retry_after))
            }
            StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                Err(MembershipError::Forbidden(body))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(MembershipError::Api(status.as_u16(), body))
            }
        }
    }

    async fn set_role(
        &self,
        method: Method,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), MembershipError> {
        let path = format!(
            "/guilds/{}/members/{}/roles/{}",
            self.settings.guild_id, user_id, role_id
        );
        let response = self
            .send(
                self.request(method, &path)
                    .header("X-Audit-Log-Reason", "Rank sync"),
            )
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Membership for DiscordMembership {
    async fn member_roles(&self, user_id: UserId) -> Result<Option<Vec<RoleId>>, MembershipError> {
        let path = format!("/guilds/{}/members/{}", self.settings.guild_id, user_id);
        let response = self.send(self.request(Method::GET, &path)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(user_id, "User is not a guild member");
            return Ok(None);
        }

        let member: GuildMember = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MembershipError::Parse(e.to_string()))?;

        member
            .roles
            .iter()
            .map(|id| {
                id.parse::<RoleId>()
                    .map_err(|_| MembershipError::Parse(format!("invalid role id '{}'", id)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    async fn apply_role_delta(
        &self,
        user_id: UserId,
        delta: &RoleDelta,
    ) -> Result<(), MembershipError> {
        for role_id in &delta.add {
            self.set_role(Method::PUT, user_id, *role_id).await?;
        }
        for role_id in &delta.remove {
            self.set_role(Method::DELETE, user_id, *role_id).await?;
        }
        debug!(
            user_id,
            added = delta.add.len(),
            removed = delta.remove.len(),
            "Role delta applied"
        );
        Ok(())
    }

    async fn send_direct_message(
        &self,
        user_id: UserId,
        content: &str,
    ) -> Result<(), MembershipError> {
        let open = self.request(Method::POST, "/users/@me/channels").json(&CreateDm {
            recipient_id: user_id.to_string(),
        });
        let channel: DmChannel = Self::check(self.send(open).await?)
            .await?
            .json()
            .await
            .map_err(|e| MembershipError::Parse(e.to_string()))?;

        let path = format!("/channels/{}/messages", channel.id);
        let message = self
            .request(Method::POST, &path)
            .json(&CreateMessage { content });
        Self::check(self.send(message).await?).await?;
        Ok(())
    }
}
