use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
    GovernorError, GovernorLayer,
};
use uuid::Uuid;

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::utils::jwt::Claims;

/// Keys requests by the user id in the JWT claims that `auth_middleware` stored
#[derive(Debug, Clone, Copy)]
pub struct UserIdExtractor;

impl KeyExtractor for UserIdExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let claims = req
            .extensions()
            .get::<Claims>()
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(claims.sub)
    }
}

pub type UserGovernorLayer = GovernorLayer<
    UserIdExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Per-user budgets for authenticated routes
pub enum RateLimitTier {
    /// Meetup management: 100 requests per minute
    Standard,
    /// Posting chat messages: 30 per minute with short bursts
    Chat,
}

impl RateLimitTier {
    /// (milliseconds per replenished token, burst size)
    fn quota(&self) -> (u64, u32) {
        match self {
            RateLimitTier::Standard => (600, 100),
            RateLimitTier::Chat => (2000, 10),
        }
    }
}

pub fn create_user_governor(tier: RateLimitTier) -> UserGovernorLayer {
    let (per_ms, burst) = tier.quota();

    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(UserIdExtractor)
            .finish()
            .unwrap(),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}
