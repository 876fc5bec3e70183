use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::payments::gateway::PaymentGateway;
use crate::payments::replay::ReplayGuard;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub llm: LlmClient,
    pub config: Config,
    /// Mobile-money gateway. `HttpGateway` in production.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Redis-backed webhook replay protection.
    pub replay_guard: Arc<dyn ReplayGuard>,
}
