use crate::application::engine::{DEFAULT_CURRENCY, EngineConfig};
use crate::domain::pricing::{ConnectPricing, StepRequirement};
use crate::error::{PaymentError, Result};
use crate::infrastructure::chapa::{ChapaConfig, DEFAULT_BASE_URL};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Storage settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct StorageArgs {
    /// Path to a persistent database. Uses in-memory storage when absent.
    #[arg(long, env = "DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// CSV file of users to load at startup (id,name,phone_number,role,connects).
    #[arg(long, env = "SEED_USERS")]
    pub seed_users: Option<PathBuf>,
}

/// Currency and pricing policy.
#[derive(Debug, Clone, Args)]
pub struct PricingArgs {
    #[arg(long, env = "PAYMENT_CURRENCY", default_value = DEFAULT_CURRENCY)]
    pub currency: String,

    /// Price of one purchased connect.
    #[arg(long, env = "CONNECT_UNIT_PRICE", default_value = "10")]
    pub connect_unit_price: Decimal,

    /// Request price covered by each required connect.
    #[arg(long, env = "PRICE_PER_CONNECT", default_value = "100")]
    pub price_per_connect: Decimal,

    #[arg(long, env = "MIN_REQUIRED_CONNECT", default_value_t = 1)]
    pub min_required_connect: u32,

    #[arg(long, env = "MAX_REQUIRED_CONNECT", default_value_t = 10)]
    pub max_required_connect: u32,
}

impl PricingArgs {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        if self.currency.trim().is_empty() {
            return Err(PaymentError::Validation("currency is required".to_string()));
        }
        let requirement = StepRequirement::new(
            self.price_per_connect,
            self.min_required_connect,
            self.max_required_connect,
        )?;
        Ok(EngineConfig {
            currency: self.currency.trim().to_string(),
            connect_pricing: ConnectPricing::new(self.connect_unit_price)?,
            requirement: Arc::new(requirement),
        })
    }
}

/// Payment provider connection.
#[derive(Debug, Clone, Args)]
pub struct GatewayArgs {
    #[arg(long, env = "GATEWAY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub gateway_url: String,

    #[arg(long, env = "GATEWAY_SECRET_KEY", hide_env_values = true)]
    pub gateway_secret: String,

    /// URL the provider calls back once a payment settles.
    #[arg(long, env = "GATEWAY_CALLBACK_URL")]
    pub callback_url: Option<String>,

    #[arg(long, env = "GATEWAY_TIMEOUT_SECS", default_value_t = 15)]
    pub gateway_timeout_secs: u64,
}

impl GatewayArgs {
    pub fn chapa_config(&self) -> ChapaConfig {
        ChapaConfig {
            base_url: self.gateway_url.clone(),
            secret_key: self.gateway_secret.clone(),
            callback_url: self.callback_url.clone(),
            timeout: Duration::from_secs(self.gateway_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(flatten)]
    pub pricing: PricingArgs,

    #[command(flatten)]
    pub gateway: GatewayArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub storage: StorageArgs,
}
