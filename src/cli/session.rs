//! Broker session shared by every command

use crate::broker::{BinanceClient, Broker, PaperBroker};
use crate::config::{credentials_from_env, environment_from_env, Config, ExecutionMode};
use crate::strategy::StrategyError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A connected broker plus the settings and abort signal for one invocation
pub struct Session {
    pub broker: Arc<dyn Broker>,
    pub config: Config,
    /// Fired on Ctrl-C; runners stop at their next suspension point
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(broker: Arc<dyn Broker>, config: Config) -> Self {
        Self {
            broker,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Select the broker: the in-memory paper broker when asked for, else the
    /// REST client with credentials and endpoint taken from the environment.
    pub fn connect(config: Config, paper: bool) -> Result<Self, StrategyError> {
        if paper || config.broker.mode == ExecutionMode::Paper {
            tracing::warn!("Paper mode: orders are simulated in memory");
            return Ok(Self::new(Arc::new(PaperBroker::new()), config));
        }

        let credentials = credentials_from_env()?;
        let environment = environment_from_env()?;
        let client = BinanceClient::new(credentials, config.broker.binance_config(environment))?;

        if environment.is_live() {
            tracing::warn!(%environment, base_url = client.base_url(), "LIVE trading: orders use real funds");
        } else {
            tracing::info!(%environment, base_url = client.base_url(), "Binance Futures client ready");
        }

        Ok(Self::new(Arc::new(client), config))
    }
}
