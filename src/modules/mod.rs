//! The built-in domain modules.
//!
//! Each module owns its catalog and one data-source handle, constructed once
//! from [`ModuleConfig`]. The synthetic sources derive every number from a
//! [`Sampler`], so identical questions always get identical answers.

pub mod agricultural;
pub mod culture;
pub mod finance;
mod sample;
pub mod trade;

pub use agricultural::{AgriculturalModule, AgriculturalSource, SyntheticAgriculture};
pub use culture::{CultureModule, CultureSource, SyntheticCulture};
pub use finance::{FinanceModule, FinanceSource, SyntheticFinance};
pub use sample::{Sampler, round_to};
pub use trade::{SyntheticTrade, TradeModule, TradeSource};

use std::time::Duration;

use tracing::warn;

use crate::config::ModuleConfig;
use crate::error::ToolError;

/// Liberian dollars per US dollar used by the synthetic sources
pub const LRD_PER_USD: f64 = 190.0;

/// Currencies prices can be quoted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Usd,
    Lrd,
}

impl Currency {
    pub fn parse(code: &str) -> Result<Self, ToolError> {
        match code {
            "USD" => Ok(Self::Usd),
            "LRD" => Ok(Self::Lrd),
            other => Err(ToolError::invalid(format!("unsupported currency: {}", other))),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Lrd => "LRD",
        }
    }

    /// Units of this currency per US dollar
    pub fn per_usd(self) -> f64 {
        match self {
            Self::Usd => 1.0,
            Self::Lrd => LRD_PER_USD,
        }
    }
}

fn module_timeout(config: &ModuleConfig) -> Option<Duration> {
    config.timeout_secs.map(Duration::from_secs)
}

/// There is no network-backed source yet, so a configured key has no effect.
fn announce_api_key(domain: &str, config: &ModuleConfig) {
    if config.api_key.is_some() {
        warn!(
            domain = %domain,
            "api key configured but no network source is available; serving synthetic data"
        );
    }
}
