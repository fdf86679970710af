#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

use tool_hub::modules::agricultural::{CropOutlook, DailyWeather, PricePoint, Season};
use tool_hub::modules::{AgriculturalSource, Currency, Sampler, SyntheticAgriculture};
use tool_hub::{
    Arguments, HubConfig, InputSchema, ParamSpec, ToolDescriptor, ToolError, ToolModule,
    ToolRegistry,
};

/// The registry the binary builds with default settings.
pub fn default_registry() -> ToolRegistry {
    ToolRegistry::with_default_modules(&HubConfig::default()).expect("built-in modules register")
}

/// Minimal arguments each built-in tool accepts.
pub fn valid_args(tool: &str) -> Value {
    match tool {
        "agricultural_weather_forecast" => json!({"location": "Monrovia"}),
        "agricultural_crop_prediction" => json!({"crop": "rice", "region": "Bong"}),
        "agricultural_market_prices" => json!({"commodity": "rice"}),
        "trade_route_optimization" => json!({"origin": "Monrovia", "destination": "Abidjan"}),
        "trade_customs_regulations" => {
            json!({"origin_country": "Liberia", "destination_country": "Ghana"})
        }
        "trade_market_analysis" => json!({"product": "cocoa", "target_market": "Nigeria"}),
        "culture_language_translation" => {
            json!({"text": "thank you", "source_language": "en", "target_language": "sw"})
        }
        "culture_heritage_sites" => json!({"country": "Ghana"}),
        "culture_cultural_events" => json!({"country": "Nigeria"}),
        "finance_mobile_money_services" => json!({"country": "Liberia"}),
        "finance_exchange_rates" => json!({}),
        "finance_microloan_eligibility" => json!({"monthly_income": 250.0, "loan_amount": 500.0}),
        other => panic!("no sample arguments for {}", other),
    }
}

/// A module that answers every declared tool with its own domain and
/// remembers what it was asked.
pub struct RecordingModule {
    domain: String,
    tools: Vec<ToolDescriptor>,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingModule {
    pub fn new(domain: &str, tool_names: &[&str]) -> Self {
        let tools = tool_names
            .iter()
            .map(|name| {
                ToolDescriptor::new(
                    *name,
                    format!("stub tool {}", name),
                    InputSchema::new(vec![ParamSpec::string("location", "Where").required()]),
                )
            })
            .collect();
        Self {
            domain: domain.to_string(),
            tools,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolModule for RecordingModule {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn handle(&self, name: &str, args: Arguments) -> Result<Value, ToolError> {
        if !self.tools.iter().any(|t| t.name == name) {
            return Err(ToolError::unknown(name));
        }
        self.calls.lock().unwrap().push(name.to_string());
        Ok(json!({
            "handled_by": self.domain,
            "tool": name,
            "location": args.str("location")?,
        }))
    }
}

/// Fails with a transient error a fixed number of times, then serves
/// synthetic data.
pub struct FlakyAgriculture {
    failures_left: AtomicU32,
    pub attempts: AtomicU32,
    inner: SyntheticAgriculture,
}

impl FlakyAgriculture {
    pub fn new(failures: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            attempts: AtomicU32::new(0),
            inner: SyntheticAgriculture::new(Sampler::new("flaky")),
        }
    }

    fn trip(&self) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("connection reset by weather service");
        }
        Ok(())
    }
}

#[async_trait]
impl AgriculturalSource for FlakyAgriculture {
    async fn forecast(&self, location: &str, days: u32) -> Result<Vec<DailyWeather>> {
        self.trip()?;
        self.inner.forecast(location, days).await
    }

    async fn crop_outlook(&self, crop: &str, region: &str, season: Season) -> Result<CropOutlook> {
        self.trip()?;
        self.inner.crop_outlook(crop, region, season).await
    }

    async fn market_prices(
        &self,
        commodity: &str,
        market: &str,
        currency: Currency,
    ) -> Result<Vec<PricePoint>> {
        self.trip()?;
        self.inner.market_prices(commodity, market, currency).await
    }
}

/// Never answers.
pub struct StalledAgriculture;

#[async_trait]
impl AgriculturalSource for StalledAgriculture {
    async fn forecast(&self, _location: &str, _days: u32) -> Result<Vec<DailyWeather>> {
        std::future::pending().await
    }

    async fn crop_outlook(&self, _crop: &str, _region: &str, _season: Season) -> Result<CropOutlook> {
        std::future::pending().await
    }

    async fn market_prices(
        &self,
        _commodity: &str,
        _market: &str,
        _currency: Currency,
    ) -> Result<Vec<PricePoint>> {
        std::future::pending().await
    }
}
