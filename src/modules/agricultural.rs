//! Farming tools: weather outlooks, crop yield predictions and market prices.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use super::sample::{Sampler, round_to};
use super::{Currency, announce_api_key, module_timeout};
use crate::config::{HubConfig, ModuleConfig};
use crate::error::ToolError;
use crate::runtime::{RetryConfig, retry_with_backoff};
use crate::tools::{Arguments, InputSchema, ParamSpec, ToolDescriptor, ToolModule};

pub const WEATHER_FORECAST: &str = "agricultural_weather_forecast";
pub const CROP_PREDICTION: &str = "agricultural_crop_prediction";
pub const MARKET_PRICES: &str = "agricultural_market_prices";

const MAX_FORECAST_DAYS: i64 = 14;

// ── Source data ───────────────────────────────────────────────────────────────

/// One day of a local forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyWeather {
    pub date: NaiveDate,
    pub condition: String,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub rainfall_mm: f64,
    pub humidity_pct: f64,
}

/// Expected harvest for one crop in one region and season
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropOutlook {
    pub yield_tonnes_per_hectare: f64,
    pub confidence: f64,
    pub risks: Vec<String>,
}

/// Weekly average price, oldest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub week: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Rainy,
    Dry,
}

impl Season {
    fn parse(raw: &str) -> Result<Self, ToolError> {
        match raw {
            "rainy" => Ok(Self::Rainy),
            "dry" => Ok(Self::Dry),
            other => Err(ToolError::invalid(format!("unknown season: {}", other))),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Rainy => "rainy",
            Self::Dry => "dry",
        }
    }

    fn planting_window(self) -> &'static str {
        match self {
            Self::Rainy => "April - June",
            Self::Dry => "November - January (irrigated plots)",
        }
    }
}

/// Where agricultural observations come from
#[async_trait]
pub trait AgriculturalSource: Send + Sync {
    async fn forecast(&self, location: &str, days: u32) -> Result<Vec<DailyWeather>>;

    async fn crop_outlook(&self, crop: &str, region: &str, season: Season) -> Result<CropOutlook>;

    async fn market_prices(
        &self,
        commodity: &str,
        market: &str,
        currency: Currency,
    ) -> Result<Vec<PricePoint>>;
}

// ── Synthetic source ──────────────────────────────────────────────────────────

/// Deterministic stand-in for weather and market feeds
pub struct SyntheticAgriculture {
    sampler: Sampler,
    /// First forecast day; today (UTC) when unset
    start: Option<NaiveDate>,
}

impl SyntheticAgriculture {
    pub fn new(sampler: Sampler) -> Self {
        Self {
            sampler,
            start: None,
        }
    }

    /// Pin the first forecast day instead of following the clock
    pub fn starting_on(mut self, date: NaiveDate) -> Self {
        self.start = Some(date);
        self
    }
}

fn base_yield(crop: &str) -> f64 {
    match crop.to_lowercase().as_str() {
        "rice" => 2.0,
        "cassava" => 9.0,
        "maize" | "corn" => 1.8,
        "cocoa" => 0.5,
        "coffee" => 0.6,
        "rubber" => 1.2,
        "plantain" => 6.5,
        _ => 1.5,
    }
}

fn base_price_usd(commodity: &str) -> f64 {
    match commodity.to_lowercase().as_str() {
        "rice" => 0.9,
        "cassava" => 0.35,
        "palm oil" => 1.4,
        "cocoa" => 2.6,
        "coffee" => 3.1,
        "rubber" => 1.7,
        "pepper" => 2.0,
        _ => 1.0,
    }
}

#[async_trait]
impl AgriculturalSource for SyntheticAgriculture {
    async fn forecast(&self, location: &str, days: u32) -> Result<Vec<DailyWeather>> {
        let today = self.start.unwrap_or_else(|| Utc::now().date_naive());
        let mut forecast = Vec::with_capacity(days as usize);

        for offset in 0..days {
            let day = offset.to_string();
            let key = |field: &'static str| [location, day.as_str(), field];

            let rainfall = if self.sampler.unit(&key("rain-chance")) < 0.45 {
                round_to(self.sampler.range(&key("rain"), 1.0, 40.0), 1)
            } else {
                0.0
            };
            let condition = if rainfall > 20.0 {
                "heavy rain"
            } else if rainfall > 0.0 {
                "light rain"
            } else {
                self.sampler
                    .pick(&key("sky"), &["sunny", "partly cloudy"])
                    .copied()
                    .unwrap_or("sunny")
            };
            let min_temp = round_to(self.sampler.range(&key("min"), 21.0, 25.0), 1);
            let max_temp = round_to(min_temp + self.sampler.range(&key("spread"), 6.0, 11.0), 1);
            let humidity = if rainfall > 0.0 {
                self.sampler.range(&key("humidity"), 80.0, 97.0)
            } else {
                self.sampler.range(&key("humidity"), 60.0, 82.0)
            };

            forecast.push(DailyWeather {
                date: today
                    .checked_add_days(Days::new(u64::from(offset)))
                    .unwrap_or(today),
                condition: condition.to_string(),
                min_temp_c: min_temp,
                max_temp_c: max_temp,
                rainfall_mm: rainfall,
                humidity_pct: round_to(humidity, 0),
            });
        }

        Ok(forecast)
    }

    async fn crop_outlook(&self, crop: &str, region: &str, season: Season) -> Result<CropOutlook> {
        let key = |field: &'static str| [crop, region, season.as_str(), field];

        let season_factor = match season {
            Season::Rainy => 1.0,
            Season::Dry => 0.7,
        };
        let variation = self.sampler.range(&key("yield"), 0.85, 1.15);
        let confidence = self.sampler.range(&key("confidence"), 0.6, 0.9);

        let candidates: &[&str] = match season {
            Season::Rainy => &[
                "Waterlogging on low-lying plots",
                "Fungal disease pressure from sustained humidity",
                "Fall armyworm outbreaks",
            ],
            Season::Dry => &[
                "Soil moisture deficit without irrigation",
                "Harmattan dust reducing pollination",
                "Bush fires near field edges",
            ],
        };
        let risks = candidates
            .iter()
            .enumerate()
            .filter(|(i, _)| self.sampler.unit(&key(RISK_KEYS[*i])) < 0.6)
            .map(|(_, r)| r.to_string())
            .collect();

        Ok(CropOutlook {
            yield_tonnes_per_hectare: round_to(base_yield(crop) * season_factor * variation, 2),
            confidence: round_to(confidence, 2),
            risks,
        })
    }

    async fn market_prices(
        &self,
        commodity: &str,
        market: &str,
        currency: Currency,
    ) -> Result<Vec<PricePoint>> {
        let base = base_price_usd(commodity) * currency.per_usd();
        Ok((1..=4u32)
            .map(|week| {
                let label = week.to_string();
                let factor = self
                    .sampler
                    .range(&[commodity, market, label.as_str()], 0.9, 1.1);
                PricePoint {
                    week,
                    price: round_to(base * factor, 2),
                }
            })
            .collect())
    }
}

const RISK_KEYS: [&str; 3] = ["risk-0", "risk-1", "risk-2"];

// ── Derived advice ────────────────────────────────────────────────────────────

/// Field advice for a forecast
pub fn recommendations(forecast: &[DailyWeather]) -> Vec<String> {
    let mut advice = Vec::new();

    let total_rain: f64 = forecast.iter().map(|d| d.rainfall_mm).sum();
    let rainy_days = forecast.iter().filter(|d| d.rainfall_mm > 0.0).count();
    let hottest = forecast.iter().map(|d| d.max_temp_c).fold(f64::MIN, f64::max);

    if total_rain > 50.0 {
        advice.push(
            "Heavy rainfall expected: postpone fertilizer application and clear drainage channels"
                .to_string(),
        );
    }
    if rainy_days == 0 && !forecast.is_empty() {
        advice.push("Dry spell ahead: prioritize irrigation for seedlings and nurseries".to_string());
    }
    if hottest > 33.0 {
        advice.push(
            "High temperatures forecast: irrigate early morning or late evening".to_string(),
        );
    }
    if advice.is_empty() {
        advice.push("Conditions favourable for planting and routine field work".to_string());
    }

    advice
}

/// Direction of the price series: more than 5% change between the first and
/// last week counts as a trend
pub fn price_trend(prices: &[PricePoint]) -> &'static str {
    let (Some(first), Some(last)) = (prices.first(), prices.last()) else {
        return "stable";
    };
    if first.price <= 0.0 {
        return "stable";
    }
    let change = (last.price - first.price) / first.price;
    if change > 0.05 {
        "rising"
    } else if change < -0.05 {
        "falling"
    } else {
        "stable"
    }
}

fn price_advice(trend: &str) -> &'static str {
    match trend {
        "rising" => "Prices are rising: consider holding stock if storage allows",
        "falling" => "Prices are falling: sell early or compare nearby markets",
        _ => "Prices are stable: sell on your normal schedule",
    }
}

// ── Module ────────────────────────────────────────────────────────────────────

fn catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            WEATHER_FORECAST,
            "Get a daily weather forecast with farming recommendations for a location",
            InputSchema::new(vec![
                ParamSpec::string("location", "Town, county or region to forecast").required(),
                ParamSpec::integer("days", "Number of days to forecast (1-14)").with_default(7),
            ]),
        ),
        ToolDescriptor::new(
            CROP_PREDICTION,
            "Predict crop yield for a region and season, with risk factors",
            InputSchema::new(vec![
                ParamSpec::string("crop", "Crop name, e.g. rice or cassava").required(),
                ParamSpec::string("region", "Growing region or county").required(),
                ParamSpec::string("season", "Growing season")
                    .one_of(["rainy", "dry"])
                    .with_default("rainy"),
                ParamSpec::number("farm_size_hectares", "Cultivated area in hectares")
                    .with_default(1.0),
            ]),
        ),
        ToolDescriptor::new(
            MARKET_PRICES,
            "Recent weekly prices for an agricultural commodity, with trend and selling advice",
            InputSchema::new(vec![
                ParamSpec::string("commodity", "Commodity, e.g. rice or palm oil").required(),
                ParamSpec::string("market", "Market town").with_default("Monrovia"),
                ParamSpec::string("currency", "Price currency")
                    .one_of(["USD", "LRD"])
                    .with_default("USD"),
            ]),
        ),
    ]
}

/// Farming tools backed by an [`AgriculturalSource`]
pub struct AgriculturalModule {
    tools: Vec<ToolDescriptor>,
    source: Arc<dyn AgriculturalSource>,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

impl AgriculturalModule {
    pub const DOMAIN: &'static str = "agricultural";

    pub fn new(config: &ModuleConfig, retry: RetryConfig, source: Arc<dyn AgriculturalSource>) -> Self {
        announce_api_key(Self::DOMAIN, config);
        Self {
            tools: catalog(),
            source,
            retry,
            timeout: module_timeout(config),
        }
    }

    /// Module answering from [`SyntheticAgriculture`]
    pub fn synthetic(hub: &HubConfig) -> Self {
        let source = SyntheticAgriculture::new(Sampler::new(hub.seed.clone()));
        Self::new(
            &hub.modules.agricultural,
            hub.retry.clone().into(),
            Arc::new(source),
        )
    }

    async fn weather_forecast(&self, args: &Arguments) -> Result<Value, ToolError> {
        let location = args.str("location")?;
        let days = args.i64("days")?;
        if !(1..=MAX_FORECAST_DAYS).contains(&days) {
            return Err(ToolError::invalid(format!(
                "days must be between 1 and {}, got {}",
                MAX_FORECAST_DAYS, days
            )));
        }
        let days = days as u32;

        let source = self.source.as_ref();
        let forecast = retry_with_backoff(&self.retry, "agricultural.forecast", move || {
            source.forecast(location, days)
        })
        .await?;

        let entries: Vec<Value> = forecast
            .iter()
            .enumerate()
            .map(|(i, d)| {
                json!({
                    "day": i + 1,
                    "date": d.date,
                    "condition": d.condition,
                    "temperature_c": { "min": d.min_temp_c, "max": d.max_temp_c },
                    "rainfall_mm": d.rainfall_mm,
                    "humidity_pct": d.humidity_pct,
                })
            })
            .collect();

        Ok(json!({
            "location": location,
            "days": days,
            "forecast": entries,
            "recommendations": recommendations(&forecast),
        }))
    }

    async fn crop_prediction(&self, args: &Arguments) -> Result<Value, ToolError> {
        let crop = args.str("crop")?;
        let region = args.str("region")?;
        let season = Season::parse(args.str("season")?)?;
        let farm_size = args.f64("farm_size_hectares")?;
        if farm_size <= 0.0 {
            return Err(ToolError::invalid("farm_size_hectares must be positive"));
        }

        let source = self.source.as_ref();
        let outlook = retry_with_backoff(&self.retry, "agricultural.crop_outlook", move || {
            source.crop_outlook(crop, region, season)
        })
        .await?;

        Ok(json!({
            "crop": crop,
            "region": region,
            "season": season.as_str(),
            "farm_size_hectares": farm_size,
            "expected_yield_tonnes_per_hectare": outlook.yield_tonnes_per_hectare,
            "total_expected_tonnes": round_to(outlook.yield_tonnes_per_hectare * farm_size, 2),
            "confidence": outlook.confidence,
            "planting_window": season.planting_window(),
            "risk_factors": outlook.risks,
        }))
    }

    async fn market_prices(&self, args: &Arguments) -> Result<Value, ToolError> {
        let commodity = args.str("commodity")?;
        let market = args.str("market")?;
        let currency = Currency::parse(args.str("currency")?)?;

        let source = self.source.as_ref();
        let prices = retry_with_backoff(&self.retry, "agricultural.market_prices", move || {
            source.market_prices(commodity, market, currency)
        })
        .await?;

        let average = if prices.is_empty() {
            0.0
        } else {
            prices.iter().map(|p| p.price).sum::<f64>() / prices.len() as f64
        };
        let trend = price_trend(&prices);

        Ok(json!({
            "commodity": commodity,
            "market": market,
            "currency": currency.code(),
            "unit": "kg",
            "prices": prices,
            "average_price": round_to(average, 2),
            "trend": trend,
            "advice": price_advice(trend),
        }))
    }
}

#[async_trait]
impl ToolModule for AgriculturalModule {
    fn domain(&self) -> &str {
        Self::DOMAIN
    }

    fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn handle(&self, name: &str, args: Arguments) -> Result<Value, ToolError> {
        match name {
            WEATHER_FORECAST => self.weather_forecast(&args).await,
            CROP_PREDICTION => self.crop_prediction(&args).await,
            MARKET_PRICES => self.market_prices(&args).await,
            _ => Err(ToolError::unknown(name)),
        }
    }

    fn call_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
