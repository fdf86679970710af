//! Cross-border trade tools: route planning, customs rules and market analysis.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use super::sample::{Sampler, round_to};
use super::{announce_api_key, module_timeout};
use crate::config::{HubConfig, ModuleConfig};
use crate::error::ToolError;
use crate::runtime::{RetryConfig, retry_with_backoff};
use crate::tools::{Arguments, InputSchema, ParamSpec, ToolDescriptor, ToolModule};

pub const ROUTE_OPTIMIZATION: &str = "trade_route_optimization";
pub const CUSTOMS_REGULATIONS: &str = "trade_customs_regulations";
pub const MARKET_ANALYSIS: &str = "trade_market_analysis";

const ECOWAS_MEMBERS: &[&str] = &[
    "benin",
    "cabo verde",
    "cape verde",
    "cote d'ivoire",
    "côte d'ivoire",
    "ivory coast",
    "gambia",
    "ghana",
    "guinea",
    "guinea-bissau",
    "liberia",
    "nigeria",
    "senegal",
    "sierra leone",
    "togo",
];

const OTHER_AFCFTA_MEMBERS: &[&str] = &[
    "cameroon",
    "egypt",
    "ethiopia",
    "kenya",
    "morocco",
    "rwanda",
    "south africa",
    "tanzania",
    "uganda",
];

fn is_ecowas(country: &str) -> bool {
    ECOWAS_MEMBERS.contains(&country.trim().to_lowercase().as_str())
}

fn is_afcfta(country: &str) -> bool {
    is_ecowas(country) || OTHER_AFCFTA_MEMBERS.contains(&country.trim().to_lowercase().as_str())
}

// ── Source data ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Road,
    Sea,
    Air,
    Rail,
}

impl TransportMode {
    fn parse(raw: &str) -> Result<Self, ToolError> {
        match raw {
            "road" => Ok(Self::Road),
            "sea" => Ok(Self::Sea),
            "air" => Ok(Self::Air),
            "rail" => Ok(Self::Rail),
            other => Err(ToolError::invalid(format!("unknown transport mode: {}", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Road => "road",
            Self::Sea => "sea",
            Self::Air => "air",
            Self::Rail => "rail",
        }
    }

    fn km_per_day(self) -> f64 {
        match self {
            Self::Road => 400.0,
            Self::Sea => 500.0,
            Self::Air => 5000.0,
            Self::Rail => 350.0,
        }
    }

    fn usd_per_km(self) -> f64 {
        match self {
            Self::Road => 1.2,
            Self::Sea => 0.4,
            Self::Air => 4.5,
            Self::Rail => 0.8,
        }
    }

    /// Loading, clearance and transfer time on top of travel
    fn handling_days(self) -> u32 {
        match self {
            Self::Road => 1,
            Self::Sea => 3,
            Self::Air => 1,
            Self::Rail => 2,
        }
    }

    fn hubs(self) -> &'static [&'static str] {
        match self {
            Self::Road => &["Ganta", "Gbarnga", "Abidjan"],
            Self::Sea => &["Port of Monrovia", "Port of Tema", "Apapa (Lagos)"],
            Self::Air => &["Roberts International", "Kotoka International", "Murtala Muhammed"],
            Self::Rail => &["Yekepa line", "Buchanan line"],
        }
    }
}

/// One candidate route between two places
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteOption {
    pub name: String,
    pub via: Vec<String>,
    pub distance_km: f64,
    pub estimated_days: u32,
    pub estimated_cost_usd: f64,
}

/// Tariff and paperwork a destination applies to a product category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomsProfile {
    pub base_tariff_pct: f64,
    pub required_documents: Vec<String>,
}

/// Demand and competition for a product in a market
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub demand_index: u32,
    pub competitor_count: u32,
    pub average_price_usd: f64,
}

/// Where trade observations come from
#[async_trait]
pub trait TradeSource: Send + Sync {
    async fn routes(
        &self,
        origin: &str,
        destination: &str,
        mode: TransportMode,
    ) -> Result<Vec<RouteOption>>;

    async fn customs_profile(
        &self,
        destination_country: &str,
        product_category: &str,
    ) -> Result<CustomsProfile>;

    async fn market_snapshot(&self, product: &str, target_market: &str) -> Result<MarketSnapshot>;
}

// ── Synthetic source ──────────────────────────────────────────────────────────

/// Deterministic stand-in for freight and customs data
pub struct SyntheticTrade {
    sampler: Sampler,
}

impl SyntheticTrade {
    pub fn new(sampler: Sampler) -> Self {
        Self { sampler }
    }

    fn route(&self, name: &str, via: Vec<String>, distance_km: f64, mode: TransportMode, discount: f64) -> RouteOption {
        let travel_days = (distance_km / mode.km_per_day()).ceil() as u32;
        RouteOption {
            name: name.to_string(),
            via,
            distance_km: round_to(distance_km, 0),
            estimated_days: travel_days.max(1) + mode.handling_days(),
            estimated_cost_usd: round_to(distance_km * mode.usd_per_km() * discount, 2),
        }
    }
}

#[async_trait]
impl TradeSource for SyntheticTrade {
    async fn routes(
        &self,
        origin: &str,
        destination: &str,
        mode: TransportMode,
    ) -> Result<Vec<RouteOption>> {
        let key = |field: &'static str| [origin, destination, mode.as_str(), field];
        let direct = self.sampler.range(&key("distance"), 200.0, 3000.0);

        let mut options = vec![self.route("direct", Vec::new(), direct, mode, 1.0)];
        for (i, hub) in mode.hubs().iter().take(2).enumerate() {
            let field = HUB_KEYS[i];
            let detour = self.sampler.range(&key(field), 1.1, 1.4);
            let discount = self.sampler.range(&key(DISCOUNT_KEYS[i]), 0.75, 0.95);
            options.push(self.route(
                &format!("via {}", hub),
                vec![hub.to_string()],
                direct * detour,
                mode,
                discount,
            ));
        }

        Ok(options)
    }

    async fn customs_profile(
        &self,
        destination_country: &str,
        product_category: &str,
    ) -> Result<CustomsProfile> {
        // ECOWAS common external tariff bands
        let base_tariff_pct = match product_category.to_lowercase().as_str() {
            "raw materials" => 5.0,
            "agricultural" => 10.0,
            "manufactured" => 20.0,
            "luxury" => 35.0,
            _ => 15.0,
        };

        let mut required_documents = vec![
            "Commercial invoice".to_string(),
            "Packing list".to_string(),
            "Certificate of origin".to_string(),
            "Bill of lading or air waybill".to_string(),
        ];
        if product_category.eq_ignore_ascii_case("agricultural") {
            required_documents.push("Phytosanitary certificate".to_string());
        }
        if self.sampler.unit(&[destination_country, product_category, "inspection"]) < 0.5 {
            required_documents.push("Pre-shipment inspection certificate".to_string());
        }

        Ok(CustomsProfile {
            base_tariff_pct,
            required_documents,
        })
    }

    async fn market_snapshot(&self, product: &str, target_market: &str) -> Result<MarketSnapshot> {
        let key = |field: &'static str| [product, target_market, field];
        Ok(MarketSnapshot {
            demand_index: self.sampler.int(&key("demand"), 10, 100) as u32,
            competitor_count: self.sampler.int(&key("competitors"), 3, 40) as u32,
            average_price_usd: round_to(self.sampler.range(&key("price"), 0.5, 25.0), 2),
        })
    }
}

const HUB_KEYS: [&str; 2] = ["hub-0", "hub-1"];
const DISCOUNT_KEYS: [&str; 2] = ["discount-0", "discount-1"];

// ── Derived decisions ─────────────────────────────────────────────────────────

/// Pick the cheapest route (ties broken by time), or the fastest (ties broken by cost)
pub fn recommend_route<'a>(routes: &'a [RouteOption], optimize_for: &str) -> Option<&'a RouteOption> {
    routes.iter().min_by(|a, b| {
        let by_cost = a.estimated_cost_usd.total_cmp(&b.estimated_cost_usd);
        let by_days = a.estimated_days.cmp(&b.estimated_days);
        if optimize_for == "time" {
            by_days.then(by_cost)
        } else {
            by_cost.then(by_days)
        }
    })
}

/// Rate a market from its demand and crowding
pub fn opportunity(snapshot: &MarketSnapshot) -> &'static str {
    if snapshot.demand_index >= 60 && snapshot.competitor_count < 15 {
        "high"
    } else if snapshot.demand_index >= 40 {
        "moderate"
    } else {
        "low"
    }
}

// ── Module ────────────────────────────────────────────────────────────────────

fn catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            ROUTE_OPTIMIZATION,
            "Compare shipping routes between two places and recommend one",
            InputSchema::new(vec![
                ParamSpec::string("origin", "Departure city or port").required(),
                ParamSpec::string("destination", "Arrival city or port").required(),
                ParamSpec::string("cargo_type", "Kind of cargo").with_default("general"),
                ParamSpec::string("transport_mode", "Mode of transport")
                    .one_of(["road", "sea", "air", "rail"])
                    .with_default("road"),
                ParamSpec::string("optimize_for", "What the recommendation minimizes")
                    .one_of(["cost", "time"])
                    .with_default("cost"),
            ]),
        ),
        ToolDescriptor::new(
            CUSTOMS_REGULATIONS,
            "Tariffs, documents and trade agreements for shipping goods between two countries",
            InputSchema::new(vec![
                ParamSpec::string("origin_country", "Exporting country").required(),
                ParamSpec::string("destination_country", "Importing country").required(),
                ParamSpec::string(
                    "product_category",
                    "Category: agricultural, raw materials, manufactured, luxury or general",
                )
                .with_default("general"),
            ]),
        ),
        ToolDescriptor::new(
            MARKET_ANALYSIS,
            "Demand, competition and price level for a product in a target market",
            InputSchema::new(vec![
                ParamSpec::string("product", "Product to sell").required(),
                ParamSpec::string("target_market", "Country or city to sell in").required(),
            ]),
        ),
    ]
}

/// Trade tools backed by a [`TradeSource`]
pub struct TradeModule {
    tools: Vec<ToolDescriptor>,
    source: Arc<dyn TradeSource>,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

impl TradeModule {
    pub const DOMAIN: &'static str = "trade";

    pub fn new(config: &ModuleConfig, retry: RetryConfig, source: Arc<dyn TradeSource>) -> Self {
        announce_api_key(Self::DOMAIN, config);
        Self {
            tools: catalog(),
            source,
            retry,
            timeout: module_timeout(config),
        }
    }

    /// Module answering from [`SyntheticTrade`]
    pub fn synthetic(hub: &HubConfig) -> Self {
        let source = SyntheticTrade::new(Sampler::new(hub.seed.clone()));
        Self::new(&hub.modules.trade, hub.retry.clone().into(), Arc::new(source))
    }

    async fn route_optimization(&self, args: &Arguments) -> Result<Value, ToolError> {
        let origin = args.str("origin")?;
        let destination = args.str("destination")?;
        if origin.trim().eq_ignore_ascii_case(destination.trim()) {
            return Err(ToolError::invalid("origin and destination must differ"));
        }
        let cargo_type = args.str("cargo_type")?;
        let mode = TransportMode::parse(args.str("transport_mode")?)?;
        let optimize_for = args.str("optimize_for")?;

        let source = self.source.as_ref();
        let routes = retry_with_backoff(&self.retry, "trade.routes", move || {
            source.routes(origin, destination, mode)
        })
        .await?;
        let recommended = recommend_route(&routes, optimize_for).map(|r| r.name.clone());

        Ok(json!({
            "origin": origin,
            "destination": destination,
            "cargo_type": cargo_type,
            "transport_mode": mode.as_str(),
            "optimize_for": optimize_for,
            "routes": routes,
            "recommended_route": recommended,
        }))
    }

    async fn customs_regulations(&self, args: &Arguments) -> Result<Value, ToolError> {
        let origin = args.str("origin_country")?;
        let destination = args.str("destination_country")?;
        let category = args.str("product_category")?;

        let source = self.source.as_ref();
        let profile = retry_with_backoff(&self.retry, "trade.customs_profile", move || {
            source.customs_profile(destination, category)
        })
        .await?;

        let ecowas_trade = is_ecowas(origin) && is_ecowas(destination);
        let mut agreements = Vec::new();
        let mut documents = profile.required_documents;
        let mut tariff = profile.base_tariff_pct;
        let notes;

        if ecowas_trade {
            agreements.push("ECOWAS Trade Liberalisation Scheme (ETLS)");
            documents.push("ECOWAS certificate of origin".to_string());
            let duty_free = ["agricultural", "raw materials"]
                .iter()
                .any(|c| category.eq_ignore_ascii_case(c));
            if duty_free {
                tariff = 0.0;
                notes = "Unprocessed goods move duty-free between ECOWAS members under the ETLS";
            } else {
                notes = "Industrial goods qualify for ETLS duty exemption only once the product is approved by the national ETLS committee";
            }
        } else {
            notes = "Standard import tariff applies; check for bilateral agreements before shipping";
        }
        if is_afcfta(origin) && is_afcfta(destination) {
            agreements.push("African Continental Free Trade Area (AfCFTA)");
        }

        Ok(json!({
            "origin_country": origin,
            "destination_country": destination,
            "product_category": category,
            "tariff_rate_pct": tariff,
            "required_documents": documents,
            "trade_agreements": agreements,
            "ecowas_trade": ecowas_trade,
            "notes": notes,
        }))
    }

    async fn market_analysis(&self, args: &Arguments) -> Result<Value, ToolError> {
        let product = args.str("product")?;
        let target_market = args.str("target_market")?;

        let source = self.source.as_ref();
        let snapshot = retry_with_backoff(&self.retry, "trade.market_snapshot", move || {
            source.market_snapshot(product, target_market)
        })
        .await?;

        Ok(json!({
            "product": product,
            "target_market": target_market,
            "demand_index": snapshot.demand_index,
            "competitor_count": snapshot.competitor_count,
            "average_price_usd": snapshot.average_price_usd,
            "opportunity": opportunity(&snapshot),
        }))
    }
}

#[async_trait]
impl ToolModule for TradeModule {
    fn domain(&self) -> &str {
        Self::DOMAIN
    }

    fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn handle(&self, name: &str, args: Arguments) -> Result<Value, ToolError> {
        match name {
            ROUTE_OPTIMIZATION => self.route_optimization(&args).await,
            CUSTOMS_REGULATIONS => self.customs_regulations(&args).await,
            MARKET_ANALYSIS => self.market_analysis(&args).await,
            _ => Err(ToolError::unknown(name)),
        }
    }

    fn call_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> TradeModule {
        TradeModule::synthetic(&HubConfig::default())
    }

    fn option(name: &str, days: u32, cost: f64) -> RouteOption {
        RouteOption {
            name: name.to_string(),
            via: Vec::new(),
            distance_km: 100.0,
            estimated_days: days,
            estimated_cost_usd: cost,
        }
    }

    #[test]
    fn recommends_by_cost_or_time() {
        let routes = vec![option("a", 5, 100.0), option("b", 2, 300.0), option("c", 5, 90.0)];
        assert_eq!(recommend_route(&routes, "cost").unwrap().name, "c");
        assert_eq!(recommend_route(&routes, "time").unwrap().name, "b");
        assert!(recommend_route(&[], "cost").is_none());
    }

    #[test]
    fn ties_fall_back_to_other_criterion() {
        let routes = vec![option("slow", 6, 100.0), option("fast", 3, 100.0)];
        assert_eq!(recommend_route(&routes, "cost").unwrap().name, "fast");
    }

    #[test]
    fn rates_opportunity() {
        let snapshot = |demand, competitors| MarketSnapshot {
            demand_index: demand,
            competitor_count: competitors,
            average_price_usd: 1.0,
        };
        assert_eq!(opportunity(&snapshot(80, 5)), "high");
        assert_eq!(opportunity(&snapshot(80, 30)), "moderate");
        assert_eq!(opportunity(&snapshot(20, 2)), "low");
    }

    #[test]
    fn membership_is_case_insensitive() {
        assert!(is_ecowas(" Liberia "));
        assert!(is_ecowas("NIGERIA"));
        assert!(!is_ecowas("Kenya"));
        assert!(is_afcfta("Kenya"));
        assert!(!is_afcfta("France"));
    }

    #[tokio::test]
    async fn ecowas_agricultural_goods_are_duty_free() {
        let out = module()
            .invoke(
                CUSTOMS_REGULATIONS,
                &json!({
                    "origin_country": "Liberia",
                    "destination_country": "Nigeria",
                    "product_category": "agricultural"
                }),
            )
            .await
            .unwrap();

        assert_eq!(out["origin_country"], "Liberia");
        assert_eq!(out["destination_country"], "Nigeria");
        assert_eq!(out["ecowas_trade"], true);
        assert_eq!(out["tariff_rate_pct"], 0.0);
        let documents = out["required_documents"].as_array().unwrap();
        assert!(documents.contains(&json!("Phytosanitary certificate")));
        assert!(documents.contains(&json!("ECOWAS certificate of origin")));
    }

    #[tokio::test]
    async fn non_member_pays_base_tariff() {
        let out = module()
            .invoke(
                CUSTOMS_REGULATIONS,
                &json!({"origin_country": "Liberia", "destination_country": "France"}),
            )
            .await
            .unwrap();

        assert_eq!(out["ecowas_trade"], false);
        assert_eq!(out["product_category"], "general");
        assert_eq!(out["tariff_rate_pct"], 15.0);
        assert_eq!(out["trade_agreements"], json!([]));
    }

    #[tokio::test]
    async fn route_optimization_recommends_one_of_its_routes() {
        let out = module()
            .invoke(
                ROUTE_OPTIMIZATION,
                &json!({"origin": "Monrovia", "destination": "Lagos", "transport_mode": "sea"}),
            )
            .await
            .unwrap();

        let routes = out["routes"].as_array().unwrap();
        assert_eq!(routes.len(), 3);
        let recommended = out["recommended_route"].as_str().unwrap();
        assert!(routes.iter().any(|r| r["name"] == recommended));
        assert_eq!(out["cargo_type"], "general");
        assert_eq!(out["optimize_for"], "cost");
    }

    #[tokio::test]
    async fn route_requires_distinct_endpoints() {
        let err = module()
            .invoke(
                ROUTE_OPTIMIZATION,
                &json!({"origin": "Monrovia", "destination": "monrovia"}),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[tokio::test]
    async fn market_analysis_stays_in_range() {
        let out = module()
            .invoke(
                MARKET_ANALYSIS,
                &json!({"product": "cocoa", "target_market": "Ghana"}),
            )
            .await
            .unwrap();
        let demand = out["demand_index"].as_u64().unwrap();
        assert!((10..=100).contains(&demand));
        assert!(["high", "moderate", "low"].contains(&out["opportunity"].as_str().unwrap()));
    }
}
