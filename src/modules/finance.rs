//! Finance tools: mobile money providers, exchange rates and microloan checks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::sample::{Sampler, round_to};
use super::{LRD_PER_USD, announce_api_key, module_timeout};
use crate::config::{HubConfig, ModuleConfig};
use crate::error::ToolError;
use crate::runtime::{RetryConfig, retry_with_backoff};
use crate::tools::{Arguments, InputSchema, ParamSpec, ToolDescriptor, ToolModule};

pub const MOBILE_MONEY_SERVICES: &str = "finance_mobile_money_services";
pub const EXCHANGE_RATES: &str = "finance_exchange_rates";
pub const MICROLOAN_ELIGIBILITY: &str = "finance_microloan_eligibility";

/// Highest share of monthly income a repayment may take
pub const MAX_DEBT_TO_INCOME: f64 = 0.35;
/// Loans are capped at this many months of income
pub const MAX_INCOME_MULTIPLE: f64 = 12.0;
pub const MAX_TERM_MONTHS: i64 = 60;

/// Reference mid-market rates, units per US dollar
const REFERENCE_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("LRD", LRD_PER_USD),
    ("NGN", 1550.0),
    ("GHS", 15.5),
    ("XOF", 600.0),
    ("SLE", 22.5),
    ("KES", 129.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
];

// ── Source data ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobileMoneyProvider {
    pub name: String,
    pub transfer_fee_pct: f64,
    pub daily_limit_usd: f64,
    pub agent_coverage: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LendingTerms {
    pub annual_interest_rate_pct: f64,
}

/// Where financial data comes from
#[async_trait]
pub trait FinanceSource: Send + Sync {
    async fn mobile_money_providers(&self, country: &str) -> Result<Vec<MobileMoneyProvider>>;

    /// Units of `currency` per US dollar, `None` for unknown codes
    async fn usd_rate(&self, currency: &str) -> Result<Option<f64>>;

    async fn lending_terms(&self, country: &str) -> Result<LendingTerms>;
}

// ── Synthetic source ──────────────────────────────────────────────────────────

/// Deterministic market data derived from a [`Sampler`]
#[derive(Debug, Clone)]
pub struct SyntheticFinance {
    sampler: Sampler,
}

impl SyntheticFinance {
    pub fn new(sampler: Sampler) -> Self {
        Self { sampler }
    }
}

fn operators(country: &str) -> &'static [&'static str] {
    match country.trim().to_lowercase().as_str() {
        "liberia" => &["Orange Money", "Lonestar MTN MoMo"],
        "nigeria" => &["OPay", "PalmPay", "MoMo PSB"],
        "ghana" => &["MTN MoMo", "Telecel Cash", "AirtelTigo Money"],
        "sierra leone" => &["Orange Money", "Afrimoney"],
        "senegal" => &["Orange Money", "Wave", "Free Money"],
        "kenya" => &["M-Pesa", "Airtel Money"],
        _ => &[],
    }
}

#[async_trait]
impl FinanceSource for SyntheticFinance {
    async fn mobile_money_providers(&self, country: &str) -> Result<Vec<MobileMoneyProvider>> {
        let coverage = ["urban", "national", "national and rural"];
        Ok(operators(country)
            .iter()
            .map(|&name| MobileMoneyProvider {
                name: name.to_string(),
                transfer_fee_pct: round_to(
                    self.sampler.range(&["momo-fee", country, name], 0.5, 3.5),
                    2,
                ),
                daily_limit_usd: (self.sampler.int(&["momo-limit", country, name], 5, 40) * 100)
                    as f64,
                agent_coverage: self
                    .sampler
                    .pick(&["momo-coverage", country, name], &coverage)
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn usd_rate(&self, currency: &str) -> Result<Option<f64>> {
        let code = currency.to_uppercase();
        Ok(REFERENCE_RATES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(c, rate)| {
                if *c == "USD" {
                    return *rate;
                }
                let drift = self.sampler.range(&["fx", *c], -0.01, 0.01);
                rate * (1.0 + drift)
            }))
    }

    async fn lending_terms(&self, country: &str) -> Result<LendingTerms> {
        Ok(LendingTerms {
            annual_interest_rate_pct: round_to(
                self.sampler.range(&["loan-rate", country], 18.0, 32.0),
                1,
            ),
        })
    }
}

// ── Loan arithmetic ───────────────────────────────────────────────────────────

/// Fixed monthly payment of an amortized loan
pub fn monthly_repayment(principal: f64, annual_rate_pct: f64, months: i64) -> f64 {
    let n = months as f64;
    let r = annual_rate_pct / 100.0 / 12.0;
    if r == 0.0 {
        return principal / n;
    }
    principal * r / (1.0 - (1.0 + r).powf(-n))
}

/// Largest principal whose repayment fits in `payment`
pub fn affordable_principal(payment: f64, annual_rate_pct: f64, months: i64) -> f64 {
    let n = months as f64;
    let r = annual_rate_pct / 100.0 / 12.0;
    if r == 0.0 {
        return payment * n;
    }
    payment * (1.0 - (1.0 + r).powf(-n)) / r
}

// ── Module ────────────────────────────────────────────────────────────────────

fn catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            MOBILE_MONEY_SERVICES,
            "Mobile money providers in a country with fees and limits",
            InputSchema::new(vec![ParamSpec::string("country", "Country name").required()]),
        ),
        ToolDescriptor::new(
            EXCHANGE_RATES,
            "Exchange rates from a base currency, with an amount converted",
            InputSchema::new(vec![
                ParamSpec::string("base_currency", "ISO currency code").with_default("USD"),
                ParamSpec::array("target_currencies", "ISO currency codes to quote")
                    .with_default(json!(["LRD", "NGN", "GHS"])),
                ParamSpec::number("amount", "Amount of base currency to convert").with_default(1.0),
            ]),
        ),
        ToolDescriptor::new(
            MICROLOAN_ELIGIBILITY,
            "Check whether a monthly income supports a microloan",
            InputSchema::new(vec![
                ParamSpec::number("monthly_income", "Monthly income in USD").required(),
                ParamSpec::number("loan_amount", "Requested principal in USD").required(),
                ParamSpec::integer("term_months", "Repayment term in months").with_default(12),
                ParamSpec::string("country", "Country of the borrower").with_default("Liberia"),
            ]),
        ),
    ]
}

/// Finance tools backed by a [`FinanceSource`]
pub struct FinanceModule {
    tools: Vec<ToolDescriptor>,
    source: Arc<dyn FinanceSource>,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

impl FinanceModule {
    pub const DOMAIN: &'static str = "finance";

    pub fn new(config: &ModuleConfig, retry: RetryConfig, source: Arc<dyn FinanceSource>) -> Self {
        announce_api_key(Self::DOMAIN, config);
        Self {
            tools: catalog(),
            source,
            retry,
            timeout: module_timeout(config),
        }
    }

    /// Module answering from deterministic synthetic data
    pub fn synthetic(hub: &HubConfig) -> Self {
        let source = SyntheticFinance::new(Sampler::new(hub.seed.clone()));
        Self::new(
            &hub.modules.finance,
            hub.retry.clone().into(),
            Arc::new(source),
        )
    }

    async fn rate(&self, currency: &str) -> Result<f64, ToolError> {
        let source = self.source.as_ref();
        retry_with_backoff(&self.retry, "finance.usd_rate", move || {
            source.usd_rate(currency)
        })
        .await?
        .ok_or_else(|| ToolError::invalid(format!("unsupported currency: {}", currency)))
    }

    async fn mobile_money_services(&self, args: &Arguments) -> Result<Value, ToolError> {
        let country = args.str("country")?;

        let source = self.source.as_ref();
        let providers = retry_with_backoff(&self.retry, "finance.mobile_money", move || {
            source.mobile_money_providers(country)
        })
        .await?;

        let cheapest = providers
            .iter()
            .min_by(|a, b| a.transfer_fee_pct.total_cmp(&b.transfer_fee_pct))
            .map(|p| p.name.clone());

        let mut out = json!({
            "country": country,
            "providers": providers,
            "cheapest_provider": cheapest,
        });
        if providers.is_empty() {
            out["note"] = json!(format!("No mobile money data available for {}", country));
        }
        Ok(out)
    }

    async fn exchange_rates(&self, args: &Arguments) -> Result<Value, ToolError> {
        let base = args.str("base_currency")?.to_uppercase();
        let targets = args.string_list("target_currencies")?;
        let amount = args.f64("amount")?;
        if amount < 0.0 {
            return Err(ToolError::invalid("amount must not be negative"));
        }

        let base_per_usd = self.rate(&base).await?;

        let mut rates = Map::new();
        let mut converted = Map::new();
        for target in targets {
            let target = target.to_uppercase();
            let rate = self.rate(&target).await? / base_per_usd;
            rates.insert(target.clone(), json!(round_to(rate, 6)));
            converted.insert(target, json!(round_to(rate * amount, 2)));
        }

        Ok(json!({
            "base_currency": base,
            "amount": amount,
            "rates": rates,
            "converted": converted,
        }))
    }

    async fn microloan_eligibility(&self, args: &Arguments) -> Result<Value, ToolError> {
        let income = args.f64("monthly_income")?;
        let loan = args.f64("loan_amount")?;
        let term = args.i64("term_months")?;
        let country = args.str("country")?;

        if income <= 0.0 {
            return Err(ToolError::invalid("monthly_income must be positive"));
        }
        if loan <= 0.0 {
            return Err(ToolError::invalid("loan_amount must be positive"));
        }
        if !(1..=MAX_TERM_MONTHS).contains(&term) {
            return Err(ToolError::invalid(format!(
                "term_months must be between 1 and {}, got {}",
                MAX_TERM_MONTHS, term
            )));
        }

        let source = self.source.as_ref();
        let terms = retry_with_backoff(&self.retry, "finance.lending_terms", move || {
            source.lending_terms(country)
        })
        .await?;
        let rate = terms.annual_interest_rate_pct;

        let repayment = monthly_repayment(loan, rate, term);
        let debt_to_income = repayment / income;
        let income_cap = income * MAX_INCOME_MULTIPLE;
        let max_loan = affordable_principal(income * MAX_DEBT_TO_INCOME, rate, term).min(income_cap);

        let mut reasons = Vec::new();
        if debt_to_income > MAX_DEBT_TO_INCOME {
            reasons.push(format!(
                "monthly repayment of {:.2} exceeds {:.0}% of income",
                repayment,
                MAX_DEBT_TO_INCOME * 100.0
            ));
        }
        if loan > income_cap {
            reasons.push(format!(
                "loan exceeds {} months of income",
                MAX_INCOME_MULTIPLE
            ));
        }

        Ok(json!({
            "eligible": reasons.is_empty(),
            "country": country,
            "term_months": term,
            "interest_rate_pct": rate,
            "monthly_repayment": round_to(repayment, 2),
            "debt_to_income_pct": round_to(debt_to_income * 100.0, 1),
            "max_loan_amount": round_to(max_loan, 2),
            "reasons": reasons,
        }))
    }
}

#[async_trait]
impl ToolModule for FinanceModule {
    fn domain(&self) -> &str {
        Self::DOMAIN
    }

    fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn handle(&self, name: &str, args: Arguments) -> Result<Value, ToolError> {
        match name {
            MOBILE_MONEY_SERVICES => self.mobile_money_services(&args).await,
            EXCHANGE_RATES => self.exchange_rates(&args).await,
            MICROLOAN_ELIGIBILITY => self.microloan_eligibility(&args).await,
            _ => Err(ToolError::unknown(name)),
        }
    }

    fn call_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
