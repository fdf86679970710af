//! Culture tools: phrase translation, heritage sites and festival calendars.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use super::{announce_api_key, module_timeout};
use crate::config::{HubConfig, ModuleConfig};
use crate::error::ToolError;
use crate::runtime::{RetryConfig, retry_with_backoff};
use crate::tools::{Arguments, InputSchema, ParamSpec, ToolDescriptor, ToolModule};

pub const LANGUAGE_TRANSLATION: &str = "culture_language_translation";
pub const HERITAGE_SITES: &str = "culture_heritage_sites";
pub const CULTURAL_EVENTS: &str = "culture_cultural_events";

/// Language codes the glossary covers, in column order
pub const LANGUAGES: [&str; 6] = ["en", "fr", "yo", "ha", "ig", "sw"];

const GLOSSARY: &[[&str; 6]] = &[
    ["hello", "bonjour", "bawo ni", "sannu", "ndewo", "habari"],
    ["thank you", "merci", "e se", "na gode", "daalu", "asante"],
    ["good morning", "bonjour", "e kaaro", "ina kwana", "ututu oma", "habari za asubuhi"],
    ["welcome", "bienvenue", "e kaabo", "barka da zuwa", "nnoo", "karibu"],
    ["goodbye", "au revoir", "o dabo", "sai an jima", "ka o di", "kwaheri"],
    ["market", "marché", "oja", "kasuwa", "ahia", "soko"],
    ["water", "eau", "omi", "ruwa", "mmiri", "maji"],
    ["rice", "riz", "iresi", "shinkafa", "osikapa", "mchele"],
    ["how much", "combien", "elo ni", "nawa ne", "ole ego", "bei gani"],
];

// ── Source data ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeritageSite {
    pub name: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CulturalEvent {
    pub name: String,
    pub month: u32,
    pub description: String,
}

/// Where cultural reference data comes from
#[async_trait]
pub trait CultureSource: Send + Sync {
    /// `None` when the phrase is not covered
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Option<String>>;

    async fn heritage_sites(&self, country: &str) -> Result<Vec<HeritageSite>>;

    async fn cultural_events(&self, country: &str) -> Result<Vec<CulturalEvent>>;
}

// ── Glossary-backed source ────────────────────────────────────────────────────

/// Built-in phrase glossary and heritage catalog
#[derive(Debug, Default)]
pub struct SyntheticCulture;

impl SyntheticCulture {
    pub fn new() -> Self {
        Self
    }
}

fn column(code: &str) -> Option<usize> {
    LANGUAGES.iter().position(|l| *l == code)
}

fn normalize_phrase(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!', '?', ','])
        .to_lowercase()
}

fn site(name: &str, category: &str, description: &str) -> HeritageSite {
    HeritageSite {
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
    }
}

fn event(name: &str, month: u32, description: &str) -> CulturalEvent {
    CulturalEvent {
        name: name.to_string(),
        month,
        description: description.to_string(),
    }
}

#[async_trait]
impl CultureSource for SyntheticCulture {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Option<String>> {
        let (Some(from), Some(to)) = (column(source), column(target)) else {
            return Ok(None);
        };
        let phrase = normalize_phrase(text);
        Ok(GLOSSARY
            .iter()
            .find(|row| row[from] == phrase)
            .map(|row| row[to].to_string()))
    }

    async fn heritage_sites(&self, country: &str) -> Result<Vec<HeritageSite>> {
        let sites = match country.trim().to_lowercase().as_str() {
            "liberia" => vec![
                site("Providence Island", "historical", "Landing site of the first settlers in 1822"),
                site("Sapo National Park", "natural", "Largest protected rainforest in Liberia"),
                site("East Nimba Nature Reserve", "natural", "Montane forest on the Guinea border"),
                site("Kpatawee Waterfalls", "natural", "Waterfall and trails in Bong County"),
                site("Centennial Pavilion", "historical", "Monrovia venue of presidential inaugurations"),
            ],
            "nigeria" => vec![
                site("Osun-Osogbo Sacred Grove", "religious", "Sacred forest of the Yoruba goddess Osun"),
                site("Sukur Cultural Landscape", "historical", "Terraced hill settlement on the Mandara plateau"),
                site("Yankari National Park", "natural", "Savanna reserve with warm springs"),
                site("Benin Moats", "historical", "Earthworks surrounding the old Benin Kingdom capital"),
            ],
            "ghana" => vec![
                site("Cape Coast Castle", "historical", "Coastal fort central to the Atlantic slave trade"),
                site("Asante Traditional Buildings", "religious", "Shrines decorated with Adinkra relief"),
                site("Kakum National Park", "natural", "Rainforest with a canopy walkway"),
                site("Larabanga Mosque", "religious", "Sudano-Sahelian mud mosque"),
            ],
            "senegal" => vec![
                site("Island of Gorée", "historical", "Former slave-trading post off Dakar"),
                site("Great Mosque of Touba", "religious", "Centre of the Mouride brotherhood"),
                site("Niokolo-Koba National Park", "natural", "Gallery forests and savanna on the Gambia River"),
            ],
            "sierra leone" => vec![
                site("Bunce Island", "historical", "Slave-trading fort in the Sierra Leone River"),
                site("Tiwai Island", "natural", "Primate sanctuary on the Moa River"),
            ],
            "kenya" => vec![
                site("Lamu Old Town", "historical", "Oldest continuously inhabited Swahili settlement"),
                site("Sacred Mijikenda Kaya Forests", "religious", "Forest villages of the Mijikenda peoples"),
                site("Lake Turkana National Parks", "natural", "Desert lake with fossil sites"),
            ],
            _ => Vec::new(),
        };
        Ok(sites)
    }

    async fn cultural_events(&self, country: &str) -> Result<Vec<CulturalEvent>> {
        let events = match country.trim().to_lowercase().as_str() {
            "liberia" => vec![
                event("Decoration Day", 3, "Families clean and decorate the graves of relatives"),
                event("National Unification Day", 5, "Celebrates unity between all Liberian peoples"),
                event("Independence Day", 7, "Parades and celebrations for independence in 1847"),
                event("Flag Day", 8, "Honours the Lone Star flag"),
                event("Thanksgiving Day", 11, "Church services and family meals"),
            ],
            "nigeria" => vec![
                event("Argungu Fishing Festival", 3, "Fishing competition on the Sokoto River"),
                event("Osun-Osogbo Festival", 8, "Procession to the sacred grove of Osun"),
                event("Calabar Carnival", 12, "Month-long street carnival in Cross River State"),
            ],
            "ghana" => vec![
                event("Aboakyir Festival", 5, "Deer-hunting festival of the Effutu people"),
                event("PANAFEST", 7, "Pan-African historical theatre festival"),
                event("Homowo", 8, "Ga harvest festival that 'hoots at hunger'"),
            ],
            "senegal" => vec![
                event("Saint-Louis Jazz Festival", 5, "International jazz festival in Saint-Louis"),
                event("Dak'Art Biennale", 11, "Contemporary African art biennale in Dakar"),
            ],
            "sierra leone" => vec![
                event("Independence Day", 4, "Marks independence from Britain in 1961"),
                event("Lantern Parade", 12, "Illuminated float parade in Freetown"),
            ],
            "kenya" => vec![
                event("Mashujaa Day", 10, "Heroes' day honouring independence fighters"),
                event("Lamu Cultural Festival", 11, "Dhow races and Swahili arts on Lamu Island"),
            ],
            _ => Vec::new(),
        };
        Ok(events)
    }
}

// ── Module ────────────────────────────────────────────────────────────────────

fn catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            LANGUAGE_TRANSLATION,
            "Translate a common phrase between English, French, Yoruba, Hausa, Igbo and Swahili",
            InputSchema::new(vec![
                ParamSpec::string("text", "Phrase to translate").required(),
                ParamSpec::string("source_language", "Language code of the text")
                    .one_of(LANGUAGES)
                    .required(),
                ParamSpec::string("target_language", "Language code to translate into")
                    .one_of(LANGUAGES)
                    .required(),
            ]),
        ),
        ToolDescriptor::new(
            HERITAGE_SITES,
            "List heritage sites of a country, optionally filtered by category",
            InputSchema::new(vec![
                ParamSpec::string("country", "Country name").required(),
                ParamSpec::string("category", "Kind of site")
                    .one_of(["all", "historical", "natural", "religious"])
                    .with_default("all"),
            ]),
        ),
        ToolDescriptor::new(
            CULTURAL_EVENTS,
            "Festivals and national days of a country, optionally for one month",
            InputSchema::new(vec![
                ParamSpec::string("country", "Country name").required(),
                ParamSpec::integer("month", "Month number (1-12)"),
            ]),
        ),
    ]
}

/// Culture tools backed by a [`CultureSource`]
pub struct CultureModule {
    tools: Vec<ToolDescriptor>,
    source: Arc<dyn CultureSource>,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

impl CultureModule {
    pub const DOMAIN: &'static str = "culture";

    pub fn new(config: &ModuleConfig, retry: RetryConfig, source: Arc<dyn CultureSource>) -> Self {
        announce_api_key(Self::DOMAIN, config);
        Self {
            tools: catalog(),
            source,
            retry,
            timeout: module_timeout(config),
        }
    }

    /// Module answering from the built-in glossary and catalog
    pub fn synthetic(hub: &HubConfig) -> Self {
        Self::new(
            &hub.modules.culture,
            hub.retry.clone().into(),
            Arc::new(SyntheticCulture::new()),
        )
    }

    async fn language_translation(&self, args: &Arguments) -> Result<Value, ToolError> {
        let text = args.str("text")?;
        let source_language = args.str("source_language")?;
        let target_language = args.str("target_language")?;

        if source_language == target_language {
            return Ok(json!({
                "original_text": text,
                "source_language": source_language,
                "target_language": target_language,
                "translated_text": text,
                "method": "identity",
            }));
        }

        let source = self.source.as_ref();
        let translated = retry_with_backoff(&self.retry, "culture.translate", move || {
            source.translate(text, source_language, target_language)
        })
        .await?;

        let method = if translated.is_some() { "glossary" } else { "unavailable" };
        let mut out = json!({
            "original_text": text,
            "source_language": source_language,
            "target_language": target_language,
            "translated_text": translated,
            "method": method,
        });
        if translated.is_none() {
            out["note"] = json!("Phrase not found in the glossary; only common phrases are covered");
        }
        Ok(out)
    }

    async fn heritage_sites(&self, args: &Arguments) -> Result<Value, ToolError> {
        let country = args.str("country")?;
        let category = args.str("category")?;

        let source = self.source.as_ref();
        let sites = retry_with_backoff(&self.retry, "culture.heritage_sites", move || {
            source.heritage_sites(country)
        })
        .await?;

        let sites: Vec<HeritageSite> = sites
            .into_iter()
            .filter(|s| category == "all" || s.category == category)
            .collect();

        Ok(json!({
            "country": country,
            "category": category,
            "count": sites.len(),
            "sites": sites,
        }))
    }

    async fn cultural_events(&self, args: &Arguments) -> Result<Value, ToolError> {
        let country = args.str("country")?;
        let month = args.opt_i64("month");
        if let Some(m) = month {
            if !(1..=12).contains(&m) {
                return Err(ToolError::invalid(format!(
                    "month must be between 1 and 12, got {}",
                    m
                )));
            }
        }

        let source = self.source.as_ref();
        let events = retry_with_backoff(&self.retry, "culture.cultural_events", move || {
            source.cultural_events(country)
        })
        .await?;

        let events: Vec<CulturalEvent> = events
            .into_iter()
            .filter(|e| month.is_none_or(|m| i64::from(e.month) == m))
            .collect();

        Ok(json!({
            "country": country,
            "month": month,
            "events": events,
        }))
    }
}

#[async_trait]
impl ToolModule for CultureModule {
    fn domain(&self) -> &str {
        Self::DOMAIN
    }

    fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn handle(&self, name: &str, args: Arguments) -> Result<Value, ToolError> {
        match name {
            LANGUAGE_TRANSLATION => self.language_translation(&args).await,
            HERITAGE_SITES => self.heritage_sites(&args).await,
            CULTURAL_EVENTS => self.cultural_events(&args).await,
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

    fn module() -> CultureModule {
        CultureModule::synthetic(&HubConfig::default())
    }

    #[tokio::test]
    async fn translates_known_phrase() {
        let out = module()
            .invoke(
                LANGUAGE_TRANSLATION,
                &json!({"text": "Hello!", "source_language": "en", "target_language": "ha"}),
            )
            .await
            .unwrap();
        assert_eq!(out["original_text"], "Hello!");
        assert_eq!(out["translated_text"], "sannu");
        assert_eq!(out["method"], "glossary");
    }

    #[tokio::test]
    async fn translates_between_non_english_languages() {
        let translated = SyntheticCulture::new()
            .translate("Asante", "sw", "yo")
            .await
            .unwrap();
        assert_eq!(translated.as_deref(), Some("e se"));
    }

    #[tokio::test]
    async fn unknown_phrase_is_reported_not_invented() {
        let out = module()
            .invoke(
                LANGUAGE_TRANSLATION,
                &json!({"text": "the tractor is broken", "source_language": "en", "target_language": "fr"}),
            )
            .await
            .unwrap();
        assert!(out["translated_text"].is_null());
        assert_eq!(out["method"], "unavailable");
        assert!(out["note"].is_string());
    }

    #[tokio::test]
    async fn same_language_is_identity() {
        let out = module()
            .invoke(
                LANGUAGE_TRANSLATION,
                &json!({"text": "anything", "source_language": "fr", "target_language": "fr"}),
            )
            .await
            .unwrap();
        assert_eq!(out["translated_text"], "anything");
        assert_eq!(out["method"], "identity");
    }

    #[tokio::test]
    async fn unsupported_language_is_rejected() {
        let err = module()
            .invoke(
                LANGUAGE_TRANSLATION,
                &json!({"text": "hello", "source_language": "en", "target_language": "de"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn filters_sites_by_category() {
        let out = module()
            .invoke(HERITAGE_SITES, &json!({"country": "Liberia", "category": "natural"}))
            .await
            .unwrap();
        let sites = out["sites"].as_array().unwrap();
        assert_eq!(out["count"], 3);
        assert!(sites.iter().all(|s| s["category"] == "natural"));
    }

    #[tokio::test]
    async fn unknown_country_has_no_sites() {
        let out = module()
            .invoke(HERITAGE_SITES, &json!({"country": "Atlantis"}))
            .await
            .unwrap();
        assert_eq!(out["count"], 0);
    }

    #[tokio::test]
    async fn filters_events_by_month() {
        let out = module()
            .invoke(CULTURAL_EVENTS, &json!({"country": "liberia", "month": 7}))
            .await
            .unwrap();
        let events = out["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["name"], "Independence Day");

        let all = module()
            .invoke(CULTURAL_EVENTS, &json!({"country": "Liberia"}))
            .await
            .unwrap();
        assert!(all["month"].is_null());
        assert_eq!(all["events"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn rejects_invalid_month() {
        let err = module()
            .invoke(CULTURAL_EVENTS, &json!({"country": "Ghana", "month": 13}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("between 1 and 12"));
    }
}
