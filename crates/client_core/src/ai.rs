use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use shared::protocol::Hospital;
use tracing::{info, warn};

use crate::error::{PortalError, PortalResult};

pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_AI_MODEL: &str = "gemini-3-flash-preview";
const SERVICE: &str = "generative AI service";

const OCR_PROMPT: &str = "Extract information from this ID card. Return JSON with fields: \
idNumber, firstName, lastName, dob, nationality, gender.";
const HOSPITAL_PROMPT: &str = "List 30 major Social Security Fund (SSF) registered hospitals in \
Thailand. Include the province (e.g. Bangkok, Samut Prakan, Chonburi). Return as a JSON array of \
objects with 'id', 'name', and 'province'.";

/// Fields read off an ID card image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCardScan {
    pub id_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

#[async_trait]
pub trait ReferenceService: Send + Sync {
    /// `None` when the image could not be read or the service failed.
    async fn extract_id_card(&self, image_jpeg: &[u8]) -> Option<IdCardScan>;
    /// Never empty: falls back to [`fallback_hospitals`].
    async fn lookup_hospitals(&self) -> Vec<Hospital>;
}

pub fn fallback_hospitals() -> Vec<Hospital> {
    vec![
        Hospital::new("1", "Siriraj Hospital", "Bangkok"),
        Hospital::new("2", "King Chulalongkorn Memorial Hospital", "Bangkok"),
        Hospital::new("3", "Ramathibodi Hospital", "Bangkok"),
        Hospital::new("4", "Vajira Hospital", "Bangkok"),
        Hospital::new("5", "Kasemrad Hospital", "Samut Prakan"),
    ]
}

/// Used when no API key is configured.
pub struct OfflineReference;

#[async_trait]
impl ReferenceService for OfflineReference {
    async fn extract_id_card(&self, _image_jpeg: &[u8]) -> Option<IdCardScan> {
        warn!("ai: ID card scan skipped, no API key configured");
        None
    }

    async fn lookup_hospitals(&self) -> Vec<Hospital> {
        fallback_hospitals()
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_AI_MODEL.into(),
            base_url: DEFAULT_AI_BASE_URL.into(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> PortalResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| PortalError::Config(format!("failed to build AI client: {err}")))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Sends one `generateContent` call constrained to `schema` and decodes its JSON text.
    async fn generate<T: DeserializeOwned>(&self, parts: Value, schema: Value) -> PortalResult<T> {
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(unavailable)?;

        let decoded: GenerateResponse = response.json().await.map_err(unavailable)?;
        let text = decoded
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.text)
            .ok_or_else(|| PortalError::ServiceUnavailable {
                service: SERVICE,
                message: "response contained no candidate text".into(),
            })?;

        serde_json::from_str(&text).map_err(|err| PortalError::ServiceUnavailable {
            service: SERVICE,
            message: format!("response did not match the requested schema: {err}"),
        })
    }

    pub async fn try_extract_id_card(&self, image_jpeg: &[u8]) -> PortalResult<IdCardScan> {
        let parts = json!([
            { "inlineData": { "mimeType": "image/jpeg", "data": STANDARD.encode(image_jpeg) } },
            { "text": OCR_PROMPT },
        ]);
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "idNumber": { "type": "STRING" },
                "firstName": { "type": "STRING" },
                "lastName": { "type": "STRING" },
                "dob": { "type": "STRING" },
                "nationality": { "type": "STRING" },
                "gender": { "type": "STRING" },
            },
            "required": ["idNumber", "firstName", "lastName"],
        });
        self.generate(parts, schema).await
    }

    pub async fn try_lookup_hospitals(&self) -> PortalResult<Vec<Hospital>> {
        let parts = json!([{ "text": HOSPITAL_PROMPT }]);
        let schema = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "id": { "type": "STRING" },
                    "name": { "type": "STRING" },
                    "province": { "type": "STRING" },
                },
                "required": ["id", "name", "province"],
            },
        });
        self.generate(parts, schema).await
    }
}

fn unavailable(err: reqwest::Error) -> PortalError {
    PortalError::ServiceUnavailable {
        service: SERVICE,
        message: err.to_string(),
    }
}

#[async_trait]
impl ReferenceService for GeminiClient {
    async fn extract_id_card(&self, image_jpeg: &[u8]) -> Option<IdCardScan> {
        match self.try_extract_id_card(image_jpeg).await {
            Ok(scan) => {
                info!("ai: ID card scan succeeded");
                Some(scan)
            }
            Err(err) => {
                warn!("ai: ID card scan failed: {err}");
                None
            }
        }
    }

    async fn lookup_hospitals(&self) -> Vec<Hospital> {
        match self.try_lookup_hospitals().await {
            Ok(hospitals) if !hospitals.is_empty() => hospitals,
            Ok(_) => {
                warn!("ai: hospital lookup returned no entries, using fallback list");
                fallback_hospitals()
            }
            Err(err) => {
                warn!("ai: hospital lookup failed, using fallback list: {err}");
                fallback_hospitals()
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/ai_tests.rs"]
mod tests;
