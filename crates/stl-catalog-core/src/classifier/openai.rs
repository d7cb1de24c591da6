use ahash::AHashSet;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

use super::{Classifier, ClassifierError, MAX_CATEGORIES};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const PLACEHOLDER_KEY: &str = "YOUR_API_KEY_HERE";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You are a classifier. You receive a filename and a catalog of categories.
Return ONLY a JSON array of strings from the catalog. No extra text.";

const USER_PROMPT_GUIDE: &str = "Instructions:
- Choose 0-3 categories from the catalog that describe the file by its NAME.
- If it doesn't fit, return [].
- Respond ONLY with JSON: [\"cat1\",\"cat2\"]

Examples:
benchy_calibration.stl          -> [\"calibration\"]
iphone_magsafe_mount_v2.zip     -> [\"phone_accessory\",\"mount\"]
orc_mini_pack.rar               -> [\"miniature\",\"figurine\"]
nozzle_holder_4010_fan.stl      -> [\"tool_holder\",\"printer_upgrade\"]
gt2_pulley_adapter_v3.stl       -> [\"adapter\",\"mechanical_part\"]";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions backed classifier. Enabled only with a real API key.
pub struct OpenAiClassifier {
    client: Option<Client>,
    api_key: String,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        let api_key = api_key.unwrap_or_default().trim().to_string();
        let enabled = !api_key.is_empty() && api_key != PLACEHOLDER_KEY;
        let client = if enabled {
            Client::builder().timeout(REQUEST_TIMEOUT).build().ok()
        } else {
            None
        };
        Self {
            client,
            api_key,
            model: model.into(),
        }
    }
}

impl Classifier for OpenAiClassifier {
    fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn classify(&self, file_name: &str, allowed: &[String]) -> Result<Vec<String>, ClassifierError> {
        let Some(client) = &self.client else {
            return Ok(Vec::new());
        };

        let catalog = serde_json::to_string(allowed)
            .map_err(|e| ClassifierError::Response(e.to_string()))?;
        let user_prompt = format!(
            "file_name: {:?}\nallowed_categories: {}\n\n{}",
            file_name, catalog, USER_PROMPT_GUIDE
        );

        let body = json!({
            "model": self.model,
            "temperature": 0.3,
            "max_tokens": 100,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
        });

        let response: ChatResponse = client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        trace!(file = file_name, content = %content, "Classifier response");

        let names = parse_category_response(&content, allowed);
        debug!(file = file_name, categories = ?names, "Classified file");
        Ok(names)
    }
}

/// Extract category names from a model reply.
///
/// Accepts a bare JSON array or the first `[...]` span inside prose. Names are
/// lowercased, filtered to `allowed` (case-insensitively), de-duplicated and
/// capped at [`MAX_CATEGORIES`]. Anything unparseable yields an empty list.
pub fn parse_category_response(content: &str, allowed: &[String]) -> Vec<String> {
    let content = content.trim();
    let raw: Vec<String> = match serde_json::from_str(content) {
        Ok(names) => names,
        Err(_) => match (content.find('['), content.rfind(']')) {
            (Some(start), Some(end)) if end > start => {
                serde_json::from_str(&content[start..=end]).unwrap_or_default()
            }
            _ => Vec::new(),
        },
    };

    let allowed: AHashSet<String> = allowed.iter().map(|name| name.to_lowercase()).collect();
    let mut seen = AHashSet::new();
    raw.into_iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| allowed.contains(name) && seen.insert(name.clone()))
        .take(MAX_CATEGORIES)
        .collect()
}
