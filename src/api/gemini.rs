use crate::error::{Result, VideoError};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const GEMINI_API: &str = "https://generativelanguage.googleapis.com/v1beta/models";

static CLOSING_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:thanks|thank\s+you)(?:\s+for\s+(?:watching|listening))?\b",
        r"(?i)\bsee\s+you\s+(?:next\s+time|soon)\b",
        r"(?i)\bhope\s+you\s+enjoyed\b",
        r"(?i)\bgood\s*(?:bye|day|night)\b",
        r"(?i)\buntil\s+next\s+time\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid closing phrase pattern"))
    .collect()
});
static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```\w*\s*").expect("valid fence pattern"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```$").expect("valid fence pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid pattern"));

/// Generative-model client, constructed once from configuration.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 4096,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }

    /// Narration with `[SYNC: X]` markers matched to an animation script.
    pub async fn generate_synced_narration(
        &self,
        animation_code: &str,
        prompt: &str,
    ) -> Result<String> {
        info!("Generating synchronized narration script...");
        let text = self.generate(&synced_narration_prompt(animation_code, prompt)).await?;
        Ok(remove_closing_phrases(&clean_code_response(&text)))
    }

    /// Plain narration without markers; drives the looped fallback.
    pub async fn generate_narration_script(&self, prompt: &str) -> Result<String> {
        info!("Generating narration script...");
        let text = self.generate(&narration_prompt(prompt)).await?;
        Ok(clean_code_response(&text))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/{}:generateContent", GEMINI_API, self.model);
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig::default(),
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(VideoError::ApiError(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let body: GeminiResponse = response.json().await?;
        extract_text(body)
    }
}

fn extract_text(response: GeminiResponse) -> Result<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| VideoError::ApiError("No content in Gemini response".to_string()))
}

/// Strip markdown code fences the model wraps around its answer.
pub fn clean_code_response(text: &str) -> String {
    let text = LEADING_FENCE.replace(text.trim(), "");
    TRAILING_FENCE.replace(&text, "").to_string()
}

/// Drop sign-off pleasantries that add nothing to the narration.
pub fn remove_closing_phrases(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pattern in CLOSING_PHRASES.iter() {
        cleaned = pattern.replace_all(&cleaned, "").to_string();
    }
    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

fn synced_narration_prompt(animation_code: &str, prompt: &str) -> String {
    format!(
        r#"Create a BRIEF narration script for this Manim animation code about {prompt}:

```python
{animation_code}
```

Your task is to create a concise narration script with 4-5 sync points for the entire video.

Guidelines:
1. Include 4-5 sync points TOTAL for the ENTIRE video
2. Place the sync points at major transitions in the content (title, key sections, conclusion)
3. Include [SYNC: X] markers at the beginning of each paragraph, where X is the timestamp in seconds
4. Make each narration segment BRIEF - about 2-3 short sentences per sync point
5. Total narration should be about 40-45 seconds when read aloud
6. End with an educational conclusion, NOT with "thanks for watching" or similar phrases

SPECIFICATIONS:
- About 20-25 words per sync point
- Total word count 80-100 words for the entire script

Format your response as plain text with paragraphs separated by blank lines, including only 4-5 [SYNC: X] markers total.
Return ONLY the narration script without any other explanations or formatting."#
    )
}

fn narration_prompt(prompt: &str) -> String {
    format!(
        r#"Create a BRIEF narration script for an educational video about:

{prompt}

Write a concise overview script (about 40-45 seconds when read aloud, 80-100 words, 4-6 sentences)
that introduces the core concept and 2-3 key points in simple conversational language.
End with an educational conclusion, not with "thanks for watching" or similar phrases.
Do not include any timestamps, markers, or technical directions.
Return ONLY the narration script without any explanations or additional formatting."#
    )
}
