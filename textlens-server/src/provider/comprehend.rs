//! Amazon Comprehend provider implementation.
//!
//! Each feature maps to one synchronous `Detect*` operation on the
//! JSON 1.1 protocol: a signed POST to the regional endpoint with the
//! operation named in `X-Amz-Target`.

use super::signing::{amz_date, authorization_header, SigningInput};
use super::{Analyzer, Credentials};
use crate::model::{
    DetectedLanguage, Entity, Feature, FeatureError, FeaturePayload, FeatureResult, KeyPhrase,
    Mention, PiiEntity, Sentiment, SentimentLabel, SentimentScores, SyntaxToken, TargetedEntity,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::{Duration, Instant};
use textlens_common::config::ComprehendConfig;
use textlens_common::{Error, Result};
use url::Url;

/// API version prefix of every `X-Amz-Target` value.
pub const TARGET_PREFIX: &str = "Comprehend_20171127";
const SERVICE: &str = "comprehend";
const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Operation name for a feature.
pub const fn operation_name(feature: Feature) -> &'static str {
    match feature {
        Feature::Sentiment => "DetectSentiment",
        Feature::Entities => "DetectEntities",
        Feature::KeyPhrases => "DetectKeyPhrases",
        Feature::Syntax => "DetectSyntax",
        Feature::Language => "DetectDominantLanguage",
        Feature::Pii => "DetectPiiEntities",
        Feature::TargetedSentiment => "DetectTargetedSentiment",
    }
}

/// Amazon Comprehend analyzer.
pub struct ComprehendAnalyzer {
    client: reqwest::Client,
    endpoint: Url,
    host: String,
    region: String,
    credentials: Credentials,
}

impl ComprehendAnalyzer {
    /// Create an analyzer for the public regional endpoint.
    pub fn new(region: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let region = region.into();
        let endpoint = format!("https://comprehend.{}.amazonaws.com/", region);
        Self::with_endpoint(region, credentials, &endpoint, Duration::from_secs(30))
    }

    /// Create with a custom endpoint (VPC endpoints, local stubs).
    pub fn with_endpoint(
        region: impl Into<String>,
        credentials: Credentials,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid Comprehend endpoint '{}': {}", endpoint, e)))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(Error::Config(format!(
                    "Comprehend endpoint '{}' has no host",
                    endpoint
                )))
            }
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            host,
            region: region.into(),
            credentials,
        })
    }

    /// Create from configuration with already-resolved credentials.
    pub fn from_config(config: &ComprehendConfig, credentials: Credentials) -> Result<Self> {
        let region = config.region_or_default().to_string();
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://comprehend.{}.amazonaws.com/", region));
        Self::with_endpoint(
            region,
            credentials,
            &endpoint,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_body(feature: Feature, text: &str, language_hint: &str) -> serde_json::Value {
        if feature.uses_language_hint() {
            serde_json::json!({ "Text": text, "LanguageCode": language_hint })
        } else {
            serde_json::json!({ "Text": text })
        }
    }

    async fn call(
        &self,
        feature: Feature,
        text: &str,
        language_hint: &str,
    ) -> std::result::Result<FeaturePayload, FeatureError> {
        let body = serde_json::to_vec(&Self::request_body(feature, text, language_hint)).map_err(
            |e| FeatureError::Transport {
                message: format!("failed to encode request: {}", e),
            },
        )?;

        let target = format!("{}.{}", TARGET_PREFIX, operation_name(feature));
        let date = amz_date(chrono::Utc::now());

        let mut headers: Vec<(&str, &str)> = vec![
            ("content-type", JSON_CONTENT_TYPE),
            ("host", self.host.as_str()),
            ("x-amz-date", date.as_str()),
            ("x-amz-target", target.as_str()),
        ];
        if let Some(token) = self.credentials.session_token() {
            headers.push(("x-amz-security-token", token));
        }

        let input = SigningInput {
            method: "POST",
            path: self.endpoint.path(),
            query: "",
            headers: &headers,
            payload: &body,
        };
        let authorization =
            authorization_header(&input, &self.credentials, &self.region, SERVICE, &date)
                .map_err(|e| FeatureError::Transport {
                    message: format!("request signing failed: {}", e),
                })?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("x-amz-date", &date)
            .header("x-amz-target", &target)
            .header(AUTHORIZATION, authorization);
        if let Some(token) = self.credentials.session_token() {
            request = request.header("x-amz-security-token", token);
        }

        let response = request.body(body).send().await.map_err(|e| FeatureError::Transport {
            message: format!("Request failed: {}", e),
        })?;

        let status = response.status();
        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().await.map_err(|e| FeatureError::Transport {
            message: format!("Failed to read response: {}", e),
        })?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), error_type.as_deref(), &bytes));
        }

        decode_payload(feature, &bytes)
    }
}

#[async_trait]
impl Analyzer for ComprehendAnalyzer {
    fn name(&self) -> &str {
        "comprehend"
    }

    async fn invoke(&self, feature: Feature, text: &str, language_hint: &str) -> FeatureResult {
        let start = Instant::now();
        let result = self.call(feature, text, language_hint).await;
        tracing::debug!(
            feature = %feature,
            operation = operation_name(feature),
            success = result.is_ok(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Comprehend call finished"
        );
        result.into()
    }
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// Extract the bare exception name from `x-amzn-errortype` or `__type`.
///
/// Header values look like `ThrottlingException:http://...`; body values
/// like `com.amazonaws.comprehend#ThrottlingException`.
fn error_code(raw: &str) -> &str {
    let raw = raw.split(':').next().unwrap_or(raw);
    raw.rsplit('#').next().unwrap_or(raw)
}

fn classify_error(status: u16, header_type: Option<&str>, body: &[u8]) -> FeatureError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let code = header_type
        .or(parsed.error_type.as_deref())
        .map(error_code)
        .unwrap_or("UnknownError")
        .to_string();
    let message = parsed
        .message
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    match code.as_str() {
        "ThrottlingException" | "TooManyRequestsException" => FeatureError::Throttled { message },
        "UnsupportedLanguageException" => FeatureError::UnsupportedLanguage { message },
        _ if status == 429 => FeatureError::Throttled { message },
        _ => FeatureError::Service {
            code,
            status,
            message,
        },
    }
}

// ============================================================================
// Comprehend API Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireScores {
    #[serde(default)]
    positive: f64,
    #[serde(default)]
    negative: f64,
    #[serde(default)]
    neutral: f64,
    #[serde(default)]
    mixed: f64,
}

impl From<WireScores> for SentimentScores {
    fn from(s: WireScores) -> Self {
        Self {
            positive: s.positive,
            negative: s.negative,
            neutral: s.neutral,
            mixed: s.mixed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentResponse {
    sentiment: SentimentLabel,
    #[serde(default)]
    sentiment_score: WireScores,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireEntity {
    #[serde(default)]
    score: f64,
    #[serde(rename = "Type")]
    entity_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    begin_offset: u32,
    #[serde(default)]
    end_offset: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectEntitiesResponse {
    #[serde(default)]
    entities: Vec<WireEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireKeyPhrase {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    begin_offset: u32,
    #[serde(default)]
    end_offset: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectKeyPhrasesResponse {
    #[serde(default)]
    key_phrases: Vec<WireKeyPhrase>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WirePartOfSpeech {
    tag: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireToken {
    #[serde(default)]
    token_id: u32,
    #[serde(default)]
    text: String,
    #[serde(default)]
    begin_offset: u32,
    #[serde(default)]
    end_offset: u32,
    part_of_speech: WirePartOfSpeech,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSyntaxResponse {
    #[serde(default)]
    syntax_tokens: Vec<WireToken>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireLanguage {
    language_code: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectDominantLanguageResponse {
    #[serde(default)]
    languages: Vec<WireLanguage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WirePiiEntity {
    #[serde(default)]
    score: f64,
    #[serde(rename = "Type")]
    entity_type: String,
    #[serde(default)]
    begin_offset: u32,
    #[serde(default)]
    end_offset: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectPiiEntitiesResponse {
    #[serde(default)]
    entities: Vec<WirePiiEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireMentionSentiment {
    sentiment: SentimentLabel,
    #[serde(default)]
    sentiment_score: WireScores,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireMention {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    group_score: f64,
    #[serde(default)]
    text: String,
    #[serde(rename = "Type", default)]
    mention_type: String,
    mention_sentiment: WireMentionSentiment,
    #[serde(default)]
    begin_offset: u32,
    #[serde(default)]
    end_offset: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTargetedEntity {
    #[serde(default)]
    descriptive_mention_index: Vec<usize>,
    #[serde(default)]
    mentions: Vec<WireMention>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectTargetedSentimentResponse {
    #[serde(default)]
    entities: Vec<WireTargetedEntity>,
}

fn parse<'a, T: Deserialize<'a>>(body: &'a [u8]) -> std::result::Result<T, FeatureError> {
    serde_json::from_slice(body).map_err(|e| FeatureError::MalformedResponse {
        message: format!("Failed to parse response: {}", e),
    })
}

/// Decode a successful response body into the payload for `feature`.
fn decode_payload(feature: Feature, body: &[u8]) -> std::result::Result<FeaturePayload, FeatureError> {
    let payload = match feature {
        Feature::Sentiment => {
            let r: DetectSentimentResponse = parse(body)?;
            FeaturePayload::Sentiment(Sentiment {
                label: r.sentiment,
                scores: r.sentiment_score.into(),
            })
        }
        Feature::Entities => {
            let r: DetectEntitiesResponse = parse(body)?;
            FeaturePayload::Entities(
                r.entities
                    .into_iter()
                    .map(|e| Entity {
                        text: e.text,
                        entity_type: e.entity_type,
                        score: e.score,
                        begin_offset: e.begin_offset,
                        end_offset: e.end_offset,
                    })
                    .collect(),
            )
        }
        Feature::KeyPhrases => {
            let r: DetectKeyPhrasesResponse = parse(body)?;
            FeaturePayload::KeyPhrases(
                r.key_phrases
                    .into_iter()
                    .map(|k| KeyPhrase {
                        text: k.text,
                        score: k.score,
                        begin_offset: k.begin_offset,
                        end_offset: k.end_offset,
                    })
                    .collect(),
            )
        }
        Feature::Syntax => {
            let r: DetectSyntaxResponse = parse(body)?;
            FeaturePayload::Syntax(
                r.syntax_tokens
                    .into_iter()
                    .map(|t| SyntaxToken {
                        token_id: t.token_id,
                        text: t.text,
                        begin_offset: t.begin_offset,
                        end_offset: t.end_offset,
                        tag: t.part_of_speech.tag,
                        tag_score: t.part_of_speech.score,
                    })
                    .collect(),
            )
        }
        Feature::Language => {
            let r: DetectDominantLanguageResponse = parse(body)?;
            FeaturePayload::Language(
                r.languages
                    .into_iter()
                    .map(|l| DetectedLanguage {
                        language_code: l.language_code,
                        score: l.score,
                    })
                    .collect(),
            )
        }
        Feature::Pii => {
            let r: DetectPiiEntitiesResponse = parse(body)?;
            FeaturePayload::Pii(
                r.entities
                    .into_iter()
                    .map(|p| PiiEntity {
                        entity_type: p.entity_type,
                        score: p.score,
                        begin_offset: p.begin_offset,
                        end_offset: p.end_offset,
                    })
                    .collect(),
            )
        }
        Feature::TargetedSentiment => {
            let r: DetectTargetedSentimentResponse = parse(body)?;
            FeaturePayload::TargetedSentiment(
                r.entities
                    .into_iter()
                    .map(|e| TargetedEntity {
                        descriptive_mention_index: e.descriptive_mention_index,
                        mentions: e
                            .mentions
                            .into_iter()
                            .map(|m| Mention {
                                text: m.text,
                                mention_type: m.mention_type,
                                score: m.score,
                                group_score: m.group_score,
                                sentiment: Sentiment {
                                    label: m.mention_sentiment.sentiment,
                                    scores: m.mention_sentiment.sentiment_score.into(),
                                },
                                begin_offset: m.begin_offset,
                                end_offset: m.end_offset,
                            })
                            .collect(),
                    })
                    .collect(),
            )
        }
    };
    Ok(payload)
}
