//! OpenAI-compatible chat completion suggester.
//!
//! Sends the current line plus before/after context and reads the label
//! from the reply: either a ```yaml block with `neutral_term:`, or the text
//! after the `####` separator.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{LabelLookupFailure, LabelRequest, LabelSuggester};

const SYSTEM_PROMPT: &str = "你是一名文档字段分析助手，根据上下文为空白处给出简短、中性的字段名称。";

const SEPARATOR: &str = "####";

/// Chat service settings (`llm:` section of the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Usually supplied through the environment
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_model() -> String {
    "qwen-max".to_string()
}
fn default_api_base() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}
fn default_max_tokens() -> u32 {
    100
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            api_base: default_api_base(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NeutralTerm {
    neutral_term: String,
}

/// Label suggester backed by a chat completion endpoint
pub struct ChatSuggester {
    config: ChatConfig,
    api_key: String,
    client: reqwest::Client,
}

impl ChatSuggester {
    /// Build a client; fails when no API key is configured
    pub fn new(config: ChatConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .context("No API key configured (set DASHSCOPE_API_KEY or OPENAI_API_KEY)")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }
}

/// User prompt for one fill position
pub fn build_prompt(request: &LabelRequest) -> String {
    format!(
        "当前行：\n{line}\n\n前文：\n{before}\n\n后文：\n{after}\n\n\
         要求：\n\
         1. 优先沿用空白处前面的字段名（如“姓名：____”回答“姓名”）。\n\
         2. 前面没有字段名时，参考后文（如“xxxx专业申请”回答“专业名称”）。\n\
         3. 都没有时，概括最贴切的名词短语。\n\
         4. 无法判断时回答 ???。\n\
         5. 简短写出思考，然后输出分隔符 {sep}，分隔符后只写字段名。",
        line = request.line,
        before = request.before,
        after = request.after,
        sep = SEPARATOR,
    )
}

/// Extract the label from a model reply
pub fn parse_reply(reply: &str) -> Result<String, LabelLookupFailure> {
    if let Some((_, rest)) = reply.split_once("```yaml") {
        let block = rest.split("```").next().unwrap_or_default();
        let parsed: NeutralTerm = serde_yaml::from_str(block.trim())
            .map_err(|e| LabelLookupFailure::InvalidResponse(e.to_string()))?;
        return Ok(parsed.neutral_term.trim().to_string());
    }

    let answer = match reply.rsplit_once(SEPARATOR) {
        Some((_, after)) => after,
        None => reply,
    };

    answer
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LabelLookupFailure::InvalidResponse("empty reply".to_string()))
}

#[async_trait]
impl LabelSuggester for ChatSuggester {
    fn name(&self) -> &str {
        "chat"
    }

    async fn suggest(&self, request: &LabelRequest) -> Result<String, LabelLookupFailure> {
        let prompt = build_prompt(request);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LabelLookupFailure::Timeout(Duration::from_secs(self.config.timeout_seconds))
                } else {
                    LabelLookupFailure::Service(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Label service returned an error");
            return Err(LabelLookupFailure::Service(format!("HTTP {}: {}", status, text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LabelLookupFailure::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LabelLookupFailure::InvalidResponse("no choices".to_string()))?;

        debug!(reply = %content, "Label service reply");
        parse_reply(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_after_separator() {
        let reply = "思考1: 前文有字段\n思考2: 继承姓名\n####\n姓名\n";
        assert_eq!(parse_reply(reply).unwrap(), "姓名");
    }

    #[test]
    fn test_parse_yaml_block() {
        let reply = "思考1: 看前文\n####\n```yaml\nneutral_term: \"公司名称\"\n```";
        assert_eq!(parse_reply(reply).unwrap(), "公司名称");
    }

    #[test]
    fn test_parse_plain_reply() {
        assert_eq!(parse_reply("  联系电话 ").unwrap(), "联系电话");
    }

    #[test]
    fn test_parse_empty_reply_fails() {
        assert!(matches!(
            parse_reply("思考\n####\n   \n"),
            Err(LabelLookupFailure::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_prompt_carries_context() {
        let prompt = build_prompt(&LabelRequest {
            before: "姓名：".to_string(),
            after: "（签字）".to_string(),
            line: "姓名：____（签字）".to_string(),
        });
        assert!(prompt.contains("姓名：____（签字）"));
        assert!(prompt.contains("####"));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        assert!(ChatSuggester::new(ChatConfig::default()).is_err());
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let suggester = ChatSuggester::new(ChatConfig {
            api_key: Some("sk-test".to_string()),
            api_base: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(suggester.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
