//! Ollama provider implementation.
//!
//! This module provides an Ollama HTTP API client that implements the Provider trait.

use super::types::*;
use async_trait::async_trait;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Ollama HTTP API provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    /// Creates a new Ollama provider talking to `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new("http://localhost:11434")
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.base_url);

        let embed_request = EmbedRequest {
            model: model.to_string(),
            input: text.to_string(),
        };

        let response = self.http_client
            .post(&url)
            .json(&embed_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ProviderError::Api(error_text));
        }

        let embed_response = response.json::<EmbedResponse>().await?;

        embed_response.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No embeddings returned".to_string()))
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let ollama_request = OllamaGenerateRequest {
            model: request.model.clone(),
            prompt: request.prompt,
            options: sampling_options(request.temperature, request.top_p, request.top_k),
            stream: true,
        };

        let response = self.http_client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ProviderError::Api(error_text));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut output = String::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line = buffer.drain(..=newline_pos).collect::<Vec<_>>();
                if consume_line(&line[..line.len() - 1], &mut output)? {
                    debug!(model = %request.model, chars = output.len(), "Generation finished");
                    return Ok(output);
                }
            }
        }

        // Trailing line without a newline terminator
        if !buffer.is_empty() {
            consume_line(&buffer, &mut output)?;
        }

        Ok(output)
    }
}

/// Appends one streamed line to `output`, returning whether the stream is done.
fn consume_line(line: &[u8], output: &mut String) -> Result<bool> {
    let line_str = String::from_utf8_lossy(line);
    let line_str = line_str.trim();
    if line_str.is_empty() {
        return Ok(false);
    }

    let chunk: OllamaGenerateChunk = serde_json::from_str(line_str)?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Api(error));
    }
    output.push_str(&chunk.response);
    Ok(chunk.done)
}

fn sampling_options(
    temperature: f64,
    top_p: Option<f64>,
    top_k: Option<u32>,
) -> HashMap<String, serde_json::Value> {
    let mut opts = HashMap::new();
    opts.insert("temperature".to_string(), serde_json::json!(temperature));
    if let Some(top_p) = top_p {
        opts.insert("top_p".to_string(), serde_json::json!(top_p));
    }
    if let Some(top_k) = top_k {
        opts.insert("top_k".to_string(), serde_json::json!(top_k));
    }
    opts
}

// Ollama-specific request/response types (internal)

#[derive(Debug, Clone, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    options: HashMap<String, serde_json::Value>,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaGenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_line_accumulates() {
        let mut output = String::new();
        assert!(!consume_line(br#"{"model":"m","response":"Hel","done":false}"#, &mut output).unwrap());
        assert!(consume_line(br#"{"model":"m","response":"lo","done":true}"#, &mut output).unwrap());
        assert_eq!(output, "Hello");
    }

    #[test]
    fn test_consume_line_skips_blank() {
        let mut output = String::new();
        assert!(!consume_line(b"   ", &mut output).unwrap());
        assert!(output.is_empty());
    }

    #[test]
    fn test_consume_line_surfaces_api_error() {
        let mut output = String::new();
        let result = consume_line(br#"{"error":"model not found"}"#, &mut output);
        assert!(matches!(result, Err(ProviderError::Api(msg)) if msg == "model not found"));
    }

    #[test]
    fn test_consume_line_rejects_garbage() {
        let mut output = String::new();
        assert!(matches!(consume_line(b"not json", &mut output), Err(ProviderError::Json(_))));
    }

    #[test]
    fn test_sampling_options() {
        let opts = sampling_options(0.5, Some(0.9), None);
        assert_eq!(opts.get("temperature"), Some(&serde_json::json!(0.5)));
        assert_eq!(opts.get("top_p"), Some(&serde_json::json!(0.9)));
        assert!(!opts.contains_key("top_k"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = OllamaProvider::new("http://localhost:11434/");
        assert_eq!(provider.base_url, "http://localhost:11434");
    }
}
