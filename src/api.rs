use std::io::Read;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;

use crate::config::AppConfig;
use crate::http_client::{http_client, stream_client};
use crate::model::{AnalyzeRequestBody, ProDirectory, RegenerateRequest, RegenerateResponse};

pub type StreamBody = Box<dyn Read + Send>;

/// The remote analysis service. Everything that leaves the process goes
/// through here, so tests and offline mode can swap it out.
pub trait RoastBackend: Send + Sync {
    /// `POST /regenerate-roasts`: new roast text for already computed stats.
    fn regenerate(&self, request: &RegenerateRequest<'_>) -> Result<RegenerateResponse>;

    /// `POST /analyze-stream`: opens the event stream. Fails before any body
    /// is read if the service is unreachable or answers with a non-2xx status.
    fn open_analyze_stream(&self, body: &AnalyzeRequestBody<'_>) -> Result<StreamBody>;

    /// `GET /pro-players`.
    fn pro_players(&self) -> Result<ProDirectory>;
}

pub struct HttpBackend {
    base: String,
    client: &'static Client,
    stream: &'static Client,
}

impl HttpBackend {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            base: config.api_base.clone(),
            client: http_client(&config.http)?,
            stream: stream_client(&config.http)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

impl RoastBackend for HttpBackend {
    fn regenerate(&self, request: &RegenerateRequest<'_>) -> Result<RegenerateResponse> {
        let resp = self
            .client
            .post(self.url("regenerate-roasts"))
            .json(request)
            .send()
            .context("regenerate request failed")?;
        let resp = ensure_success(resp)?;
        let body = resp.text().context("failed reading regenerate body")?;
        parse_regenerate_json(&body)
    }

    fn open_analyze_stream(&self, body: &AnalyzeRequestBody<'_>) -> Result<StreamBody> {
        let resp = self
            .stream
            .post(self.url("analyze-stream"))
            .header(ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .context("analyze request failed")?;
        let resp = ensure_success(resp)?;
        Ok(Box::new(resp))
    }

    fn pro_players(&self) -> Result<ProDirectory> {
        let resp = self
            .client
            .get(self.url("pro-players"))
            .send()
            .context("pro players request failed")?;
        let resp = ensure_success(resp)?;
        let body = resp.text().context("failed reading pro players body")?;
        parse_pro_directory_json(&body)
    }
}

fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"));
    let body = resp.text().unwrap_or_default();
    let detail = if is_json { error_detail(&body) } else { None };
    Err(anyhow!(
        "http {}: {}",
        status,
        detail.unwrap_or_else(|| body.trim().to_string())
    ))
}

/// Pulls the human message out of a FastAPI-style `{"detail": ...}` body.
pub fn error_detail(raw: &str) -> Option<String> {
    let root: Value = serde_json::from_str(raw.trim()).ok()?;
    match root.get("detail").or_else(|| root.get("error"))? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn parse_regenerate_json(raw: &str) -> Result<RegenerateResponse> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(RegenerateResponse::default());
    }
    serde_json::from_str(trimmed).context("invalid regenerate json")
}

pub fn parse_pro_directory_json(raw: &str) -> Result<ProDirectory> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ProDirectory::new());
    }
    serde_json::from_str(trimmed).context("invalid pro players json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_prefers_fastapi_field() {
        assert_eq!(
            error_detail(r#"{"detail":"Summoner not found"}"#).as_deref(),
            Some("Summoner not found")
        );
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["body"]}]}"#).as_deref(),
            Some(r#"[{"loc":["body"]}]"#)
        );
        assert!(error_detail("<html>").is_none());
    }

    #[test]
    fn regenerate_null_is_empty() {
        let resp = parse_regenerate_json("null").expect("null should parse");
        assert!(resp.postcards.is_empty());
        assert!(resp.used_topics.is_empty());
    }

    #[test]
    fn pro_directory_parses_nested_maps() {
        let raw = r#"{"LCK":{"T1":[{"id":"faker","name":"Faker","role":"Mid","riot_id":"Hide on bush#KR1"}]},"LEC":{}}"#;
        let dir = parse_pro_directory_json(raw).expect("directory");
        assert_eq!(dir.len(), 2);
        assert_eq!(dir["LCK"]["T1"][0].name, "Faker");
    }
}
