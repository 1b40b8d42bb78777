//! Online translation via the unofficial Google Translate (GTX) endpoint.

use anyhow::Result;

use super::TranslationBackend;
use crate::net::{is_online, UREQ_AGENT};

pub struct GtxTranslator;

impl TranslationBackend for GtxTranslator {
    fn translate(&self, text: &str, src: &str, tgt: &str) -> Result<String> {
        if !is_online() {
            anyhow::bail!("no internet connection");
        }

        let sl = if src.is_empty() { "auto" } else { src };
        let encoded_text = urlencoding::encode(text);
        let url = format!(
            "https://translate.googleapis.com/translate_a/single?client=gtx&sl={}&tl={}&dt=t&q={}",
            sl, tgt, encoded_text
        );

        let resp = UREQ_AGENT
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .call()?;
        let json: serde_json::Value = resp.into_body().read_json()?;

        // Response shape: [[["segment", ...], ...], ...]
        let sentences = json
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow::anyhow!("unexpected response shape"))?;

        let mut full_text = String::new();
        for sentence_node in sentences {
            if let Some(segment) = sentence_node.get(0).and_then(|s| s.as_str()) {
                full_text.push_str(segment);
            }
        }

        if full_text.is_empty() {
            anyhow::bail!("empty translation response");
        }
        Ok(full_text)
    }
}
