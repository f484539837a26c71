//! OCR/classification pipeline.
//!
//! Turns uploaded bill images or raw text into a structured expense record:
//!
//! 1. fingerprint the request bytes and consult the [`FingerprintCache`]
//! 2. OCR every image with the configured [`OcrEngine`]
//! 3. ask the LLM (if configured) for strict JSON `{amount, merchant, ts, categories}`
//! 4. fall back to [`heuristic::guess_amount`] / [`heuristic::guess_categories`]
//! 5. merge, cache and return
//!
//! Every AI failure degrades to the heuristics; only OCR failures are fatal.

pub mod cache;
pub mod heuristic;
pub mod ocr;

pub use cache::{EvictionPolicy, FingerprintCache};
pub use ocr::{OcrEngine, TesseractCli};

use crate::{
    ai::{ChatMessage, ChatModel},
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You extract expense records from receipt text. \
Reply with strict JSON only, no prose, in the form \
{\"amount\": number, \"merchant\": string, \"ts\": \"YYYY-MM-DD HH:MM\" or null, \
\"categories\": [{\"label\": string, \"score\": number}]}. \
amount is the total paid in major currency units. \
Use Chinese category labels such as 餐饮, 交通, 购物, 住房, 医疗, 娱乐, 其他.";

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Recognized text
    pub text: String,
    /// Zero-based line index across the request
    pub line: usize,
}

/// A candidate category and its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Category label
    pub label: String,
    /// Confidence in `[0, 1]`
    pub score: f64,
}

/// Fields the LLM managed to extract.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AiExtraction {
    /// Total in major units
    pub amount: Option<f64>,
    /// Merchant name
    pub merchant: Option<String>,
    /// Timestamp as written by the model
    pub ts: Option<String>,
    /// Category candidates
    pub categories: Vec<CategoryScore>,
}

/// Where the amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountSource {
    /// Extracted by the LLM
    Ai,
    /// Numeric heuristic over the OCR text
    Heuristic,
    /// Nothing found
    None,
}

/// Structured expense record produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Recognized lines
    pub ocr: Vec<TextBlock>,
    /// Category candidates, best first
    pub categories: Vec<CategoryScore>,
    /// Total in major units
    pub amount: Option<f64>,
    /// Provenance of `amount`
    pub amount_source: AmountSource,
    /// Merchant name
    pub merchant: Option<String>,
    /// Timestamp as extracted
    pub ts: Option<String>,
}

/// Pipeline output plus whether it was served from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classified {
    /// The record
    #[serde(flatten)]
    pub result: ClassificationResult,
    /// `true` when no OCR or LLM work was done
    pub cache: bool,
}

/// What to classify.
#[derive(Debug, Clone)]
pub enum ClassifyInput {
    /// One or more uploaded images
    Images(Vec<Vec<u8>>),
    /// Raw receipt text
    Text(String),
}

impl ClassifyInput {
    /// Hex SHA-256 of the concatenated image bytes, or of the text.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Self::Images(images) => {
                for image in images {
                    hasher.update(image);
                }
            }
            Self::Text(text) => hasher.update(text.as_bytes()),
        }
        format!("{:x}", hasher.finalize())
    }
}

/// The classification service: cache, OCR engine and optional LLM.
pub struct Classifier {
    cache: Mutex<FingerprintCache<ClassificationResult>>,
    ocr: Arc<dyn OcrEngine>,
    llm: Option<Arc<dyn ChatModel>>,
}

impl Classifier {
    /// Assembles a classifier. Without `llm` only the heuristics run.
    pub fn new(
        cache: FingerprintCache<ClassificationResult>,
        ocr: Arc<dyn OcrEngine>,
        llm: Option<Arc<dyn ChatModel>>,
    ) -> Self {
        Self {
            cache: Mutex::new(cache),
            ocr,
            llm,
        }
    }

    /// Runs the pipeline. `bypass_cache` skips the lookup but still stores the result.
    pub async fn classify(&self, input: ClassifyInput, bypass_cache: bool) -> Result<Classified> {
        let key = input.fingerprint();

        if !bypass_cache {
            if let Some(result) = self.cache_get(&key) {
                debug!(fingerprint = %key, "classification cache hit");
                return Ok(Classified {
                    result,
                    cache: true,
                });
            }
        }

        let ocr = match input {
            ClassifyInput::Images(images) => self.recognize(images).await?,
            ClassifyInput::Text(text) => ocr::text_blocks(&text),
        };
        let text = ocr
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let ai = self.ask_ai(&text).await.unwrap_or_default();
        let result = merge(ocr, ai, &text);
        info!(
            fingerprint = %key,
            amount = ?result.amount,
            source = ?result.amount_source,
            "classified"
        );

        self.cache_put(key, result.clone());
        Ok(Classified {
            result,
            cache: false,
        })
    }

    fn cache_get(&self, key: &str) -> Option<ClassificationResult> {
        self.cache.lock().ok().and_then(|mut cache| cache.get(key))
    }

    fn cache_put(&self, key: String, value: ClassificationResult) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, value);
        }
    }

    async fn recognize(&self, images: Vec<Vec<u8>>) -> Result<Vec<TextBlock>> {
        let mut blocks = Vec::new();
        for image in images {
            let engine = Arc::clone(&self.ocr);
            let recognized = tokio::task::spawn_blocking(move || engine.recognize(&image))
                .await
                .map_err(|e| Error::Ocr {
                    message: e.to_string(),
                })??;
            blocks.extend(recognized);
        }

        // Renumber so line indexes are unique across images
        for (line, block) in blocks.iter_mut().enumerate() {
            block.line = line;
        }
        Ok(blocks)
    }

    async fn ask_ai(&self, text: &str) -> Option<AiExtraction> {
        let llm = self.llm.as_ref()?;
        if text.trim().is_empty() {
            return None;
        }

        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(text)];
        match llm.complete(&messages).await {
            Ok(reply) => {
                let parsed = heuristic::parse_ai_reply(&reply);
                if parsed.is_none() {
                    warn!("AI reply was not valid JSON, using heuristics");
                }
                parsed
            }
            Err(e) => {
                warn!("AI classification unavailable: {e}");
                None
            }
        }
    }
}

fn merge(ocr: Vec<TextBlock>, ai: AiExtraction, text: &str) -> ClassificationResult {
    let (amount, amount_source) = match ai.amount.filter(|a| *a > 0.0) {
        Some(amount) => (Some(amount), AmountSource::Ai),
        None => heuristic::guess_amount(text).map_or((None, AmountSource::None), |amount| {
            (Some(amount), AmountSource::Heuristic)
        }),
    };

    let categories = if ai.categories.is_empty() {
        heuristic::guess_categories(text)
    } else {
        ai.categories
    };

    ClassificationResult {
        ocr,
        categories,
        amount,
        amount_source,
        merchant: ai.merchant,
        ts: ai.ts,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::ai::testing::ScriptedModel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns fixed text and counts invocations.
    struct FakeOcr {
        text: &'static str,
        calls: AtomicUsize,
    }

    impl OcrEngine for FakeOcr {
        fn recognize(&self, _image: &[u8]) -> Result<Vec<TextBlock>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ocr::text_blocks(self.text))
        }
    }

    struct BrokenOcr;

    impl OcrEngine for BrokenOcr {
        fn recognize(&self, _image: &[u8]) -> Result<Vec<TextBlock>> {
            Err(Error::Ocr {
                message: "unreadable image".to_string(),
            })
        }
    }

    fn cache() -> FingerprintCache<ClassificationResult> {
        FingerprintCache::new(cache::DEFAULT_CAPACITY, EvictionPolicy::Lru, None)
    }

    #[test]
    fn test_fingerprint_is_content_addressed() {
        let a = ClassifyInput::Images(vec![b"ab".to_vec(), b"c".to_vec()]);
        let b = ClassifyInput::Images(vec![b"abc".to_vec()]);
        let c = ClassifyInput::Text("abc".to_string());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(b.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(
            a.fingerprint(),
            ClassifyInput::Text("abd".to_string()).fingerprint()
        );
    }

    #[tokio::test]
    async fn test_heuristic_fallback_without_llm() -> Result<()> {
        let classifier = Classifier::new(cache(), Arc::new(BrokenOcr), None);
        let classified = classifier
            .classify(
                ClassifyInput::Text("Total: 45.99 qty 2 ref 1001".to_string()),
                false,
            )
            .await?;

        assert!(!classified.cache);
        assert_eq!(classified.result.amount, Some(45.99));
        assert_eq!(classified.result.amount_source, AmountSource::Heuristic);
        assert_eq!(classified.result.ocr.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_upload_hits_cache() -> Result<()> {
        let ocr = Arc::new(FakeOcr {
            text: "COFFEE HOUSE\nTotal 32.00",
            calls: AtomicUsize::new(0),
        });
        let classifier = Classifier::new(cache(), Arc::clone(&ocr) as Arc<dyn OcrEngine>, None);
        let image = vec![vec![1_u8, 2, 3]];

        let first = classifier
            .classify(ClassifyInput::Images(image.clone()), false)
            .await?;
        let second = classifier
            .classify(ClassifyInput::Images(image.clone()), false)
            .await?;
        assert!(!first.cache);
        assert!(second.cache);
        assert_eq!(first.result, second.result);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);

        let bypassed = classifier
            .classify(ClassifyInput::Images(image), true)
            .await?;
        assert!(!bypassed.cache);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_ai_result_preferred_over_heuristic() -> Result<()> {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            r#"{"amount": 18.5, "merchant": "Metro", "ts": null, "categories": [{"label": "交通", "score": 0.92}]}"#
                .to_string(),
        )]));
        let classifier = Classifier::new(
            cache(),
            Arc::new(BrokenOcr),
            Some(Arc::clone(&model) as Arc<dyn ChatModel>),
        );

        let classified = classifier
            .classify(ClassifyInput::Text("METRO 18.50 card 9999".to_string()), false)
            .await?;
        assert_eq!(classified.result.amount, Some(18.5));
        assert_eq!(classified.result.amount_source, AmountSource::Ai);
        assert_eq!(classified.result.merchant.as_deref(), Some("Metro"));
        assert_eq!(classified.result.categories[0].label, "交通");
        assert_eq!(model.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_ai_failure_degrades_to_heuristic() -> Result<()> {
        let model = Arc::new(ScriptedModel::new(vec![Err(503)]));
        let classifier = Classifier::new(cache(), Arc::new(BrokenOcr), Some(model));

        let classified = classifier
            .classify(ClassifyInput::Text("餐厅 合计 88.00".to_string()), false)
            .await?;
        assert_eq!(classified.result.amount, Some(88.0));
        assert_eq!(classified.result.amount_source, AmountSource::Heuristic);
        assert_eq!(classified.result.categories[0].label, "餐饮");
        Ok(())
    }

    #[tokio::test]
    async fn test_ocr_failure_is_fatal() {
        let classifier = Classifier::new(cache(), Arc::new(BrokenOcr), None);
        let result = classifier
            .classify(ClassifyInput::Images(vec![vec![0]]), false)
            .await;
        assert!(matches!(result, Err(Error::Ocr { .. })));
    }
}
