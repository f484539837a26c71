//! Rule-based extraction used when the LLM is unavailable or unhelpful.

use super::{AiExtraction, CategoryScore};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Amounts at or above this are assumed to be reference numbers, not prices.
pub const MAX_AMOUNT: f64 = 200_000.0;

#[allow(clippy::expect_used)]
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?").expect("number pattern is valid")
});

#[allow(clippy::expect_used)]
static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("json block pattern is valid"));

/// Keyword rules: label, then lowercase keywords that vote for it.
const CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "餐饮",
        &["餐", "饭", "咖啡", "奶茶", "外卖", "restaurant", "cafe", "coffee", "meal", "food"],
    ),
    (
        "交通",
        &["地铁", "公交", "出租", "打车", "加油", "停车", "taxi", "uber", "metro", "fuel", "parking"],
    ),
    (
        "购物",
        &["超市", "商场", "淘宝", "京东", "便利店", "market", "store", "shop", "mall"],
    ),
    (
        "住房",
        &["房租", "物业", "水费", "电费", "燃气", "rent", "utility", "electric"],
    ),
    ("医疗", &["医院", "药", "诊所", "pharmacy", "hospital", "clinic"]),
    ("娱乐", &["电影", "游戏", "演出", "cinema", "movie", "game", "ktv"]),
];

/// Label used when no rule matches.
pub const FALLBACK_CATEGORY: &str = "其他";

/// Guesses the total from free text.
///
/// Every number in `(0, MAX_AMOUNT)` is a candidate. Numbers with a fractional
/// part win over bare integers (quantities, reference and date fragments); within
/// the winning group the maximum is taken.
#[must_use]
pub fn guess_amount(text: &str) -> Option<f64> {
    let mut best_decimal: Option<f64> = None;
    let mut best_integer: Option<f64> = None;

    for token in NUMBER.find_iter(text) {
        let raw = token.as_str().replace(',', "");
        let Ok(value) = raw.parse::<f64>() else {
            continue;
        };
        if !(value > 0.0 && value < MAX_AMOUNT) {
            continue;
        }
        let slot = if raw.contains('.') {
            &mut best_decimal
        } else {
            &mut best_integer
        };
        *slot = Some(slot.map_or(value, |best| best.max(value)));
    }

    best_decimal.or(best_integer)
}

/// Scores every category rule against `text`, best first.
#[must_use]
pub fn guess_categories(text: &str) -> Vec<CategoryScore> {
    let haystack = text.to_lowercase();
    let mut scored: Vec<CategoryScore> = CATEGORY_RULES
        .iter()
        .filter_map(|(label, keywords)| {
            let hits = keywords.iter().filter(|k| haystack.contains(*k)).count();
            (hits > 0).then(|| CategoryScore {
                label: (*label).to_string(),
                score: (0.5 + 0.1 * hits as f64).min(0.9),
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    if scored.is_empty() {
        scored.push(CategoryScore {
            label: FALLBACK_CATEGORY.to_string(),
            score: 0.1,
        });
    }
    scored
}

/// Returns the outermost `{...}` span of an LLM reply.
#[must_use]
pub fn extract_json_block(reply: &str) -> Option<&str> {
    JSON_BLOCK.find(reply).map(|m| m.as_str())
}

/// Parses the model's JSON answer; `None` means "AI unavailable".
#[must_use]
pub fn parse_ai_reply(reply: &str) -> Option<AiExtraction> {
    let value: Value = serde_json::from_str(extract_json_block(reply)?).ok()?;
    let object = value.as_object()?;

    let amount = object.get("amount").and_then(number_like);
    let merchant = object
        .get("merchant")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);
    let ts = object
        .get("ts")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(ToString::to_string);
    let categories = object
        .get("categories")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(category_like).collect())
        .unwrap_or_default();

    Some(AiExtraction {
        amount,
        merchant,
        ts,
        categories,
    })
}

fn number_like(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|amount| amount.is_finite())
}

fn category_like(value: &Value) -> Option<CategoryScore> {
    match value {
        Value::String(label) if !label.trim().is_empty() => Some(CategoryScore {
            label: label.trim().to_string(),
            score: 1.0,
        }),
        Value::Object(map) => {
            let label = map.get("label").and_then(Value::as_str)?.trim();
            (!label.is_empty()).then(|| CategoryScore {
                label: label.to_string(),
                score: map.get("score").and_then(number_like).unwrap_or(1.0),
            })
        }
        _ => None,
    }
}
