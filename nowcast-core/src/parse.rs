//! Tolerant decoding of KMA response bodies.
//!
//! The API is asked for JSON but answers quota and auth failures with XML,
//! and occasionally prefixes JSON with a BOM or stray text. Bodies go
//! through an ordered list of strategies before being treated as fatal.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    error::{Result, WeatherError},
    model::{ForecastItem, ObservationRecord},
};

const SNIPPET_CHARS: usize = 120;
const SUCCESS_CODE: &str = "00";

static XML_MESSAGE_RE: OnceLock<Vec<Regex>> = OnceLock::new();

type Strategy = fn(&str) -> Option<Value>;

const STRATEGIES: [(&str, Strategy); 3] = [
    ("as-is", parse_as_is),
    ("bom-stripped", parse_without_bom),
    ("from-first-bracket", parse_from_first_bracket),
];

fn parse_as_is(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

fn parse_without_bom(text: &str) -> Option<Value> {
    let stripped = text.strip_prefix('\u{feff}')?;
    serde_json::from_str(stripped).ok()
}

fn parse_from_first_bracket(text: &str) -> Option<Value> {
    let start = text.find(['{', '['])?;
    serde_json::from_str(&text[start..]).ok()
}

/// Decode a response body into JSON, falling back through the strategies
/// above and then producing the most specific error available.
pub fn parse_body(text: &str) -> Result<Value> {
    for (name, strategy) in STRATEGIES {
        if let Some(value) = strategy(text) {
            if name != "as-is" {
                tracing::debug!(strategy = name, "Recovered JSON from malformed body");
            }
            return Ok(value);
        }
    }

    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(WeatherError::upstream("response empty"));
    }

    if trimmed.starts_with('<') {
        return Err(match xml_error_message(trimmed) {
            Some(message) => WeatherError::upstream(message),
            None => WeatherError::upstream("returned XML instead of JSON"),
        });
    }

    Err(WeatherError::upstream(format!(
        "Failed to parse response as JSON: {}",
        snippet(trimmed)
    )))
}

fn xml_error_message(xml: &str) -> Option<String> {
    let patterns = XML_MESSAGE_RE.get_or_init(|| {
        ["returnAuthMsg", "resultMsg"]
            .iter()
            .filter_map(|tag| Regex::new(&format!(r"(?s)<{tag}>\s*(.*?)\s*</{tag}>")).ok())
            .collect()
    });

    patterns
        .iter()
        .filter_map(|re| re.captures(xml))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .find(|msg| !msg.is_empty())
}

/// First `SNIPPET_CHARS` characters of `body`, for error messages.
pub fn snippet(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: ResponseBody,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    header: Option<Header>,
    #[serde(default)]
    body: Option<Body>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    #[serde(deserialize_with = "string_or_number")]
    result_code: String,
    #[serde(default)]
    result_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Body {
    // `items` is an object on success but an empty string on some no-data
    // responses, so keep it loose.
    #[serde(default)]
    items: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NowcastItem {
    category: String,
    #[serde(deserialize_with = "string_or_number")]
    obsr_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastRow {
    category: String,
    #[serde(deserialize_with = "string_or_number")]
    fcst_date: String,
    #[serde(deserialize_with = "string_or_number")]
    fcst_time: String,
    #[serde(deserialize_with = "string_or_number")]
    fcst_value: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

/// Check the envelope's result code and return the raw `item` entries.
pub fn validated_items(value: Value) -> Result<Vec<Value>> {
    let envelope: Envelope = serde_json::from_value(value)
        .map_err(|e| WeatherError::upstream(format!("Unexpected response shape: {e}")))?;

    let header = envelope
        .response
        .header
        .ok_or_else(|| WeatherError::upstream("Response header missing"))?;

    if header.result_code != SUCCESS_CODE {
        let message = header
            .result_msg
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("result code {}", header.result_code));
        return Err(WeatherError::upstream(message));
    }

    let items = envelope.response.body.map(|b| b.items).unwrap_or(Value::Null);
    let item = match items {
        Value::Object(mut map) => map.remove("item").unwrap_or(Value::Null),
        _ => Value::Null,
    };

    Ok(match item {
        Value::Array(entries) => entries,
        Value::Object(_) => vec![item],
        _ => Vec::new(),
    })
}

/// Decode a nowcast body into an [`ObservationRecord`].
pub fn parse_nowcast(text: &str) -> Result<ObservationRecord> {
    let items = validated_items(parse_body(text)?)?;

    let mut record = ObservationRecord::default();
    for entry in items {
        match serde_json::from_value::<NowcastItem>(entry) {
            Ok(item) => record.insert_first(item.category, item.obsr_value),
            Err(e) => tracing::debug!("Skipping malformed nowcast item: {e}"),
        }
    }

    Ok(record)
}

/// Decode a short-term forecast body into its series.
pub fn parse_forecast(text: &str) -> Result<Vec<ForecastItem>> {
    let items = validated_items(parse_body(text)?)?;

    Ok(items
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<ForecastRow>(entry) {
            Ok(row) => Some(ForecastItem {
                category: row.category,
                fcst_date: row.fcst_date,
                fcst_time: row.fcst_time,
                fcst_value: row.fcst_value,
            }),
            Err(e) => {
                tracing::debug!("Skipping malformed forecast item: {e}");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nowcast_body() -> String {
        json!({
            "response": {
                "header": { "resultCode": "00", "resultMsg": "NORMAL_SERVICE" },
                "body": {
                    "dataType": "JSON",
                    "items": { "item": [
                        { "baseDate": "20261016", "baseTime": "1400", "category": "T1H", "nx": 60, "ny": 127, "obsrValue": "15.2" },
                        { "baseDate": "20261016", "baseTime": "1400", "category": "PTY", "nx": 60, "ny": 127, "obsrValue": "0" },
                        { "baseDate": "20261016", "baseTime": "1400", "category": "VEC", "nx": 60, "ny": 127, "obsrValue": 95 }
                    ]},
                    "pageNo": 1, "numOfRows": 100, "totalCount": 3
                }
            }
        })
        .to_string()
    }

    #[test]
    fn parses_plain_json() {
        let value = parse_body(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn bom_prefixed_body_parses_identically() {
        let plain = nowcast_body();
        let with_bom = format!("\u{feff}{plain}");
        assert_eq!(parse_body(&with_bom).unwrap(), parse_body(&plain).unwrap());
    }

    #[test]
    fn recovers_from_leading_garbage() {
        let value = parse_body("garbage before {\"ok\": true}").unwrap();
        assert_eq!(value, json!({"ok": true}));

        let value = parse_body("\n\n[1, 2]").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn empty_body_is_reported() {
        assert_eq!(parse_body("").unwrap_err().to_string(), "response empty");
        assert_eq!(parse_body("  \n ").unwrap_err().to_string(), "response empty");
    }

    #[test]
    fn xml_result_msg_becomes_error_message() {
        let xml = "<response><header><resultCode>30</resultCode>\
                   <resultMsg>SERVICE KEY IS NOT REGISTERED</resultMsg></header></response>";
        assert_eq!(parse_body(xml).unwrap_err().to_string(), "SERVICE KEY IS NOT REGISTERED");
    }

    #[test]
    fn xml_return_auth_msg_is_preferred() {
        let xml = "<OpenAPI_ServiceResponse><cmmMsgHeader>\
                   <errMsg>SERVICE ERROR</errMsg>\
                   <returnAuthMsg>SERVICE_KEY_IS_NOT_REGISTERED_ERROR</returnAuthMsg>\
                   <resultMsg>other</resultMsg>\
                   </cmmMsgHeader></OpenAPI_ServiceResponse>";
        assert_eq!(
            parse_body(xml).unwrap_err().to_string(),
            "SERVICE_KEY_IS_NOT_REGISTERED_ERROR"
        );
    }

    #[test]
    fn xml_without_known_element() {
        let err = parse_body("<html><body>Bad Gateway</body></html>").unwrap_err();
        assert_eq!(err.to_string(), "returned XML instead of JSON");
    }

    #[test]
    fn unparseable_text_includes_truncated_snippet() {
        let body = "x".repeat(300);
        let msg = parse_body(&body).unwrap_err().to_string();
        assert!(msg.starts_with("Failed to parse response as JSON: "));
        assert!(msg.contains(&"x".repeat(120)));
        assert!(!msg.contains(&"x".repeat(121)));
    }

    #[test]
    fn snippet_counts_characters_not_bytes() {
        let body = "가".repeat(130);
        let s = snippet(&body);
        assert_eq!(s.chars().filter(|c| *c == '가').count(), 120);
        assert!(s.ends_with("..."));
        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn nowcast_items_become_record() {
        let record = parse_nowcast(&nowcast_body()).unwrap();
        assert_eq!(record.get("T1H"), Some("15.2"));
        assert_eq!(record.get("PTY"), Some("0"));
        assert_eq!(record.get("VEC"), Some("95"));
        assert_eq!(record.get("RN1"), None);
    }

    #[test]
    fn non_success_result_code_carries_message() {
        let body = json!({
            "response": { "header": { "resultCode": "03", "resultMsg": "NO_DATA" } }
        })
        .to_string();
        assert_eq!(parse_nowcast(&body).unwrap_err().to_string(), "NO_DATA");
    }

    #[test]
    fn empty_items_string_yields_empty_series() {
        let body = json!({
            "response": {
                "header": { "resultCode": "00", "resultMsg": "NORMAL_SERVICE" },
                "body": { "items": "" }
            }
        })
        .to_string();
        assert!(parse_forecast(&body).unwrap().is_empty());
    }

    #[test]
    fn single_item_object_is_accepted() {
        let body = json!({
            "response": {
                "header": { "resultCode": "00", "resultMsg": "NORMAL_SERVICE" },
                "body": { "items": { "item": {
                    "category": "SKY", "fcstDate": "20261016", "fcstTime": "1500", "fcstValue": "3"
                }}}
            }
        })
        .to_string();
        let series = parse_forecast(&body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].fcst_value, "3");
    }

    #[test]
    fn forecast_numeric_fields_become_strings() {
        let body = json!({
            "response": {
                "header": { "resultCode": "00", "resultMsg": "NORMAL_SERVICE" },
                "body": { "items": { "item": [
                    { "category": "SKY", "fcstDate": 20261016, "fcstTime": "0800", "fcstValue": 4 },
                    { "fcstDate": "20261016" }
                ]}}
            }
        })
        .to_string();
        let series = parse_forecast(&body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].fcst_date, "20261016");
        assert_eq!(series[0].fcst_value, "4");
    }
}
