use std::cell::RefCell;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::{CategoryKind, Priority, Recommendation, SeoFactor, SeoReportData};

/// Structural problems found in a model response. `path` is a JSON pointer into the payload.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaViolation {
    #[error("response is not valid JSON: {message}")]
    MalformedJson { message: String },
    #[error("`{path}` must be a JSON object")]
    NotAnObject { path: String },
    #[error("`{path}` is missing required field `{field}`")]
    MissingField { path: String, field: String },
    #[error("`{path}` has unexpected field `{field}`")]
    UnexpectedField { path: String, field: String },
    #[error("`{path}` repeats field `{field}`")]
    DuplicateField { path: String, field: String },
    #[error("`{path}` must be of type {expected}")]
    WrongType { path: String, expected: &'static str },
    #[error("`{path}` score must be within 0..=100 (got {value})")]
    ScoreOutOfRange { path: String, value: String },
    #[error("`{path}` priority must be one of High, Medium, Low (got `{value}`)")]
    UnknownPriority { path: String, value: String },
    #[error("`{path}` must contain at least one recommendation")]
    EmptyRecommendations { path: String },
}

/// Validate a raw response body and bind it to the typed report.
///
/// Nothing is coerced: a score of `101` or `82.5` is rejected rather than clamped or
/// rounded. The only normalisation is trimming whitespace and an enclosing code fence.
pub fn parse_report(raw: &str) -> Result<SeoReportData, SchemaViolation> {
    let payload = extract_json_payload(raw);
    let value = parse_unique_keys(&payload)?;
    validate_report_value(&value)?;
    serde_json::from_value(value).map_err(|err| SchemaViolation::MalformedJson {
        message: err.to_string(),
    })
}

/// Parse JSON text into a [`Value`], rejecting any object that repeats a key.
fn parse_unique_keys(payload: &str) -> Result<Value, SchemaViolation> {
    let duplicate = RefCell::new(None);
    let mut deserializer = serde_json::Deserializer::from_str(payload);
    UniqueKeys::root(&duplicate)
        .deserialize(&mut deserializer)
        .and_then(|value| deserializer.end().map(|()| value))
        .map_err(|err| {
            duplicate.take().unwrap_or_else(|| SchemaViolation::MalformedJson {
                message: err.to_string(),
            })
        })
}

struct UniqueKeys<'a> {
    path: String,
    duplicate: &'a RefCell<Option<SchemaViolation>>,
}

impl<'a> UniqueKeys<'a> {
    fn root(duplicate: &'a RefCell<Option<SchemaViolation>>) -> Self {
        Self {
            path: String::new(),
            duplicate,
        }
    }

    fn child(&self, segment: &str) -> UniqueKeys<'a> {
        UniqueKeys {
            path: format!("{}/{segment}", self.path),
            duplicate: self.duplicate,
        }
    }
}

impl<'de> DeserializeSeed<'de> for UniqueKeys<'_> {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for UniqueKeys<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        self.deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(self.child(&items.len().to_string()))? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            if object.contains_key(&key) {
                let violation = SchemaViolation::DuplicateField {
                    path: display_path(&self.path),
                    field: key,
                };
                let message = violation.to_string();
                *self.duplicate.borrow_mut() = Some(violation);
                return Err(de::Error::custom(message));
            }
            let value = map.next_value_seed(self.child(&key))?;
            object.insert(key, value);
        }
        Ok(Value::Object(object))
    }
}

/// Walk an untyped payload and check it against the report shape.
pub fn validate_report_value(value: &Value) -> Result<(), SchemaViolation> {
    let root = expect_object(value, "")?;
    expect_exact_fields(root, "", SeoReportData::FIELDS)?;
    validate_score(&root["overallScore"], "/overallScore")?;

    for kind in CategoryKind::ALL {
        let path = format!("/{}", kind.field_name());
        let group = expect_object(&root[kind.field_name()], &path)?;
        expect_exact_fields(group, &path, kind.factor_keys())?;
        for key in kind.factor_keys() {
            validate_factor(&group[*key], &format!("{path}/{key}"))?;
        }
    }

    validate_recommendations(&root["recommendations"], "/recommendations")
}

fn validate_factor(value: &Value, path: &str) -> Result<(), SchemaViolation> {
    let factor = expect_object(value, path)?;
    expect_exact_fields(factor, path, SeoFactor::FIELDS)?;
    validate_score(&factor["score"], &format!("{path}/score"))?;
    expect_string(&factor["analysis"], &format!("{path}/analysis"))?;
    expect_string(&factor["recommendation"], &format!("{path}/recommendation"))?;
    Ok(())
}

fn validate_recommendations(value: &Value, path: &str) -> Result<(), SchemaViolation> {
    let items = value.as_array().ok_or_else(|| SchemaViolation::WrongType {
        path: path.to_string(),
        expected: "array",
    })?;
    if items.is_empty() {
        return Err(SchemaViolation::EmptyRecommendations {
            path: path.to_string(),
        });
    }
    for (idx, item) in items.iter().enumerate() {
        let item_path = format!("{path}/{idx}");
        let rec = expect_object(item, &item_path)?;
        expect_exact_fields(rec, &item_path, Recommendation::FIELDS)?;
        expect_string(&rec["text"], &format!("{item_path}/text"))?;
        expect_string(&rec["category"], &format!("{item_path}/category"))?;
        let priority_path = format!("{item_path}/priority");
        let priority = expect_string(&rec["priority"], &priority_path)?;
        if Priority::parse(priority).is_none() {
            return Err(SchemaViolation::UnknownPriority {
                path: priority_path,
                value: priority.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_score(value: &Value, path: &str) -> Result<(), SchemaViolation> {
    let Value::Number(number) = value else {
        return Err(SchemaViolation::WrongType {
            path: path.to_string(),
            expected: "integer",
        });
    };
    if !(number.is_i64() || number.is_u64()) {
        return Err(SchemaViolation::WrongType {
            path: path.to_string(),
            expected: "integer",
        });
    }
    match number.as_i64() {
        Some(score) if (0..=100).contains(&score) => Ok(()),
        _ => Err(SchemaViolation::ScoreOutOfRange {
            path: path.to_string(),
            value: number.to_string(),
        }),
    }
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaViolation> {
    value.as_object().ok_or_else(|| SchemaViolation::NotAnObject {
        path: display_path(path),
    })
}

fn expect_string<'a>(value: &'a Value, path: &str) -> Result<&'a str, SchemaViolation> {
    value.as_str().ok_or_else(|| SchemaViolation::WrongType {
        path: path.to_string(),
        expected: "string",
    })
}

/// Missing fields are reported before unexpected ones, each in a stable order.
fn expect_exact_fields(
    object: &Map<String, Value>,
    path: &str,
    fields: &[&str],
) -> Result<(), SchemaViolation> {
    if let Some(missing) = fields.iter().find(|field| !object.contains_key(**field)) {
        return Err(SchemaViolation::MissingField {
            path: display_path(path),
            field: (*missing).to_string(),
        });
    }
    let mut extras: Vec<_> = object
        .keys()
        .filter(|key| !fields.contains(&key.as_str()))
        .collect();
    extras.sort();
    if let Some(extra) = extras.first() {
        return Err(SchemaViolation::UnexpectedField {
            path: display_path(path),
            field: (*extra).clone(),
        });
    }
    Ok(())
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Trim the payload and strip one enclosing Markdown code fence, if present.
pub fn extract_json_payload(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(stripped) = strip_code_fence(trimmed) {
        return stripped;
    }
    trimmed.to_string()
}

fn strip_code_fence(input: &str) -> Option<String> {
    let mut trimmed = input.trim();
    if !trimmed.starts_with("```") {
        return None;
    }
    trimmed = trimmed.trim_start_matches("```");
    // The info string (`json`, `JSON`, ...) runs to the end of the opening line.
    match trimmed.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with(['{', '[']) => trimmed = rest,
        Some(_) => {}
        None => trimmed = trimmed.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    }
    trimmed = trimmed.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let end = trimmed.rfind("```").unwrap_or(trimmed.len());
    Some(trimmed[..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn factor(score: i64) -> Value {
        json!({ "score": score, "analysis": "analysis", "recommendation": "recommendation" })
    }

    fn group(kind: CategoryKind) -> Value {
        let mut map = Map::new();
        for key in kind.factor_keys() {
            map.insert((*key).to_string(), factor(75));
        }
        Value::Object(map)
    }

    fn valid_payload() -> Value {
        let mut root = Map::new();
        root.insert("overallScore".into(), json!(82));
        for kind in CategoryKind::ALL {
            root.insert(kind.field_name().into(), group(kind));
        }
        root.insert(
            "recommendations".into(),
            json!([{ "text": "Fix titles", "priority": "High", "category": "On-Page SEO" }]),
        );
        Value::Object(root)
    }

    #[test]
    fn accepts_complete_payload() {
        let report = parse_report(&valid_payload().to_string()).expect("payload should validate");
        assert_eq!(report.overall_score, 82);
        assert_eq!(report.technical_seo.robots_txt.score, 75);
        assert_eq!(report.recommendations[0].priority, Priority::High);
    }

    #[test]
    fn rejects_missing_group_key() {
        let mut payload = valid_payload();
        payload["technicalSeo"]
            .as_object_mut()
            .unwrap()
            .remove("robotsTxt");
        let err = parse_report(&payload.to_string()).unwrap_err();
        assert_eq!(
            err,
            SchemaViolation::MissingField {
                path: "/technicalSeo".into(),
                field: "robotsTxt".into()
            }
        );
    }

    #[test]
    fn rejects_extra_group_key() {
        let mut payload = valid_payload();
        payload["backlinks"]["anchorTextDiversity"] = factor(50);
        let err = parse_report(&payload.to_string()).unwrap_err();
        assert!(matches!(
            err,
            SchemaViolation::UnexpectedField { ref path, ref field }
                if path == "/backlinks" && field == "anchorTextDiversity"
        ));
    }

    #[test]
    fn out_of_range_scores_are_not_clamped() {
        let mut payload = valid_payload();
        payload["performanceSeo"]["siteSpeed"]["score"] = json!(101);
        let err = parse_report(&payload.to_string()).unwrap_err();
        assert_eq!(
            err,
            SchemaViolation::ScoreOutOfRange {
                path: "/performanceSeo/siteSpeed/score".into(),
                value: "101".into()
            }
        );

        let mut payload = valid_payload();
        payload["overallScore"] = json!(-1);
        assert!(matches!(
            parse_report(&payload.to_string()).unwrap_err(),
            SchemaViolation::ScoreOutOfRange { .. }
        ));
    }

    #[test]
    fn fractional_scores_are_wrong_type() {
        let mut payload = valid_payload();
        payload["socialPresence"]["socialLinks"]["score"] = json!(82.5);
        let err = parse_report(&payload.to_string()).unwrap_err();
        assert!(matches!(
            err,
            SchemaViolation::WrongType { expected: "integer", .. }
        ));
    }

    #[test]
    fn rejects_unknown_priority() {
        let mut payload = valid_payload();
        payload["recommendations"][0]["priority"] = json!("Urgent");
        let err = parse_report(&payload.to_string()).unwrap_err();
        assert_eq!(
            err,
            SchemaViolation::UnknownPriority {
                path: "/recommendations/0/priority".into(),
                value: "Urgent".into()
            }
        );
    }

    #[test]
    fn rejects_empty_recommendations() {
        let mut payload = valid_payload();
        payload["recommendations"] = json!([]);
        assert!(matches!(
            parse_report(&payload.to_string()).unwrap_err(),
            SchemaViolation::EmptyRecommendations { .. }
        ));
    }

    #[test]
    fn rejects_non_object_root_and_garbage() {
        assert!(matches!(
            parse_report("[1, 2, 3]").unwrap_err(),
            SchemaViolation::NotAnObject { ref path } if path == "/"
        ));
        assert!(matches!(
            parse_report("not json").unwrap_err(),
            SchemaViolation::MalformedJson { .. }
        ));
    }

    #[test]
    fn accepts_fenced_payload() {
        let fenced = format!("```json\n{}\n```", valid_payload());
        assert!(parse_report(&fenced).is_ok());
    }

    #[test]
    fn fence_info_string_is_case_insensitive() {
        for info in ["JSON", "Json", "", "jsonc"] {
            let fenced = format!("```{info}\n{}\n```", valid_payload());
            assert!(parse_report(&fenced).is_ok(), "info string `{info}`");
        }
        assert_eq!(extract_json_payload("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(extract_json_payload("```JSON {\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn rejects_repeated_group_key() {
        let payload = valid_payload().to_string().replacen(
            "\"robotsTxt\":{",
            "\"robotsTxt\":{\"score\":10,\"analysis\":\"a\",\"recommendation\":\"r\"},\"robotsTxt\":{",
            1,
        );
        let err = parse_report(&payload).unwrap_err();
        assert_eq!(
            err,
            SchemaViolation::DuplicateField {
                path: "/technicalSeo".into(),
                field: "robotsTxt".into()
            }
        );
    }

    #[test]
    fn rejects_repeated_root_field_and_trailing_data() {
        let payload = valid_payload().to_string().replacen(
            "\"overallScore\":82",
            "\"overallScore\":82,\"overallScore\":90",
            1,
        );
        let err = parse_report(&payload).unwrap_err();
        assert_eq!(err.to_string(), "`/` repeats field `overallScore`");

        let trailing = format!("{} {{}}", valid_payload());
        assert!(matches!(
            parse_report(&trailing).unwrap_err(),
            SchemaViolation::MalformedJson { .. }
        ));
    }

    #[test]
    fn extract_json_payload_preserves_unfenced() {
        assert_eq!(extract_json_payload("  {\"a\":1}\n"), "{\"a\":1}");
    }
}
