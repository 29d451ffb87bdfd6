//! Response-shape declarations handed to the analysis model.
//!
//! Both dialects are generated from the same key tables the validator uses, so the
//! declaration and the validation pass cannot disagree about which fields exist.

use serde_json::{json, Map, Value};

use super::{CategoryKind, Priority, Recommendation, SeoFactor, SeoReportData};

/// Schema in the Gemini `responseSchema` dialect.
pub fn response_schema() -> Value {
    build(Dialect::Gemini)
}

/// Schema in the JSON-Schema dialect accepted by OpenAI structured outputs.
pub fn openai_json_schema() -> Value {
    build(Dialect::JsonSchema)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Gemini,
    JsonSchema,
}

impl Dialect {
    fn ty(self, name: &str) -> Value {
        match self {
            Dialect::Gemini => Value::String(name.to_ascii_uppercase()),
            Dialect::JsonSchema => Value::String(name.to_ascii_lowercase()),
        }
    }
}

fn build(dialect: Dialect) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "overallScore".into(),
        json!({
            "type": dialect.ty("integer"),
            "description": "A comprehensive overall SEO score from 0 to 100, weighing every factor below.",
        }),
    );
    for kind in CategoryKind::ALL {
        properties.insert(kind.field_name().into(), group_schema(dialect, kind));
    }
    properties.insert("recommendations".into(), recommendations_schema(dialect));
    object(dialect, properties, SeoReportData::FIELDS)
}

fn group_schema(dialect: Dialect, kind: CategoryKind) -> Value {
    let properties = kind
        .factor_keys()
        .iter()
        .map(|key| ((*key).to_string(), factor_schema(dialect)))
        .collect();
    object(dialect, properties, kind.factor_keys())
}

fn factor_schema(dialect: Dialect) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "score".into(),
        json!({
            "type": dialect.ty("integer"),
            "description": "A score from 0 to 100 for this specific SEO factor.",
        }),
    );
    properties.insert(
        "analysis".into(),
        json!({
            "type": dialect.ty("string"),
            "description": "An in-depth analysis of this factor: its current state and why it matters for SEO.",
        }),
    );
    properties.insert(
        "recommendation".into(),
        json!({
            "type": dialect.ty("string"),
            "description": "A specific, actionable recommendation to improve this factor, with code examples where relevant.",
        }),
    );
    object(dialect, properties, SeoFactor::FIELDS)
}

fn recommendations_schema(dialect: Dialect) -> Value {
    let priorities: Vec<_> = Priority::ALL.iter().map(|p| p.as_str()).collect();
    let mut properties = Map::new();
    properties.insert(
        "text".into(),
        json!({
            "type": dialect.ty("string"),
            "description": "The actionable recommendation text.",
        }),
    );
    properties.insert(
        "priority".into(),
        json!({
            "type": dialect.ty("string"),
            "enum": priorities,
            "description": "The priority of the task.",
        }),
    );
    properties.insert(
        "category".into(),
        json!({
            "type": dialect.ty("string"),
            "description": "The SEO category this recommendation falls under (e.g. On-Page SEO, Performance).",
        }),
    );
    json!({
        "type": dialect.ty("array"),
        "items": object(dialect, properties, Recommendation::FIELDS),
        "description": "The top 5 most actionable recommendations to improve the site's SEO, ordered by impact.",
    })
}

fn object(dialect: Dialect, properties: Map<String, Value>, required: &[&str]) -> Value {
    let mut schema = json!({
        "type": dialect.ty("object"),
        "properties": properties,
        "required": required,
    });
    if dialect == Dialect::JsonSchema {
        schema["additionalProperties"] = Value::Bool(false);
    }
    schema
}
