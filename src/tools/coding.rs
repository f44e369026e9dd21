use serde::Deserialize;
use serde_json::{json, Value};

use crate::pipeline::CodeResolver;
use crate::tools::{error, parse_args};
use crate::types::{ClinicalNote, IcdCode, Resolution};

#[derive(Deserialize)]
struct ResolveArgs {
    text: String,
    top_k: Option<usize>,
}

#[derive(Deserialize)]
struct TextArgs {
    text: String,
}

#[derive(Deserialize)]
struct CodeArgs {
    code: String,
}

pub(crate) async fn resolve_codes(resolver: &CodeResolver, args: Value) -> Value {
    let args: ResolveArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    let note = match ClinicalNote::new(args.text, args.top_k) {
        Ok(note) => note,
        Err(e) => return error(e.to_string()),
    };

    match resolver.resolve(&note).await {
        Ok(resolution) => resolution_json(&resolution),
        Err(e) => error(e.to_string()),
    }
}

fn resolution_json(resolution: &Resolution) -> Value {
    let codes: Vec<Value> = resolution
        .codes
        .iter()
        .map(|c| {
            json!({
                "code": c.code.as_str(),
                "name": c.display_name,
                "text": c.source_span.text,
                "confidence": c.confidence,
            })
        })
        .collect();

    let mut body = json!({ "codes": codes, "status": "success" });
    if resolution.diagnostics.degraded {
        body["degraded"] = json!(true);
        body["entities"] = entities_json(&resolution.entities);
    }
    body
}

pub(crate) async fn extract_entities(resolver: &CodeResolver, args: Value) -> Value {
    let args: TextArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    match resolver.annotate(&args.text).await {
        Ok(entities) => json!({
            "entities": entities_json(&entities),
            "status": "success",
        }),
        Err(e) => error(e.to_string()),
    }
}

fn entities_json(entities: &[crate::types::AnnotatedSpan]) -> Value {
    Value::Array(
        entities
            .iter()
            .map(|e| {
                json!({
                    "text": e.text,
                    "label": e.label.as_label(),
                    "start_char": e.start,
                    "end_char": e.end,
                    "concept_id": e.concept_id.as_ref().map(|c| c.as_str()),
                })
            })
            .collect(),
    )
}

pub(crate) async fn code_details(resolver: &CodeResolver, args: Value) -> Value {
    let args: CodeArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    let code = IcdCode::new(args.code);
    match resolver.code_details(&code).await {
        Ok(Some(details)) => json!({
            "code": details.code.as_str(),
            "name": details.name,
            "category": details.category,
            "block": details.block,
            "chapter": details.chapter,
        }),
        Ok(None) => error(format!("Unknown ICD code: {code}")),
        Err(e) => error(e.to_string()),
    }
}

pub(crate) async fn validate_code(resolver: &CodeResolver, args: Value) -> Value {
    let args: CodeArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    let code = IcdCode::new(args.code);
    let validation = resolver.validate_code(&code).await;
    json!({
        "code": validation.code.as_str(),
        "is_valid_format": validation.is_valid_format,
        "is_known_code": validation.is_known_code,
    })
}
