use serde::Deserialize;
use serde_json::{json, Value};

use crate::services;
use crate::tools::{error, parse_args, RemoteServices};
use crate::types::IcdCode;

fn require<'a>(remotes: Option<&'a RemoteServices>) -> Result<&'a RemoteServices, Value> {
    remotes.ok_or_else(|| error("Remote services not configured"))
}

fn default_max_results() -> usize {
    10
}

#[derive(Deserialize)]
struct CodeArgs {
    code: String,
}

pub(crate) async fn medline_topic(remotes: Option<&RemoteServices>, args: Value) -> Value {
    let args: CodeArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };
    let remotes = match require(remotes) {
        Ok(remotes) => remotes,
        Err(e) => return e,
    };

    let code = IcdCode::new(args.code);
    match remotes.medline.topic(&code).await {
        Ok(data) => json!({
            "status": "success",
            "icd10_code": code.as_str(),
            "source": "Medline Plus",
            "data": data,
        }),
        Err(e) => error(e.to_string()),
    }
}

#[derive(Deserialize)]
struct ConditionArgs {
    condition: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

pub(crate) async fn search_clinical_trials(remotes: Option<&RemoteServices>, args: Value) -> Value {
    let args: ConditionArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };
    let remotes = match require(remotes) {
        Ok(remotes) => remotes,
        Err(e) => return e,
    };

    match remotes.trials.search(&args.condition, args.max_results).await {
        Ok(data) => json!({
            "status": "success",
            "condition": args.condition,
            "source": "ClinicalTrials.gov",
            "data": data,
        }),
        Err(e) => error(e.to_string()),
    }
}

pub(crate) async fn search_literature(remotes: Option<&RemoteServices>, args: Value) -> Value {
    let args: ConditionArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };
    let remotes = match require(remotes) {
        Ok(remotes) => remotes,
        Err(e) => return e,
    };

    let results = services::search_literature(
        &remotes.trials,
        &remotes.pubmed,
        &args.condition,
        args.max_results,
    )
    .await;
    json!({ "status": "success", "results": results })
}

#[derive(Deserialize)]
struct EvidenceArgs {
    code: String,
    condition: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

pub(crate) async fn gather_evidence(remotes: Option<&RemoteServices>, args: Value) -> Value {
    let args: EvidenceArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };
    let remotes = match require(remotes) {
        Ok(remotes) => remotes,
        Err(e) => return e,
    };

    let evidence = services::gather_evidence(
        &remotes.medline,
        &remotes.trials,
        &remotes.pubmed,
        &IcdCode::new(args.code),
        &args.condition,
        args.max_results,
    )
    .await;
    json!({ "status": "success", "evidence": evidence })
}
