//! Callable tool surface for an LLM tool-calling runtime.
//!
//! Every tool takes a JSON argument object and resolves to a JSON value
//! carrying a `"status"` discriminator (`"success"` or `"error"`, except
//! `validate_code` and `code_details`, whose success shapes are bare per
//! their contracts). No Rust error type and no panic ever crosses this
//! boundary.

mod coding;
mod evidence;
mod wrappers;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::pipeline::CodeResolver;
use crate::services::{
    BayesianClient, MedlineClient, OptimalClient, PubMedClient, TrialsClient, VisionClient,
};

/// A tool/function exposed to the LLM runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (e.g. "resolve_codes")
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the tool's parameters
    pub parameters: Value,
}

/// Clients for the single-call wrapper tools. Optional as a group: a
/// registry without remotes still serves the full coding surface, and the
/// remote tools answer with an error shape instead of reaching out.
pub struct RemoteServices {
    pub bayesian: BayesianClient,
    pub optimal: OptimalClient,
    pub vision: VisionClient,
    pub medline: MedlineClient,
    pub trials: TrialsClient,
    pub pubmed: PubMedClient,
}

pub struct ToolRegistry {
    resolver: Arc<CodeResolver>,
    remotes: Option<RemoteServices>,
}

impl ToolRegistry {
    pub fn new(resolver: Arc<CodeResolver>) -> Self {
        Self {
            resolver,
            remotes: None,
        }
    }

    pub fn with_remotes(mut self, remotes: RemoteServices) -> Self {
        self.remotes = Some(remotes);
        self
    }

    /// Dispatch one tool call by name. Unknown names and malformed
    /// arguments resolve to the error shape.
    pub async fn call(&self, name: &str, args: Value) -> Value {
        match name {
            "resolve_codes" => coding::resolve_codes(&self.resolver, args).await,
            "extract_entities" => coding::extract_entities(&self.resolver, args).await,
            "code_details" => coding::code_details(&self.resolver, args).await,
            "validate_code" => coding::validate_code(&self.resolver, args).await,
            "predict_sepsis" => wrappers::predict_sepsis(self.remotes.as_ref(), args).await,
            "list_bayesian_models" => wrappers::list_bayesian_models(),
            "build_linear_problem" => wrappers::build_linear_problem(args),
            "build_portfolio_problem" => wrappers::build_portfolio_problem(args),
            "build_resource_allocation_problem" => {
                wrappers::build_resource_allocation_problem(args)
            }
            "build_supply_chain_problem" => wrappers::build_supply_chain_problem(args),
            "validate_optimization_problem" => wrappers::validate_optimization_problem(args),
            "solve_optimization" => wrappers::solve_optimization(self.remotes.as_ref(), args).await,
            "analyze_medical_image" => {
                wrappers::analyze_medical_image(self.remotes.as_ref(), args).await
            }
            "medline_topic" => evidence::medline_topic(self.remotes.as_ref(), args).await,
            "search_clinical_trials" => {
                evidence::search_clinical_trials(self.remotes.as_ref(), args).await
            }
            "search_literature" => evidence::search_literature(self.remotes.as_ref(), args).await,
            "gather_evidence" => evidence::gather_evidence(self.remotes.as_ref(), args).await,
            _ => error(format!("Unknown tool: {name}")),
        }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            tool(
                "resolve_codes",
                "Map clinical free-text to ranked ICD-10 code candidates",
                json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string", "description": "Clinical note or summary text" },
                        "top_k": { "type": "integer", "minimum": 1, "maximum": 10, "default": 5 }
                    },
                    "required": ["text"]
                }),
            ),
            tool(
                "extract_entities",
                "Extract clinical entities from text with concept annotations",
                json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string", "description": "Clinical note or summary text" }
                    },
                    "required": ["text"]
                }),
            ),
            tool(
                "code_details",
                "Get name, category, block, and chapter for an ICD-10 code",
                json!({
                    "type": "object",
                    "properties": {
                        "code": { "type": "string", "description": "ICD-10 code (e.g. 'E11.9')" }
                    },
                    "required": ["code"]
                }),
            ),
            tool(
                "validate_code",
                "Check whether an ICD-10 code is well-formed and known",
                json!({
                    "type": "object",
                    "properties": {
                        "code": { "type": "string", "description": "ICD-10 code to validate" }
                    },
                    "required": ["code"]
                }),
            ),
            tool(
                "predict_sepsis",
                "Run the Bayesian sepsis model on a set of vitals",
                json!({
                    "type": "object",
                    "properties": {
                        "temp": { "type": "number", "description": "Temperature in Celsius" },
                        "hr": { "type": "integer", "description": "Heart rate in bpm" },
                        "wbc": { "type": "number", "description": "White blood cell count in K/uL" },
                        "systolic_bp": { "type": "integer" },
                        "diastolic_bp": { "type": "integer" },
                        "respiratory_rate": { "type": "integer" }
                    },
                    "required": ["temp", "hr", "wbc"]
                }),
            ),
            tool(
                "list_bayesian_models",
                "Describe the available Bayesian models and their input schemas",
                json!({ "type": "object", "properties": {} }),
            ),
            tool(
                "build_linear_problem",
                "Build a linear optimization problem schema",
                json!({
                    "type": "object",
                    "properties": {
                        "objective_type": { "type": "string", "enum": ["minimize", "maximize"] },
                        "variables": { "type": "array", "items": { "type": "object" } },
                        "constraints": { "type": "array", "items": { "type": "object" } },
                        "parameters": { "type": "object" }
                    },
                    "required": ["objective_type", "variables", "constraints"]
                }),
            ),
            tool(
                "build_portfolio_problem",
                "Build a Markowitz portfolio optimization problem schema",
                json!({
                    "type": "object",
                    "properties": {
                        "assets": { "type": "array", "items": { "type": "string" } },
                        "expected_returns": { "type": "array", "items": { "type": "number" } },
                        "covariance_matrix": { "type": "array", "items": { "type": "array", "items": { "type": "number" } } },
                        "target_return": { "type": "number" },
                        "risk_free_rate": { "type": "number", "default": 0.02 }
                    },
                    "required": ["assets", "expected_returns", "covariance_matrix"]
                }),
            ),
            tool(
                "build_resource_allocation_problem",
                "Build a resource-allocation optimization problem schema",
                json!({
                    "type": "object",
                    "properties": {
                        "resources": { "type": "array", "items": { "type": "string" } },
                        "tasks": { "type": "array", "items": { "type": "string" } },
                        "resource_capacities": { "type": "object", "additionalProperties": { "type": "number" } },
                        "task_requirements": { "type": "object", "additionalProperties": { "type": "object", "additionalProperties": { "type": "number" } } },
                        "task_priorities": { "type": "object", "additionalProperties": { "type": "number" } }
                    },
                    "required": ["resources", "tasks"]
                }),
            ),
            tool(
                "build_supply_chain_problem",
                "Build a two-echelon supply-chain flow optimization problem schema",
                json!({
                    "type": "object",
                    "properties": {
                        "suppliers": { "type": "array", "items": { "type": "string" } },
                        "warehouses": { "type": "array", "items": { "type": "string" } },
                        "customers": { "type": "array", "items": { "type": "string" } },
                        "supplier_capacities": { "type": "object", "additionalProperties": { "type": "number" } },
                        "warehouse_capacities": { "type": "object", "additionalProperties": { "type": "number" } },
                        "customer_demands": { "type": "object", "additionalProperties": { "type": "number" } },
                        "transportation_costs": { "type": "object", "additionalProperties": { "type": "object", "additionalProperties": { "type": "number" } } }
                    },
                    "required": ["suppliers", "warehouses", "customers"]
                }),
            ),
            tool(
                "validate_optimization_problem",
                "Check a problem schema for structural defects before solving",
                json!({
                    "type": "object",
                    "properties": {
                        "problem": { "type": "object", "description": "Problem schema to check" }
                    },
                    "required": ["problem"]
                }),
            ),
            tool(
                "solve_optimization",
                "Send an optimization problem to the solver service",
                json!({
                    "type": "object",
                    "properties": {
                        "problem": { "type": "object", "description": "Problem schema from a build_* tool" }
                    },
                    "required": ["problem"]
                }),
            ),
            tool(
                "analyze_medical_image",
                "Run the medical vision model on an image URL and return findings",
                json!({
                    "type": "object",
                    "properties": {
                        "image_url": { "type": "string", "description": "Public or signed URL to a medical image" },
                        "view": { "type": "string", "enum": ["AP", "PA", "Lateral", "DermCloseUp", "Other"] },
                        "prompt": { "type": "string", "description": "Optional free-text question for the model" }
                    },
                    "required": ["image_url"]
                }),
            ),
            tool(
                "medline_topic",
                "Fetch the MedlinePlus health topic for an ICD-10 code",
                json!({
                    "type": "object",
                    "properties": {
                        "code": { "type": "string", "description": "ICD-10 code (e.g. 'E11.9')" }
                    },
                    "required": ["code"]
                }),
            ),
            tool(
                "search_clinical_trials",
                "Search ClinicalTrials.gov for a condition",
                json!({
                    "type": "object",
                    "properties": {
                        "condition": { "type": "string" },
                        "max_results": { "type": "integer", "default": 10 }
                    },
                    "required": ["condition"]
                }),
            ),
            tool(
                "search_literature",
                "Search clinical trials and PubMed for a condition",
                json!({
                    "type": "object",
                    "properties": {
                        "condition": { "type": "string" },
                        "max_results": { "type": "integer", "default": 10 }
                    },
                    "required": ["condition"]
                }),
            ),
            tool(
                "gather_evidence",
                "Gather Medline and literature evidence for a code/condition pair",
                json!({
                    "type": "object",
                    "properties": {
                        "code": { "type": "string", "description": "ICD-10 code" },
                        "condition": { "type": "string", "description": "Human-readable condition name" },
                        "max_results": { "type": "integer", "default": 10 }
                    },
                    "required": ["code", "condition"]
                }),
            ),
        ]
    }
}

fn tool(name: &str, description: &str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

pub(crate) fn error(message: impl Into<String>) -> Value {
    json!({ "status": "error", "error": message.into() })
}

pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, Value> {
    serde_json::from_value(args).map_err(|e| error(format!("Invalid arguments: {e}")))
}
