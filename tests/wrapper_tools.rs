use std::sync::Arc;

use medcode_core::cache::{CacheConfig, ResolutionCache};
use medcode_core::lexicon::StaticCoder;
use medcode_core::pipeline::{CodeResolver, ResolverConfig};
use medcode_core::services::{validate_image_url, Sense};
use medcode_core::tools::ToolRegistry;
use serde_json::json;

fn registry() -> ToolRegistry {
    let coder = Arc::new(StaticCoder::new());
    let cache = Arc::new(ResolutionCache::new(CacheConfig::v0()));
    let resolver = Arc::new(CodeResolver::new(
        coder.clone(),
        coder.clone(),
        coder.clone(),
        coder,
        cache,
        ResolverConfig::default(),
    ));
    ToolRegistry::new(resolver)
}

#[tokio::test]
async fn build_linear_problem_produces_solver_schema() {
    let registry = registry();
    let response = registry
        .call(
            "build_linear_problem",
            json!({
                "objective_type": "minimize",
                "variables": [
                    { "name": "x", "type": "continuous", "lower_bound": 0 },
                    { "name": "y", "type": "continuous", "lower_bound": 0 }
                ],
                "constraints": [
                    { "type": "inequality", "expression": "x + y <= 10" }
                ]
            }),
        )
        .await;

    assert_eq!(response["status"], "success");
    let problem = &response["problem"];
    assert_eq!(problem["meta"]["problem_id"], "linear_problem_2_vars");
    assert_eq!(problem["meta"]["solver"], "linear_solver");
    assert_eq!(problem["meta"]["sense"], "minimize");
    assert_eq!(problem["objective"]["type"], "linear");
    assert_eq!(problem["objective"]["coefficients"], json!([1.0, 1.0]));
    assert_eq!(problem["initial_guess"], json!([0.0, 0.0]));
    assert_eq!(problem["constraints"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn build_linear_problem_rejects_unknown_sense() {
    let registry = registry();
    let response = registry
        .call(
            "build_linear_problem",
            json!({
                "objective_type": "optimize",
                "variables": [],
                "constraints": []
            }),
        )
        .await;

    assert_eq!(response["status"], "error");
    assert!(response["error"].as_str().unwrap().contains("optimize"));
}

#[tokio::test]
async fn build_portfolio_problem_constrains_weights() {
    let registry = registry();
    let response = registry
        .call(
            "build_portfolio_problem",
            json!({
                "assets": ["AAPL", "MSFT"],
                "expected_returns": [0.08, 0.06],
                "covariance_matrix": [[0.1, 0.02], [0.02, 0.08]],
                "target_return": 0.07
            }),
        )
        .await;

    assert_eq!(response["status"], "success");
    assert_eq!(response["type"], "portfolio_optimization");

    let problem = &response["problem"];
    assert_eq!(problem["meta"]["problem_id"], "portfolio_problem_2_assets");
    assert_eq!(problem["variables"].as_array().unwrap().len(), 2);
    assert_eq!(problem["variables"][0]["name"], "weight_AAPL");

    let constraints = problem["constraints"].as_array().unwrap();
    assert_eq!(constraints.len(), 2);
    assert_eq!(
        constraints[0]["expression"],
        "weight_AAPL + weight_MSFT = 1.0"
    );
    assert!(constraints[1]["expression"]
        .as_str()
        .unwrap()
        .ends_with(">= 0.07"));

    assert_eq!(problem["parameters"]["risk_free_rate"], 0.02);
}

#[tokio::test]
async fn build_portfolio_problem_validates_inputs() {
    let registry = registry();

    let mismatched = registry
        .call(
            "build_portfolio_problem",
            json!({
                "assets": ["AAPL"],
                "expected_returns": [0.08, 0.06],
                "covariance_matrix": [[0.1]]
            }),
        )
        .await;
    assert_eq!(mismatched["status"], "error");

    let empty = registry
        .call(
            "build_portfolio_problem",
            json!({
                "assets": [],
                "expected_returns": [],
                "covariance_matrix": []
            }),
        )
        .await;
    assert_eq!(empty["status"], "error");
}

#[tokio::test]
async fn build_resource_allocation_problem_covers_every_pair() {
    let registry = registry();
    let response = registry
        .call(
            "build_resource_allocation_problem",
            json!({
                "resources": ["cpu", "memory"],
                "tasks": ["ingest", "train"],
                "resource_capacities": { "cpu": 8.0, "memory": 64.0 },
                "task_requirements": { "train": { "cpu": 4.0 } }
            }),
        )
        .await;

    assert_eq!(response["status"], "success");
    assert_eq!(response["type"], "resource_allocation");
    let problem = &response["problem"];
    assert_eq!(problem["meta"]["sense"], "maximize");
    assert_eq!(
        problem["meta"]["problem_id"],
        "resource_allocation_2_tasks_2_resources"
    );

    let variables = problem["variables"].as_array().unwrap();
    assert_eq!(variables.len(), 4);
    assert_eq!(variables[0]["name"], "allocation_ingest_cpu");
    assert_eq!(variables[0]["upper_bound"], 8);

    // two capacity ceilings plus the one explicit requirement floor
    let constraints = problem["constraints"].as_array().unwrap();
    assert_eq!(constraints.len(), 3);
    assert_eq!(
        constraints[0]["expression"],
        "allocation_ingest_cpu + allocation_train_cpu <= 8"
    );
    assert_eq!(constraints[2]["expression"], "allocation_train_cpu >= 4");
    assert_eq!(
        constraints[2]["description"],
        "Task train minimum requirement for cpu"
    );
}

#[tokio::test]
async fn build_resource_allocation_problem_rejects_empty_axes() {
    let registry = registry();
    let response = registry
        .call(
            "build_resource_allocation_problem",
            json!({ "resources": [], "tasks": ["ingest"] }),
        )
        .await;
    assert_eq!(response["status"], "error");
}

#[tokio::test]
async fn build_supply_chain_problem_balances_flows() {
    let registry = registry();
    let response = registry
        .call(
            "build_supply_chain_problem",
            json!({
                "suppliers": ["s1"],
                "warehouses": ["w1"],
                "customers": ["c1", "c2"],
                "supplier_capacities": { "s1": 500.0 },
                "warehouse_capacities": { "w1": 300.0 },
                "customer_demands": { "c1": 120.0, "c2": 80.0 }
            }),
        )
        .await;

    assert_eq!(response["status"], "success");
    assert_eq!(response["type"], "supply_chain_optimization");
    let problem = &response["problem"];
    assert_eq!(problem["meta"]["sense"], "minimize");

    // one inbound flow plus one outbound flow per customer
    let variables = problem["variables"].as_array().unwrap();
    assert_eq!(variables.len(), 3);
    assert_eq!(variables[0]["name"], "flow_supplier_s1_warehouse_w1");
    assert_eq!(variables[1]["name"], "flow_warehouse_w1_customer_c1");

    let constraints = problem["constraints"].as_array().unwrap();
    assert_eq!(constraints.len(), 4);
    assert_eq!(
        constraints[0]["expression"],
        "flow_supplier_s1_warehouse_w1 <= 500"
    );
    assert_eq!(constraints[2]["type"], "equality");
    assert_eq!(
        constraints[2]["expression"],
        "flow_warehouse_w1_customer_c1 = 120"
    );
    assert_eq!(
        constraints[3]["expression"],
        "flow_warehouse_w1_customer_c2 = 80"
    );
}

#[tokio::test]
async fn validate_optimization_problem_accepts_built_schemas() {
    let registry = registry();
    let built = registry
        .call(
            "build_linear_problem",
            json!({
                "objective_type": "minimize",
                "variables": [{ "name": "x", "type": "continuous" }],
                "constraints": []
            }),
        )
        .await;

    let response = registry
        .call(
            "validate_optimization_problem",
            json!({ "problem": built["problem"] }),
        )
        .await;
    assert_eq!(response["status"], "success");
    assert_eq!(response["is_valid"], true);
    assert_eq!(response["errors"], json!([]));
    assert_eq!(response["warnings"], json!([]));
}

#[tokio::test]
async fn validate_optimization_problem_reports_structural_defects() {
    let registry = registry();
    let response = registry
        .call(
            "validate_optimization_problem",
            json!({ "problem": {
                "meta": { "problem_id": "p", "sense": "minimize" },
                "variables": [{ "type": "continuous" }],
                "objective": {},
                "constraints": []
            }}),
        )
        .await;

    assert_eq!(response["status"], "success");
    assert_eq!(response["is_valid"], false);
    let errors = response["errors"].as_array().unwrap();
    assert!(errors.contains(&json!("Missing required field: initial_guess")));
    assert!(errors.contains(&json!("Missing meta field: solver")));
    assert!(errors.contains(&json!("Variable 0 missing 'name' field")));
}

#[tokio::test]
async fn validate_optimization_problem_warns_on_guess_length() {
    let registry = registry();
    let response = registry
        .call(
            "validate_optimization_problem",
            json!({ "problem": {
                "meta": { "problem_id": "p", "solver": "linear_solver", "sense": "minimize" },
                "variables": [
                    { "name": "x", "type": "continuous" },
                    { "name": "y", "type": "continuous" }
                ],
                "objective": {},
                "constraints": [],
                "initial_guess": [0.0]
            }}),
        )
        .await;

    assert_eq!(response["is_valid"], true);
    assert_eq!(
        response["warnings"],
        json!(["Initial guess length doesn't match number of variables"])
    );
}

#[tokio::test]
async fn remote_tools_without_clients_answer_error_shape() {
    let registry = registry();

    for (name, args) in [
        (
            "predict_sepsis",
            json!({ "temp": 38.5, "hr": 110, "wbc": 14.2 }),
        ),
        (
            "solve_optimization",
            json!({ "problem": {
                "meta": { "problem_id": "p", "solver": "linear_solver", "sense": "minimize" },
                "variables": [], "parameters": {}, "objective": {},
                "constraints": [], "initial_guess": []
            }}),
        ),
        (
            "analyze_medical_image",
            json!({ "image_url": "https://example.org/xray.png", "view": "PA" }),
        ),
        ("medline_topic", json!({ "code": "E11.9" })),
        ("search_clinical_trials", json!({ "condition": "diabetes" })),
        ("search_literature", json!({ "condition": "diabetes" })),
        (
            "gather_evidence",
            json!({ "code": "E11.9", "condition": "diabetes" }),
        ),
    ] {
        let response = registry.call(name, args).await;
        assert_eq!(response["status"], "error", "{name} should report no remotes");
        assert_eq!(response["error"], "Remote services not configured");
    }
}

#[tokio::test]
async fn predict_sepsis_requires_core_vitals() {
    let registry = registry();
    let response = registry
        .call("predict_sepsis", json!({ "temp": 38.5, "hr": 110 }))
        .await;

    assert_eq!(response["status"], "error");
    assert!(response["error"].as_str().unwrap().contains("wbc"));
}

#[tokio::test]
async fn list_bayesian_models_describes_sepsis_schema() {
    let registry = registry();
    let response = registry.call("list_bayesian_models", json!({})).await;

    assert_eq!(response["status"], "success");
    let sepsis = &response["models"]["sepsis"];
    assert_eq!(sepsis["required_fields"], json!(["temp", "hr", "wbc"]));
    assert_eq!(
        sepsis["optional_fields"],
        json!(["systolic_bp", "diastolic_bp", "respiratory_rate"])
    );
}

#[tokio::test]
async fn analyze_medical_image_validates_before_calling_out() {
    let registry = registry();

    let blank = registry
        .call("analyze_medical_image", json!({ "image_url": "  " }))
        .await;
    assert_eq!(blank["error"], "Invalid image URL provided");

    let relative = registry
        .call("analyze_medical_image", json!({ "image_url": "xray.png" }))
        .await;
    assert_eq!(relative["error"], "Invalid URL format");

    let bad_view = registry
        .call(
            "analyze_medical_image",
            json!({ "image_url": "https://example.org/xray.png", "view": "Oblique" }),
        )
        .await;
    assert_eq!(bad_view["status"], "error");
    assert!(bad_view["error"].as_str().unwrap().contains("Oblique"));
}

#[test]
fn image_url_rule() {
    assert!(validate_image_url("https://example.org/scan.jpg").is_ok());
    assert!(validate_image_url("http://imaging.local/a.png").is_ok());

    assert!(validate_image_url("").is_err());
    assert!(validate_image_url("ftp://example.org/scan.jpg").is_err());
    assert!(validate_image_url("not a url").is_err());
    assert!(validate_image_url("file:///etc/passwd").is_err());
}

#[test]
fn sense_serializes_lowercase() {
    assert_eq!(serde_json::to_value(Sense::Minimize).unwrap(), "minimize");
    assert_eq!(serde_json::to_value(Sense::Maximize).unwrap(), "maximize");
}
