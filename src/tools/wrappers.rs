use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::services::bayesian::model_schemas;
use crate::services::{
    linear_problem, portfolio_problem, resource_allocation_problem, supply_chain_problem,
    validate_image_url, validate_problem, ImageView, OptimizationProblem, Sense, SepsisVitals,
};
use crate::tools::{error, parse_args, RemoteServices};

fn require<'a>(remotes: Option<&'a RemoteServices>) -> Result<&'a RemoteServices, Value> {
    remotes.ok_or_else(|| error("Remote services not configured"))
}

pub(crate) async fn predict_sepsis(remotes: Option<&RemoteServices>, args: Value) -> Value {
    let vitals: SepsisVitals = match parse_args(args) {
        Ok(vitals) => vitals,
        Err(e) => return e,
    };
    let remotes = match require(remotes) {
        Ok(remotes) => remotes,
        Err(e) => return e,
    };

    match remotes.bayesian.predict_sepsis(&vitals).await {
        Ok(result) => json!({
            "status": "success",
            "model": "sepsis",
            "result": result,
        }),
        Err(e) => error(e.to_string()),
    }
}

pub(crate) fn list_bayesian_models() -> Value {
    json!({ "status": "success", "models": model_schemas() })
}

#[derive(Deserialize)]
struct LinearArgs {
    objective_type: String,
    variables: Vec<Value>,
    constraints: Vec<Value>,
    parameters: Option<Map<String, Value>>,
}

pub(crate) fn build_linear_problem(args: Value) -> Value {
    let args: LinearArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    let sense = match args.objective_type.as_str() {
        "minimize" => Sense::Minimize,
        "maximize" => Sense::Maximize,
        other => return error(format!("objective_type must be 'minimize' or 'maximize', got '{other}'")),
    };

    let problem = linear_problem(sense, args.variables, args.constraints, args.parameters);
    json!({ "status": "success", "problem": problem })
}

#[derive(Deserialize)]
struct PortfolioArgs {
    assets: Vec<String>,
    expected_returns: Vec<f64>,
    covariance_matrix: Vec<Vec<f64>>,
    target_return: Option<f64>,
    #[serde(default = "default_risk_free_rate")]
    risk_free_rate: f64,
}

fn default_risk_free_rate() -> f64 {
    0.02
}

pub(crate) fn build_portfolio_problem(args: Value) -> Value {
    let args: PortfolioArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    if args.assets.is_empty() {
        return error("At least one asset is required");
    }
    if args.assets.len() != args.expected_returns.len() {
        return error(format!(
            "{} assets but {} expected returns",
            args.assets.len(),
            args.expected_returns.len()
        ));
    }

    let problem = portfolio_problem(
        &args.assets,
        &args.expected_returns,
        &args.covariance_matrix,
        args.target_return,
        args.risk_free_rate,
    );
    json!({
        "status": "success",
        "problem": problem,
        "assets": args.assets,
        "type": "portfolio_optimization",
    })
}

#[derive(Deserialize)]
struct AllocationArgs {
    resources: Vec<String>,
    tasks: Vec<String>,
    #[serde(default)]
    resource_capacities: HashMap<String, f64>,
    #[serde(default)]
    task_requirements: HashMap<String, HashMap<String, f64>>,
    task_priorities: Option<HashMap<String, f64>>,
}

pub(crate) fn build_resource_allocation_problem(args: Value) -> Value {
    let args: AllocationArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    if args.resources.is_empty() || args.tasks.is_empty() {
        return error("At least one resource and one task are required");
    }

    let problem = resource_allocation_problem(
        &args.resources,
        &args.tasks,
        &args.resource_capacities,
        &args.task_requirements,
        args.task_priorities.as_ref(),
    );
    json!({
        "status": "success",
        "problem": problem,
        "resources": args.resources,
        "tasks": args.tasks,
        "type": "resource_allocation",
    })
}

#[derive(Deserialize)]
struct SupplyChainArgs {
    suppliers: Vec<String>,
    warehouses: Vec<String>,
    customers: Vec<String>,
    #[serde(default)]
    supplier_capacities: HashMap<String, f64>,
    #[serde(default)]
    warehouse_capacities: HashMap<String, f64>,
    #[serde(default)]
    customer_demands: HashMap<String, f64>,
    #[serde(default)]
    transportation_costs: HashMap<String, HashMap<String, f64>>,
}

pub(crate) fn build_supply_chain_problem(args: Value) -> Value {
    let args: SupplyChainArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    if args.suppliers.is_empty() || args.warehouses.is_empty() || args.customers.is_empty() {
        return error("At least one supplier, warehouse, and customer are required");
    }

    let problem = supply_chain_problem(
        &args.suppliers,
        &args.warehouses,
        &args.customers,
        &args.supplier_capacities,
        &args.warehouse_capacities,
        &args.customer_demands,
        &args.transportation_costs,
    );
    json!({
        "status": "success",
        "problem": problem,
        "suppliers": args.suppliers,
        "warehouses": args.warehouses,
        "customers": args.customers,
        "type": "supply_chain_optimization",
    })
}

#[derive(Deserialize)]
struct ValidateProblemArgs {
    problem: Value,
}

pub(crate) fn validate_optimization_problem(args: Value) -> Value {
    let args: ValidateProblemArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    let validation = validate_problem(&args.problem);
    json!({
        "status": "success",
        "is_valid": validation.is_valid,
        "errors": validation.errors,
        "warnings": validation.warnings,
    })
}

#[derive(Deserialize)]
struct SolveArgs {
    problem: OptimizationProblem,
}

pub(crate) async fn solve_optimization(remotes: Option<&RemoteServices>, args: Value) -> Value {
    let args: SolveArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };
    let remotes = match require(remotes) {
        Ok(remotes) => remotes,
        Err(e) => return e,
    };

    match remotes.optimal.solve(&args.problem).await {
        Ok(result) => json!({
            "status": "success",
            "result": result,
            "problem_id": args.problem.meta.problem_id,
            "solver": args.problem.meta.solver,
        }),
        Err(e) => error(e.to_string()),
    }
}

#[derive(Deserialize)]
struct ImageArgs {
    image_url: String,
    view: Option<String>,
    prompt: Option<String>,
}

pub(crate) async fn analyze_medical_image(remotes: Option<&RemoteServices>, args: Value) -> Value {
    let args: ImageArgs = match parse_args(args) {
        Ok(args) => args,
        Err(e) => return e,
    };

    let url = match validate_image_url(&args.image_url) {
        Ok(url) => url,
        Err(e) => return error(e),
    };

    let view = match args.view.as_deref() {
        None => None,
        Some(raw) => match ImageView::parse(raw) {
            Some(view) => Some(view),
            None => {
                return error(format!(
                    "Invalid view parameter '{raw}'. Must be one of: AP, PA, Lateral, DermCloseUp, Other"
                ))
            }
        },
    };

    let remotes = match require(remotes) {
        Ok(remotes) => remotes,
        Err(e) => return e,
    };

    match remotes.vision.analyze(&url, view, args.prompt.as_deref()).await {
        Ok(findings) => json!({ "status": "success", "findings": findings }),
        Err(e) => error(e.to_string()),
    }
}
