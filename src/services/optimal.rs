use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::services::client::{JsonClient, ServiceConfig};
use crate::types::{Service, UpstreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemMeta {
    pub problem_id: String,
    pub solver: String,
    pub sense: Sense,
}

/// Problem schema the optimization service accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationProblem {
    pub meta: ProblemMeta,
    pub variables: Vec<Value>,
    pub parameters: Map<String, Value>,
    pub objective: Value,
    pub constraints: Vec<Value>,
    pub initial_guess: Vec<f64>,
}

/// Build a linear problem: unit objective coefficients, zero initial guess.
pub fn linear_problem(
    sense: Sense,
    variables: Vec<Value>,
    constraints: Vec<Value>,
    parameters: Option<Map<String, Value>>,
) -> OptimizationProblem {
    let n = variables.len();
    OptimizationProblem {
        meta: ProblemMeta {
            problem_id: format!("linear_problem_{n}_vars"),
            solver: "linear_solver".to_string(),
            sense,
        },
        variables,
        parameters: parameters.unwrap_or_default(),
        objective: json!({
            "type": "linear",
            "coefficients": vec![1.0; n],
        }),
        constraints,
        initial_guess: vec![0.0; n],
    }
}

/// Build a Markowitz portfolio problem: one bounded weight per asset, a
/// weights-sum-to-one equality, and an optional target-return floor.
pub fn portfolio_problem(
    assets: &[String],
    expected_returns: &[f64],
    covariance_matrix: &[Vec<f64>],
    target_return: Option<f64>,
    risk_free_rate: f64,
) -> OptimizationProblem {
    let variables: Vec<Value> = assets
        .iter()
        .map(|asset| {
            json!({
                "name": format!("weight_{asset}"),
                "type": "continuous",
                "lower_bound": 0,
                "upper_bound": 1,
            })
        })
        .collect();

    let weight_terms: Vec<String> = assets.iter().map(|a| format!("weight_{a}")).collect();
    let mut constraints = vec![json!({
        "type": "equality",
        "expression": format!("{} = 1.0", weight_terms.join(" + ")),
        "description": "Portfolio weights sum to 1",
    })];

    if let Some(target) = target_return {
        let return_terms: Vec<String> = assets
            .iter()
            .zip(expected_returns)
            .map(|(asset, r)| format!("{r} * weight_{asset}"))
            .collect();
        constraints.push(json!({
            "type": "inequality",
            "expression": format!("{} >= {target}", return_terms.join(" + ")),
            "description": format!("Target return constraint: {target}"),
        }));
    }

    let mut parameters = Map::new();
    parameters.insert("assets".to_string(), json!(assets));
    parameters.insert("expected_returns".to_string(), json!(expected_returns));
    parameters.insert("covariance_matrix".to_string(), json!(covariance_matrix));
    parameters.insert("risk_free_rate".to_string(), json!(risk_free_rate));
    parameters.insert("target_return".to_string(), json!(target_return));

    let mut problem = linear_problem(Sense::Minimize, variables, constraints, Some(parameters));
    problem.meta.problem_id = format!("portfolio_problem_{}_assets", assets.len());
    problem
}

/// Build a resource-allocation problem: one continuous allocation variable per
/// task/resource pair, per-resource capacity ceilings, and per-task minimum
/// requirement floors where a requirement is set.
pub fn resource_allocation_problem(
    resources: &[String],
    tasks: &[String],
    resource_capacities: &HashMap<String, f64>,
    task_requirements: &HashMap<String, HashMap<String, f64>>,
    task_priorities: Option<&HashMap<String, f64>>,
) -> OptimizationProblem {
    let mut variables = Vec::with_capacity(tasks.len() * resources.len());
    for task in tasks {
        for resource in resources {
            let capacity = resource_capacities.get(resource).copied().unwrap_or(100.0);
            variables.push(json!({
                "name": format!("allocation_{task}_{resource}"),
                "type": "continuous",
                "lower_bound": 0,
                "upper_bound": capacity as i64,
            }));
        }
    }

    let mut constraints = Vec::new();
    for resource in resources {
        let capacity = resource_capacities.get(resource).copied().unwrap_or(100.0);
        let terms: Vec<String> = tasks
            .iter()
            .map(|task| format!("allocation_{task}_{resource}"))
            .collect();
        constraints.push(json!({
            "type": "inequality",
            "expression": format!("{} <= {capacity}", terms.join(" + ")),
            "description": format!("Resource {resource} capacity constraint"),
        }));
    }
    for task in tasks {
        let Some(requirements) = task_requirements.get(task) else {
            continue;
        };
        for resource in resources {
            let required = requirements.get(resource).copied().unwrap_or(0.0);
            if required > 0.0 {
                constraints.push(json!({
                    "type": "inequality",
                    "expression": format!("allocation_{task}_{resource} >= {required}"),
                    "description": format!("Task {task} minimum requirement for {resource}"),
                }));
            }
        }
    }

    let mut parameters = Map::new();
    parameters.insert("resources".to_string(), json!(resources));
    parameters.insert("tasks".to_string(), json!(tasks));
    parameters.insert("resource_capacities".to_string(), json!(resource_capacities));
    parameters.insert("task_requirements".to_string(), json!(task_requirements));
    parameters.insert(
        "task_priorities".to_string(),
        json!(task_priorities.cloned().unwrap_or_default()),
    );

    let mut problem = linear_problem(Sense::Maximize, variables, constraints, Some(parameters));
    problem.meta.problem_id = format!(
        "resource_allocation_{}_tasks_{}_resources",
        tasks.len(),
        resources.len()
    );
    problem
}

/// Build a two-echelon supply-chain flow problem: supplier-to-warehouse and
/// warehouse-to-customer flows, capacity ceilings on both echelons, and an
/// exact-demand equality per customer. Minimizes total transportation cost.
pub fn supply_chain_problem(
    suppliers: &[String],
    warehouses: &[String],
    customers: &[String],
    supplier_capacities: &HashMap<String, f64>,
    warehouse_capacities: &HashMap<String, f64>,
    customer_demands: &HashMap<String, f64>,
    transportation_costs: &HashMap<String, HashMap<String, f64>>,
) -> OptimizationProblem {
    let mut variables = Vec::new();
    for supplier in suppliers {
        let capacity = supplier_capacities.get(supplier).copied().unwrap_or(1000.0);
        for warehouse in warehouses {
            variables.push(json!({
                "name": format!("flow_supplier_{supplier}_warehouse_{warehouse}"),
                "type": "continuous",
                "lower_bound": 0,
                "upper_bound": capacity as i64,
            }));
        }
    }
    for warehouse in warehouses {
        let capacity = warehouse_capacities.get(warehouse).copied().unwrap_or(1000.0);
        for customer in customers {
            variables.push(json!({
                "name": format!("flow_warehouse_{warehouse}_customer_{customer}"),
                "type": "continuous",
                "lower_bound": 0,
                "upper_bound": capacity as i64,
            }));
        }
    }

    let mut constraints = Vec::new();
    for supplier in suppliers {
        let capacity = supplier_capacities.get(supplier).copied().unwrap_or(1000.0);
        let terms: Vec<String> = warehouses
            .iter()
            .map(|w| format!("flow_supplier_{supplier}_warehouse_{w}"))
            .collect();
        constraints.push(json!({
            "type": "inequality",
            "expression": format!("{} <= {capacity}", terms.join(" + ")),
            "description": format!("Supplier {supplier} capacity constraint"),
        }));
    }
    for warehouse in warehouses {
        let capacity = warehouse_capacities.get(warehouse).copied().unwrap_or(1000.0);
        let terms: Vec<String> = customers
            .iter()
            .map(|c| format!("flow_warehouse_{warehouse}_customer_{c}"))
            .collect();
        constraints.push(json!({
            "type": "inequality",
            "expression": format!("{} <= {capacity}", terms.join(" + ")),
            "description": format!("Warehouse {warehouse} capacity constraint"),
        }));
    }
    for customer in customers {
        let demand = customer_demands.get(customer).copied().unwrap_or(0.0);
        let terms: Vec<String> = warehouses
            .iter()
            .map(|w| format!("flow_warehouse_{w}_customer_{customer}"))
            .collect();
        constraints.push(json!({
            "type": "equality",
            "expression": format!("{} = {demand}", terms.join(" + ")),
            "description": format!("Customer {customer} demand constraint"),
        }));
    }

    let mut parameters = Map::new();
    parameters.insert("suppliers".to_string(), json!(suppliers));
    parameters.insert("warehouses".to_string(), json!(warehouses));
    parameters.insert("customers".to_string(), json!(customers));
    parameters.insert("supplier_capacities".to_string(), json!(supplier_capacities));
    parameters.insert("warehouse_capacities".to_string(), json!(warehouse_capacities));
    parameters.insert("customer_demands".to_string(), json!(customer_demands));
    parameters.insert("transportation_costs".to_string(), json!(transportation_costs));

    let mut problem = linear_problem(Sense::Minimize, variables, constraints, Some(parameters));
    problem.meta.problem_id = format!(
        "supply_chain_{}_suppliers_{}_warehouses_{}_customers",
        suppliers.len(),
        warehouses.len(),
        customers.len()
    );
    problem
}

/// Outcome of a structural check of a problem schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Check an arbitrary problem document against the schema the solver accepts.
/// Structural defects are errors; a guess/variable length mismatch is only a
/// warning because the solver re-seeds the guess itself.
pub fn validate_problem(problem: &Value) -> ProblemValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for field in ["meta", "variables", "objective", "constraints", "initial_guess"] {
        if problem.get(field).is_none() {
            errors.push(format!("Missing required field: {field}"));
        }
    }

    if let Some(meta) = problem.get("meta") {
        for field in ["problem_id", "solver", "sense"] {
            if meta.get(field).is_none() {
                errors.push(format!("Missing meta field: {field}"));
            }
        }
    }

    let variable_count = match problem.get("variables").and_then(Value::as_array) {
        Some(variables) if variables.is_empty() => {
            errors.push("Variables must be a non-empty list".to_string());
            0
        }
        Some(variables) => {
            for (i, variable) in variables.iter().enumerate() {
                if variable.get("name").is_none() {
                    errors.push(format!("Variable {i} missing 'name' field"));
                }
                if variable.get("type").is_none() {
                    errors.push(format!("Variable {i} missing 'type' field"));
                }
            }
            variables.len()
        }
        None => {
            if problem.get("variables").is_some() {
                errors.push("Variables must be a non-empty list".to_string());
            }
            0
        }
    };

    if let Some(constraints) = problem.get("constraints") {
        if !constraints.is_array() {
            errors.push("Constraints must be a list".to_string());
        }
    }

    if let Some(guess) = problem.get("initial_guess").and_then(Value::as_array) {
        if variable_count > 0 && guess.len() != variable_count {
            warnings.push("Initial guess length doesn't match number of variables".to_string());
        }
    }

    ProblemValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Client for the optimization solver endpoint.
pub struct OptimalClient {
    client: JsonClient,
}

impl OptimalClient {
    pub fn new(config: ServiceConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: JsonClient::new(config, Service::Solver)?,
        })
    }

    pub async fn solve(&self, problem: &OptimizationProblem) -> Result<Value, UpstreamError> {
        self.client.post("/optimize", problem).await
    }
}
