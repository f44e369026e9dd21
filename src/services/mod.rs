//! JSON-over-HTTP clients for the external medical services.
//!
//! Each client wraps one named endpoint family on a configured base URL.
//! Error mapping is uniform: connect failures, timeouts, non-2xx statuses,
//! and undecodable bodies all become `UpstreamError` for the owning
//! service.

pub mod bayesian;
pub mod client;
pub mod coding;
pub mod evidence;
pub mod optimal;
pub mod vision;

pub use bayesian::{BayesianClient, SepsisVitals};
pub use client::ServiceConfig;
pub use coding::HttpCodingService;
pub use evidence::{gather_evidence, search_literature, MedlineClient, PubMedClient, TrialsClient};
pub use optimal::{
    linear_problem, portfolio_problem, resource_allocation_problem, supply_chain_problem,
    validate_problem, OptimalClient, OptimizationProblem, ProblemMeta, ProblemValidation, Sense,
};
pub use vision::{validate_image_url, ImageView, VisionClient};
