//! Clinical entity-to-code resolution for medical AI agents.
//!
//! `medcode-core` maps free-text clinical notes to ranked ICD-10 code
//! candidates through a three-stage pipeline — entity extraction, concept
//! normalization, code matching — with a shared TTL cache in front of it.
//! The pipeline is exposed (alongside a set of single-call medical service
//! wrappers) as a JSON tool surface for an LLM tool-calling runtime.
//!
//! External recognizers, terminology services, and code mappers plug in
//! behind async traits; the `lexicon` module ships a deterministic
//! in-process backend for offline use and tests.

pub mod cache;
pub mod lexicon;
pub mod pipeline;
pub mod services;
pub mod tools;
pub mod types;
