//! # orator-evaluation
//!
//! Words and what is done with them: classify an attempt against the model
//! layer, explain it with the descriptions of similar clusters, and, for a
//! failed attempt, plan the cheapest correction route through the failure
//! layer into the success layer.

pub mod cmv;
pub mod report;
pub mod requests;
pub mod search;
pub mod word;

pub use cmv::{cmv_cost, CmvPath};
pub use report::{CorrectionRoute, EvaluationReport, RouteStep, Verdict, WordStatus};
pub use requests::{AnnotationRequest, AnnotationRequestQueue};
pub use search::{CorrectionGraph, ExhaustiveSearch, RoutePlan};
pub use word::{AnnotationTask, Word, WordInfo};
