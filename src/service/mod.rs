pub mod analyzer;
pub mod cost_estimator;
pub mod denial;
pub mod explain;
pub mod export;
pub mod ingest;

pub use analyzer::{BillAnalyzer, BillSubmission};
pub use cost_estimator::CostEstimator;
pub use denial::{ClaimProfile, DenialPredictor, DEFAULT_PAYER_DENIAL_RATE};
pub use explain::{Explainer, Explanation, ExplanationProvider, UnconfiguredProvider};
pub use export::write_report_csv;
pub use ingest::{line_items_from_document, parse_line_items, parse_price};
