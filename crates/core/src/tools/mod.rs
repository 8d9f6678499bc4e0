//! # Deterministic Tools
//!
//! Plain Rust lookups the agents call into. None of them involve a model.
//!
//! ## Modules
//!
//! - `pii` - Personal information detection and token masking
//! - `legal_search` - Keyword search over the embedded statute corpus
//! - `gov_api` - Mock government data services

pub mod gov_api;
pub mod legal_search;
pub mod pii;

pub use gov_api::{ApiKind, GovApi, GovApiResponse};
pub use legal_search::{LegalCitation, Relevance};
pub use pii::{MaskResult, PiiKind};
