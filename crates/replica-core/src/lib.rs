//! # replica-core
//!
//! Core functionality for replica: turn a fetched web page into a structural
//! design fingerprint, drive it through a generation step as a tracked job, and
//! repair the generated document before it is served.
//!
//! ## Architecture
//!
//! - **Extraction**: pure analyzers over a parsed document tree producing a
//!   [`StructuralFingerprint`] (typography, color, DOM shape, components,
//!   assets, spacing and breakpoints)
//! - **Budgeting**: shrinks oversized inputs and composes a prompt that never
//!   exceeds the configured size
//! - **Repair**: normalizes generated text into a well-formed document
//! - **Orchestration**: an in-memory job table, a forward-only status machine
//!   and a per-job notification bus
//!
//! Page fetching and content generation are capabilities behind the
//! [`PageFetcher`] and [`ContentGenerator`] traits.
//!
//! ## Quick Start
//!
//! ```rust
//! use replica_core::{Config, analyze_page, build_payload};
//! use url::Url;
//!
//! let config = Config::default();
//! let base = Url::parse("https://example.com/").unwrap();
//! let html = r#"<html><head><style>body { font-family: 'Inter', sans-serif; color: #112233; }</style></head>
//!     <body><h1>Welcome</h1></body></html>"#;
//!
//! let analysis = analyze_page(html, &base, &config.extraction);
//! assert_eq!(analysis.fingerprint.design.fonts, vec!["Inter", "sans-serif"]);
//!
//! let payload = build_payload(base.as_str(), html, &analysis, &config.budget);
//! assert!(payload.prompt.chars().count() <= config.budget.max_prompt_chars);
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T, Error>`]. Fetch and generation
//! failures end a job and are reported through its status:
//!
//! ```rust
//! use replica_core::{Error, FetchError};
//!
//! let err: Error = FetchError::EmptyContent("https://example.com/".into()).into();
//! assert_eq!(err.category(), "fetch");
//! assert!(err.is_terminal());
//! ```

/// Payload budgeting and prompt composition
pub mod budget;
/// Per-job status fan-out
pub mod bus;
/// Configuration loading and defaults
pub mod config;
/// Error types and result aliases
pub mod error;
/// Structural feature extraction
pub mod extract;
/// Page fetching capability and HTTP adapter
pub mod fetcher;
/// Structural fingerprint data model
pub mod fingerprint;
/// Content generation capability and Gemini adapter
pub mod generator;
/// Clone job orchestration
pub mod orchestrator;
/// Generated document repair
pub mod repair;
/// In-memory job table
pub mod store;
/// Job records and status events
pub mod types;

// Re-export commonly used types
pub use budget::{GenerationPayload, build_payload};
pub use bus::{NotificationBus, Subscription};
pub use config::{BudgetConfig, Config, ExtractionConfig, FetchConfig, GenerationConfig};
pub use error::{Error, FetchError, GenerationError, Result};
pub use extract::{PageAnalysis, analyze_page};
pub use fetcher::{HttpPageFetcher, PageFetcher, PageSnapshot, normalize_url};
pub use fingerprint::{FingerprintSummary, StructuralFingerprint};
pub use generator::{ContentGenerator, GeminiGenerator};
pub use orchestrator::{CloneOptions, Orchestrator};
pub use repair::{RepairOutcome, repair_document};
pub use types::*;
