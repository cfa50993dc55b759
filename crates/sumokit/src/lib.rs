//! # sumokit
//!
//! Pure Rust library for managing the log sources of a Sumo Logic collector.
//!
//! This crate provides functionality for:
//! - Looking up an installed collector by name through the collector API
//! - Reading, adding, replacing and deleting its sources
//! - Reconciling declared source definitions against what the collector reports
//!
//! ## Example
//!
//! ```no_run
//! use sumokit::{
//!     ClientConfig, Collector, Credentials, Intent, ReconcileOptions, Reconciler,
//!     SourceDefinition,
//! };
//!
//! let config = ClientConfig::new("web-01", Credentials::new("access-id", "access-key"));
//! let mut collector = Collector::connect(&config);
//!
//! let desired = SourceDefinition::new("app-logs", "/var/log/app/*.log")
//!     .with_category("app")
//!     .with_timezone("UTC");
//!
//! let reconciler = Reconciler::new(ReconcileOptions::default());
//! let plan = reconciler.plan(&mut collector, &desired, Intent::Create)
//!     .expect("collector unreachable");
//! println!("{}", plan.description);
//!
//! reconciler.apply(&mut collector, &desired, Intent::Create)
//!     .expect("reconciliation failed");
//! ```
//!
//! ## API Endpoints
//!
//! | Region | Endpoint                                |
//! |--------|-----------------------------------------|
//! | US1    | `https://api.sumologic.com/api/v1`      |
//! | US2    | `https://api.us2.sumologic.com/api/v1`  |
//! | EU     | `https://api.eu.sumologic.com/api/v1`   |
//!
//! ## Testing
//!
//! [`MockBackend`] stands in for the API; see [`backend`].

#![warn(clippy::all)]

pub mod backend;
pub mod collector;
pub mod error;
pub mod reconcile;
pub mod types;

pub use backend::MockBackend;
pub use collector::Collector;
pub use error::{Error, ErrorCategory, Result};
pub use reconcile::{
    Action, Intent, Outcome, RESOURCE_TYPE, ReconcileOptions, Reconciler, SourcePlan,
    SourceResource, SourceStatus, classify, validate_all,
};
pub use types::{
    ClientConfig, CollectorInfo, CollectorMetadata, Credentials, DEFAULT_ENDPOINT,
    DEFAULT_QUERY_LIMIT, DEFAULT_TIMEOUT, LOCAL_FILE_SOURCE, RemoteSource, SOURCE_ATTRIBUTES,
    SourceDefinition, SyncMode,
};
