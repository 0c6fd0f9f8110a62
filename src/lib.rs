pub mod app_config;
pub mod cache;
pub mod cluster;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod model;
pub mod pairs;
pub mod progress;
pub mod semantic;
pub mod session;
pub mod similarity;
pub mod store;

pub use app_config::ScanConfig;
pub use engine::ScanEngine;
pub use error::Error;
pub use model::{DuplicateGroup, MatchMode, ScanOutcome};
pub use progress::{ProgressReporter, SilentReporter};
pub use session::ScanSession;
pub use store::{DocumentStore, FsDocumentStore};
