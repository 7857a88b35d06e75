// lib.rs
//
// lunarz: a non-destructive image enhancement pipeline.
//
// - Closed set of enhancement operators with declared parameter domains
// - Edit sessions with linear undo/redo history
// - Batch processing over files or directories, optionally in parallel
//
// The library only emits `tracing` events; installing a subscriber is up
// to the application.

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod ops;
pub mod request;

pub use buffer::{ChannelLayout, ImageBuffer};
pub use config::{BatchConfig, ScanConfig, SessionConfig};
pub use engine::{BatchOutput, BatchReport, BatchResult, BatchRunner, EditSession, SessionState};
pub use error::{ErrorKind, LunarzError, Result};
pub use ops::{Adjustment, EdgeMethod, EdgeMethodKind, EdgeOptions, Operation, OutputFormat};
pub use request::{OperatorRequest, ParamValue};
