//! Run Monitoring Module
//!
//! Per-run bookkeeping of step invocations.
//!
//! # Components
//!
//! - [`ExecutionTimeline`]: Step start/end timing for reports and charts

pub mod timeline;

pub use timeline::{EventType, ExecutionTimeline, StepTiming, TimelineEvent};
