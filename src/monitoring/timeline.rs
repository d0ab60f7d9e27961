//! Execution Timeline
//!
//! Records step start/end times for one workflow run. A step may run
//! more than once when edges loop back, so events are keyed by the
//! invocation number as well as the step name.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Type of timeline event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    /// Step started executing
    Started,
    /// Step completed successfully
    Completed,
    /// Step failed
    Failed,
}

/// A single event in the execution timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// Name of the step
    pub step: String,
    /// 1-based invocation counter within the run
    pub invocation: usize,
    /// Type of event
    pub event_type: EventType,
    /// When the event occurred
    pub timestamp: Instant,
}

/// Duration of one step invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTiming {
    pub step: String,
    pub invocation: usize,
    pub start_ms: u128,
    pub duration_ms: u128,
    pub failed: bool,
}

/// Tracks the execution timeline of a single run.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
    started_at: DateTime<Utc>,
}

impl ExecutionTimeline {
    /// Creates a new timeline starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Records an event for a step invocation.
    pub fn add_event(&mut self, step: impl Into<String>, invocation: usize, event_type: EventType) {
        self.events.push(TimelineEvent {
            step: step.into(),
            invocation,
            event_type,
            timestamp: Instant::now(),
        });
    }

    /// Returns all recorded events.
    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Wall-clock time the run started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the total elapsed time since timeline creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the finished invocations in start order.
    pub fn timings(&self) -> Vec<StepTiming> {
        let mut starts: HashMap<usize, u128> = HashMap::new();
        let mut timings = Vec::new();

        for event in &self.events {
            let elapsed = event.timestamp.duration_since(self.start_time).as_millis();

            match event.event_type {
                EventType::Started => {
                    starts.insert(event.invocation, elapsed);
                }
                EventType::Completed | EventType::Failed => {
                    if let Some(start) = starts.remove(&event.invocation) {
                        timings.push(StepTiming {
                            step: event.step.clone(),
                            invocation: event.invocation,
                            start_ms: start,
                            duration_ms: elapsed - start,
                            failed: event.event_type == EventType::Failed,
                        });
                    }
                }
            }
        }

        timings.sort_by_key(|t| t.invocation);
        timings
    }

    /// Returns total time spent per step in milliseconds.
    pub fn get_durations(&self) -> HashMap<String, u128> {
        let mut durations: HashMap<String, u128> = HashMap::new();
        for timing in self.timings() {
            *durations.entry(timing.step).or_insert(0) += timing.duration_ms;
        }
        durations
    }

    /// Generates an ASCII chart of the run.
    ///
    /// Each invocation is one row, positioned relative to total run time.
    pub fn gantt_chart(&self) -> String {
        let mut output = String::from("\nExecution Timeline:\n\n");

        let total_time = self.elapsed().as_millis();
        let timings = self.timings();

        if timings.is_empty() {
            return output;
        }

        // Scale to 50 characters width
        let scale = 50.0 / total_time.max(1) as f64;

        for timing in timings {
            let start_pos = (timing.start_ms as f64 * scale) as usize;
            let width = (timing.duration_ms as f64 * scale).max(1.0) as usize;

            let mut bar = " ".repeat(start_pos);
            bar.push_str(&if timing.failed { "x" } else { "#" }.repeat(width));

            output.push_str(&format!(
                "{:>3} {:12} |{}| ({} ms)\n",
                timing.invocation,
                truncate(&timing.step, 12),
                bar,
                timing.duration_ms
            ));
        }

        output.push_str(&format!("\nTotal: {} ms\n", total_time));
        output
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncates a string to a maximum length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:width$}", s, width = max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timeline_creation() {
        let timeline = ExecutionTimeline::new();
        assert!(timeline.events.is_empty());
        assert!(timeline.started_at() <= Utc::now());
    }

    #[test]
    fn test_add_events() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("plan", 1, EventType::Started);
        thread::sleep(Duration::from_millis(10));
        timeline.add_event("plan", 1, EventType::Completed);

        assert_eq!(timeline.get_events().len(), 2);
    }

    #[test]
    fn test_get_durations() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("plan", 1, EventType::Started);
        thread::sleep(Duration::from_millis(50));
        timeline.add_event("plan", 1, EventType::Completed);

        let durations = timeline.get_durations();
        assert!(*durations.get("plan").unwrap() >= 50);
    }

    #[test]
    fn test_repeated_step_durations_accumulate() {
        let mut timeline = ExecutionTimeline::new();
        for invocation in 1..=2 {
            timeline.add_event("poll", invocation, EventType::Started);
            thread::sleep(Duration::from_millis(20));
            timeline.add_event("poll", invocation, EventType::Completed);
        }

        assert_eq!(timeline.timings().len(), 2);
        assert!(*timeline.get_durations().get("poll").unwrap() >= 40);
    }

    #[test]
    fn test_failed_timing() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("execute", 1, EventType::Started);
        timeline.add_event("execute", 1, EventType::Failed);

        let timings = timeline.timings();
        assert_eq!(timings.len(), 1);
        assert!(timings[0].failed);
    }

    #[test]
    fn test_only_started_has_no_timing() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("wait", 1, EventType::Started);

        assert!(timeline.timings().is_empty());
        assert!(timeline.get_durations().is_empty());
    }

    #[test]
    fn test_gantt_chart_generation() {
        let mut timeline = ExecutionTimeline::new();

        timeline.add_event("plan", 1, EventType::Started);
        thread::sleep(Duration::from_millis(20));
        timeline.add_event("plan", 1, EventType::Completed);
        timeline.add_event("report", 2, EventType::Started);
        thread::sleep(Duration::from_millis(20));
        timeline.add_event("report", 2, EventType::Completed);

        let chart = timeline.gantt_chart();
        assert!(chart.contains("plan"));
        assert!(chart.contains("report"));
        assert!(chart.contains("Total:"));
    }

    #[test]
    fn test_gantt_chart_empty() {
        let chart = ExecutionTimeline::default().gantt_chart();
        assert!(chart.contains("Timeline"));
        assert!(!chart.contains("Total:"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("plan", 6), "plan  ");
        assert_eq!(truncate("very_long_step_name", 8), "very_...");
    }
}
