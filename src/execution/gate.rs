//! Gate Steps
//!
//! A gate step asks a [`DecisionProvider`] for a yes/no answer and stores
//! it in state. The conditional edge after the gate branches on that key,
//! so the executor itself never knows about approvals.
//!
//! Providers shipped here:
//! - [`StaticDecision`]: fixed policy answer
//! - [`ConsoleDecision`]: interactive y/n prompt over any reader/writer
//! - [`RequireApproval`]: skips the prompt when approval is not required

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use colored::Colorize;
use log::{debug, info, warn};

use crate::error::DecisionError;
use crate::workflow::{Step, WorkflowState};

/// State key a gate writes when no other key is given.
pub const DEFAULT_DECISION_KEY: &str = "approved";

/// Width of the approval banner rule.
const BANNER_WIDTH: usize = 50;

/// Source of yes/no decisions for gate steps.
pub trait DecisionProvider: Send + Sync {
    /// Asks for a decision about `prompt`.
    fn request_decision(&self, prompt: &str) -> Result<bool, DecisionError>;
}

impl<F> DecisionProvider for F
where
    F: Fn(&str) -> Result<bool, DecisionError> + Send + Sync,
{
    fn request_decision(&self, prompt: &str) -> Result<bool, DecisionError> {
        self(prompt)
    }
}

impl<P: DecisionProvider + ?Sized> DecisionProvider for Arc<P> {
    fn request_decision(&self, prompt: &str) -> Result<bool, DecisionError> {
        (**self).request_decision(prompt)
    }
}

/// Always answers the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticDecision(pub bool);

impl StaticDecision {
    pub const APPROVE: Self = Self(true);
    pub const REJECT: Self = Self(false);
}

impl DecisionProvider for StaticDecision {
    fn request_decision(&self, prompt: &str) -> Result<bool, DecisionError> {
        debug!("Policy decision {} for: {}", self.0, prompt);
        Ok(self.0)
    }
}

/// Approves automatically unless approval is required, then delegates.
pub struct RequireApproval<P> {
    required: bool,
    inner: P,
}

impl<P: DecisionProvider> RequireApproval<P> {
    pub fn new(required: bool, inner: P) -> Self {
        Self { required, inner }
    }
}

impl<P: DecisionProvider> DecisionProvider for RequireApproval<P> {
    fn request_decision(&self, prompt: &str) -> Result<bool, DecisionError> {
        if !self.required {
            info!("Approval not required - continuing");
            return Ok(true);
        }
        self.inner.request_decision(prompt)
    }
}

/// Interactive y/n prompt.
///
/// Re-prompts until it reads `y`, `yes`, `n` or `no` (any case). End of
/// input means nobody is there to answer and is reported as an error.
pub struct ConsoleDecision<R, W> {
    io: Mutex<(R, W)>,
}

impl ConsoleDecision<io::BufReader<io::Stdin>, io::Stdout> {
    /// Prompts on the process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleDecision<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    /// Prompts for a line of free text.
    ///
    /// Returns `None` at end of input. The line is returned trimmed.
    pub fn read_line(&self, prompt: &str) -> Result<Option<String>, DecisionError> {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| DecisionError::Unavailable("console lock poisoned".to_string()))?;
        let (reader, writer) = &mut *guard;

        write!(writer, "{}", prompt)?;
        writer.flush()?;

        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Consumes the provider, returning its reader and writer.
    pub fn into_inner(self) -> (R, W) {
        match self.io.into_inner() {
            Ok(io) => io,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<R, W> DecisionProvider for ConsoleDecision<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn request_decision(&self, prompt: &str) -> Result<bool, DecisionError> {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| DecisionError::Unavailable("console lock poisoned".to_string()))?;
        let (reader, writer) = &mut *guard;

        let rule = "=".repeat(BANNER_WIDTH);
        writeln!(writer)?;
        writeln!(writer, "{}", rule)?;
        writeln!(writer, "{}", "PLAN APPROVAL REQUIRED".bold().yellow())?;
        writeln!(writer, "{}", rule)?;
        writeln!(writer, "{}", prompt)?;
        writeln!(writer, "{}", rule)?;

        loop {
            write!(writer, "Approve? (y/n): ")?;
            writer.flush()?;

            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(DecisionError::Unavailable(
                    "input closed before a decision was made".to_string(),
                ));
            }

            match parse_answer(&line) {
                Some(true) => {
                    writeln!(writer, "{}", "Plan approved.".green())?;
                    return Ok(true);
                }
                Some(false) => {
                    writeln!(writer, "{}", "Plan rejected.".red())?;
                    return Ok(false);
                }
                None => {
                    warn!("Unrecognized approval answer: {:?}", line.trim());
                    writeln!(writer, "Please enter 'y' or 'n'.")?;
                }
            }
        }
    }
}

/// Parses a y/n answer.
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Builds a gate step.
///
/// The step renders a prompt from the incoming state with `prompt`, asks
/// `provider`, and returns the state with the answer stored under `key`.
/// A provider failure fails the step.
///
/// # Example
///
/// ```
/// use gatedflow::execution::gate::{gate_step, StaticDecision};
/// use gatedflow::workflow::WorkflowState;
///
/// let gate = gate_step("wait", StaticDecision::APPROVE, "approved", |_| "ok?".to_string());
/// let state = gate.invoke(WorkflowState::new()).unwrap();
/// assert_eq!(state.get_bool("approved"), Some(true));
/// ```
pub fn gate_step<P, F>(
    name: impl Into<String>,
    provider: P,
    key: impl Into<String>,
    prompt: F,
) -> Step
where
    P: DecisionProvider + 'static,
    F: Fn(&WorkflowState) -> String + Send + Sync + 'static,
{
    let name = name.into();
    let key = key.into();
    let step_name = name.clone();

    Step::new(name, move |state: WorkflowState| {
        let text = prompt(&state);
        let decision = provider.request_decision(&text)?;
        info!("Gate '{}' decision: {}", step_name, if decision { "approved" } else { "rejected" });
        Ok(state.with(key.clone(), decision))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn console(input: &str) -> ConsoleDecision<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleDecision::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_console_read_line() {
        let console = console("  first query \nsecond\n");
        assert_eq!(console.read_line("> ").unwrap().as_deref(), Some("first query"));
        assert_eq!(console.read_line("> ").unwrap().as_deref(), Some("second"));
        assert_eq!(console.read_line("> ").unwrap(), None);

        let (_, output) = console.into_inner();
        assert_eq!(String::from_utf8(output).unwrap(), "> > > ");
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer("  YES "), Some(true));
        assert_eq!(parse_answer("n"), Some(false));
        assert_eq!(parse_answer("No\r\n"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
        assert_eq!(parse_answer(""), None);
    }

    #[test]
    fn test_static_decision() {
        assert!(StaticDecision::APPROVE.request_decision("x").unwrap());
        assert!(!StaticDecision::REJECT.request_decision("x").unwrap());
    }

    #[test]
    fn test_closure_provider() {
        let provider = |prompt: &str| -> Result<bool, DecisionError> { Ok(prompt.contains("safe")) };
        assert!(provider.request_decision("safe plan").unwrap());
        assert!(!provider.request_decision("risky plan").unwrap());
    }

    #[test]
    fn test_require_approval_skips_when_not_required() {
        let asked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&asked);
        let inner = move |_: &str| -> Result<bool, DecisionError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        };

        let provider = RequireApproval::new(false, inner);
        assert!(provider.request_decision("plan").unwrap());
        assert_eq!(asked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_require_approval_delegates_when_required() {
        let provider = RequireApproval::new(true, StaticDecision::REJECT);
        assert!(!provider.request_decision("plan").unwrap());
    }

    #[test]
    fn test_console_approves() {
        let provider = console("y\n");
        assert!(provider.request_decision("Create f1").unwrap());

        let (_, output) = provider.into_inner();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Create f1"));
        assert!(text.contains("Approve? (y/n)"));
    }

    #[test]
    fn test_console_reprompts_on_invalid_input() {
        let provider = console("what\nmaybe\nno\n");
        assert!(!provider.request_decision("plan").unwrap());

        let (_, output) = provider.into_inner();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Please enter 'y' or 'n'.").count(), 2);
    }

    #[test]
    fn test_console_eof_is_unavailable() {
        let provider = console("");
        let err = provider.request_decision("plan").unwrap_err();
        assert!(matches!(err, DecisionError::Unavailable(_)));
    }

    #[test]
    fn test_gate_step_stores_decision() {
        let gate = gate_step("wait", StaticDecision::REJECT, "ok", |_| String::new());
        let state = gate.invoke(WorkflowState::new().with("plan", "p")).unwrap();

        assert_eq!(state.get_bool("ok"), Some(false));
        assert_eq!(state.get_str("plan"), Some("p"));
    }

    #[test]
    fn test_gate_step_prompt_sees_state() {
        let gate = gate_step(
            "wait",
            |prompt: &str| -> Result<bool, DecisionError> { Ok(prompt == "project=webapp") },
            DEFAULT_DECISION_KEY,
            |state: &WorkflowState| format!("project={}", state.get_str("project").unwrap_or("")),
        );

        let state = gate.invoke(WorkflowState::new().with("project", "webapp")).unwrap();
        assert_eq!(state.get_bool(DEFAULT_DECISION_KEY), Some(true));
    }

    #[test]
    fn test_gate_step_provider_failure() {
        let gate = gate_step(
            "wait",
            |_: &str| -> Result<bool, DecisionError> {
                Err(DecisionError::Unavailable("flag service down".to_string()))
            },
            DEFAULT_DECISION_KEY,
            |_| String::new(),
        );

        let err = gate.invoke(WorkflowState::new()).unwrap_err();
        assert!(err.to_string().contains("flag service down"));
    }
}
