use crate::error::ProbeFailure;
use std::fmt;

/// One labelled sub-check of a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub label: String,
    pub result: Result<(), ProbeFailure>,
}

impl Assertion {
    pub fn pass(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            result: Ok(()),
        }
    }

    pub fn fail(label: impl Into<String>, failure: ProbeFailure) -> Self {
        Self {
            label: label.into(),
            result: Err(failure),
        }
    }

    /// Passes when `expected == actual`, otherwise records both values.
    pub fn equals<T>(label: &str, expected: T, actual: T) -> Self
    where
        T: PartialEq + fmt::Display,
    {
        if expected == actual {
            Self::pass(label)
        } else {
            Self::fail(label, ProbeFailure::new(label, expected, actual))
        }
    }

    /// Passes when `haystack` contains `needle`.
    pub fn contains(label: &str, needle: &str, haystack: &str) -> Self {
        if haystack.contains(needle) {
            Self::pass(label)
        } else {
            Self::fail(
                label,
                ProbeFailure::new(label, format!("{needle:?}"), excerpt(haystack)),
            )
        }
    }

    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// All assertions made by one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub label: String,
    pub assertions: Vec<Assertion>,
    /// HTTP status the container answered with, for HTTP probes.
    pub observed_status: Option<u16>,
    /// Exit code of the exec, for file and command probes.
    pub observed_exit_code: Option<i32>,
}

impl ProbeOutcome {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            assertions: Vec::new(),
            observed_status: None,
            observed_exit_code: None,
        }
    }

    pub fn record(&mut self, assertion: Assertion) {
        self.assertions.push(assertion);
    }

    pub fn passed(&self) -> bool {
        self.assertions.iter().all(Assertion::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProbeFailure> {
        self.assertions.iter().filter_map(|a| a.result.as_ref().err())
    }

    /// Panics with every failing sub-check, for use inside `#[test]`.
    pub fn assert_passed(&self) {
        if self.passed() {
            return;
        }

        let details: Vec<String> = self.failures().map(|f| format!("  {f}")).collect();
        panic!("{} failed:\n{}", self.label, details.join("\n"));
    }
}

/// Outcomes of one test case, plus the harness error that aborted it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub name: String,
    pub outcomes: Vec<ProbeOutcome>,
    pub fatal: Option<String>,
}

impl CaseReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcomes: Vec::new(),
            fatal: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.fatal.is_none() && self.outcomes.iter().all(ProbeOutcome::passed)
    }

    pub fn failure_count(&self) -> usize {
        let failed: usize = self.outcomes.iter().map(|o| o.failures().count()).sum();
        failed + usize::from(self.fatal.is_some())
    }
}

/// Results of a whole run. Overall success is the AND of every assertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub image: String,
    pub cases: Vec<CaseReport>,
}

impl Report {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            cases: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }

    pub fn failure_count(&self) -> usize {
        self.cases.iter().map(CaseReport::failure_count).sum()
    }

    pub fn assertion_count(&self) -> usize {
        self.cases
            .iter()
            .flat_map(|c| &c.outcomes)
            .map(|o| o.assertions.len())
            .sum()
    }

    /// Process exit code: 0 when everything passed.
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "image {}", self.image)?;

        for case in &self.cases {
            writeln!(f, "case {}", case.name)?;
            for outcome in &case.outcomes {
                for assertion in &outcome.assertions {
                    match &assertion.result {
                        Ok(()) => writeln!(f, "  ok      {} / {}", outcome.label, assertion.label)?,
                        Err(failure) => writeln!(
                            f,
                            "  FAILED  {} / {}: expected {}, got {}",
                            outcome.label, assertion.label, failure.expected, failure.actual
                        )?,
                    }
                }
            }
            if let Some(fatal) = &case.fatal {
                writeln!(f, "  ERROR   {fatal}")?;
            }
        }

        let verdict = if self.passed() { "ok" } else { "FAILED" };
        write!(
            f,
            "result: {verdict}. {} assertions, {} failures",
            self.assertion_count(),
            self.failure_count()
        )
    }
}

/// Shortens captured output for failure messages.
fn excerpt(text: &str) -> String {
    const MAX: usize = 200;
    let text = text.trim();
    if text.chars().count() <= MAX {
        return format!("{text:?}");
    }
    let head: String = text.chars().take(MAX).collect();
    format!("{head:?}...")
}
