mod harness;
pub mod report;
mod suite_runner;

pub use harness::ProbeHarness;
pub use report::{Assertion, CaseReport, ProbeOutcome, Report};
pub use suite_runner::SuiteRunner;
