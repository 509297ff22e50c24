use crate::domain::{Suite, TestCase};
use crate::services::harness::ProbeHarness;
use crate::services::report::{CaseReport, Report};
use tracing::{error, info, warn};

/// Runs every case of a suite against one image.
///
/// A harness error aborts the rest of its case only; probe failures never
/// stop anything.
pub struct SuiteRunner<'h> {
    harness: &'h ProbeHarness,
}

impl<'h> SuiteRunner<'h> {
    pub fn new(harness: &'h ProbeHarness) -> Self {
        Self { harness }
    }

    pub fn run(&self, suite: &Suite, image: &str) -> Report {
        info!(image, cases = suite.cases.len(), probes = suite.probe_count(), "running suite");

        let mut report = Report::new(image);
        for case in &suite.cases {
            report.cases.push(self.run_case(case, image));
        }

        if report.passed() {
            info!(image, "all expectations passed");
        } else {
            warn!(image, failures = report.failure_count(), "suite failed");
        }

        report
    }

    pub fn run_case(&self, case: &TestCase, image: &str) -> CaseReport {
        let mut report = CaseReport::new(&case.name);

        for probe in &case.probes {
            match self.harness.check(image, &case.config, probe) {
                Ok(outcome) => {
                    if !outcome.passed() {
                        warn!(case = %case.name, probe = %outcome.label, "expectation failed");
                    }
                    report.outcomes.push(outcome);
                }
                Err(err) => {
                    error!(case = %case.name, probe = %probe, "harness error: {err}");
                    report.fatal = Some(format!("{probe}: {err}"));
                    break;
                }
            }
        }

        report
    }
}
