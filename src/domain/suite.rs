use super::{ContainerConfig, ImageResolver, Probe};

/// One named group of probes sharing a container configuration.
///
/// Every probe still gets its own container; the configuration is only shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub config: ContainerConfig,
    pub probes: Vec<Probe>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, config: ContainerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            probes: Vec::new(),
        }
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probes.push(probe);
        self
    }
}

/// The checks for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub default_image: String,
    pub resolver: ImageResolver,
    pub cases: Vec<TestCase>,
}

impl Suite {
    pub fn new(default_image: impl Into<String>) -> Self {
        Self {
            default_image: default_image.into(),
            resolver: ImageResolver::default(),
            cases: Vec::new(),
        }
    }

    pub fn with_case(mut self, case: TestCase) -> Self {
        self.cases.push(case);
        self
    }

    /// Image under test after applying the override variable.
    pub fn image(&self) -> String {
        self.resolver.resolve(&self.default_image)
    }

    pub fn probe_count(&self) -> usize {
        self.cases.iter().map(|c| c.probes.len()).sum()
    }
}
