use std::env;

/// Environment variable consulted for the image under test.
pub const DEFAULT_OVERRIDE_VAR: &str = "TEST_IMAGE";

/// Picks the image under test: the override variable when it holds a
/// non-empty value, the caller's default otherwise.
///
/// The image string is not validated; a bad reference only shows up when a
/// container is created from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResolver {
    var: String,
}

impl ImageResolver {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn resolve(&self, default: &str) -> String {
        let value = env::var(&self.var).ok();
        Self::resolve_from(default, value.as_deref())
    }

    /// Resolution given an already looked-up override value.
    pub fn resolve_from(default: &str, value: Option<&str>) -> String {
        match value.map(str::trim) {
            Some(image) if !image.is_empty() => image.to_string(),
            _ => default.to_string(),
        }
    }
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new(DEFAULT_OVERRIDE_VAR)
    }
}

/// Resolves `default` against `TEST_IMAGE`.
pub fn resolve_test_image(default: &str) -> String {
    ImageResolver::default().resolve(default)
}
