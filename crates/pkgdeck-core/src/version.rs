use std::sync::OnceLock;

/// Produces the "Version: ..." label shown on the about surface.
///
/// The label is built on first access and reused afterwards.
#[derive(Debug)]
pub struct VersionNumberProvider {
    informational: String,
    label: OnceLock<String>,
}

impl VersionNumberProvider {
    #[must_use]
    pub fn new(informational: impl Into<String>) -> Self {
        Self {
            informational: informational.into(),
            label: OnceLock::new(),
        }
    }

    pub fn version(&self) -> &str {
        self.label
            .get_or_init(|| format!("Version: {}", self.informational))
    }
}

#[cfg(test)]
mod tests {
    use super::VersionNumberProvider;

    #[test]
    fn version_label_is_prefixed() {
        let provider = VersionNumberProvider::new("1.2.3-beta.4+sha.abc");
        assert_eq!(provider.version(), "Version: 1.2.3-beta.4+sha.abc");
    }

    #[test]
    fn version_label_is_computed_once() {
        let provider = VersionNumberProvider::new("0.4.0");
        let first = provider.version();
        let second = provider.version();
        assert!(std::ptr::eq(first, second));
    }
}
