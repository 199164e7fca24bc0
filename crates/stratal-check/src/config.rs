//! Checker configuration.
//!
//! An explicit value passed into the checker by the caller; the
//! checker reads no process-global state.

/// Options that influence checking.
#[derive(Debug, Clone, Default)]
pub struct CheckConfig {
    /// Relations whose warnings are muted. The entry `*` mutes every
    /// relation. Applied once, before any check runs, by setting the
    /// `suppressed` qualifier on the named relations.
    pub suppress_warnings: Vec<String>,
    /// Emit a textual log of the constraints and inferred types of each
    /// typechecked clause.
    pub debug_report: bool,
}

impl CheckConfig {
    /// `*` was given: every relation is muted.
    pub fn suppresses_all(&self) -> bool {
        self.suppress_warnings.iter().any(|name| name == "*")
    }

    /// Parse a comma-separated suppression list as given on a command
    /// line.
    pub fn with_suppression_list(mut self, list: &str) -> Self {
        self.suppress_warnings = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_list_parsing() {
        let config = CheckConfig::default().with_suppression_list("a, b,,c");
        assert_eq!(config.suppress_warnings, vec!["a", "b", "c"]);
        assert!(!config.suppresses_all());
    }

    #[test]
    fn star_mutes_everything() {
        let config = CheckConfig::default().with_suppression_list("a,*");
        assert!(config.suppresses_all());
    }
}
