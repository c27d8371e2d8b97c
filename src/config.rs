//! Compiler configuration.
//!
//! `CompilerConfig` lets external callers tune the compiler without
//! touching its passes. ASL has no first-class builtins to extend, so
//! the knobs here are the two the passes actually consult.

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Upper bound on declared array length. `None` (the default) leaves
    /// array size unconstrained.
    max_array_len: Option<u32>,
    /// Whether `SymbolPass`/the driver enforce `NoMainProperlyDeclared`.
    /// Defaults to `true`; the test suite flips it off to exercise passes
    /// on function-only fragments that never declare `main`.
    strict_main_check: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            max_array_len: None,
            strict_main_check: true,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_array_len(mut self, max: u32) -> Self {
        self.max_array_len = Some(max);
        self
    }

    pub fn with_strict_main_check(mut self, strict: bool) -> Self {
        self.strict_main_check = strict;
        self
    }

    pub fn max_array_len(&self) -> Option<u32> {
        self.max_array_len
    }

    pub fn strict_main_check(&self) -> bool {
        self.strict_main_check
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unconstrained_and_strict() {
        let cfg = CompilerConfig::default();
        assert_eq!(cfg.max_array_len(), None);
        assert!(cfg.strict_main_check());
    }

    #[test]
    fn builder_methods_chain() {
        let cfg = CompilerConfig::new()
            .with_max_array_len(1024)
            .with_strict_main_check(false);
        assert_eq!(cfg.max_array_len(), Some(1024));
        assert!(!cfg.strict_main_check());
    }
}
