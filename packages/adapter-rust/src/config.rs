/// Configuration for the dynamic-operations runtime.
#[derive(Debug, Clone)]
pub struct ExtensionsConfig {
    /// Deadline for unary invokes in milliseconds; `None` disables the
    /// deadline. Stream and duplex calls are bounded by their cancellation
    /// signal instead.
    pub invoke_timeout_ms: Option<u64>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            invoke_timeout_ms: Some(30_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_an_invoke_deadline() {
        assert_eq!(ExtensionsConfig::default().invoke_timeout_ms, Some(30_000));
    }
}
