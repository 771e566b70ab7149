pub type WeftResult<T> = Result<T, WeftError>;

#[derive(thiserror::Error, Debug)]
pub enum WeftError {
    /// A name was invoked as a generator but is absent from every registry
    /// category.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// A required sub-image was not found: empty filter body, or a
    /// double-filter search phase that came up empty.
    #[error("missing operand: {0}")]
    MissingOperand(String),

    /// A buffer crossed the filter boundary with the wrong byte length.
    #[error("malformed dimensions: expected {expected} bytes for {width}x{height}, got {actual}")]
    MalformedDimensions {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// A value bottomed out in neither a 4-channel color nor a known
    /// evaluator.
    #[error("invalid terminal value: {0}")]
    TerminalValueInvalid(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WeftError {
    pub fn unknown_operator(name: impl Into<String>) -> Self {
        Self::UnknownOperator(name.into())
    }

    pub fn missing_operand(msg: impl Into<String>) -> Self {
        Self::MissingOperand(msg.into())
    }

    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::TerminalValueInvalid(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            WeftError::unknown_operator("swirl")
                .to_string()
                .contains("unknown operator:")
        );
        assert!(
            WeftError::missing_operand("x")
                .to_string()
                .contains("missing operand:")
        );
        assert!(
            WeftError::terminal("x")
                .to_string()
                .contains("invalid terminal value:")
        );
        assert!(
            WeftError::validation("x")
                .to_string()
                .contains("validation error:")
        );
    }

    #[test]
    fn malformed_dimensions_reports_both_lengths() {
        let err = WeftError::MalformedDimensions {
            width: 2,
            height: 2,
            expected: 16,
            actual: 12,
        };
        let s = err.to_string();
        assert!(s.contains("16"));
        assert!(s.contains("12"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = WeftError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
