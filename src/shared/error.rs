//! Error context helpers.
//!
//! Fallible store operations surface as `Result<T, String>`; these
//! extension traits attach a human-readable prefix at the point where an
//! underlying error crosses into cache code, instead of repeating
//! `.map_err(|e| format!(...))` at every call site.

/// Extension trait for adding context to Result types.
pub trait ResultExt<T, E> {
    /// Add context to an error, converting it to a String.
    fn context(self, msg: &str) -> Result<T, String>;

    /// Add context with a closure for lazy evaluation.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T, String>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn context(self, msg: &str) -> Result<T, String> {
        self.map_err(|e| format!("{}: {}", msg, e))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T, String> {
        self.map_err(|e| format!("{}: {}", f(), e))
    }
}

/// Extension trait for Option types to convert to Result with context.
pub trait OptionExt<T> {
    /// Convert Option to Result with an error message.
    fn ok_or_context(self, msg: &str) -> Result<T, String>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_context(self, msg: &str) -> Result<T, String> {
        self.ok_or_else(|| msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_prefixes_error() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let with_context = result.context("Failed to open index");
        assert_eq!(
            with_context.unwrap_err(),
            "Failed to open index: missing"
        );
    }

    #[test]
    fn test_ok_or_context() {
        let none: Option<u32> = None;
        assert_eq!(
            none.ok_or_context("No window for conversation").unwrap_err(),
            "No window for conversation"
        );
        assert_eq!(Some(5).ok_or_context("unused").unwrap(), 5);
    }
}
