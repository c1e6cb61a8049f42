use std::fmt;

/// Coarse classification of a [`SqlCallError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation invoked in a lifecycle state that forbids it.
    State,
    /// Schema or statement shape mismatch.
    Type,
    /// Conversion or subscript failure at the value layer.
    Value,
    /// The engine rejected a request.
    Driver,
}

/// Diagnostic key/value pairs attached where an error is raised.
///
/// The context is built once and never mutated after the error is constructed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorContext {
    entries: Vec<(&'static str, String)>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing an earlier one with the same key.
    pub fn with(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Shorthand for a context holding only the statement text.
    pub fn statement(sql: &str) -> Self {
        Self::new().with("statement", sql)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            write!(f, "; {key}={{{value}}}")?;
        }
        Ok(())
    }
}

/// Error type returned by this crate.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SqlCallError {
    /// Operation invoked while the statement, queue or connection forbids it.
    #[error("state error in {op}: {message}{context}")]
    State {
        /// Operation that raised the error.
        op: &'static str,
        message: String,
        context: ErrorContext,
    },
    /// Statement kind or column type does not match what the caller asked for.
    #[error("type error in {op}: {message}{context}")]
    Type {
        op: &'static str,
        message: String,
        context: ErrorContext,
    },
    /// Conversion of a value failed, or a column subscript is invalid.
    #[error("value error in {op}: {message}{context}")]
    Value {
        op: &'static str,
        message: String,
        context: ErrorContext,
    },
    /// The engine rejected a request.
    #[error("driver error in {op}: [{code}] {message}{context}")]
    Driver {
        op: &'static str,
        /// Native diagnostic code reported by the engine.
        code: i32,
        /// Diagnostic text reported by the engine.
        message: String,
        context: ErrorContext,
    },
}

impl SqlCallError {
    pub(crate) fn state(op: &'static str, message: impl Into<String>) -> Self {
        Self::State {
            op,
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    pub(crate) fn type_mismatch(op: &'static str, message: impl Into<String>) -> Self {
        Self::Type {
            op,
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    pub(crate) fn value(op: &'static str, message: impl Into<String>) -> Self {
        Self::Value {
            op,
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    pub(crate) fn driver(op: &'static str, diagnostic: crate::driver::Diagnostic) -> Self {
        Self::Driver {
            op,
            code: diagnostic.code,
            message: diagnostic.message,
            context: ErrorContext::new(),
        }
    }

    /// Replaces the diagnostic context. Used only at the raise site.
    pub(crate) fn with_context(mut self, ctx: ErrorContext) -> Self {
        match &mut self {
            Self::State { context, .. }
            | Self::Type { context, .. }
            | Self::Value { context, .. }
            | Self::Driver { context, .. } => *context = ctx,
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::State { .. } => ErrorKind::State,
            Self::Type { .. } => ErrorKind::Type,
            Self::Value { .. } => ErrorKind::Value,
            Self::Driver { .. } => ErrorKind::Driver,
        }
    }

    /// Native engine code, present only for driver errors.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Self::Driver { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::State { context, .. }
            | Self::Type { context, .. }
            | Self::Value { context, .. }
            | Self::Driver { context, .. } => context,
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            Self::State { op, .. }
            | Self::Type { op, .. }
            | Self::Value { op, .. }
            | Self::Driver { op, .. } => op,
        }
    }
}
