/// An error raised during name resolution.
///
/// Resolution errors abort compilation entirely; no partial program is
/// produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// A function name was declared more than once. Function names are
    /// global, so this is checked process-wide.
    DuplicateFunction(String),

    /// A variable was read before any assignment bound it in the current
    /// function's scope.
    UndefinedVariable(String),

    /// A call referred to a function name missing from the function table.
    UndefinedFunction(String),

    /// Internal resolver invariant violation (shouldn't happen in normal use).
    Internal(String),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::DuplicateFunction(name) => {
                write!(f, "resolve error: function '{}' is already defined", name)
            }
            ResolveError::UndefinedVariable(name) => {
                write!(f, "resolve error: variable '{}' is undefined", name)
            }
            ResolveError::UndefinedFunction(name) => {
                write!(f, "resolve error: function '{}' is not defined", name)
            }
            ResolveError::Internal(msg) => {
                write!(f, "resolve error: internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ResolveError {}
