/// A fatal error raised while building a program from a Slopfile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }

    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Syntax, line, message)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.kind, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Categories of parse errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Grammar violation
    Syntax,
    /// `$name` matches neither a variable nor a task
    UndefinedReference,
    /// `$env.NAME` is unset or empty
    EnvNotSet,
    /// `source::env[...]` could not load its file
    Source,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax error"),
            Self::UndefinedReference => write!(f, "undefined reference"),
            Self::EnvNotSet => write!(f, "environmental variable not set"),
            Self::Source => write!(f, "failed to load env file"),
        }
    }
}
