use std::{error, fmt};

/// Failure kinds reported by the engine.
///
/// The first four arise inside a single literal or repeat prefix and reach
/// the context through [`Context::error`](crate::Context::error); the last
/// two arise in the tree builder when rule names are checked.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorCode {
    UnbalancedQuote,
    BadQuotedChar,
    MaxLengthExceeded,
    BadRepeatRange,
    RuleUndefined,
    RulenameDuplicated,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorCode::UnbalancedQuote => "unquoted string",
            ErrorCode::BadQuotedChar => "bad quoted char",
            ErrorCode::MaxLengthExceeded => "maximum string length exceeded",
            ErrorCode::BadRepeatRange => "bad repeat range",
            ErrorCode::RuleUndefined => "rule undefined",
            ErrorCode::RulenameDuplicated => "rulename duplicated",
        };
        f.write_str(message)
    }
}

/// An error recorded on the parse result: one code, one 1-based line, and an
/// optional detail such as the offending rule name.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SyntaxError {
    pub code: ErrorCode,
    pub line: u32,
    pub detail: String,
}

impl SyntaxError {
    pub fn new(code: ErrorCode, line: u32) -> Self {
        Self {
            code,
            line,
            detail: String::new(),
        }
    }

    pub fn with_detail(code: ErrorCode, line: u32, detail: impl Into<String>) -> Self {
        Self {
            code,
            line,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}", self.code, self.line)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

impl error::Error for SyntaxError {}
