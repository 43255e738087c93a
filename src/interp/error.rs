//! Interpreter exceptions

use std::fmt;
use thiserror::Error;

/// An exception raised while compiling or running calculator code
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Exception {
    #[error("ZeroDivisionError: {0}")]
    ZeroDivision(String),

    #[error("NameError: {0}")]
    Name(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("ValueError: {0}")]
    Value(String),

    #[error("OverflowError: {0}")]
    Overflow(String),

    #[error("RecursionError: {0}")]
    Recursion(String),

    #[error("SyntaxError: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("KeyboardInterrupt")]
    Interrupted,
}

impl Exception {
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Exception::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Exception::Type(message.into())
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Exception::Syntax { .. })
    }
}

/// An exception together with the line of the statement that raised it
#[derive(Debug, Clone, PartialEq)]
pub struct Traced {
    pub exception: Exception,
    pub line: usize,
}

impl Traced {
    pub fn at(exception: Exception, line: usize) -> Self {
        Self { exception, line }
    }
}

impl fmt::Display for Traced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.exception)
    }
}

/// Why a source text could not be compiled
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The text is a valid prefix; more lines are needed
    Incomplete,
    /// The text can never become valid
    Syntax(Exception),
}

impl From<Exception> for CompileError {
    fn from(exception: Exception) -> Self {
        CompileError::Syntax(exception)
    }
}
