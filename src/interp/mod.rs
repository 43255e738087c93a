//! Bundled interpreter
//!
//! The session layer only needs something that can take a line or a block of
//! source and write to two output streams; that contract is [`Interpreter`].
//! [`CalcConsole`] is the implementation shipped with pycalc: a small
//! Python-flavoured calculator with variables, loops and tracebacks.

pub mod ast;
pub mod console;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

pub use console::CalcConsole;
pub use error::{CompileError, Exception, Traced};
pub use value::Value;

/// Output streams an interpreter writes to
pub trait ConsoleIo {
    fn write_stdout(&mut self, text: &str);

    /// Hand the stdout written so far to the session for delivery
    fn flush_stdout(&mut self);

    fn write_stderr(&mut self, text: &str);

    /// Whether the surrounding session has been abandoned. Long-running
    /// code should check this and stop.
    fn cancelled(&self) -> bool {
        false
    }
}

/// An interactive interpreter hosted by a session
pub trait Interpreter: Send {
    /// Feed one line in interactive mode. Returns `true` when the line
    /// leaves a statement open and more input is required.
    fn push(&mut self, line: &str, io: &mut dyn ConsoleIo) -> bool;

    /// Discard any partially accumulated statement
    fn reset_buffer(&mut self);

    /// Compile and execute a complete multi-line source text
    fn run_code(&mut self, source: &str, io: &mut dyn ConsoleIo);
}

impl<T: Interpreter + ?Sized> Interpreter for Box<T> {
    fn push(&mut self, line: &str, io: &mut dyn ConsoleIo) -> bool {
        (**self).push(line, io)
    }

    fn reset_buffer(&mut self) {
        (**self).reset_buffer()
    }

    fn run_code(&mut self, source: &str, io: &mut dyn ConsoleIo) {
        (**self).run_code(source, io)
    }
}
