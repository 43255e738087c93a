//! Interactive console over the calculator runtime

use super::error::{CompileError, Exception, Traced};
use super::eval::Runtime;
use super::lexer::tokenize;
use super::parser::Parser;
use super::{ConsoleIo, Interpreter};
use crate::interp::ast::Stmt;

const STATEMENT_FILE: &str = "<stdin>";
const BLOCK_FILE: &str = "<string>";

/// Python-flavoured calculator console
///
/// Statements pushed one line at a time accumulate in a buffer until they
/// form a complete logical statement. Compound statements stay open until a
/// blank line is pushed, the same way an interactive prompt behaves.
#[derive(Debug)]
pub struct CalcConsole {
    runtime: Runtime,
    buffer: Vec<String>,
    echo_input: bool,
}

impl Default for CalcConsole {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CalcConsole {
    pub fn new(echo_input: bool) -> Self {
        Self {
            runtime: Runtime::new(),
            buffer: Vec::new(),
            echo_input,
        }
    }

    /// Lines accumulated by `push` but not yet executed
    pub fn pending_lines(&self) -> &[String] {
        &self.buffer
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn compile(source: &str) -> Result<Vec<Stmt>, CompileError> {
        let tokens = tokenize(source)?;
        Parser::new(tokens).parse_program()
    }

    fn show_traceback(&self, traced: &Traced, filename: &str, io: &mut dyn ConsoleIo) {
        io.write_stderr(&format_traceback(traced, filename));
    }

    fn show_syntax_error(
        &self,
        exception: &Exception,
        source: &str,
        filename: &str,
        io: &mut dyn ConsoleIo,
    ) {
        match exception {
            Exception::Syntax { line, column, .. } => {
                let text = source.lines().nth(line.saturating_sub(1)).unwrap_or("");
                io.write_stderr(&format_syntax_error(exception, filename, *line, text, *column));
            }
            other => self.show_traceback(&Traced::at(other.clone(), 1), filename, io),
        }
    }
}

impl Interpreter for CalcConsole {
    fn push(&mut self, line: &str, io: &mut dyn ConsoleIo) -> bool {
        if self.echo_input {
            io.write_stdout(&format!("{}\n", line.trim()));
            io.flush_stdout();
        }

        self.buffer.push(line.trim_end_matches(['\r', '\n']).to_string());
        let source = self.buffer.join("\n");
        if source.trim().is_empty() {
            self.buffer.clear();
            return false;
        }

        match Self::compile(&source) {
            Err(CompileError::Incomplete) => true,
            Err(CompileError::Syntax(exception)) => {
                self.buffer.clear();
                self.show_syntax_error(&exception, &source, STATEMENT_FILE, io);
                false
            }
            Ok(program) => {
                let ends_with_blank = line.trim().is_empty();
                if program.iter().any(|s| s.kind.is_compound()) && !ends_with_blank {
                    return true;
                }
                self.buffer.clear();
                if let Err(traced) = self.runtime.exec(&program, true, io) {
                    self.show_traceback(&traced, STATEMENT_FILE, io);
                }
                false
            }
        }
    }

    fn reset_buffer(&mut self) {
        if !self.buffer.is_empty() {
            debug!("Discarding {} pending console lines", self.buffer.len());
        }
        self.buffer.clear();
    }

    fn run_code(&mut self, source: &str, io: &mut dyn ConsoleIo) {
        match Self::compile(source) {
            Err(CompileError::Incomplete) => {
                let last_line = source.lines().count().max(1);
                let exception = Exception::syntax(
                    "unexpected EOF while parsing",
                    last_line,
                    source.lines().last().map(|l| l.chars().count()).unwrap_or(0),
                );
                self.show_syntax_error(&exception, source, BLOCK_FILE, io);
            }
            Err(CompileError::Syntax(exception)) => {
                self.show_syntax_error(&exception, source, BLOCK_FILE, io);
            }
            Ok(program) => {
                if let Err(traced) = self.runtime.exec(&program, false, io) {
                    self.show_traceback(&traced, BLOCK_FILE, io);
                }
            }
        }
    }
}

/// Runtime traceback in the familiar three-line shape
pub fn format_traceback(traced: &Traced, filename: &str) -> String {
    format!(
        "Traceback (most recent call last):\n  File \"{}\", line {}, in <module>\n{}\n",
        filename, traced.line, traced.exception
    )
}

pub fn format_syntax_error(
    exception: &Exception,
    filename: &str,
    line: usize,
    text: &str,
    column: usize,
) -> String {
    let stripped = text.trim_start();
    let indent = text.chars().count() - stripped.chars().count();
    let caret = column.saturating_sub(indent).min(stripped.chars().count());
    format!(
        "  File \"{}\", line {}\n    {}\n    {}^\n{}\n",
        filename,
        line,
        stripped.trim_end(),
        " ".repeat(caret),
        exception
    )
}
