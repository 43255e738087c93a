//! Interpreter Console Unit Tests
//!
//! Exercises the bundled calculator console through its public interactive
//! interface, the same way a session drives it.

use pycalc::interp::{CalcConsole, ConsoleIo, Interpreter};

/// Collects flushed stdout chunks and raw stderr
#[derive(Default)]
struct Capture {
    flushed: Vec<String>,
    pending: String,
    stderr: String,
    cancelled: bool,
}

impl Capture {
    fn stdout(&mut self) -> String {
        self.flush_stdout();
        self.flushed.concat()
    }
}

impl ConsoleIo for Capture {
    fn write_stdout(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    fn flush_stdout(&mut self) {
        if !self.pending.is_empty() {
            self.flushed.push(std::mem::take(&mut self.pending));
        }
    }

    fn write_stderr(&mut self, text: &str) {
        self.stderr.push_str(text);
    }

    fn cancelled(&self) -> bool {
        self.cancelled
    }
}

fn quiet() -> CalcConsole {
    CalcConsole::new(false)
}

#[test]
fn test_expression_statement_displays_repr() {
    let mut console = quiet();
    let mut io = Capture::default();

    console.push("2 ** 10", &mut io);
    console.push("'hi'", &mut io);
    console.push("7 / 2", &mut io);

    assert_eq!(io.stdout(), "1024\n'hi'\n3.5\n");
    assert!(io.stderr.is_empty());
}

#[test]
fn test_assignment_displays_nothing() {
    let mut console = quiet();
    let mut io = Capture::default();

    assert!(!console.push("x = 5", &mut io));
    assert!(!console.push("None", &mut io));

    assert_eq!(io.stdout(), "");
}

#[test]
fn test_echo_precedes_result() {
    let mut console = CalcConsole::new(true);
    let mut io = Capture::default();

    console.push("  3 * 3  ", &mut io);

    io.flush_stdout();
    assert_eq!(io.flushed, vec!["3 * 3\n".to_string(), "9\n".to_string()]);
}

#[test]
fn test_python_integer_semantics() {
    let mut console = quiet();
    let mut io = Capture::default();

    for line in ["-7 // 2", "-7 % 3", "round(2.5)", "round(3.5)", "abs(-4)", "max(1, 9, 3)"] {
        console.push(line, &mut io);
    }

    assert_eq!(io.stdout(), "-4\n2\n2\n4\n4\n9\n");
}

#[test]
fn test_compound_statement_waits_for_blank_line() {
    let mut console = quiet();
    let mut io = Capture::default();

    assert!(!console.push("x = 3", &mut io));
    assert!(console.push("if x > 1:", &mut io));
    assert!(console.push("    print('big')", &mut io));
    assert_eq!(console.pending_lines().len(), 2);
    assert!(!console.push("", &mut io));

    assert_eq!(io.stdout(), "big\n");
    assert!(console.pending_lines().is_empty());
}

#[test]
fn test_open_bracket_needs_more_input() {
    let mut console = quiet();
    let mut io = Capture::default();

    assert!(console.push("(1 +", &mut io));
    assert!(!console.push(" 2)", &mut io));

    assert_eq!(io.stdout(), "3\n");
}

#[test]
fn test_reset_buffer_discards_partial_statement() {
    let mut console = quiet();
    let mut io = Capture::default();

    assert!(console.push("for i in range(3):", &mut io));
    console.reset_buffer();
    assert!(console.pending_lines().is_empty());

    assert!(!console.push("1 + 1", &mut io));
    assert_eq!(io.stdout(), "2\n");
}

#[test]
fn test_statement_traceback_shape() {
    let mut console = quiet();
    let mut io = Capture::default();

    console.push("1/0", &mut io);

    assert_eq!(
        io.stderr,
        "Traceback (most recent call last):\n  File \"<stdin>\", line 1, in <module>\nZeroDivisionError: division by zero\n"
    );
    assert_eq!(io.stdout(), "");
}

#[test]
fn test_name_error() {
    let mut console = quiet();
    let mut io = Capture::default();

    console.push("undefined_name + 1", &mut io);

    assert!(io
        .stderr
        .ends_with("NameError: name 'undefined_name' is not defined\n"));
}

#[test]
fn test_statement_syntax_error() {
    let mut console = quiet();
    let mut io = Capture::default();

    assert!(!console.push("1 +* 2", &mut io));

    assert!(io.stderr.starts_with("  File \"<stdin>\", line 1\n"));
    assert!(io.stderr.contains("SyntaxError"));
    assert!(console.pending_lines().is_empty());
}

#[test]
fn test_block_does_not_display_expressions() {
    let mut console = quiet();
    let mut io = Capture::default();

    console.run_code("x = 5\nx * 2\nprint(x * 2)\n", &mut io);

    assert_eq!(io.stdout(), "10\n");
}

#[test]
fn test_block_shares_state_with_statements() {
    let mut console = quiet();
    let mut io = Capture::default();

    console.run_code("total = 0\nfor i in range(5):\n    total += i\n", &mut io);
    console.push("total", &mut io);

    assert_eq!(io.stdout(), "10\n");
}

#[test]
fn test_block_traceback_reports_line() {
    let mut console = quiet();
    let mut io = Capture::default();

    console.run_code("a = 1\nb = a / 0\n", &mut io);

    assert!(io
        .stderr
        .contains("  File \"<string>\", line 2, in <module>\n"));
    assert!(io.stderr.ends_with("ZeroDivisionError: division by zero\n"));
}

#[test]
fn test_incomplete_block_is_syntax_error() {
    let mut console = quiet();
    let mut io = Capture::default();

    console.run_code("(1 +", &mut io);

    assert!(io.stderr.contains("File \"<string>\""));
    assert!(io.stderr.contains("SyntaxError: unexpected EOF while parsing"));
}

#[test]
fn test_cancelled_loop_is_interrupted() {
    let mut console = quiet();
    let mut io = Capture {
        cancelled: true,
        ..Capture::default()
    };

    console.run_code("while True:\n    pass\n", &mut io);

    assert!(io.stderr.ends_with("KeyboardInterrupt\n"));
}

#[test]
fn test_cancelled_huge_range_is_interrupted() {
    let mut console = quiet();
    let mut io = Capture {
        cancelled: true,
        ..Capture::default()
    };

    console.run_code("for i in range(10**15):\n    pass\n", &mut io);

    assert!(io.stderr.ends_with("KeyboardInterrupt\n"));
}
