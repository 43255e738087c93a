//! Tree-walking evaluator
//!
//! Globals persist across calls, which is what gives the console its REPL
//! state. Loops and `sleep` consult [`ConsoleIo::cancelled`] so a session
//! that has been abandoned stops burning CPU once it reaches a check.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::ast::{BinOp, CmpOp, Expr, Stmt, StmtKind, UnaryOp};
use super::error::{Exception, Traced};
use super::value::{range_len, Value};
use super::ConsoleIo;

type Eval<T> = Result<T, Exception>;

/// Longest string a `*` repetition or `+` concatenation may produce
const MAX_STR_LEN: usize = 1 << 26;

/// Expression nesting the evaluator will recurse through
const MAX_EVAL_DEPTH: usize = 500;

enum Flow {
    Normal,
    Break,
    Continue,
}

/// Interpreter state shared by every submission of a session
#[derive(Debug, Default)]
pub struct Runtime {
    globals: HashMap<String, Value>,
    depth: usize,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a global binding
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Execute a program. With `display`, the value of every expression
    /// statement other than `None` is echoed to stdout.
    pub fn exec(
        &mut self,
        program: &[Stmt],
        display: bool,
        io: &mut dyn ConsoleIo,
    ) -> Result<(), Traced> {
        self.exec_block(program, display, io).map(|_| ())
    }

    fn exec_block(
        &mut self,
        block: &[Stmt],
        display: bool,
        io: &mut dyn ConsoleIo,
    ) -> Result<Flow, Traced> {
        for stmt in block {
            match self.exec_stmt(stmt, display, io)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(
        &mut self,
        stmt: &Stmt,
        display: bool,
        io: &mut dyn ConsoleIo,
    ) -> Result<Flow, Traced> {
        let at = |e| Traced::at(e, stmt.line);

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                let value = self.eval(expr, io).map_err(at)?;
                if display && value != Value::None {
                    io.write_stdout(&format!("{}\n", value.repr()));
                    io.flush_stdout();
                }
            }
            StmtKind::Assign(name, expr) => {
                let value = self.eval(expr, io).map_err(at)?;
                self.globals.insert(name.clone(), value);
            }
            StmtKind::AugAssign(name, op, expr) => {
                let current = self.lookup(name).map_err(at)?;
                let rhs = self.eval(expr, io).map_err(at)?;
                let value = binary(*op, current, rhs).map_err(at)?;
                self.globals.insert(name.clone(), value);
            }
            StmtKind::If { branches, orelse } => {
                for (condition, body) in branches {
                    if self.eval(condition, io).map_err(at)?.truthy() {
                        return self.exec_block(body, display, io);
                    }
                }
                if let Some(body) = orelse {
                    return self.exec_block(body, display, io);
                }
            }
            StmtKind::While(condition, body) => loop {
                if io.cancelled() {
                    return Err(at(Exception::Interrupted));
                }
                if !self.eval(condition, io).map_err(at)?.truthy() {
                    break;
                }
                if let Flow::Break = self.exec_block(body, display, io)? {
                    break;
                }
            },
            StmtKind::For(target, iterable, body) => {
                let items = self.eval(iterable, io).and_then(iterate).map_err(at)?;
                for item in items {
                    if io.cancelled() {
                        return Err(at(Exception::Interrupted));
                    }
                    self.globals.insert(target.clone(), item);
                    if let Flow::Break = self.exec_block(body, display, io)? {
                        break;
                    }
                }
            }
            StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    fn lookup(&self, name: &str) -> Eval<Value> {
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| Exception::Name(format!("name '{}' is not defined", name)))
    }

    fn eval(&mut self, expr: &Expr, io: &mut dyn ConsoleIo) -> Eval<Value> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(Exception::Recursion(
                "maximum recursion depth exceeded".to_string(),
            ));
        }
        self.depth += 1;
        let result = self.eval_expr(expr, io);
        self.depth -= 1;
        result
    }

    fn eval_expr(&mut self, expr: &Expr, io: &mut dyn ConsoleIo) -> Eval<Value> {
        match expr {
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Float(v) => Ok(Value::Float(*v)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::None => Ok(Value::None),
            Expr::Name(name) => self.lookup(name),
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, io)?;
                unary(*op, value)
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, io)?;
                let right = self.eval(right, io)?;
                binary(*op, left, right)
            }
            Expr::Compare(first, rest) => {
                let mut left = self.eval(first, io)?;
                for (op, right) in rest {
                    let right = self.eval(right, io)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::And(left, right) => {
                let left = self.eval(left, io)?;
                if !left.truthy() {
                    return Ok(left);
                }
                self.eval(right, io)
            }
            Expr::Or(left, right) => {
                let left = self.eval(left, io)?;
                if left.truthy() {
                    return Ok(left);
                }
                self.eval(right, io)
            }
            Expr::Call(callee, args) => {
                let name = match callee.as_ref() {
                    Expr::Name(name) if !self.globals.contains_key(name) => name.clone(),
                    other => {
                        let value = self.eval(other, io)?;
                        return Err(Exception::type_error(format!(
                            "'{}' object is not callable",
                            value.type_name()
                        )));
                    }
                };
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, io)?);
                }
                call_builtin(&name, values, io)
            }
        }
    }
}

fn unary(op: UnaryOp, value: Value) -> Eval<Value> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!value.truthy()));
    }
    if let Value::Float(v) = value {
        return Ok(Value::Float(if op == UnaryOp::Neg { -v } else { v }));
    }
    match value.as_int() {
        Some(v) if op == UnaryOp::Neg => v.checked_neg().map(Value::Int).ok_or_else(overflow),
        Some(v) => Ok(Value::Int(v)),
        None => Err(Exception::type_error(format!(
            "bad operand type for unary {}: '{}'",
            if op == UnaryOp::Neg { "-" } else { "+" },
            value.type_name()
        ))),
    }
}

fn overflow() -> Exception {
    Exception::Overflow("integer result too large".to_string())
}

fn string_too_long() -> Exception {
    Exception::Overflow("repeated string is too long".to_string())
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> Exception {
    Exception::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

pub(crate) fn binary(op: BinOp, left: Value, right: Value) -> Eval<Value> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_binary(op, a, b);
    }
    if left.is_numeric() && right.is_numeric() {
        let (a, b) = (
            left.as_float().unwrap_or_default(),
            right.as_float().unwrap_or_default(),
        );
        return float_binary(op, a, b);
    }

    match (op, &left, &right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            if a.len() + b.len() > MAX_STR_LEN {
                return Err(string_too_long());
            }
            Ok(Value::Str(format!("{}{}", a, b)))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
            let count = usize::try_from(n.as_int().unwrap_or(0).max(0)).unwrap_or(usize::MAX);
            match count.checked_mul(s.len()) {
                Some(len) if len <= MAX_STR_LEN => Ok(Value::Str(s.repeat(count))),
                _ => Err(string_too_long()),
            }
        }
        _ => Err(unsupported(op, &left, &right)),
    }
}

fn int_binary(op: BinOp, a: i64, b: i64) -> Eval<Value> {
    let zero = |what: &str| Exception::ZeroDivision(what.to_string());
    match op {
        BinOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        BinOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        BinOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        BinOp::Div => {
            if b == 0 {
                return Err(zero("division by zero"));
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(zero("integer division or modulo by zero"));
            }
            let quotient = a.checked_div(b).ok_or_else(overflow)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                Ok(Value::Int(quotient - 1))
            } else {
                Ok(Value::Int(quotient))
            }
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(zero("integer modulo by zero"));
            }
            let rem = a.checked_rem(b).ok_or_else(overflow)?;
            if rem != 0 && ((rem < 0) != (b < 0)) {
                Ok(Value::Int(rem + b))
            } else {
                Ok(Value::Int(rem))
            }
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(zero("0.0 cannot be raised to a negative power"));
                }
                return Ok(Value::Float((a as f64).powf(b as f64)));
            }
            let exponent = u32::try_from(b).map_err(|_| overflow())?;
            a.checked_pow(exponent).map(Value::Int).ok_or_else(overflow)
        }
    }
}

fn float_binary(op: BinOp, a: f64, b: f64) -> Eval<Value> {
    let zero = |what: &str| Exception::ZeroDivision(what.to_string());
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(zero("float division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(zero("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(zero("float modulo by zero"));
            }
            a - b * (a / b).floor()
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(zero("0.0 cannot be raised to a negative power"));
            }
            a.powf(b)
        }
    };
    Ok(Value::Float(value))
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Eval<bool> {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (l, r) if l.is_numeric() && r.is_numeric() => {
            match (l.as_int(), r.as_int()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => l
                    .as_float()
                    .unwrap_or_default()
                    .partial_cmp(&r.as_float().unwrap_or_default()),
            }
        }
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => {
            return match op {
                CmpOp::Eq => Ok(left == right),
                CmpOp::Ne => Ok(left != right),
                _ => Err(Exception::type_error(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ))),
            };
        }
    };

    Ok(match (op, ordering) {
        (CmpOp::Ne, None) => true,
        (_, None) => false,
        (CmpOp::Eq, Some(o)) => o == Ordering::Equal,
        (CmpOp::Ne, Some(o)) => o != Ordering::Equal,
        (CmpOp::Lt, Some(o)) => o == Ordering::Less,
        (CmpOp::Le, Some(o)) => o != Ordering::Greater,
        (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
        (CmpOp::Ge, Some(o)) => o != Ordering::Less,
    })
}

/// Items a `for` loop walks. Ranges are stepped lazily so their length
/// never has to be materialized.
enum Items {
    Range { next: i64, stop: i64, step: i64 },
    Chars(std::vec::IntoIter<char>),
}

impl Iterator for Items {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            Items::Range { next, stop, step } => {
                let current = *next;
                let more = (*step > 0 && current < *stop) || (*step < 0 && current > *stop);
                if !more {
                    return None;
                }
                // Stepping past i64 also steps past `stop`.
                *next = current.checked_add(*step).unwrap_or(*stop);
                Some(Value::Int(current))
            }
            Items::Chars(chars) => chars.next().map(|c| Value::Str(c.to_string())),
        }
    }
}

fn iterate(value: Value) -> Eval<Items> {
    match value {
        Value::Range { start, stop, step } => Ok(Items::Range {
            next: start,
            stop,
            step,
        }),
        Value::Str(s) => Ok(Items::Chars(s.chars().collect::<Vec<_>>().into_iter())),
        other => Err(Exception::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

fn expect_args(name: &str, args: &[Value], min: usize, max: usize) -> Eval<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("exactly {}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(Exception::type_error(format!(
            "{}() takes {} arguments ({} given)",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn call_builtin(name: &str, args: Vec<Value>, io: &mut dyn ConsoleIo) -> Eval<Value> {
    match name {
        "print" => {
            let line: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            io.write_stdout(&format!("{}\n", line.join(" ")));
            io.flush_stdout();
            Ok(Value::None)
        }
        "abs" => {
            expect_args(name, &args, 1, 1)?;
            match &args[0] {
                Value::Float(v) => Ok(Value::Float(v.abs())),
                v => v
                    .as_int()
                    .map(|i| i.checked_abs().map(Value::Int).ok_or_else(overflow))
                    .unwrap_or_else(|| {
                        Err(Exception::type_error(format!(
                            "bad operand type for abs(): '{}'",
                            v.type_name()
                        )))
                    }),
            }
        }
        "round" => {
            expect_args(name, &args, 1, 2)?;
            let digits = match args.get(1) {
                Some(d) => Some(d.as_int().ok_or_else(|| {
                    Exception::type_error("'ndigits' must be an integer".to_string())
                })?),
                None => None,
            };
            let x = args[0].as_float().ok_or_else(|| {
                Exception::type_error(format!(
                    "type {} doesn't define __round__ method",
                    args[0].type_name()
                ))
            })?;
            match digits {
                None => {
                    let rounded = round_half_even(x);
                    if rounded.abs() >= 9.2e18 || rounded.is_nan() {
                        return Err(overflow());
                    }
                    Ok(Value::Int(rounded as i64))
                }
                Some(d) => {
                    let factor = 10f64.powi(d.clamp(-300, 300) as i32);
                    let rounded = round_half_even(x * factor) / factor;
                    if args[0].as_int().is_some() && d >= 0 {
                        Ok(args[0].clone())
                    } else {
                        Ok(Value::Float(rounded))
                    }
                }
            }
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(Exception::type_error(format!(
                    "{} expected at least 1 argument, got 0",
                    name
                )));
            }
            let mut best = args[0].clone();
            for candidate in args.into_iter().skip(1) {
                let better = if name == "min" {
                    compare(CmpOp::Lt, &candidate, &best)?
                } else {
                    compare(CmpOp::Gt, &candidate, &best)?
                };
                if better {
                    best = candidate;
                }
            }
            Ok(best)
        }
        "int" => {
            expect_args(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Int(0)),
                Some(Value::Float(v)) => {
                    if !v.is_finite() || v.abs() >= 9.2e18 {
                        return Err(Exception::Overflow(
                            "cannot convert float to integer".to_string(),
                        ));
                    }
                    Ok(Value::Int(v.trunc() as i64))
                }
                Some(Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    Exception::Value(format!("invalid literal for int() with base 10: '{}'", s))
                }),
                Some(v) => v.as_int().map(Value::Int).ok_or_else(|| {
                    Exception::type_error(format!(
                        "int() argument must be a string or a number, not '{}'",
                        v.type_name()
                    ))
                }),
            }
        }
        "float" => {
            expect_args(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Float(0.0)),
                Some(Value::Str(s)) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    Exception::Value(format!("could not convert string to float: '{}'", s))
                }),
                Some(v) => v.as_float().map(Value::Float).ok_or_else(|| {
                    Exception::type_error(format!(
                        "float() argument must be a string or a number, not '{}'",
                        v.type_name()
                    ))
                }),
            }
        }
        "str" => {
            expect_args(name, &args, 0, 1)?;
            Ok(Value::Str(args.first().map(|v| v.to_string()).unwrap_or_default()))
        }
        "repr" => {
            expect_args(name, &args, 1, 1)?;
            Ok(Value::Str(args[0].repr()))
        }
        "len" => {
            expect_args(name, &args, 1, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::Range { start, stop, step } => i64::try_from(range_len(*start, *stop, *step))
                    .map(Value::Int)
                    .map_err(|_| Exception::Overflow("range is too long to measure".to_string())),
                v => Err(Exception::type_error(format!(
                    "object of type '{}' has no len()",
                    v.type_name()
                ))),
            }
        }
        "pow" => {
            expect_args(name, &args, 2, 2)?;
            let mut args = args.into_iter();
            let (base, exponent) = (args.next().unwrap_or(Value::None), args.next().unwrap_or(Value::None));
            binary(BinOp::Pow, base, exponent)
        }
        "range" => {
            expect_args(name, &args, 1, 3)?;
            let ints: Vec<i64> = args
                .iter()
                .map(|v| {
                    v.as_int().ok_or_else(|| {
                        Exception::type_error(format!(
                            "'{}' object cannot be interpreted as an integer",
                            v.type_name()
                        ))
                    })
                })
                .collect::<Eval<_>>()?;
            let (start, stop, step) = match ints.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step] => (*start, *stop, *step),
                _ => return Err(Exception::type_error("range expected at most 3 arguments")),
            };
            if step == 0 {
                return Err(Exception::Value("range() arg 3 must not be zero".to_string()));
            }
            Ok(Value::Range { start, stop, step })
        }
        "sleep" => {
            expect_args(name, &args, 1, 1)?;
            let seconds = args[0].as_float().ok_or_else(|| {
                Exception::type_error(format!(
                    "'{}' object cannot be interpreted as a number",
                    args[0].type_name()
                ))
            })?;
            if seconds < 0.0 {
                return Err(Exception::Value("sleep length must be non-negative".to_string()));
            }
            // Busy-wait: the session cannot poll for input while this runs.
            let deadline = Instant::now() + Duration::from_secs_f64(seconds.min(1e9));
            while Instant::now() < deadline {
                if io.cancelled() {
                    return Err(Exception::Interrupted);
                }
                std::hint::spin_loop();
            }
            Ok(Value::None)
        }
        _ => Err(Exception::Name(format!("name '{}' is not defined", name))),
    }
}

fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        rounded
    }
}
