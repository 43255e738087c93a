//! Recursive-descent parser producing [`Stmt`] trees

use super::ast::{BinOp, CmpOp, Expr, Stmt, StmtKind, UnaryOp};
use super::error::{CompileError, Exception};
use super::lexer::{Tok, Token};

const KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "in", "pass", "break", "continue", "and", "or", "not",
    "True", "False", "None",
];

type ParseResult<T> = Result<T, CompileError>;

/// Deepest nesting of brackets, operators and blocks accepted in one source
const MAX_NESTING: usize = 100;
const TOO_DEEP: &str = "expression is too deeply nested";

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    loop_depth: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            loop_depth: 0,
            depth: 0,
        }
    }

    pub fn parse_program(mut self) -> ParseResult<Vec<Stmt>> {
        let mut program = Vec::new();
        while !self.at(&Tok::Eof) {
            program.extend(self.statement()?);
        }
        Ok(program)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, tok: &Tok) -> bool {
        &self.peek().tok == tok
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(&self.peek().tok, Tok::Op(o) if *o == op)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().tok, Tok::Name(n) if n == keyword)
    }

    fn error<T>(&self, message: &str) -> ParseResult<T> {
        let token = self.peek();
        if token.tok == Tok::Eof {
            return Err(CompileError::Incomplete);
        }
        Err(Exception::syntax(message, token.line, token.col).into())
    }

    /// Go one level deeper into the tree being built. Callers restore
    /// `depth` once the nested part has been parsed.
    fn descend(&mut self, message: &str) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            let token = self.peek();
            return Err(Exception::syntax(message, token.line, token.col).into());
        }
        self.depth += 1;
        Ok(())
    }

    fn expect_op(&mut self, op: &str) -> ParseResult<()> {
        if self.at_op(op) {
            self.advance();
            Ok(())
        } else {
            self.error(&format!("expected '{}'", op))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.at_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            self.error("invalid syntax")
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match &self.peek().tok {
            Tok::Name(name) if !KEYWORDS.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => self.error("invalid syntax"),
        }
    }

    fn statement(&mut self) -> ParseResult<Vec<Stmt>> {
        if self.at_keyword("if") {
            return Ok(vec![self.if_statement()?]);
        }
        if self.at_keyword("while") {
            let line = self.advance().line;
            let condition = self.expression()?;
            let body = self.loop_suite()?;
            return Ok(vec![Stmt {
                line,
                kind: StmtKind::While(condition, body),
            }]);
        }
        if self.at_keyword("for") {
            let line = self.advance().line;
            let target = self.expect_identifier()?;
            self.expect_keyword("in")?;
            let iterable = self.expression()?;
            let body = self.loop_suite()?;
            return Ok(vec![Stmt {
                line,
                kind: StmtKind::For(target, iterable, body),
            }]);
        }
        if self.at(&Tok::Indent) {
            return self.error("unexpected indent");
        }
        self.simple_line()
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.advance().line;
        let mut branches = Vec::new();
        let condition = self.expression()?;
        let body = self.suite()?;
        branches.push((condition, body));

        let mut orelse = None;
        loop {
            if self.at_keyword("elif") {
                self.advance();
                let condition = self.expression()?;
                let body = self.suite()?;
                branches.push((condition, body));
            } else if self.at_keyword("else") {
                self.advance();
                orelse = Some(self.suite()?);
                break;
            } else {
                break;
            }
        }

        Ok(Stmt {
            line,
            kind: StmtKind::If { branches, orelse },
        })
    }

    fn loop_suite(&mut self) -> ParseResult<Vec<Stmt>> {
        self.loop_depth += 1;
        let body = self.suite();
        self.loop_depth -= 1;
        body
    }

    fn suite(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect_op(":")?;
        if !self.at(&Tok::Newline) {
            return self.simple_line();
        }
        let base = self.depth;
        self.descend("too many statically nested blocks")?;
        self.advance();
        if !self.at(&Tok::Indent) {
            return self.error("expected an indented block");
        }
        self.advance();

        let mut body = Vec::new();
        while !self.at(&Tok::Dedent) {
            if self.at(&Tok::Eof) {
                return Err(CompileError::Incomplete);
            }
            body.extend(self.statement()?);
        }
        self.advance();
        self.depth = base;
        Ok(body)
    }

    fn simple_line(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = vec![self.simple_statement()?];
        while self.at_op(";") {
            self.advance();
            if self.at(&Tok::Newline) {
                break;
            }
            statements.push(self.simple_statement()?);
        }
        if !self.at(&Tok::Newline) {
            return self.error("invalid syntax");
        }
        self.advance();
        Ok(statements)
    }

    fn simple_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.peek().line;

        if self.at_keyword("pass") {
            self.advance();
            return Ok(Stmt { line, kind: StmtKind::Pass });
        }
        if self.at_keyword("break") || self.at_keyword("continue") {
            let token = self.advance();
            if self.loop_depth == 0 {
                let keyword = if matches!(&token.tok, Tok::Name(n) if n == "break") {
                    "'break' outside loop"
                } else {
                    "'continue' not properly in loop"
                };
                return Err(Exception::syntax(keyword, token.line, token.col).into());
            }
            let kind = if matches!(&token.tok, Tok::Name(n) if n == "break") {
                StmtKind::Break
            } else {
                StmtKind::Continue
            };
            return Ok(Stmt { line, kind });
        }

        let expr = self.expression()?;
        let aug = match &self.peek().tok {
            Tok::Op("=") => None,
            Tok::Op("+=") => Some(BinOp::Add),
            Tok::Op("-=") => Some(BinOp::Sub),
            Tok::Op("*=") => Some(BinOp::Mul),
            Tok::Op("/=") => Some(BinOp::Div),
            Tok::Op("//=") => Some(BinOp::FloorDiv),
            Tok::Op("%=") => Some(BinOp::Mod),
            Tok::Op("**=") => Some(BinOp::Pow),
            _ => return Ok(Stmt { line, kind: StmtKind::Expr(expr) }),
        };

        let target = match expr {
            Expr::Name(name) => name,
            _ => {
                let token = self.peek();
                return Err(Exception::syntax(
                    "cannot assign to expression",
                    token.line,
                    token.col,
                )
                .into());
            }
        };
        self.advance();
        let value = self.expression()?;

        let kind = match aug {
            None => StmtKind::Assign(target, value),
            Some(op) => StmtKind::AugAssign(target, op, value),
        };
        Ok(Stmt { line, kind })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        let base = self.depth;
        self.descend("too many nested parentheses")?;
        let expr = self.or_expr()?;
        self.depth = base;
        Ok(expr)
    }

    fn or_expr(&mut self) -> ParseResult<Expr> {
        let base = self.depth;
        let mut left = self.and_expr()?;
        while self.at_keyword("or") {
            self.advance();
            self.descend(TOO_DEEP)?;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn and_expr(&mut self) -> ParseResult<Expr> {
        let base = self.depth;
        let mut left = self.not_expr()?;
        while self.at_keyword("and") {
            self.advance();
            self.descend(TOO_DEEP)?;
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn not_expr(&mut self) -> ParseResult<Expr> {
        if self.at_keyword("not") {
            self.advance();
            let base = self.depth;
            self.descend(TOO_DEEP)?;
            let operand = self.not_expr()?;
            self.depth = base;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let left = self.arith()?;
        let mut rest = Vec::new();
        loop {
            let op = match &self.peek().tok {
                Tok::Op("==") => CmpOp::Eq,
                Tok::Op("!=") => CmpOp::Ne,
                Tok::Op("<") => CmpOp::Lt,
                Tok::Op("<=") => CmpOp::Le,
                Tok::Op(">") => CmpOp::Gt,
                Tok::Op(">=") => CmpOp::Ge,
                _ => break,
            };
            self.advance();
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare(Box::new(left), rest))
        }
    }

    fn arith(&mut self) -> ParseResult<Expr> {
        let base = self.depth;
        let mut left = self.term()?;
        loop {
            let op = match &self.peek().tok {
                Tok::Op("+") => BinOp::Add,
                Tok::Op("-") => BinOp::Sub,
                _ => break,
            };
            self.advance();
            self.descend(TOO_DEEP)?;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let base = self.depth;
        let mut left = self.factor()?;
        loop {
            let op = match &self.peek().tok {
                Tok::Op("*") => BinOp::Mul,
                Tok::Op("/") => BinOp::Div,
                Tok::Op("//") => BinOp::FloorDiv,
                Tok::Op("%") => BinOp::Mod,
                _ => break,
            };
            self.advance();
            self.descend(TOO_DEEP)?;
            let right = self.factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let op = match &self.peek().tok {
            Tok::Op("-") => Some(UnaryOp::Neg),
            Tok::Op("+") => Some(UnaryOp::Pos),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let base = self.depth;
            self.descend(TOO_DEEP)?;
            let operand = self.factor()?;
            self.depth = base;
            return Ok(Expr::Unary(op, Box::new(operand)));
        }
        self.power()
    }

    fn power(&mut self) -> ParseResult<Expr> {
        let base = self.call()?;
        if self.at_op("**") {
            self.advance();
            let saved_depth = self.depth;
            self.descend(TOO_DEEP)?;
            let exponent = self.factor()?;
            self.depth = saved_depth;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let base = self.depth;
        let mut expr = self.atom()?;
        while self.at_op("(") {
            self.advance();
            self.descend(TOO_DEEP)?;
            let mut args = Vec::new();
            while !self.at_op(")") {
                args.push(self.expression()?);
                if self.at_op(",") {
                    self.advance();
                } else if !self.at_op(")") {
                    return self.error("invalid syntax");
                }
            }
            self.advance();
            expr = Expr::Call(Box::new(expr), args);
        }
        self.depth = base;
        Ok(expr)
    }

    fn atom(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let expr = match token.tok {
            Tok::Int(value) => Expr::Int(value),
            Tok::Float(value) => Expr::Float(value),
            Tok::Str(text) => {
                self.advance();
                let mut joined = text;
                while let Tok::Str(more) = &self.peek().tok {
                    joined.push_str(more);
                    self.advance();
                }
                return Ok(Expr::Str(joined));
            }
            Tok::Name(name) => match name.as_str() {
                "True" => Expr::Bool(true),
                "False" => Expr::Bool(false),
                "None" => Expr::None,
                keyword if KEYWORDS.contains(&keyword) => return self.error("invalid syntax"),
                _ => Expr::Name(name),
            },
            Tok::Op("(") => {
                self.advance();
                let inner = self.expression()?;
                self.expect_op(")")?;
                return Ok(inner);
            }
            _ => return self.error("invalid syntax"),
        };
        self.advance();
        Ok(expr)
    }
}
