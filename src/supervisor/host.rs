//! Editor host interface
//!
//! The supervisor never touches a real editor. It talks to a [`Host`]
//! (notices, confirmation prompts, the active editor) and to an [`Editor`]
//! (cursor, selection, text insertion). [`TextDocument`] is an in-memory
//! editor used by the demo binary and the tests.

use std::cmp::Ordering;

/// Zero-based line and character column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Position after inserting `text` here
    pub fn advanced_by(self, text: &str) -> Self {
        match text.rfind('\n') {
            Some(last) => Position {
                line: self.line + text.matches('\n').count(),
                column: text[last + 1..].chars().count(),
            },
            None => Position {
                line: self.line,
                column: self.column + text.chars().count(),
            },
        }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.line, self.column).cmp(&(other.line, other.column))
    }
}

/// A selection from `anchor` (where it started) to `head` (the cursor end)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
}

impl Selection {
    pub fn start(&self) -> Position {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> Position {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }
}

/// The text editor the plugin is attached to
pub trait Editor {
    fn cursor(&self) -> Position;

    /// Text of one line without its terminator
    fn line_text(&self, line: usize) -> Option<String>;

    /// Current selection, if any
    fn selection(&self) -> Option<Selection>;

    /// Text between two positions
    fn text_range(&self, start: Position, end: Position) -> String;

    /// Insert literal text. Does not move the cursor.
    fn insert_text(&mut self, at: Position, text: &str);

    /// Move the cursor, collapsing any selection
    fn set_cursor(&mut self, position: Position);

    /// Select from `anchor` to `head`; the cursor moves to `head`
    fn select(&mut self, anchor: Position, head: Position);
}

/// Services the plugin needs from the hosting application
pub trait Host {
    /// Editor that currently has focus
    fn active_editor(&mut self) -> Option<&mut dyn Editor>;

    /// Transient message, e.g. an error notice
    fn show_notice(&mut self, text: &str);

    /// Ask a yes/no question without blocking. The answer comes back later
    /// as a plugin command.
    fn request_confirmation(&mut self, message: &str);

    /// Called after session output was inserted into the editor
    fn output_inserted(&mut self, _text: &str) {}
}

/// In-memory editor buffer
#[derive(Debug, Clone)]
pub struct TextDocument {
    lines: Vec<String>,
    cursor: Position,
    anchor: Option<Position>,
}

impl Default for TextDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDocument {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor: Position::default(),
            anchor: None,
        }
    }

    /// Document with the given content and the cursor at its end
    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.insert_text(Position::default(), text);
        doc.cursor = doc.end();
        doc
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Position after the last character
    pub fn end(&self) -> Position {
        let line = self.lines.len() - 1;
        Position::new(line, self.lines[line].chars().count())
    }

    /// Simulate typing at the cursor
    pub fn type_text(&mut self, text: &str) {
        let at = self.cursor;
        self.insert_text(at, text);
        self.cursor = at.advanced_by(text);
        self.anchor = None;
    }

    fn clamp(&self, position: Position) -> Position {
        let line = position.line.min(self.lines.len() - 1);
        let column = position.column.min(self.lines[line].chars().count());
        Position::new(line, column)
    }

    fn byte_offset(line: &str, column: usize) -> usize {
        line.char_indices()
            .nth(column)
            .map(|(offset, _)| offset)
            .unwrap_or(line.len())
    }
}

impl Editor for TextDocument {
    fn cursor(&self) -> Position {
        self.cursor
    }

    fn line_text(&self, line: usize) -> Option<String> {
        self.lines.get(line).cloned()
    }

    fn selection(&self) -> Option<Selection> {
        self.anchor.map(|anchor| Selection {
            anchor,
            head: self.cursor,
        })
    }

    fn text_range(&self, start: Position, end: Position) -> String {
        let (start, end) = (self.clamp(start.min(end)), self.clamp(start.max(end)));
        if start.line == end.line {
            let line = &self.lines[start.line];
            let from = Self::byte_offset(line, start.column);
            let to = Self::byte_offset(line, end.column);
            return line[from..to].to_string();
        }

        let first = &self.lines[start.line];
        let mut text = first[Self::byte_offset(first, start.column)..].to_string();
        for line in &self.lines[start.line + 1..end.line] {
            text.push('\n');
            text.push_str(line);
        }
        let last = &self.lines[end.line];
        text.push('\n');
        text.push_str(&last[..Self::byte_offset(last, end.column)]);
        text
    }

    fn insert_text(&mut self, at: Position, text: &str) {
        let at = self.clamp(at);
        let line = &self.lines[at.line];
        let split = Self::byte_offset(line, at.column);
        let tail = line[split..].to_string();
        let head = line[..split].to_string();

        let mut pieces: Vec<String> = text.split('\n').map(str::to_string).collect();
        if let Some(first) = pieces.first_mut() {
            first.insert_str(0, &head);
        }
        if let Some(last) = pieces.last_mut() {
            last.push_str(&tail);
        }
        self.lines.splice(at.line..=at.line, pieces);
    }

    fn set_cursor(&mut self, position: Position) {
        self.cursor = self.clamp(position);
        self.anchor = None;
    }

    fn select(&mut self, anchor: Position, head: Position) {
        self.anchor = Some(self.clamp(anchor));
        self.cursor = self.clamp(head);
    }
}
