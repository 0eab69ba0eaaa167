use std::fmt::Display;

use crate::loader::Span;

/// Diagnostics collected while loading and building a machine.
#[derive(Debug, Default)]
pub struct Logs {
    logs: Vec<LogEntry>,
}

pub trait LogSink {
    fn emit(&mut self, entry: LogEntry) -> &mut LogEntry;

    fn emit_warning(&mut self, msg: impl Into<String>, span: Span) -> &mut LogEntry {
        self.emit(LogEntry::new(LogLevel::Warning, msg, Some(span)))
    }

    fn emit_warning_locless(&mut self, msg: impl Into<String>) -> &mut LogEntry {
        self.emit(LogEntry::new(LogLevel::Warning, msg, None))
    }

    fn emit_info(&mut self, msg: impl Into<String>, span: Span) -> &mut LogEntry {
        self.emit(LogEntry::new(LogLevel::Info, msg, Some(span)))
    }

    fn emit_info_locless(&mut self, msg: impl Into<String>) -> &mut LogEntry {
        self.emit(LogEntry::new(LogLevel::Info, msg, None))
    }

    fn emit_help_locless(&mut self, msg: impl Into<String>) -> &mut LogEntry {
        self.emit(LogEntry::new(LogLevel::Help, msg, None))
    }
}

impl LogSink for Logs {
    fn emit(&mut self, entry: LogEntry) -> &mut LogEntry {
        match entry.level {
            LogLevel::Warning => ::log::warn!("{}", entry.message),
            _ => ::log::debug!("{}", entry.message),
        }
        self.logs.push(entry);
        let last = self.logs.len() - 1;
        &mut self.logs[last]
    }
}

impl Logs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_warnings(&self) -> bool {
        self.logs.iter().any(|e| matches!(e.level, LogLevel::Warning))
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn displayable_with<'a>(
        &'a self,
        src: &'a str,
    ) -> impl Iterator<Item = LogEntryDisplay<'a>> {
        self.logs.iter().map(move |entry| LogEntryDisplay { src, entry })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Help,
}

#[derive(Debug)]
pub struct LogEntry {
    pub message: String,
    pub span: Option<Span>,
    pub level: LogLevel,
    pub child: Option<Box<LogEntry>>,
}

impl LogEntry {
    fn new(level: LogLevel, msg: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: msg.into(),
            span,
            level,
            child: None,
        }
    }
}

// Emitting on an entry attaches a note to it, e.g. a help line under a warning.
impl LogSink for LogEntry {
    fn emit(&mut self, entry: LogEntry) -> &mut LogEntry {
        self.child.insert(Box::new(entry))
    }
}

pub struct LogEntryDisplay<'a> {
    src: &'a str,
    entry: &'a LogEntry,
}

impl<'a> Display for LogEntryDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const RESET: &str = "\x1b[0;22m";
        const BOLD: &str = "\x1b[1m";
        const GREEN: &str = "\x1b[32m";
        const YELLOW: &str = "\x1b[33m";
        const CYAN: &str = "\x1b[36m";

        let mut next_entry = Some(self.entry);

        while let Some(entry) = next_entry {
            match entry.level {
                LogLevel::Help => write!(f, "{BOLD}{GREEN}help{RESET}{BOLD}: ")?,
                LogLevel::Info => write!(f, "{BOLD}{CYAN}info{RESET}{BOLD}: ")?,
                LogLevel::Warning => write!(f, "{BOLD}{YELLOW}warning{RESET}{BOLD}: ")?,
            }
            writeln!(f, "{}{RESET}", entry.message)?;

            if let Some(Span(start, end)) = entry.span
                && let Some(line) = self.line_around(start)
            {
                let (line_start, text) = line;
                write!(f, "{BOLD}{CYAN}  | {RESET}")?;
                for c in text.chars() {
                    write!(f, "{}", if c == '\t' { ' ' } else { c })?;
                }
                writeln!(f)?;

                write!(f, "{BOLD}{CYAN}  | ")?;
                let mut index = line_start;
                for c in text.chars() {
                    write!(f, "{}", if (start..end).contains(&index) { '~' } else { ' ' })?;
                    index += c.len_utf8();
                }
                writeln!(f, "{RESET}")?;
            }
            next_entry = entry.child.as_deref();
        }

        Ok(())
    }
}

impl<'a> LogEntryDisplay<'a> {
    /// Byte offset and text of the source line containing `offset`.
    fn line_around(&self, offset: usize) -> Option<(usize, &'a str)> {
        let before = self.src.get(..offset)?;
        let start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let end = self.src[start..]
            .find('\n')
            .map(|i| i + start)
            .unwrap_or(self.src.len());
        Some((start, &self.src[start..end]))
    }
}
