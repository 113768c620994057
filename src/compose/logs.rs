use crate::error::{Error, Result};
use regex::RegexSet;
use std::fmt;
use std::str::FromStr;

/// Hard cap on lines returned by a log tail, whatever was requested.
pub const MAX_LOG_TAIL: usize = 150;

/// RCON chatter printed every time a command is sent through `rcon-cli`.
pub const DEFAULT_LOG_FILTERS: &[&str] = &[
    r".*(RCON Listener).*(Thread RCON Client).*(started).*",
    r".*(RCON Client).*(Thread RCON Client).*(shutting down).*",
];

/// How many log lines to tail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogTail {
    Lines(usize),
    #[default]
    All,
}

impl LogTail {
    /// Number of lines actually requested from the engine, never above
    /// [`MAX_LOG_TAIL`].
    pub fn effective(self) -> usize {
        match self {
            LogTail::Lines(n) => n.min(MAX_LOG_TAIL),
            LogTail::All => MAX_LOG_TAIL,
        }
    }
}

impl FromStr for LogTail {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(LogTail::All);
        }
        s.parse::<usize>()
            .map(LogTail::Lines)
            .map_err(|_| format!("expected a line count or 'all', got '{}'", s))
    }
}

impl fmt::Display for LogTail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTail::Lines(n) => write!(f, "{}", n),
            LogTail::All => f.write_str("all"),
        }
    }
}

/// Drops known boilerplate lines from container logs.
#[derive(Debug, Clone)]
pub struct LogFilter {
    patterns: RegexSet,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::empty()
    }
}

impl LogFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = RegexSet::new(patterns.iter().map(|p| p.as_ref()))
            .map_err(|e| Error::Config(format!("Invalid log filter pattern: {}", e)))?;
        Ok(Self { patterns })
    }

    /// A filter that drops nothing but blank lines.
    pub fn empty() -> Self {
        Self {
            patterns: RegexSet::empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Trim every line, drop boilerplate and blank lines, and keep at most
    /// the last `limit` of what remains, preserving order.
    pub fn apply(&self, raw: &str, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !self.patterns.is_match(line))
            .map(String::from)
            .collect();

        if lines.len() > limit {
            lines.drain(..lines.len() - limit);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_filter() -> LogFilter {
        LogFilter::new(DEFAULT_LOG_FILTERS).unwrap()
    }

    #[test]
    fn tail_is_capped() {
        assert_eq!(LogTail::Lines(10).effective(), 10);
        assert_eq!(LogTail::Lines(10_000).effective(), MAX_LOG_TAIL);
        assert_eq!(LogTail::All.effective(), MAX_LOG_TAIL);
    }

    #[test]
    fn tail_parses_from_cli_text() {
        assert_eq!("all".parse::<LogTail>(), Ok(LogTail::All));
        assert_eq!("ALL".parse::<LogTail>(), Ok(LogTail::All));
        assert_eq!("25".parse::<LogTail>(), Ok(LogTail::Lines(25)));
        assert!("-1".parse::<LogTail>().is_err());
    }

    #[test]
    fn boilerplate_and_blank_lines_are_dropped_in_order() {
        let raw = "\
minecraft-1  | [10:00:00] [Server thread/INFO]: Done (3.1s)!
minecraft-1  | [10:00:05] [RCON Listener #1/INFO]: Thread RCON Client /127.0.0.1 started

minecraft-1  | [10:00:05] [Server thread/INFO]: There are 0 of a max of 20 players online
   minecraft-1  | [10:00:05] [RCON Client /127.0.0.1 #2/INFO]: Thread RCON Client /127.0.0.1 shutting down
minecraft-1  | [10:00:09] [Server thread/INFO]: Saving chunks
";
        let lines = default_filter().apply(raw, MAX_LOG_TAIL);
        assert_eq!(
            lines,
            vec![
                "minecraft-1  | [10:00:00] [Server thread/INFO]: Done (3.1s)!",
                "minecraft-1  | [10:00:05] [Server thread/INFO]: There are 0 of a max of 20 players online",
                "minecraft-1  | [10:00:09] [Server thread/INFO]: Saving chunks",
            ]
        );
    }

    #[test]
    fn lines_that_only_mention_rcon_survive() {
        let raw = "[Server thread/INFO]: RCON running on 0.0.0.0:25575";
        assert_eq!(default_filter().apply(raw, 10).len(), 1);
    }

    #[test]
    fn apply_keeps_the_last_lines_under_limit() {
        let raw: String = (0..400).map(|i| format!("line {}\n", i)).collect();
        let lines = LogFilter::empty().apply(&raw, LogTail::All.effective());
        assert_eq!(lines.len(), MAX_LOG_TAIL);
        assert_eq!(lines.first().map(String::as_str), Some("line 250"));
        assert_eq!(lines.last().map(String::as_str), Some("line 399"));
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        assert!(matches!(LogFilter::new(&["(unclosed"]), Err(Error::Config(_))));
    }
}
