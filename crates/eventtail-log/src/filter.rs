use regex::Regex;

use eventtail_types::Event;

/// Compiled regex filter over an event's compact JSON text
#[derive(Clone)]
pub struct EventFilter {
    /// Regex pattern (if any)
    regex: Option<Regex>,

    /// Original pattern string
    pattern: String,

    /// Whether to invert match
    invert: bool,

    /// Case sensitivity
    case_insensitive: bool,
}

impl EventFilter {
    /// Create a new filter from a pattern string
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, false)
    }

    /// Create a case-insensitive filter
    pub fn new_case_insensitive(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let regex = if pattern.is_empty() {
            None
        } else if case_insensitive {
            Some(Regex::new(&format!("(?i){}", pattern))?)
        } else {
            Some(Regex::new(pattern)?)
        };

        Ok(Self {
            regex,
            pattern: pattern.to_string(),
            invert: false,
            case_insensitive,
        })
    }

    /// Invert the match
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Check if an event matches this filter
    pub fn matches(&self, event: &Event) -> bool {
        let text_match = match &self.regex {
            Some(re) => re.is_match(&event.to_compact()),
            None => true,
        };

        if self.invert { !text_match } else { text_match }
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }
}

impl std::fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFilter")
            .field("pattern", &self.pattern)
            .field("invert", &self.invert)
            .field("case_insensitive", &self.case_insensitive)
            .finish()
    }
}
