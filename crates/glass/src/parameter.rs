//! Parameter slots
//!
//! A parameter declares which raw values a caller may put into one slot of a
//! command template. Validation is the only security boundary: a value that
//! passes `normalize` is substituted into the command text as-is and nothing
//! downstream looks at it again.
//!
//! Text patterns are matched from the start of the value only. A pattern that
//! must cover the whole value has to end with `$`.

use crate::error::{GlassError, Result};
use arc_swap::ArcSwap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name given to slots declared without one
pub const DEFAULT_PARAMETER_NAME: &str = "parameter";

/// Name of the single slot of a free-form command
pub const COMMAND_PARAMETER_NAME: &str = "command";

/// Form widget a presenter should use for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Text,
    Select,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Select => "select",
        }
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One admissible value of a selection slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Value substituted into the command
    pub value: String,
    /// Label shown to callers
    pub display: String,
}

impl SelectOption {
    pub fn new(value: &str, display: &str) -> Self {
        Self {
            value: value.to_string(),
            display: display.to_string(),
        }
    }

    /// Build from a `[value, display]` tuple; a one-element tuple uses the
    /// value as its own label.
    pub fn from_tuple<S: AsRef<str>>(parts: &[S]) -> Result<Self> {
        match parts {
            [] => Err(GlassError::Configuration(
                "zero-sized option tuple in selection parameter".to_string(),
            )),
            [value] => Ok(Self::new(value.as_ref(), value.as_ref())),
            [value, display, ..] => Ok(Self::new(value.as_ref(), display.as_ref())),
        }
    }
}

/// Free-text slot constrained by a pattern
#[derive(Debug, Clone)]
pub struct TextParameter {
    name: String,
    pattern: String,
    regex: Regex,
    default: String,
}

impl TextParameter {
    /// Create a text parameter; the pattern is compiled once here
    pub fn new(pattern: &str, name: &str) -> Result<Self> {
        let regex = Regex::new(&format!(r"\A(?:{})", pattern)).map_err(|e| {
            GlassError::Configuration(format!("invalid pattern for parameter {}: {}", name, e))
        })?;

        Ok(Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            regex,
            default: String::new(),
        })
    }

    /// Slot accepting any non-empty value
    pub fn catchall(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: ".+".to_string(),
            regex: Regex::new(r"\A(?:.+)").expect("catchall pattern is valid"),
            default: String::new(),
        }
    }

    /// Set the value used to pre-fill a form; it is not validated
    pub fn with_default(mut self, default: &str) -> Self {
        self.default = default.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn default_value(&self) -> String {
        self.default.clone()
    }

    /// True when the pattern matches at the start of `raw`
    pub fn validate(&self, raw: &str) -> bool {
        self.regex.is_match(raw)
    }
}

/// Slot restricted to a closed, replaceable set of options
#[derive(Debug)]
pub struct SelectionParameter {
    name: String,
    options: ArcSwap<Vec<SelectOption>>,
    default: Option<String>,
}

impl SelectionParameter {
    /// Create a selection parameter; an empty option set is rejected
    pub fn new(options: Vec<SelectOption>, name: &str) -> Result<Self> {
        if options.is_empty() {
            return Err(GlassError::Configuration(format!(
                "selection parameter {} has no options",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            options: ArcSwap::from_pointee(options),
            default: None,
        })
    }

    /// Create from `[value, display]` tuples
    pub fn from_tuples<S: AsRef<str>>(tuples: &[Vec<S>], name: &str) -> Result<Self> {
        let options = tuples
            .iter()
            .map(|t| SelectOption::from_tuple(t.as_slice()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(options, name)
    }

    /// Preferred default; used only while it is one of the current options
    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consistent snapshot of the current options
    pub fn options(&self) -> Arc<Vec<SelectOption>> {
        self.options.load_full()
    }

    /// Replace the whole option set. Readers see either the old or the new
    /// set, never a mix. An empty set is rejected and the old one kept.
    pub fn set_options(&self, options: Vec<SelectOption>) -> Result<()> {
        if options.is_empty() {
            return Err(GlassError::Configuration(format!(
                "refusing to clear options of selection parameter {}",
                self.name
            )));
        }
        self.options.store(Arc::new(options));
        Ok(())
    }

    pub fn default_value(&self) -> String {
        let options = self.options.load();

        if let Some(default) = &self.default {
            if options.iter().any(|o| &o.value == default) {
                return default.clone();
            }
        }

        // never empty, see new() and set_options()
        options.first().map(|o| o.value.clone()).unwrap_or_default()
    }

    /// True when `raw` is non-empty and exactly one of the option values
    pub fn validate(&self, raw: &str) -> bool {
        !raw.is_empty() && self.options.load().iter().any(|o| o.value == raw)
    }
}

/// A declared command slot
#[derive(Debug)]
pub enum Parameter {
    Text(TextParameter),
    Selection(SelectionParameter),
}

impl Parameter {
    /// Text slot with a start-anchored pattern
    pub fn text(pattern: &str, name: &str) -> Result<Self> {
        Ok(Self::Text(TextParameter::new(pattern, name)?))
    }

    /// Slot accepting any non-empty value
    pub fn catchall(name: &str) -> Self {
        Self::Text(TextParameter::catchall(name))
    }

    /// Selection slot from `[value, display]` tuples
    pub fn selection<S: AsRef<str>>(tuples: &[Vec<S>], name: &str) -> Result<Self> {
        Ok(Self::Selection(SelectionParameter::from_tuples(tuples, name)?))
    }

    /// Set the preferred default of either variant
    pub fn with_default(self, default: &str) -> Self {
        match self {
            Self::Text(p) => Self::Text(p.with_default(default)),
            Self::Selection(p) => Self::Selection(p.with_default(default)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Text(p) => p.name(),
            Self::Selection(p) => p.name(),
        }
    }

    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Text(_) => ParameterKind::Text,
            Self::Selection(_) => ParameterKind::Select,
        }
    }

    pub fn validate(&self, raw: &str) -> bool {
        match self {
            Self::Text(p) => p.validate(raw),
            Self::Selection(p) => p.validate(raw),
        }
    }

    /// Return `raw` unchanged if it is valid for this slot
    pub fn normalize(&self, raw: &str) -> Result<String> {
        if self.validate(raw) {
            tracing::trace!(parameter = self.name(), value = raw, "accepted parameter input");
            Ok(raw.to_string())
        } else {
            Err(GlassError::InvalidInput {
                parameter: self.name().to_string(),
                value: raw.to_string(),
            })
        }
    }

    pub fn default_value(&self) -> String {
        match self {
            Self::Text(p) => p.default_value(),
            Self::Selection(p) => p.default_value(),
        }
    }

    /// Current options; empty for text slots
    pub fn options(&self) -> Vec<SelectOption> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Selection(p) => p.options().as_ref().clone(),
        }
    }

    pub fn as_selection(&self) -> Option<&SelectionParameter> {
        match self {
            Self::Selection(p) => Some(p),
            Self::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip_version() -> Parameter {
        Parameter::selection(&[vec!["4", "IPv4"], vec!["6", "IPv6"]], "ipver")
            .unwrap()
            .with_default("4")
    }

    #[test]
    fn test_text_matches_from_start_only() {
        let p = Parameter::text(r"\d+", "count").unwrap();
        assert!(p.validate("4"));
        assert!(p.validate("4; rm -rf /"));
        assert!(!p.validate("x4"));
        assert!(!p.validate(""));
    }

    #[test]
    fn test_text_end_anchor_gives_full_match() {
        let p = Parameter::text(r"^\d+$", "count").unwrap();
        assert!(p.validate("42"));
        assert!(!p.validate("42; reboot"));
        assert!(!p.validate("abc"));
    }

    #[test]
    fn test_alternation_stays_anchored() {
        let p = Parameter::text("a|b", "letter").unwrap();
        assert!(p.validate("b"));
        assert!(!p.validate("xb"));
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let err = Parameter::text("(unclosed", "broken").unwrap_err();
        assert!(matches!(err, GlassError::Configuration(_)));
    }

    #[test]
    fn test_normalize_returns_input_unchanged() {
        let p = Parameter::text(r"[\w.:]+$", "host").unwrap();
        assert_eq!(p.normalize("192.0.2.1").unwrap(), "192.0.2.1");

        let err = p.normalize("a b").unwrap_err();
        assert!(matches!(err, GlassError::InvalidInput { .. }));
    }

    #[test]
    fn test_text_default_is_verbatim() {
        let p = Parameter::text(r"^\d+$", "count").unwrap().with_default("not a number");
        assert_eq!(p.default_value(), "not a number");
    }

    #[test]
    fn test_catchall_accepts_anything_non_empty() {
        let p = Parameter::catchall(COMMAND_PARAMETER_NAME);
        assert!(p.validate("show ip bgp summary"));
        assert!(p.validate(" "));
        assert!(!p.validate(""));
        assert_eq!(p.kind(), ParameterKind::Text);
    }

    #[test]
    fn test_selection_exact_values_only() {
        let p = ip_version();
        assert!(p.validate("4"));
        assert!(p.validate("6"));
        assert!(!p.validate("9"));
        assert!(!p.validate("IPv4"));
        assert!(!p.validate(" 4"));
        assert!(!p.validate(""));
        assert_eq!(p.kind(), ParameterKind::Select);
    }

    #[test]
    fn test_selection_rejects_empty_even_if_declared() {
        let p = Parameter::selection(&[vec![""], vec!["a"]], "odd").unwrap();
        assert!(!p.validate(""));
    }

    #[test]
    fn test_selection_default_falls_back_to_first() {
        assert_eq!(ip_version().default_value(), "4");

        let p = Parameter::selection(&[vec!["4", "IPv4"], vec!["6", "IPv6"]], "ipver")
            .unwrap()
            .with_default("9");
        assert_eq!(p.default_value(), "4");

        let p = Parameter::selection(&[vec!["4", "IPv4"], vec!["6", "IPv6"]], "ipver").unwrap();
        assert_eq!(p.default_value(), "4");
    }

    #[test]
    fn test_single_element_tuple_uses_value_as_display() {
        let p = Parameter::selection(&[vec!["eth0"]], "iface").unwrap();
        assert_eq!(p.options(), vec![SelectOption::new("eth0", "eth0")]);
    }

    #[test]
    fn test_zero_sized_tuple_is_configuration_error() {
        let tuples: Vec<Vec<&str>> = vec![vec!["a"], vec![]];
        let err = Parameter::selection(&tuples, "broken").unwrap_err();
        assert!(matches!(err, GlassError::Configuration(_)));
    }

    #[test]
    fn test_empty_option_set_is_configuration_error() {
        let tuples: Vec<Vec<&str>> = Vec::new();
        assert!(Parameter::selection(&tuples, "empty").is_err());
    }

    #[test]
    fn test_set_options_replaces_whole_set() {
        let p = ip_version();
        let selection = p.as_selection().unwrap();

        let before = selection.options();
        selection
            .set_options(vec![SelectOption::new("peer1", "Peer 1")])
            .unwrap();

        assert_eq!(before.len(), 2);
        assert!(p.validate("peer1"));
        assert!(!p.validate("4"));
        assert_eq!(p.default_value(), "peer1");
    }

    #[test]
    fn test_set_options_rejects_empty_set() {
        let p = ip_version();
        let selection = p.as_selection().unwrap();

        assert!(selection.set_options(Vec::new()).is_err());
        assert!(p.validate("6"));
    }
}
