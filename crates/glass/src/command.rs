//! Command specifications
//!
//! A command binds a printf-style template to an ordered list of parameter
//! slots. Command text is only ever produced from values that passed their
//! slot's validation, and values are spliced between pre-parsed literal
//! segments, so a value containing `%s` cannot add or move a slot.

use crate::error::{GlassError, Result};
use crate::parameter::{Parameter, SelectOption, COMMAND_PARAMETER_NAME};
use crate::router::Router;
use crate::table::columns_table;
use regex::Regex;
use std::any::Any;

/// Display name of the free-form command
pub const ANY_COMMAND_NAME: &str = "Any command";

/// A command template split at its `%s` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: Vec<String>,
}

impl Template {
    /// Parse `%s` placeholders; `%%` is a literal percent sign
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                current.push(c);
                continue;
            }

            match chars.next() {
                Some('s') => segments.push(std::mem::take(&mut current)),
                Some('%') => current.push('%'),
                Some(other) => {
                    return Err(GlassError::Configuration(format!(
                        "unsupported conversion %{} in template {:?}",
                        other, raw
                    )))
                }
                None => {
                    return Err(GlassError::Configuration(format!(
                        "dangling % at end of template {:?}",
                        raw
                    )))
                }
            }
        }
        segments.push(current);

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Template without placeholders, kept exactly as written
    pub fn literal(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            segments: vec![raw.to_string()],
        }
    }

    pub fn placeholders(&self) -> usize {
        self.segments.len() - 1
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Interleave `values` with the literal segments. Callers guarantee
    /// `values.len() == self.placeholders()`.
    pub fn render<S: AsRef<str>>(&self, values: &[S]) -> String {
        debug_assert_eq!(values.len(), self.placeholders());

        let mut out = String::with_capacity(self.raw.len());
        for (idx, segment) in self.segments.iter().enumerate() {
            out.push_str(segment);
            if let Some(value) = values.get(idx) {
                out.push_str(value.as_ref());
            }
        }
        out
    }
}

/// Number of `%s` placeholders in `raw`, skipping `%%` escapes
fn count_placeholders(raw: &str) -> usize {
    let mut count = 0;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c == '%' && chars.next() == Some('s') {
            count += 1;
        }
    }
    count
}

/// Capability shared by every command kind
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Human-readable signature, e.g. `ping -c <count> <host>`
    fn name(&self) -> &str;

    /// Ordered parameter slots
    fn param_specs(&self) -> &[Parameter];

    /// Validate `params` and build the literal command text
    fn command_text(&self, params: &[String]) -> Result<String>;

    /// Turn raw backend output into a presentable fragment
    fn decorate_result(&self, result: &str, _router: &Router, _helper: Option<&dyn Any>) -> String {
        preformatted(result)
    }

    /// Recompute dynamic state (e.g. selection options) from the router
    fn on_refresh(&self, _router: &Router) -> Result<()> {
        Ok(())
    }

    /// Selection slots whose options are owned by `on_refresh`
    fn refreshed_slots(&self) -> Vec<usize> {
        Vec::new()
    }
}

/// Default decoration: raw output in a `<pre>` block
pub fn preformatted(result: &str) -> String {
    format!("<pre>\n{}\n</pre>", html_escape::encode_text(result))
}

/// Source of live options for one selection slot
#[derive(Debug, Clone)]
pub struct OptionProbe {
    slot: usize,
    command: String,
    line_pattern: Regex,
}

impl OptionProbe {
    /// `line_pattern` is matched against every output line; capture group 1
    /// is the option value and optional group 2 its label.
    pub fn new(slot: usize, command: &str, line_pattern: &str) -> Result<Self> {
        let line_pattern = Regex::new(line_pattern).map_err(|e| {
            GlassError::Configuration(format!("invalid probe pattern for slot {}: {}", slot, e))
        })?;

        if line_pattern.captures_len() < 2 {
            return Err(GlassError::Configuration(format!(
                "probe pattern for slot {} needs a capture group for the value",
                slot
            )));
        }

        Ok(Self {
            slot,
            command: command.to_string(),
            line_pattern,
        })
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Options found in probe output, in order, without duplicates
    pub fn extract(&self, output: &str) -> Vec<SelectOption> {
        let mut options: Vec<SelectOption> = Vec::new();

        for line in output.lines() {
            let Some(caps) = self.line_pattern.captures(line) else {
                continue;
            };
            let Some(value) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if value.is_empty() || options.iter().any(|o| o.value == value) {
                continue;
            }
            let display = caps.get(2).map(|m| m.as_str()).unwrap_or(value);
            options.push(SelectOption::new(value, display));
        }

        options
    }
}

/// How a text command presents backend output
#[derive(Debug, Clone, Default)]
pub enum Decoration {
    /// Raw output in a `<pre>` block
    #[default]
    Preformatted,
    /// Whitespace-separated columns as a table, matching rows in red
    Columns { highlight: Option<Regex> },
}

/// Command built by substituting validated values into a template
#[derive(Debug)]
pub struct TextCommand {
    template: Template,
    params: Vec<Parameter>,
    name: String,
    probes: Vec<OptionProbe>,
    decoration: Decoration,
}

impl TextCommand {
    /// Create a command; the template must hold one `%s` per parameter
    pub fn new(template: &str, params: Vec<Parameter>) -> Result<Self> {
        let template = if params.is_empty() {
            if count_placeholders(template) > 0 {
                return Err(GlassError::Configuration(format!(
                    "template {:?} has placeholders but no parameters are declared",
                    template
                )));
            }
            Template::literal(template)
        } else {
            Template::parse(template)?
        };

        if template.placeholders() != params.len() {
            return Err(GlassError::Configuration(format!(
                "template {:?} has {} placeholders but {} parameters are declared",
                template.as_str(),
                template.placeholders(),
                params.len()
            )));
        }

        let name = if params.is_empty() {
            template.as_str().to_string()
        } else {
            let slots: Vec<String> = params.iter().map(|p| format!("<{}>", p.name())).collect();
            template.render(&slots)
        };

        Ok(Self {
            template,
            params,
            name,
            probes: Vec::new(),
            decoration: Decoration::default(),
        })
    }

    /// Override the synthesized display name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Refresh a selection slot from backend output
    pub fn with_probe(mut self, probe: OptionProbe) -> Result<Self> {
        match self.params.get(probe.slot()) {
            Some(Parameter::Selection(_)) => {
                self.probes.push(probe);
                Ok(self)
            }
            _ => Err(GlassError::Configuration(format!(
                "probe targets slot {} of {:?}, which is not a selection parameter",
                probe.slot(),
                self.name
            ))),
        }
    }

    pub fn with_decoration(mut self, decoration: Decoration) -> Self {
        self.decoration = decoration;
        self
    }

    fn reject(&self, reason: String) -> GlassError {
        tracing::debug!(command = %self.name, %reason, "rejected command parameters");
        GlassError::InvalidParams {
            command: self.name.clone(),
            reason,
        }
    }
}

impl Command for TextCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn param_specs(&self) -> &[Parameter] {
        &self.params
    }

    fn command_text(&self, params: &[String]) -> Result<String> {
        if params.len() != self.params.len() {
            return Err(self.reject(format!(
                "expected {} parameters, got {}",
                self.params.len(),
                params.len()
            )));
        }

        for (idx, (spec, raw)) in self.params.iter().zip(params).enumerate() {
            if !spec.validate(raw) {
                return Err(self.reject(format!("parameter {} ({}) failed validation", idx, spec.name())));
            }
        }

        if self.params.is_empty() {
            return Ok(self.template.as_str().to_string());
        }

        let normalized = self
            .params
            .iter()
            .zip(params)
            .map(|(spec, raw)| spec.normalize(raw))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| self.reject(e.to_string()))?;

        Ok(self.template.render(&normalized))
    }

    fn decorate_result(&self, result: &str, router: &Router, _helper: Option<&dyn Any>) -> String {
        match &self.decoration {
            Decoration::Preformatted => preformatted(result),
            Decoration::Columns { highlight } => {
                let table = columns_table(result, highlight.as_ref())
                    .with_headline(&html_escape::encode_text(router.name()));
                match table.decorate() {
                    Ok(html) => html,
                    Err(e) => {
                        tracing::warn!(command = %self.name, error = %e, "table rendering failed");
                        preformatted(result)
                    }
                }
            }
        }
    }

    fn on_refresh(&self, router: &Router) -> Result<()> {
        let mut updates = Vec::with_capacity(self.probes.len());

        for probe in &self.probes {
            let output = router.run_raw(probe.command())?;
            let options = probe.extract(&output);
            if options.is_empty() {
                return Err(GlassError::Execution(format!(
                    "probe {:?} produced no options",
                    probe.command()
                )));
            }
            updates.push((probe.slot(), options));
        }

        for (slot, options) in updates {
            if let Some(selection) = self.params.get(slot).and_then(Parameter::as_selection) {
                selection.set_options(options)?;
            }
        }

        Ok(())
    }

    fn refreshed_slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self.probes.iter().map(OptionProbe::slot).collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    }
}

/// Free-form command: every value is appended after a single space
#[derive(Debug)]
pub struct AnyCommand {
    prefix: String,
    parameter: Parameter,
    name: String,
}

impl Default for AnyCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl AnyCommand {
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            parameter: Parameter::catchall(COMMAND_PARAMETER_NAME),
            name: ANY_COMMAND_NAME.to_string(),
        }
    }

    /// Text placed before the joined values
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

impl Command for AnyCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn param_specs(&self) -> &[Parameter] {
        std::slice::from_ref(&self.parameter)
    }

    fn command_text(&self, params: &[String]) -> Result<String> {
        if params.is_empty() {
            return Err(GlassError::InvalidParams {
                command: self.name.clone(),
                reason: "at least one value is required".to_string(),
            });
        }

        let mut text = self.prefix.clone();
        for raw in params {
            let value = self
                .parameter
                .normalize(raw)
                .map_err(|e| GlassError::InvalidParams {
                    command: self.name.clone(),
                    reason: e.to_string(),
                })?;
            text.push(' ');
            text.push_str(&value);
        }

        Ok(text)
    }
}
