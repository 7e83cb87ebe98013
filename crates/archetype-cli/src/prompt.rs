// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! A terminal [`InputResolver`] built on `console`.

use archetype_engine::resolver::{InputDescriptor, InputKind, InputResolver, ResolverError};
use archetype_engine::Value;
use console::{style, Term};
use std::io::Write;

/// Prompts at a terminal for every undeclared input, falling back to the
/// descriptor's default on a blank answer.
pub struct TerminalResolver {
    term: Term,
}

impl TerminalResolver {
    /// Builds a resolver writing to stdout.
    pub fn new() -> Self {
        TerminalResolver {
            term: Term::stdout(),
        }
    }
}

impl Default for TerminalResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl InputResolver for TerminalResolver {
    fn resolve(&self, descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
        match descriptor.kind {
            InputKind::Text => self.prompt_text(descriptor),
            InputKind::Boolean => self.prompt_boolean(descriptor),
            InputKind::Enum => self.prompt_enum(descriptor),
            InputKind::List => self.prompt_list(descriptor),
        }
    }
}

impl TerminalResolver {
    fn prompt_text(&self, descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
        let answer = self.read_line(&descriptor.label, &descriptor.help, &descriptor.default)?;
        if answer.is_empty() {
            return default_or_cancel(descriptor);
        }
        Ok(Value::String(answer))
    }

    fn prompt_boolean(&self, descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
        let answer = self.read_line(&descriptor.label, &descriptor.help, &descriptor.default)?;
        match answer.trim().to_lowercase().as_str() {
            "" => default_or_cancel(descriptor),
            "y" | "yes" | "true" => Ok(Value::Boolean(true)),
            "n" | "no" | "false" => Ok(Value::Boolean(false)),
            other => Err(ResolverError::Failed(format!(
                "{:?} is not a yes/no answer for {:?}",
                other, descriptor.path
            ))),
        }
    }

    fn prompt_enum(&self, descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
        self.print_options(descriptor);
        let answer = self.read_line(&descriptor.label, &descriptor.help, &descriptor.default)?;
        if answer.is_empty() {
            return default_or_cancel(descriptor);
        }
        let chosen = descriptor
            .options
            .iter()
            .find(|o| o.value == answer || o.label == answer)
            .ok_or_else(|| {
                ResolverError::Failed(format!("{:?} is not one of the offered options", answer))
            })?;
        Ok(Value::String(chosen.value.clone()))
    }

    fn prompt_list(&self, descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
        self.print_options(descriptor);
        let _ = self
            .term
            .write_line("  (comma-separated; blank for none/default)");
        let answer = self.read_line(&descriptor.label, &descriptor.help, &descriptor.default)?;
        if answer.is_empty() {
            return default_or_cancel(descriptor);
        }
        let mut chosen = Vec::new();
        for token in answer.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let option = descriptor
                .options
                .iter()
                .find(|o| o.value == token || o.label == token)
                .ok_or_else(|| {
                    ResolverError::Failed(format!("{:?} is not one of the offered options", token))
                })?;
            chosen.push(option.value.clone());
        }
        Ok(Value::List(chosen))
    }

    fn print_options(&self, descriptor: &InputDescriptor) {
        for option in &descriptor.options {
            let line = match &option.help {
                Some(help) => format!("  - {} ({})", option.label, help),
                None => format!("  - {}", option.label),
            };
            let _ = self.term.write_line(&style(line).dim().to_string());
        }
    }

    fn read_line(
        &self,
        label: &str,
        help: &Option<String>,
        default: &Option<Value>,
    ) -> Result<String, ResolverError> {
        if let Some(help) = help {
            let _ = self.term.write_line(&style(help).dim().to_string());
        }
        let suffix = match default.as_ref().and_then(|v| v.as_string().ok()) {
            Some(text) => format!(" [{text}]"),
            None => String::new(),
        };
        print!("{}{}: ", style(label).bold(), suffix);
        std::io::stdout()
            .flush()
            .map_err(|e| ResolverError::Failed(e.to_string()))?;

        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| ResolverError::Failed(e.to_string()))?;
        Ok(input.trim().to_string())
    }
}

fn default_or_cancel(descriptor: &InputDescriptor) -> Result<Value, ResolverError> {
    if let Some(default) = &descriptor.default {
        return Ok(default.clone());
    }
    if descriptor.optional {
        return Ok(Value::Null);
    }
    Err(ResolverError::Cancelled)
}
