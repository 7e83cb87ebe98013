// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `run`: drives a script to completion and prints its resulting plan.
//! - `validate`: runs the static validator only, with no prompting.

use crate::fs::DiskFs;
use crate::prompt::TerminalResolver;
use archetype_engine::controller::{Controller, ControllerConfig};
use archetype_engine::loader::ScriptLoader;
use archetype_engine::validator::{validate, DiagnosticCode};
use console::style;
use std::path::{Path, PathBuf};

const SCRIPT_CACHE_SIZE: usize = 64;

fn script_root_and_name(script_path: &Path) -> anyhow::Result<(PathBuf, String)> {
    let root = script_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = script_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("{script_path:?} has no file name"))?
        .to_string_lossy()
        .into_owned();
    Ok((root, name))
}

/// Runs `script_path` to completion, prompting at the terminal for any
/// undeclared input, and prints the resulting output plan.
pub fn run(script_path: &Path) -> anyhow::Result<()> {
    let (root, entry_name) = script_root_and_name(script_path)?;
    let fs = DiskFs::new(root);
    let loader = ScriptLoader::new(fs, SCRIPT_CACHE_SIZE);
    let resolver = TerminalResolver::new();
    let controller = Controller::new(&loader, &resolver, ControllerConfig::default());

    tracing::debug!(script = %entry_name, "starting run");
    let outcome = controller.run(&entry_name)?;

    for diagnostic in &outcome.diagnostics {
        println!(
            "{} {:?}: {}",
            style("warning:").yellow().bold(),
            diagnostic.code,
            diagnostic.message
        );
    }

    println!(
        "{} {} file(s), {} template(s), {} file set(s), {} template set(s), {} model key(s)",
        style("plan:").green().bold(),
        outcome.plan.files.len(),
        outcome.plan.templates.len(),
        outcome.plan.file_sets.len(),
        outcome.plan.template_sets.len(),
        outcome.plan.model.len(),
    );
    for file in &outcome.plan.files {
        println!("  copy   {} -> {}", file.source, file.target);
    }
    for template in &outcome.plan.templates {
        println!("  render {} -> {}", template.source, template.target);
    }
    for set in &outcome.plan.file_sets {
        println!("  copy   {}/** (set)", set.directory);
    }
    for set in &outcome.plan.template_sets {
        println!("  render {}/** (set)", set.directory);
    }

    Ok(())
}

/// Runs the static validator over `script_path` with no prompting, printing
/// every diagnostic and exiting non-zero if any is an error-level code.
pub fn validate_script(script_path: &Path) -> anyhow::Result<()> {
    let (root, entry_name) = script_root_and_name(script_path)?;
    let fs = DiskFs::new(root);
    let loader = ScriptLoader::new(fs, SCRIPT_CACHE_SIZE);
    let mut stack = Vec::new();
    let script = loader.load(&entry_name, &mut stack)?;

    let diagnostics = validate(&script);
    if diagnostics.is_empty() {
        println!("{}", style("no diagnostics").green());
        return Ok(());
    }

    let mut has_error = false;
    for diagnostic in &diagnostics {
        let is_error = matches!(
            diagnostic.code,
            DiagnosticCode::PresetUnresolved
                | DiagnosticCode::PresetTypeMismatch
                | DiagnosticCode::ExprUnresolvedVariable
                | DiagnosticCode::ExprEvalError
                | DiagnosticCode::InputAlreadyDeclared
                | DiagnosticCode::InputTypeMismatch
                | DiagnosticCode::InputNotInStep
                | DiagnosticCode::OptionValueAlreadyDeclared
        );
        has_error |= is_error;
        let label = if is_error {
            style("error:").red().bold()
        } else {
            style("warning:").yellow().bold()
        };
        println!("{} {:?}: {}", label, diagnostic.code, diagnostic.message);
    }

    if has_error {
        anyhow::bail!("{} diagnostic(s) failed validation", diagnostics.len());
    }
    Ok(())
}
