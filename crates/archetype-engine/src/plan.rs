// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The output plan a controller run produces: the set of file copies,
//! template renders, and merged model values an external renderer is
//! handed afterward (`spec.md` §6, "Output plan").

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use thiserror::Error;
use std::collections::BTreeMap;

/// Errors raised while building or applying plan components.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A glob pattern in an `includes`/`excludes` block failed to compile.
    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidGlob {
        /// The offending pattern text.
        pattern: String,
        #[source]
        source: globset::Error,
    },
    /// A `regex` transformation step's pattern failed to compile.
    #[error("invalid regex pattern {pattern:?}: {source}")]
    InvalidRegex {
        /// The offending pattern text.
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// A `files`/`templates` directive named a transformation id that was
    /// never declared.
    #[error("undeclared transformation {0:?}")]
    UnknownTransformation(String),
}

/// One step of a named transformation, applied to a target path.
#[derive(Debug, Clone)]
pub enum TransformStep {
    /// A literal substring replacement.
    Replace {
        /// The substring to find.
        text: String,
        /// Its replacement.
        replacement: String,
    },
    /// A regular-expression replacement.
    Regex {
        /// The compiled pattern.
        pattern: Regex,
        /// The replacement template (supports `$1`-style captures).
        replacement: String,
    },
}

/// A named, ordered sequence of path rewrites, declared once and referenced
/// by id from `file`/`template`/`files`/`templates` directives.
#[derive(Debug, Clone)]
pub struct Transformation {
    /// This transformation's declared id.
    pub id: String,
    steps: Vec<TransformStep>,
}

impl Transformation {
    /// Builds a transformation from its declared steps, applied in the
    /// order given.
    pub fn new(id: String, steps: Vec<TransformStep>) -> Self {
        Transformation { id, steps }
    }

    /// Applies every step to `path`, in declaration order.
    pub fn apply(&self, path: &str) -> String {
        let mut current = path.to_string();
        for step in &self.steps {
            current = match step {
                TransformStep::Replace { text, replacement } => current.replace(text.as_str(), replacement),
                TransformStep::Regex { pattern, replacement } => {
                    pattern.replace_all(&current, replacement.as_str()).into_owned()
                }
            };
        }
        current
    }
}

/// Applies a comma-separated list of transformation ids, in the order
/// they're listed, looking each one up in `declared`.
pub fn apply_transformation_chain(
    path: &str,
    ids: &[String],
    declared: &BTreeMap<String, Transformation>,
) -> Result<String, PlanError> {
    let mut current = path.to_string();
    for id in ids {
        let transformation = declared
            .get(id)
            .ok_or_else(|| PlanError::UnknownTransformation(id.clone()))?;
        current = transformation.apply(&current);
    }
    Ok(current)
}

/// Compiles `includes`/`excludes` glob lists into a matcher: a file passes
/// when it matches at least one include pattern (or no includes were
/// declared) and no exclude pattern.
pub struct IncludeExcludeMatcher {
    includes: Option<GlobSet>,
    excludes: GlobSet,
}

impl IncludeExcludeMatcher {
    /// Builds a matcher from raw glob pattern strings.
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self, PlanError> {
        let includes = if includes.is_empty() {
            None
        } else {
            Some(build_glob_set(includes)?)
        };
        let excludes = build_glob_set(excludes)?;
        Ok(IncludeExcludeMatcher { includes, excludes })
    }

    /// Whether `relative_path` should be carried through this set.
    pub fn matches(&self, relative_path: &str) -> bool {
        if self.excludes.is_match(relative_path) {
            return false;
        }
        match &self.includes {
            Some(set) => set.is_match(relative_path),
            None => true,
        }
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, PlanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| PlanError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| PlanError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

/// A single file-copy directive.
#[derive(Debug, Clone)]
pub struct FileDirective {
    /// The template-relative source path.
    pub source: String,
    /// The rendered-output-relative target path.
    pub target: String,
}

/// A single template-render directive.
#[derive(Debug, Clone)]
pub struct TemplateDirective {
    /// The template-relative source path.
    pub source: String,
    /// The rendered-output-relative target path.
    pub target: String,
}

/// A directory-scoped set of file-copy directives.
///
/// Left declarative — `directory` plus glob patterns — rather than
/// expanded to concrete file lists: actually walking the directory is the
/// external renderer's job (`spec.md` §6, "Output plan"), not the engine's;
/// [`IncludeExcludeMatcher`] is exposed so a renderer can reuse the same
/// matching semantics the engine's own static checks assume.
#[derive(Debug, Clone)]
pub struct FileSetDirective {
    /// The source directory this set is scoped to.
    pub directory: String,
    /// Glob patterns a path must match at least one of.
    pub includes: Vec<String>,
    /// Glob patterns that exclude an otherwise-included path.
    pub excludes: Vec<String>,
    /// Transformation ids applied, in order, to every matched path.
    pub transformations: Vec<String>,
}

/// A directory-scoped set of template-render directives.
#[derive(Debug, Clone)]
pub struct TemplateSetDirective {
    /// The source directory this set is scoped to.
    pub directory: String,
    /// Glob patterns a path must match at least one of.
    pub includes: Vec<String>,
    /// Glob patterns that exclude an otherwise-included path.
    pub excludes: Vec<String>,
    /// Transformation ids applied, in order, to every matched path.
    pub transformations: Vec<String>,
}

/// One merged-model entry, keyed by its declared `key` and ordered by its
/// declared `order` (ties broken by declaration order).
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEntry {
    /// A scalar value.
    Value(String),
    /// A list of values, concatenated across every contributing directive.
    List(Vec<String>),
    /// A map of key/value pairs, merged across every contributing directive.
    Map(Vec<(String, String)>),
}

/// The complete output of a controller run, handed to an external renderer.
#[derive(Debug, Clone, Default)]
pub struct OutputPlan {
    /// Individual file-copy directives.
    pub files: Vec<FileDirective>,
    /// Individual template-render directives.
    pub templates: Vec<TemplateDirective>,
    /// Directory-scoped file-copy sets.
    pub file_sets: Vec<FileSetDirective>,
    /// Directory-scoped template-render sets.
    pub template_sets: Vec<TemplateSetDirective>,
    /// The merged model, keyed by declared `key`.
    pub model: BTreeMap<String, ModelEntry>,
}
