// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! Reference CLI embedding `archetype_engine`.
//!
//! This crate is deliberately thin: it supplies the two collaborators the
//! engine needs from its environment — a filesystem-backed
//! [`fs::DiskFs`] and a terminal-backed [`prompt::TerminalResolver`] — and
//! two subcommands, `run` and `validate`. Scripts are JSON documents that
//! deserialize directly into the engine's node arena; this crate does not
//! parse any template or markup language of its own.
//!
//! # Usage
//!
//! ```bash
//! archetype run project.json --out ./generated
//! archetype validate project.json
//! ```

/// `run`/`validate` command implementations.
pub mod commands;
/// A filesystem-backed `VirtualFs`.
pub mod fs;
/// A `console`-backed terminal `InputResolver`.
pub mod prompt;
