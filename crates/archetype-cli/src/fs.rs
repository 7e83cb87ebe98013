// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! A [`VirtualFs`] backed by the real filesystem.

use archetype_engine::VirtualFs;
use std::path::PathBuf;

/// Reads script documents relative to a fixed root directory.
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    /// Builds a filesystem rooted at `root` — every path the loader asks
    /// for is resolved relative to it.
    pub fn new(root: PathBuf) -> Self {
        DiskFs { root }
    }
}

impl VirtualFs for DiskFs {
    fn read_to_string(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.root.join(path))
    }
}
