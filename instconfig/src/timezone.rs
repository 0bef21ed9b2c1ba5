use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use tracing::trace;

const TZIF_MAGIC: &[u8; 4] = b"TZif";

const DEFAULT_ZONEINFO_DIRS: &[&str] = &[
    "/usr/share/zoneinfo",
    "/usr/share/lib/zoneinfo",
    "/usr/lib/zoneinfo",
];

/// Answers whether a timezone name is known to some zone database.
///
/// `UTC` and `Local` are handled by the validator itself and never reach the
/// lookup.
pub trait ZoneLookup {
    fn contains(&self, name: &str) -> bool;
}

impl<F> ZoneLookup for F
where
    F: Fn(&str) -> bool,
{
    fn contains(&self, name: &str) -> bool {
        self(name)
    }
}

/// Zone lookup backed by the host's compiled tz database.
#[derive(Debug, Clone)]
pub struct SystemZones {
    roots: Vec<PathBuf>,
}

impl SystemZones {
    /// Searches `$ZONEINFO` first, then the usual install locations.
    pub fn new() -> Self {
        let mut roots = Vec::new();
        if let Some(dir) = std::env::var_os("ZONEINFO").filter(|d| !d.is_empty()) {
            roots.push(PathBuf::from(dir));
        }
        roots.extend(DEFAULT_ZONEINFO_DIRS.iter().map(PathBuf::from));
        Self { roots }
    }

    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl Default for SystemZones {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneLookup for SystemZones {
    fn contains(&self, name: &str) -> bool {
        if !is_relative_zone_name(name) {
            return false;
        }
        self.roots.iter().any(|root| {
            let candidate = root.join(name);
            let found = has_tzif_magic(&candidate);
            trace!("zone lookup {} -> {}", candidate.display(), found);
            found
        })
    }
}

// Zone names are plain relative paths like "Europe/Zurich".
fn is_relative_zone_name(name: &str) -> bool {
    if name.is_empty() || name.contains('\0') || name.starts_with('\\') {
        return false;
    }
    Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

fn has_tzif_magic(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| &magic == TZIF_MAGIC)
        .unwrap_or(false)
}
