//! Toolchain resolution: turn a solution's version hints and its projects'
//! declared requirements into a usable `devenv` executable path.
//!
//! Probe priority, in strict order:
//!
//! 1. An explicit caller override naming one product year. If that exact
//!    probe fails, resolution fails immediately — the caller expressed
//!    certainty, so falling back would quietly build with the wrong tools.
//! 2. The strictest required year, computed from every project's
//!    `ToolsVersion` and `PlatformToolset` plus the solution's minimum hint.
//! 3. The generic search: the locator's "newest installed" probe, then the
//!    per-year probes — newest to oldest by default, oldest to newest when
//!    ascending search is requested — skipping years below the requirement.
//! 4. Last resort: the solution's own recorded default year, then its
//!    minimum year.
//!
//! All tables are ordered slices and the probe sequence is fully specified,
//! so identical inputs always select the same candidate.

use std::cmp::Ordering;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::locator::{self, ProbeError};
use crate::project;
use crate::solution::{self, Solution};

// ═══════════════════════════════════════════════════════════════════════════════
//  Mapping tables
// ═══════════════════════════════════════════════════════════════════════════════

/// Project `ToolsVersion` attribute → product year.
const TOOLS_VERSION_TO_YEAR: &[(&str, &str)] = &[
    ("4.0", "2010"),
    ("12.0", "2013"),
    ("14.0", "2015"),
    ("15.0", "2017"),
];

/// `PlatformToolset` value → product year.
///
/// `v140` maps to 2017, not 2015: VS2017 ships the v140 toolset, and
/// resolving the newer product keeps mixed v140/v141 solutions on one
/// toolchain.
const TOOLSET_TO_YEAR: &[(&str, &str)] = &[
    ("v90", "2008"),
    ("v100", "2010"),
    ("v120", "2013"),
    ("v120_xp", "2013"),
    ("v140", "2017"),
    ("v141", "2017"),
    ("v141_xp", "2017"),
    ("v142", "2019"),
];

/// How one historical product year is probed.
#[derive(Debug, Clone, Copy)]
enum ProbeSource {
    /// Legacy `VSnnnCOMNTOOLS` environment variable.
    Env(&'static str),
    /// Locator invocation with a `-version` range.
    Locator(&'static str),
}

/// Per-year probes, oldest first.
const YEAR_PROBES: &[(&str, ProbeSource)] = &[
    ("2010", ProbeSource::Env("VS100COMNTOOLS")),
    ("2013", ProbeSource::Env("VS120COMNTOOLS")),
    ("2015", ProbeSource::Env("VS140COMNTOOLS")),
    ("2017", ProbeSource::Locator("[15.0,16.0)")),
    ("2019", ProbeSource::Locator("[16.0,17.0)")),
];

fn tools_version_year(version: &str) -> Option<&'static str> {
    TOOLS_VERSION_TO_YEAR
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, y)| *y)
}

fn toolset_year(toolset: &str) -> Option<&'static str> {
    TOOLSET_TO_YEAR
        .iter()
        .find(|(t, _)| *t == toolset)
        .map(|(_, y)| *y)
}

fn probe_exists(year: &str) -> bool {
    YEAR_PROBES.iter().any(|(y, _)| *y == year)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Version comparison
// ═══════════════════════════════════════════════════════════════════════════════

/// Compare dot-separated integer tuples numerically: `"10.0"` sorts after
/// `"9.0"`, which a plain lexical compare gets wrong. Missing components
/// count as zero; non-numeric components count as zero.
pub fn compare_dotted(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| -> Vec<u64> {
        s.split('.')
            .map(|part| part.trim().parse().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let (x, y) = (
            a.get(i).copied().unwrap_or(0),
            b.get(i).copied().unwrap_or(0),
        );
        match x.cmp(&y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// Lexical maximum over four-digit year strings.
fn max_year(current: Option<String>, candidate: &str) -> Option<String> {
    match current {
        Some(cur) if cur.as_str() >= candidate => Some(cur),
        _ => Some(candidate.to_string()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Requirement computation
// ═══════════════════════════════════════════════════════════════════════════════

/// The strictest product year the solution's projects demand.
///
/// The largest `ToolsVersion` across all projects (numeric tuple compare) is
/// mapped through its table; every `PlatformToolset` is mapped through its
/// table; the solution's minimum hint joins in; the maximum year wins.
/// Unreadable project files are logged and skipped.
pub fn required_year(sln: &Solution, log: &mut dyn Write) -> Option<String> {
    let mut max_tools_version: Option<String> = None;
    let mut required: Option<String> = None;

    for (relative, _id) in sln.projects() {
        let path = solution::resolve_project_path(sln.path(), relative);
        let requirements = match project::project_requirements(&path) {
            Ok(r) => r,
            Err(err) => {
                let _ = writeln!(log, "{err}");
                continue;
            }
        };

        if let Some(tv) = requirements.tools_version {
            let larger = max_tools_version
                .as_deref()
                .is_none_or(|cur| compare_dotted(&tv, cur) == Ordering::Greater);
            if larger {
                max_tools_version = Some(tv);
            }
        }
        for toolset in &requirements.platform_toolsets {
            if let Some(year) = toolset_year(toolset) {
                required = max_year(required, year);
            }
        }
    }

    if let Some(tv) = &max_tools_version {
        let _ = writeln!(log, "{}: required ToolsVersion is '{tv}'.", sln.path().display());
        if let Some(year) = tools_version_year(tv) {
            required = max_year(required, year);
        }
    }
    if let Some(min) = sln.resolved_minimum_version() {
        required = max_year(required, min);
    }
    required
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Resolution
// ═══════════════════════════════════════════════════════════════════════════════

/// Caller preferences threaded through resolution. No global flags.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Force exactly this product year; its failure ends resolution.
    pub override_year: Option<String>,
    /// Search oldest-to-newest instead of the default newest-to-oldest.
    pub ascending: bool,
}

/// One probe invocation the resolver wants performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeRequest<'a> {
    /// "Whatever is newest installed."
    Latest,
    /// One specific product year.
    Year(&'a str),
}

/// A resolved executable, tagged with the product year it represents
/// (`"latest"` when the newest-installed probe matched).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainCandidate {
    pub year: String,
    pub path: PathBuf,
}

/// Resolve a toolchain using the real environment and locator process.
pub fn resolve(
    sln: &Solution,
    opts: &ResolveOptions,
    log: &mut dyn Write,
) -> Result<ToolchainCandidate> {
    resolve_with(sln, opts, default_probe, log)
}

/// Perform one [`ProbeRequest`] against the real environment.
pub fn default_probe(request: &ProbeRequest) -> std::result::Result<PathBuf, ProbeError> {
    match request {
        ProbeRequest::Latest => locator::locator_product_path(&["-latest"]),
        ProbeRequest::Year(year) => {
            let source = YEAR_PROBES
                .iter()
                .find(|(y, _)| y == year)
                .map(|(_, s)| *s)
                .ok_or_else(|| ProbeError::UnknownYear { year: year.to_string() })?;
            match source {
                ProbeSource::Env(name) => locator::devenv_from_env(name),
                ProbeSource::Locator(range) => {
                    locator::locator_product_path(&["-version", range])
                }
            }
        }
    }
}

/// Resolve a toolchain with an injected probe, exercising the priority
/// order without touching the environment.
pub fn resolve_with<F>(
    sln: &Solution,
    opts: &ResolveOptions,
    mut probe: F,
    log: &mut dyn Write,
) -> Result<ToolchainCandidate>
where
    F: FnMut(&ProbeRequest) -> std::result::Result<PathBuf, ProbeError>,
{
    let exhausted = || Error::ResolutionExhausted {
        solution: sln.path().display().to_string(),
    };

    // 1. Explicit override: no fallback on failure.
    if let Some(year) = &opts.override_year {
        return match probe(&ProbeRequest::Year(year)) {
            Ok(path) => Ok(ToolchainCandidate { year: year.clone(), path }),
            Err(err) => {
                let _ = writeln!(log, "Visual Studio {year}: {err}");
                Err(exhausted())
            }
        };
    }

    // 2. Strictest required year.
    let required = required_year(sln, log);
    if let Some(year) = required.as_deref() {
        if probe_exists(year) {
            let _ = writeln!(
                log,
                "{}: try to use Visual Studio {year}.",
                sln.path().display()
            );
            match probe(&ProbeRequest::Year(year)) {
                Ok(path) => {
                    return Ok(ToolchainCandidate { year: year.to_string(), path });
                }
                Err(err) => {
                    let _ = writeln!(log, "Visual Studio {year}: {err}");
                    let _ = writeln!(log, "look for other versions of Visual Studio.");
                }
            }
        }
    }

    // 3. Generic search: newest installed, then the year list.
    match probe(&ProbeRequest::Latest) {
        Ok(path) => {
            let _ = writeln!(log, "found '{}'", path.display());
            return Ok(ToolchainCandidate { year: "latest".to_string(), path });
        }
        Err(err) => {
            let _ = writeln!(log, "latest: {err}");
        }
    }

    let years = || YEAR_PROBES.iter().map(|(y, _)| *y);
    let ordered: Vec<&str> = if opts.ascending {
        years().collect()
    } else {
        years().rev().collect()
    };
    for year in ordered {
        if let Some(min) = required.as_deref() {
            if year < min {
                continue;
            }
        }
        match probe(&ProbeRequest::Year(year)) {
            Ok(path) => {
                let _ = writeln!(log, "found '{}'", path.display());
                return Ok(ToolchainCandidate { year: year.to_string(), path });
            }
            Err(err) => {
                let _ = writeln!(log, "Visual Studio {year}: {err}");
            }
        }
    }

    // 4. The solution's own recorded default, then its recorded minimum.
    for year in [sln.default_version(), sln.minimum_version()]
        .into_iter()
        .flatten()
    {
        if !probe_exists(year) {
            continue;
        }
        let _ = writeln!(
            log,
            "{}: fall back to Visual Studio {year} from the solution file.",
            sln.path().display()
        );
        if let Ok(path) = probe(&ProbeRequest::Year(year)) {
            return Ok(ToolchainCandidate { year: year.to_string(), path });
        }
    }

    Err(exhausted())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
