//! Line-oriented parser for Visual Studio `.sln` solution files.
//!
//! The solution format is `Key = Value` lines and `Name … EndName` bracketed
//! sections around a leading comment header, for example:
//!
//! ```text
//! # Visual Studio 2017
//! VisualStudioVersion = 15.0.26430.4
//! MinimumVisualStudioVersion = 10.0.40219.1
//! Project("{GUID}") = "app", "app\app.vcxproj", "{GUID}"
//! EndProject
//! Global
//!     GlobalSection(SolutionConfigurationPlatforms) = preSolution
//!         Debug|Win32 = Debug|Win32
//!         Release|Win32 = Release|Win32
//!     EndGlobalSection
//! EndGlobal
//! ```
//!
//! Parsing is purely structural — no condition evaluation, no de-duplication.
//! Configuration and project order is file order, which downstream consumers
//! rely on for deterministic output.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
//  Version table
// ═══════════════════════════════════════════════════════════════════════════════

/// Internal `X.Y` version → marketing product year.
///
/// Shared with the toolchain resolver; kept as an ordered slice so nothing
/// downstream depends on map iteration order.
const INTERNAL_VERSION_TO_YEAR: &[(&str, &str)] = &[
    ("8.0", "2005"),
    ("9.0", "2008"),
    ("10.0", "2010"),
    ("11.0", "2012"),
    ("12.0", "2013"),
    ("14.0", "2015"),
    ("15.0", "2017"),
    ("16.0", "2019"),
];

/// Map an internal `X.Y` version to its product year, if known.
pub fn product_year(internal: &str) -> Option<&'static str> {
    INTERNAL_VERSION_TO_YEAR
        .iter()
        .find(|(v, _)| *v == internal)
        .map(|(_, y)| *y)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Solution
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed solution file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    path: PathBuf,
    comment_version: Option<String>,
    default_version: Option<String>,
    minimum_version: Option<String>,
    configurations: Vec<String>,
    projects: Vec<(String, String)>,
}

/// What the parser currently expects; pushed/popped on section markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    InProject,
    InConfigPlatforms,
}

impl Solution {
    /// Read and parse a solution file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| Error::Read { path: path.to_path_buf(), source })?;
        Ok(Self::parse(path, &text))
    }

    /// Parse solution text. `path` is recorded for diagnostics and for
    /// resolving the relative project paths later.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Self {
        let mut sln = Self {
            path: path.into(),
            comment_version: None,
            default_version: None,
            minimum_version: None,
            configurations: Vec::new(),
            projects: Vec::new(),
        };

        let mut modes = vec![Mode::Normal];
        for line in text.lines() {
            let first_token = line.split_whitespace().next().unwrap_or("");
            match modes.last().copied().unwrap_or(Mode::Normal) {
                Mode::Normal => sln.scan_normal_line(line, first_token, &mut modes),
                Mode::InProject => {
                    if first_token == "EndProject" {
                        modes.pop();
                    }
                }
                Mode::InConfigPlatforms => {
                    if first_token == "EndGlobalSection" {
                        modes.pop();
                    } else if let Some((key, _)) = line.split_once('=') {
                        sln.configurations.push(key.trim().to_string());
                    }
                }
            }
        }
        sln
    }

    fn scan_normal_line(&mut self, line: &str, first_token: &str, modes: &mut Vec<Mode>) {
        if let Some(year) = comment_version(line) {
            // First occurrence only.
            if self.comment_version.is_none() {
                self.comment_version = Some(year);
            }
        } else if let Some(version) = assignment(line, "VisualStudioVersion") {
            self.default_version = product_year(&version).map(str::to_string);
        } else if let Some(version) = assignment(line, "MinimumVisualStudioVersion") {
            self.minimum_version = product_year(&version).map(str::to_string);
        } else if let Some((path, id)) = project_line(line) {
            self.projects.push((path, id));
            modes.push(Mode::InProject);
        } else if first_token == "GlobalSection(SolutionConfigurationPlatforms)" {
            modes.push(Mode::InConfigPlatforms);
        }
    }

    /// The solution file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Configuration|Platform` identifiers, file order, duplicates kept.
    pub fn configurations(&self) -> &[String] {
        &self.configurations
    }

    /// `(relative project path, project-type GUID)` pairs, file order.
    pub fn projects(&self) -> &[(String, String)] {
        &self.projects
    }

    /// Product year from the leading `# Visual Studio <year>` comment.
    pub fn comment_version(&self) -> Option<&str> {
        self.comment_version.as_deref()
    }

    /// Product year mapped from `VisualStudioVersion`.
    pub fn default_version(&self) -> Option<&str> {
        self.default_version.as_deref()
    }

    /// Product year mapped from `MinimumVisualStudioVersion`.
    pub fn minimum_version(&self) -> Option<&str> {
        self.minimum_version.as_deref()
    }

    /// The year this solution declares overall: the explicit default when
    /// present, otherwise the comment header.
    pub fn version(&self) -> Option<&str> {
        self.default_version().or(self.comment_version())
    }

    /// The oldest year this solution tolerates: the explicit minimum when
    /// present, otherwise the smaller of default and comment.
    pub fn resolved_minimum_version(&self) -> Option<&str> {
        if let Some(min) = self.minimum_version() {
            return Some(min);
        }
        match (self.default_version(), self.comment_version()) {
            (Some(d), Some(c)) => Some(d.min(c)),
            (d, c) => d.or(c),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Line recognizers
// ═══════════════════════════════════════════════════════════════════════════════

/// `# Visual Studio <year>` → the year, which must be a four-digit `2xxx`
/// token ending the line.
///
/// Newer headers write the major version instead (`# Visual Studio 15`);
/// those carry no product year and yield `None`.
fn comment_version(line: &str) -> Option<String> {
    let rest = line.trim_start().strip_prefix('#')?;
    let mut tokens = rest.split_whitespace();
    if tokens.next()? != "Visual" || tokens.next()? != "Studio" {
        return None;
    }
    let year = tokens.next()?;
    let is_year = year.len() == 4
        && year.starts_with('2')
        && year.chars().all(|c| c.is_ascii_digit());
    (is_year && tokens.next().is_none()).then(|| year.to_string())
}

/// `<key> = X.Y[...]` → the leading `X.Y` of the value.
fn assignment(line: &str, key: &str) -> Option<String> {
    let rest = line.trim_start().strip_prefix(key)?;
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();

    let major: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let rest = rest[major.len()..].strip_prefix('.')?;
    let minor: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if major.is_empty() || minor.is_empty() {
        return None;
    }
    Some(format!("{major}.{minor}"))
}

/// `Project("{type}") = "name", "<path>", "<id>"` → `(path, id)`.
fn project_line(line: &str) -> Option<(String, String)> {
    let rest = line.trim_start().strip_prefix("Project(")?;
    let rest = &rest[rest.find(')')? + 1..];
    let rest = rest.trim_start().strip_prefix('=')?;

    let fields = quoted_fields(rest);
    match fields.as_slice() {
        [_name, path, id, ..] => Some((path.to_string(), id.to_string())),
        _ => None,
    }
}

/// All `"…"`-delimited substrings, left to right.
fn quoted_fields(s: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find('"') {
        let inner = &rest[start + 1..];
        let Some(end) = inner.find('"') else { break };
        fields.push(&inner[..end]);
        rest = &inner[end + 1..];
    }
    fields
}

/// Join a solution-relative project path under the solution's directory.
///
/// The solution format writes `\` separators regardless of platform.
pub(crate) fn resolve_project_path(solution_path: &Path, relative: &str) -> PathBuf {
    let base = solution_path.parent().unwrap_or(Path::new("."));
    if cfg!(windows) {
        base.join(relative)
    } else {
        base.join(relative.replace('\\', "/"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Discovery
// ═══════════════════════════════════════════════════════════════════════════════

/// Pick exactly one solution file.
///
/// Arguments ending in `.sln` (case-insensitive) win; otherwise `dir` is
/// listed for `.sln` entries, sorted by name so listing order never leaks
/// into the result. Zero candidates is [`Error::NoSolution`]; two or more is
/// [`Error::AmbiguousSolution`] with the full list.
pub fn discover(args: &[&str], dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<String> = args
        .iter()
        .filter(|a| a.to_lowercase().ends_with(".sln"))
        .map(|a| a.to_string())
        .collect();

    if candidates.is_empty() {
        let entries = std::fs::read_dir(dir)
            .map_err(|source| Error::Read { path: dir.to_path_buf(), source })?;
        for entry in entries {
            let entry = entry
                .map_err(|source| Error::Read { path: dir.to_path_buf(), source })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.to_lowercase().ends_with(".sln") {
                candidates.push(name);
            }
        }
        candidates.sort();
    }

    match candidates.len() {
        0 => Err(Error::NoSolution),
        1 => Ok(PathBuf::from(candidates.remove(0))),
        _ => Err(Error::AmbiguousSolution { candidates }),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
# Visual Studio 2017
VisualStudioVersion = 15.0.26430.4
MinimumVisualStudioVersion = 10.0.40219.1
Project("{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}") = "app", "app\app.vcxproj", "{AAAA0000-0000-0000-0000-000000000001}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "lib", "lib\lib.csproj", "{AAAA0000-0000-0000-0000-000000000002}"
	ProjectSection(ProjectDependencies) = postProject
		{AAAA0000-0000-0000-0000-000000000001} = {AAAA0000-0000-0000-0000-000000000001}
	EndProjectSection
EndProject
Global
	GlobalSection(SolutionConfigurationPlatforms) = preSolution
		Debug|Win32 = Debug|Win32
		Release|Win32 = Release|Win32
		Debug|Win32 = Debug|Win32
	EndGlobalSection
	GlobalSection(ProjectConfigurationPlatforms) = postSolution
		{AAAA0000-0000-0000-0000-000000000001}.Debug|Win32.ActiveCfg = Debug|Win32
	EndGlobalSection
EndGlobal
"#;

    #[test]
    fn configurations_preserve_order_and_duplicates() {
        let sln = Solution::parse("sample.sln", SAMPLE);
        assert_eq!(
            sln.configurations(),
            ["Debug|Win32", "Release|Win32", "Debug|Win32"]
        );
    }

    #[test]
    fn reparse_is_idempotent() {
        let first = Solution::parse("sample.sln", SAMPLE);
        let second = Solution::parse("sample.sln", SAMPLE);
        assert_eq!(first, second);
    }

    #[test]
    fn project_list_in_file_order() {
        let sln = Solution::parse("sample.sln", SAMPLE);
        let paths: Vec<&str> = sln.projects().iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, ["app\\app.vcxproj", "lib\\lib.csproj"]);
        assert_eq!(
            sln.projects()[1].1,
            "{AAAA0000-0000-0000-0000-000000000002}"
        );
    }

    #[test]
    fn project_section_lines_are_scanned_but_ignored() {
        // The ProjectSection inside the second project must not add
        // configurations or projects.
        let sln = Solution::parse("sample.sln", SAMPLE);
        assert_eq!(sln.projects().len(), 2);
        assert!(sln.configurations().iter().all(|c| c.contains('|')));
    }

    #[test]
    fn other_global_sections_are_ignored() {
        let sln = Solution::parse("sample.sln", SAMPLE);
        assert!(
            !sln.configurations().iter().any(|c| c.contains("ActiveCfg")),
            "ProjectConfigurationPlatforms leaked into the configuration list"
        );
    }

    #[test]
    fn version_hints() {
        let sln = Solution::parse("sample.sln", SAMPLE);
        assert_eq!(sln.comment_version(), Some("2017"));
        assert_eq!(sln.default_version(), Some("2017")); // 15.0
        assert_eq!(sln.minimum_version(), Some("2010")); // 10.0
        assert_eq!(sln.version(), Some("2017"));
        assert_eq!(sln.resolved_minimum_version(), Some("2010"));
    }

    #[test]
    fn comment_version_first_occurrence_wins() {
        let text = "# Visual Studio 2013\n# Visual Studio 2019\n";
        let sln = Solution::parse("x.sln", text);
        assert_eq!(sln.comment_version(), Some("2013"));
    }

    #[test]
    fn comment_version_requires_header_shape() {
        let sln = Solution::parse("x.sln", "# Visual Studio 2019\n");
        assert_eq!(sln.comment_version(), Some("2019"));
        // "# Visual Studio Version 16" puts a word where the year goes.
        let sln = Solution::parse("x.sln", "# Visual Studio Version 16\n");
        assert_eq!(sln.comment_version(), None);
        let sln = Solution::parse("x.sln", "# Not A Header\n");
        assert_eq!(sln.comment_version(), None);
    }

    #[test]
    fn comment_major_version_is_not_a_year() {
        // VS2017 writes the major version, not a product year; a "15" hint
        // would poison every lexical year comparison downstream.
        let sln = Solution::parse("x.sln", "# Visual Studio 15\n");
        assert_eq!(sln.comment_version(), None);
        assert_eq!(sln.version(), None);
        assert_eq!(sln.resolved_minimum_version(), None);
        // Trailing text after the year is not a header either.
        let sln = Solution::parse("x.sln", "# Visual Studio 2017 Preview\n");
        assert_eq!(sln.comment_version(), None);
    }

    #[test]
    fn minimum_falls_back_to_smaller_hint() {
        let text = "# Visual Studio 2013\nVisualStudioVersion = 15.0\n";
        let sln = Solution::parse("x.sln", text);
        assert_eq!(sln.resolved_minimum_version(), Some("2013"));
        assert_eq!(sln.version(), Some("2017"));
    }

    #[test]
    fn unknown_internal_version_maps_to_none() {
        let sln = Solution::parse("x.sln", "VisualStudioVersion = 99.0\n");
        assert_eq!(sln.default_version(), None);
    }

    #[test]
    fn product_year_table() {
        assert_eq!(product_year("15.0"), Some("2017"));
        assert_eq!(product_year("10.0"), Some("2010"));
        assert_eq!(product_year("7.1"), None);
    }

    // ── Discovery ────────────────────────────────────────────────────────

    #[test]
    fn discover_prefers_explicit_arguments() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("other.sln"), "").unwrap();
        let found = discover(&["picked.sln"], dir.path()).unwrap();
        assert_eq!(found, PathBuf::from("picked.sln"));
    }

    #[test]
    fn discover_lists_directory_when_no_arguments() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Only.SLN"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let found = discover(&[], dir.path()).unwrap();
        assert_eq!(found, PathBuf::from("Only.SLN"));
    }

    #[test]
    fn discover_reports_every_ambiguous_candidate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.sln"), "").unwrap();
        std::fs::write(dir.path().join("a.sln"), "").unwrap();
        let err = discover(&[], dir.path()).unwrap_err();
        match err {
            Error::AmbiguousSolution { candidates } => {
                assert_eq!(candidates, ["a.sln", "b.sln"]);
            }
            other => panic!("expected AmbiguousSolution, got {other:?}"),
        }
    }

    #[test]
    fn discover_empty_directory_is_no_solution() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(discover(&[], dir.path()), Err(Error::NoSolution)));
    }
}
