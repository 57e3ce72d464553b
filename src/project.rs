//! Conditional reader for `.vcxproj` / `.csproj` / `.vbproj` files.
//!
//! A project file is read once per (project, configuration) pair into a
//! [`PropertyStore`] that was seeded with `Configuration`, `Platform`, and
//! the toolchain-root properties. The reader walks the XML depth-first in
//! document order:
//!
//! - `<ProjectConfiguration Include="…">` subtrees whose identity does not
//!   equal `"{Configuration}|{Platform}"` are skipped without being visited.
//! - Elements with a `Condition` attribute are skipped when the condition
//!   evaluates to false. A condition that fails to *parse* is logged and the
//!   subtree is kept, so one malformed attribute cannot abort a whole file.
//! - `<Import Project="…">` loads the referenced file into the same store
//!   before sibling processing continues; failures are logged, non-fatal.
//! - The leading text of any element becomes a property keyed by the element
//!   local name. Later writes win, in document order, across imports.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::condition;
use crate::error::{Error, Result};
use crate::property::PropertyStore;

// ═══════════════════════════════════════════════════════════════════════════════
//  Reading
// ═══════════════════════════════════════════════════════════════════════════════

/// Load a project file from disk into `store`.
///
/// An unreadable file or malformed XML aborts only this file's read; the
/// caller decides whether one failed (project, configuration) pair is
/// omitted or fatal. Warnings (missing properties, unparsable conditions,
/// failed imports) go to `log`.
pub fn load_project(
    store: &mut PropertyStore,
    path: &Path,
    log: &mut dyn Write,
) -> Result<()> {
    let mut loading = HashSet::new();
    load_guarded(store, path, &mut loading, log)
}

/// Read project XML from a string into `store`.
///
/// Imports are still resolved against the filesystem using the expanded
/// `Project` attribute as-is.
pub fn read_project(
    store: &mut PropertyStore,
    source: &str,
    log: &mut dyn Write,
) -> Result<()> {
    let mut loading = HashSet::new();
    read_source(store, source, None, &mut loading, log)
}

/// `load_project` with the set of files currently being loaded threaded
/// through, so recursive imports can detect cycles.
fn load_guarded(
    store: &mut PropertyStore,
    path: &Path,
    loading: &mut HashSet<PathBuf>,
    log: &mut dyn Write,
) -> Result<()> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !loading.insert(canonical.clone()) {
        return Err(Error::ImportCycle { path: canonical });
    }

    let result = std::fs::read_to_string(path)
        .map_err(|source| Error::Read { path: path.to_path_buf(), source })
        .and_then(|source| {
            let _ = writeln!(log, "*** start reading project `{}` ***", path.display());
            let rc = read_source(store, &source, Some(path), loading, log);
            let _ = writeln!(log, "*** end reading project `{}` ***", path.display());
            rc
        });

    // A file that finished loading may legally be imported again later;
    // only files still on the load path count as a cycle.
    loading.remove(&canonical);
    result
}

fn read_source(
    store: &mut PropertyStore,
    source: &str,
    path: Option<&Path>,
    loading: &mut HashSet<PathBuf>,
    log: &mut dyn Write,
) -> Result<()> {
    let doc = roxmltree::Document::parse(source).map_err(|source| Error::Xml {
        path: path.map(Path::to_path_buf).unwrap_or_default(),
        source,
    })?;

    for child in doc.root().children().filter(|n| n.is_element()) {
        visit_element(child, store, loading, log);
    }
    Ok(())
}

/// Process one element and, unless it is skipped, its subtree.
fn visit_element(
    element: roxmltree::Node,
    store: &mut PropertyStore,
    loading: &mut HashSet<PathBuf>,
    log: &mut dyn Write,
) {
    let tag = element.tag_name().name();

    // Configuration selector: identity must match the seeded pair exactly.
    if tag == "ProjectConfiguration" {
        let target = format!(
            "{}|{}",
            store.value("Configuration").trim(),
            store.value("Platform").trim()
        );
        if let Some(include) = element.attribute("Include") {
            if include != target {
                return;
            }
        }
    }

    if let Some(raw) = element.attribute("Condition") {
        let expanded = store.expand(raw, |name| {
            let _ = writeln!(log, "Condition: variable $({name}) not found.");
            String::new()
        });
        match condition::evaluate_text(&expanded) {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                // Keep the subtree: a malformed condition must not take a
                // whole file down with it.
                let _ = writeln!(log, "{err}");
            }
        }
    }

    if tag == "Import" {
        if let Some(raw) = element.attribute("Project") {
            let target = store.expand(raw, |name| {
                let _ = writeln!(log, "Import: variable $({name}) not found.");
                String::new()
            });
            if let Err(err) = load_guarded(store, Path::new(&target), loading, log) {
                let _ = writeln!(log, "Import: `{target}` could not be loaded: {err}");
            }
        }
    }

    // Leading text becomes a property keyed by the element's local name,
    // expanded through the current store so later elements (including ones
    // introduced by an import) see earlier values.
    if let Some(text) = element
        .children()
        .next()
        .filter(roxmltree::Node::is_text)
        .and_then(|n| n.text())
    {
        let value = store.expand(text.trim(), |name| {
            let _ = writeln!(log, "$({name}) not found.");
            String::new()
        });
        store.set(tag, value);
    }

    for child in element.children().filter(|n| n.is_element()) {
        visit_element(child, store, loading, log);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ProjectDescriptor
// ═══════════════════════════════════════════════════════════════════════════════

/// A fully-read project for one (project, configuration) pair.
///
/// Owns the populated [`PropertyStore`]; the accessors expose the handful of
/// properties the artifact resolver and listings care about. Built fresh for
/// every configuration — never cached across configurations, since the store
/// contents depend on the seeded `Configuration`/`Platform`.
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    relative_path: String,
    path: PathBuf,
    store: PropertyStore,
}

impl ProjectDescriptor {
    /// Wrap a populated store. `relative_path` is the project path as it
    /// appears in the solution; `path` is the resolved on-disk location.
    pub fn new(
        relative_path: impl Into<String>,
        path: impl Into<PathBuf>,
        store: PropertyStore,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            path: path.into(),
            store,
        }
    }

    /// The underlying property store, read-only.
    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    /// The project path as written in the solution file.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// The resolved on-disk project file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<AssemblyName>` (managed projects).
    pub fn assembly_name(&self) -> &str {
        self.store.value("AssemblyName")
    }

    /// `<OutputType>` — `Library` denotes a managed DLL.
    pub fn output_type(&self) -> &str {
        self.store.value("OutputType")
    }

    /// `<ConfigurationType>` — `DynamicLibrary` denotes a native DLL.
    pub fn configuration_type(&self) -> &str {
        self.store.value("ConfigurationType")
    }

    /// `<TargetExt>`, when the project spells its extension out.
    pub fn target_ext(&self) -> &str {
        self.store.value("TargetExt")
    }

    /// `<OutputPath>` (managed projects).
    pub fn output_path(&self) -> &str {
        self.store.value("OutputPath")
    }

    /// `<OutDir>` (native projects).
    pub fn out_dir(&self) -> &str {
        self.store.value("OutDir")
    }

    /// `<RootNamespace>`.
    pub fn root_namespace(&self) -> &str {
        self.store.value("RootNamespace")
    }

    /// The seeded project base name (file stem of the project file).
    pub fn project_name(&self) -> &str {
        self.store.value("ProjectName")
    }

    /// The seeded project directory.
    pub fn project_dir(&self) -> &str {
        self.store.value("ProjectDir")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Toolchain requirements
// ═══════════════════════════════════════════════════════════════════════════════

/// The toolchain-generation tokens a single project file declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectRequirements {
    /// The `ToolsVersion` attribute of the root `<Project>` element.
    pub tools_version: Option<String>,
    /// Every `<PlatformToolset>` value in the file, in document order.
    pub platform_toolsets: Vec<String>,
}

/// Shallow scan of a project file for its `ToolsVersion` and
/// `PlatformToolset` declarations.
///
/// No condition evaluation: a toolset mentioned under any configuration
/// counts towards the requirement.
pub fn project_requirements(path: &Path) -> Result<ProjectRequirements> {
    let source = std::fs::read_to_string(path)
        .map_err(|source| Error::Read { path: path.to_path_buf(), source })?;
    let doc = roxmltree::Document::parse(&source).map_err(|source| Error::Xml {
        path: path.to_path_buf(),
        source,
    })?;

    let tools_version = doc
        .root_element()
        .attribute("ToolsVersion")
        .map(str::to_string);

    let platform_toolsets = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "PlatformToolset")
        .filter_map(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ProjectRequirements { tools_version, platform_toolsets })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(pairs: &[(&str, &str)]) -> PropertyStore {
        pairs.iter().copied().collect()
    }

    #[test]
    fn conditioned_group_selects_matching_platform() {
        let xml = r#"
            <Project>
                <PropertyGroup Condition="'$(Platform)'=='x64'">
                    <Hoge>x64Hoge</Hoge>
                </PropertyGroup>
                <PropertyGroup Condition="'$(Platform)'=='Win32'">
                    <Hoge>Win32Hoge</Hoge>
                </PropertyGroup>
            </Project>
        "#;
        let mut store = seeded(&[("Platform", "Win32")]);
        read_project(&mut store, xml, &mut std::io::sink()).unwrap();
        assert_eq!(store.get("Hoge"), Some("Win32Hoge"));
    }

    #[test]
    fn skipped_subtree_is_never_visited() {
        // The skipped branch contains an Import of a file that does not
        // exist; visiting it would leave a trace in the log.
        let xml = r#"
            <Project>
                <PropertyGroup Condition="'$(Platform)'=='x64'">
                    <Import Project="no-such-import-xyz.props" />
                    <Hoge>x64Hoge</Hoge>
                </PropertyGroup>
            </Project>
        "#;
        let mut store = seeded(&[("Platform", "Win32")]);
        let mut log = Vec::new();
        read_project(&mut store, xml, &mut log).unwrap();
        assert_eq!(store.get("Hoge"), None);
        assert!(log.is_empty(), "skipped subtree produced log output");
    }

    #[test]
    fn project_configuration_selector() {
        let xml = r#"
            <Project>
                <ItemGroup>
                    <ProjectConfiguration Include="Debug|Win32">
                        <Configuration>Debug</Configuration>
                        <Marker>debug-win32</Marker>
                    </ProjectConfiguration>
                    <ProjectConfiguration Include="Release|Win32">
                        <Marker>release-win32</Marker>
                    </ProjectConfiguration>
                </ItemGroup>
            </Project>
        "#;
        let mut store = seeded(&[("Configuration", "Debug"), ("Platform", "Win32")]);
        read_project(&mut store, xml, &mut std::io::sink()).unwrap();
        assert_eq!(store.get("Marker"), Some("debug-win32"));
    }

    #[test]
    fn unparsable_condition_keeps_subtree() {
        // Upstream implementations disagree on keep-vs-skip here; this
        // reader keeps the subtree, on the assumption that a malformed
        // condition should not silently drop properties.
        let xml = r#"
            <Project>
                <PropertyGroup Condition="'$(Platform)' equals 'Win32'">
                    <Kept>yes</Kept>
                </PropertyGroup>
            </Project>
        "#;
        let mut store = seeded(&[("Platform", "Win32")]);
        let mut log = Vec::new();
        read_project(&mut store, xml, &mut log).unwrap();
        assert_eq!(store.get("Kept"), Some("yes"));
        let logged = String::from_utf8(log).unwrap();
        assert!(logged.contains("could not be parsed"), "log: {logged}");
    }

    #[test]
    fn leaf_text_expands_through_current_store() {
        let xml = r#"
            <Project>
                <PropertyGroup>
                    <OutDir>bin\$(Configuration)\</OutDir>
                    <Nested>$(OutDir)obj</Nested>
                </PropertyGroup>
            </Project>
        "#;
        let mut store = seeded(&[("Configuration", "Release"), ("Platform", "Win32")]);
        read_project(&mut store, xml, &mut std::io::sink()).unwrap();
        assert_eq!(store.get("OutDir"), Some("bin\\Release\\"));
        assert_eq!(store.get("Nested"), Some("bin\\Release\\obj"));
    }

    #[test]
    fn later_writes_override_earlier_ones() {
        let xml = r#"
            <Project>
                <PropertyGroup><A>first</A></PropertyGroup>
                <PropertyGroup><A>second</A></PropertyGroup>
            </Project>
        "#;
        let mut store = PropertyStore::new();
        read_project(&mut store, xml, &mut std::io::sink()).unwrap();
        assert_eq!(store.get("A"), Some("second"));
    }

    #[test]
    fn import_loads_into_same_store() {
        let dir = tempfile::tempdir().unwrap();
        let imported = dir.path().join("common.props");
        std::fs::write(
            &imported,
            r#"<Project><PropertyGroup><FromImport>v1</FromImport></PropertyGroup></Project>"#,
        )
        .unwrap();

        let xml = format!(
            r#"
            <Project>
                <PropertyGroup><Dir>{}</Dir></PropertyGroup>
                <Import Project="$(Dir)/common.props" />
                <PropertyGroup><AfterImport>$(FromImport)-seen</AfterImport></PropertyGroup>
            </Project>
            "#,
            dir.path().display()
        );
        let mut store = PropertyStore::new();
        read_project(&mut store, &xml, &mut std::io::sink()).unwrap();
        assert_eq!(store.get("FromImport"), Some("v1"));
        // Elements after the import see the imported values.
        assert_eq!(store.get("AfterImport"), Some("v1-seen"));
    }

    #[test]
    fn failed_import_is_logged_and_non_fatal() {
        let xml = r#"
            <Project>
                <Import Project="missing-import-abc.props" />
                <PropertyGroup><Survivor>yes</Survivor></PropertyGroup>
            </Project>
        "#;
        let mut store = PropertyStore::new();
        let mut log = Vec::new();
        read_project(&mut store, xml, &mut log).unwrap();
        assert_eq!(store.get("Survivor"), Some("yes"));
        let logged = String::from_utf8(log).unwrap();
        assert!(logged.contains("missing-import-abc.props"), "log: {logged}");
    }

    #[test]
    fn import_cycle_is_detected_not_looped() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.props");
        let b = dir.path().join("b.props");
        std::fs::write(
            &a,
            format!(
                r#"<Project><PropertyGroup><FromA>1</FromA></PropertyGroup><Import Project="{}" /></Project>"#,
                b.display()
            ),
        )
        .unwrap();
        std::fs::write(
            &b,
            format!(
                r#"<Project><PropertyGroup><FromB>1</FromB></PropertyGroup><Import Project="{}" /></Project>"#,
                a.display()
            ),
        )
        .unwrap();

        let mut store = PropertyStore::new();
        let mut log = Vec::new();
        load_project(&mut store, &a, &mut log).unwrap();
        assert_eq!(store.get("FromA"), Some("1"));
        assert_eq!(store.get("FromB"), Some("1"));
        let logged = String::from_utf8(log).unwrap();
        assert!(logged.contains("import cycle"), "log: {logged}");
    }

    #[test]
    fn repeated_import_of_a_finished_file_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("shared.props");
        std::fs::write(
            &shared,
            r#"<Project><PropertyGroup><Shared>1</Shared></PropertyGroup></Project>"#,
        )
        .unwrap();

        let xml = format!(
            r#"<Project><Import Project="{p}" /><Import Project="{p}" /></Project>"#,
            p = shared.display()
        );
        let mut store = PropertyStore::new();
        let mut log = Vec::new();
        read_project(&mut store, &xml, &mut log).unwrap();
        assert_eq!(store.get("Shared"), Some("1"));
        let logged = String::from_utf8(log).unwrap();
        assert!(!logged.contains("import cycle"), "log: {logged}");
    }

    #[test]
    fn malformed_xml_aborts_only_this_read() {
        let mut store = PropertyStore::new();
        let err = read_project(&mut store, "<Project><Open>", &mut std::io::sink())
            .unwrap_err();
        assert!(matches!(err, Error::Xml { .. }));
    }

    #[test]
    fn requirements_scan_reads_tools_version_and_toolsets() {
        let dir = tempfile::tempdir().unwrap();
        let proj = dir.path().join("native.vcxproj");
        std::fs::write(
            &proj,
            r#"
            <Project ToolsVersion="15.0">
                <PropertyGroup Condition="'$(Configuration)'=='Debug'">
                    <PlatformToolset>v141</PlatformToolset>
                </PropertyGroup>
                <PropertyGroup Condition="'$(Configuration)'=='Release'">
                    <PlatformToolset>v120</PlatformToolset>
                </PropertyGroup>
            </Project>
            "#,
        )
        .unwrap();

        let req = project_requirements(&proj).unwrap();
        assert_eq!(req.tools_version.as_deref(), Some("15.0"));
        assert_eq!(req.platform_toolsets, ["v141", "v120"]);
    }
}
