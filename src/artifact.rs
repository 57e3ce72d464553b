//! Artifact path resolution and per-solution product listing.
//!
//! [`artifact_path`] is a pure function of one read project: it never touches
//! the filesystem, so listings work even before anything was built. The
//! driver functions below feed it: they seed a [`PropertyStore`] per
//! (project, configuration), read the project, and collect the resulting
//! output paths in solution order.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::project::{self, ProjectDescriptor};
use crate::property::PropertyStore;
use crate::solution::{self, Solution};

/// Managed `OutputType` value denoting a DLL.
const DOTNET_DLL_TYPE: &str = "Library";
/// Native `ConfigurationType` value denoting a DLL.
const NATIVE_DLL_TYPE: &str = "DynamicLibrary";

// ═══════════════════════════════════════════════════════════════════════════════
//  Path synthesis
// ═══════════════════════════════════════════════════════════════════════════════

fn first_non_empty<'a>(a: &'a str, b: &'a str) -> &'a str {
    if a.is_empty() { b } else { a }
}

/// Compute the output artifact path for one read project, relative to the
/// solution directory.
///
/// An explicit `OutputFile` property wins verbatim. Otherwise the filename
/// is synthesized: base = first non-empty of {`AssemblyName`, project file
/// stem}; extension = first non-empty of {`TargetExt`, `.dll` for library
/// output types (managed or native), `.exe` otherwise}; joined under the
/// first non-empty of {`OutputPath`, `OutDir`}. The result is always
/// non-empty — the seeded project name and `.exe` are final fallbacks.
pub fn artifact_path(project: &ProjectDescriptor) -> PathBuf {
    let store = project.store();

    let output_file = store.value("OutputFile");
    let relative = if !output_file.is_empty() {
        PathBuf::from(output_file)
    } else {
        let base = first_non_empty(project.assembly_name(), project.project_name());
        let ext = if !project.target_ext().is_empty() {
            project.target_ext()
        } else if project.output_type() == DOTNET_DLL_TYPE
            || project.configuration_type() == NATIVE_DLL_TYPE
        {
            ".dll"
        } else {
            ".exe"
        };
        let out_dir = first_non_empty(project.output_path(), project.out_dir());
        Path::new(out_dir).join(format!("{base}{ext}"))
    };

    Path::new(project.project_dir()).join(relative)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Driver
// ═══════════════════════════════════════════════════════════════════════════════

/// Derive `VCTargetsPath` from a resolved `devenv` path: the MSBuild VC
/// directory two levels up, taking the lexicographically greatest non-hidden
/// subdirectory as the toolset root.
pub fn vc_targets_path(devenv_com: &Path) -> std::io::Result<PathBuf> {
    let vc_root = devenv_com
        .parent()
        .unwrap_or(Path::new("."))
        .join("..")
        .join("..")
        .join("MSBuild")
        .join("Microsoft")
        .join("VC");

    let mut best: Option<String> = None;
    for entry in std::fs::read_dir(&vc_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if best.as_deref().is_none_or(|b| name.as_str() > b) {
            best = Some(name);
        }
    }
    Ok(vc_root.join(best.unwrap_or_default()))
}

/// Read every (project, configuration) pair of the solution, in solution
/// order.
///
/// Each pair gets its own seeded store: `Configuration` and `Platform` from
/// the configuration identifier (spaces stripped), `VCTargetsPath` when a
/// devenv path is known, `ProjectName` and `ProjectDir` from the project
/// path. A pair whose project read fails is logged and omitted; it never
/// aborts the rest of the solution.
pub fn project_descriptors(
    sln: &Solution,
    devenv_path: Option<&Path>,
    log: &mut dyn Write,
) -> Vec<(String, Vec<(String, ProjectDescriptor)>)> {
    let vc_targets = devenv_path
        .and_then(|p| vc_targets_path(p).ok())
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    let mut result = Vec::new();
    for (relative, _id) in sln.projects() {
        let path = solution::resolve_project_path(sln.path(), relative);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = path
            .parent()
            .map(|d| d.display().to_string())
            .unwrap_or_default();

        let mut per_config = Vec::new();
        for configuration in sln.configurations() {
            let (config, platform) = configuration
                .split_once('|')
                .unwrap_or((configuration.as_str(), ""));

            let mut store: PropertyStore = [
                ("Configuration", config.trim().replace(' ', "")),
                ("Platform", platform.trim().replace(' ', "")),
                ("VCTargetsPath", vc_targets.clone()),
                ("ProjectName", name.clone()),
                ("ProjectDir", dir.clone()),
            ]
            .into_iter()
            .collect();

            if let Err(err) = project::load_project(&mut store, &path, log) {
                let _ = writeln!(log, "{configuration}: {err}");
                continue;
            }
            per_config.push((
                configuration.clone(),
                ProjectDescriptor::new(relative.clone(), path.clone(), store),
            ));
        }
        if !per_config.is_empty() {
            result.push((relative.clone(), per_config));
        }
    }
    result
}

/// Resolve the artifact path of every (project, configuration) pair, in
/// solution order.
pub fn list_artifacts(
    sln: &Solution,
    devenv_path: Option<&Path>,
    log: &mut dyn Write,
) -> Vec<(String, Vec<(String, PathBuf)>)> {
    project_descriptors(sln, devenv_path, log)
        .into_iter()
        .map(|(project, configs)| {
            let artifacts = configs
                .into_iter()
                .map(|(config, descriptor)| (config, artifact_path(&descriptor)))
                .collect();
            (project, artifacts)
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
