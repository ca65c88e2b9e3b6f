//! Project identity and the package-management project handle.
//!
//! Every tracked project carries three names with different guarantees:
//!
//! - **short name**: what the user sees; not unique across the solution
//! - **unique name**: host-assigned, unique within the solution
//! - **custom unique name**: derived from the project path, used to address
//!   a project whose short name collides with a sibling's
//!
//! All name handling in the solution core is case-insensitive, matching the
//! host environment's own comparison rules.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::host::HostProject;

/// Case-folds a name for map keys and comparisons.
pub(crate) fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// The three addressable names of a tracked project, plus its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectNames {
    short_name: String,
    unique_name: String,
    custom_unique_name: String,
    full_path: PathBuf,
}

impl ProjectNames {
    /// Builds an identity from explicit parts, deriving the custom unique
    /// name from the unique name.
    ///
    /// The custom unique name is the unique name with path separators
    /// normalized to `/` and the project-file extension stripped, so it
    /// stays human-meaningful: `lib/A.csproj` becomes `lib/A`, a top-level
    /// `A.csproj` becomes plain `A`.
    #[must_use]
    pub fn new(
        short_name: impl Into<String>,
        unique_name: impl Into<String>,
        full_path: impl Into<PathBuf>,
    ) -> Self {
        let unique_name = unique_name.into();
        let custom_unique_name = derive_custom_unique_name(&unique_name);
        Self {
            short_name: short_name.into(),
            unique_name,
            custom_unique_name,
            full_path: full_path.into(),
        }
    }

    /// Snapshots the identity of a host project.
    #[must_use]
    pub fn from_host(project: &dyn HostProject) -> Self {
        Self::new(
            project.short_name(),
            project.unique_name(),
            project.full_path(),
        )
    }

    /// Human-readable name, possibly shared with other projects.
    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Host-assigned identifier, unique within the solution.
    #[must_use]
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// Path-derived name used when the short name is ambiguous.
    #[must_use]
    pub fn custom_unique_name(&self) -> &str {
        &self.custom_unique_name
    }

    /// Filesystem location of the project file.
    #[must_use]
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Whether `name` addresses this project under any of its forms
    /// (short, unique, custom unique, or full path), case-insensitively.
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        let key = fold_name(name);
        key == fold_name(&self.short_name)
            || key == fold_name(&self.unique_name)
            || key == fold_name(&self.custom_unique_name)
            || key == fold_name(&self.full_path.to_string_lossy())
    }
}

fn derive_custom_unique_name(unique_name: &str) -> String {
    let normalized = unique_name.replace('\\', "/");
    match normalized.rfind('/') {
        Some(idx) => {
            let (dir, file) = normalized.split_at(idx + 1);
            format!("{dir}{}", strip_extension(file))
        }
        None => strip_extension(&normalized).to_string(),
    }
}

fn strip_extension(file: &str) -> &str {
    // A leading dot is a hidden-file marker, not an extension.
    match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    }
}

/// The package-management system's representative for one host project.
///
/// A handle pairs the identity snapshot taken when the project entered the
/// cache with the live host project, so capability queries (references) go
/// to current host state while addressing stays stable.
#[derive(Clone)]
pub struct ProjectHandle {
    names: ProjectNames,
    host: Arc<dyn HostProject>,
}

impl ProjectHandle {
    /// Wraps a host project, snapshotting its identity.
    #[must_use]
    pub fn new(host: Arc<dyn HostProject>) -> Self {
        let names = ProjectNames::from_host(host.as_ref());
        Self { names, host }
    }

    /// The identity snapshot this handle was cached under.
    #[must_use]
    pub fn names(&self) -> &ProjectNames {
        &self.names
    }

    /// Shorthand for [`ProjectNames::short_name`].
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.names.short_name()
    }

    /// Shorthand for [`ProjectNames::unique_name`].
    #[must_use]
    pub fn unique_name(&self) -> &str {
        self.names.unique_name()
    }

    /// Shorthand for [`ProjectNames::custom_unique_name`].
    #[must_use]
    pub fn custom_unique_name(&self) -> &str {
        self.names.custom_unique_name()
    }

    /// The live host project behind this handle.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn HostProject> {
        &self.host
    }

    /// Whether the underlying project type can reference other projects.
    #[must_use]
    pub fn supports_references(&self) -> bool {
        self.host.supports_references()
    }

    /// Current forward references of the underlying project.
    #[must_use]
    pub fn referenced_projects(&self) -> Vec<Arc<dyn HostProject>> {
        self.host.referenced_projects()
    }
}

impl fmt::Debug for ProjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectHandle")
            .field("unique_name", &self.names.unique_name)
            .field("short_name", &self.names.short_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ProjectHandle {
    fn eq(&self, other: &Self) -> bool {
        fold_name(&self.names.unique_name) == fold_name(&other.names.unique_name)
    }
}

impl Eq for ProjectHandle {}
