use std::path::{Path, PathBuf};

use pipeworks_models::MountAliases;

/// Pure translation between "input as received" and "path on this host".
///
/// Recognizes configured mount-point aliases (container-style `/data/...`
/// paths mapping to a host-style directory under the project root),
/// normalizes separators to forward-slash for storage, and resolves
/// relative paths against the project root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    project_root: PathBuf,
    aliases: MountAliases,
}

impl PathResolver {
    pub fn new(project_root: impl Into<PathBuf>, aliases: MountAliases) -> Self {
        Self { project_root: project_root.into(), aliases }
    }

    /// Resolve an as-received path (possibly container-style, possibly
    /// relative) to an absolute host path.
    pub fn resolve_host_path(&self, input: &str) -> PathBuf {
        for (alias, host_dir) in &self.aliases.0 {
            if let Some(suffix) = input.strip_prefix(alias.as_str()) {
                return Path::new(host_dir).join(suffix.trim_start_matches('/'));
            }
        }
        let candidate = Path::new(input);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.project_root.join(candidate)
        }
    }

    /// Portable, forward-slash form used when persisting a path to the
    /// Registry, relative to the project root when possible.
    pub fn normalize_for_storage(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.project_root).unwrap_or(path);
        relative.to_string_lossy().replace('\\', "/")
    }

    /// The bare filename (no extension) of a path, used as the matching key
    /// for the `find_by_filename` fallback lookup the Registry performs.
    pub fn filename_stem(path: &str) -> Option<String> {
        Path::new(path).file_stem().map(|s| s.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn resolve_host_path_applies_configured_alias() {
        let aliases = MountAliases(HashMap::from([("/data".to_string(), "/srv/pipeworks/data".to_string())]));
        let resolver = PathResolver::new("/srv/pipeworks", aliases);
        assert_eq!(resolver.resolve_host_path("/data/in.mp4"), PathBuf::from("/srv/pipeworks/data/in.mp4"));
    }

    #[test]
    fn resolve_host_path_joins_relative_against_project_root() {
        let resolver = PathResolver::new("/srv/pipeworks", MountAliases::default());
        assert_eq!(resolver.resolve_host_path("input/a.mp4"), PathBuf::from("/srv/pipeworks/input/a.mp4"));
    }

    #[test]
    fn normalize_for_storage_is_relative_and_forward_slash() {
        let resolver = PathResolver::new("/srv/pipeworks", MountAliases::default());
        let normalized = resolver.normalize_for_storage(Path::new("/srv/pipeworks/input/a.mp4"));
        assert_eq!(normalized, "input/a.mp4");
    }

    #[test]
    fn filename_stem_strips_directory_and_extension() {
        assert_eq!(PathResolver::filename_stem("/a/b/copy.mp4").as_deref(), Some("copy"));
    }
}
