// Service-account key path resolution
//
// Paths may come from the environment relative to wherever the binary was
// installed, so relative paths are tried against the executable's directory
// before the working directory.

use std::path::{Path, PathBuf};

/// Conventional location of the key inside a deployment
const CONVENTIONAL_KEY_PATH: &str = "keys/serviceAccountKey.json";

/// Directory containing the running executable, if it can be determined
pub fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.canonicalize().ok().or(Some(exe)))
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Resolve a configured key path to an absolute one.
///
/// Relative paths resolve against `base_dir` when a file exists there,
/// otherwise against the current directory.
pub fn resolve_credentials_path(raw: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let path = Path::new(raw);
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }

    if let Some(base) = base_dir {
        let candidate = base.join(path);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    Some(std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf()))
}

/// If `path` names the conventional key location but does not exist,
/// fall back to that location under `base_dir`.
pub fn fallback_credentials_path(path: PathBuf, base_dir: Option<&Path>) -> PathBuf {
    if path.is_file() {
        return path;
    }

    let normalized = path.to_string_lossy().replace('\\', "/");
    if !normalized.ends_with(CONVENTIONAL_KEY_PATH) {
        return path;
    }

    match base_dir {
        Some(base) => {
            let fallback = base.join(CONVENTIONAL_KEY_PATH);
            if fallback.is_file() {
                log::debug!("Using fallback credentials path {}", fallback.display());
                fallback
            } else {
                path
            }
        }
        None => path,
    }
}

/// Full resolution: the first non-blank candidate, resolved and with fallback applied.
///
/// Returns `None` when nothing is configured or the resolved file does not
/// exist, meaning ambient (metadata server) credentials should be used.
pub fn locate_credentials(candidates: &[Option<String>], base_dir: Option<&Path>) -> Option<PathBuf> {
    let raw = candidates
        .iter()
        .flatten()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())?;

    let resolved = resolve_credentials_path(raw, base_dir)?;
    let resolved = fallback_credentials_path(resolved, base_dir);

    if resolved.is_file() {
        Some(resolved)
    } else {
        log::warn!(
            "Credentials file {} not found; falling back to ambient credentials",
            resolved.display()
        );
        None
    }
}
