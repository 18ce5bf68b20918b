use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.claims-audit/` exists so last-used parameters can be saved.
pub fn ensure_directories() -> anyhow::Result<()> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(home.join(".claims-audit"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name to an `EnvFilter` directive.
fn level_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr so that JSON on stdout stays machine-readable. When
/// `log_file` is given, the same events are appended to it without ANSI
/// colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ── Data-path discovery ────────────────────────────────────────────────────────

/// Candidate data directories relative to `cwd` and `home`, in lookup order.
fn data_path_candidates(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = vec![cwd.join("data")];
    if let Some(home) = home {
        candidates.push(home.join(".claims-audit").join("data"));
    }
    candidates
}

/// Locate a claims data directory when none was given on the command line.
///
/// Checks `./data` and then `~/.claims-audit/data`, returning the first
/// that is a directory.
pub fn discover_data_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let home = dirs::home_dir();
    data_path_candidates(&cwd, home.as_deref())
        .into_iter()
        .find(|p| p.is_dir())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── level_directive ───────────────────────────────────────────────────────

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("bogus"), "info");
    }

    // ── ensure_directories ────────────────────────────────────────────────────

    #[test]
    fn test_ensure_directories() {
        let tmp = TempDir::new().expect("tempdir");

        // Override HOME so that dirs::home_dir() resolves to our temp dir.
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", tmp.path());

        let result = ensure_directories();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }

        result.expect("ensure_directories should succeed");
        assert!(tmp.path().join(".claims-audit").is_dir());
    }

    // ── data_path_candidates ──────────────────────────────────────────────────

    #[test]
    fn test_candidates_prefer_working_directory() {
        let cwd = Path::new("/work");
        let home = Path::new("/home/ada");
        let candidates = data_path_candidates(cwd, Some(home));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/work/data"),
                PathBuf::from("/home/ada/.claims-audit/data"),
            ]
        );
    }

    #[test]
    fn test_candidates_without_home() {
        let candidates = data_path_candidates(Path::new("/work"), None);
        assert_eq!(candidates, vec![PathBuf::from("/work/data")]);
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let tmp = TempDir::new().expect("tempdir");
        let cwd = tmp.path().join("cwd");
        let home = tmp.path().join("home");
        let home_data = home.join(".claims-audit").join("data");
        std::fs::create_dir_all(&cwd).unwrap();
        std::fs::create_dir_all(&home_data).unwrap();

        let found = data_path_candidates(&cwd, Some(&home))
            .into_iter()
            .find(|p| p.is_dir());
        assert_eq!(found, Some(home_data));
    }
}
