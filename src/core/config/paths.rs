use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        Self::with_dirs(project_root, user_data_dir)
    }

    pub fn with_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
        }
    }

    /// Resolves the vector store file. Absolute paths are used as-is.
    pub fn store_path(&self, store_file: &str) -> PathBuf {
        let candidate = PathBuf::from(store_file);
        if candidate.is_absolute() {
            candidate
        } else {
            self.user_data_dir.join(candidate)
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("MENTOR_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("MENTOR_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return project_root.join("data");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("ai-mentor")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_path_is_relative_to_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_dirs(dir.path().to_path_buf(), dir.path().join("data"));

        assert_eq!(
            paths.store_path("course_materials.db"),
            dir.path().join("data").join("course_materials.db")
        );
        assert!(paths.log_dir.exists());
    }

    #[test]
    fn absolute_store_path_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_dirs(dir.path().to_path_buf(), dir.path().to_path_buf());
        let absolute = dir.path().join("elsewhere.db");

        assert_eq!(paths.store_path(absolute.to_str().unwrap()), absolute);
    }
}
