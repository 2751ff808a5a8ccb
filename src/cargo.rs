use crate::{Result, error};
use snafu::ResultExt;
use std::path::{Path, PathBuf};

/// Locate the `cargo` executable.
///
/// Searches in priority order:
/// 1. `configured`, the `cargo` value from the config, if any
/// 2. `CARGO` environment variable (cargo's own convention, set when we run as a cargo alias)
/// 3. `cargo` in PATH (via `which` crate)
/// 4. `$CARGO_HOME/bin/cargo` where `CARGO_HOME` defaults to ~/.cargo
pub fn find_cargo(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }

        // Could be a bare program name that only makes sense as a PATH lookup
        if let Ok(path) = which::which(path) {
            return Ok(path);
        }

        return error::ExecutableNotFoundSnafu {
            name: path.display().to_string(),
        }
        .fail();
    }

    find_executable("cargo", "CARGO")
}

/// Find an executable by name, checking environment variable, PATH, and default locations.
fn find_executable(name: &str, env_var: &str) -> Result<PathBuf> {
    // Check environment variable
    if let Ok(path) = std::env::var(env_var) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    // Check PATH using `which` crate
    if let Ok(path) = which::which(name) {
        return Ok(path);
    }

    // Check $CARGO_HOME/bin/{name}
    let cargo_home = std::env::var("CARGO_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| home::cargo_home().ok());

    if let Some(cargo_home) = cargo_home {
        let path = cargo_home.join("bin").join(name);
        if path.exists() {
            return Ok(path);
        }
    }

    error::ExecutableNotFoundSnafu {
        name: name.to_string(),
    }
    .fail()
}

/// The optional features declared by a package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageFeatures {
    pub package: String,

    /// Feature names in the order cargo reports them, without `default`.
    pub features: Vec<String>,
}

/// Read the features of the package in `manifest_dir` with `cargo metadata --no-deps`.
///
/// Only the names are used.  What each feature enables is irrelevant, since every feature is
/// just a label to switch on or off.  `default` is left out because checks always run with
/// `--no-default-features` and `default` is a set of other features rather than a feature of
/// its own.
pub fn package_features(cargo_path: &Path, manifest_dir: &Path) -> Result<PackageFeatures> {
    let metadata = cargo_metadata::MetadataCommand::new()
        .cargo_path(cargo_path)
        .current_dir(manifest_dir)
        .no_deps()
        .exec()
        .with_context(|_| error::MetadataSnafu {
            cargo_path: cargo_path.to_path_buf(),
        })?;

    let Some(package) = metadata.root_package() else {
        return error::NoFeaturesSnafu {
            package_count: metadata.workspace_members.len(),
        }
        .fail();
    };

    Ok(PackageFeatures {
        package: package.name.to_string(),
        features: package
            .features
            .keys()
            .filter(|name| name.as_str() != "default")
            .cloned()
            .collect(),
    })
}
