//! Translation of a [`CheckSpec`] into the arguments of a `cargo check` command line.

use crate::plan::CheckSpec;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// Which compilation targets within the package `cargo check` is asked to check.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CompileTargets {
    /// Library plus examples (`--examples`).
    #[default]
    Examples,

    /// Every target in the workspace (`--all`).
    All,
}

impl CompileTargets {
    fn flag(self) -> &'static str {
        match self {
            Self::Examples => "--examples",
            Self::All => "--all",
        }
    }
}

/// Options that apply to every invocation built from a plan, independent of the check spec.
#[derive(Clone, Debug)]
pub struct InvocationOptions {
    /// Path to the `cargo` executable.
    pub cargo_path: PathBuf,

    /// Whether to pass the toolchain as a leading `+toolchain` argument.
    ///
    /// This only works when `cargo` is the rustup proxy.
    pub toolchain_selector: bool,
}

/// One fully-built `cargo check` invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<String>,
}

impl Invocation {
    /// Build the invocation for `spec`.
    ///
    /// The argument order is fixed: toolchain selector, `check`, `--no-default-features`, the
    /// compiled-targets flag, then `--target` and `--features` if applicable.  Features are
    /// joined in their canonical (sorted) order, so the same spec always produces the same
    /// arguments.
    pub fn build(spec: &CheckSpec, compile: CompileTargets, options: &InvocationOptions) -> Self {
        let mut args = Vec::with_capacity(6);

        if options.toolchain_selector {
            args.push(format!("+{}", spec.toolchain));
        }

        args.push("check".to_string());
        args.push("--no-default-features".to_string());
        args.push(compile.flag().to_string());

        if let Some(target) = &spec.target {
            args.push(format!("--target={target}"));
        }

        if !spec.features.is_empty() {
            args.push(format!("--features={}", spec.features.joined(",")));
        }

        Self {
            program: options.cargo_path.clone(),
            args,
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Human-readable reconstruction of the command line, as it would be typed in a shell.
    ///
    /// The program is shown by file name only (`cargo`) so that output is stable regardless of
    /// where cargo was found.
    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self
            .program
            .file_stem()
            .map(|name| name.to_string_lossy())
            .unwrap_or_else(|| self.program.to_string_lossy());

        write!(f, "{program}")?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }

        Ok(())
    }
}
