//! Single-source compilation of the benchmark.

use crate::error::BuildError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Turns one source file into an executable.
pub trait Builder {
    fn build(&self, source: &Path, flags: &[String]) -> Result<PathBuf, BuildError>;
}

impl<T: Builder + ?Sized> Builder for &T {
    fn build(&self, source: &Path, flags: &[String]) -> Result<PathBuf, BuildError> {
        (**self).build(source, flags)
    }
}

/// Invokes a C compiler directly: `<cc> <flags> <source> -o <dir>/<stem>`.
#[derive(Debug, Clone)]
pub struct SingleSourceBuilder {
    pub compiler: String,
    pub output_dir: PathBuf,
}

impl Default for SingleSourceBuilder {
    fn default() -> Self {
        Self {
            compiler: "cc".into(),
            output_dir: PathBuf::from("build"),
        }
    }
}

impl SingleSourceBuilder {
    pub fn new(compiler: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            compiler: compiler.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Compiler arguments. Flags such as `-qopt-streaming-stores always`
    /// carry their value after a space and are split the way a shell would.
    pub fn command_args(&self, source: &Path, flags: &[String], output: &Path) -> Vec<String> {
        let mut args: Vec<String> = flags
            .iter()
            .flat_map(|flag| flag.split_whitespace())
            .map(str::to_string)
            .collect();
        args.push(source.display().to_string());
        args.push("-o".into());
        args.push(output.display().to_string());
        args
    }

    fn output_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "a".into());
        self.output_dir.join(format!("{}.x", stem))
    }
}

impl Builder for SingleSourceBuilder {
    fn build(&self, source: &Path, flags: &[String]) -> Result<PathBuf, BuildError> {
        if !source.exists() {
            return Err(BuildError::MissingSource(source.to_path_buf()));
        }
        fs::create_dir_all(&self.output_dir).map_err(|source| BuildError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let output = self.output_path(source);
        let args = self.command_args(source, flags, &output);
        info!(compiler = %self.compiler, args = ?args, "compiling benchmark");

        let result = Command::new(&self.compiler)
            .args(&args)
            .output()
            .map_err(|err| BuildError::Spawn {
                compiler: self.compiler.clone(),
                source: err,
            })?;

        if !result.status.success() {
            return Err(BuildError::Failed {
                path: source.to_path_buf(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_with_values_are_split() {
        let builder = SingleSourceBuilder::new("icc", "/tmp/out");
        let flags = vec!["-O3".to_string(), "-qopt-streaming-stores always".to_string()];
        let args = builder.command_args(
            Path::new("stream.c"),
            &flags,
            Path::new("/tmp/out/stream.x"),
        );
        assert_eq!(
            args,
            vec!["-O3", "-qopt-streaming-stores", "always", "stream.c", "-o", "/tmp/out/stream.x"]
        );
    }

    #[test]
    fn test_output_named_after_source() {
        let builder = SingleSourceBuilder::new("cc", "build");
        assert_eq!(
            builder.output_path(Path::new("src/stream.c")),
            PathBuf::from("build/stream.x")
        );
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let builder = SingleSourceBuilder::new("cc", dir.path());
        let err = builder
            .build(&dir.path().join("stream.c"), &["-O3".to_string()])
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingSource(_)));
    }
}
