//! Clang Preprocessor Integration
//!
//! Runs `clang -E` over a header. Virtual includes are written to a
//! scratch directory that is passed as the only include path, so the host
//! system headers are never consulted.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use crate::context::PreprocessContext;
use crate::{PreprocessError, Preprocessor};

/// Clang preprocessor wrapper
pub struct ClangPreprocessor {
    /// Path to clang executable
    clang_path: PathBuf,
    /// Additional clang arguments
    extra_args: Vec<String>,
}

impl ClangPreprocessor {
    /// Create a new preprocessor, auto-detecting clang location
    pub fn new() -> Result<Self, PreprocessError> {
        let clang_path = Self::find_clang()?;
        debug!("Found clang at: {:?}", clang_path);
        Ok(Self::with_path(clang_path))
    }

    /// Create a preprocessor with a specific clang path
    pub fn with_path(clang_path: PathBuf) -> Self {
        Self {
            clang_path,
            extra_args: Vec::new(),
        }
    }

    /// Append extra clang arguments
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    /// Find clang executable
    fn find_clang() -> Result<PathBuf, PreprocessError> {
        let candidates = [
            "clang",
            "/usr/bin/clang",
            "/usr/local/bin/clang",
            "/opt/homebrew/bin/clang",  // macOS ARM
            "/opt/homebrew/opt/llvm/bin/clang",
        ];

        for candidate in candidates {
            if let Ok(output) = Command::new(candidate).arg("--version").output() {
                if output.status.success() {
                    return Ok(PathBuf::from(candidate));
                }
            }
        }

        Err(PreprocessError::ClangNotFound)
    }

    /// Get clang version
    pub fn version(&self) -> Option<String> {
        Command::new(&self.clang_path)
            .arg("--version")
            .output()
            .ok()
            .and_then(|o| {
                String::from_utf8(o.stdout)
                    .ok()
                    .and_then(|s| s.lines().next().map(|l| l.to_string()))
            })
    }

    /// Build clang command line arguments
    fn build_args(&self, include_dir: &Path, context: &PreprocessContext) -> Vec<String> {
        let mut args = vec![
            "-E".to_string(), // Preprocess only
            "-P".to_string(), // No line markers
            "-nostdinc".to_string(),
            "-x".to_string(),
            "c".to_string(),
            format!("-I{}", include_dir.display()),
        ];

        for macro_def in context.macros() {
            args.push(macro_def.to_clang_arg());
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Write virtual includes and the source into a scratch directory
    fn stage(
        &self,
        dir: &Path,
        source: &str,
        filename: &str,
        context: &PreprocessContext,
    ) -> Result<PathBuf, PreprocessError> {
        for (name, body) in context.includes() {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, body)?;
        }

        let base = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input.h".to_string());
        let source_path = dir.join("__source").join(base);
        if let Some(parent) = source_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&source_path, source)?;
        Ok(source_path)
    }

    /// Parse warnings from stderr
    fn parse_warnings(&self, stderr: &[u8]) -> Vec<String> {
        let stderr_str = String::from_utf8_lossy(stderr);
        stderr_str
            .lines()
            .filter(|line| line.contains("warning:"))
            .map(|s| s.to_string())
            .collect()
    }
}

impl Preprocessor for ClangPreprocessor {
    fn process(
        &self,
        source: &str,
        filename: &str,
        context: &PreprocessContext,
    ) -> Result<String, PreprocessError> {
        let scratch = tempfile::tempdir()?;
        let source_path = self.stage(scratch.path(), source, filename, context)?;

        let args = self.build_args(scratch.path(), context);
        debug!("Preprocessing {} with args: {:?}", filename, args);

        let output = Command::new(&self.clang_path)
            .args(&args)
            .arg(&source_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PreprocessError::PreprocessFailed(stderr.to_string()));
        }

        for warning in self.parse_warnings(&output.stderr) {
            warn!("{}", warning);
        }

        let code = String::from_utf8_lossy(&output.stdout);
        let lines: Vec<&str> = code
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect();
        Ok(lines.join("\n"))
    }

    fn name(&self) -> &str {
        "clang"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.clang_path)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Default for ClangPreprocessor {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| {
            warn!("Clang not found, using placeholder path");
            Self::with_path(PathBuf::from("clang"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let preprocessor = ClangPreprocessor::with_path(PathBuf::from("clang"))
            .with_args(vec!["-std=c99".to_string()]);
        let mut context = PreprocessContext::new();
        context.define("_WIN32", "1").undefine("__APPLE__");

        let args = preprocessor.build_args(Path::new("/tmp/virtual"), &context);

        assert!(args.contains(&"-E".to_string()));
        assert!(args.contains(&"-P".to_string()));
        assert!(args.contains(&"-nostdinc".to_string()));
        assert!(args.contains(&"-I/tmp/virtual".to_string()));
        assert!(args.contains(&"-D_WIN32=1".to_string()));
        assert!(args.contains(&"-U__APPLE__".to_string()));
        assert_eq!(args.last(), Some(&"-std=c99".to_string()));
    }

    #[test]
    fn test_stage_writes_virtual_includes() {
        let preprocessor = ClangPreprocessor::with_path(PathBuf::from("clang"));
        let mut context = PreprocessContext::new();
        context.add("stdint.h", "").add("bass.h", "typedef int BOOL;");

        let scratch = tempfile::tempdir().unwrap();
        let source_path = preprocessor
            .stage(scratch.path(), "BOOL x;", "/headers/2.4/bassmix.h", &context)
            .unwrap();

        assert!(source_path.ends_with("__source/bassmix.h"));
        assert_eq!(fs::read_to_string(&source_path).unwrap(), "BOOL x;");
        assert_eq!(
            fs::read_to_string(scratch.path().join("bass.h")).unwrap(),
            "typedef int BOOL;"
        );
        assert!(scratch.path().join("stdint.h").is_file());
    }

    #[test]
    fn test_parse_warnings() {
        let preprocessor = ClangPreprocessor::with_path(PathBuf::from("clang"));
        let stderr = b"bassmix.h:3:2: warning: something odd\nnote: see here\n";
        let warnings = preprocessor.parse_warnings(stderr);
        assert_eq!(warnings, vec!["bassmix.h:3:2: warning: something odd".to_string()]);
    }

    #[test]
    fn test_process_when_clang_present() {
        let preprocessor = ClangPreprocessor::default();
        if !preprocessor.is_available() {
            return;
        }

        let mut context = PreprocessContext::new();
        context.define("_WIN32", "1");
        let output = preprocessor
            .process("#ifdef _WIN32\nint win;\n#else\nint posix;\n#endif\n", "t.h", &context)
            .unwrap();
        assert_eq!(output, "int win;");
    }
}
