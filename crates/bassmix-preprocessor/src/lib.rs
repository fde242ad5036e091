//! BassMix Preprocessor
//!
//! A narrow C preprocessing capability used to turn a raw vendor header into
//! a single self-contained declaration string.
//!
//! ## Modules
//!
//! - `context` - Macro definitions and virtual includes for one run
//! - `builtin` - In-process preprocessor (no toolchain required)
//! - `clang` - Wrapper around `clang -E`
//! - `lexer` / `expr` - Tokenizer and `#if` expression evaluator

pub mod builtin;
pub mod clang;
pub mod context;
pub mod expr;
pub mod lexer;

pub use builtin::BuiltinPreprocessor;
pub use clang::ClangPreprocessor;
pub use context::{MacroDefinition, PreprocessContext};

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during preprocessing
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Clang not found. Please install clang.")]
    ClangNotFound,

    #[error("Preprocessing failed: {0}")]
    PreprocessFailed(String),

    #[error("{file}:{line}: {message}")]
    Syntax {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}:{line}: unterminated #{directive}")]
    UnterminatedConditional {
        file: String,
        line: usize,
        directive: String,
    },

    #[error("{file}:{line}: include not found: {name}")]
    IncludeNotFound {
        file: String,
        line: usize,
        name: String,
    },

    #[error("{file}:{line}: #error {message}")]
    ErrorDirective {
        file: String,
        line: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Preprocessor trait for different backends
pub trait Preprocessor: Send + Sync {
    /// Preprocess source text. The output carries no trailing newline.
    fn process(
        &self,
        source: &str,
        filename: &str,
        context: &PreprocessContext,
    ) -> Result<String, PreprocessError>;

    /// Preprocess a file
    fn process_file(
        &self,
        path: &Path,
        context: &PreprocessContext,
    ) -> Result<String, PreprocessError> {
        let source = std::fs::read_to_string(path)?;
        let filename = path.to_string_lossy();
        self.process(&source, &filename, context)
    }

    /// Get backend name
    fn name(&self) -> &str;

    /// Check if backend is available
    fn is_available(&self) -> bool {
        true
    }
}

/// Get the in-process preprocessor
pub fn get_preprocessor() -> Box<dyn Preprocessor> {
    Box::new(BuiltinPreprocessor::new())
}

#[cfg(test)]
mod tests;
