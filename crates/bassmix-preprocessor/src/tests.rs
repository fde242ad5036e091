//! Extended tests for the BassMix preprocessor
//!
//! These tests run the built-in backend over header fragments shaped like
//! the vendor headers it is meant for.

use super::*;
use pretty_assertions::assert_eq;

const VENDOR_FRAGMENT: &str = r#"
#ifndef BASSMIX_H
#define BASSMIX_H

#include "bass.h"

#if BASSVERSION!=0x204
#error conflicting BASS and BASSmix versions
#endif

#ifdef __cplusplus
extern "C" {
#endif

#ifndef BASSMIXDEF
#define BASSMIXDEF(f) WINAPI f
#endif

// BASS_Mixer_StreamCreate flags
#define BASS_MIXER_END		0x10000	// end the stream when there are no sources

DWORD BASSMIXDEF(BASS_Mixer_GetVersion)(void);
HSTREAM BASSMIXDEF(BASS_Mixer_StreamCreate)(DWORD freq, DWORD chans, DWORD flags);

#ifdef __cplusplus
}
#endif

#endif
"#;

fn vendor_context() -> PreprocessContext {
    let mut context = PreprocessContext::new();
    context.add("stdint.h", "");
    context.add(
        "bass.h",
        "#include <stdint.h>\n#define WINAPI\n#define BASSVERSION 0x204\ntypedef uint32_t DWORD;\ntypedef DWORD HSTREAM;",
    );
    context
}

/// The header guard, version check and C++ wrapper all disappear
#[test]
fn test_vendor_fragment() {
    let output = BuiltinPreprocessor::new()
        .process(VENDOR_FRAGMENT, "bassmix.h", &vendor_context())
        .unwrap();

    assert_eq!(
        output,
        "typedef uint32_t DWORD;\n\
         typedef DWORD HSTREAM;\n\
         DWORD  BASS_Mixer_GetVersion(void);\n\
         HSTREAM  BASS_Mixer_StreamCreate(DWORD freq, DWORD chans, DWORD flags);"
    );
}

/// A version mismatch trips the vendor's #error guard
#[test]
fn test_vendor_fragment_version_mismatch() {
    let mut context = vendor_context();
    context.add(
        "bass.h",
        "#define WINAPI\n#define BASSVERSION 0x203\ntypedef unsigned DWORD;",
    );

    let err = BuiltinPreprocessor::new()
        .process(VENDOR_FRAGMENT, "bassmix.h", &context)
        .unwrap_err();
    assert!(matches!(err, PreprocessError::ErrorDirective { line: 8, .. }));
}

/// Each run starts from the context alone; macros never leak between runs
#[test]
fn test_runs_are_independent() {
    let preprocessor = BuiltinPreprocessor::new();
    let context = PreprocessContext::new();

    let first = preprocessor
        .process("#define LEAK 1\nint a;", "a.h", &context)
        .unwrap();
    let second = preprocessor
        .process("#ifdef LEAK\nleaked\n#endif\nint b;", "b.h", &context)
        .unwrap();

    assert_eq!(first, "int a;");
    assert_eq!(second, "int b;");
}

/// Context undefinitions override defaults set earlier in the context
#[test]
fn test_context_undefine() {
    let mut context = PreprocessContext::new();
    context.define("_WIN32", "1").undefine("_WIN32");

    let output = BuiltinPreprocessor::new()
        .process("#ifdef _WIN32\nwin\n#endif\nall", "t.h", &context)
        .unwrap();
    assert_eq!(output, "all");
}

#[test]
fn test_process_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bassmix.h");
    std::fs::write(&path, VENDOR_FRAGMENT).unwrap();

    let from_file = BuiltinPreprocessor::new()
        .process_file(&path, &vendor_context())
        .unwrap();
    let from_text = BuiltinPreprocessor::new()
        .process(VENDOR_FRAGMENT, "bassmix.h", &vendor_context())
        .unwrap();
    assert_eq!(from_file, from_text);
}

#[test]
fn test_process_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = BuiltinPreprocessor::new()
        .process_file(&dir.path().join("absent.h"), &PreprocessContext::new())
        .unwrap_err();
    assert!(matches!(err, PreprocessError::IoError(_)));
}

#[test]
fn test_default_backend() {
    let preprocessor = get_preprocessor();
    assert_eq!(preprocessor.name(), "builtin");
    assert!(preprocessor.is_available());
}
