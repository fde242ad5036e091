//! Preprocessing context for BASSmix headers
//!
//! The vendor header includes `bass.h` for the handle types, calling
//! conventions and the `SYNCPROC` callback. Instead of the real BASS header
//! a minimal stand-in is supplied as a virtual include.

use bassmix_core::{is_supported, Error, Platform, Result, Version};
use bassmix_preprocessor::PreprocessContext;
use tracing::debug;

/// Macro signalling a Windows target
pub const WINDOWS_MACRO: &str = "_WIN32";

/// Stand-in for `bass.h`
pub fn bass_stub(version: &Version) -> String {
    format!(
        r#"#define BASSVERSION 0x{code:x}
#define WINAPI
#define CALLBACK
typedef uint32_t DWORD;
typedef uint64_t QWORD;
typedef int BOOL;

typedef DWORD HSTREAM;
typedef DWORD HSYNC;

typedef void (CALLBACK SYNCPROC)(HSYNC, DWORD, DWORD, void*);
"#,
        code = version.bass_version_code()
    )
}

/// Build a fresh context for `platform` and `version`. Fails before
/// anything is built when the pair was never shipped.
pub fn build(platform: Option<Platform>, version: &Version) -> Result<PreprocessContext> {
    if let Some(platform) = platform.filter(|_| !is_supported(platform, version)) {
        return Err(Error::UnsupportedPlatform {
            platform,
            version: version.clone(),
        });
    }

    let mut context = PreprocessContext::new();
    context.add("stdint.h", "");
    context.add("bass.h", &bass_stub(version));

    if platform == Some(Platform::Windows) {
        context.define(WINDOWS_MACRO, "1");
    }

    debug!(
        "Built preprocessing context for {} {} ({} macros)",
        platform.map_or("unspecified", |p| p.name()),
        version,
        context.macros().len()
    );
    Ok(context)
}
