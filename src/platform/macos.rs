use super::{FrontmostQuery, SourceError};
use objc2::rc::autoreleasepool;
use objc2_app_kit::NSWorkspace;

const FINDER_BUNDLE_ID: &str = "com.apple.finder";

/// Reads `NSWorkspace.frontmostApplication.bundleIdentifier`.
/// AppKit has no push notification reachable without a run loop, so this only polls.
pub struct WorkspaceQuery;

impl FrontmostQuery for WorkspaceQuery {
    #[allow(unsafe_code, reason = "objc2-app-kit exposes these AppKit getters as unsafe")]
    fn frontmost_app_id(&self) -> Result<Option<String>, SourceError> {
        // Polled from a worker thread with no pool of its own.
        let bundle_id = autoreleasepool(|_| unsafe {
            NSWorkspace::sharedWorkspace()
                .frontmostApplication()
                .and_then(|app| app.bundleIdentifier())
                .map(|id| id.to_string())
        });
        Ok(bundle_id)
    }

    fn home_app_id(&self) -> Option<String> {
        Some(FINDER_BUNDLE_ID.to_string())
    }
}
