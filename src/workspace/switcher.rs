// SPDX-License-Identifier: MIT
//! Session switch side effects, in strict order.
//!
//! 1. announce the new session to the state store;
//! 2. restore persisted state for it (failures logged, never rolled back);
//! 3. create the default conversation tab unless one exists.
//!
//! Each step completes before the next starts — the default-tab step must see
//! whatever the restore installed.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::session::restore::StateRestorer;
use crate::session::{SessionKey, SessionSink};

/// Workspace-container suffixes stripped from the final path component when
/// deriving a display name. Tried in this order; the first match wins.
const WORKSPACE_SUFFIXES: &[&str] = &[".xcworkspace", ".xcodeproj"];

/// Human-readable name for a workspace path: the final component with a known
/// container suffix stripped (case-sensitive, exact). No suffix → the raw
/// component unchanged.
pub fn display_name(path: &Path) -> String {
    let component = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    for suffix in WORKSPACE_SUFFIXES {
        if let Some(stripped) = component.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    component
}

pub struct SessionSwitcher {
    sink: Arc<dyn SessionSink>,
    restorer: Arc<dyn StateRestorer>,
}

impl SessionSwitcher {
    pub fn new(sink: Arc<dyn SessionSink>, restorer: Arc<dyn StateRestorer>) -> Self {
        Self { sink, restorer }
    }

    /// Run the full switch sequence for `key`. When this returns, the session
    /// counts as switched — even if the restore step failed.
    pub async fn switch(&self, key: &SessionKey) {
        let name = display_name(&key.workspace_path);
        info!(
            path = %key.workspace_path.display(),
            name = %name,
            user = %key.username,
            "switching session"
        );

        self.sink
            .announce_switch(&key.workspace_path, &name, &key.username)
            .await;

        if let Err(e) = self.restorer.restore(key).await {
            warn!(
                path = %key.workspace_path.display(),
                err = %e,
                "session state restore failed — continuing with a fresh session"
            );
        }

        self.sink
            .init_default_tab_if_needed(&key.workspace_path, &key.username)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_xcworkspace_suffix() {
        assert_eq!(display_name(Path::new("/Users/a/Project.xcworkspace")), "Project");
    }

    #[test]
    fn strips_xcodeproj_suffix() {
        assert_eq!(display_name(Path::new("/Users/a/Project.xcodeproj")), "Project");
    }

    #[test]
    fn plain_directory_name_unchanged() {
        assert_eq!(display_name(Path::new("/Users/a/Project")), "Project");
    }

    #[test]
    fn suffix_match_is_case_sensitive() {
        assert_eq!(
            display_name(Path::new("/Users/a/Project.XCWORKSPACE")),
            "Project.XCWORKSPACE"
        );
    }

    #[test]
    fn only_the_final_component_is_considered() {
        assert_eq!(
            display_name(Path::new("/Users/a.xcworkspace/Project")),
            "Project"
        );
    }

    #[test]
    fn first_matching_suffix_wins() {
        // .xcworkspace is tried first but does not match here; .xcodeproj does.
        assert_eq!(
            display_name(Path::new("/w/App.xcworkspace.xcodeproj")),
            "App.xcworkspace"
        );
    }
}
