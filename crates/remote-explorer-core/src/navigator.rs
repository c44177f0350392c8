// SPDX-License-Identifier: AGPL-3.0
// Remote Explorer Core - Path and breadcrumb tracking
//
// The server is authoritative for breadcrumb naming, so the navigator only
// computes the *next* path to list and adopts whatever a successful listing
// reports.

use crate::types::{Breadcrumb, DirectoryListing, FileEntry};

/// Name of the synthesized root crumb
pub const ROOT_CRUMB_NAME: &str = "Home";

/// Normalize a server-relative path: no leading or trailing `/`, no empty segments.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parent of a relative path; root is its own parent.
pub fn parent_path(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    segments.join("/")
}

/// Crumbs derived from the path alone, used when the server sends none.
fn derived_breadcrumbs(path: &str) -> Vec<Breadcrumb> {
    let mut crumbs = vec![Breadcrumb::new(ROOT_CRUMB_NAME, "")];
    let mut acc = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !acc.is_empty() {
            acc.push('/');
        }
        acc.push_str(segment);
        crumbs.push(Breadcrumb::new(segment, acc.clone()));
    }
    crumbs
}

/// Make the trail terminate at (and only at) `path`.
pub fn reconcile_breadcrumbs(path: &str, crumbs: Vec<Breadcrumb>) -> Vec<Breadcrumb> {
    let mut crumbs: Vec<Breadcrumb> = crumbs
        .into_iter()
        .map(|c| Breadcrumb::new(c.name, normalize_path(&c.path)))
        .collect();

    match crumbs.iter().position(|c| c.path == path) {
        Some(end) => {
            crumbs.truncate(end + 1);
            crumbs
        }
        None => derived_breadcrumbs(path),
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathNavigator {
    current_path: String,
    breadcrumbs: Vec<Breadcrumb>,
}

impl PathNavigator {
    pub fn new() -> Self {
        Self {
            current_path: String::new(),
            breadcrumbs: derived_breadcrumbs(""),
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }

    /// Path to list when the user opens `entry`, if it is a directory.
    pub fn enter_target(&self, entry: &FileEntry) -> Option<String> {
        entry
            .is_directory
            .then(|| normalize_path(&entry.relative_path))
    }

    /// Path to list when the user goes up one level.
    pub fn up_target(&self) -> String {
        parent_path(&self.current_path)
    }

    pub fn is_root(&self) -> bool {
        self.current_path.is_empty()
    }

    /// Adopt a successful listing of `requested`. Returns the entries it carried.
    pub fn apply_listing(&mut self, requested: &str, listing: DirectoryListing) -> Vec<FileEntry> {
        let path = normalize_path(requested);
        self.breadcrumbs = reconcile_breadcrumbs(&path, listing.breadcrumbs);
        self.current_path = path;
        listing.items
    }

    /// Forget everything, back to root.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
