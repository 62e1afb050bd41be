//! Pure change-set resolution: which service roots does a diff touch.

use crate::domain::{ChangedFile, ImpactedServiceSet, ServiceRoot};

/// Resolves a changed-file list against a set of monitored service roots.
///
/// Stateless and side-effect-free; all I/O (diffing, fetching) happens in the
/// caller, which hands the materialized lists in.
pub struct ChangeSetResolver;

impl ChangeSetResolver {
    /// Filter `service_roots` down to those containing at least one changed
    /// file.
    ///
    /// A root is impacted only when a changed path lies strictly inside the
    /// directory it names (see [`ServiceRoot::contains_path`]): sibling
    /// directories sharing a string prefix never match. Output preserves
    /// `service_roots` order, not discovery order in `changed_files`, and
    /// duplicate roots supplied by the caller propagate to the output.
    ///
    /// An empty `service_roots` short-circuits to an empty result without
    /// consulting `changed_files`; callers that consider an empty root list a
    /// usage error (the CLI does) must reject it before this point.
    pub fn resolve(
        changed_files: &[ChangedFile],
        service_roots: &[ServiceRoot],
    ) -> ImpactedServiceSet {
        if service_roots.is_empty() {
            return ImpactedServiceSet::default();
        }

        let impacted = service_roots
            .iter()
            .filter(|root| changed_files.iter().any(|file| root.contains_path(file)))
            .cloned()
            .collect();

        ImpactedServiceSet::new(impacted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<ChangedFile> {
        paths
            .iter()
            .map(|p| ChangedFile::parse(p).expect("test path"))
            .collect()
    }

    fn roots(names: &[&str]) -> Vec<ServiceRoot> {
        names
            .iter()
            .map(|n| ServiceRoot::new(n).expect("test root"))
            .collect()
    }

    #[test]
    fn no_changed_files_impacts_nothing() {
        let result = ChangeSetResolver::resolve(&[], &roots(&["backend", "frontend"]));
        assert!(result.is_empty());
    }

    #[test]
    fn no_monitored_services_impacts_nothing() {
        let result = ChangeSetResolver::resolve(&files(&["backend/src/main.py"]), &[]);
        assert!(result.is_empty());
    }

    #[test]
    fn prefix_sibling_does_not_match() {
        let result = ChangeSetResolver::resolve(&files(&["auth-service/app.py"]), &roots(&["auth"]));
        assert!(result.is_empty());
    }

    #[test]
    fn containment_selects_only_owning_root() {
        let result = ChangeSetResolver::resolve(
            &files(&["backend/src/main.py"]),
            &roots(&["backend", "frontend"]),
        );
        assert_eq!(result.names(), vec!["backend"]);
    }

    #[test]
    fn output_follows_root_order_not_discovery_order() {
        let result = ChangeSetResolver::resolve(
            &files(&["frontend/x", "backend/y"]),
            &roots(&["backend", "frontend"]),
        );
        assert_eq!(result.names(), vec!["backend", "frontend"]);
    }

    #[test]
    fn multiple_matches_deduplicate_per_root() {
        let result = ChangeSetResolver::resolve(
            &files(&["backend/a", "backend/b", "frontend/c"]),
            &roots(&["backend", "frontend", "nginx"]),
        );
        assert_eq!(result.names(), vec!["backend", "frontend"]);
    }

    #[test]
    fn resolve_is_idempotent() {
        let changed = files(&["backend/a", "frontend/c", "docs/readme.md"]);
        let monitored = roots(&["backend", "frontend", "nginx"]);

        let first = ChangeSetResolver::resolve(&changed, &monitored);
        let second = ChangeSetResolver::resolve(&changed, &monitored);
        assert_eq!(first, second);
        assert_eq!(first.names(), second.names());
    }

    #[test]
    fn duplicate_roots_propagate_to_output() {
        let result = ChangeSetResolver::resolve(
            &files(&["backend/a"]),
            &roots(&["backend", "backend"]),
        );
        assert_eq!(result.names(), vec!["backend", "backend"]);
    }

    #[test]
    fn file_equal_to_root_name_does_not_match() {
        let result = ChangeSetResolver::resolve(&files(&["backend"]), &roots(&["backend"]));
        assert!(result.is_empty());
    }

    #[test]
    fn nested_root_matches_only_its_subtree() {
        let result = ChangeSetResolver::resolve(
            &files(&["services/backend/main.py", "services/frontend-old/x"]),
            &roots(&["services/backend", "services/frontend"]),
        );
        assert_eq!(result.names(), vec!["services/backend"]);
    }
}
