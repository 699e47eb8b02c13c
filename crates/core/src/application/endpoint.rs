// Endpoint resolution: identifier -> request path

use crate::domain::error::{DomainError, Result};

/// Identifiers under this namespace are addressed by their full path
pub const WORKFLOW_PREFIX: &str = "workflows/";

/// How many identifier segments a call site addresses.
///
/// Identifiers like `fal-ai/flux/dev` carry more than the owner/app pair; some
/// operations address the whole route, others only the base app. Each call
/// site picks one of these explicitly (see [`EndpointPolicies`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Keep every segment
    FullPath,
    /// Keep only the first two segments (`owner/app`)
    BasePath,
}

/// Per-operation resolution policy.
///
/// Defaults: creation calls (submit, streaming submit, direct run) address the
/// base app; follow-up calls on an existing request address the full route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointPolicies {
    pub submit: ResolvePolicy,
    pub run: ResolvePolicy,
    pub status: ResolvePolicy,
    pub result: ResolvePolicy,
    pub cancel: ResolvePolicy,
    pub stream: ResolvePolicy,
}

impl Default for EndpointPolicies {
    fn default() -> Self {
        Self {
            submit: ResolvePolicy::BasePath,
            run: ResolvePolicy::BasePath,
            status: ResolvePolicy::FullPath,
            result: ResolvePolicy::FullPath,
            cancel: ResolvePolicy::FullPath,
            stream: ResolvePolicy::FullPath,
        }
    }
}

/// Resolve `identifier` into a request path under `policy`
///
/// # Errors
///
/// `InvalidIdentifier` for empty identifiers or identifiers containing empty
/// segments (`fal-ai//x`, `/fal-ai/x`, `fal-ai/x/`).
pub fn resolve(identifier: &str, policy: ResolvePolicy) -> Result<String> {
    if identifier.trim().is_empty() {
        return Err(DomainError::InvalidIdentifier(
            "identifier is empty".to_string(),
        ));
    }
    if identifier.split('/').any(|segment| segment.trim().is_empty()) {
        return Err(DomainError::InvalidIdentifier(format!(
            "identifier has an empty segment: {}",
            identifier
        )));
    }

    if identifier.starts_with(WORKFLOW_PREFIX) {
        return Ok(identifier.to_string());
    }

    match policy {
        ResolvePolicy::FullPath => Ok(identifier.to_string()),
        ResolvePolicy::BasePath => Ok(identifier
            .splitn(3, '/')
            .take(2)
            .collect::<Vec<_>>()
            .join("/")),
    }
}

/// Resolve keeping every segment
pub fn resolve_full_path(identifier: &str) -> Result<String> {
    resolve(identifier, ResolvePolicy::FullPath)
}

/// Resolve keeping only `owner/app`
pub fn resolve_base_path(identifier: &str) -> Result<String> {
    resolve(identifier, ResolvePolicy::BasePath)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_identifier_unchanged() {
        assert_eq!(
            resolve_full_path("workflows/acme/foo").unwrap(),
            "workflows/acme/foo"
        );
        assert_eq!(
            resolve_base_path("workflows/acme/foo").unwrap(),
            "workflows/acme/foo"
        );
    }

    #[test]
    fn test_base_path_truncates_to_two_segments() {
        assert_eq!(
            resolve_base_path("fal-ai/fast-sdxl/extra").unwrap(),
            "fal-ai/fast-sdxl"
        );
        assert_eq!(
            resolve_base_path("fal-ai/flux/dev/image-to-image").unwrap(),
            "fal-ai/flux"
        );
    }

    #[test]
    fn test_full_path_keeps_all_segments() {
        assert_eq!(
            resolve_full_path("fal-ai/fast-sdxl/extra").unwrap(),
            "fal-ai/fast-sdxl/extra"
        );
    }

    #[test]
    fn test_short_identifiers_identical_under_both_policies() {
        for id in ["fal-ai/fast-sdxl", "my-app"] {
            assert_eq!(resolve_full_path(id).unwrap(), id);
            assert_eq!(resolve_base_path(id).unwrap(), id);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for id in ["", "   ", "/fal-ai/x", "fal-ai//x", "fal-ai/x/"] {
            let err = resolve_full_path(id).unwrap_err();
            assert!(
                matches!(err, DomainError::InvalidIdentifier(_)),
                "expected InvalidIdentifier for {:?}",
                id
            );
        }
    }

    #[test]
    fn test_default_policies_per_call_site() {
        let policies = EndpointPolicies::default();
        assert_eq!(policies.submit, ResolvePolicy::BasePath);
        assert_eq!(policies.run, ResolvePolicy::BasePath);
        assert_eq!(policies.status, ResolvePolicy::FullPath);
        assert_eq!(policies.result, ResolvePolicy::FullPath);
        assert_eq!(policies.cancel, ResolvePolicy::FullPath);
        assert_eq!(policies.stream, ResolvePolicy::FullPath);
    }
}
