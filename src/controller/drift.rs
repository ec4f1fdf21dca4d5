//! Change detection between a last-applied spec and a freshly loaded one.
//!
//! Scalar fields are compared first, then the environment list. The env
//! comparison is by key, so reordering entries is not drift.

use crate::desired::{ComputeSpec, EnvVar, ProxySpec};

/// Whether a compute spec needs a re-apply.
pub fn compute_changed(old: &ComputeSpec, new: &ComputeSpec) -> bool {
    old.kind != new.kind
        || old.listen_port != new.listen_port
        || old.memory_budget != new.memory_budget
        || old.description != new.description
        || old.access_token != new.access_token
        || old.exposure != new.exposure
        || env_changed(&old.env_vars, &new.env_vars)
}

/// Whether a proxy spec needs a re-apply.
pub fn proxy_changed(old: &ProxySpec, new: &ProxySpec) -> bool {
    old.kind != new.kind
        || old.listen_port != new.listen_port
        || old.memory_budget != new.memory_budget
        || old.external_address != new.external_address
        || old.external_port != new.external_port
        || old.access_token != new.access_token
        || old.exposure != new.exposure
        || env_changed(&old.env_vars, &new.env_vars)
}

/// Compare env lists by count, then by key/value against the new list.
///
/// Keys are unique within a list, so equal counts plus every old entry
/// present in the new list with the same value means the sets are equal.
pub fn env_changed(old: &[EnvVar], new: &[EnvVar]) -> bool {
    if old.len() != new.len() {
        return true;
    }
    old.iter().any(|entry| {
        new.iter()
            .find(|candidate| candidate.key == entry.key)
            .is_none_or(|candidate| candidate.value != entry.value)
    })
}
