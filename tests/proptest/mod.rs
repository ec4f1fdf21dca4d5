// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for gameserver-operator.
//!
//! Uses proptest to generate random inputs and verify invariants.

#[path = "../common/mod.rs"]
mod common;

use proptest::prelude::*;

use gameserver_operator::controller::drift::{compute_changed, env_changed, proxy_changed};
use gameserver_operator::desired::EnvVar;
use gameserver_operator::resources::ExposureMode;
use gameserver_operator::resources::units::{MemoryBudget, heap_setting, memory_quantity};

use common::{ComputeSpecBuilder, ProxySpecBuilder};

/// Strategy for generating env lists with unique keys.
fn env_list() -> impl Strategy<Value = Vec<EnvVar>> {
    prop::collection::btree_map("[A-Z][A-Z_]{0,7}", "[a-z0-9]{0,8}", 0..8).prop_map(|map| {
        map.into_iter()
            .map(|(key, value)| EnvVar::new(key, value))
            .collect()
    })
}

/// Strategy for an env list together with a shuffled copy of it.
fn env_list_and_shuffle() -> impl Strategy<Value = (Vec<EnvVar>, Vec<EnvVar>)> {
    env_list().prop_flat_map(|env| (Just(env.clone()), Just(env).prop_shuffle()))
}

/// Strategy for well-formed memory budgets.
fn valid_budget() -> impl Strategy<Value = (u32, char)> {
    (1u32..=65536, prop_oneof![Just('M'), Just('m'), Just('G'), Just('g')])
}

fn any_exposure() -> impl Strategy<Value = ExposureMode> {
    prop_oneof![
        Just(ExposureMode::InternalOnly),
        Just(ExposureMode::NodeExposed),
        Just(ExposureMode::LoadBalanced),
    ]
}

proptest! {
    /// Property: Converting any string never panics and always yields a usable value.
    #[test]
    fn test_memory_conversion_is_total(raw in any::<String>()) {
        let heap = heap_setting(&raw);
        prop_assert!(heap.ends_with('M'));
        prop_assert!(heap.trim_end_matches('M').parse::<u64>().is_ok());

        let quantity = memory_quantity(&raw);
        prop_assert!(quantity.ends_with("Mi") || quantity.ends_with("Gi"));
    }

    /// Property: Well-formed budgets pass the number through and scale the heap by 0.8.
    #[test]
    fn test_valid_budget_conversion((value, suffix) in valid_budget()) {
        let raw = format!("{value}{suffix}");
        let budget = MemoryBudget::parse(&raw).unwrap();
        let gigabytes = suffix.eq_ignore_ascii_case(&'G');

        let expected_quantity = format!("{value}{}", if gigabytes { "Gi" } else { "Mi" });
        prop_assert_eq!(budget.quantity(), expected_quantity);

        let megabytes = if gigabytes { f64::from(value) * 1024.0 } else { f64::from(value) };
        let expected_heap = format!("{}M", (megabytes * 0.8).round() as u64);
        prop_assert_eq!(heap_setting(&raw), expected_heap);
    }

    /// Property: The exposure mapper accepts anything and round-trips its own names.
    #[test]
    fn test_exposure_parse_is_total(raw in any::<String>(), mode in any_exposure()) {
        let parsed = ExposureMode::parse(&raw);
        prop_assert!(["ClusterIP", "NodePort", "LoadBalancer"].contains(&parsed.service_type()));
        prop_assert_eq!(ExposureMode::parse(mode.as_str()), mode);
        prop_assert_eq!(ExposureMode::parse(&mode.as_str().to_uppercase()), mode);
    }

    /// Property: Reordering env entries is never drift.
    #[test]
    fn test_env_reorder_not_drift((env, shuffled) in env_list_and_shuffle()) {
        prop_assert!(!env_changed(&env, &shuffled));

        let old = ComputeSpecBuilder::new("lobby-1").build();
        let mut a = old.clone();
        let mut b = old;
        a.env_vars = env;
        b.env_vars = shuffled;
        prop_assert!(!compute_changed(&a, &b));
    }

    /// Property: Changing one env value is always drift.
    #[test]
    fn test_env_value_change_is_drift(env in env_list(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!env.is_empty());
        let mut changed = env.clone();
        let i = pick.index(changed.len());
        changed[i].value.push('x');
        prop_assert!(env_changed(&env, &changed));
        prop_assert!(env_changed(&changed, &env));
    }

    /// Property: Any single scalar change on a proxy is drift.
    #[test]
    fn test_proxy_scalar_change_is_drift(
        port in 1i32..=65535,
        memory in "[1-9][0-9]{0,3}[MG]",
        exposure in any_exposure(),
    ) {
        let base = ProxySpecBuilder::new("edge").build();

        let mut other = base.clone();
        other.external_port = port;
        prop_assert_eq!(proxy_changed(&base, &other), port != base.external_port);

        let mut other = base.clone();
        other.memory_budget = memory.clone();
        prop_assert_eq!(proxy_changed(&base, &other), memory != base.memory_budget);

        let mut other = base.clone();
        other.exposure = exposure;
        prop_assert_eq!(proxy_changed(&base, &other), exposure != base.exposure);
    }

    /// Property: Drift detection is symmetric.
    #[test]
    fn test_drift_symmetric(a in env_list(), b in env_list(), port in 1i32..=65535) {
        let mut old = ComputeSpecBuilder::new("lobby-1").build();
        let mut new = old.clone();
        old.env_vars = a;
        new.env_vars = b;
        new.listen_port = port;
        prop_assert_eq!(compute_changed(&old, &new), compute_changed(&new, &old));
    }
}
