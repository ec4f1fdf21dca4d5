//! Reflection scenarios for the cluster-state reflector.

use gameserver_operator::client::ReflectedKind;
use gameserver_operator::controller::reflector::reflected_name;
use gameserver_operator::controller::{ClusterStateReflector, ReflectionReport};
use gameserver_operator::crd::{DATABASE_MANAGED_ANNOTATION, LAST_SYNCED_AT_ANNOTATION, REDACTED};
use gameserver_operator::desired::{ComputeSpec, ProxySpec};
use kube::core::DynamicObject;
use serde_json::json;

use crate::common::{ComputeSpecBuilder, ProxySpecBuilder, lobby_2g};
use crate::{Harness, NAMESPACE, Verb};

fn reflected(name: &str, internal_id: Option<&str>) -> DynamicObject {
    let mut object = DynamicObject::new(name, &ReflectedKind::ComputeInstance.api_resource())
        .within(NAMESPACE);
    object.data = match internal_id {
        Some(id) => json!({ "spec": {}, "status": { "phase": "Running", "internalId": id } }),
        None => json!({ "spec": {} }),
    };
    object
}

#[tokio::test]
async fn test_reflects_compute_with_redacted_token() {
    let h = Harness::new();
    h.store.set_compute(vec![
        ComputeSpecBuilder::new("Lobby-1")
            .token("super-secret")
            .env("MOTD", "hi")
            .build(),
    ]);
    let reflector = ClusterStateReflector::new(h.ctx.clone());

    let report = reflector.reflect_once::<ComputeSpec>().await.unwrap();

    assert_eq!(report.created, 1);
    let object = h
        .cluster
        .reflected(ReflectedKind::ComputeInstance, &reflected_name("Lobby-1"))
        .unwrap();
    assert_eq!(object.data["spec"]["accessToken"], REDACTED);
    assert_eq!(object.data["spec"]["envVars"][0]["key"], "MOTD");
    assert!(!object.data.to_string().contains("super-secret"));
    assert_eq!(object.data["status"]["internalId"], "Lobby-1");
    assert_eq!(object.data["status"]["phase"], "Running");

    let annotations = object.metadata.annotations.unwrap();
    assert_eq!(annotations[DATABASE_MANAGED_ANNOTATION], "true");
    assert!(
        annotations[LAST_SYNCED_AT_ANNOTATION]
            .parse::<jiff::Timestamp>()
            .is_ok()
    );
}

#[tokio::test]
async fn test_second_cycle_updates_in_place() {
    let h = Harness::new();
    h.store.set_compute(vec![lobby_2g()]);
    let reflector = ClusterStateReflector::new(h.ctx.clone());
    reflector.reflect_once::<ComputeSpec>().await.unwrap();

    let mut bigger = lobby_2g();
    bigger.memory_budget = "4G".to_string();
    h.store.set_compute(vec![bigger]);
    let report = reflector.reflect_once::<ComputeSpec>().await.unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.created, 0);
    assert_eq!(
        h.cluster.reflected_names(ReflectedKind::ComputeInstance),
        vec!["lobby-1".to_string()]
    );
    let object = h
        .cluster
        .reflected(ReflectedKind::ComputeInstance, "lobby-1")
        .unwrap();
    assert_eq!(object.data["spec"]["memoryBudget"], "4G");
}

#[tokio::test]
async fn test_refetches_before_replace() {
    let h = Harness::new();
    h.store.set_compute(vec![lobby_2g()]);
    let reflector = ClusterStateReflector::new(h.ctx.clone());
    reflector.reflect_once::<ComputeSpec>().await.unwrap();
    h.cluster.clear_calls();

    reflector.reflect_once::<ComputeSpec>().await.unwrap();

    let verbs: Vec<Verb> = h
        .cluster
        .calls()
        .iter()
        .filter(|call| call.name == "lobby-1")
        .map(|call| call.verb)
        .collect();
    assert_eq!(verbs, vec![Verb::Get, Verb::Replace, Verb::PatchStatus]);
}

#[tokio::test]
async fn test_keeps_existing_object_name() {
    let h = Harness::new();
    h.cluster.seed_reflected(
        ReflectedKind::ComputeInstance,
        reflected("hand-named", Some("lobby-1")),
    );
    h.store.set_compute(vec![lobby_2g()]);

    let report = ClusterStateReflector::new(h.ctx.clone())
        .reflect_once::<ComputeSpec>()
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(
        h.cluster.reflected_names(ReflectedKind::ComputeInstance),
        vec!["hand-named".to_string()]
    );
}

#[tokio::test]
async fn test_adopts_object_without_internal_id() {
    let h = Harness::new();
    h.cluster
        .seed_reflected(ReflectedKind::ComputeInstance, reflected("lobby-1", None));
    h.store.set_compute(vec![lobby_2g()]);

    let report = ClusterStateReflector::new(h.ctx.clone())
        .reflect_once::<ComputeSpec>()
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.failed, 0);
    let object = h
        .cluster
        .reflected(ReflectedKind::ComputeInstance, "lobby-1")
        .unwrap();
    assert_eq!(object.data["status"]["internalId"], "lobby-1");
}

#[tokio::test]
async fn test_deletes_orphans() {
    let h = Harness::new();
    h.store.set_compute(vec![
        ComputeSpecBuilder::new("a").build(),
        ComputeSpecBuilder::new("b").build(),
    ]);
    let reflector = ClusterStateReflector::new(h.ctx.clone());
    reflector.reflect_once::<ComputeSpec>().await.unwrap();

    h.store
        .set_compute(vec![ComputeSpecBuilder::new("b").build()]);
    let report = reflector.reflect_once::<ComputeSpec>().await.unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(
        h.cluster.reflected_names(ReflectedKind::ComputeInstance),
        vec!["b".to_string()]
    );
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_others() {
    let h = Harness::new();
    h.cluster
        .seed_reflected(ReflectedKind::ComputeInstance, reflected("gone", Some("gone")));
    h.cluster
        .seed_reflected(ReflectedKind::ComputeInstance, reflected("b", Some("b")));
    h.store.set_compute(vec![
        ComputeSpecBuilder::new("a").build(),
        ComputeSpecBuilder::new("b").build(),
        ComputeSpecBuilder::new("c").build(),
    ]);
    h.cluster.fail(Verb::Replace, "b", 500);

    let report = ClusterStateReflector::new(h.ctx.clone())
        .reflect_once::<ComputeSpec>()
        .await
        .unwrap();

    assert_eq!(
        report,
        ReflectionReport {
            created: 2,
            updated: 0,
            deleted: 1,
            failed: 1,
        }
    );
    assert_eq!(
        h.cluster.reflected_names(ReflectedKind::ComputeInstance),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[tokio::test]
async fn test_kinds_are_reflected_independently() {
    let h = Harness::new();
    h.store.set_compute(vec![lobby_2g()]);
    h.store
        .set_proxies(vec![ProxySpecBuilder::new("edge").build()]);
    let reflector = ClusterStateReflector::new(h.ctx.clone());

    let (compute, proxies) = reflector.run_cycle().await;

    assert_eq!(compute.unwrap().created, 1);
    assert_eq!(proxies.unwrap().created, 1);
    let proxy = h
        .cluster
        .reflected(ReflectedKind::ProxyInstance, "edge")
        .unwrap();
    assert_eq!(proxy.data["spec"]["externalAddress"], "play.example.com");
    assert_eq!(proxy.data["spec"]["accessToken"], REDACTED);

    // Proxy objects are never orphans of the compute kind
    h.store.set_compute(Vec::new());
    let report = reflector.reflect_once::<ProxySpec>().await.unwrap();
    assert_eq!(report.deleted, 0);
    assert_eq!(
        h.cluster.reflected_names(ReflectedKind::ProxyInstance),
        vec!["edge".to_string()]
    );
}

#[tokio::test]
async fn test_store_failure_aborts_only_that_cycle() {
    let h = Harness::new();
    h.store.set_compute(vec![lobby_2g()]);
    let reflector = ClusterStateReflector::new(h.ctx.clone());
    reflector.reflect_once::<ComputeSpec>().await.unwrap();

    h.store.set_failing(true);
    assert!(reflector.reflect_once::<ComputeSpec>().await.is_err());
    assert_eq!(reflector.run_cycle().await, (None, None));
    // Nothing was deleted while the database was unreachable
    assert_eq!(
        h.cluster.reflected_names(ReflectedKind::ComputeInstance),
        vec!["lobby-1".to_string()]
    );
}

#[tokio::test]
async fn test_unstamped_object_is_swept_after_row_removal() {
    let h = Harness::new();
    h.store.set_compute(vec![
        ComputeSpecBuilder::new("a").build(),
        ComputeSpecBuilder::new("b").build(),
    ]);
    h.cluster.fail(Verb::PatchStatus, "a", 500);
    let reflector = ClusterStateReflector::new(h.ctx.clone());

    let report = reflector.reflect_once::<ComputeSpec>().await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 1);
    let a = h.cluster.reflected(ReflectedKind::ComputeInstance, "a").unwrap();
    assert!(a.data.get("status").is_none());

    h.cluster.clear_failures();
    h.store.set_compute(vec![ComputeSpecBuilder::new("b").build()]);
    let report = reflector.reflect_once::<ComputeSpec>().await.unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(
        h.cluster.reflected_names(ReflectedKind::ComputeInstance),
        vec!["b".to_string()]
    );
}

#[tokio::test]
async fn test_unlabelled_object_without_internal_id_is_left_alone() {
    let h = Harness::new();
    h.cluster
        .seed_reflected(ReflectedKind::ComputeInstance, reflected("manual", None));

    let report = ClusterStateReflector::new(h.ctx.clone())
        .reflect_once::<ComputeSpec>()
        .await
        .unwrap();

    assert_eq!(report.deleted, 0);
    assert_eq!(
        h.cluster.reflected_names(ReflectedKind::ComputeInstance),
        vec!["manual".to_string()]
    );
}

#[tokio::test]
async fn test_similar_ids_reflect_to_separate_objects() {
    let h = Harness::new();
    h.store.set_compute(vec![
        ComputeSpecBuilder::new("lobby_1").build(),
        ComputeSpecBuilder::new("lobby-1").build(),
    ]);
    let reflector = ClusterStateReflector::new(h.ctx.clone());

    let report = reflector.reflect_once::<ComputeSpec>().await.unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(h.cluster.reflected_names(ReflectedKind::ComputeInstance).len(), 2);

    h.store
        .set_compute(vec![ComputeSpecBuilder::new("lobby-1").build()]);
    let report = reflector.reflect_once::<ComputeSpec>().await.unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(report.updated, 1);
    let object = h
        .cluster
        .reflected(ReflectedKind::ComputeInstance, "lobby-1")
        .unwrap();
    assert_eq!(object.data["status"]["internalId"], "lobby-1");
    assert_eq!(
        h.cluster.reflected_names(ReflectedKind::ComputeInstance),
        vec!["lobby-1".to_string()]
    );
}
