//! Title catalog lifecycle: bootstrap, define, remove, list.

mod common;

use tagforge::TagError;

#[tokio::test]
async fn first_run_bootstraps_default_titles() {
    let tmp = tempfile::tempdir().unwrap();
    let (service, _rx) = common::service_in(tmp.path());

    let titles = service.list_titles().await;
    assert!(titles.iter().any(|(id, _)| id == "default"));
    let def = service.resolve_title("default").await.unwrap();
    assert_eq!(def.required_permission_level, 0);

    // the bootstrap set is persisted immediately
    assert!(tmp.path().join("titles.json").exists());
}

#[tokio::test]
async fn define_persists_and_rejects_duplicates() {
    let tmp = tempfile::tempdir().unwrap();
    let (service, _rx) = common::service_in(tmp.path());

    service
        .define_title("champion", "§e[Champion] §r{player}", 1, None, "admin")
        .await
        .unwrap();
    let err = service
        .define_title("champion", "other", 0, None, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, TagError::DuplicateTitle(id) if id == "champion"));

    // a fresh service over the same dir sees the new title
    drop(service);
    let (reopened, _rx) = common::service_in(tmp.path());
    let def = reopened.resolve_title("champion").await.unwrap();
    assert_eq!(def.display_template, "§e[Champion] §r{player}");
    assert_eq!(def.created_by, "admin");
}

#[tokio::test]
async fn list_returns_definition_order() {
    let tmp = tempfile::tempdir().unwrap();
    let (service, _rx) = common::service_in(tmp.path());

    service
        .define_title("zz-last", "z", 0, None, "admin")
        .await
        .unwrap();
    service
        .define_title("aa-first", "a", 0, None, "admin")
        .await
        .unwrap();

    let order: Vec<String> = service
        .list_titles()
        .await
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    let zz = order.iter().position(|id| id == "zz-last").unwrap();
    let aa = order.iter().position(|id| id == "aa-first").unwrap();
    assert!(zz < aa, "later definition must list later: {:?}", order);
}

#[tokio::test]
async fn remove_does_not_cascade_into_profiles() {
    let tmp = tempfile::tempdir().unwrap();
    let (service, _rx) = common::service_in(tmp.path());

    service
        .define_title("temp", "[T] {player}", 0, None, "admin")
        .await
        .unwrap();
    service.grant("Steve", "temp").await.unwrap();
    service.set_active("Steve", "temp").await.unwrap();

    service.remove_title("temp").await.unwrap();
    let err = service.remove_title("temp").await.unwrap_err();
    assert!(matches!(err, TagError::TitleNotFound(_)));

    // the profile keeps the dangling id but resolves to the bare name
    let profile = service.profile("Steve").await.unwrap();
    assert_eq!(profile.active_title_id.as_deref(), Some("temp"));
    assert_eq!(service.display_for("Steve").await, "Steve");
}
