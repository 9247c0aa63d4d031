mod common;

use chrono::NaiveDate;
use common::{ConfigOption, Plugin};
use pier_data::prelude::*;
use pier_data::{Adapter, Found, Operator};

async fn options() -> (std::sync::Arc<pier_data_sqlx::SqliteAdapter>, DataManager<ConfigOption>) {
    let adapter = common::adapter().await;
    let manager = DataManager::new(adapter.clone()).unwrap();
    (adapter, manager)
}

async fn seed(manager: &DataManager<ConfigOption>, count: usize) {
    for i in 1..=count {
        let mut option = ConfigOption::new(&format!("option_{i:02}"), &i.to_string());
        manager.save(&mut option).await.unwrap();
    }
}

#[tokio::test]
async fn test_insert_find_and_delete() {
    let (_adapter, options) = options().await;

    let mut option = ConfigOption::new("max_upload_size", "1024");
    options.save(&mut option).await.unwrap();
    assert!(!option.new);
    assert_eq!(option.id, Some(1));

    let found = options
        .find_one(&QueryArgs::new().where_eq("name", "max_upload_size"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.value.as_deref(), Some("1024"));
    assert_eq!(found.category_name, "general");
    assert!(!found.is_system);

    assert!(options
        .delete(&Conditions::eq("name", "max_upload_size"))
        .await
        .unwrap());
    assert!(options
        .find_one(&QueryArgs::new().where_eq("name", "max_upload_size"))
        .await
        .unwrap()
        .is_none());
    assert!(!options
        .delete(&Conditions::eq("name", "max_upload_size"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_delete_all() {
    let (_adapter, options) = options().await;
    seed(&options, 5).await;
    assert_eq!(options.count(None).await.unwrap(), 5);
    assert_eq!(options.delete_all().await.unwrap(), 5);
    assert_eq!(options.count(None).await.unwrap(), 0);
    assert_eq!(options.cached_len(), 0);
}

#[tokio::test]
async fn test_find_variants() {
    let (_adapter, options) = options().await;
    seed(&options, 4).await;

    let all = options.find_all(&QueryArgs::new()).await.unwrap();
    assert_eq!(
        all.iter().map(|o| o.id.unwrap()).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );

    let newest = options
        .find(
            &QueryArgs::new()
                .order_by("id", Direction::Desc)
                .limit(2),
        )
        .await
        .unwrap()
        .into_vec();
    assert_eq!(newest.len(), 2);
    assert_eq!(newest[0].name, "option_04");

    let single = options
        .find(&QueryArgs::new().one().where_op("id", Operator::Gt, 2i64))
        .await
        .unwrap();
    assert!(matches!(single, Found::One(Some(ref o)) if o.id == Some(3)));

    let picked = options
        .find_all(&QueryArgs::new().where_op(
            "name",
            Operator::In,
            Value::List(vec!["option_01".into(), "option_03".into()]),
        ))
        .await
        .unwrap();
    assert_eq!(picked.len(), 2);

    let raw = options
        .find_all(&QueryArgs::new().conditions("value >= '3'").order_raw("name DESC"))
        .await
        .unwrap();
    assert_eq!(raw.first().map(|o| o.name.as_str()), Some("option_04"));

    assert_eq!(
        options
            .count(Some(&Conditions::eq("value", Value::Null)))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_unknown_column_rejected_before_query() {
    let (adapter, options) = options().await;
    let err = options
        .find_all(&QueryArgs::new().where_eq("nope", 1i64))
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::InvalidArgument(_)));
    assert!(adapter.last_error().is_none());
}

#[tokio::test]
async fn test_find_by_id_cache_and_force_reload() {
    let (adapter, options) = options().await;
    seed(&options, 1).await;
    options.clear_cache();

    let first = options.find_by_id(&Key::from(1i64), false).await.unwrap().unwrap();
    assert_eq!(first.value.as_deref(), Some("1"));
    assert_eq!(options.cached_len(), 1);

    adapter
        .execute("UPDATE config_options SET value = 'changed' WHERE id = 1")
        .await
        .unwrap();

    let cached = options.find_by_id(&Key::from(1i64), false).await.unwrap().unwrap();
    assert_eq!(cached.value.as_deref(), Some("1"));

    let fresh = options.find_by_id(&Key::from(1i64), true).await.unwrap().unwrap();
    assert_eq!(fresh.value.as_deref(), Some("changed"));
    let cached = options.find_by_id(&Key::from(1i64), false).await.unwrap().unwrap();
    assert_eq!(cached.value.as_deref(), Some("changed"));

    adapter.execute("DELETE FROM config_options").await.unwrap();
    assert!(options.find_by_id(&Key::from(1i64), true).await.unwrap().is_none());
    assert_eq!(options.cached_len(), 0);
    assert!(options.find_by_id(&Key::from(42i64), false).await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_by_id_rejects_wrong_arity() {
    let (_adapter, options) = options().await;
    let err = options
        .find_by_id(&Key::from((1i64, 2i64)), false)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_paginate() {
    let (_adapter, options) = options().await;
    seed(&options, 7).await;

    let page = options.paginate(&QueryArgs::new(), 3, 2).await.unwrap();
    assert_eq!(page.pagination.total_items, 7);
    assert_eq!(page.pagination.page_count, 3);
    assert_eq!(page.pagination.current_page, 2);
    assert_eq!(
        page.content.iter().map(|o| o.id.unwrap()).collect::<Vec<_>>(),
        vec![4, 5, 6]
    );

    let last = options.paginate(&QueryArgs::new(), 3, 3).await.unwrap();
    assert_eq!(last.content.len(), 1);
    assert!(!last.pagination.has_next());

    let beyond = options.paginate(&QueryArgs::new(), 3, 9).await.unwrap();
    assert!(beyond.is_empty());
    assert_eq!(beyond.pagination.current_page, 3);

    let filtered = options
        .paginate(&QueryArgs::new().where_op("id", Operator::LtEq, 2i64), 5, 1)
        .await
        .unwrap();
    assert_eq!(filtered.pagination.total_items, 2);
    assert_eq!(filtered.content.len(), 2);

    assert!(options.paginate(&QueryArgs::new(), 0, 1).await.is_err());
}

#[tokio::test]
async fn test_update_and_reload() {
    let (_adapter, options) = options().await;
    let mut option = ConfigOption::new("site_name", "Pier");
    options.save(&mut option).await.unwrap();

    option.value = Some("Harbour".into());
    option.is_system = true;
    options.save(&mut option).await.unwrap();
    assert_eq!(options.count(None).await.unwrap(), 1);

    let mut stale = option.clone();
    stale.value = None;
    options.reload(&mut stale).await.unwrap();
    assert_eq!(stale, option);

    assert!(options.delete_entity(&option).await.unwrap());
    assert!(matches!(
        options.reload(&mut stale).await,
        Err(DataError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_values_with_nul_bytes() {
    let (_adapter, options) = options().await;
    let mut option = ConfigOption::new("nul", "a\0b");
    options.save(&mut option).await.unwrap();

    let found = options
        .find_one(&QueryArgs::new().where_eq("value", "a\0b"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "nul");
    assert_eq!(found.value.as_deref(), Some("a\0b"));
}

#[tokio::test]
async fn test_constraint_violation_surfaces_query_error() {
    let (adapter, options) = options().await;
    let mut first = ConfigOption::new("dup", "a");
    options.save(&mut first).await.unwrap();

    let mut second = ConfigOption::new("dup", "b");
    let err = options.save(&mut second).await.unwrap_err();
    assert!(matches!(err, DataError::Query { .. }));
    assert!(second.new);
    assert!(adapter.last_error().unwrap().contains("UNIQUE"));
}

#[tokio::test]
async fn test_text_primary_key_with_booleans_and_timestamps() {
    let adapter = common::adapter().await;
    let plugins = DataManager::<Plugin>::new(adapter).unwrap();

    let installed = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_opt(13, 45, 7)
        .unwrap();
    let mut files = Plugin::new("files", 3);
    files.is_enabled = true;
    files.installed_on = Some(installed);
    plugins.save(&mut files).await.unwrap();

    let mut tickets = Plugin::new("O'Reilly tickets", 1);
    plugins.save(&mut tickets).await.unwrap();

    let loaded = plugins.find_by_id(&Key::from("files"), true).await.unwrap().unwrap();
    assert!(loaded.is_enabled);
    assert_eq!(loaded.installed_on, Some(installed));
    assert_eq!(loaded.version, 3);

    let quoted = plugins
        .find_by_id(&Key::from("O'Reilly tickets"), false)
        .await
        .unwrap()
        .unwrap();
    assert!(!quoted.is_enabled);
    assert_eq!(quoted.installed_on, None);

    let enabled = plugins
        .count(Some(&Conditions::eq("is_enabled", true)))
        .await
        .unwrap();
    assert_eq!(enabled, 1);
}
