//! Catalog building, canonical schema selection and store lifecycle

use geofed_aggregate::{AggregateConfig, AggregateError};
use geofed_core::{BackendError, Filter};
use geofed_tests::{
    polygons_schema, refs, roads_schema, Fixture, BASIC_POLYGONS, ROAD_SEGMENTS, STREAMS,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case(&["store1"], &[BASIC_POLYGONS, ROAD_SEGMENTS])]
#[case(&["store1", "store2", "gt:store3"], &[BASIC_POLYGONS, ROAD_SEGMENTS, STREAMS])]
#[case(&["gt:store3", "store2", "store1"], &[ROAD_SEGMENTS, BASIC_POLYGONS, STREAMS])]
#[case(&["store2", "store1"], &[BASIC_POLYGONS, STREAMS, ROAD_SEGMENTS])]
fn test_type_names_first_seen_union(#[case] order: &[&str], #[case] expected: &[&str]) {
    let fixture = Fixture::new();
    let names = tokio_test::block_on(async {
        fixture.configured(order).await.get_type_names().unwrap()
    });
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_store_map_follows_configuration_order() {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1", "store2", "gt:store3"]).await;

    let roads = store.get_type_configuration(ROAD_SEGMENTS).unwrap();
    let map: Vec<String> = roads
        .store_map()
        .map(|(backend, native)| format!("{} -> {}", backend, native))
        .collect();
    assert_eq!(map, vec!["store1 -> RoadSegments", "gt:store3 -> RoadSegments"]);

    let polygons = store.get_type_configuration(BASIC_POLYGONS).unwrap();
    assert_eq!(polygons.store_count(), 2);
    assert_eq!(polygons.native_name(&"store2".parse().unwrap()), Some(BASIC_POLYGONS));
    assert!(!polygons.contains(&"gt:store3".parse().unwrap()));
}

#[tokio::test]
async fn test_single_backend_example() {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1"]).await;

    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();
    assert_eq!(source.count(&Filter::Include).await.unwrap(), 3);
    assert_eq!(*store.get_schema(BASIC_POLYGONS).await.unwrap(), polygons_schema(false));
}

#[tokio::test]
async fn test_first_configured_schema_wins() {
    let fixture = Fixture::new();

    let store = fixture.configured(&["store1", "store2", "gt:store3"]).await;
    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();
    assert_eq!(source.count(&Filter::Include).await.unwrap(), 4);
    assert_eq!(*store.get_schema(BASIC_POLYGONS).await.unwrap(), polygons_schema(false));
    assert_eq!(*store.get_schema(ROAD_SEGMENTS).await.unwrap(), roads_schema(true));

    store
        .auto_configure_stores(&refs(&["store2", "gt:store3", "store1"]))
        .await
        .unwrap();
    assert_eq!(*store.get_schema(BASIC_POLYGONS).await.unwrap(), polygons_schema(true));

    store
        .auto_configure_stores(&refs(&["gt:store3", "store2", "store1"]))
        .await
        .unwrap();
    assert_eq!(*store.get_schema(ROAD_SEGMENTS).await.unwrap(), roads_schema(false));
}

#[tokio::test]
async fn test_queries_before_configure_fail() {
    let fixture = Fixture::new();
    let store = fixture.store();

    assert!(matches!(store.get_type_names(), Err(AggregateError::NotConfigured)));
    assert!(matches!(
        store.get_feature_source(BASIC_POLYGONS),
        Err(AggregateError::NotConfigured)
    ));
}

#[tokio::test]
async fn test_reset_then_query_is_not_configured() {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1", "store2"]).await;
    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();
    assert_eq!(source.count(&Filter::Include).await.unwrap(), 4);

    store.reset_configuration().await;
    assert!(matches!(store.get_type_names(), Err(AggregateError::NotConfigured)));
    assert!(matches!(
        store.get_schema(BASIC_POLYGONS).await,
        Err(AggregateError::NotConfigured)
    ));
    assert!(matches!(
        source.count(&Filter::Include).await,
        Err(AggregateError::NotConfigured)
    ));
    assert!(matches!(
        source.bounds(&Filter::Include).await,
        Err(AggregateError::NotConfigured)
    ));

    store.auto_configure_stores(&refs(&["store1"])).await.unwrap();
    assert_eq!(source.count(&Filter::Include).await.unwrap(), 3);
}

#[tokio::test]
async fn test_unknown_type() {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1"]).await;
    assert!(matches!(
        store.get_schema(STREAMS).await,
        Err(AggregateError::UnknownType(name)) if name == STREAMS
    ));
}

#[tokio::test]
async fn test_listing_failure_leaves_no_partial_catalog() {
    let fixture = Fixture::new();
    fixture.store2.set_fail_listing(true);
    let store = fixture.store();

    let err = store
        .auto_configure_stores(&refs(&["store1", "store2"]))
        .await
        .unwrap_err();
    match err {
        AggregateError::Configuration { backend, source } => {
            assert_eq!(backend.to_string(), "store2");
            assert!(matches!(source, BackendError::Io(_)));
        }
        other => panic!("expected configuration error, got {other}"),
    }
    assert!(!store.is_configured());
}

#[tokio::test]
async fn test_unknown_backend_in_order() {
    let fixture = Fixture::new();
    let err = fixture
        .store()
        .auto_configure_stores(&refs(&["store1", "gt:store9"]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown backend: gt:store9");
}

#[tokio::test]
async fn test_eager_schemas_report_failures_at_configure_time() {
    let fixture = Fixture::new();
    fixture.store3.set_fail_schema(true);

    let lazy = fixture.store();
    lazy.auto_configure_stores(&refs(&["store1", "gt:store3"]))
        .await
        .unwrap();
    // The canonical schema comes from store1, so store3 is never asked
    assert_eq!(*lazy.get_schema(ROAD_SEGMENTS).await.unwrap(), roads_schema(true));

    let eager = fixture.store_with(AggregateConfig {
        eager_schemas: true,
        ..AggregateConfig::default()
    });
    let err = eager
        .auto_configure_stores(&refs(&["store1", "gt:store3"]))
        .await
        .unwrap_err();
    assert_eq!(err.backend().map(ToString::to_string).as_deref(), Some("gt:store3"));
}
