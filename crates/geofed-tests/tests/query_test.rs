//! Counts, bounds and filter routing across backends

use std::sync::Arc;

use geofed_aggregate::{AggregateError, AggregatingStore, BackendRegistry};
use geofed_core::{
    AttributeDescriptor, BackendError, BackendRef, Crs, Envelope, Expression, Feature,
    FeatureBackend, Filter, Geometry, Query, Schema, ValueType,
};
use geofed_memory::MemoryBackend;
use geofed_tests::{refs, Fixture, BASIC_POLYGONS, ROAD_SEGMENTS};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn envelope(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Envelope {
    Envelope::new(min_x, max_x, min_y, max_y, Crs::wgs84())
}

fn long_id() -> Filter {
    Filter::greater(Expression::str_length(Expression::property("ID")), 3)
}

#[tokio::test]
async fn test_count_is_sum_of_backend_counts() {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1", "store2", "gt:store3"]).await;

    for type_name in store.get_type_names().unwrap() {
        let config = store.get_type_configuration(&type_name).unwrap();
        let mut expected = 0;
        for (backend_ref, native) in config.store_map() {
            let backend = fixture.registry.get(backend_ref).unwrap();
            expected += backend.get_count(native, &Filter::Include).await.unwrap();
        }
        let source = store.get_feature_source(&type_name).unwrap();
        assert_eq!(source.count(&Filter::Include).await.unwrap(), expected, "{type_name}");
    }
}

#[tokio::test]
async fn test_bounds_union_across_backends() {
    let fixture = Fixture::new();

    let store = fixture.configured(&["store1"]).await;
    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();
    assert_eq!(
        source.bounds(&Filter::Include).await.unwrap(),
        Some(envelope(-2.0, 2.0, -1.0, 6.0))
    );

    let store = fixture.configured(&["store1", "store2", "gt:store3"]).await;
    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();
    assert_eq!(
        source.bounds(&Filter::Include).await.unwrap(),
        Some(envelope(-2.0, 4.0, -1.0, 6.0))
    );
}

#[rstest]
#[case("two", envelope(-2.0, 1.0, 3.0, 6.0))]
#[case("four", envelope(2.0, 4.0, 2.0, 4.0))]
#[tokio::test]
async fn test_bounds_of_single_subregion(#[case] id: &str, #[case] expected: Envelope) {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1", "store2", "gt:store3"]).await;
    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();
    assert_eq!(
        source.bounds(&Filter::equals("ID", id)).await.unwrap(),
        Some(expected)
    );
}

#[tokio::test]
async fn test_bounds_empty_when_nothing_matches() {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1", "store2"]).await;
    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();
    assert_eq!(source.bounds(&Filter::equals("ID", "five")).await.unwrap(), None);
    assert_eq!(source.bounds(&Filter::Exclude).await.unwrap(), None);
}

#[rstest]
#[case(&["store1"], 1)]
#[case(&["store1", "store2", "gt:store3"], 2)]
#[tokio::test]
async fn test_function_filter_pushed_to_every_backend(#[case] order: &[&str], #[case] expected: u64) {
    let fixture = Fixture::new();
    let store = fixture.configured(order).await;
    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();
    assert_eq!(source.count(&long_id()).await.unwrap(), expected);

    let features = source
        .features(Query::all(BASIC_POLYGONS).with_filter(long_id()))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(features.len() as u64, expected);
}

#[rstest]
#[case(&["store1"])]
#[case(&["store1", "store2", "gt:store3"])]
#[tokio::test]
async fn test_missing_attribute_suppresses_backend(#[case] order: &[&str]) {
    let fixture = Fixture::new();
    let store = fixture.configured(order).await;
    let source = store.get_feature_source(ROAD_SEGMENTS).unwrap();
    let main_street = Filter::equals("NAME", "Main Street");

    assert_eq!(source.count(&main_street).await.unwrap(), 1);
    let features = source
        .features(Query::all(ROAD_SEGMENTS).with_filter(main_street.clone()))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    let ids: Vec<_> = features.iter().map(|f| f.id()).collect();
    assert_eq!(ids, vec!["RoadSegments.r1"]);

    // store3 lacks NAME and is never asked for anything
    assert_eq!(fixture.store3.stats().opened(), 0);
    assert_eq!(
        source
            .bounds(&Filter::negate(main_street))
            .await
            .unwrap(),
        Some(envelope(1.0, 2.0, 0.0, 2.0))
    );
}

#[tokio::test]
async fn test_suppressed_backend_failure_is_invisible() {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1", "gt:store3"]).await;
    fixture.store3.set_fail_reads(true);

    let source = store.get_feature_source(ROAD_SEGMENTS).unwrap();
    assert_eq!(source.count(&Filter::equals("NAME", "Route 5")).await.unwrap(), 1);

    let err = source.count(&Filter::Include).await.unwrap_err();
    assert_eq!(err.backend().map(ToString::to_string).as_deref(), Some("gt:store3"));
}

#[rstest]
#[case(Filter::Include)]
#[case(Filter::Exclude)]
#[case(long_id())]
#[case(Filter::equals("DESCRIPTION", "square"))]
#[case(Filter::or(vec![Filter::equals("ID", "one"), Filter::equals("ID", "four")]))]
#[case(Filter::bbox(envelope(1.5, 3.0, 1.5, 3.0)))]
#[tokio::test]
async fn test_stream_size_matches_count(#[case] filter: Filter) {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1", "store2", "gt:store3"]).await;
    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();

    let count = source.count(&filter).await.unwrap();
    let features = source
        .features(Query::all(BASIC_POLYGONS).with_filter(filter))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(features.len() as u64, count);
    fixture.assert_all_cursors_closed();
}

#[tokio::test]
async fn test_backend_failure_fails_whole_query() {
    let fixture = Fixture::new();
    let store = fixture.configured(&["store1", "store2"]).await;
    fixture.store2.set_fail_reads(true);
    let source = store.get_feature_source(BASIC_POLYGONS).unwrap();

    for result in [
        source.count(&Filter::Include).await.map(|_| ()),
        source.bounds(&Filter::Include).await.map(|_| ()),
    ] {
        match result.unwrap_err() {
            AggregateError::BackendRead { backend, source } => {
                assert_eq!(backend, BackendRef::new("store2"));
                assert!(source.is_transient());
            }
            other => panic!("expected read error, got {other}"),
        }
    }

    let err = source
        .features(Query::all(BASIC_POLYGONS))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregateError::BackendRead { ref backend, source: BackendError::Io(_) } if backend.name() == "store2"
    ));
    fixture.assert_all_cursors_closed();
}

#[tokio::test]
async fn test_bounds_reprojected_to_canonical_crs() {
    let fixture = Fixture::new();

    // A backend storing BasicPolygons in Web Mercator
    let mercator = MemoryBackend::new(BackendRef::new("mercator"));
    let schema = mercator.add_type(Schema::new(
        BASIC_POLYGONS,
        vec![
            AttributeDescriptor::geometry("the_geom", Crs::web_mercator()),
            AttributeDescriptor::new("ID", ValueType::String),
        ],
    ));
    let square = envelope(5.0, 6.0, 5.0, 6.0)
        .reproject(&Crs::web_mercator())
        .unwrap();
    mercator
        .add_feature(
            BASIC_POLYGONS,
            Feature::new("m1", Arc::clone(&schema))
                .with(
                    "the_geom",
                    Geometry::rectangle(square.min_x, square.min_y, square.max_x, square.max_y),
                )
                .with("ID", "five"),
        )
        .unwrap();

    let mut registry = BackendRegistry::new();
    registry.register(
        fixture.store1.backend_ref().clone(),
        Arc::clone(&fixture.store1) as Arc<dyn FeatureBackend>,
    );
    registry.register(BackendRef::new("mercator"), Arc::new(mercator));
    let store = AggregatingStore::new(Arc::new(registry), Default::default());
    store
        .auto_configure_stores(&refs(&["store1", "mercator"]))
        .await
        .unwrap();

    let bounds = store
        .get_feature_source(BASIC_POLYGONS)
        .unwrap()
        .bounds(&Filter::Include)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bounds.crs, Crs::wgs84());
    assert_eq!((bounds.min_x, bounds.min_y), (-2.0, -1.0));
    assert!((bounds.max_x - 6.0).abs() < 1e-9, "max_x = {}", bounds.max_x);
    assert!((bounds.max_y - 6.0).abs() < 1e-9, "max_y = {}", bounds.max_y);
}
