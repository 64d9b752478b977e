//! Tests for MVT decoding into typed layers.

use renderer::{decode_tile, Geometry, Point};
use test_utils::{encode_tile, malformed_tile, MvtLayer};
use tile_common::TileError;

#[test]
fn test_decode_layers_in_order() {
    let bytes = encode_tile(vec![
        MvtLayer::new("overview").point(10, 20, false),
        MvtLayer::new("sequence").extent(512).line(&[(0, 0), (5, 5)], true),
    ]);
    let layers = decode_tile(&bytes).unwrap();

    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].name, "overview");
    assert_eq!(layers[0].extent, 4096);
    assert_eq!(layers[1].name, "sequence");
    assert_eq!(layers[1].extent, 512);
    assert!(layers[1].features[0].is_pano);
}

#[test]
fn test_missing_extent_defaults_to_4096() {
    let bytes = encode_tile(vec![MvtLayer::new("image").without_extent().point(1, 1, false)]);
    let layers = decode_tile(&bytes).unwrap();
    assert_eq!(layers[0].extent, 4096);
}

#[test]
fn test_zero_extent_is_rejected() {
    let bytes = encode_tile(vec![MvtLayer::new("image").extent(0)]);
    assert!(matches!(decode_tile(&bytes), Err(TileError::Decode(_))));
}

#[test]
fn test_point_geometry_and_pano_flag() {
    let bytes = encode_tile(vec![MvtLayer::new("image")
        .point(100, 200, true)
        .point(-5, 7, false)
        .untagged_point(3, 3)]);
    let features = &decode_tile(&bytes).unwrap()[0].features;

    assert_eq!(features.len(), 3);
    assert_eq!(features[0].geometry, Geometry::Point(Point::new(100.0, 200.0)));
    assert!(features[0].is_pano);
    assert_eq!(features[1].geometry, Geometry::Point(Point::new(-5.0, 7.0)));
    assert!(!features[1].is_pano);
    assert!(!features[2].is_pano);
}

#[test]
fn test_multipoint_splits_into_points() {
    let bytes = encode_tile(vec![MvtLayer::new("image").multi_point(&[(1, 1), (4, 9), (0, 2)], true)]);
    let features = &decode_tile(&bytes).unwrap()[0].features;

    let points: Vec<_> = features.iter().map(|f| f.geometry.clone()).collect();
    assert_eq!(
        points,
        vec![
            Geometry::Point(Point::new(1.0, 1.0)),
            Geometry::Point(Point::new(4.0, 9.0)),
            Geometry::Point(Point::new(0.0, 2.0)),
        ]
    );
    assert!(features.iter().all(|f| f.is_pano));
}

#[test]
fn test_line_and_multiline() {
    let bytes = encode_tile(vec![MvtLayer::new("sequence")
        .line(&[(0, 0), (10, 0), (10, 10)], false)
        .multi_line(&[&[(0, 0), (1, 1)], &[(5, 5), (6, 8)]], false)]);
    let features = &decode_tile(&bytes).unwrap()[0].features;

    assert_eq!(
        features[0].geometry,
        Geometry::LineString(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)])
    );
    assert_eq!(
        features[1].geometry,
        Geometry::MultiLineString(vec![
            vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            vec![Point::new(5.0, 5.0), Point::new(6.0, 8.0)],
        ])
    );
}

#[test]
fn test_polygons_and_untyped_features_are_dropped() {
    let bytes = encode_tile(vec![MvtLayer::new("image")
        .polygon(&[(0, 0), (10, 0), (10, 10)])
        .raw_feature(0, vec![9, 2, 2], vec![])
        .point(1, 1, false)]);
    let features = &decode_tile(&bytes).unwrap()[0].features;
    assert_eq!(features.len(), 1);
}

#[test]
fn test_malformed_payload() {
    assert!(matches!(decode_tile(&malformed_tile()), Err(TileError::Decode(_))));
    assert!(matches!(decode_tile(b"not a vector tile"), Err(TileError::Decode(_))));
}

#[test]
fn test_bad_geometry_and_tags() {
    let truncated = encode_tile(vec![MvtLayer::new("image").raw_feature(1, vec![9, 4], vec![0, 0])]);
    assert!(matches!(decode_tile(&truncated), Err(TileError::Decode(_))));

    let bad_value = encode_tile(vec![MvtLayer::new("image").raw_feature(1, vec![9, 2, 2], vec![0, 9])]);
    assert!(matches!(decode_tile(&bad_value), Err(TileError::Decode(_))));
}

#[test]
fn test_empty_payload_has_no_layers() {
    assert!(decode_tile(&[]).unwrap().is_empty());
}
