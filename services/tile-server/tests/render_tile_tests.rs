//! Tests for rendering a single tile to disk, as the `render-tile` tool does.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;

use common::{config_for, MockUpstream};
use test_utils::{decode_png, origin_image_tile, pixel};
use tile_common::TileCoord;
use tile_server::TilePipeline;

#[tokio::test]
async fn test_render_to_file_writes_png() {
    let upstream = MockUpstream::serving(origin_image_tile()).start().await;
    let pipeline = TilePipeline::new(Arc::new(config_for(&upstream))).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("tile.png");
    let written = pipeline
        .render_to_file(TileCoord::new(10, 5, 3), &out)
        .await
        .unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(bytes.len(), written);
    let img = decode_png(&bytes);
    assert_eq!((img.width(), img.height()), (256, 256));
    assert_eq!(pixel(&img, 1, 1), [0, 100, 0, 255]);
}

#[tokio::test]
async fn test_render_to_file_leaves_no_file_on_failure() {
    let upstream = MockUpstream::serving(Vec::new())
        .always_fail(StatusCode::INTERNAL_SERVER_ERROR)
        .start()
        .await;
    let pipeline = TilePipeline::new(Arc::new(config_for(&upstream))).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("tile.png");
    let result = pipeline.render_to_file(TileCoord::new(4, 2, 2), &out).await;

    assert!(result.is_err());
    assert!(!out.exists());
}

#[tokio::test]
async fn test_render_to_file_rejects_invalid_tile() {
    let upstream = MockUpstream::serving(origin_image_tile()).start().await;
    let pipeline = TilePipeline::new(Arc::new(config_for(&upstream))).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let err = pipeline
        .render_to_file(TileCoord::new(3, 8, 0), &dir.path().join("tile.png"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid tile"));
    assert_eq!(upstream.requests(), 0);
}
