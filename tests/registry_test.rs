//! Integration tests for frame requests gated by an HTTP device registry.

#![cfg(unix)]

mod common;

use std::sync::Arc;

use common::{fake_transcoder, writes_frames, DEVICE};
use ds_av::ToolRegistry;
use ds_core::config::Config;
use ds_server::context::AppContext;
use reqwest::StatusCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(registry: &MockServer, scratch: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.registry.base_url = Some(registry.uri());
    config.registry.timeout_secs = 2;
    config.streams.frames_dir = scratch.join("frames");
    config.frames.timeout_secs = 5;
    config.tools.ffmpeg_path = Some(fake_transcoder(scratch, &writes_frames(2)));
    config
}

async fn serve_with(config: Config) -> std::net::SocketAddr {
    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    let ctx = AppContext::from_config(config, tools).unwrap();
    common::serve(ctx).await
}

#[tokio::test]
async fn streaming_device_in_registry_gets_frames() {
    let registry = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/devices/{DEVICE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": DEVICE,
            "name": "dock camera",
            "deviceStatus": true,
            "streamingStatus": true,
            "lastStreamingDate": "2024-05-01T12:00:00"
        })))
        .expect(1)
        .mount(&registry)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let addr = serve_with(config_for(&registry, scratch.path())).await;

    let resp = reqwest::get(format!("http://{addr}/api/stream/{DEVICE}/frames/2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let uris: Vec<String> = resp.json().await.unwrap();
    assert_eq!(uris.len(), 2);
}

#[tokio::test]
async fn registry_says_not_streaming() {
    let registry = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": DEVICE,
            "streamingStatus": false
        })))
        .mount(&registry)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let addr = serve_with(config_for(&registry, scratch.path())).await;

    let resp = reqwest::get(format!("http://{addr}/api/stream/{DEVICE}/frames/2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(!scratch.path().join("frames").exists());
}

#[tokio::test]
async fn registry_unknown_device_and_outage_are_404() {
    let registry = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/devices/{DEVICE}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&registry)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&registry)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let addr = serve_with(config_for(&registry, scratch.path())).await;

    let unknown = reqwest::get(format!("http://{addr}/api/stream/{DEVICE}/frames/2"))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let outage = reqwest::get(format!(
        "http://{addr}/api/stream/33333333-3333-3333-3333-333333333333/frames/2"
    ))
    .await
    .unwrap();
    assert_eq!(outage.status(), StatusCode::NOT_FOUND);
}
