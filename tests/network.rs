//! Network transports against local mock servers.

use std::time::Duration;

use transport_router::config::TimeoutConfig;
use transport_router::transport::{HttpTransport, Transport, TransportError};
use transport_router::{Error, ProxyEnv, Request, Router, RouterConfig};

mod common;

async fn next_line(rx: &mut tokio::sync::mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("backend saw no request")
        .expect("backend stopped")
}

#[tokio::test]
async fn direct_transport_reaches_origin() {
    let (origin, mut seen) = common::start_recording_backend("Hello, world!").await;
    let transport = HttpTransport::direct(&TimeoutConfig::default()).unwrap();

    let url = format!("http://{origin}/hello?x=1");
    let response = transport.handle(Request::get(&url).unwrap()).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Hello, world!");
    assert_eq!(next_line(&mut seen).await, "GET /hello?x=1 HTTP/1.1");
}

#[tokio::test]
async fn configured_proxy_receives_absolute_form() {
    let (proxy, mut seen) = common::start_recording_backend("via proxy").await;

    let mut config = RouterConfig::default();
    config.trust_env = false;
    config.mounts.insert("http://".into(), format!("http://{proxy}"));
    let router = Router::from_config(&config, &ProxyEnv::default()).unwrap();

    let response = router
        .dispatch(Request::get("http://upstream.invalid/path").unwrap())
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "via proxy");
    assert_eq!(next_line(&mut seen).await, "GET http://upstream.invalid/path HTTP/1.1");
}

#[tokio::test]
async fn no_proxy_hosts_go_direct() {
    let (proxy, mut proxy_seen) = common::start_recording_backend("via proxy").await;
    let (origin, mut origin_seen) = common::start_recording_backend("direct").await;

    let env = ProxyEnv::from_vars([
        ("HTTP_PROXY", format!("http://{proxy}")),
        ("NO_PROXY", "127.0.0.1".to_string()),
    ]);
    let router = Router::from_config(&RouterConfig::default(), &env).unwrap();

    let response = router
        .dispatch(Request::get(&format!("http://{origin}/local")).unwrap())
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "direct");
    assert_eq!(next_line(&mut origin_seen).await, "GET /local HTTP/1.1");

    let response = router
        .dispatch(Request::get("http://elsewhere.invalid/").unwrap())
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "via proxy");
    assert_eq!(next_line(&mut proxy_seen).await, "GET http://elsewhere.invalid/ HTTP/1.1");
    assert!(proxy_seen.try_recv().is_err());
}

#[tokio::test]
async fn connect_failure_propagates() {
    let addr = common::closed_port().await;
    let router = Router::from_config(&RouterConfig::default(), &ProxyEnv::default()).unwrap();

    let err = router
        .dispatch(Request::get(&format!("http://{addr}/")).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Connect(_))), "{err:?}");
}

#[tokio::test]
async fn close_stops_network_transports() {
    let (origin, _seen) = common::start_recording_backend("ok").await;
    let router = Router::from_config(&RouterConfig::default(), &ProxyEnv::default()).unwrap();
    router.close().await;

    let err = router
        .dispatch(Request::get(&format!("http://{origin}/")).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Closed(_))));
}
