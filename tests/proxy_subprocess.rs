//! Subprocess semantics of the proxy-inspection client, exercised against
//! stub istioctl scripts: argument shapes, combined output, non-zero exit
//! diagnostics, and the hard timeout.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use common::stub_cli;
use meshlens::errors::Error;
use meshlens::istio::{ConfigSection, ProxyConfigClient};

#[tokio::test]
async fn pod_scoped_commands_compose_identity_and_kubeconfig() {
    let dir = tempfile::tempdir().unwrap();
    let stub = stub_cli(dir.path(), "istioctl", "#!/bin/sh\necho \"$@\"\n");

    let client =
        ProxyConfigClient::new(Some(PathBuf::from("/tmp/kc"))).with_binary(&stub);
    let out = client.proxy_config(ConfigSection::Clusters, "ns1", "app-1").await.unwrap();
    assert_eq!(out.trim_end(), "--kubeconfig /tmp/kc proxy-config cluster app-1.ns1 -o json");
}

#[tokio::test]
async fn status_and_analyze_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let stub = stub_cli(dir.path(), "istioctl", "#!/bin/sh\necho \"$@\"\n");
    let client = ProxyConfigClient::new(None).with_binary(&stub);

    assert_eq!(client.status_all().await.unwrap().trim_end(), "proxy-status");
    assert_eq!(
        client.status_for_pod("ns1", "app-1").await.unwrap().trim_end(),
        "proxy-status app-1.ns1"
    );
    assert_eq!(client.analyze(None).await.unwrap().trim_end(), "analyze");
    assert_eq!(client.analyze(Some("ns1")).await.unwrap().trim_end(), "analyze -n ns1");
}

#[tokio::test]
async fn stdout_and_stderr_are_combined() {
    let dir = tempfile::tempdir().unwrap();
    let stub = stub_cli(
        dir.path(),
        "istioctl",
        "#!/bin/sh\necho \"stdout line\"\necho \"stderr line\" >&2\n",
    );
    let client = ProxyConfigClient::new(None).with_binary(&stub);

    let out = client.status_all().await.unwrap();
    assert!(out.contains("stdout line"));
    assert!(out.contains("stderr line"));
}

#[tokio::test]
async fn non_zero_exit_wraps_status_and_output() {
    let dir = tempfile::tempdir().unwrap();
    let stub = stub_cli(
        dir.path(),
        "istioctl",
        "#!/bin/sh\necho \"Error: pod app-1.ns1 not found\" >&2\nexit 3\n",
    );
    let client = ProxyConfigClient::new(None).with_binary(&stub);

    let err = client.proxy_config(ConfigSection::Listeners, "ns1", "app-1").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("istioctl command failed"));
    assert!(message.contains("exit status 3"));
    assert!(message.contains("Error: pod app-1.ns1 not found"));
}

#[tokio::test]
async fn timeout_discards_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let stub = stub_cli(dir.path(), "istioctl", "#!/bin/sh\necho \"partial output\"\nsleep 10\n");
    let client = ProxyConfigClient::new(None)
        .with_binary(&stub)
        .with_timeout(Duration::from_millis(200));

    let err = client.status_all().await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    let message = err.to_string();
    assert!(message.contains("timed out"));
    assert!(
        !message.contains("partial output"),
        "no subprocess output may leak through a timeout"
    );
}
