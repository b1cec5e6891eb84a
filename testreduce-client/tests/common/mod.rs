//! Shared fixtures for worker integration tests

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use testreduce_client::coordinator::{CoordinatorClient, RetryPolicy};
use testreduce_core::Commit;
use testreduce_storage::{DatabaseConfig, StorageManager};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::{MockServer, Request};

/// Commits `C1`, `C2`, ... one day apart, returned newest first
pub fn commits_newest_first(hashes_oldest_first: &[&str]) -> Vec<Commit> {
    let base = Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap();
    hashes_oldest_first
        .iter()
        .enumerate()
        .rev()
        .map(|(i, hash)| Commit::new(*hash, base + chrono::Duration::days(i as i64)).unwrap())
        .collect()
}

/// Retry policy with millisecond waits so loops finish quickly
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        fetch_attempts: 2,
        transport_retry_delay: Duration::from_millis(5),
        no_work_delay: Duration::from_millis(20),
        error_delay: Duration::from_millis(10),
    }
}

pub fn coordinator_for(server: &MockServer) -> Arc<CoordinatorClient> {
    Arc::new(
        CoordinatorClient::new(&server.uri(), Duration::from_secs(5), fast_policy())
            .expect("failed to create coordinator client"),
    )
}

/// Fresh in-memory database seeded with `commits`
pub async fn seeded_storage(commits: &[Commit]) -> StorageManager {
    let storage = StorageManager::new(&DatabaseConfig::in_memory())
        .await
        .expect("failed to open in-memory database");
    for commit in commits {
        storage
            .commits()
            .create(commit)
            .await
            .expect("failed to insert commit");
    }
    storage
}

/// Requests the server saw whose path starts with `prefix`
pub async fn requests_to(server: &MockServer, prefix: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .into_iter()
        .filter(|r| r.url.path().starts_with(prefix))
        .collect()
}

pub fn body_text(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}

pub fn work_item_body(prefix: &str, title: &str) -> String {
    serde_json::json!({ "prefix": prefix, "title": title }).to_string()
}

/// Decode an `application/x-www-form-urlencoded` body
pub fn form_pairs(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (decode_form(k), decode_form(v)))
        .collect()
}

fn decode_form(value: &str) -> String {
    urlencoding::decode(&value.replace('+', " "))
        .expect("valid utf-8")
        .into_owned()
}

/// Raw TCP server that answers the n-th connection with `replies[n]`.
///
/// `None`, or running out of replies, drops the connection without a
/// response. Returns the base URL and the number of accepted connections.
pub async fn scripted_server(replies: Vec<Option<String>>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        let mut replies = replies.into_iter();
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(Some(reply)) = replies.next() {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request).await;
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        }
    });

    (format!("http://{}", addr), connections)
}

pub fn connection_count(connections: &AtomicUsize) -> usize {
    connections.load(Ordering::SeqCst)
}

/// A complete `200 OK` HTTP response carrying `body`
pub fn ok_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// A `200 OK` response whose body stops short of its declared length
pub fn truncated_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len() + 64,
        body
    )
}
