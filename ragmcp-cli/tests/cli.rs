//! End-to-end tests for the `ragmcp` binary

use assert_cmd::Command;
use predicates::prelude::*;
use ragmcp::mcp::http;
use ragmcp::{AppContext, HashingEmbedder, LocalVectorStore, McpServer};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::net::TcpListener;

const UNREACHABLE: &str = "http://127.0.0.1:1/sse";

fn ragmcp() -> Command {
    let mut cmd = Command::cargo_bin("ragmcp").unwrap();
    cmd.env_remove("RAGMCP_SERVER_URL");
    cmd
}

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = LocalVectorStore::open_memory("rag_documents", Arc::new(HashingEmbedder::new()));
    let server = McpServer::new(AppContext::new(Arc::new(store)));
    tokio::spawn(http::serve(listener, server, std::future::pending()));
    format!("http://{}/sse", addr)
}

#[test]
fn test_help_lists_commands() {
    ragmcp()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("proxy"))
        .stdout(predicate::str::contains("search"));
}

#[test]
fn test_proxy_reports_unreachable_server() {
    ragmcp()
        .args(["proxy", UNREACHABLE, "--timeout", "5"])
        .write_stdin("{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"tools/list\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":\"7\""))
        .stdout(predicate::str::contains("-32603"))
        .stdout(predicate::str::contains("Connection refused"));
}

#[test]
fn test_proxy_malformed_line() {
    ragmcp()
        .args(["proxy", UNREACHABLE])
        .write_stdin("this is not json\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("-32700"))
        .stdout(predicate::str::contains("\"id\":\"0\""));
}

#[test]
fn test_proxy_keeps_stdout_clean() {
    let output = ragmcp()
        .args(["proxy", UNREACHABLE])
        .write_stdin("{}\nnope\n")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for line in stdout.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
    }
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn test_client_command_fails_without_server() {
    ragmcp()
        .args(["--server-url", UNREACHABLE, "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Connection refused"));
}

#[test]
fn test_add_missing_path() {
    ragmcp()
        .args(["--server-url", UNREACHABLE, "add", "/definitely/not/here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_client_round_trip() {
    let url = spawn_server().await;
    let docs = tempdir().unwrap();
    fs::write(
        docs.path().join("rust.md"),
        "Rust ownership keeps memory safe without garbage collection.",
    )
    .unwrap();
    fs::write(docs.path().join("tokio.txt"), "Tokio is an async runtime.").unwrap();
    let docs_path = docs.path().to_path_buf();

    tokio::task::spawn_blocking(move || {
        ragmcp()
            .args(["--server-url", &url, "tools"])
            .assert()
            .success()
            .stdout(predicate::str::contains("add_documents"))
            .stdout(predicate::str::contains("delete_collection"));

        ragmcp()
            .args(["--server-url", &url, "add"])
            .arg(&docs_path)
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Successfully added 2 document chunks from 2 documents",
            ));

        ragmcp()
            .args(["--server-url", &url, "search", "rust ownership", "-k", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("file_name: rust.md"));

        ragmcp()
            .args(["--server-url", &url, "delete"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deletion cancelled"));

        ragmcp()
            .args(["--server-url", &url, "delete", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("successfully deleted"));

        ragmcp()
            .args(["--server-url", &url, "info"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Total Documents: 0"));
    })
    .await
    .unwrap();
}
