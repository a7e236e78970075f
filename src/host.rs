//! Achroma Reader host — newline-delimited JSON over stdin/stdout.
//!
//! Request:  {"id":1, "scope":"ACHROMA_READER", "type":"TOGGLE", "payload":{"enabled":true}}
//! Response: {"id":1, "active":true} or {"id":1, "ok":false, "error":"..."}
//! Page writes are emitted as {"event":"page", "command":"setProperty", ...}.

use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::broadcast::error::RecvError;

use achroma_reader::app::ReaderApp;
use achroma_reader::config::HostConfig;
use achroma_reader::logging;
use achroma_reader::message_handler::handle_request;
use achroma_reader::services::page_host::{PageCommand, StaticPage};
use achroma_reader::services::storage::{ChangeFeed, FallbackStore, SqliteStore, StorageArea};

async fn emit(out: &mut Stdout, value: &Value) -> std::io::Result<()> {
    let mut line = value.to_string();
    line.push('\n');
    out.write_all(line.as_bytes()).await?;
    out.flush().await
}

fn page_event(command: &PageCommand) -> Value {
    let mut event = Map::new();
    event.insert("event".to_string(), json!("page"));
    if let Ok(Value::Object(fields)) = serde_json::to_value(command) {
        event.extend(fields);
    }
    Value::Object(event)
}

fn open_store(config: &HostConfig, feed: &ChangeFeed) -> Box<dyn StorageArea> {
    let opened = std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| e.to_string())
        .and_then(|_| {
            SqliteStore::open(config.database_path(), feed.clone()).map_err(|e| e.to_string())
        });
    match opened {
        Ok(store) => Box::new(FallbackStore::new(Box::new(store), feed.clone())),
        Err(error) => {
            tracing::warn!(
                target: "achroma_reader",
                path = %config.database_path().display(),
                error = %error,
                "could not open settings database; settings will not persist"
            );
            Box::new(FallbackStore::memory_only(feed.clone()))
        }
    }
}

async fn flush_page(app: &Mutex<ReaderApp>, out: &mut Stdout) -> std::io::Result<()> {
    let commands = match app.lock() {
        Ok(mut a) => a.page_mut().drain_commands(),
        Err(_) => Vec::new(),
    };
    for command in &commands {
        emit(out, &page_event(command)).await?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = HostConfig::from_env()?;
    logging::init(&config.log_filter);

    let feed = ChangeFeed::new();
    let store = open_store(&config, &feed);
    let mut changes = feed.subscribe();

    let mut reader = ReaderApp::new(&config.domain, store, Box::new(StaticPage::new(None)), config.commit_delay);
    reader.init();
    let app = Mutex::new(reader);
    tracing::info!(target: "achroma_reader", domain = %config.domain, "host started");

    let mut out = tokio::io::stdout();
    emit(&mut out, &json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")})).await?;
    flush_page(&app, &mut out).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let deadline = app.lock().map_err(|e| e.to_string())?.next_deadline();
        let timer = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<Value>(&line) {
                    Ok(request) => handle_request(&app, &request),
                    Err(e) => json!({"id": null, "ok": false, "error": format!("parse error: {}", e)}),
                };
                emit(&mut out, &response).await?;
            }
            change = changes.recv() => match change {
                Ok(change) => {
                    let mut a = app.lock().map_err(|e| e.to_string())?;
                    if let Err(e) = a.handle_storage_change(&change) {
                        tracing::warn!(target: "achroma_reader", error = %e, "failed to apply storage change");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "achroma_reader", skipped, "storage notifications dropped; reloading");
                    app.lock().map_err(|e| e.to_string())?.load_settings();
                }
                Err(RecvError::Closed) => break,
            },
            _ = timer => {
                let mut a = app.lock().map_err(|e| e.to_string())?;
                if let Err(e) = a.poll_timers(Instant::now()) {
                    tracing::warn!(target: "achroma_reader", error = %e, "timer work failed");
                }
            }
        }
        flush_page(&app, &mut out).await?;
    }

    if let Err(e) = app.lock().map_err(|e| e.to_string())?.flush_pending() {
        tracing::warn!(target: "achroma_reader", error = %e, "final commit failed");
    }
    tracing::info!(target: "achroma_reader", "stdin closed; host exiting");
    Ok(())
}
