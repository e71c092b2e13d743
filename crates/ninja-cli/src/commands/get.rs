//! `get`: print decoded values

use std::sync::Arc;

use colored::Colorize;
use ninja_core::SyncEngine;
use ninja_format::Value;

use crate::commands::monitor::finish;
use crate::error::Result;
use crate::signal::shutdown_token;

/// Text shown for a value: raw content as-is, anything else as JSON.
pub fn display_value(value: &Value) -> serde_json::Result<String> {
    match value.get("content").and_then(Value::as_str) {
        Some(text) if value.as_object().is_some_and(|o| o.len() == 1) => Ok(text.to_string()),
        _ => serde_json::to_string_pretty(value),
    }
}

fn print_value(key: &str, value: &Value, with_header: bool) {
    match display_value(value) {
        Ok(text) => {
            if with_header {
                println!("{}", format!("# {key}").dimmed());
            }
            println!("{}", text.trim_end_matches('\n'));
        }
        Err(e) => tracing::error!(key, error = %e, "Cannot display value"),
    }
}

/// Print the value of `keys`, once or on every change.
pub async fn run_get(engine: &SyncEngine, keys: &[String], poll: bool) -> Result<()> {
    let with_header = keys.len() != 1;

    if poll {
        let report = engine
            .observe(
                keys,
                shutdown_token(),
                Arc::new(move |key: &str, value: &Value| print_value(key, value, with_header)),
            )
            .await?;
        return finish(&report);
    }

    for (key, value) in engine.get(keys).await? {
        print_value(&key, &value, with_header);
    }
    Ok(())
}
