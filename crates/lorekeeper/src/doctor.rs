// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lorekeeper doctor` command implementation.
//!
//! Checks that the configuration is valid, the database opens and answers,
//! and the encoder files are in place. `--deep` also loads the model and
//! embeds a probe sentence.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use colored::Colorize;

use lorekeeper_config::model::LorekeeperConfig;
use lorekeeper_core::error::LorekeeperError;
use lorekeeper_core::traits::EmbeddingAdapter;
use lorekeeper_core::traits::adapter::PluginAdapter;
use lorekeeper_core::types::HealthStatus;
use lorekeeper_memory::LazyEmbedder;
use lorekeeper_storage::Database;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(
        name: &'static str,
        status: CheckStatus,
        message: impl Into<String>,
        start: Instant,
    ) -> Self {
        Self {
            name,
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }

    fn render(&self, use_color: bool) -> String {
        let ms = self.duration.as_millis();
        if use_color {
            let (symbol, message) = match self.status {
                CheckStatus::Pass => ("✓".green(), self.message.normal()),
                CheckStatus::Warn => ("!".yellow(), self.message.yellow()),
                CheckStatus::Fail => ("✗".red(), self.message.red()),
            };
            format!("    {symbol} {:<14} {message} ({ms}ms)", self.name)
        } else {
            let tag = match self.status {
                CheckStatus::Pass => "[OK]  ",
                CheckStatus::Warn => "[WARN]",
                CheckStatus::Fail => "[FAIL]",
            };
            format!("    {tag} {:<14} {} ({ms}ms)", self.name, self.message)
        }
    }
}

/// Run the `lorekeeper doctor` command.
pub async fn run_doctor(
    config: &LorekeeperConfig,
    deep: bool,
    plain: bool,
) -> Result<(), LorekeeperError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![
        check_database(&config.storage.database_path).await,
        check_model_files(&config.embedding.model_path),
    ];
    if deep {
        results.push(check_encoder(config).await);
    }

    println!();
    println!("  lorekeeper doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", result.render(use_color));
    }
    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        let word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {word} found.");
        if !deep {
            println!("  Run with --deep to also load the model.");
        }
    }
    println!();

    Ok(())
}

/// The database opens (running migrations) and answers a query.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    let path = Path::new(db_path);
    if !path.exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (created on first write)"),
            start,
        );
    }

    let fail = |message: String| CheckResult::new("Database", CheckStatus::Fail, message, start);
    match Database::open(path, false).await {
        Ok(db) => match db.ping().await {
            Ok(()) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
            Err(e) => fail(format!("query failed: {e}")),
        },
        Err(e) => fail(format!("open failed: {e}")),
    }
}

/// The model and its tokenizer exist on disk.
fn check_model_files(model_path: &str) -> CheckResult {
    let start = Instant::now();
    let model = Path::new(model_path);
    if !model.is_file() {
        return CheckResult::new(
            "Model",
            CheckStatus::Fail,
            format!("missing: {model_path}"),
            start,
        );
    }
    let tokenizer = model
        .parent()
        .map(|dir| dir.join("tokenizer.json"))
        .filter(|p| p.is_file());
    match tokenizer {
        Some(_) => {
            CheckResult::new("Model", CheckStatus::Pass, "model and tokenizer present", start)
        }
        None => CheckResult::new(
            "Model",
            CheckStatus::Fail,
            "tokenizer.json not found next to the model",
            start,
        ),
    }
}

/// Load the encoder and embed a probe sentence.
async fn check_encoder(config: &LorekeeperConfig) -> CheckResult {
    let start = Instant::now();
    let embedder = LazyEmbedder::onnx(config.embedding.clone());
    let probe = match embedder.embed_one("The innkeeper remembers every guest.").await {
        Ok(v) => v,
        Err(e) => return CheckResult::new("Encoder", CheckStatus::Fail, e.to_string(), start),
    };

    if probe.len() != config.embedding.dimensions {
        return CheckResult::new(
            "Encoder",
            CheckStatus::Fail,
            format!(
                "produced {} dimensions, configured for {}",
                probe.len(),
                config.embedding.dimensions
            ),
            start,
        );
    }
    match embedder.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Encoder",
            CheckStatus::Pass,
            format!("{} dimensions", probe.len()),
            start,
        ),
        Ok(status) => CheckResult::new("Encoder", CheckStatus::Warn, format!("{status:?}"), start),
        Err(e) => CheckResult::new("Encoder", CheckStatus::Fail, e.to_string(), start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_rendering_uses_tags() {
        let start = Instant::now();
        let ok = CheckResult::new("Database", CheckStatus::Pass, "connected", start);
        let line = ok.render(false);
        assert!(line.contains("[OK]"));
        assert!(line.contains("connected"));

        let fail = CheckResult::new("Model", CheckStatus::Fail, "missing", start);
        assert!(fail.render(false).contains("[FAIL]"));
    }

    #[test]
    fn missing_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        let result = check_model_files(&path.to_string_lossy());
        assert_eq!(result.status, CheckStatus::Fail);
    }

    #[test]
    fn model_without_tokenizer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"onnx").unwrap();
        let result = check_model_files(&path.to_string_lossy());
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("tokenizer.json"));

        std::fs::write(dir.path().join("tokenizer.json"), b"{}").unwrap();
        assert_eq!(check_model_files(&path.to_string_lossy()).status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn database_check_warns_when_absent_and_passes_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lore.db");
        let path_str = path.to_string_lossy().into_owned();

        assert_eq!(check_database(&path_str).await.status, CheckStatus::Warn);

        Database::open(&path, false).await.unwrap().close().await.unwrap();
        assert_eq!(check_database(&path_str).await.status, CheckStatus::Pass);
    }
}
