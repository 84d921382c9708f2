// src/utils/logger.rs

use serde_json::Value;
use std::collections::HashMap;

/// Log levels supported by the logger
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    pub fn from_string(s: &str) -> LogLevel {
        match s.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            _ => LogLevel::Info, // default
        }
    }

    fn as_log_level(&self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

/// Structured JSON logger.
///
/// Every line is a JSON object with `timestamp`, `level`, `message`, the logger's
/// `context` and optional `meta`, handed to the `log` facade so the host process
/// decides where it ends up. Errors get their own call signatures
/// (`warn_with_error`, `error_with_error`) instead of overloading `meta`.
#[derive(Debug, Clone)]
pub struct Logger {
    level: LogLevel,
    context: HashMap<String, Value>,
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            context: HashMap::new(),
        }
    }

    pub fn from_env() -> Self {
        let level_str = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        Self::new(LogLevel::from_string(&level_str))
    }

    /// Logger tagged with a `component` context entry, at the env-configured level.
    pub fn for_component(component: &str) -> Self {
        let mut logger = Self::from_env();
        logger.add_context("component", Value::String(component.to_string()));
        logger
    }

    pub fn add_context(&mut self, key: &str, value: Value) {
        self.context.insert(key.to_string(), value);
    }

    fn should_log(&self, level: &LogLevel) -> bool {
        level <= &self.level
    }

    fn format_message(&self, level: &LogLevel, message: &str, meta: Option<&Value>) -> String {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC");

        let mut log_obj = serde_json::json!({
            "timestamp": timestamp.to_string(),
            "level": level.as_str(),
            "message": message,
        });

        if !self.context.is_empty() {
            log_obj["context"] = Value::Object(
                self.context
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            );
        }

        if let Some(meta) = meta {
            log_obj["meta"] = meta.clone();
        }

        serde_json::to_string(&log_obj)
            .unwrap_or_else(|_| format!("[{}] {}: {}", timestamp, level.as_str(), message))
    }

    fn emit(&self, level: LogLevel, message: &str, meta: Option<&Value>) {
        if self.should_log(&level) {
            let formatted = self.format_message(&level, message, meta);
            log::log!(target: "market_pulse", level.as_log_level(), "{}", formatted);
        }
    }

    fn error_meta(error: &dyn std::error::Error, context: Option<&Value>) -> Value {
        let mut meta = match context {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            Some(other) => serde_json::json!({ "context": other }),
            None => serde_json::json!({}),
        };
        meta["error"] = Value::String(error.to_string());
        meta
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message, None);
    }

    pub fn error_with_meta(&self, message: &str, meta: &Value) {
        self.emit(LogLevel::Error, message, Some(meta));
    }

    pub fn error_with_error(
        &self,
        message: &str,
        error: &dyn std::error::Error,
        context: Option<&Value>,
    ) {
        if self.should_log(&LogLevel::Error) {
            let meta = Self::error_meta(error, context);
            self.emit(LogLevel::Error, message, Some(&meta));
        }
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message, None);
    }

    pub fn warn_with_meta(&self, message: &str, meta: &Value) {
        self.emit(LogLevel::Warn, message, Some(meta));
    }

    pub fn warn_with_error(
        &self,
        message: &str,
        error: &dyn std::error::Error,
        context: Option<&Value>,
    ) {
        if self.should_log(&LogLevel::Warn) {
            let meta = Self::error_meta(error, context);
            self.emit(LogLevel::Warn, message, Some(&meta));
        }
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message, None);
    }

    pub fn info_with_meta(&self, message: &str, meta: &Value) {
        self.emit(LogLevel::Info, message, Some(meta));
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message, None);
    }

    pub fn debug_with_meta(&self, message: &str, meta: &Value) {
        self.emit(LogLevel::Debug, message, Some(meta));
    }
}
