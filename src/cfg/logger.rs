// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fmt::Debug, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use tracing::{Event, Subscriber, span};
use tracing_appender::{non_blocking::WorkerGuard, rolling::{RollingFileAppender, Rotation}};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FmtContext, FormatEvent, FormatFields, format::{JsonFields, Writer}, writer::BoxMakeWriter},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
};

use crate::cfg::cli::LogOutput;

#[derive(Debug, Clone)]
struct LogConfig {
    is_show_line: bool,
    is_show_module_path: bool,
    is_show_target: bool,
}

#[derive(Default)]
struct SpanFields(pub serde_json::Map<String, serde_json::Value>);

struct CaptureSpanFieldsLayer;

struct FieldVisitor<'a>(&'a mut serde_json::Map<String, serde_json::Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, f: &tracing::field::Field, v: &dyn Debug) {
        self.0.insert(f.name().to_string(), json!(format!("{v:?}")));
    }

    fn record_i64(&mut self, f: &tracing::field::Field, v: i64) {
        self.0.insert(f.name().to_string(), json!(v));
    }

    fn record_u64(&mut self, f: &tracing::field::Field, v: u64) {
        self.0.insert(f.name().to_string(), json!(v));
    }

    fn record_bool(&mut self, f: &tracing::field::Field, v: bool) {
        self.0.insert(f.name().to_string(), json!(v));
    }

    fn record_str(&mut self, f: &tracing::field::Field, v: &str) {
        self.0.insert(f.name().to_string(), json!(v));
    }
}

impl<S> Layer<S> for CaptureSpanFieldsLayer
where S: Subscriber + for<'a> LookupSpan<'a>
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: tracing_subscriber::layer::Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut map = serde_json::Map::with_capacity(8);
            attrs.record(&mut FieldVisitor(&mut map));
            span.extensions_mut().insert(SpanFields(map));
        }
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        if let Some(span) = ctx.span(id)
            && let Some(fields) = span.extensions_mut().get_mut::<SpanFields>()
        {
            values.record(&mut FieldVisitor(&mut fields.0));
        }
    }
}

struct JsonFormatter {
    config: Arc<LogConfig>,
}

#[derive(serde::Serialize)]
struct LogEntry {
    timestamp: String,
    level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    module_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    fields: serde_json::Map<String, serde_json::Value>,
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> std::fmt::Result {
        let mut fields = serde_json::Map::new();
        event.record(&mut FieldVisitor(&mut fields));

        if let Some(scope) = ctx.event_scope() {
            let mut span_names = Vec::with_capacity(8);
            for span in scope.from_root() {
                span_names.push(span.name().to_string());
                if let Some(ext) = span.extensions().get::<SpanFields>() {
                    for (k, v) in &ext.0 {
                        fields.entry(k.clone()).or_insert(v.clone());
                    }
                }
            }
            fields.insert("span_names".to_string(), json!(span_names));
        }

        let log_entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: event.metadata().level().to_string(),
            target: self.config.is_show_target.then(|| event.metadata().target().to_string()),
            module_path: self.config.is_show_module_path.then(|| event.metadata().module_path().unwrap_or("").to_string()),
            line: self.config.is_show_line.then(|| event.metadata().line()).flatten(),
            fields,
        };

        writeln!(writer, "{}", serde_json::to_string(&log_entry).map_err(|_| std::fmt::Error)?)
    }
}

/// Initializes the global `tracing` subscriber from resolved CLI options.
/// Returns a guard that must be kept alive for the process lifetime so the
/// non-blocking writer keeps flushing.
pub fn init_logger(level: &str, output: LogOutput, file: Option<&str>) -> Result<WorkerGuard> {
    let (writer, guard) = make_writer(output, file)?;

    let env_filter =
        EnvFilter::try_new(level).or_else(|_| EnvFilter::try_from_default_env()).context("invalid log level")?;

    let config = Arc::new(LogConfig { is_show_line: true, is_show_module_path: true, is_show_target: true });

    let json_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .json()
        .event_format(JsonFormatter { config })
        .fmt_fields(JsonFields::default());

    let subscriber = Registry::default().with(env_filter).with(CaptureSpanFieldsLayer).with(json_layer);

    tracing::subscriber::set_global_default(subscriber).context("failed to set global default subscriber")?;

    Ok(guard)
}

fn make_writer(output: LogOutput, file: Option<&str>) -> Result<(BoxMakeWriter, WorkerGuard)> {
    Ok(match output {
        LogOutput::Stdout => {
            let (w, g) = tracing_appender::non_blocking(std::io::stdout());
            (BoxMakeWriter::new(w), g)
        },
        LogOutput::Stderr => {
            let (w, g) = tracing_appender::non_blocking(std::io::stderr());
            (BoxMakeWriter::new(w), g)
        },
        LogOutput::File => {
            let path = PathBuf::from(file.context("--log-file is required when --log-output=file")?);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let file_appender = RollingFileAppender::new(Rotation::NEVER, dir, path.file_name().unwrap_or_default());
            let (w, g) = tracing_appender::non_blocking(file_appender);
            (BoxMakeWriter::new(w), g)
        },
    })
}
