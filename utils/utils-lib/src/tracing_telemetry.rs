use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Fmt layer destination for console output.
pub enum FmtLayer {
    /// Output traces to stdout.
    Stdout,
    /// Output traces to stderr.
    Stderr,
}

/// Tracing telemetry style.
#[derive(Debug, Clone, Copy, strum_macros::EnumString, strum_macros::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum FmtStyle {
    /// Compact, single-line style.
    Compact,
    /// Multi-line, human-friendly style.
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

/// Tracing telemetry builder.
///
/// A trimmed-down version of the teacher's own `TracingTelemetry`: the
/// console/style knobs are kept, the OpenTelemetry/Jaeger exporter wiring is
/// dropped because this process never leaves a single host (see DESIGN.md).
pub struct TracingTelemetry {
    writer: FmtLayer,
    style: FmtStyle,
    colours: bool,
}

impl Default for TracingTelemetry {
    fn default() -> Self {
        Self::builder()
    }
}

impl TracingTelemetry {
    /// Tracing telemetry default builder.
    pub fn builder() -> Self {
        Self {
            writer: FmtLayer::Stdout,
            style: FmtStyle::Pretty,
            colours: true,
        }
    }
    /// Specify writer stream.
    pub fn with_writer(self, writer: FmtLayer) -> TracingTelemetry {
        TracingTelemetry { writer, ..self }
    }
    /// Specify style.
    pub fn with_style(self, style: FmtStyle) -> TracingTelemetry {
        TracingTelemetry { style, ..self }
    }
    /// Specify whether colour is needed or not.
    pub fn with_colours(self, colours: bool) -> TracingTelemetry {
        TracingTelemetry { colours, ..self }
    }

    /// Initialize the global subscriber. `RUST_LOG` (default `info`) selects
    /// verbosity the way the teacher's binaries do.
    pub fn init(self, service_name: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = Registry::default().with(filter);

        let stdout = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(self.colours)
            .with_target(true);
        let stderr = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(self.colours)
            .with_target(true);

        match (self.writer, self.style) {
            (FmtLayer::Stdout, FmtStyle::Compact) => subscriber.with(stdout.compact()).init(),
            (FmtLayer::Stderr, FmtStyle::Compact) => subscriber.with(stderr.compact()).init(),
            (FmtLayer::Stdout, FmtStyle::Pretty) => subscriber.with(stdout.pretty()).init(),
            (FmtLayer::Stderr, FmtStyle::Pretty) => subscriber.with(stderr.pretty()).init(),
            (FmtLayer::Stdout, FmtStyle::Json) => subscriber.with(stdout.json()).init(),
            (FmtLayer::Stderr, FmtStyle::Json) => subscriber.with(stderr.json()).init(),
        };

        tracing::info!(service = service_name, "tracing initialised");
    }
}
