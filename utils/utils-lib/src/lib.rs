//! Small ambient helpers shared by `agents` and `rest`: tracing
//! initialisation today, following the teacher's own `utils-lib` layout.

pub mod tracing_telemetry;

pub use tracing_telemetry::{FmtLayer, FmtStyle, TracingTelemetry};
