pub mod bus;
pub mod config;
pub mod pipeline;
pub mod sink;
pub mod state;

pub use bus::{DeviceFrameSource, FrameSource, FrameSourceError, RawFrame, TcpFrameSource};
pub use config::{BusConfig, Config, DecoderConfig, MonitorConfig, ServerConfig, SinkConfig};
pub use pipeline::{process_frame, run_pipeline};
pub use sink::{
    EventSink, HttpSink, HttpSinkError, LogSink, MemorySink, MemorySinkError, Publication,
    StdoutSink, StdoutSinkError, TopicMap,
};
pub use state::{MonitorState, StatsSnapshot};
