pub mod dispatcher;
pub mod parse;
pub mod payload;
pub mod sink;

pub use dispatcher::{DownstreamDispatcher, Trigger};
pub use parse::{parse_distance_meters, parse_eta_seconds};
pub use payload::TurnUpdate;
pub use sink::{select_sink, LoggingSink, NoopSink, SinkFactory, TurnByTurnSink};
