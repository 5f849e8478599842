pub mod checkpoint;
pub mod dispatcher;
pub mod missing_file_writer;
pub mod response_parser;
pub mod result_sink;

pub use checkpoint::{CheckpointManager, CheckpointReason, CheckpointStatus};
pub use dispatcher::RequestDispatcher;
pub use missing_file_writer::MissingFileWriter;
pub use response_parser::{JsonStrategy, LiteralStrategy, ParseStrategy, ResponseParser};
pub use result_sink::{ResultSink, SearchResultSink, SubmitResultSink};
