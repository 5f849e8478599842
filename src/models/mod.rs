pub mod loaders;
pub mod outcome;
pub mod work_item;
pub mod work_source;

pub use loaders::{parse_source_csv, read_source_csv};
pub use outcome::{exclude_self_matches, DispatchOutcome, MatchRecord, OutcomeKind, SearchResponse};
pub use work_item::{SourceRecord, WorkItem};
pub use work_source::WorkSource;
