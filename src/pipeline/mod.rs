//! Commit records and the serialized commit phase.

pub mod commit;
pub mod record;

pub use commit::{
    CommitPipeline, SKIP_ABORTED, SKIP_ALREADY_COMMITTED, SKIP_INVALID_MESSAGE,
    SKIP_NOTHING_TO_COMMIT, dump_file_name,
};
pub use record::{CommitRecord, CommitStatus, FileDraft, RunSummary};
