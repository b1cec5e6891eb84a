//! Repository implementations for stored commits and results

pub mod commit;
pub mod result;

pub use commit::CommitRepository;
pub use result::ResultRepository;
