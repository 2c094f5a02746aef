//! Data models for pgready.
//!
//! - `target` - ConnectionTarget
//! - `table` - TableIdentifier and table-list parsing
//! - `probe` - ProbeSettings, TimeoutPolicy, Attempt
//! - `outcome` - ProbeResult, ProbeStatus, ExitStatus

pub mod outcome;
pub mod probe;
pub mod table;
pub mod target;

pub use outcome::{ExitStatus, ProbeResult, ProbeStatus, ProbeSummary};
pub use probe::{Attempt, AttemptOutcome, ProbeSettings, TimeoutPolicy};
pub use table::{parse_table_list, TableIdentifier};
pub use target::ConnectionTarget;
