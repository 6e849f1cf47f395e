//! Record loading boundary
//!
//! The scoring pipeline never touches storage itself. It consumes records
//! through [`RecordLoader`]: the list of analysis records of a persona, each
//! analysis record, the matching ground truth (same record ref), and the
//! persona's KPI list.
//!
//! [`FsStore`] implements the trait over a local folder laid out like the
//! upload container.

pub mod fs;

pub use fs::FsStore;

use callscore_common::Result;
use serde_json::Value;

/// Identifies one analysis record, and the ground truth for the same call
///
/// In the folder layout this is the record's file name (`<call id>.json`).
pub type RecordRef = String;

/// Source of analysis records, ground truth and KPI lists
pub trait RecordLoader {
    /// Analysis records available for a persona
    fn list_analyses(&self, persona: &str) -> Result<Vec<RecordRef>>;

    /// Read one analysis record
    fn read_analysis(&self, persona: &str, record: &str) -> Result<Value>;

    /// Read the ground truth matching an analysis record, if one was uploaded
    fn read_ground_truth(&self, persona: &str, record: &str) -> Result<Option<Value>>;

    /// KPI names configured for a persona, in configured order
    fn list_kpis(&self, persona: &str) -> Result<Vec<String>>;
}
