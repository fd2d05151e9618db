// Statute database - the USC/SRC import-and-diff pipeline.
//
// Two source formats (USLM-style XML for USC titles, a flat JSON shape for
// the SRC) normalize into the same section records. Imports are revisioned:
// re-importing a title diffs the incoming sections against the stored ones,
// records a new revision only when something changed, and reports exactly
// what moved.

mod diff;
mod models;
mod src_json;
mod statute_service;
mod usc_xml;

pub use diff::render_unified;
pub use models::{
    ImportReport, SearchHit, SectionDiff, StatuteError, StatuteSection, StoredSection, TitleInfo,
};
pub use src_json::parse_src_json;
pub use statute_service::{StatuteService, StatuteStore};
pub use usc_xml::parse_usc_xml;
