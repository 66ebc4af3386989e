// Review passes - status labels and highlight coordinates
//
// These passes never change slot values. They settle a row's status at most
// once per run ("Done" or "?") and collect cells for presentation.

pub mod completion;
pub mod revision;

pub use completion::{is_complete, mark_complete};
pub use revision::{apply_revisions, flag_revisions, short_runs, DEFAULT_MAX_RUN};
