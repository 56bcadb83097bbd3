//! Human-readable and machine-readable renderings of test outcomes.

mod json;
mod terminal;

pub use json::{to_json, to_json_pretty, JsonOutcome};
pub use terminal::{format_condition_masks, format_outcome, format_verdict, render_mask};
