//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::analysis::Cluster;
use crate::preflight::PreflightWarning;
use crate::result::{ClusterOutcome, ConditionMasks, GlobalVerdict, GroupMask, Metadata};
use crate::types::Mask;

fn header(output: &mut String, title: &str, metadata: &Metadata) -> String {
    let sep = "\u{2500}".repeat(62);
    output.push_str(title);
    output.push('\n');
    output.push_str(&sep);
    output.push('\n');
    output.push('\n');
    output.push_str(&format!(
        "  Trials: {} baseline, {} condition ({} \u{00D7} {})\n",
        metadata.n_baseline, metadata.n_condition, metadata.shape.0, metadata.shape.1
    ));
    output.push_str(&format!(
        "  Surrogates: {} (seed {})\n",
        metadata.n_surr, metadata.seed
    ));
    output.push_str(&format!("  Runtime: {:.2} s\n", metadata.runtime_secs));
    output.push('\n');
    sep
}

fn push_warnings(output: &mut String, warnings: &[PreflightWarning]) {
    for w in warnings {
        output.push_str(&format!("  {} {}\n", "\u{26A0}".yellow(), w.description()));
    }
    if !warnings.is_empty() {
        output.push('\n');
    }
}

fn push_clusters(output: &mut String, clusters: &[Cluster], min_size: Option<f64>) {
    if let Some(min) = min_size {
        output.push_str(&format!("    Minimum cluster size: {:.1}\n", min));
    }
    for c in clusters {
        let line = format!(
            "      #{:<3} size {:>5}  rows {}-{}  cols {}-{}",
            c.label, c.size, c.rows.0, c.rows.1, c.cols.0, c.cols.1
        );
        if c.retained {
            output.push_str(&format!("{}\n", line.green()));
        } else {
            output.push_str(&format!("{}\n", line.dimmed()));
        }
    }
}

/// Render a mask as one text line per row: `#` for retained cells, `+` for
/// cells removed by the cluster filter, `.` otherwise.
pub fn render_mask(raw: &Mask, kept: &Mask) -> String {
    let mut out = String::with_capacity(raw.len() + raw.rows() * 8);
    for r in 0..raw.rows() {
        out.push_str("    ");
        for c in 0..raw.cols() {
            let cell = if kept.get(r, c) {
                "#".red().bold().to_string()
            } else if raw.get(r, c) {
                "+".yellow().to_string()
            } else {
                ".".dimmed().to_string()
            };
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out
}

/// Format a scalar verdict for human-readable terminal output.
pub fn format_verdict(verdict: &GlobalVerdict) -> String {
    let mut output = String::new();
    let sep = header(&mut output, "permutation-cluster: scalar test", &verdict.metadata);
    push_warnings(&mut output, &verdict.warnings);

    if verdict.significant {
        output.push_str(&format!("  {}\n\n", "\u{26A0} Significant difference".yellow().bold()));
    } else {
        output.push_str(&format!("  {}\n\n", "\u{2713} No significant difference".green().bold()));
    }
    output.push_str(&format!("    Observed difference: {:.4}\n", verdict.observed));
    output.push_str(&format!(
        "    Null bounds:         [{:.4}, {:.4}]\n",
        verdict.lower, verdict.upper
    ));
    output.push('\n');
    output.push_str(&sep);
    output.push('\n');
    output
}

/// Format a signal or time-frequency outcome for terminal output.
pub fn format_outcome(outcome: &ClusterOutcome) -> String {
    let mut output = String::new();
    let title = format!("permutation-cluster: {:?} test", outcome.metadata.kind);
    let sep = header(&mut output, &title, &outcome.metadata);
    push_warnings(&mut output, &outcome.warnings);

    if outcome.is_significant() {
        output.push_str(&format!(
            "  {}\n\n",
            format!(
                "\u{26A0} {} significant cells in {} clusters",
                outcome.n_significant(),
                outcome.retained_clusters().count()
            )
            .yellow()
            .bold()
        ));
    } else {
        output.push_str(&format!("  {}\n\n", "\u{2713} No significant clusters".green().bold()));
    }

    output.push_str(&format!(
        "    Cells outside bounds: {} of {}\n",
        outcome.raw_mask.count(),
        outcome.raw_mask.len()
    ));
    push_clusters(&mut output, &outcome.clusters, outcome.min_cluster_size);
    output.push('\n');
    output.push_str(&render_mask(&outcome.raw_mask, &outcome.mask));
    output.push('\n');
    output.push_str(&sep);
    output.push('\n');
    output
}

fn push_group(output: &mut String, group: &GroupMask) {
    output.push_str(&format!(
        "  {:?}: {} significant cells\n",
        group.group,
        group.mask.count()
    ));
    push_clusters(output, &group.clusters, group.min_cluster_size);
    output.push_str(&render_mask(&group.raw_mask, &group.mask));
    output.push('\n');
}

/// Format a per-condition outcome for terminal output.
pub fn format_condition_masks(masks: &ConditionMasks) -> String {
    let mut output = String::new();
    let sep = header(&mut output, "permutation-cluster: per-condition test", &masks.metadata);
    push_warnings(&mut output, &masks.warnings);
    push_group(&mut output, &masks.baseline);
    push_group(&mut output, &masks.condition);
    output.push_str(&sep);
    output.push('\n');
    output
}
