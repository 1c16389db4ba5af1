//! CLI output formatting for all pipeline stages.
//!
//! Every batch ends with an explicit tally, followed by the warnings and
//! per-item failures it collected. Failures are never folded into a count
//! alone: each failing item is listed with its detail.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Scanned 3 mods: 12 loose, 40 archived
//! Database: 45 assets (10 loose, 35 tpac)
//! Staged 44 of 45 originals (10 copied, 34 extracted)
//! Failures (1)
//!     001 /game/Modules/Broken/AssetPackages
//!         TpacToolCli extract exited with exit status: 2
//! ```
//!
//! ## Process
//!
//! ```text
//! Transforming 45 textures with 8 workers
//! 001/045 a_armor.dds: encoded 4096x4096 -> 2048x2048 BC7
//! 002/045 banner.dds: cached
//! 003/045 cape.dds: encoded 1024x512 BC3 (requested BC1, source has alpha)
//! 004/045 broken.png: FAILED decode error
//!
//! Transformed 44 of 45 textures, 1 failed
//! Cache: 1 cached, 43 encoded
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::install::InstallReport;
use crate::process::{ProcessEvent, ProcessReport, ProcessedTexture, TextureStatus};
use crate::scan::ScanReport;
use crate::stage::StageReport;
use crate::status::{DatabaseState, Status};
use crate::types::{ItemFailure, Warning};
use std::fmt::Display;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based position as a zero-padded 3-digit string.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `NNN/TTT`, padded to the width of the total.
fn progress(index: usize, total: usize) -> String {
    let width = total.to_string().len().max(3);
    format!("{index:0>width$}/{total:0>width$}")
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

fn or_unset<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "(not set)".to_string(), |v| v.to_string())
}

/// Indented warning list under a `Warnings (n)` header. Empty when none.
fn warning_lines(warnings: &[Warning]) -> Vec<String> {
    if warnings.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!("Warnings ({})", warnings.len())];
    lines.extend(warnings.iter().map(|w| format!("{}{}", indent(1), w)));
    lines
}

/// Numbered failure list with details on a second line. Empty when none.
fn failure_lines(failures: &[ItemFailure]) -> Vec<String> {
    if failures.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!("Failures ({})", failures.len())];
    for (i, failure) in failures.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), failure.item));
        lines.push(format!("{}{}", indent(2), failure.detail));
    }
    lines
}

// ============================================================================
// Scan + stage
// ============================================================================

pub fn format_scan_report(report: &ScanReport) -> Vec<String> {
    let db = &report.database;
    let mut lines = vec![
        format!(
            "Scanned {}: {} loose, {} archived",
            plural(report.mods_scanned, "mod", "mods"),
            report.loose_seen,
            report.archived_seen
        ),
        format!(
            "Database: {} ({} loose, {} tpac)",
            plural(db.len(), "asset", "assets"),
            db.count_kind(crate::database::OriginKind::Loose),
            db.count_kind(crate::database::OriginKind::Archived)
        ),
    ];
    lines.extend(warning_lines(&report.warnings));
    lines.extend(failure_lines(&report.failures));
    lines
}

pub fn print_scan_report(report: &ScanReport) {
    for line in format_scan_report(report) {
        println!("{}", line);
    }
}

pub fn format_stage_report(report: &StageReport, total: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "Staged {} of {} originals ({} copied, {} extracted)",
        report.staged(),
        total,
        report.copied,
        report.extracted
    )];
    lines.extend(warning_lines(&report.warnings));
    lines.extend(failure_lines(&report.failures));
    lines
}

pub fn print_stage_report(report: &StageReport, total: usize) {
    for line in format_stage_report(report, total) {
        println!("{}", line);
    }
}

// ============================================================================
// Process
// ============================================================================

fn texture_detail(texture: &ProcessedTexture) -> String {
    match (&texture.status, &texture.outcome) {
        (TextureStatus::Cached, _) => "cached".to_string(),
        (TextureStatus::Copied, _) => "copied from cache".to_string(),
        (TextureStatus::Encoded, None) => "encoded".to_string(),
        (TextureStatus::Encoded, Some(o)) => {
            let size = if o.original == o.output {
                format!("{}x{}", o.output.width, o.output.height)
            } else {
                format!(
                    "{}x{} -> {}x{}",
                    o.original.width, o.original.height, o.output.width, o.output.height
                )
            };
            let mut detail = format!("encoded {} {}", size, o.format);
            if o.upgraded() {
                detail.push_str(&format!(" (requested {}, source has alpha)", o.requested));
            }
            detail
        }
    }
}

pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { total, workers } => vec![format!(
            "Transforming {} with {}",
            plural(*total, "texture", "textures"),
            plural(*workers, "worker", "workers")
        )],
        ProcessEvent::TextureDone {
            index,
            total,
            texture,
        } => vec![format!(
            "{} {}: {}",
            progress(*index, *total),
            texture.output,
            texture_detail(texture)
        )],
        ProcessEvent::TextureFailed {
            index,
            total,
            failure,
        } => vec![format!(
            "{} {}: FAILED {}",
            progress(*index, *total),
            failure.item,
            failure.detail
        )],
    }
}

pub fn format_process_summary(report: &ProcessReport) -> Vec<String> {
    let total = report.succeeded() + report.failed();
    let mut lines = vec![
        String::new(),
        format!(
            "Transformed {} of {}, {} failed",
            report.succeeded(),
            plural(total, "texture", "textures"),
            report.failed()
        ),
        format!("Cache: {}", report.cache_stats),
    ];
    let upgraded: Vec<_> = report.upgraded().collect();
    if !upgraded.is_empty() {
        lines.push(format!("Alpha upgrades ({})", upgraded.len()));
        for (texture, outcome) in upgraded {
            lines.push(format!(
                "{}{}: {} -> {}",
                indent(1),
                texture.output,
                outcome.requested,
                outcome.format
            ));
        }
    }
    lines.extend(failure_lines(&report.failures));
    lines
}

pub fn print_process_summary(report: &ProcessReport) {
    for line in format_process_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Apply / revert
// ============================================================================

/// `verb` is the past tense shown in the tally, e.g. "Applied".
pub fn format_install_report(verb: &str, report: &InstallReport, total: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} of {}, {} failed",
        verb,
        report.changed.len(),
        plural(total, "asset", "assets"),
        report.failures.len()
    )];
    lines.extend(warning_lines(&report.warnings));
    lines.extend(failure_lines(&report.failures));
    lines
}

pub fn print_install_report(verb: &str, report: &InstallReport, total: usize) {
    for line in format_install_report(verb, report, total) {
        println!("{}", line);
    }
}

/// Revert tally, plus a note when failures keep the apply marker in place.
pub fn format_revert_report(report: &InstallReport, total: usize) -> Vec<String> {
    let mut lines = format_install_report("Reverted", report, total);
    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push(
            "Apply marker kept: scan stays blocked until revert finishes without failures (or scan --force)"
                .to_string(),
        );
    }
    lines
}

pub fn print_revert_report(report: &InstallReport, total: usize) {
    for line in format_revert_report(report, total) {
        println!("{}", line);
    }
}

// ============================================================================
// Status
// ============================================================================

pub fn format_status(status: &Status) -> Vec<String> {
    let database = match &status.database {
        DatabaseState::Missing => "not built (run `texproc scan`)".to_string(),
        DatabaseState::Loaded { loose, archived } => format!(
            "{} ({} loose, {} tpac)",
            plural(loose + archived, "asset", "assets"),
            loose,
            archived
        ),
        DatabaseState::Unreadable(e) => format!("unreadable: {e}"),
    };
    vec![
        "Settings".to_string(),
        format!(
            "{}Game root: {}",
            indent(1),
            or_unset(status.game_root.as_ref().map(|p| p.display()))
        ),
        format!("{}Max dimension: {}", indent(1), or_unset(status.max_dimension)),
        format!("{}Format: {}", indent(1), or_unset(status.format)),
        "Data".to_string(),
        format!("{}Database: {}", indent(1), database),
        format!("{}Originals: {}", indent(1), status.originals),
        format!("{}Processed: {}", indent(1), status.processed),
        format!(
            "{}Apply pending: {}",
            indent(1),
            if status.apply_pending { "yes" } else { "no" }
        ),
    ]
}

pub fn print_status(status: &Status) {
    for line in format_status(status) {
        println!("{}", line);
    }
}
