//! CLI output formatting.
//!
//! Every command prints a header line identifying the entity, followed by
//! indented context lines. Each `format_*` function returns `Vec<String>` and
//! is pure; the `print_*` wrappers write to stdout.
//!
//! ## Render
//!
//! ```text
//! Final 640x480 → crop.png (48213 bytes)
//!     Crop: 10,20 640x480
//!     Logo: applied 64x32 at 566,10
//! ```
//!
//! ## Configurations
//!
//! ```text
//! #007 top-right, scale 0.20
//!     Logo: logo.png (1834 bytes, image/png)
//!     Description: Watermark for client proofs
//!     Created: 2026-10-18T09:12:44+00:00
//! ```

use std::path::Path;

use crate::imaging::{LogoStage, OutputMode};
use crate::service::ImageResponse;
use crate::store::ConfigSummary;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn mode_label(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::Preview => "Preview",
        OutputMode::Final => "Final",
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn logo_line(stage: &LogoStage) -> String {
    match stage {
        LogoStage::NotRequested => "Logo: none".to_string(),
        LogoStage::Applied(p) => format!(
            "Logo: applied {}x{} at {},{}",
            p.render_width, p.render_height, p.offset_x, p.offset_y
        ),
        LogoStage::Skipped(reason) => format!("Logo: skipped ({reason})"),
    }
}

// ============================================================================
// Render output
// ============================================================================

pub fn format_render_output(
    mode: OutputMode,
    response: &ImageResponse,
    dest: &Path,
) -> Vec<String> {
    let crop = &response.crop;
    vec![
        format!(
            "{} {}x{} → {} ({} bytes)",
            mode_label(mode),
            response.width,
            response.height,
            dest.display(),
            response.body.len()
        ),
        format!(
            "{}Crop: {},{} {}x{}",
            indent(1),
            crop.left,
            crop.top,
            crop.width,
            crop.height
        ),
        format!("{}{}", indent(1), logo_line(&response.logo)),
    ]
}

pub fn print_render_output(mode: OutputMode, response: &ImageResponse, dest: &Path) {
    for line in format_render_output(mode, response, dest) {
        println!("{}", line);
    }
}

// ============================================================================
// Configuration output
// ============================================================================

pub fn format_config(summary: &ConfigSummary) -> Vec<String> {
    let scale = match summary.scale_down {
        Some(s) => format!("scale {s:.2}"),
        None => "native size".to_string(),
    };
    let mut lines = vec![format!(
        "#{:0>3} {}, {}",
        summary.id, summary.logo_position, scale
    )];

    if summary.has_logo {
        lines.push(format!(
            "{}Logo: {} ({} bytes, {})",
            indent(1),
            summary.logo_file_name.as_deref().unwrap_or("(unnamed)"),
            summary.logo_file_size.unwrap_or(0),
            summary.logo_mime_type.as_deref().unwrap_or("unknown")
        ));
    } else {
        lines.push(format!("{}Logo: none", indent(1)));
    }
    if let Some(desc) = summary.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("{}Description: {}", indent(1), truncate_desc(desc, 60)));
    }
    lines.push(format!("{}Created: {}", indent(1), summary.created_at));
    if summary.updated_at != summary.created_at {
        lines.push(format!("{}Updated: {}", indent(1), summary.updated_at));
    }
    lines
}

pub fn format_config_list(identity: &str, summaries: &[ConfigSummary]) -> Vec<String> {
    if summaries.is_empty() {
        return vec![format!("No configurations for {identity}")];
    }
    let mut lines = vec![format!(
        "Configurations for {identity} ({})",
        summaries.len()
    )];
    for summary in summaries {
        lines.extend(format_config(summary));
    }
    lines
}

pub fn print_config(summary: &ConfigSummary) {
    for line in format_config(summary) {
        println!("{}", line);
    }
}

pub fn print_config_list(identity: &str, summaries: &[ConfigSummary]) {
    for line in format_config_list(identity, summaries) {
        println!("{}", line);
    }
}
