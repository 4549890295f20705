//! Parsers for the line protocols of the external tools
//!
//! yt-dlp is driven with custom `--progress-template`s and a `--print`
//! template, so its interesting stdout lines are `|`-separated records with
//! our own markers. ffmpeg progress comes from its stderr stats lines
//! (`... time=00:01:02.50 ...`) relative to the input `Duration:` header.

use std::path::PathBuf;

use super::ToolProgress;

pub const PROGRESS_MARKER: &str = "MBX";
pub const OUTPUT_MARKER: &str = "MBXFILE";

/// `--progress-template` for download hooks
pub fn download_template() -> String {
    format!(
        "download:{PROGRESS_MARKER}|download|%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s"
    )
}

/// `--progress-template` for post-processor hooks
pub fn postprocess_template() -> String {
    format!("postprocess:{PROGRESS_MARKER}|postprocess|%(progress.status)s|%(progress.postprocessor)s")
}

/// `--print` template emitting the final path of every moved file
pub fn output_template() -> String {
    format!("after_move:{OUTPUT_MARKER}|%(filepath)s")
}

#[derive(Debug, Clone, PartialEq)]
pub enum YtDlpLine {
    Progress(ToolProgress),
    Output(PathBuf),
    Other,
}

pub fn parse_ytdlp_line(line: &str) -> YtDlpLine {
    let line = line.trim();

    if let Some(path) = line.strip_prefix(OUTPUT_MARKER).and_then(|rest| rest.strip_prefix('|')) {
        return YtDlpLine::Output(PathBuf::from(path));
    }

    let Some(rest) = line.strip_prefix(PROGRESS_MARKER).and_then(|rest| rest.strip_prefix('|')) else {
        return YtDlpLine::Other;
    };

    let fields: Vec<&str> = rest.split('|').collect();
    let progress = match fields.as_slice() {
        ["download", "finished", ..] => Some(ToolProgress::Finished),
        ["download", "downloading", downloaded, total, estimate] => {
            download_percent(downloaded, total, estimate).map(|percent| ToolProgress::Downloading { percent })
        }
        ["postprocess", "started" | "processing", step] => Some(ToolProgress::PostProcessing {
            step: step.to_string(),
        }),
        _ => None,
    };

    progress.map(YtDlpLine::Progress).unwrap_or(YtDlpLine::Other)
}

fn download_percent(downloaded: &str, total: &str, estimate: &str) -> Option<f64> {
    let downloaded = parse_number(downloaded)?;
    let total = parse_number(total)
        .filter(|t| *t > 0.0)
        .or_else(|| parse_number(estimate).filter(|t| *t > 0.0))?;

    Some((downloaded / total * 100.0).clamp(0.0, 100.0))
}

/// yt-dlp prints `NA` for missing fields
fn parse_number(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse `HH:MM:SS(.frac)` into seconds
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let value = value.trim();
    // ffmpeg reports negative times before the first packet
    if value.starts_with('-') {
        return None;
    }

    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// `  Duration: 00:03:32.45, start: 0.000000, bitrate: 1411 kb/s`
pub fn parse_ffmpeg_duration(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    let value = rest.split(',').next()?;
    parse_timestamp(value)
}

/// `frame=  240 fps= 48 q=28.0 size=  1024kB time=00:00:10.00 bitrate=...`
pub fn parse_ffmpeg_time(line: &str) -> Option<f64> {
    let idx = line.find("time=")?;
    let value = line[idx + "time=".len()..].split_whitespace().next()?;
    parse_timestamp(value)
}
