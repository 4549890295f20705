use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use super::ToolError;

pub(super) fn spawn(tool: &'static str, command: &mut Command) -> Result<Child, ToolError> {
    command.stdin(Stdio::null()).kill_on_drop(true);
    command
        .spawn()
        .map_err(|source| ToolError::Spawn { tool, source })
}

/// Feed every non-empty line to `on_line`; `\r` also ends a line (ffmpeg
/// redraws its stats line with carriage returns)
pub(super) async fn for_each_line<R, F>(reader: R, mut on_line: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut segments = BufReader::new(reader).split(b'\r');
    while let Some(segment) = segments.next_segment().await? {
        let text = String::from_utf8_lossy(&segment);
        for line in text.split('\n') {
            let line = line.trim_end();
            if !line.is_empty() {
                on_line(line);
            }
        }
    }
    Ok(())
}

/// Remembers the stderr line that best explains a failure
#[derive(Debug, Default)]
pub(super) struct StderrTail {
    last_error: Option<String>,
    last_line: Option<String>,
}

impl StderrTail {
    pub fn push(&mut self, line: &str) {
        if let Some(message) = line.strip_prefix("ERROR:") {
            self.last_error = Some(message.trim().to_string());
        }
        self.last_line = Some(line.to_string());
    }

    pub fn into_message(self) -> String {
        self.last_error
            .or(self.last_line)
            .unwrap_or_else(|| "no diagnostic output".to_string())
    }
}

/// Executable `/bin/sh` script standing in for an external tool
#[cfg(all(test, unix))]
pub(super) fn fake_tool(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
