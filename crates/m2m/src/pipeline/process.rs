//! External process execution with merged, line-streamed output.

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;

use super::error::PipelineError;

/// Number of trailing output lines kept for failure diagnostics.
pub const OUTPUT_TAIL_LINES: usize = 20;

const READ_CHUNK: usize = 4096;

/// Runs `program` to completion, calling `on_line` for every non-empty line
/// it writes to stdout or stderr, in arrival order.
///
/// Carriage returns also end a line, so progress bars that redraw in place
/// produce one line per redraw. Returns the last [`OUTPUT_TAIL_LINES`] lines
/// on success; a non-zero exit becomes [`PipelineError::ProcessFailed`]
/// carrying the same tail.
pub async fn run_process<I, S, F>(
    program: &str,
    args: I,
    mut on_line: F,
) -> Result<Vec<String>, PipelineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    F: FnMut(&str),
{
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| PipelineError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    let mut tail: VecDeque<String> = VecDeque::with_capacity(OUTPUT_TAIL_LINES);
    while let Some(line) = rx.recv().await {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        on_line(line);
        if tail.len() == OUTPUT_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line.to_string());
    }

    let status = child.wait().await.map_err(|e| PipelineError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    let tail: Vec<String> = tail.into();
    if status.success() {
        Ok(tail)
    } else {
        Err(PipelineError::ProcessFailed {
            program: program.to_string(),
            status: status.to_string(),
            output_tail: tail,
        })
    }
}

/// Splits a pipe into lines on `\n` or `\r` and forwards them until EOF or
/// until the receiver goes away.
async fn forward_lines<R>(mut reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_CHUNK];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("stopped reading process output: {}", e);
                break;
            }
        };

        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                let line = String::from_utf8_lossy(&pending).into_owned();
                pending.clear();
                if tx.send(line).is_err() {
                    return;
                }
            } else {
                pending.push(byte);
            }
        }
    }

    if !pending.is_empty() {
        let _ = tx.send(String::from_utf8_lossy(&pending).into_owned());
    }
}
