//! Child process plumbing shared by the out-of-process collaborators.

use std::io;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Run `program`, feed `input` to its stdin, and collect its output.
///
/// Stdin is written concurrently with draining stdout so a chatty child
/// cannot deadlock against a full pipe. A child still running after
/// `deadline` is killed and `TimedOut` is returned; dropping the returned
/// future kills it as well.
pub(crate) async fn run_piped(
    program: &str,
    args: &[String],
    input: Vec<u8>,
    deadline: Duration,
) -> io::Result<Output> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdin was not captured"))?;

    let feed = async move {
        let written = stdin.write_all(&input).await;
        drop(stdin);
        written
    };

    let finished = tokio::time::timeout(deadline, async {
        tokio::join!(feed, child.wait_with_output())
    })
    .await;
    let (fed, output) = finished.map_err(|_| {
        io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{program} still running after {}ms", deadline.as_millis()),
        )
    })?;
    let output = output?;

    match fed {
        // The child may legitimately exit before consuming everything.
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(output),
    }
}

/// Short, single-line rendering of a child's stderr for logs and errors.
pub(crate) fn stderr_summary(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .last()
        .unwrap_or_default()
        .trim()
        .to_string()
}
