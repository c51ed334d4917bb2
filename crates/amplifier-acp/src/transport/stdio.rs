//! Line-delimited stdio transport. Stdout is reserved exclusively for
//! protocol frames; callers must initialize logging with
//! `amplifier_logging::init_stdio_safe` (stderr sink) before calling `run`.
//! `run` installs a panic hook and validates every outbound line so nothing
//! but a well-formed frame ever reaches stdout (§4.2's critical invariant).

use crate::jsonrpc::{Processor, RpcHandler};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Stdout};

/// Exit code for a stdio frame-contract violation: a panic while this
/// transport owned stdout, or a line about to be written that isn't a
/// well-formed single-line JSON-RPC frame. Distinct from the generic `1`
/// used for ordinary I/O errors in `main.rs`.
const STDIO_HIJACK_EXIT_CODE: i32 = 2;

/// Make sure a panic never interleaves its payload into stdout: print it to
/// stderr (where `init_stdio_safe` already routes every log line) and exit
/// with `STDIO_HIJACK_EXIT_CODE` instead of unwinding back into the loop.
fn install_stdout_guard() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "panic while stdio transport owned stdout, exiting");
        std::process::exit(STDIO_HIJACK_EXIT_CODE);
    }));
}

/// Read frames from stdin, one per line, until EOF; write responses to
/// stdout the same way. Blank lines are skipped rather than treated as
/// parse errors, since some clients pad frames with trailing newlines.
pub async fn run(handler: &dyn RpcHandler) -> std::io::Result<()> {
    install_stdout_guard();
    let processor = Processor::new();
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = BufWriter::new(tokio::io::stdout());

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = processor.process_line(handler, &line).await {
            write_frame_or_exit(&mut stdout, &response).await?;
        }
    }
    Ok(())
}

/// Refuse to write anything to stdout that isn't a single-line JSON value.
/// `Processor`/`encode_frame` are trusted to already produce this shape;
/// this is the last line of defense against a future bug putting something
/// else on the wire and silently corrupting the client's frame stream.
async fn write_frame_or_exit(stdout: &mut BufWriter<Stdout>, frame: &str) -> std::io::Result<()> {
    if frame.contains('\n') || serde_json::from_str::<serde_json::Value>(frame).is_err() {
        tracing::error!(%frame, "refusing to write a non-frame line to stdout, exiting");
        std::process::exit(STDIO_HIJACK_EXIT_CODE);
    }
    stdout.write_all(frame.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcpError;
    use async_trait::async_trait;
    use serde_json::Value;

    struct PingHandler;

    #[async_trait]
    impl RpcHandler for PingHandler {
        async fn handle(&self, method: &str, _params: Option<Value>) -> Result<Value, AcpError> {
            match method {
                "ping" => Ok(serde_json::json!("pong")),
                other => Err(AcpError::MethodNotFound(other.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn process_line_directly_mirrors_what_run_would_write() {
        let processor = Processor::new();
        let handler = PingHandler;
        let out = processor.process_line(&handler, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await.unwrap();
        assert_eq!(out.matches('\n').count(), 0, "process_line's own output has no terminator yet");
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["result"], "pong");
    }
}
