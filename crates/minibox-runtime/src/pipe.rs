//! One-shot command channel between parent and container.
//!
//! A plain pipe used exactly once: the parent joins the command argument
//! vector with single spaces, writes it whole, and closes its end — that
//! close is the end-of-transmission signal. The child reads until EOF and
//! splits on single spaces.
//!
//! Known lossy framing: arguments containing embedded spaces are not
//! distinguishable after the join/split round trip. This limitation is
//! deliberate and pinned by tests; do not "fix" it silently.

use std::io::Write;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use minibox_common::error::{MiniboxError, Result};

/// Joins a command argument vector into the channel's wire form.
#[must_use]
pub fn join_command(args: &[String]) -> String {
    args.join(" ")
}

/// Splits the channel's wire form back into an argument vector.
#[must_use]
pub fn split_command(raw: &str) -> Vec<String> {
    raw.split(' ').map(str::to_owned).collect()
}

/// Creates the channel, returning the child's read end and the parent's
/// write end. This happens before any process is spawned; failure here
/// means no container is created at all.
///
/// Both descriptors are close-on-exec: the container process inherits the
/// whole pair at clone time, and only the read end — explicitly re-enabled
/// when the launcher parks it at the fixed slot — survives the re-exec.
/// The inherited write end dies with the exec, so EOF arrives as soon as
/// the parent's sink closes.
///
/// # Errors
///
/// Returns an error if the pipe syscall fails.
pub fn channel() -> Result<(CommandSource, CommandSink)> {
    #[cfg(target_os = "linux")]
    let created = nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC);
    #[cfg(not(target_os = "linux"))]
    let created = nix::unistd::pipe();
    let (read, write) = created.map_err(|e| MiniboxError::Channel {
        message: format!("pipe creation failed: {e}"),
    })?;
    Ok((CommandSource { fd: read }, CommandSink { fd: write }))
}

/// Read end of the channel, inherited by the container process.
#[derive(Debug)]
pub struct CommandSource {
    fd: OwnedFd,
}

impl CommandSource {
    /// Raw descriptor, used by the child to move it to the fixed slot.
    #[must_use]
    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

/// Write end of the channel, owned by the parent.
#[derive(Debug)]
pub struct CommandSink {
    fd: OwnedFd,
}

impl CommandSink {
    /// Sends the command: joins the arguments, writes the whole string, and
    /// closes the write end by consuming `self`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn send(self, args: &[String]) -> Result<()> {
        let payload = join_command(args);
        let mut file = std::fs::File::from(self.fd);
        file.write_all(payload.as_bytes())
            .map_err(|e| MiniboxError::Channel {
                message: format!("command write failed: {e}"),
            })?;
        tracing::debug!(command = %payload, "command sent");
        Ok(())
        // file drops here, closing the write end: EOF for the reader.
    }
}

/// Parses a received wire string into the argument vector, rejecting empty
/// transmissions.
///
/// # Errors
///
/// Returns [`MiniboxError::EmptyCommand`] if the string is empty.
pub fn parse_received(raw: &str) -> Result<Vec<String>> {
    if raw.is_empty() {
        return Err(MiniboxError::EmptyCommand);
    }
    Ok(split_command(raw))
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn to_args(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn simple_tokens_round_trip_exactly() {
        let args = to_args(&["echo", "hello"]);
        let received = parse_received(&join_command(&args)).expect("parse");
        assert_eq!(received, args);
    }

    #[test]
    fn embedded_spaces_collapse_into_separate_tokens() {
        // The documented lossy framing: "hello world" arrives as two tokens.
        let args = to_args(&["echo", "hello world"]);
        let received = parse_received(&join_command(&args)).expect("parse");
        assert_eq!(received, to_args(&["echo", "hello", "world"]));
    }

    #[test]
    fn empty_transmission_is_rejected() {
        assert!(matches!(
            parse_received(""),
            Err(MiniboxError::EmptyCommand)
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn reader_sees_eof_even_if_spawned_while_sink_is_open() {
        use std::process::{Command, Stdio};

        let (source, sink) = channel().expect("channel");
        // The reader inherits our whole descriptor table at spawn, exactly
        // like the cloned container process; only a close-on-exec write end
        // lets its read ever terminate once the sink closes.
        let child = Command::new("cat")
            .stdin(Stdio::from(std::fs::File::from(source.fd)))
            .stdout(Stdio::piped())
            .spawn()
            .expect("spawn cat");

        sink.send(&to_args(&["sleep", "1"])).expect("send");

        let output = child.wait_with_output().expect("wait");
        assert_eq!(String::from_utf8_lossy(&output.stdout), "sleep 1");
    }

    #[test]
    fn send_delivers_payload_and_eof() {
        let (source, sink) = channel().expect("channel");
        sink.send(&to_args(&["sleep", "1"])).expect("send");

        let mut reader = std::fs::File::from(source.fd);
        let mut raw = String::new();
        // read_to_string returning proves the write end was closed.
        let _ = reader.read_to_string(&mut raw).expect("read");
        assert_eq!(parse_received(&raw).expect("parse"), to_args(&["sleep", "1"]));
    }
}
