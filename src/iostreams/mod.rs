//! Terminal I/O streams
//!
//! [`IoStreams`] bundles the output and error channels of the process with
//! what is known about the attached terminal: whether it is interactive,
//! whether it takes color, how wide it is, and which pager long output goes
//! through.

use crate::error::{Result, UnictlError};
use crate::utils::env::{Environment, ProcessEnv};
use dialoguer::theme::{ColorfulTheme, SimpleTheme, Theme};
use dialoguer::Confirm;
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use tracing::debug;
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_TERMINAL_WIDTH: u16 = 80;

type BoxedWriter = Box<dyn Write + Send>;

/// A cloneable handle to a shared writer
///
/// Every clone writes to the same destination, and redirecting one clone
/// (e.g. into a pager) redirects them all.
#[derive(Clone)]
pub struct OutputChannel(Arc<Mutex<BoxedWriter>>);

impl OutputChannel {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self(Arc::new(Mutex::new(Box::new(writer))))
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Whether both handles point at the same underlying channel
    pub fn ptr_eq(&self, other: &OutputChannel) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn replace(&self, writer: BoxedWriter) -> io::Result<BoxedWriter> {
        let mut guard = self.0.lock().map_err(|_| poisoned())?;
        Ok(std::mem::replace(&mut *guard, writer))
    }
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "output channel lock poisoned")
}

impl Write for OutputChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().map_err(|_| poisoned())?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().map_err(|_| poisoned())?.flush()
    }
}

impl<'a> MakeWriter<'a> for OutputChannel {
    type Writer = OutputChannel;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// In-memory sink that can be read back, for tests and captured output
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().map_err(|_| poisoned())?.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct PagerProcess {
    child: Child,
    previous: BoxedWriter,
}

pub struct IoStreams {
    out: OutputChannel,
    err: OutputChannel,
    stdin_tty: bool,
    stdout_tty: bool,
    stderr_tty: bool,
    color_enabled: bool,
    terminal_width: u16,
    never_prompt: bool,
    pager: Option<String>,
    pager_process: Mutex<Option<PagerProcess>>,
}

impl IoStreams {
    /// Streams attached to the real process stdio
    pub fn system() -> Self {
        Self::from_env(&ProcessEnv)
    }

    pub fn from_env(env: &dyn Environment) -> Self {
        let stdout_tty = io::stdout().is_terminal();
        let terminal_width = if stdout_tty {
            crossterm::terminal::size()
                .map(|(width, _)| width)
                .unwrap_or(DEFAULT_TERMINAL_WIDTH)
        } else {
            DEFAULT_TERMINAL_WIDTH
        };

        Self {
            out: OutputChannel::stdout(),
            err: OutputChannel::stderr(),
            stdin_tty: io::stdin().is_terminal(),
            stdout_tty,
            stderr_tty: io::stderr().is_terminal(),
            color_enabled: detect_color(env, stdout_tty),
            terminal_width,
            never_prompt: false,
            pager: None,
            pager_process: Mutex::new(None),
        }
    }

    /// Non-interactive streams writing into in-memory buffers
    pub fn test() -> (Self, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let streams = Self {
            out: OutputChannel::new(out.clone()),
            err: OutputChannel::new(err.clone()),
            stdin_tty: false,
            stdout_tty: false,
            stderr_tty: false,
            color_enabled: false,
            terminal_width: DEFAULT_TERMINAL_WIDTH,
            never_prompt: false,
            pager: None,
            pager_process: Mutex::new(None),
        };
        (streams, out, err)
    }

    pub fn out(&self) -> OutputChannel {
        self.out.clone()
    }

    pub fn err_out(&self) -> OutputChannel {
        self.err.clone()
    }

    pub fn is_stdout_tty(&self) -> bool {
        self.stdout_tty
    }

    pub fn is_stderr_tty(&self) -> bool {
        self.stderr_tty
    }

    pub fn color_enabled(&self) -> bool {
        self.color_enabled
    }

    pub fn terminal_width(&self) -> u16 {
        self.terminal_width
    }

    pub fn set_never_prompt(&mut self, never_prompt: bool) {
        self.never_prompt = never_prompt;
    }

    pub fn can_prompt(&self) -> bool {
        !self.never_prompt && self.stdin_tty && self.stdout_tty
    }

    pub fn set_pager<S: Into<String>>(&mut self, pager: S) {
        let pager = pager.into();
        self.pager = if pager.trim().is_empty() {
            None
        } else {
            Some(pager)
        };
    }

    pub fn pager(&self) -> Option<&str> {
        self.pager.as_deref()
    }

    /// Ask a yes/no question; answers `default` when prompting is disabled
    pub fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        if !self.can_prompt() {
            return Ok(default);
        }

        let colorful = ColorfulTheme::default();
        let theme: &dyn Theme = if self.color_enabled {
            &colorful
        } else {
            &SimpleTheme
        };

        Confirm::with_theme(theme)
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(|e| UnictlError::prompt(format!("Failed to get user input: {e}")))
    }

    /// Route the output channel through the configured pager
    ///
    /// Does nothing when no pager is set, when stdout is not a terminal, or
    /// when the pager is `cat`.
    pub fn start_pager(&self) -> Result<()> {
        let Some(command) = self.pager.as_deref() else {
            return Ok(());
        };
        if !self.stdout_tty {
            return Ok(());
        }

        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(());
        };
        if program == "cat" {
            return Ok(());
        }

        let mut cmd = Command::new(program);
        cmd.args(parts).stdin(Stdio::piped());
        if std::env::var_os("LESS").is_none() {
            cmd.env("LESS", "FRX");
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| UnictlError::pager(format!("failed to start pager '{command}': {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| UnictlError::pager("pager has no stdin"))?;

        let previous = self.out.replace(Box::new(stdin))?;
        debug!("Started pager '{}'", command);

        let mut slot = self
            .pager_process
            .lock()
            .map_err(|_| UnictlError::pager("pager state lock poisoned"))?;
        *slot = Some(PagerProcess { child, previous });

        Ok(())
    }

    /// Restore the output channel and wait for the pager to exit
    pub fn stop_pager(&self) -> Result<()> {
        let process = self
            .pager_process
            .lock()
            .map_err(|_| UnictlError::pager("pager state lock poisoned"))?
            .take();

        if let Some(PagerProcess { mut child, previous }) = process {
            // Dropping the pipe signals EOF to the pager
            let mut pipe = self.out.replace(previous)?;
            let _ = pipe.flush();
            drop(pipe);
            child.wait()?;
        }

        Ok(())
    }
}

impl fmt::Debug for IoStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoStreams")
            .field("stdin_tty", &self.stdin_tty)
            .field("stdout_tty", &self.stdout_tty)
            .field("stderr_tty", &self.stderr_tty)
            .field("color_enabled", &self.color_enabled)
            .field("terminal_width", &self.terminal_width)
            .field("never_prompt", &self.never_prompt)
            .field("pager", &self.pager)
            .finish()
    }
}

/// Decide whether output to a stream may carry ANSI colors
pub fn detect_color(env: &dyn Environment, is_tty: bool) -> bool {
    if env.non_empty("NO_COLOR").is_some() {
        return false;
    }
    if env
        .non_empty("CLICOLOR_FORCE")
        .is_some_and(|value| value != "0")
    {
        return true;
    }
    if env.var("TERM").as_deref() == Some("dumb") {
        return false;
    }
    is_tty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::env::MapEnv;

    #[test]
    fn test_output_channel_clones_share_destination() {
        let (streams, out, _) = IoStreams::test();
        let mut a = streams.out();
        let mut b = streams.out();
        write!(a, "one ").unwrap();
        write!(b, "two").unwrap();

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&streams.err_out()));
        assert_eq!(out.contents(), "one two");
    }

    #[test]
    fn test_set_pager_blank_clears() {
        let (mut streams, _, _) = IoStreams::test();
        streams.set_pager("less -R");
        assert_eq!(streams.pager(), Some("less -R"));
        streams.set_pager("  ");
        assert_eq!(streams.pager(), None);
    }

    #[test]
    fn test_pager_is_noop_without_terminal() {
        let (mut streams, out, _) = IoStreams::test();
        streams.set_pager("definitely-not-a-real-pager");
        streams.start_pager().unwrap();
        writeln!(streams.out(), "plain").unwrap();
        streams.stop_pager().unwrap();
        assert_eq!(out.contents(), "plain\n");
    }

    #[test]
    fn test_confirm_without_prompting_returns_default() {
        let (mut streams, _, _) = IoStreams::test();
        streams.set_never_prompt(true);
        assert!(!streams.can_prompt());
        assert!(streams.confirm("Proceed?", true).unwrap());
        assert!(!streams.confirm("Proceed?", false).unwrap());
    }

    #[test]
    fn test_detect_color() {
        assert!(detect_color(&MapEnv::new(), true));
        assert!(!detect_color(&MapEnv::new(), false));
        assert!(!detect_color(&MapEnv::new().with("NO_COLOR", "1"), true));
        assert!(detect_color(&MapEnv::new().with("CLICOLOR_FORCE", "1"), false));
        assert!(!detect_color(&MapEnv::new().with("CLICOLOR_FORCE", "0"), false));
        assert!(!detect_color(&MapEnv::new().with("TERM", "dumb"), true));
    }
}
