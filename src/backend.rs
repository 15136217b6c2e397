//! Parser and tagger backends
//!
//! The analysis engines are external programs. [`CommandProcess`] keeps one
//! child process alive per instance and exchanges one line of input for the
//! sentences the program prints. Every request is followed by a fence line;
//! output is collected up to the sentence that echoes the fence, so a program
//! that splits an over-long line into several sentences cannot shift its
//! output onto later requests. A call that exceeds the configured timeout,
//! including a write the program never reads, kills the child; the next call
//! starts a fresh one.
//!
//! Instances are not shared: every scan worker owns its own backend, so the
//! expensive start-up happens once per worker.

use crate::chunk::{ParsedSentence, Token};
use crate::error::BackendError;
use crate::lattice::parse_lattice_lines;
use crate::mecab::{EOS, parse_output};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// MeCab input buffer in bytes; longer lines are split into several sentences
pub const MECAB_INPUT_BUFFER: usize = 1 << 20;

/// Sent after every request; its sentence marks the end of the reply
const FENCE: &str = "KAKARIFENCE";

/// Dependency parser: sentence text in, chunk annotation out
pub trait Parser {
    fn parse(&mut self, text: &str) -> Result<ParsedSentence, BackendError>;
}

/// Morphological tagger: text in, tokens out
pub trait Tagger {
    fn tokenize(&mut self, text: &str) -> Result<Vec<Token>, BackendError>;
}

impl<P: Parser + ?Sized> Parser for Box<P> {
    fn parse(&mut self, text: &str) -> Result<ParsedSentence, BackendError> {
        (**self).parse(text)
    }
}

impl<T: Tagger + ?Sized> Tagger for Box<T> {
    fn tokenize(&mut self, text: &str) -> Result<Vec<Token>, BackendError> {
        (**self).tokenize(text)
    }
}

/// Program, arguments and per-call timeout of a backend process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `cabocha -f1` (lattice output)
    pub fn cabocha() -> Self {
        Self::new("cabocha").with_args(["-f1"])
    }

    /// `mecab` with its default output format and a large input buffer
    pub fn mecab() -> Self {
        Self::new("mecab").with_args(["-b".to_string(), MECAB_INPUT_BUFFER.to_string()])
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A running child fed by a writer thread and drained by a reader thread
struct Session {
    child: Child,
    input: Sender<String>,
    lines: Receiver<std::io::Result<String>>,
}

impl Session {
    fn start(spec: &CommandSpec) -> Result<Self, BackendError> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| BackendError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let (input, lines) = match attach(spec, &mut child) {
            Ok(pipes) => pipes,
            Err(e) => {
                reap(&mut child);
                return Err(e);
            }
        };

        log::debug!("started backend {} (pid {})", spec.program.display(), child.id());
        Ok(Self {
            child,
            input,
            lines,
        })
    }

    /// Drop output nobody asked for; returns how many lines were pending
    fn discard_pending(&mut self) -> usize {
        self.lines.try_iter().count()
    }

    /// Send one line and collect the sentences printed for it
    fn exchange(&mut self, input: &str, timeout: Duration) -> Result<Vec<Vec<String>>, BackendError> {
        // the backends read one sentence per line
        let line: String = input
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let deadline = Instant::now() + timeout;
        self.input
            .send(format!("{}\n{}\n", line, FENCE))
            .map_err(|_| BackendError::Exited)?;

        let mut sentences = Vec::new();
        let mut current = Vec::new();
        let mut fenced = false;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(Ok(line)) => {
                    if line.trim_end() == EOS {
                        if fenced {
                            return Ok(sentences);
                        }
                        sentences.push(std::mem::take(&mut current));
                    } else if is_fence(&line) {
                        fenced = true;
                    } else {
                        current.push(line);
                    }
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(RecvTimeoutError::Timeout) => return Err(BackendError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(BackendError::Exited),
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        reap(&mut self.child);
    }
}

/// Move the child's pipes onto a writer and a reader thread
fn attach(
    spec: &CommandSpec,
    child: &mut Child,
) -> Result<(Sender<String>, Receiver<std::io::Result<String>>), BackendError> {
    let mut stdin = child.stdin.take().ok_or(BackendError::Exited)?;
    let stdout = child.stdout.take().ok_or(BackendError::Exited)?;
    let name = spec.program.display();

    let (input_tx, input_rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name(format!("{}-writer", name))
        .spawn(move || {
            // a killed child fails the blocked write and ends the thread
            for request in input_rx {
                if stdin.write_all(request.as_bytes()).and_then(|()| stdin.flush()).is_err() {
                    break;
                }
            }
        })?;

    let (lines_tx, lines_rx) = mpsc::channel();
    thread::Builder::new()
        .name(format!("{}-reader", name))
        .spawn(move || {
            for line in BufReader::new(stdout).lines() {
                if lines_tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    Ok((input_tx, lines_rx))
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn is_fence(line: &str) -> bool {
    line.split('\t').next() == Some(FENCE)
}

/// Long-lived backend process, restarted after failures
pub struct CommandProcess {
    spec: CommandSpec,
    session: Option<Session>,
}

impl CommandProcess {
    /// Start the program now so a missing binary is reported up front
    pub fn spawn(spec: CommandSpec) -> Result<Self, BackendError> {
        let session = Session::start(&spec)?;
        Ok(Self {
            spec,
            session: Some(session),
        })
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Exchange one input line for the sentences the program prints for it
    pub fn request(&mut self, input: &str) -> Result<Vec<Vec<String>>, BackendError> {
        if let Some(session) = self.session.as_mut() {
            let stale = session.discard_pending();
            if stale > 0 {
                log::warn!(
                    "discarding {} stale output lines from {}",
                    stale,
                    self.spec.program.display()
                );
                self.session = None;
            }
        }
        if self.session.is_none() {
            log::info!("restarting backend {}", self.spec.program.display());
            self.session = Some(Session::start(&self.spec)?);
        }
        let Some(session) = self.session.as_mut() else {
            return Err(BackendError::Exited);
        };

        let result = session.exchange(input, self.spec.timeout);
        if result.is_err() {
            // output of a failed exchange may still be in flight; start clean
            self.session = None;
        }
        result
    }
}

/// CaboCha dependency parser (`cabocha -f1`)
pub struct CabochaCommand {
    process: CommandProcess,
}

impl CabochaCommand {
    pub fn spawn(spec: CommandSpec) -> Result<Self, BackendError> {
        Ok(Self {
            process: CommandProcess::spawn(spec)?,
        })
    }
}

impl Parser for CabochaCommand {
    fn parse(&mut self, text: &str) -> Result<ParsedSentence, BackendError> {
        let sentences = self.process.request(text)?;
        let [lines] = sentences.as_slice() else {
            return Err(BackendError::SplitInput(sentences.len()));
        };
        let mut sentence = parse_lattice_lines(lines)?;
        sentence.text = Some(text.to_string());
        Ok(sentence)
    }
}

/// MeCab morphological tagger
pub struct MecabCommand {
    process: CommandProcess,
}

impl MecabCommand {
    pub fn spawn(spec: CommandSpec) -> Result<Self, BackendError> {
        Ok(Self {
            process: CommandProcess::spawn(spec)?,
        })
    }
}

impl Tagger for MecabCommand {
    fn tokenize(&mut self, text: &str) -> Result<Vec<Token>, BackendError> {
        let sentences = self.process.request(text)?;
        if sentences.len() > 1 {
            log::debug!("tagger split a {}-byte line into {} sentences", text.len(), sentences.len());
        }
        Ok(parse_output(sentences.iter().flatten()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Echoes each input line back as a one-chunk, one-token lattice
    const FAKE_CABOCHA: &str = r#"while IFS= read -r line; do
  case "$line" in slow) sleep 5;; esac
  printf '* 0 -1D 0/0 0.000000\n%s\t名詞,一般,*,*,*,*,%s,*,*\nEOS\n' "$line" "$line"
done"#;

    const FAKE_MECAB: &str = r#"while IFS= read -r line; do
  for word in $line; do printf '%s\t名詞,一般,*,*,*,*,%s,*,*\n' "$word" "$word"; done
  printf 'EOS\n'
done"#;

    /// Prints two sentences for the line `long`, like MeCab past its input buffer
    const SPLITTING_MECAB: &str = r#"while IFS= read -r line; do
  case "$line" in
    long) printf 'a\t名詞,一般,*,*,*,*,a,*,*\nEOS\nb\t名詞,一般,*,*,*,*,b,*,*\nEOS\n';;
    *) for word in $line; do printf '%s\t名詞,一般,*,*,*,*,%s,*,*\n' "$word" "$word"; done
       printf 'EOS\n';;
  esac
done"#;

    const SPLITTING_CABOCHA: &str = r#"while IFS= read -r line; do
  case "$line" in
    long) printf '* 0 -1D 0/0 0.000000\na\t名詞,一般,*,*,*,*,a,*,*\nEOS\n* 0 -1D 0/0 0.000000\nb\t名詞,一般,*,*,*,*,b,*,*\nEOS\n';;
    *) printf '* 0 -1D 0/0 0.000000\n%s\t名詞,一般,*,*,*,*,%s,*,*\nEOS\n' "$line" "$line";;
  esac
done"#;

    fn surfaces(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.surface.as_str()).collect()
    }

    fn shell(script: &str) -> CommandSpec {
        CommandSpec::new("sh")
            .with_args(["-c", script])
            .with_timeout(Duration::from_secs(5))
    }

    #[test]
    fn test_cabocha_round_trip() {
        let mut parser = CabochaCommand::spawn(shell(FAKE_CABOCHA)).unwrap();

        let sentence = parser.parse("横断歩道").unwrap();
        assert_eq!(sentence.text.as_deref(), Some("横断歩道"));
        assert_eq!(sentence.chunks.len(), 1);
        assert_eq!(sentence.chunks[0].tokens[0].surface, "横断歩道");

        // same process serves the next request
        let again = parser.parse("横断歩道").unwrap();
        assert_eq!(sentence, again);
    }

    #[test]
    fn test_mecab_round_trip() {
        let mut tagger = MecabCommand::spawn(shell(FAKE_MECAB)).unwrap();

        let tokens = tagger.tokenize("横断歩道 を 渡る").unwrap();
        assert_eq!(surfaces(&tokens), vec!["横断歩道", "を", "渡る"]);
    }

    #[test]
    fn test_timeout_then_restart() {
        let spec = shell(FAKE_CABOCHA).with_timeout(Duration::from_millis(200));
        let mut parser = CabochaCommand::spawn(spec).unwrap();

        let err = parser.parse("slow").unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)));

        let sentence = parser.parse("fast").unwrap();
        assert_eq!(sentence.surface_text(), "fast");
    }

    #[test]
    fn test_process_exit() {
        let mut process = CommandProcess::spawn(shell("read -r line; exit 0")).unwrap();
        let err = process.request("anything").unwrap_err();
        assert!(matches!(err, BackendError::Exited));
    }

    #[test]
    fn test_missing_program() {
        let spec = CommandSpec::new("/nonexistent/kakari-test-parser");
        let err = CabochaCommand::spawn(spec).err().unwrap();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }

    #[test]
    fn test_split_line_does_not_shift_later_output() {
        let mut tagger = MecabCommand::spawn(shell(SPLITTING_MECAB)).unwrap();

        let tokens = tagger.tokenize("long").unwrap();
        assert_eq!(surfaces(&tokens), vec!["a", "b"]);

        let tokens = tagger.tokenize("次").unwrap();
        assert_eq!(surfaces(&tokens), vec!["次"]);
        let tokens = tagger.tokenize("後").unwrap();
        assert_eq!(surfaces(&tokens), vec!["後"]);
    }

    #[test]
    fn test_cabocha_split_line_fails_alone() {
        let mut parser = CabochaCommand::spawn(shell(SPLITTING_CABOCHA)).unwrap();

        let err = parser.parse("long").unwrap_err();
        assert!(matches!(err, BackendError::SplitInput(2)));

        let sentence = parser.parse("次").unwrap();
        assert_eq!(sentence.surface_text(), "次");
    }

    #[test]
    fn test_stalled_backend_times_out_on_large_line() {
        let spec = CommandSpec::new("sh")
            .with_args(["-c", "exec sleep 30"])
            .with_timeout(Duration::from_millis(200));
        let mut process = CommandProcess::spawn(spec).unwrap();

        // far larger than a pipe buffer, so the write itself blocks
        let line = "あ".repeat(400_000);
        let started = Instant::now();
        let err = process.request(&line).unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_reap_kills_and_waits() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        reap(&mut child);
        let status = child.try_wait().unwrap().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_mecab_spec_raises_input_buffer() {
        let spec = CommandSpec::mecab();
        assert_eq!(spec.args, vec!["-b".to_string(), MECAB_INPUT_BUFFER.to_string()]);
    }
}
