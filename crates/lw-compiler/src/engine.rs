//! Command-backed style engine.
//!
//! [`CommandEngine`] runs an external compiler (by default `lessc`) once per
//! compile, feeding the source on stdin and reading the stylesheet from
//! stdout. The generated command line is
//!
//! ```text
//! <program> <args...> --include-path=<search paths> [--compress] -
//! ```
//!
//! with the working directory set to the first search path so relative
//! imports resolve the same way they would next to the source file.
//!
//! When [`RenderOptions::deadline`] is set, a compiler still running at the
//! deadline is killed and reaped before `render` returns.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use lw_core::{CompilerConfig, OutputFormat};

use crate::adapter::{RawRender, RenderOptions, StyleEngine};
use crate::error::EngineError;

#[cfg(windows)]
const PATH_LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: &str = ":";

/// How often a compiler with a deadline is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs an external compiler process per compile.
///
/// # Examples
///
/// ```
/// use lw_compiler::CommandEngine;
/// use lw_core::CompilerConfig;
///
/// let engine = CommandEngine::from_config(&CompilerConfig::default());
/// assert_eq!(engine.program(), "lessc");
/// ```
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    format: OutputFormat,
}

impl CommandEngine {
    /// Creates an engine for `program` with text output and no extra args.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            format: OutputFormat::Text,
        }
    }

    /// Creates an engine from the `compiler` config section.
    #[must_use]
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            format: config.format,
        }
    }

    /// Adds extra arguments placed before the generated ones.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets how standard output is interpreted.
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Returns the program this engine runs.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, options: &RenderOptions) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);

        if !options.search_paths.is_empty() {
            let joined = options
                .search_paths
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(PATH_LIST_SEPARATOR);
            command.arg(format!("--include-path={joined}"));
        }
        if options.minify {
            command.arg("--compress");
        }
        command.arg("-");

        if let Some(dir) = options.search_paths.first() {
            command.current_dir(dir);
        }

        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl StyleEngine for CommandEngine {
    fn render(&self, source: &str, options: &RenderOptions) -> Result<RawRender, EngineError> {
        let mut child = self
            .command(options)
            .spawn()
            .map_err(|e| EngineError::new(format!("failed to start `{}`: {e}", self.program)))?;

        let (Some(mut stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::new("compiler pipes were not captured"));
        };

        // Pipes are pumped on their own threads so a compiler that streams
        // output cannot deadlock against a full pipe.
        let (status, written, stdout, stderr) = thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(source.as_bytes()));
            let stdout = scope.spawn(move || drain(stdout));
            let stderr = scope.spawn(move || drain(stderr));
            let status = wait_until(&mut child, options.deadline);
            (status, writer.join(), stdout.join(), stderr.join())
        });

        let status = status
            .map_err(|e| EngineError::new(format!("failed to wait for `{}`: {e}", self.program)))?
            .ok_or_else(|| EngineError::new(format!("`{}` killed at its deadline", self.program)))?;
        let stdout = joined(stdout, "stdout")?;
        let stderr = joined(stderr, "stderr")?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let message = stderr.trim();
            return Err(EngineError::new(if message.is_empty() {
                format!("`{}` exited with {status}", self.program)
            } else {
                message.to_owned()
            }));
        }

        match written {
            Ok(Ok(())) => {}
            // The compiler may legitimately stop reading early.
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(EngineError::new(format!("failed to send source: {e}")));
            }
            Err(_panic) => return Err(EngineError::new("source writer thread panicked")),
        }

        let stdout = String::from_utf8(stdout)
            .map_err(|_| EngineError::new("compiler output is not valid UTF-8"))?;

        match self.format {
            OutputFormat::Text => Ok(RawRender::Text(stdout)),
            OutputFormat::Json => serde_json::from_str(&stdout)
                .map(RawRender::Structured)
                .map_err(|e| EngineError::new(format!("compiler output is not valid JSON: {e}"))),
        }
    }
}

/// Waits for `child` to exit. Past `deadline` the child is killed and
/// reaped, and `None` is returned.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // Fails only if the child already exited, which wait() settles.
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
    }
}

fn drain(mut pipe: impl Read) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(buf)
}

fn joined(result: thread::Result<io::Result<Vec<u8>>>, pipe: &str) -> Result<Vec<u8>, EngineError> {
    match result {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(EngineError::new(format!("failed to read compiler {pipe}: {e}"))),
        Err(_panic) => Err(EngineError::new(format!("compiler {pipe} reader panicked"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn shell(script: &str) -> CommandEngine {
        // Extra generated arguments become positional parameters of the
        // script and are ignored.
        CommandEngine::new("sh").with_args(["-c", script])
    }

    #[test]
    fn test_command_line() {
        let engine = CommandEngine::new("lessc").with_args(["--strict-math=on"]);
        let options = RenderOptions {
            search_paths: vec![Utf8PathBuf::from("/a"), Utf8PathBuf::from("/b")],
            minify: true,
            deadline: None,
        };
        let command = engine.command(&options);
        let args: Vec<_> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(command.get_program(), "lessc");
        assert_eq!(
            args,
            vec![
                "--strict-math=on".to_owned(),
                format!("--include-path=/a{PATH_LIST_SEPARATOR}/b"),
                "--compress".to_owned(),
                "-".to_owned(),
            ]
        );
        assert_eq!(
            command.get_current_dir().map(|p| p.to_string_lossy().into_owned()),
            Some("/a".to_owned())
        );
    }

    #[test]
    fn test_command_line_without_minify() {
        let command = CommandEngine::new("lessc").command(&RenderOptions::default());
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec!["-"]);
    }

    #[test]
    fn test_missing_program() {
        let engine = CommandEngine::new("definitely-not-a-real-lessc-binary");
        let err = engine.render("a{}", &RenderOptions::default()).unwrap_err();
        assert!(err.message().contains("failed to start"));
    }

    #[cfg(unix)]
    #[test]
    fn test_text_output() {
        let engine = shell("cat");
        let raw = engine.render("a { color: red; }", &RenderOptions::default()).unwrap();
        assert_eq!(raw, RawRender::Text("a { color: red; }".to_owned()));
    }

    #[cfg(unix)]
    #[test]
    fn test_large_input_does_not_deadlock() {
        let source = "a{b:c}\n".repeat(50_000);
        let raw = shell("cat").render(&source, &RenderOptions::default()).unwrap();
        assert_eq!(raw, RawRender::Text(source));
    }

    #[cfg(unix)]
    #[test]
    fn test_json_output() {
        let engine = shell(r#"cat >/dev/null; printf '{"css":"a{b:c}"}'"#).with_format(OutputFormat::Json);
        let raw = engine.render("ignored", &RenderOptions::default()).unwrap();
        assert_eq!(
            raw,
            RawRender::Structured(serde_json::json!({"css": "a{b:c}"}))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_invalid_json_output() {
        let engine = shell("cat >/dev/null; echo not-json").with_format(OutputFormat::Json);
        let err = engine.render("", &RenderOptions::default()).unwrap_err();
        assert!(err.message().contains("not valid JSON"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_reports_stderr() {
        let engine = shell("cat >/dev/null; echo 'ParseError: Unrecognised input' >&2; exit 1");
        let err = engine.render("a {", &RenderOptions::default()).unwrap_err();
        assert_eq!(err.message(), "ParseError: Unrecognised input");
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_without_stderr_reports_status() {
        let engine = shell("exit 3");
        let err = engine.render("", &RenderOptions::default()).unwrap_err();
        assert!(err.message().contains("exited with"));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_in_first_search_path() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let path = Utf8PathBuf::from_path_buf(dir.path().canonicalize().unwrap()).unwrap();
        let options = RenderOptions {
            search_paths: vec![path.clone()],
            minify: false,
            deadline: None,
        };
        let raw = shell("cat >/dev/null; pwd -P").render("", &options).unwrap();
        match raw {
            RawRender::Text(out) => assert_eq!(out.trim(), path.as_str()),
            RawRender::Structured(_) => panic!("Expected text output"),
        }
    }

    #[cfg(unix)]
    fn is_alive(pid: &str) -> bool {
        std::process::Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(Stdio::null())
            .status()
            .unwrap()
            .success()
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_kills_compiler() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let pid_file = dir.path().join("pid");
        let engine = shell(&format!("echo $$ > '{}'; exec sleep 5", pid_file.display()));
        let options = RenderOptions {
            deadline: Some(Instant::now() + Duration::from_millis(200)),
            ..RenderOptions::default()
        };

        let started = Instant::now();
        let err = engine.render("", &options).unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(err.message().contains("deadline"), "{err}");
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        assert!(!is_alive(&pid), "compiler {pid} still running");
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_not_reached() {
        let options = RenderOptions {
            deadline: Some(Instant::now() + Duration::from_secs(10)),
            ..RenderOptions::default()
        };
        let raw = shell("cat").render("a{}", &options).unwrap();
        assert_eq!(raw, RawRender::Text("a{}".to_owned()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_adapter_timeout_leaves_no_compiler_behind() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let pid_file = dir.path().join("pid");
        let engine = shell(&format!("echo $$ > '{}'; exec sleep 5", pid_file.display()));
        let adapter = crate::CompilerAdapter::new(engine).with_timeout(Some(Duration::from_millis(100)));

        let result = adapter.render(String::new(), RenderOptions::default()).await;
        assert!(matches!(result, Err(crate::RenderError::TimedOut(_))), "{result:?}");

        // The kill lands within one poll interval of the deadline.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        assert!(!is_alive(&pid), "compiler {pid} still running");
    }
}
