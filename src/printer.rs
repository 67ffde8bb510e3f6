//! Submitting print documents to a printer
//!
//! Printing is delegated to external programs. A [`SystemPrinter`] holds a
//! ranked list of [`PrintMethod`]s and tries them in order until one exits
//! successfully; every attempt is bounded by its own timeout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, info};
use crate::error::{Error, Result};

/// Placeholder replaced by the document path in method arguments
pub const PATH_PLACEHOLDER: &str = "{}";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Something that can print a finished PDF
pub trait Printer {
    /// Short name for log messages
    fn name(&self) -> &str;

    /// Submit `path` for printing, returning once the outcome is known
    fn print(&self, path: &Path) -> Result<()>;
}

/// One way of printing a file with an external program
#[derive(Debug, Clone)]
pub struct PrintMethod {
    /// Name used in error reports, e.g. "Adobe Reader"
    pub label: String,
    /// Program to run
    pub program: PathBuf,
    /// Arguments; `{}` is replaced by the document path, which is appended
    /// when no argument contains the placeholder
    pub args: Vec<String>,
    /// Longest time the program may run
    pub timeout: Duration,
    /// Pause after a successful submission so the job reaches the queue
    pub settle: Duration,
    /// Skip this method when `program` is not an existing file
    pub requires_installed: bool,
}

impl PrintMethod {
    pub fn new(label: &str, program: impl Into<PathBuf>, args: &[&str], timeout: Duration) -> Self {
        Self {
            label: label.to_string(),
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
            settle: Duration::ZERO,
            requires_installed: false,
        }
    }

    /// Only try this method if the program is installed at its path
    pub fn installed_only(mut self) -> Self {
        self.requires_installed = true;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn is_available(&self) -> bool {
        !self.requires_installed || self.program.is_file()
    }

    /// Build the command line for printing `path`
    pub fn command(&self, path: &Path) -> Command {
        let path_str = path.display().to_string();
        let mut command = Command::new(&self.program);
        let mut substituted = false;
        for arg in &self.args {
            if arg.contains(PATH_PLACEHOLDER) {
                substituted = true;
                command.arg(arg.replace(PATH_PLACEHOLDER, &path_str));
            } else {
                command.arg(arg);
            }
        }
        if !substituted {
            command.arg(path);
        }
        command
    }

    /// Run this method once
    pub fn run(&self, path: &Path) -> Result<()> {
        run_with_timeout(self.command(path), self.timeout)?;
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        Ok(())
    }
}

/// Run `command` to completion, killing it if it outlives `timeout`
///
/// stderr is read on its own thread so a chatty program cannot fill the pipe
/// and stall until the deadline. The reader is only joined on failure; a
/// viewer left running by the program may hold the pipe open indefinitely.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::PrintFailure(format!("{}: {}", program, e)))?;

    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                return Ok(());
            }
            let stderr = stderr_reader
                .and_then(|handle| handle.join().ok())
                .map(|buf| String::from_utf8_lossy(&buf).trim().to_string())
                .unwrap_or_default();
            return Err(Error::PrintFailure(if stderr.is_empty() {
                format!("{} exited with {}", program, status)
            } else {
                format!("{} exited with {}: {}", program, status, last_line(&stderr))
            }));
        }

        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::PrintTimeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Last non-empty line of a program's error output
fn last_line(output: &str) -> &str {
    output.lines().rev().map(str::trim).find(|l| !l.is_empty()).unwrap_or(output)
}

/// Prints through the first working method of a ranked list
#[derive(Debug, Clone)]
pub struct SystemPrinter {
    methods: Vec<PrintMethod>,
}

impl SystemPrinter {
    pub fn new(methods: Vec<PrintMethod>) -> Self {
        Self { methods }
    }

    /// Default methods for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self::new(platform_methods())
    }

    /// Override the per-attempt timeout of every method
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        for method in &mut self.methods {
            method.timeout = timeout;
        }
        self
    }

    pub fn methods(&self) -> &[PrintMethod] {
        &self.methods
    }
}

impl Printer for SystemPrinter {
    fn name(&self) -> &str {
        "system"
    }

    fn print(&self, path: &Path) -> Result<()> {
        let mut failures: Vec<Error> = Vec::new();

        for method in &self.methods {
            if !method.is_available() {
                debug!("{} not installed at {}", method.label, method.program.display());
                continue;
            }
            debug!("Trying {} for {}", method.label, path.display());
            match method.run(path) {
                Ok(()) => {
                    debug!("{} accepted {}", method.label, path.display());
                    return Ok(());
                }
                Err(e) => {
                    debug!("{} failed: {}", method.label, e);
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            return Err(Error::PrintFailure(format!(
                "no print method available; print {} manually",
                path.display()
            )));
        }
        if failures.len() == 1 {
            if let Some(Error::PrintTimeout(timeout)) = failures.first() {
                return Err(Error::PrintTimeout(*timeout));
            }
        }

        let details: Vec<String> = self
            .methods
            .iter()
            .filter(|m| m.is_available())
            .zip(&failures)
            .map(|(m, e)| format!("{}: {}", m.label, e))
            .collect();
        Err(Error::PrintFailure(format!(
            "{}; print {} manually",
            details.join("; "),
            path.display()
        )))
    }
}

#[cfg(target_os = "windows")]
fn platform_methods() -> Vec<PrintMethod> {
    let timeout = Duration::from_secs(20);
    let settle = Duration::from_secs(2);
    let mut methods = Vec::new();

    for reader in [
        r"C:\Program Files\Adobe\Acrobat DC\Acrobat\Acrobat.exe",
        r"C:\Program Files (x86)\Adobe\Acrobat Reader DC\Reader\AcroRd32.exe",
        r"C:\Program Files\Adobe\Acrobat Reader DC\Reader\AcroRd32.exe",
    ] {
        methods.push(
            PrintMethod::new("Adobe Reader", reader, &["/t"], timeout)
                .installed_only()
                .with_settle(settle),
        );
    }

    for edge in [
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
    ] {
        methods.push(
            PrintMethod::new("Microsoft Edge", edge, &["file:///{}", "--print"], timeout)
                .installed_only()
                .with_settle(settle),
        );
    }

    methods.push(
        PrintMethod::new(
            "PowerShell",
            "powershell",
            &["-Command", "Start-Process -FilePath \"{}\" -Verb Print -WindowStyle Hidden"],
            timeout,
        )
        .with_settle(settle),
    );

    methods
}

#[cfg(target_os = "macos")]
fn platform_methods() -> Vec<PrintMethod> {
    vec![PrintMethod::new("lpr", "lpr", &[], Duration::from_secs(30)).with_settle(Duration::from_secs(1))]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn platform_methods() -> Vec<PrintMethod> {
    vec![PrintMethod::new("lp", "lp", &[], Duration::from_secs(30)).with_settle(Duration::from_secs(1))]
}

/// Runs a user-supplied command line for every document
#[derive(Debug, Clone)]
pub struct CommandPrinter {
    method: PrintMethod,
}

impl CommandPrinter {
    /// Parse a whitespace-separated command line such as `lp -d office`
    /// or `print-tool --file {} --copies 1`. Quoting is not supported.
    pub fn parse(command_line: &str, timeout: Duration) -> Result<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::General("Print command is empty".to_string()))?;
        let args: Vec<&str> = parts.collect();
        Ok(Self {
            method: PrintMethod::new("print command", program, &args, timeout),
        })
    }
}

impl Printer for CommandPrinter {
    fn name(&self) -> &str {
        "command"
    }

    fn print(&self, path: &Path) -> Result<()> {
        self.method.run(path)
    }
}

/// Logs instead of printing
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunPrinter;

impl Printer for DryRunPrinter {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn print(&self, path: &Path) -> Result<()> {
        info!("Dry run: would print {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(command: &Command) -> Vec<String> {
        command.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_path_appended_without_placeholder() {
        let method = PrintMethod::new("lp", "lp", &["-d", "office"], Duration::from_secs(1));
        let command = method.command(Path::new("/tmp/C1_temp_print.pdf"));
        assert_eq!(args_of(&command), vec!["-d", "office", "/tmp/C1_temp_print.pdf"]);
    }

    #[test]
    fn test_path_substituted_into_placeholder() {
        let method = PrintMethod::new("edge", "msedge", &["file:///{}", "--print"], Duration::from_secs(1));
        let command = method.command(Path::new("C1.pdf"));
        assert_eq!(args_of(&command), vec!["file:///C1.pdf", "--print"]);
    }

    #[test]
    fn test_installed_only_method_is_unavailable_when_missing() {
        let method = PrintMethod::new("reader", "/no/such/reader.exe", &[], Duration::from_secs(1)).installed_only();
        assert!(!method.is_available());
        let method = PrintMethod::new("lp", "lp", &[], Duration::from_secs(1));
        assert!(method.is_available());
    }

    #[test]
    fn test_empty_command_line_is_rejected() {
        assert!(CommandPrinter::parse("   ", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_no_available_method_fails() {
        let printer = SystemPrinter::new(vec![
            PrintMethod::new("reader", "/no/such/reader.exe", &[], Duration::from_secs(1)).installed_only(),
        ]);
        let err = printer.print(Path::new("C1.pdf")).unwrap_err();
        assert!(matches!(err, Error::PrintFailure(_)));
    }

    #[test]
    fn test_with_timeout_applies_to_all_methods() {
        let printer = SystemPrinter::for_current_platform().with_timeout(Duration::from_secs(5));
        assert!(!printer.methods().is_empty());
        assert!(printer.methods().iter().all(|m| m.timeout == Duration::from_secs(5)));
    }

    #[test]
    fn test_dry_run_always_succeeds() {
        assert!(DryRunPrinter.print(Path::new("missing.pdf")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_printer_exit_status() {
        let ok = CommandPrinter::parse("true", Duration::from_secs(5)).unwrap();
        assert!(ok.print(Path::new("C1.pdf")).is_ok());

        let failing = CommandPrinter::parse("false", Duration::from_secs(5)).unwrap();
        assert!(matches!(failing.print(Path::new("C1.pdf")), Err(Error::PrintFailure(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_program_is_a_print_failure() {
        let printer = CommandPrinter::parse("/no/such/printer-tool", Duration::from_secs(5)).unwrap();
        assert!(matches!(printer.print(Path::new("C1.pdf")), Err(Error::PrintFailure(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_command_times_out() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let started = Instant::now();
        let err = run_with_timeout(command, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, Error::PrintTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_large_error_output_does_not_stall() {
        let mut command = Command::new("sh");
        command.args(["-c", "head -c 300000 /dev/zero | tr '\\0' '\\n' >&2; echo 'printer offline' >&2; exit 1"]);
        let started = Instant::now();
        let err = run_with_timeout(command, Duration::from_secs(10)).unwrap_err();
        match err {
            Error::PrintFailure(message) => {
                assert!(message.contains("exit status: 1"), "{}", message);
                assert!(message.ends_with("printer offline"), "{}", message);
            }
            other => panic!("expected a print failure, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(8));
    }

    #[test]
    fn test_last_line_of_error_output() {
        assert_eq!(last_line("warming up\nno paper\n\n"), "no paper");
        assert_eq!(last_line("single"), "single");
    }

    #[cfg(unix)]
    #[test]
    fn test_falls_back_to_next_method() {
        let printer = SystemPrinter::new(vec![
            PrintMethod::new("reader", "/no/such/reader.exe", &[], Duration::from_secs(5)).installed_only(),
            PrintMethod::new("broken", "false", &[], Duration::from_secs(5)),
            PrintMethod::new("working", "true", &[], Duration::from_secs(5)),
        ]);
        assert!(printer.print(Path::new("C1.pdf")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_all_failures_are_reported_together() {
        let printer = SystemPrinter::new(vec![
            PrintMethod::new("first", "false", &[], Duration::from_secs(5)),
            PrintMethod::new("second", "false", &[], Duration::from_secs(5)),
        ]);
        let message = printer.print(Path::new("C1.pdf")).unwrap_err().to_string();
        assert!(message.contains("first"), "{}", message);
        assert!(message.contains("second"), "{}", message);
    }
}
