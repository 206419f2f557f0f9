use std::io;

/// What one command produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// `None` if the process was killed by a signal.
    pub exit_status: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        self.signal.is_none() && self.exit_status == Some(0)
    }
}

/// Writes files and runs commands on behalf of the run pass. The run pass
/// itself performs no I/O.
pub trait ExecutionDriver {
    /// A `markcheckDirectory` override from a `config:` directive.
    fn set_markcheck_directory(&mut self, _dir: &str) -> io::Result<()> {
        Ok(())
    }

    /// Write `lines` to `file_name` in the output directory.
    fn write_file(&mut self, file_name: &str, lines: &[String]) -> io::Result<()>;

    /// Read a file relative to the Markdown document (`containedInFile`).
    fn read_file(&mut self, path: &str) -> io::Result<String>;

    /// Run `argv` in the output directory and capture its output.
    fn run_command(&mut self, argv: &[String]) -> io::Result<CommandOutput>;
}
