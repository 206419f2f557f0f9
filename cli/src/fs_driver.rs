use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use runner::{CommandOutput, ExecutionDriver};

use crate::data_dir::OUTPUT_DIR_NAME;

/// Writes snippets into an output directory and runs commands there.
pub struct FsDriver {
    /// Directory of the Markdown file; relative paths are resolved against it.
    markdown_dir: PathBuf,
    output_dir: PathBuf,
    verbose: bool,
}

impl FsDriver {
    pub fn new(markdown_dir: PathBuf, data_dir: &Path, verbose: bool) -> Self {
        FsDriver {
            markdown_dir,
            output_dir: data_dir.join(OUTPUT_DIR_NAME),
            verbose,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ExecutionDriver for FsDriver {
    fn set_markcheck_directory(&mut self, dir: &str) -> io::Result<()> {
        let data_dir = self.markdown_dir.join(dir);
        if !data_dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", data_dir.display()),
            ));
        }
        self.output_dir = data_dir.join(OUTPUT_DIR_NAME);
        Ok(())
    }

    fn write_file(&mut self, file_name: &str, lines: &[String]) -> io::Result<()> {
        let path = self.output_dir.join(file_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = lines.join("\n");
        content.push('\n');
        if self.verbose {
            println!("--- {} ---", path.display());
            print!("{}", content);
        }
        std::fs::write(&path, content)
    }

    fn read_file(&mut self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.markdown_dir.join(path))
    }

    fn run_command(&mut self, argv: &[String]) -> io::Result<CommandOutput> {
        let Some((program, args)) = argv.split_first() else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
        };
        if self.verbose {
            println!("$ {}", argv.join(" "));
        }
        std::fs::create_dir_all(&self.output_dir)?;
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.output_dir)
            .output()?;

        Ok(CommandOutput {
            exit_status: output.status.code(),
            signal: signal_of(&output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(unix)]
fn signal_of(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
