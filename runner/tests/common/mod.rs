#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::io;

use markcheck::{Config, MarkcheckEntity, ParsedDocument, Parser};
use runner::{AssemblyContext, CommandOutput, DocumentReport, ExecutionDriver, LanguageLineMods};

/// Records every write and command instead of touching the file system.
#[derive(Default)]
pub struct RecordingDriver {
    pub written: BTreeMap<String, Vec<String>>,
    pub commands: Vec<Vec<String>>,
    pub markcheck_directories: Vec<String>,
    /// Files visible to `containedInFile`.
    pub readable: BTreeMap<String, String>,
    /// Results handed out by `run_command`, in order. Exit status 0 once empty.
    pub responses: VecDeque<io::Result<CommandOutput>>,
    pub fail_writes: bool,
    pub fail_markcheck_directory: bool,
}

impl RecordingDriver {
    pub fn respond(&mut self, output: CommandOutput) {
        self.responses.push_back(Ok(output));
    }

    pub fn respond_with_error(&mut self, kind: io::ErrorKind) {
        self.responses.push_back(Err(io::Error::from(kind)));
    }
}

impl ExecutionDriver for RecordingDriver {
    fn set_markcheck_directory(&mut self, dir: &str) -> io::Result<()> {
        if self.fail_markcheck_directory {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        self.markcheck_directories.push(dir.to_string());
        Ok(())
    }

    fn write_file(&mut self, file_name: &str, lines: &[String]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.written.insert(file_name.to_string(), lines.to_vec());
        Ok(())
    }

    fn read_file(&mut self, path: &str) -> io::Result<String> {
        self.readable
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn run_command(&mut self, argv: &[String]) -> io::Result<CommandOutput> {
        self.commands.push(argv.to_vec());
        self.responses.pop_front().unwrap_or_else(|| Ok(exited(0, "")))
    }
}

pub fn exited(code: i32, stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_status: Some(code),
        stdout: stdout.to_string(),
        ..CommandOutput::default()
    }
}

pub fn parse(source: &str) -> ParsedDocument {
    Parser::new(source.to_string()).parse().expect("parse failed")
}

pub fn run(source: &str, driver: &mut RecordingDriver) -> DocumentReport {
    let document = parse(source);
    runner::run_document(&document, &Config::builtin(), driver).expect("internal error")
}

/// Language LineMods of the whole document, as the run pass sees them at its end.
pub fn language_line_mods(document: &ParsedDocument) -> LanguageLineMods {
    let mut line_mods = LanguageLineMods::default();
    for entity in &document.entities {
        if let MarkcheckEntity::LineMod(line_mod) = entity {
            line_mods.register(line_mod.clone());
        }
    }
    line_mods
}

/// Outer lines of snippet `id` with the built-in configuration.
pub fn outer_lines(source: &str, id: &str) -> Vec<String> {
    let document = parse(source);
    let config = Config::builtin();
    let line_mods = language_line_mods(&document);
    let assembly = AssemblyContext::new(&document, &config, &line_mods);
    let snippet = document.snippet(id).expect("unknown snippet id");
    assembly.assemble_outer_lines(snippet).expect("assembly failed")
}

/// Inner lines of snippet `id`, or the assembly error message.
pub fn inner_lines(source: &str, id: &str) -> Result<Vec<String>, String> {
    let document = parse(source);
    let config = Config::builtin();
    let line_mods = language_line_mods(&document);
    let assembly = AssemblyContext::new(&document, &config, &line_mods);
    let snippet = document.snippet(id).expect("unknown snippet id");
    assembly
        .assemble_inner_lines(snippet)
        .map_err(|error| error.message)
}
