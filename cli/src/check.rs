use std::path::{Path, PathBuf};

use markcheck::MarkcheckSyntaxError;
use runner::{DocumentReport, ExecutionDriver, InternalError};

use crate::data_dir;
use crate::fs_driver::FsDriver;

/// A checked Markdown file: its source, empty if it couldn't be read, and its report.
pub struct CheckedFile {
    pub name: String,
    pub source: String,
    pub report: DocumentReport,
}

/// Check one Markdown file. Problems with the file itself or its data
/// directory end up in the report; only an [`InternalError`] is returned.
pub fn check_file(
    file: &Path,
    data_dir_override: Option<&Path>,
    verbose: bool,
) -> Result<CheckedFile, InternalError> {
    let name = file.display().to_string();
    let failed = |name: String, source: String, error: MarkcheckSyntaxError| CheckedFile {
        name,
        source,
        report: DocumentReport::from_parse_errors(vec![error]),
    };

    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            let error = MarkcheckSyntaxError::described(&name, format!("Can't read file: {}", e));
            return Ok(failed(name, String::new(), error));
        }
    };

    let Some(data_dir) = data_dir_override
        .map(Path::to_path_buf)
        .or_else(|| data_dir::find_data_dir(file))
    else {
        let error = MarkcheckSyntaxError::described(
            &name,
            format!(
                "No `{}` directory found next to the file or in its ancestors",
                data_dir::DATA_DIR_NAME
            ),
        );
        return Ok(failed(name, source, error));
    };

    let config = match data_dir::load_config(Some(&data_dir)) {
        Ok(config) => config,
        Err(error) => return Ok(failed(name, source, error)),
    };
    let document = match markcheck::Parser::new(source.clone()).parse() {
        Ok(document) => document,
        Err(errors) => {
            return Ok(CheckedFile {
                name,
                source,
                report: DocumentReport::from_parse_errors(errors),
            });
        }
    };

    let markdown_dir = file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut driver = FsDriver::new(markdown_dir, &data_dir, verbose);
    if let Some(dir) = config.markcheck_directory() {
        if let Err(e) = driver.set_markcheck_directory(dir) {
            let error = MarkcheckSyntaxError::described(
                &name,
                format!("Can't use markcheck directory `{}`: {}", dir, e),
            );
            return Ok(failed(name, source, error));
        }
    }

    let report = runner::run_document(&document, &config, &mut driver)?;
    Ok(CheckedFile {
        name,
        source,
        report,
    })
}
