use std::path::{Path, PathBuf};

use markcheck::config::parse_config_patch;
use markcheck::{Config, MarkcheckSyntaxError};

/// Name of the directory that holds `config.yaml` and the generated files.
pub const DATA_DIR_NAME: &str = "markcheck-data";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
/// Subdirectory of the data directory that snippets are written to and run in.
pub const OUTPUT_DIR_NAME: &str = "tmp";

/// The nearest `markcheck-data/` directory in the ancestors of `markdown_file`.
pub fn find_data_dir(markdown_file: &Path) -> Option<PathBuf> {
    let absolute = std::path::absolute(markdown_file).ok()?;
    absolute
        .parent()?
        .ancestors()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// The built-in defaults with `<data_dir>/config.yaml` applied, if it exists.
pub fn load_config(data_dir: Option<&Path>) -> Result<Config, MarkcheckSyntaxError> {
    let base = Config::builtin();
    let Some(data_dir) = data_dir else {
        return Ok(base);
    };
    let path = data_dir.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(base);
    }

    let description = path.display().to_string();
    let text = std::fs::read_to_string(&path).map_err(|e| {
        MarkcheckSyntaxError::described(&description, format!("Can't read config file: {}", e))
    })?;
    let patch = parse_config_patch(&text).map_err(|e| {
        MarkcheckSyntaxError::described(&description, e.message)
    })?;
    Ok(base.apply_patch(&patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    use markcheck::LangDef;

    #[test]
    fn finds_nearest_data_dir() {
        let root = tempfile::tempdir().unwrap();
        let outer = root.path().join(DATA_DIR_NAME);
        let nested = root.path().join("docs").join("guide");
        std::fs::create_dir_all(&outer).unwrap();
        std::fs::create_dir_all(&nested).unwrap();

        let markdown = nested.join("readme.md");
        assert_eq!(find_data_dir(&markdown), Some(outer));

        let inner = root.path().join("docs").join(DATA_DIR_NAME);
        std::fs::create_dir_all(&inner).unwrap();
        assert_eq!(find_data_dir(&markdown), Some(inner));
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let data = tempfile::tempdir().unwrap();
        let config = load_config(Some(data.path())).unwrap();
        assert_eq!(config, Config::builtin());
    }

    #[test]
    fn config_file_is_applied() {
        let data = tempfile::tempdir().unwrap();
        std::fs::write(
            data.path().join(CONFIG_FILE_NAME),
            "{ lang: { rust: '[skip]' } }\n",
        )
        .unwrap();
        let config = load_config(Some(data.path())).unwrap();
        assert_eq!(config.get_lang("rust").unwrap(), Some(LangDef::Skip));
        assert!(config.get_lang("js").unwrap().is_some());
    }

    #[test]
    fn invalid_config_file_names_the_file() {
        let data = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join(CONFIG_FILE_NAME), "{ langs: {} }").unwrap();
        let error = load_config(Some(data.path())).unwrap_err();
        assert!(error.to_string().contains(CONFIG_FILE_NAME));
    }
}
