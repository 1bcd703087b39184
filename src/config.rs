//! Compiler configuration.
//!
//! Values are layered, later layers overriding earlier ones: built-in
//! defaults, `<projdir>/vulsim.toml`, the file given with `--config`, and
//! finally every `--set key=value` in command line order.
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vulsim_ir::BackendConf;
use vulsim_utils::{Error, VulResult};

/// Name of the project-local configuration file.
pub const CONFIG_FILE: &str = "vulsim.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Spaces per indentation level in generated code.
    pub indent: usize,

    /// Extra headers included by every generated header.
    pub includes: Vec<String>,

    /// Directory holding `common.h`, `vulsimlib.h` and `lib/`, copied into
    /// the output next to the generated code.
    pub runtime_dir: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            indent: 4,
            includes: Vec::new(),
            runtime_dir: None,
        }
    }
}

impl CompilerConfig {
    pub fn backend_conf(&self) -> BackendConf {
        BackendConf {
            indent: self.indent,
            extra_includes: self.includes.clone(),
        }
    }
}

/// Load the configuration of the project at `projdir`.
pub fn load_config(
    projdir: &Path,
    explicit: Option<&Path>,
    sets: &[String],
) -> VulResult<CompilerConfig> {
    let project_file = projdir.join(CONFIG_FILE);
    log::info!("Loading config from {}", project_file.display());
    let mut config = Figment::from(Serialized::defaults(CompilerConfig::default()))
        .merge(Toml::file(project_file));
    if let Some(file) = explicit {
        if !file.is_file() {
            return Err(Error::invalid_file(format!(
                "Config file {} does not exist",
                file.display()
            )));
        }
        log::info!("Loading config from {}", file.display());
        config = config.merge(Toml::file(file));
    }

    // Use `--set` arguments to override configuration values.
    for set in sets {
        let (key, value) = set.split_once('=').ok_or_else(|| {
            Error::misc(format!(
                "--set arguments must be in key=value form, found `{set}`"
            ))
        })?;
        let dict = figment::util::nest(key, value.into());
        config = config.merge(Serialized::defaults(dict));
    }

    config
        .extract_lossy()
        .map_err(|err| Error::misc(format!("Invalid configuration: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_any_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path(), None, &[]).unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.backend_conf().indent, 4);
    }

    #[test]
    fn layers_override_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "indent = 2\nincludes = [\"trace.h\"]\n",
        )
        .unwrap();
        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "indent = 8\n").unwrap();

        let config = load_config(dir.path(), None, &[]).unwrap();
        assert_eq!(config.indent, 2);
        assert_eq!(config.includes, vec!["trace.h".to_string()]);

        let config = load_config(dir.path(), Some(&explicit), &[]).unwrap();
        assert_eq!(config.indent, 8);
        assert_eq!(config.includes, vec!["trace.h".to_string()]);

        let config = load_config(
            dir.path(),
            Some(&explicit),
            &["runtime_dir=/opt/vulsim".to_string()],
        )
        .unwrap();
        assert_eq!(config.indent, 8);
        assert_eq!(config.runtime_dir, Some(PathBuf::from("/opt/vulsim")));
    }

    #[test]
    fn malformed_set_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(dir.path(), None, &["indent".to_string()]).is_err());
    }

    #[test]
    fn missing_explicit_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(dir.path(), Some(&missing), &[]).is_err());
    }
}
