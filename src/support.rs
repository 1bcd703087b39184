//! Installation of the support headers the generated code includes.
use itertools::Itertools;
use std::path::{Path, PathBuf};
use vulsim_utils::{Diagnostics, Error, VulResult, Warning};

/// Headers shipped with the runtime library.
const RUNTIME_HEADERS: &[&str] = &["common.h", "vulsimlib.h"];
const RUNTIME_LIB_DIR: &str = "lib";

fn copy(from: &Path, to_dir: &Path) -> VulResult<()> {
    let Some(name) = from.file_name() else {
        return Err(Error::invalid_file(format!(
            "{} is not a file",
            from.display()
        )));
    };
    std::fs::copy(from, to_dir.join(name)).map_err(|err| {
        Error::write_error(format!("Failed to copy {}: {err}", from.display()))
    })?;
    log::info!("copy {}", from.display());
    Ok(())
}

fn copy_if_present(
    from: &Path,
    to_dir: &Path,
    diag: &mut Diagnostics,
) -> VulResult<()> {
    if from.is_file() {
        copy(from, to_dir)
    } else {
        diag.warn(Warning::MissingSupportFile {
            file: from.display().to_string(),
        });
        Ok(())
    }
}

/// `*.h` and `*.hpp` files of `dir`, in file-name order.
fn library_headers(dir: &Path) -> VulResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        Error::invalid_file(format!("Failed to list {}: {err}", dir.display()))
    })?;
    Ok(entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == "h" || ext == "hpp")
        })
        .sorted()
        .collect())
}

/// Copy the project's `global.h` and, when a runtime directory is
/// configured, the runtime headers into `output`.
pub fn install_support_headers(
    cpp_dir: &Path,
    runtime_dir: Option<&Path>,
    output: &Path,
    diag: &mut Diagnostics,
) -> VulResult<()> {
    copy_if_present(&cpp_dir.join("global.h"), output, diag)?;

    let Some(runtime) = runtime_dir else {
        log::info!(
            "No runtime directory configured, {} and {RUNTIME_LIB_DIR}/ have to be provided separately",
            RUNTIME_HEADERS.join(", ")
        );
        return Ok(());
    };
    for header in RUNTIME_HEADERS {
        copy_if_present(&runtime.join(header), output, diag)?;
    }

    let lib = runtime.join(RUNTIME_LIB_DIR);
    if !lib.is_dir() {
        diag.warn(Warning::MissingSupportFile {
            file: lib.display().to_string(),
        });
        return Ok(());
    }
    let lib_out = output.join(RUNTIME_LIB_DIR);
    std::fs::create_dir_all(&lib_out)?;
    for header in library_headers(&lib)? {
        copy(&header, &lib_out)?;
    }
    Ok(())
}
