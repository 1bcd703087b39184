//! Driver for the VulSim compiler.
use crate::cmdline::Opts;
use crate::config::{self, CompilerConfig};
use crate::support;
use std::path::Path;
use vulsim_backend::{Backend, CppBackend};
use vulsim_frontend as frontend;
use vulsim_ir as ir;
use vulsim_utils::{Diagnostics, Error, VulResult};

/// Create `output` if it does not exist. An existing output directory must
/// be empty.
fn prepare_output(output: &Path) -> VulResult<()> {
    if output.exists() {
        let non_empty = std::fs::read_dir(output)
            .map_err(|err| {
                Error::structure(format!(
                    "Cannot use `{}` as output directory: {err}",
                    output.display()
                ))
            })?
            .next()
            .is_some();
        if non_empty {
            return Err(Error::structure(format!(
                "Output directory `{}` is not empty, please clear it",
                output.display()
            )));
        }
        return Ok(());
    }
    std::fs::create_dir_all(output).map_err(|err| {
        Error::structure(format!(
            "Cannot create output directory `{}`: {err}",
            output.display()
        ))
    })
}

/// Compile the project at `projdir` into `output`.
///
/// Every unit is generated before the first file is written, so a fatal
/// error leaves the output directory empty. Combines with a recoverable
/// error are not written; they are reported in the returned diagnostics.
pub fn compile(
    projdir: &Path,
    output: &Path,
    config: &CompilerConfig,
) -> VulResult<Diagnostics> {
    frontend::Workspace::check_structure(projdir)?;
    prepare_output(output)?;

    // Construct the namespace.
    let ws = frontend::Workspace::construct(projdir)?;
    let cpp_dir = ws.cpp_dir.clone();

    // Build the IR representation
    let mut ctx = ir::ast_to_ir(ws, config.backend_conf())?;

    let backend = CppBackend;
    log::info!("Running the {} backend", backend.name());
    let units = backend.run(&ctx)?;
    for unit in &units {
        unit.write_to(output)?;
    }
    support::install_support_headers(
        &cpp_dir,
        config.runtime_dir.as_deref(),
        output,
        &mut ctx.diagnostics,
    )?;
    Ok(ctx.diagnostics)
}

/// Run the compiler from the command line.
pub fn run_compiler() -> VulResult<()> {
    // parse the command line arguments into Opts struct
    let opts = Opts::get_opts();

    // enable tracing
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let config =
        config::load_config(&opts.projdir, opts.config.as_deref(), &opts.set)?;
    let diagnostics = compile(&opts.projdir, &opts.output, &config)?;

    for line in diagnostics.summary() {
        println!("{line}");
    }
    if diagnostics.has_errors() {
        return Err(Error::misc(format!(
            "{} combine(s) could not be generated",
            diagnostics.errors().len()
        )));
    }
    println!("Generated code in {}", opts.output.display());
    Ok(())
}
