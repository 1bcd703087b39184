use crate::{
    ast::{BundleDef, CombineDef},
    parser::DescriptorParser,
};
use std::path::{Path, PathBuf};
use vulsim_utils::{Error, VulResult};

/// A Workspace represents every descriptor of a VulSim project.
///
/// # Example
/// A project directory is laid out as:
/// ```text
/// pipe5/
///   bundle/    IDData.xml, ExData.xml, ...
///   combine/   IFStage.xml, IDStage.xml, ...
///   cpp/       IFStage.cpp, global.h, ...
/// ```
/// Every `*.xml` file in `bundle/` must have the root tag `bundle` and every
/// `*.xml` file in `combine/` the root tag `combine`. Files are read in
/// file-name order so that repeated runs see descriptors in the same order.
/// `cpp/` holds the hand-written sources that `cppfunc` elements point into.
#[derive(Debug, Default)]
pub struct Workspace {
    /// Directory holding the hand-written C++ sources.
    pub cpp_dir: PathBuf,
    /// Bundle definitions, in file-name order.
    pub bundles: Vec<BundleDef>,
    /// Combine definitions, in file-name order.
    pub combines: Vec<CombineDef>,
}

impl Workspace {
    pub const BUNDLE_DIR: &'static str = "bundle";
    pub const COMBINE_DIR: &'static str = "combine";
    pub const CPP_DIR: &'static str = "cpp";

    /// Checks that `root` has the `bundle/`, `combine/` and `cpp/`
    /// subdirectories.
    pub fn check_structure(root: &Path) -> VulResult<()> {
        if !root.is_dir() {
            return Err(Error::structure(format!(
                "`{}` is not a directory",
                root.display()
            )));
        }
        for sub in [Self::BUNDLE_DIR, Self::COMBINE_DIR, Self::CPP_DIR] {
            if !root.join(sub).is_dir() {
                return Err(Error::structure(format!(
                    "Project directory `{}` has no `{sub}` subdirectory",
                    root.display()
                )));
            }
        }
        Ok(())
    }

    /// Sorted list of descriptor files in `dir`.
    fn descriptor_files(dir: &Path) -> VulResult<Vec<PathBuf>> {
        let mut files = std::fs::read_dir(dir)
            .map_err(|err| {
                Error::invalid_file(format!(
                    "Failed to list {}: {err}",
                    dir.display()
                ))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path.extension().is_some_and(|ext| ext == "xml")
            })
            .collect::<Vec<_>>();
        files.sort();
        Ok(files)
    }

    /// Construct a new workspace by reading every descriptor of the project
    /// at `root`. The first descriptor that fails to parse aborts
    /// construction.
    pub fn construct(root: &Path) -> VulResult<Self> {
        Self::check_structure(root)?;

        let bundles = Self::descriptor_files(&root.join(Self::BUNDLE_DIR))?
            .iter()
            .map(|file| DescriptorParser::parse_bundle_file(file))
            .collect::<VulResult<Vec<_>>>()?;
        let combines = Self::descriptor_files(&root.join(Self::COMBINE_DIR))?
            .iter()
            .map(|file| DescriptorParser::parse_combine_file(file))
            .collect::<VulResult<Vec<_>>>()?;

        Ok(Workspace {
            cpp_dir: root.join(Self::CPP_DIR),
            bundles,
            combines,
        })
    }
}
