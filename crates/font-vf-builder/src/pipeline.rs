//! End-to-end build: expand the design space, compile every master, build
//! the variation model and merge.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use log::info;
use varlayer_font_designspace::{
    DesignSpace, Diagnostics, SourceArena, apply_brace_layers, apply_bracket_layers,
};

use crate::{
    compiler::{CompiledMaster, MasterCompiler, compile_masters},
    error::{Error, Result},
    options::Options,
    variation_model::VariationModel,
    vf_builder::build_variable_font,
};

/// A failed build, with whatever masters were compiled before the failure.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct BuildFailure {
    #[source]
    pub error: Error,
    /// Compiled masters, in master order; empty if compilation never finished
    pub masters: Vec<CompiledMaster>,
}

impl BuildFailure {
    /// Save each compiled master as `{index}.ttf` under `dir`.
    pub fn write_masters(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.masters
            .iter()
            .enumerate()
            .map(|(index, master)| -> Result<PathBuf> {
                let path = dir.join(format!("{index}.ttf"));
                fs::write(&path, &master.data)?;
                info!("Saved master '{}' to {}", master.name, path.display());
                Ok(path)
            })
            .collect()
    }
}

impl From<Error> for BuildFailure {
    fn from(error: Error) -> Self {
        Self { error, masters: Vec::new() }
    }
}

impl From<varlayer_font_designspace::Error> for BuildFailure {
    fn from(error: varlayer_font_designspace::Error) -> Self {
        Error::from(error).into()
    }
}

/// Build a variable font from a design space and its loaded sources.
///
/// Bracket layers are expanded first, so that sparse masters created from
/// brace layers see the cloned glyphs. The design space and the sources
/// are left expanded.
pub fn generate_variable_font(
    designspace: &mut DesignSpace,
    sources: &mut SourceArena,
    compiler: &dyn MasterCompiler,
    options: &Options,
    diagnostics: &dyn Diagnostics,
) -> std::result::Result<Vec<u8>, BuildFailure> {
    let start = Instant::now();
    designspace.resolve_defaults();

    let rules = apply_bracket_layers(designspace, sources, diagnostics)?;
    let sparse = apply_brace_layers(designspace, sources, diagnostics)?;
    if rules > 0 || sparse > 0 {
        diagnostics.info(&format!(
            "Expanded design space: {rules} substitution rules, {sparse} sparse masters"
        ));
    }

    let sources: &SourceArena = sources;
    let masters = compile_masters(designspace, sources, compiler, options, diagnostics)?;
    let merged = VariationModel::from_designspace(designspace).and_then(|model| {
        build_variable_font(designspace, &masters, &model, options, diagnostics)
    });

    match merged {
        Ok(data) => {
            diagnostics.info(&format!(
                "Generated variable font in {:.2}s",
                start.elapsed().as_secs_f64()
            ));
            Ok(data)
        }
        Err(error) => {
            diagnostics.warn(&format!("Variable font build failed: {error}"));
            Err(BuildFailure { error, masters })
        }
    }
}
