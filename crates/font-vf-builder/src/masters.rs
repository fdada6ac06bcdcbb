//! Parsed views of the compiled masters.

use read_fonts::{FontRef, TableProvider, types::GlyphId};

use crate::{
    compiler::CompiledMaster,
    error::{Error, Result},
    variation_model::VariationModel,
};

/// The compiled masters, parsed, alongside the model that relates them.
pub(crate) struct Masters<'a> {
    pub fonts: Vec<FontRef<'a>>,
    pub compiled: &'a [CompiledMaster],
    pub model: &'a VariationModel,
    pub base: usize,
}

impl<'a> Masters<'a> {
    pub fn new(compiled: &'a [CompiledMaster], model: &'a VariationModel) -> Result<Self> {
        if compiled.len() != model.master_count() {
            return Err(Error::merge(
                "masters",
                format!(
                    "{} compiled masters for {} master locations",
                    compiled.len(),
                    model.master_count()
                ),
            ));
        }

        let fonts = compiled
            .iter()
            .enumerate()
            .map(|(index, master)| {
                let font = FontRef::new(&master.data)?;
                if font.glyf().is_err() {
                    return Err(Error::UnsupportedMasterFormat { index, name: master.name.clone() });
                }
                Ok(font)
            })
            .collect::<Result<Vec<_>>>()?;

        let base = model.base_index();
        if compiled[base].sparse {
            return Err(Error::InvalidBaseMaster(compiled[base].name.clone()));
        }

        Ok(Self { fonts, compiled, model, base })
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn base_font(&self) -> &FontRef<'a> {
        &self.fonts[self.base]
    }

    pub fn name(&self, index: usize) -> &str {
        &self.compiled[index].name
    }

    pub fn num_glyphs(&self) -> Result<u16> {
        Ok(self.base_font().maxp()?.num_glyphs())
    }

    pub fn is_present(&self, index: usize, gid: GlyphId) -> bool {
        self.compiled[index].is_present(gid)
    }

    /// Presence mask selecting the masters that carry the whole font.
    pub fn full_mask(&self) -> Vec<bool> {
        self.compiled.iter().map(|m| !m.sparse).collect()
    }

    /// Indices of the full masters, in master order.
    pub fn full_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|i| !self.compiled[*i].sparse).collect()
    }

    pub fn glyph_name(&self, gid: GlyphId) -> Option<&str> {
        self.compiled[self.base].glyph_order.get(gid.to_u32() as usize).map(String::as_str)
    }

    /// Glyph id of `name` in the shared glyph order.
    pub fn glyph_id(&self, name: &str) -> Option<GlyphId> {
        self.compiled[self.base]
            .glyph_order
            .iter()
            .position(|n| n == name)
            .map(|i| GlyphId::new(i as u32))
    }
}
