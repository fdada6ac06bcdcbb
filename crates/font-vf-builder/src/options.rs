//! Options for variable font building

use read_fonts::types::Tag;

/// Feature that carries substitution-rule lookups.
pub const DEFAULT_FEATURE_VARIATION_TAG: Tag = Tag::new(b"rvrn");

/// Options for variable font building
#[derive(Debug, Clone)]
pub struct Options {
    /// Tables to drop from the final font
    pub drop_tables: Vec<Tag>,

    /// Whether to mark glyph deltas inferable by IUP as optional
    pub optimize_gvar: bool,

    /// Whether to compile masters in parallel
    pub parallel_compile: bool,

    /// Feature whose alternates implement substitution rules
    pub feature_variation_tag: Tag,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            drop_tables: Vec::new(),
            optimize_gvar: false,
            parallel_compile: false,
            feature_variation_tag: DEFAULT_FEATURE_VARIATION_TAG,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add tables to drop (four-character tags; shorter names are space padded)
    pub fn drop_tables(mut self, tables: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.drop_tables = tables.into_iter().filter_map(|s| parse_tag(s.as_ref())).collect();
        self
    }

    /// Add a single table to drop
    pub fn drop_table(mut self, table: impl AsRef<str>) -> Self {
        if let Some(tag) = parse_tag(table.as_ref()) {
            self.drop_tables.push(tag);
        }
        self
    }

    pub fn optimize_gvar(mut self, optimize: bool) -> Self {
        self.optimize_gvar = optimize;
        self
    }

    pub fn parallel_compile(mut self, parallel: bool) -> Self {
        self.parallel_compile = parallel;
        self
    }

    pub fn feature_variation_tag(mut self, tag: Tag) -> Self {
        self.feature_variation_tag = tag;
        self
    }

    /// Check if a table should be dropped
    pub fn should_drop(&self, tag: Tag) -> bool {
        self.drop_tables.contains(&tag)
    }
}

fn parse_tag(s: &str) -> Option<Tag> {
    if s.is_empty() || s.len() > 4 || !s.is_ascii() {
        return None;
    }
    let mut bytes = [b' '; 4];
    bytes[..s.len()].copy_from_slice(s.as_bytes());
    Some(Tag::new(&bytes))
}
