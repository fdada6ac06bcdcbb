//! Name table rebuilt with axis, instance and style-label names.

use std::collections::BTreeMap;

use read_fonts::{FontRef, TableProvider, types::NameId};
use write_fonts::tables::name::{Name, NameRecord};

/// Starting name ID for added names (256+ are font-specific)
const FIRST_FONT_SPECIFIC_NAME_ID: u16 = 256;

/// Copies the base master's name records and hands out ids for new names.
///
/// Identical strings share one id.
pub(crate) struct NameTableBuilder {
    records: Vec<NameRecord>,
    added: BTreeMap<String, NameId>,
    next_id: u16,
}

impl NameTableBuilder {
    pub fn new(base: &FontRef) -> Self {
        let mut records = Vec::new();
        let mut max_id = FIRST_FONT_SPECIFIC_NAME_ID - 1;

        if let Ok(name_table) = base.name() {
            for record in name_table.name_record() {
                let Ok(string) = record.string(name_table.string_data()) else {
                    continue;
                };
                let name_id = record.name_id();
                max_id = max_id.max(name_id.to_u16());
                records.push(NameRecord::new(
                    record.platform_id(),
                    record.encoding_id(),
                    record.language_id(),
                    name_id,
                    string.chars().collect::<String>().into(),
                ));
            }
        }

        Self { records, added: BTreeMap::new(), next_id: max_id.saturating_add(1) }
    }

    /// Name ID carrying `text`, adding Windows and Mac records on first use.
    pub fn add(&mut self, text: &str) -> NameId {
        if let Some(id) = self.added.get(text) {
            return *id;
        }
        let name_id = NameId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        // Windows (platformID=3, encodingID=1, languageID=0x409)
        self.records.push(NameRecord::new(3, 1, 0x409, name_id, text.to_string().into()));
        // Mac (platformID=1, encodingID=0, languageID=0)
        self.records.push(NameRecord::new(1, 0, 0, name_id, text.to_string().into()));

        self.added.insert(text.to_string(), name_id);
        name_id
    }

    pub fn build(mut self) -> Name {
        // Sort records by (platformID, encodingID, languageID, nameID)
        self.records.sort_by(|a, b| {
            (a.platform_id, a.encoding_id, a.language_id, a.name_id).cmp(&(
                b.platform_id,
                b.encoding_id,
                b.language_id,
                b.name_id,
            ))
        });
        Name::new(self.records)
    }
}
