//! The fixed set of outfit descriptions uploads are ranked against.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use crate::error::{MatchError, Result};
use crate::types::OutfitEntry;

const BUILTIN: [(&str, &str); 4] = [
    (
        "outfit_1",
        "White oversized shirt with blue ripped jeans and white sneakers.",
    ),
    (
        "outfit_2",
        "Black crop top with high-waisted trousers and chunky boots.",
    ),
    (
        "outfit_3",
        "Beige trench coat over a black turtleneck and plaid skirt.",
    ),
    (
        "outfit_4",
        "Yellow sundress with floral print and wedge heels.",
    ),
];

/// Accepted file shapes: `{"id": "description", ...}` or `[{"id", "description"}, ...]`.
///
/// Both shapes are read pair by pair in file order, so a repeated key in the
/// object form reaches [`Catalog::new`] instead of overwriting the first one.
struct CatalogFile(Vec<OutfitEntry>);

impl<'de> Deserialize<'de> for CatalogFile {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(CatalogFileVisitor)
    }
}

struct CatalogFileVisitor;

impl<'de> Visitor<'de> for CatalogFileVisitor {
    type Value = CatalogFile;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of id to description, or a list of outfits")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((id, description)) = map.next_entry::<String, String>()? {
            entries.push(OutfitEntry { id, description });
        }
        Ok(CatalogFile(entries))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut entries = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(entry) = seq.next_element::<OutfitEntry>()? {
            entries.push(entry);
        }
        Ok(CatalogFile(entries))
    }
}

/// Ordered, immutable list of outfits with unique ids.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<OutfitEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<OutfitEntry>) -> Result<Self> {
        let mut ids = HashSet::with_capacity(entries.len());
        for e in &entries {
            if e.id.trim().is_empty() {
                return Err(MatchError::Catalog("empty outfit id".into()));
            }
            if e.description.trim().is_empty() {
                return Err(MatchError::Catalog(format!(
                    "outfit {} has an empty description",
                    e.id
                )));
            }
            if !ids.insert(e.id.as_str()) {
                return Err(MatchError::Catalog(format!("duplicate outfit id {}", e.id)));
            }
        }
        Ok(Self { entries })
    }

    /// The four reference outfits.
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(id, desc)| OutfitEntry::new(*id, *desc))
                .collect(),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let CatalogFile(entries) =
            serde_json::from_str(s).map_err(|e| MatchError::Catalog(e.to_string()))?;
        Self::new(entries)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::info!(
            path = %path.as_ref().display(),
            entries = catalog.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    pub fn entries(&self) -> &[OutfitEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&OutfitEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
