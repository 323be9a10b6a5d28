use std::collections::HashMap;

use crate::error::AliasError;

/// Shorthand tokens mapped to the term they abbreviate. The table repeats a
/// few keys; see [`AliasIndex::build`] for how repeats resolve.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("pla", "pla"),
    ("polylactic", "polylactic"),
    ("pha", "pha"),
    ("polymer", "polymer"),
    ("pla", "pla"),
    ("pha", "pha"),
    ("pe", "polyethylene"),
    ("polyhydroxyalkanoates", "polyhydroxyalkanoates"),
    ("pe", "polyethylene"),
    ("polyethylene", "polyethylene"),
    ("pp", "polypropylene"),
    ("polypropylene", "polypropylene"),
    ("pet", "polyethylene terephthalate"),
    ("pcl", "polycaprolactone"),
    ("pbs", "polybutylene succinate"),
    ("ps", "polystyrene"),
    ("pvc", "polyvinyl chloride"),
    ("chitosan", "chitosan"),
    ("gelatin", "gelatin"),
    ("alginate", "alginate"),
    ("evoh", "evoh"),
    ("nanoclay", "nanoclay"),
    ("tio2", "tio2"),
    ("zno", "zno"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasIndex {
    map: HashMap<String, usize>,
}

impl AliasIndex {
    /// Bind each alias to the first normalized corpus entry containing its
    /// expansion. Repeated keys are last-write-wins: the later expansion
    /// replaces the earlier one before the corpus is scanned, so a repeated
    /// key whose final expansion matches nothing is left out.
    pub fn build<S: AsRef<str>>(aliases: &[(&str, &str)], normalized_corpus: &[S]) -> Self {
        let mut table: Vec<(&str, &str)> = Vec::with_capacity(aliases.len());
        for &(token, expansion) in aliases {
            match table.iter_mut().find(|(t, _)| *t == token) {
                Some(slot) => slot.1 = expansion,
                None => table.push((token, expansion)),
            }
        }
        Self::scan(&table, normalized_corpus)
    }

    /// Like [`AliasIndex::build`] but refuses a table with repeated keys.
    pub fn build_strict<S: AsRef<str>>(
        aliases: &[(&str, &str)],
        normalized_corpus: &[S],
    ) -> Result<Self, AliasError> {
        for (i, (token, _)) in aliases.iter().enumerate() {
            if aliases[..i].iter().any(|(t, _)| t == token) {
                return Err(AliasError::DuplicateAlias(token.to_string()));
            }
        }
        Ok(Self::scan(aliases, normalized_corpus))
    }

    fn scan<S: AsRef<str>>(aliases: &[(&str, &str)], normalized_corpus: &[S]) -> Self {
        let mut map = HashMap::new();
        for &(token, expansion) in aliases {
            if let Some(idx) = normalized_corpus
                .iter()
                .position(|entry| entry.as_ref().contains(expansion))
            {
                map.insert(token.to_string(), idx);
            }
        }
        Self { map }
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.map.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
