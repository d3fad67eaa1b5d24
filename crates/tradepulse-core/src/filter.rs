use std::collections::HashMap;

/// One row of the reference code list used to scope ingestion.
///
/// Filter input only; it never becomes a statistic by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceProductCode {
    pub code: String,
    pub name: String,
    pub description: String,
}

/// In-memory membership filter over the loaded reference codes.
///
/// A remote row passes when its HS code matches a loaded code exactly or
/// through any ancestor prefix of length >= 2. Membership checks never
/// error; an unloadable filter just matches nothing.
#[derive(Debug, Default)]
pub struct ProductCodeFilter {
    entries: HashMap<String, ReferenceProductCode>,
}

impl ProductCodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all prior state with the given reference list and returns
    /// the loaded count. Blank codes are ignored.
    pub fn load(&mut self, references: Vec<ReferenceProductCode>) -> usize {
        self.entries.clear();
        for reference in references {
            let code = reference.code.trim().to_owned();
            if code.is_empty() {
                continue;
            }
            self.entries.insert(
                code.clone(),
                ReferenceProductCode {
                    code,
                    ..reference
                },
            );
        }
        self.entries.len()
    }

    pub fn is_member(&self, code: &str) -> bool {
        self.lookup(code).is_some()
    }

    /// Finds the reference entry a code belongs to: exact match first, then
    /// prefixes from `len - 1` down to 2.
    pub fn lookup(&self, code: &str) -> Option<&ReferenceProductCode> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(entry) = self.entries.get(trimmed) {
            return Some(entry);
        }
        for len in (2..trimmed.len()).rev() {
            if !trimmed.is_char_boundary(len) {
                continue;
            }
            if let Some(entry) = self.entries.get(&trimmed[..len]) {
                return Some(entry);
            }
        }
        None
    }

    pub fn codes(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
