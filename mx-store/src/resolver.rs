//! Contact name resolution.
//!
//! Maps raw handles (phone numbers, e-mail addresses) to display names
//! using an injected contact source. The index must be built explicitly
//! before lookups return anything useful; until then every handle
//! resolves to itself.

use std::collections::HashMap;

/// One contact record from the injected source.
#[derive(Debug, Clone)]
pub struct ContactRecord {
    pub display_name: String,
    /// Phone numbers and e-mail addresses, in any formatting.
    pub handles: Vec<String>,
}

/// Provider of contact records, injected so the resolver never touches
/// platform contact APIs directly.
pub trait ContactSource {
    /// Whether the user granted access to contacts.
    fn is_authorized(&self) -> bool;
    /// All available contact records.
    fn records(&self) -> Vec<ContactRecord>;
}

/// Resolver owning the in-memory name cache.
pub struct ContactResolver<S: ContactSource> {
    source: S,
    /// Normalized handle -> display name.
    index: HashMap<String, String>,
    /// Last-8-digit phone suffix -> display name. A documented
    /// heuristic: numbers sharing a suffix can produce a false match.
    suffix_index: HashMap<String, String>,
    indexed: bool,
}

impl<S: ContactSource> ContactResolver<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            index: HashMap::new(),
            suffix_index: HashMap::new(),
            indexed: false,
        }
    }

    /// Build the lookup index from the contact source. A no-op when
    /// the source is not authorized.
    pub fn build_index(&mut self) {
        if !self.source.is_authorized() {
            tracing::debug!("contact source not authorized, resolver stays empty");
            return;
        }

        for record in self.source.records() {
            for handle in &record.handles {
                let normalized = normalize_handle(handle);
                if normalized.is_empty() {
                    continue;
                }
                self.index
                    .entry(normalized.clone())
                    .or_insert_with(|| record.display_name.clone());

                let digits: String = normalized.chars().filter(char::is_ascii_digit).collect();
                if digits.len() >= 8 {
                    let suffix = digits[digits.len() - 8..].to_string();
                    self.suffix_index
                        .entry(suffix)
                        .or_insert_with(|| record.display_name.clone());
                }
            }
        }
        self.indexed = true;
        tracing::debug!(entries = self.index.len(), "contact index built");
    }

    /// Resolve a handle to a display name. Falls back to a last-8-digit
    /// suffix match for phone numbers, then to the handle unchanged.
    pub fn resolve(&self, handle: &str) -> String {
        if !self.indexed {
            return handle.to_string();
        }

        let normalized = normalize_handle(handle);
        if let Some(name) = self.index.get(&normalized) {
            return name.clone();
        }

        let digits: String = normalized.chars().filter(char::is_ascii_digit).collect();
        if digits.len() >= 8 {
            if let Some(name) = self.suffix_index.get(&digits[digits.len() - 8..]) {
                return name.clone();
            }
        }

        handle.to_string()
    }
}

/// Lowercase e-mail addresses; strip formatting from phone numbers.
fn normalize_handle(handle: &str) -> String {
    let trimmed = handle.trim();
    if trimmed.contains('@') {
        return trimmed.to_lowercase();
    }
    trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}
