//! Per-element attribute storage with typed access.
//!
//! Keys are matched case-insensitively. Values are kept as the raw strings the
//! markup carried and converted on read through [`FromAttribute`], so a value
//! that fails to parse simply yields the caller's default.

use serde::{Deserialize, Serialize};

/// HTML attributes whose mere presence means `true`
pub const BOOLEAN_ATTRIBUTES: &[&str] = &["checked", "disabled", "selected", "multiple"];

/// Whether `name` is one of [`BOOLEAN_ATTRIBUTES`]
#[must_use]
pub fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES
        .iter()
        .any(|flag| flag.eq_ignore_ascii_case(name))
}

/// Conversion from a raw attribute string into a typed value.
///
/// Returning `None` means "unparsable"; the store then falls back to the
/// default the caller supplied.
pub trait FromAttribute: Sized {
    /// Parse a raw attribute value
    fn from_attribute(raw: &str) -> Option<Self>;

    /// Parse a raw value knowing the attribute name it was stored under.
    ///
    /// Only needed by types whose parsing depends on the key; the default
    /// ignores the name.
    fn from_named_attribute(_name: &str, raw: &str) -> Option<Self> {
        Self::from_attribute(raw)
    }
}

impl FromAttribute for String {
    fn from_attribute(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromAttribute for bool {
    fn from_attribute(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    fn from_named_attribute(name: &str, raw: &str) -> Option<Self> {
        if is_boolean_attribute(name)
            && (raw.trim().is_empty() || raw.trim().eq_ignore_ascii_case(name))
        {
            return Some(true);
        }
        Self::from_attribute(raw)
    }
}

macro_rules! impl_from_attribute_via_parse {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromAttribute for $ty {
                fn from_attribute(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

impl_from_attribute_via_parse!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, char);

/// Nullable conversion: an empty value is "unset", not zero or false.
impl<T: FromAttribute> FromAttribute for Option<T> {
    fn from_attribute(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            Some(None)
        } else {
            T::from_attribute(raw).map(Some)
        }
    }

    fn from_named_attribute(name: &str, raw: &str) -> Option<Self> {
        if !raw.trim().is_empty() {
            return T::from_named_attribute(name, raw).map(Some);
        }
        // A bare flag is set, not unset.
        if is_boolean_attribute(name) {
            if let Some(value) = T::from_named_attribute(name, raw) {
                return Some(Some(value));
            }
        }
        Some(None)
    }
}

/// Case-insensitive attribute map preserving source order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeStore {
    entries: Vec<(String, String)>,
}

impl AttributeStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw markup pairs; the first occurrence of a duplicate key wins
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut store = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref().trim().to_ascii_lowercase();
            if key.is_empty() || store.contains(&key) {
                continue;
            }
            store.entries.push((key, value.into()));
        }
        store
    }

    /// Raw value for a key
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Typed value for a key, or `default` when absent or unparsable
    pub fn get<T: FromAttribute>(&self, key: &str, default: T) -> T {
        self.raw(key)
            .and_then(|raw| T::from_named_attribute(key, raw))
            .unwrap_or(default)
    }

    /// Typed value using the type's default as fallback
    pub fn get_or_default<T: FromAttribute + Default>(&self, key: &str) -> T {
        self.get(key, T::default())
    }

    /// Whether the key is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    /// Set a value, replacing an existing entry in place
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_ascii_lowercase(), value)),
        }
    }

    /// Remove a key, returning its previous value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.entries.remove(pos).1)
    }

    /// Non-empty `id` attribute
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.raw("id").filter(|v| !v.is_empty())
    }

    /// Non-empty `name` attribute
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.raw("name").filter(|v| !v.is_empty())
    }

    /// Iterate `(key, value)` pairs in source order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of attributes
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod store_tests {
        use super::*;

        #[test]
        fn test_keys_are_case_insensitive() {
            let store = AttributeStore::from_pairs([("ID", "main"), ("Class", "big")]);
            assert_eq!(store.raw("id"), Some("main"));
            assert_eq!(store.raw("CLASS"), Some("big"));
            assert_eq!(store.id(), Some("main"));
        }

        #[test]
        fn test_first_duplicate_wins() {
            let store = AttributeStore::from_pairs([("id", "first"), ("Id", "second")]);
            assert_eq!(store.len(), 1);
            assert_eq!(store.raw("id"), Some("first"));
        }

        #[test]
        fn test_set_replaces_in_place() {
            let mut store = AttributeStore::from_pairs([("value", "a"), ("type", "text")]);
            store.set("VALUE", "b");
            assert_eq!(store.raw("value"), Some("b"));
            assert_eq!(store.iter().next(), Some(("value", "b")));
            store.set("maxlength", "4");
            assert_eq!(store.len(), 3);
        }

        #[test]
        fn test_remove() {
            let mut store = AttributeStore::from_pairs([("title", "x")]);
            assert_eq!(store.remove("TITLE"), Some("x".to_string()));
            assert!(store.is_empty());
            assert_eq!(store.remove("title"), None);
        }

        #[test]
        fn test_empty_id_is_no_id() {
            let store = AttributeStore::from_pairs([("id", ""), ("name", "q")]);
            assert_eq!(store.id(), None);
            assert_eq!(store.name(), Some("q"));
        }
    }

    mod typed_tests {
        use super::*;

        #[test]
        fn test_nullable_int() {
            let store = AttributeStore::from_pairs([("maxlength", "5")]);
            assert_eq!(store.get::<Option<i32>>("maxlength", None), Some(5));

            let empty = AttributeStore::new();
            assert_eq!(empty.get::<Option<i32>>("maxlength", None), None);
        }

        #[test]
        fn test_nullable_empty_is_unset() {
            let store = AttributeStore::from_pairs([("maxlength", "")]);
            assert_eq!(store.get::<Option<i32>>("maxlength", Some(9)), None);
            assert_eq!(store.get::<i32>("maxlength", 9), 9);
        }

        #[test]
        fn test_unparsable_yields_default() {
            let store = AttributeStore::from_pairs([("size", "huge")]);
            assert_eq!(store.get("size", 3_u32), 3);
            assert_eq!(store.get::<Option<u32>>("size", None), None);
        }

        #[test]
        fn test_boolean_attribute_coercion() {
            let bare = AttributeStore::from_pairs([("checked", "")]);
            let named = AttributeStore::from_pairs([("checked", "checked")]);
            let upper = AttributeStore::from_pairs([("checked", "CHECKED")]);
            let explicit_false = AttributeStore::from_pairs([("checked", "false")]);
            let absent = AttributeStore::new();

            assert!(bare.get("checked", false));
            assert!(named.get("checked", false));
            assert!(upper.get("checked", false));
            assert!(!explicit_false.get("checked", true));
            assert!(!absent.get("checked", false));

            assert_eq!(bare.get::<Option<bool>>("checked", None), Some(true));
            assert_eq!(named.get::<Option<bool>>("checked", None), Some(true));
            assert_eq!(absent.get::<Option<bool>>("checked", Some(false)), Some(false));
            let disabled = AttributeStore::from_pairs([("disabled", " ")]);
            assert_eq!(disabled.get::<Option<bool>>("disabled", None), Some(true));
        }

        #[test]
        fn test_nullable_empty_non_flag_is_unset() {
            let store = AttributeStore::from_pairs([("data-open", ""), ("title", "")]);
            assert_eq!(store.get::<Option<bool>>("data-open", Some(false)), None);
            assert_eq!(store.get::<Option<String>>("title", Some("x".into())), None);
            let flag = AttributeStore::from_pairs([("checked", "")]);
            assert_eq!(flag.get::<Option<i32>>("checked", Some(1)), None);
        }

        #[test]
        fn test_non_flag_attribute_needs_strict_bool() {
            let store = AttributeStore::from_pairs([("data-open", ""), ("hidden", "hidden")]);
            assert!(!store.get("data-open", false));
            assert!(!store.get("hidden", false));
        }

        #[test]
        fn test_float_and_string() {
            let store = AttributeStore::from_pairs([("step", " 0.5 "), ("title", "Hi")]);
            assert!((store.get("step", 0.0_f64) - 0.5).abs() < f64::EPSILON);
            assert_eq!(store.get_or_default::<String>("title"), "Hi");
            assert_eq!(store.get_or_default::<String>("missing"), "");
        }
    }
}
