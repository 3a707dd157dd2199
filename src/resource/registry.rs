//! Property Registry
//!
//! Every source type declares a table of `(property name, extractor)` pairs.
//! Tables are built on first use and then shared for the life of the process.
//!
//! ```ignore
//! impl Source for Topic {
//!     fn properties() -> &'static PropertyTable<Self> {
//!         static TABLE: TableCell<Topic> = TableCell::new();
//!         TABLE.get_or_init(|| vec![prop("Name", short(|t: &Topic| t.name.as_deref()))])
//!     }
//! }
//! ```

use super::extract::Extractor;
use std::sync::OnceLock;

/// One property of a source type
pub struct PropertyDef<T> {
    pub name: &'static str,
    pub extractor: Extractor<T>,
}

pub type PropertyTable<T> = Vec<PropertyDef<T>>;

pub fn prop<T>(name: &'static str, extractor: Extractor<T>) -> PropertyDef<T> {
    PropertyDef { name, extractor }
}

/// Lazily built property table of one source type
pub struct TableCell<T>(OnceLock<PropertyTable<T>>);

impl<T> TableCell<T> {
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    pub fn get_or_init(
        &'static self,
        build: impl FnOnce() -> PropertyTable<T>,
    ) -> &'static PropertyTable<T> {
        self.0.get_or_init(build)
    }
}

impl<T> Default for TableCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::extract::value;

    struct Sample {
        name: Option<String>,
    }

    static SAMPLE_TABLE: TableCell<Sample> = TableCell::new();

    fn sample_table() -> &'static PropertyTable<Sample> {
        SAMPLE_TABLE.get_or_init(|| {
            vec![
                prop("Name", value(|p: &Sample| p.name.clone())),
                prop("Kind", value(|_: &Sample| Some("sample"))),
            ]
        })
    }

    #[test]
    fn test_table_is_built_once() {
        let first = sample_table() as *const _;
        let second = sample_table() as *const _;
        assert_eq!(first, second);
        let names: Vec<&str> = sample_table().iter().map(|def| def.name).collect();
        assert_eq!(names, vec!["Name", "Kind"]);
    }
}
