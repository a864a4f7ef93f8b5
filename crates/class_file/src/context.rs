use std::{collections::HashMap, fmt, sync::Arc};

use crate::attributes::AttributeReader;

/// Caller-owned parser configuration.
///
/// Holds the readers for attribute kinds this crate does not decode itself.
/// Each parse borrows a context, so parses with different reader sets never
/// interfere with each other.
#[derive(Clone, Default)]
pub struct ParserContext {
    readers: HashMap<String, Arc<dyn AttributeReader>>,
}
impl ParserContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `reader` for attributes called `name`. The last registration
    /// for a name wins; the replaced reader is returned.
    pub fn register_reader(
        &mut self,
        name: impl Into<String>,
        reader: impl AttributeReader + 'static,
    ) -> Option<Arc<dyn AttributeReader>> {
        let name = name.into();
        let previous = self.readers.insert(name.clone(), Arc::new(reader));
        if previous.is_some() {
            log::debug!("Replaced attribute reader for {}", name);
        }
        previous
    }

    pub fn unregister_reader(&mut self, name: &str) -> Option<Arc<dyn AttributeReader>> {
        self.readers.remove(name)
    }

    pub fn reader(&self, name: &str) -> Option<&dyn AttributeReader> {
        self.readers.get(name).map(|reader| reader.as_ref())
    }
}
impl fmt::Debug for ParserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.readers.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("ParserContext")
            .field("readers", &names)
            .finish()
    }
}
