use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use classkit_jimage::Archive;

use crate::{
    constant_pool::{compact_class_name, internal_class_name},
    parser::Parser,
    ClassFileError, ClassSource, JavaClass, ParserContext, Result,
};

/// Resolves classes by name for the hierarchy queries on [`JavaClass`].
///
/// Names may be given dotted (`java.lang.Object`) or in internal form
/// (`java/lang/Object`). A class that cannot be found is reported as
/// [`ClassFileError::ClassNotFound`].
pub trait ClassRepository {
    fn load_class(&self, class_name: &str) -> Result<Arc<JavaClass>>;
}

/// Classes built or parsed by the caller.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    classes: HashMap<String, Arc<JavaClass>>,
}
impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `class` under its class name, replacing any class of the same name.
    pub fn add(&mut self, class: JavaClass) -> Arc<JavaClass> {
        let class = Arc::new(class);
        self.classes
            .insert(class.class_name().to_owned(), Arc::clone(&class));
        class
    }

    pub fn remove(&mut self, class_name: &str) -> Option<Arc<JavaClass>> {
        self.classes.remove(&compact_class_name(class_name))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
impl ClassRepository for MemoryRepository {
    fn load_class(&self, class_name: &str) -> Result<Arc<JavaClass>> {
        self.classes
            .get(&compact_class_name(class_name))
            .cloned()
            .ok_or_else(|| ClassFileError::ClassNotFound(compact_class_name(class_name)))
    }
}

/// Classes stored as `.class` files below a class path root.
#[derive(Debug)]
pub struct DirectoryRepository {
    root: PathBuf,
    context: ParserContext,
    cache: RwLock<HashMap<String, Arc<JavaClass>>>,
}
impl DirectoryRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_context(root, ParserContext::default())
    }

    pub fn with_context(root: impl Into<PathBuf>, context: ParserContext) -> Self {
        Self {
            root: root.into(),
            context,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn class_path(&self, class_name: &str) -> PathBuf {
        self.root
            .join(format!("{}.class", internal_class_name(class_name)))
    }
}
impl ClassRepository for DirectoryRepository {
    fn load_class(&self, class_name: &str) -> Result<Arc<JavaClass>> {
        let class_name = compact_class_name(class_name);
        if let Some(class) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&class_name)
        {
            return Ok(Arc::clone(class));
        }

        let path = self.class_path(&class_name);
        log::debug!("Loading {} from {}", class_name, path.display());
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ClassFileError::ClassNotFound(class_name))
            }
            Err(e) => return Err(e.into()),
        };

        let class = Arc::new(
            Parser::new(BufReader::new(file))
                .with_context(&self.context)
                .with_source(ClassSource::File)
                .with_file_name(path.display().to_string())
                .parse()?,
        );
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(class_name, Arc::clone(&class));
        Ok(class)
    }
}

/// Classes stored in a JDK runtime image.
pub struct ImageRepository<B> {
    archive: Archive<B>,
    modules: Vec<String>,
    context: ParserContext,
}
impl<B: AsRef<[u8]>> ImageRepository<B> {
    /// Searches `modules` in order, e.g. `["java.base"]`.
    pub fn new(archive: Archive<B>, modules: Vec<String>) -> Self {
        Self {
            archive,
            modules,
            context: ParserContext::default(),
        }
    }

    pub fn with_context(mut self, context: ParserContext) -> Self {
        self.context = context;
        self
    }

    pub fn archive(&self) -> &Archive<B> {
        &self.archive
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }
}
impl<B: AsRef<[u8]>> ClassRepository for ImageRepository<B> {
    fn load_class(&self, class_name: &str) -> Result<Arc<JavaClass>> {
        let internal_name = internal_class_name(class_name);
        let Some(resource) = self.archive.find_class(&self.modules, &internal_name) else {
            return Err(ClassFileError::ClassNotFound(compact_class_name(class_name)));
        };
        log::debug!("Loading {} from {}", class_name, resource.full_name());

        let class = Parser::new(resource.bytes()?)
            .with_context(&self.context)
            .with_source(ClassSource::Archive)
            .with_file_name(resource.full_name())
            .parse()?;
        Ok(Arc::new(class))
    }
}
