//! Resource scopes and the shared resource cache.
//!
//! Every content stream with a `/Resources` dictionary pushes a
//! [`ResourceFrame`]; lookups search frames from the innermost outwards so
//! inner names shadow outer ones. [`PDFResourceManager`] caches objects
//! that are expensive to rebuild (fonts, color spaces, shadings) by their
//! indirect reference and is shared by every interpreter working on the
//! same document.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::error::{PdfError, Result};
use crate::model::colorspace::ColorSpace;
use crate::model::objects::{ObjectResolver, PDFDict, PDFObjRef, PDFObject, resolve_object};
use crate::model::shading::Shading;

/// Resource dictionary categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Font,
    XObject,
    ExtGState,
    ColorSpace,
    Properties,
    Shading,
    Pattern,
}

impl ResourceKind {
    pub const ALL: [Self; 7] = [
        Self::Font,
        Self::XObject,
        Self::ExtGState,
        Self::ColorSpace,
        Self::Properties,
        Self::Shading,
        Self::Pattern,
    ];

    /// Key of the category in a resource dictionary.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Font => "Font",
            Self::XObject => "XObject",
            Self::ExtGState => "ExtGState",
            Self::ColorSpace => "ColorSpace",
            Self::Properties => "Properties",
            Self::Shading => "Shading",
            Self::Pattern => "Pattern",
        }
    }
}

/// A named resource: an indirect reference resolved on first use, or an
/// inline value.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEntry {
    Reference(PDFObjRef),
    Direct(PDFObject),
}

impl ResourceEntry {
    fn from_object(obj: &PDFObject) -> Self {
        match obj {
            PDFObject::Ref(r) => Self::Reference(*r),
            other => Self::Direct(other.clone()),
        }
    }

    pub fn resolve(&self, resolver: &dyn ObjectResolver) -> Result<PDFObject> {
        match self {
            Self::Reference(r) => resolve_object(resolver, &PDFObject::Ref(*r)),
            Self::Direct(obj) => resolve_object(resolver, obj),
        }
    }

    pub const fn reference(&self) -> Option<PDFObjRef> {
        match self {
            Self::Reference(r) => Some(*r),
            Self::Direct(_) => None,
        }
    }
}

/// Unique identifier for a cached font.
pub type FontId = u64;

/// A font dictionary selected by `Tf`.
///
/// Font programs are not parsed here; the dictionary is handed to the
/// letter source unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct FontResource {
    pub id: FontId,
    pub objref: Option<PDFObjRef>,
    pub dict: PDFDict,
}

impl FontResource {
    /// `/BaseFont` name, if present.
    pub fn base_font(&self) -> Option<&str> {
        self.dict.get("BaseFont").and_then(|o| o.as_name().ok())
    }

    /// `/Subtype` name, if present.
    pub fn subtype(&self) -> Option<&str> {
        self.dict.get("Subtype").and_then(|o| o.as_name().ok())
    }
}

/// Names of one resource dictionary, per category.
#[derive(Debug, Clone, Default)]
pub struct ResourceFrame {
    tables: FxHashMap<ResourceKind, IndexMap<String, ResourceEntry>>,
    /// Color spaces already resolved through this frame, by name
    pub(crate) colorspaces: FxHashMap<String, Arc<ColorSpace>>,
}

impl ResourceFrame {
    /// Build a frame from a resource dictionary.
    ///
    /// Category dictionaries given by reference are dereferenced now so
    /// their names can be listed; the entries inside stay lazy.
    pub fn from_dict(resources: &PDFDict, resolver: &dyn ObjectResolver) -> Self {
        let mut frame = Self::default();
        for kind in ResourceKind::ALL {
            let Some(obj) = resources.get(kind.key()) else {
                continue;
            };
            let table = match resolve_object(resolver, obj) {
                Ok(PDFObject::Dict(d)) => d,
                Ok(other) => {
                    tracing::warn!(
                        category = kind.key(),
                        got = other.type_name(),
                        "resource category is not a dictionary"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(category = kind.key(), error = %e, "unresolvable resource category");
                    continue;
                }
            };
            let mut names: Vec<&String> = table.keys().collect();
            names.sort();
            let entries = names
                .into_iter()
                .map(|name| (name.clone(), ResourceEntry::from_object(&table[name])))
                .collect();
            frame.tables.insert(kind, entries);
        }
        frame
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&ResourceEntry> {
        self.tables.get(&kind)?.get(name)
    }
}

/// Stack of resource frames with innermost-first lookup.
#[derive(Debug)]
pub struct ResourceStack {
    frames: Vec<ResourceFrame>,
    manager: Arc<PDFResourceManager>,
    /// Last font resolved by name; valid until the next push or pop
    last_font: Option<(String, Arc<FontResource>)>,
}

impl ResourceStack {
    pub fn new(manager: Arc<PDFResourceManager>) -> Self {
        Self {
            frames: Vec::new(),
            manager,
            last_font: None,
        }
    }

    pub fn manager(&self) -> &Arc<PDFResourceManager> {
        &self.manager
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Enter a resource scope.
    pub fn push(&mut self, resources: &PDFDict, resolver: &dyn ObjectResolver) {
        self.push_frame(ResourceFrame::from_dict(resources, resolver));
    }

    pub fn push_frame(&mut self, frame: ResourceFrame) {
        self.frames.push(frame);
        self.last_font = None;
    }

    /// Leave the innermost resource scope.
    pub fn pop(&mut self) -> Option<ResourceFrame> {
        self.last_font = None;
        let frame = self.frames.pop();
        if frame.is_none() {
            tracing::debug!("resource stack pop without a frame");
        }
        frame
    }

    /// Run `f` inside a scope for `resources`, popping it on every exit.
    pub fn with_scope<T>(
        &mut self,
        resources: &PDFDict,
        resolver: &dyn ObjectResolver,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.push(resources, resolver);
        let depth = self.frames.len();
        let out = f(self);
        debug_assert_eq!(self.frames.len(), depth, "unbalanced resource scope");
        self.pop();
        out
    }

    /// Innermost entry for `name` in `kind`.
    pub fn lookup(&self, kind: ResourceKind, name: &str) -> Option<&ResourceEntry> {
        self.frames.iter().rev().find_map(|f| f.get(kind, name))
    }

    pub(crate) fn top_frame_mut(&mut self) -> Option<&mut ResourceFrame> {
        self.frames.last_mut()
    }

    pub(crate) fn top_frame(&self) -> Option<&ResourceFrame> {
        self.frames.last()
    }

    /// Look up and dereference a named resource.
    pub fn get_object(
        &self,
        kind: ResourceKind,
        name: &str,
        resolver: &dyn ObjectResolver,
    ) -> Result<Option<PDFObject>> {
        self.lookup(kind, name)
            .map(|entry| entry.resolve(resolver))
            .transpose()
    }

    /// Font dictionary selected by `Tf`.
    pub fn font(&mut self, name: &str, resolver: &dyn ObjectResolver) -> Result<Option<Arc<FontResource>>> {
        if let Some((cached, font)) = &self.last_font
            && cached == name
        {
            return Ok(Some(Arc::clone(font)));
        }
        let Some(entry) = self.lookup(ResourceKind::Font, name).cloned() else {
            return Ok(None);
        };
        let build = |objref: Option<PDFObjRef>, manager: &PDFResourceManager| -> Result<FontResource> {
            let obj = entry.resolve(resolver)?;
            let dict = obj
                .as_dict()
                .map_err(|_| PdfError::format(format!("font /{name} is not a dictionary")))?
                .clone();
            Ok(FontResource {
                id: manager.next_font_id(),
                objref,
                dict,
            })
        };
        let font = match entry.reference() {
            Some(r) => self.manager.font_or_insert(r, || build(Some(r), &self.manager))?,
            None => Arc::new(build(None, &self.manager)?),
        };
        self.last_font = Some((name.to_string(), Arc::clone(&font)));
        Ok(Some(font))
    }

    /// Font named by reference, as in an ExtGState `/Font` entry.
    pub fn font_by_reference(
        &self,
        objref: PDFObjRef,
        resolver: &dyn ObjectResolver,
    ) -> Result<Arc<FontResource>> {
        self.manager.font_or_insert(objref, || {
            let obj = resolver.resolve(&objref)?;
            let dict = obj
                .as_dict()
                .map_err(|_| PdfError::format("ExtGState font is not a dictionary"))?
                .clone();
            Ok(FontResource {
                id: self.manager.next_font_id(),
                objref: Some(objref),
                dict,
            })
        })
    }

    /// XObject stream and its reference, if it has one.
    pub fn xobject(
        &self,
        name: &str,
        resolver: &dyn ObjectResolver,
    ) -> Result<Option<(Option<PDFObjRef>, PDFObject)>> {
        let Some(entry) = self.lookup(ResourceKind::XObject, name) else {
            return Ok(None);
        };
        Ok(Some((entry.reference(), entry.resolve(resolver)?)))
    }

    /// Dictionary-valued resource (ExtGState, Properties).
    pub fn dict(
        &self,
        kind: ResourceKind,
        name: &str,
        resolver: &dyn ObjectResolver,
    ) -> Result<Option<PDFDict>> {
        match self.get_object(kind, name, resolver)? {
            None => Ok(None),
            Some(obj) => obj
                .as_dict()
                .cloned()
                .map(Some)
                .map_err(|_| PdfError::format(format!("{} /{name} is not a dictionary", kind.key()))),
        }
    }
}

/// Repository of shared resources.
///
/// Caches are keyed by indirect reference, so resolving the same object
/// from different pages or forms yields one shared value.
#[derive(Debug)]
pub struct PDFResourceManager {
    caching: bool,
    fonts: RwLock<FxHashMap<PDFObjRef, Arc<FontResource>>>,
    colorspaces: RwLock<FxHashMap<PDFObjRef, Arc<ColorSpace>>>,
    shadings: RwLock<FxHashMap<PDFObjRef, Arc<Shading>>>,
    next_font_id: AtomicU64,
}

impl PDFResourceManager {
    /// Create a new PDFResourceManager with caching enabled.
    pub fn new() -> Self {
        Self::with_caching(true)
    }

    pub fn with_caching(caching: bool) -> Self {
        Self {
            caching,
            fonts: RwLock::default(),
            colorspaces: RwLock::default(),
            shadings: RwLock::default(),
            next_font_id: AtomicU64::new(1),
        }
    }

    pub const fn caching_enabled(&self) -> bool {
        self.caching
    }

    fn next_font_id(&self) -> FontId {
        self.next_font_id.fetch_add(1, Ordering::Relaxed)
    }

    fn get_or_try_insert<T>(
        &self,
        map: &RwLock<FxHashMap<PDFObjRef, Arc<T>>>,
        key: PDFObjRef,
        build: impl FnOnce() -> Result<T>,
    ) -> Result<Arc<T>> {
        if self.caching
            && let Some(hit) = map
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
        {
            return Ok(Arc::clone(hit));
        }
        let value = Arc::new(build()?);
        if !self.caching {
            return Ok(value);
        }
        // A racing builder may have inserted first; keep whichever won.
        let mut guard = map.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(guard.entry(key).or_insert(value)))
    }

    pub fn font_or_insert(
        &self,
        key: PDFObjRef,
        build: impl FnOnce() -> Result<FontResource>,
    ) -> Result<Arc<FontResource>> {
        self.get_or_try_insert(&self.fonts, key, build)
    }

    pub fn colorspace_or_insert(
        &self,
        key: PDFObjRef,
        build: impl FnOnce() -> Result<ColorSpace>,
    ) -> Result<Arc<ColorSpace>> {
        self.get_or_try_insert(&self.colorspaces, key, build)
    }

    pub fn shading_or_insert(
        &self,
        key: PDFObjRef,
        build: impl FnOnce() -> Result<Shading>,
    ) -> Result<Arc<Shading>> {
        self.get_or_try_insert(&self.shadings, key, build)
    }

    /// Cached color space for `key`, without building.
    pub fn cached_colorspace(&self, key: &PDFObjRef) -> Option<Arc<ColorSpace>> {
        self.colorspaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of cached fonts, color spaces and shadings.
    pub fn cached_counts(&self) -> (usize, usize, usize) {
        (
            self.fonts.read().unwrap_or_else(PoisonError::into_inner).len(),
            self.colorspaces.read().unwrap_or_else(PoisonError::into_inner).len(),
            self.shadings.read().unwrap_or_else(PoisonError::into_inner).len(),
        )
    }
}

impl Default for PDFResourceManager {
    fn default() -> Self {
        Self::new()
    }
}
