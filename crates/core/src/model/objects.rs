//! PDF object types and the object-resolution boundary.
//!
//! Tokenizing the document and decoding streams belong to an external
//! scanner. This module only defines the values that scanner hands over and
//! the [`ObjectResolver`] trait used to dereference indirect references.

use crate::error::{PdfError, Result};
use bytes::Bytes;
use rustc_hash::FxHashMap;
use std::collections::HashMap;

/// Maximum number of reference hops followed by [`resolve_object`].
const MAX_REFERENCE_DEPTH: usize = 32;

/// PDF dictionary (name -> object mapping).
pub type PDFDict = HashMap<String, PDFObject>;

/// PDF Object types - the fundamental value type in PDF.
#[derive(Debug, Clone, PartialEq)]
pub enum PDFObject {
    /// Null object
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real (floating point) value
    Real(f64),
    /// Name object (e.g., /Type, /Font)
    Name(String),
    /// String (byte array)
    String(Vec<u8>),
    /// Array of objects
    Array(Vec<Self>),
    /// Dictionary (name -> object mapping)
    Dict(PDFDict),
    /// Stream (dictionary + decoded data)
    Stream(Box<PDFStream>),
    /// Indirect object reference
    Ref(PDFObjRef),
}

impl PDFObject {
    /// Check if this is a null object
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get as boolean
    pub const fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(PdfError::TypeError {
                expected: "bool",
                got: self.type_name(),
            }),
        }
    }

    /// Get as integer (reals are truncated)
    pub const fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Real(n) => Ok(*n as i64),
            _ => Err(PdfError::TypeError {
                expected: "int",
                got: self.type_name(),
            }),
        }
    }

    /// Get numeric value (int or real coerced to f64)
    pub const fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "number",
                got: self.type_name(),
            }),
        }
    }

    /// Get as name string
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "name",
                got: self.type_name(),
            }),
        }
    }

    /// Get as byte string
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "string",
                got: self.type_name(),
            }),
        }
    }

    /// Get as array
    pub const fn as_array(&self) -> Result<&Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(PdfError::TypeError {
                expected: "array",
                got: self.type_name(),
            }),
        }
    }

    /// Get as dictionary. Streams expose their attribute dictionary.
    pub fn as_dict(&self) -> Result<&PDFDict> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(&s.attrs),
            _ => Err(PdfError::TypeError {
                expected: "dict",
                got: self.type_name(),
            }),
        }
    }

    /// Get as stream
    pub fn as_stream(&self) -> Result<&PDFStream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "stream",
                got: self.type_name(),
            }),
        }
    }

    /// Get as object reference
    pub const fn as_ref(&self) -> Result<&PDFObjRef> {
        match self {
            Self::Ref(r) => Ok(r),
            _ => Err(PdfError::TypeError {
                expected: "ref",
                got: self.type_name(),
            }),
        }
    }

    /// Get a numeric array (every element must be a number).
    pub fn as_num_array(&self) -> Result<Vec<f64>> {
        self.as_array()?.iter().map(Self::as_num).collect()
    }

    /// Get type name for error messages
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
        }
    }
}

/// PDF indirect object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PDFObjRef {
    /// Object ID
    pub objid: u32,
    /// Generation number
    pub genno: u32,
}

impl PDFObjRef {
    /// Create a new object reference.
    pub const fn new(objid: u32, genno: u32) -> Self {
        Self { objid, genno }
    }
}

/// PDF Stream - dictionary attributes + already decoded data.
#[derive(Debug, Clone, PartialEq)]
pub struct PDFStream {
    /// Stream dictionary attributes
    pub attrs: PDFDict,
    /// Decoded data
    data: Bytes,
    /// Object ID (set when stream is part of document)
    pub objid: Option<u32>,
}

impl PDFStream {
    /// Create a new stream.
    pub fn new(attrs: PDFDict, data: impl Into<Bytes>) -> Self {
        Self {
            attrs,
            data: data.into(),
            objid: None,
        }
    }

    /// Set object ID.
    pub const fn set_objid(&mut self, objid: u32) {
        self.objid = Some(objid);
    }

    /// Get decoded data.
    pub fn get_data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Get data as shared bytes.
    pub fn data_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Check if stream contains a key.
    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Get attribute by name.
    pub fn get(&self, name: &str) -> Option<&PDFObject> {
        self.attrs.get(name)
    }
}

/// Dereferences indirect objects on behalf of the interpreter.
///
/// Implemented by the document scanner. Streams returned from `resolve`
/// must already be decoded.
pub trait ObjectResolver {
    /// Resolve a single indirect reference.
    fn resolve(&self, objref: &PDFObjRef) -> Result<PDFObject>;
}

/// Follow reference chains until a direct object is reached.
pub fn resolve_object(resolver: &dyn ObjectResolver, obj: &PDFObject) -> Result<PDFObject> {
    let mut current = obj.clone();
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            PDFObject::Ref(r) => current = resolver.resolve(&r)?,
            other => return Ok(other),
        }
    }
    Err(PdfError::format("reference chain too deep"))
}

/// Look up a key in a dictionary and dereference the value.
pub fn dict_get(
    resolver: &dyn ObjectResolver,
    dict: &PDFDict,
    key: &str,
) -> Result<Option<PDFObject>> {
    dict.get(key)
        .map(|obj| resolve_object(resolver, obj))
        .transpose()
}

/// Resolver backed by an in-memory object table.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    objects: FxHashMap<PDFObjRef, PDFObject>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object under `objid` (generation 0) and return its reference.
    pub fn insert(&mut self, objid: u32, obj: PDFObject) -> PDFObjRef {
        let objref = PDFObjRef::new(objid, 0);
        self.objects.insert(objref, obj);
        objref
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectResolver for MemoryResolver {
    fn resolve(&self, objref: &PDFObjRef) -> Result<PDFObject> {
        self.objects
            .get(objref)
            .cloned()
            .ok_or(PdfError::ObjectNotFound(objref.objid))
    }
}

/// Resolver for content without any indirect objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl ObjectResolver for NoResolver {
    fn resolve(&self, objref: &PDFObjRef) -> Result<PDFObject> {
        Err(PdfError::ObjectNotFound(objref.objid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_chain() {
        let mut resolver = MemoryResolver::new();
        let inner = resolver.insert(2, PDFObject::Int(42));
        let outer = resolver.insert(1, PDFObject::Ref(inner));
        let value = resolve_object(&resolver, &PDFObject::Ref(outer)).unwrap();
        assert_eq!(value, PDFObject::Int(42));
    }

    #[test]
    fn test_resolve_cycle_is_bounded() {
        let mut resolver = MemoryResolver::new();
        resolver.insert(1, PDFObject::Ref(PDFObjRef::new(1, 0)));
        let err = resolve_object(&resolver, &PDFObject::Ref(PDFObjRef::new(1, 0))).unwrap_err();
        assert!(matches!(err, PdfError::DocumentFormat(_)));
    }

    #[test]
    fn test_stream_dict_access() {
        let mut attrs = PDFDict::new();
        attrs.insert("Length".into(), PDFObject::Int(3));
        let obj = PDFObject::Stream(Box::new(PDFStream::new(attrs, b"abc".to_vec())));
        assert_eq!(obj.as_dict().unwrap().get("Length"), Some(&PDFObject::Int(3)));
        assert_eq!(obj.as_stream().unwrap().get_data(), b"abc");
    }
}
