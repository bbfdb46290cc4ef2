//! Page geometry and content handed to the interpreter.
//!
//! Walking the page tree (and inheriting attributes along it) is the
//! caller's job; [`PageInput::from_dict`] expects a page dictionary whose
//! inheritable entries are already merged in.

use bytes::Bytes;

use super::objects::{ObjectResolver, PDFDict, PDFObject, dict_get, resolve_object};
use crate::error::{PdfError, Result};
use crate::utils::{Matrix, Rect, mult_matrix, normalize_rect};

/// US Letter, used when a page has no usable MediaBox.
pub const DEFAULT_MEDIA_BOX: Rect = (0.0, 0.0, 612.0, 792.0);

/// One page ready for interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInput {
    /// Media box (physical page size)
    pub media_box: Rect,
    /// Crop box, None to use the media box
    pub crop_box: Option<Rect>,
    /// Page rotation in degrees, a multiple of 90
    pub rotate: i64,
    /// User unit (PDF 1.6) - scales default user space units
    pub user_unit: f64,
    pub resources: PDFDict,
    /// Decoded content streams, concatenated in order
    pub contents: Vec<Bytes>,
}

impl PageInput {
    pub fn new(media_box: Rect, contents: impl Into<Bytes>) -> Self {
        Self {
            media_box: normalize_rect(media_box),
            crop_box: None,
            rotate: 0,
            user_unit: 1.0,
            resources: PDFDict::new(),
            contents: vec![contents.into()],
        }
    }

    pub fn with_resources(mut self, resources: PDFDict) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_rotation(mut self, rotate: i64) -> Self {
        self.rotate = normalize_rotation(rotate);
        self
    }

    /// Read a page dictionary.
    ///
    /// `Contents` may be a stream or an array of streams; streams must be
    /// decoded by the resolver.
    pub fn from_dict(page: &PDFDict, resolver: &dyn ObjectResolver) -> Result<Self> {
        let media_box = match parse_box(page, "MediaBox", resolver)? {
            Some(b) => b,
            None => {
                tracing::warn!("page has no MediaBox, using US Letter");
                DEFAULT_MEDIA_BOX
            }
        };
        let crop_box = parse_box(page, "CropBox", resolver)?;
        let rotate = dict_get(resolver, page, "Rotate")?
            .map(|r| r.as_int())
            .transpose()?
            .map_or(0, normalize_rotation);
        let user_unit = dict_get(resolver, page, "UserUnit")?
            .map(|u| u.as_num())
            .transpose()?
            .filter(|u| *u > 0.0)
            .unwrap_or(1.0);
        let resources = match dict_get(resolver, page, "Resources")? {
            Some(PDFObject::Dict(d)) => d,
            Some(other) => {
                return Err(PdfError::TypeError {
                    expected: "dict",
                    got: other.type_name(),
                });
            }
            None => PDFDict::new(),
        };
        let contents = match dict_get(resolver, page, "Contents")? {
            None => Vec::new(),
            Some(PDFObject::Stream(s)) => vec![s.data_bytes()],
            Some(PDFObject::Array(items)) => items
                .iter()
                .map(|item| match resolve_object(resolver, item)? {
                    PDFObject::Stream(s) => Ok(s.data_bytes()),
                    other => Err(PdfError::TypeError {
                        expected: "stream",
                        got: other.type_name(),
                    }),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(PdfError::TypeError {
                    expected: "stream or array",
                    got: other.type_name(),
                });
            }
        };

        Ok(Self {
            media_box,
            crop_box,
            rotate,
            user_unit,
            resources,
            contents,
        })
    }

    /// Visible area: the crop box clipped to the media box.
    pub fn clip_box(&self) -> Rect {
        let m = self.media_box;
        match self.crop_box {
            Some(c) => {
                let r = (c.0.max(m.0), c.1.max(m.1), c.2.min(m.2), c.3.min(m.3));
                if r.0 <= r.2 && r.1 <= r.3 { r } else { m }
            }
            None => m,
        }
    }

    /// Initial CTM: moves the media box origin to (0, 0), applies the page
    /// rotation (clockwise) and scales by UserUnit.
    pub fn ctm(&self) -> Matrix {
        let (x0, y0, x1, y1) = self.media_box;
        let ctm = match self.rotate {
            90 => (0.0, -1.0, 1.0, 0.0, -y0, x1),
            180 => (-1.0, 0.0, 0.0, -1.0, x1, y1),
            270 => (0.0, 1.0, -1.0, 0.0, y1, -x0),
            _ => (1.0, 0.0, 0.0, 1.0, -x0, -y0),
        };
        if self.user_unit == 1.0 {
            ctm
        } else {
            let u = self.user_unit;
            mult_matrix(ctm, (u, 0.0, 0.0, u, 0.0, 0.0))
        }
    }
}

impl Default for PageInput {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_BOX, Bytes::new())
    }
}

fn normalize_rotation(rotate: i64) -> i64 {
    let r = rotate.rem_euclid(360);
    if r % 90 == 0 {
        r
    } else {
        tracing::warn!(rotate, "page rotation is not a multiple of 90, ignoring");
        0
    }
}

fn parse_box(page: &PDFDict, key: &str, resolver: &dyn ObjectResolver) -> Result<Option<Rect>> {
    let Some(obj) = dict_get(resolver, page, key)? else {
        return Ok(None);
    };
    let nums = match &obj {
        PDFObject::Array(items) => items
            .iter()
            .map(|i| resolve_object(resolver, i).and_then(|o| o.as_num()))
            .collect::<Result<Vec<_>>>()?,
        other => {
            return Err(PdfError::TypeError {
                expected: "array",
                got: other.type_name(),
            });
        }
    };
    match nums.as_slice() {
        &[a, b, c, d] => Ok(Some(normalize_rect((a, b, c, d)))),
        _ => {
            tracing::warn!(key, len = nums.len(), "page box does not have four numbers");
            Ok(None)
        }
    }
}
