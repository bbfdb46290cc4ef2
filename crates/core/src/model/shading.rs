//! Shading dictionaries (ISO 32000-1, 8.7.4.5).
//!
//! Only the dictionary is resolved here. Mesh data of types 4 to 7 stays
//! in the stream for whoever rasterizes it.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{PdfError, Result};
use crate::function::{FunctionOutput, PdfFunction};
use crate::model::color::RgbColor;
use crate::model::colorspace::ColorSpace;
use crate::model::objects::{ObjectResolver, PDFObject, dict_get};
use crate::utils::{MATRIX_IDENTITY, Matrix, Rect, normalize_rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingType {
    FunctionBased = 1,
    Axial = 2,
    Radial = 3,
    FreeFormGouraud = 4,
    LatticeFormGouraud = 5,
    CoonsPatch = 6,
    TensorProductPatch = 7,
}

impl ShadingType {
    pub fn from_int(v: i64) -> Option<Self> {
        Some(match v {
            1 => Self::FunctionBased,
            2 => Self::Axial,
            3 => Self::Radial,
            4 => Self::FreeFormGouraud,
            5 => Self::LatticeFormGouraud,
            6 => Self::CoonsPatch,
            7 => Self::TensorProductPatch,
            _ => return None,
        })
    }

    /// Mesh-based types carry their geometry in stream data.
    pub const fn is_mesh(self) -> bool {
        (self as u8) >= 4
    }
}

/// Shading color function: one n-output function or n one-output functions.
#[derive(Debug, Clone, PartialEq)]
pub enum ShadingFunction {
    Single(Arc<PdfFunction>),
    PerComponent(Vec<Arc<PdfFunction>>),
}

impl ShadingFunction {
    pub fn evaluate(&self, inputs: &[f64]) -> Result<FunctionOutput> {
        match self {
            Self::Single(f) => f.evaluate(inputs),
            Self::PerComponent(fs) => {
                let mut out = FunctionOutput::new();
                for f in fs {
                    out.push(f.evaluate(inputs)?.first().copied().unwrap_or(0.0));
                }
                Ok(out)
            }
        }
    }
}

/// A resolved shading dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct Shading {
    pub shading_type: ShadingType,
    pub color_space: Arc<ColorSpace>,
    pub function: Option<ShadingFunction>,
    pub coords: Vec<f64>,
    pub domain: Vec<f64>,
    pub extend: (bool, bool),
    pub matrix: Matrix,
    pub bbox: Option<Rect>,
    pub background: Option<Vec<f64>>,
    pub anti_alias: bool,
    /// Mesh stream data for types 4 to 7
    pub data: Option<Bytes>,
}

impl Shading {
    /// Resolve a shading from a dictionary or stream.
    ///
    /// `resolve_cs` turns the `ColorSpace` entry into a resolved space so the
    /// caller decides how names are looked up.
    pub fn from_object(
        obj: &PDFObject,
        resolver: &dyn ObjectResolver,
        resolve_cs: &mut dyn FnMut(&PDFObject) -> Result<Arc<ColorSpace>>,
    ) -> Result<Self> {
        let dict = obj
            .as_dict()
            .map_err(|_| PdfError::format("shading is not a dictionary"))?;

        let shading_type = dict_get(resolver, dict, "ShadingType")?
            .ok_or_else(|| PdfError::format("shading has no ShadingType"))?
            .as_int()?;
        let shading_type = ShadingType::from_int(shading_type)
            .ok_or_else(|| PdfError::format(format!("invalid ShadingType {shading_type}")))?;

        let cs_obj = dict
            .get("ColorSpace")
            .ok_or_else(|| PdfError::format("shading has no ColorSpace"))?;
        let color_space = resolve_cs(cs_obj)?;

        let function = match dict_get(resolver, dict, "Function")? {
            None => None,
            Some(PDFObject::Array(items)) => Some(ShadingFunction::PerComponent(
                items
                    .iter()
                    .map(|f| PdfFunction::from_object(f, resolver).map(Arc::new))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Some(f) => Some(ShadingFunction::Single(Arc::new(PdfFunction::from_object(
                &f, resolver,
            )?))),
        };
        if function.is_none()
            && matches!(
                shading_type,
                ShadingType::FunctionBased | ShadingType::Axial | ShadingType::Radial
            )
        {
            return Err(PdfError::format("shading type requires a Function"));
        }

        let num_array = |key: &str| -> Result<Option<Vec<f64>>> {
            dict_get(resolver, dict, key)?
                .map(|o| o.as_num_array())
                .transpose()
        };

        let coords = num_array("Coords")?.unwrap_or_default();
        let expected_coords = match shading_type {
            ShadingType::Axial => 4,
            ShadingType::Radial => 6,
            _ => 0,
        };
        if coords.len() < expected_coords {
            return Err(PdfError::format(format!(
                "shading Coords needs {expected_coords} numbers, got {}",
                coords.len()
            )));
        }

        let domain = num_array("Domain")?.unwrap_or_else(|| {
            if shading_type == ShadingType::FunctionBased {
                vec![0.0, 1.0, 0.0, 1.0]
            } else {
                vec![0.0, 1.0]
            }
        });

        let extend = match dict_get(resolver, dict, "Extend")? {
            Some(PDFObject::Array(e)) => (
                e.first().and_then(|b| b.as_bool().ok()).unwrap_or(false),
                e.get(1).and_then(|b| b.as_bool().ok()).unwrap_or(false),
            ),
            _ => (false, false),
        };

        let matrix = match num_array("Matrix")? {
            Some(m) if m.len() == 6 => (m[0], m[1], m[2], m[3], m[4], m[5]),
            _ => MATRIX_IDENTITY,
        };

        let bbox = match num_array("BBox")? {
            Some(b) if b.len() == 4 => Some(normalize_rect((b[0], b[1], b[2], b[3]))),
            _ => None,
        };

        let anti_alias = dict_get(resolver, dict, "AntiAlias")?
            .and_then(|b| b.as_bool().ok())
            .unwrap_or(false);

        let data = if shading_type.is_mesh() {
            Some(
                obj.as_stream()
                    .map_err(|_| PdfError::format("mesh shading must be a stream"))?
                    .data_bytes(),
            )
        } else {
            None
        };

        Ok(Self {
            shading_type,
            color_space,
            function,
            coords,
            domain,
            extend,
            matrix,
            bbox,
            background: num_array("Background")?,
            anti_alias,
            data,
        })
    }

    /// Colors at both ends of the Domain for axial and radial shadings.
    pub fn end_colors(&self) -> Option<Result<(RgbColor, RgbColor)>> {
        if !matches!(self.shading_type, ShadingType::Axial | ShadingType::Radial) {
            return None;
        }
        let (t0, t1) = match self.domain.as_slice() {
            [t0, t1, ..] => (*t0, *t1),
            _ => (0.0, 1.0),
        };
        Some(
            self.color_at(&[t0])
                .and_then(|c0| self.color_at(&[t1]).map(|c1| (c0, c1))),
        )
    }

    /// Color at parametric position `t` (axial/radial) through the function
    /// and color space.
    pub fn color_at(&self, inputs: &[f64]) -> Result<RgbColor> {
        match &self.function {
            Some(f) => {
                let components = f.evaluate(inputs)?;
                self.color_space.to_rgb(&components)
            }
            None => self.color_space.to_rgb(inputs),
        }
    }
}
