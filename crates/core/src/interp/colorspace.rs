//! Color space and shading resolution against the resource stack.
//!
//! Names resolve in this order: standard family names, the active frame's
//! per-name cache, then the `ColorSpace` tables from the innermost frame
//! outwards. Entries held by reference are cached in the shared
//! [`PDFResourceManager`](super::resources::PDFResourceManager).

use std::sync::Arc;

use bytes::Bytes;

use super::resources::{ResourceEntry, ResourceKind, ResourceStack};
use crate::error::{PdfError, Result};
use crate::function::PdfFunction;
use crate::model::colorspace::{CalRgbParams, CieParams, ColorSpace};
use crate::model::objects::{ObjectResolver, PDFDict, PDFObjRef, PDFObject, resolve_object};
use crate::model::shading::Shading;

/// Names and references on the current resolution path.
struct Resolution<'a> {
    stack: &'a ResourceStack,
    resolver: &'a dyn ObjectResolver,
    names: Vec<String>,
    refs: Vec<PDFObjRef>,
}

impl Resolution<'_> {
    fn name(&mut self, name: &str) -> Result<Arc<ColorSpace>> {
        if let Some(cs) = ColorSpace::from_family_name(name) {
            return Ok(Arc::new(cs));
        }
        if let Some(frame) = self.stack.top_frame()
            && let Some(cs) = frame.colorspaces.get(name)
        {
            return Ok(Arc::clone(cs));
        }
        if self.names.iter().any(|n| n == name) {
            return Err(PdfError::format(format!("color space /{name} refers to itself")));
        }
        let entry = self
            .stack
            .lookup(ResourceKind::ColorSpace, name)
            .cloned()
            .ok_or_else(|| PdfError::KeyError(format!("ColorSpace /{name}")))?;

        self.names.push(name.to_string());
        let out = match entry {
            ResourceEntry::Reference(r) => self.reference(r),
            ResourceEntry::Direct(obj) => self.object(&obj).map(Arc::new),
        };
        self.names.pop();
        out
    }

    fn reference(&mut self, r: PDFObjRef) -> Result<Arc<ColorSpace>> {
        if self.refs.contains(&r) {
            return Err(PdfError::format(format!(
                "color space object {} {} R refers to itself",
                r.objid, r.genno
            )));
        }
        let manager = Arc::clone(self.stack.manager());
        self.refs.push(r);
        let out = manager.colorspace_or_insert(r, || {
            let obj = self.resolver.resolve(&r)?;
            self.object(&obj)
        });
        self.refs.pop();
        out
    }

    /// Resolve an operand that may itself be a name or reference.
    fn nested(&mut self, obj: &PDFObject) -> Result<ColorSpace> {
        match obj {
            PDFObject::Name(n) => self.name(n).map(|cs| (*cs).clone()),
            PDFObject::Ref(r) => self.reference(*r).map(|cs| (*cs).clone()),
            other => self.object(other),
        }
    }

    fn object(&mut self, obj: &PDFObject) -> Result<ColorSpace> {
        let items = match obj {
            PDFObject::Name(n) => return self.name(n).map(|cs| (*cs).clone()),
            PDFObject::Ref(r) => return self.reference(*r).map(|cs| (*cs).clone()),
            PDFObject::Array(items) => items,
            other => {
                return Err(PdfError::TypeError {
                    expected: "color space name or array",
                    got: other.type_name(),
                });
            }
        };
        let Some(family) = items.first() else {
            return Err(PdfError::format("empty color space array"));
        };
        let family = resolve_object(self.resolver, family)?;
        let family = family.as_name()?;
        let arg = |i: usize| -> Result<PDFObject> {
            let obj = items
                .get(i)
                .ok_or_else(|| PdfError::format(format!("{family} color space is missing operand {i}")))?;
            resolve_object(self.resolver, obj)
        };

        match family {
            "CalGray" => {
                let params = arg(1)?;
                let dict = params.as_dict()?;
                Ok(ColorSpace::CalGray {
                    cie: self.cie(dict)?,
                    gamma: self.num(dict, "Gamma")?.unwrap_or(1.0),
                })
            }
            "CalRGB" => {
                let params = arg(1)?;
                let dict = params.as_dict()?;
                let mut out = CalRgbParams {
                    cie: self.cie(dict)?,
                    ..CalRgbParams::default()
                };
                if let Some(g) = self.nums::<3>(dict, "Gamma")? {
                    out.gamma = g;
                }
                if let Some(m) = self.nums::<9>(dict, "Matrix")? {
                    out.matrix = m;
                }
                Ok(ColorSpace::CalRGB(out))
            }
            "Lab" => {
                let params = arg(1)?;
                let dict = params.as_dict()?;
                Ok(ColorSpace::Lab {
                    cie: self.cie(dict)?,
                    range: self.nums::<4>(dict, "Range")?.unwrap_or([-100.0, 100.0, -100.0, 100.0]),
                })
            }
            "ICCBased" => {
                let profile = arg(1)?;
                let dict = profile.as_dict()?;
                let alternate = match dict.get("Alternate") {
                    Some(alt) => Some(self.nested(alt)?),
                    None => None,
                };
                let components = match self.num(dict, "N")? {
                    Some(n) if n == 1.0 || n == 3.0 || n == 4.0 => n as usize,
                    Some(n) => {
                        return Err(PdfError::format(format!("ICC profile with /N {n}")));
                    }
                    None => alternate
                        .as_ref()
                        .map(ColorSpace::ncomponents)
                        .ok_or_else(|| PdfError::format("ICC profile has no /N"))?,
                };
                let alternate = match alternate {
                    Some(alt) => alt,
                    None => ColorSpace::device_for_components(components)?,
                };
                let range = match self.nums_vec(dict, "Range")? {
                    Some(r) if r.len() >= 2 * components => r,
                    _ => [0.0, 1.0].repeat(components),
                };
                Ok(ColorSpace::ICCBased {
                    components,
                    alternate: Box::new(alternate),
                    range,
                })
            }
            "Indexed" | "I" => {
                let base = self.nested(items.get(1).ok_or_else(|| PdfError::format("Indexed color space has no base"))?)?;
                let hival = arg(2)?.as_int()?.clamp(0, 255) as u8;
                let lookup = match arg(3)? {
                    PDFObject::String(s) => Bytes::from(s),
                    PDFObject::Stream(s) => s.data_bytes(),
                    other => {
                        return Err(PdfError::TypeError {
                            expected: "string or stream",
                            got: other.type_name(),
                        });
                    }
                };
                let needed = (usize::from(hival) + 1) * base.ncomponents();
                if lookup.len() < needed {
                    tracing::debug!(have = lookup.len(), needed, "short Indexed lookup table");
                }
                Ok(ColorSpace::Indexed {
                    base: Box::new(base),
                    hival,
                    lookup,
                })
            }
            "Separation" => {
                let name = arg(1)?.as_name()?.to_string();
                let alternate = self.nested(items.get(2).ok_or_else(|| PdfError::format("Separation has no alternate space"))?)?;
                let tint_transform = self.tint_transform(&arg(3)?, 1)?;
                Ok(ColorSpace::Separation {
                    name,
                    alternate: Box::new(alternate),
                    tint_transform,
                })
            }
            "DeviceN" => {
                let names = arg(1)?
                    .as_array()?
                    .iter()
                    .map(|n| n.as_name().map(str::to_string))
                    .collect::<Result<Vec<_>>>()?;
                if names.is_empty() {
                    return Err(PdfError::format("DeviceN color space has no colorants"));
                }
                let alternate = self.nested(items.get(2).ok_or_else(|| PdfError::format("DeviceN has no alternate space"))?)?;
                let tint_transform = self.tint_transform(&arg(3)?, names.len())?;
                Ok(ColorSpace::DeviceN {
                    names,
                    alternate: Box::new(alternate),
                    tint_transform,
                })
            }
            "Pattern" => {
                let underlying = match items.get(1) {
                    Some(base) => Some(Box::new(self.nested(base)?)),
                    None => None,
                };
                Ok(ColorSpace::Pattern { underlying })
            }
            other => ColorSpace::from_family_name(other)
                .ok_or_else(|| PdfError::format(format!("unknown color space family /{other}"))),
        }
    }

    /// Tint transform taking one input per colorant.
    fn tint_transform(&self, obj: &PDFObject, colorants: usize) -> Result<Arc<PdfFunction>> {
        let function = PdfFunction::from_object(obj, self.resolver)?;
        match function.input_count() {
            Some(n) if n != colorants => Err(PdfError::format(format!(
                "tint transform takes {n} inputs for {colorants} colorants"
            ))),
            _ => Ok(Arc::new(function)),
        }
    }

    fn num(&self, dict: &PDFDict, key: &str) -> Result<Option<f64>> {
        dict.get(key)
            .map(|o| resolve_object(self.resolver, o).and_then(|o| o.as_num()))
            .transpose()
    }

    fn nums_vec(&self, dict: &PDFDict, key: &str) -> Result<Option<Vec<f64>>> {
        dict.get(key)
            .map(|o| resolve_object(self.resolver, o).and_then(|o| o.as_num_array()))
            .transpose()
    }

    fn nums<const N: usize>(&self, dict: &PDFDict, key: &str) -> Result<Option<[f64; N]>> {
        match self.nums_vec(dict, key)? {
            None => Ok(None),
            Some(v) => v.try_into().map(Some).map_err(|v: Vec<f64>| {
                PdfError::format(format!("/{key} has {} entries, expected {N}", v.len()))
            }),
        }
    }

    fn cie(&self, dict: &PDFDict) -> Result<CieParams> {
        let white_point = self
            .nums::<3>(dict, "WhitePoint")?
            .ok_or_else(|| PdfError::format("CIE color space has no WhitePoint"))?;
        let black_point = self.nums::<3>(dict, "BlackPoint")?.unwrap_or([0.0; 3]);
        Ok(CieParams {
            white_point,
            black_point,
        })
    }
}

impl ResourceStack {
    fn resolution<'a>(&'a self, resolver: &'a dyn ObjectResolver) -> Resolution<'a> {
        Resolution {
            stack: self,
            resolver,
            names: Vec::new(),
            refs: Vec::new(),
        }
    }

    /// Resolve a color space operand of `CS`/`cs`.
    ///
    /// Results for resource names are cached in the innermost frame.
    pub fn resolve_colorspace(
        &mut self,
        name: &str,
        resolver: &dyn ObjectResolver,
    ) -> Result<Arc<ColorSpace>> {
        let cs = self.resolution(resolver).name(name)?;
        if ColorSpace::from_family_name(name).is_none()
            && let Some(frame) = self.top_frame_mut()
        {
            frame.colorspaces.insert(name.to_string(), Arc::clone(&cs));
        }
        Ok(cs)
    }

    /// Resolve a color space given as a name, reference or array, such as
    /// an inline image's `/CS` or a shading's `/ColorSpace`.
    pub fn colorspace_from_object(
        &self,
        obj: &PDFObject,
        resolver: &dyn ObjectResolver,
    ) -> Result<Arc<ColorSpace>> {
        let mut res = self.resolution(resolver);
        match obj {
            PDFObject::Name(n) => res.name(n),
            PDFObject::Ref(r) => res.reference(*r),
            other => res.object(other).map(Arc::new),
        }
    }

    /// Resolve a named shading for `sh`.
    pub fn shading(&self, name: &str, resolver: &dyn ObjectResolver) -> Result<Option<Arc<Shading>>> {
        let Some(entry) = self.lookup(ResourceKind::Shading, name).cloned() else {
            return Ok(None);
        };
        let build = || -> Result<Shading> {
            let obj = entry.resolve(resolver)?;
            Shading::from_object(&obj, resolver, &mut |cs| self.colorspace_from_object(cs, resolver))
        };
        match entry.reference() {
            Some(r) => self.manager().shading_or_insert(r, build).map(Some),
            None => build().map(|s| Some(Arc::new(s))),
        }
    }
}
