//! XObject, inline image, shading and marked content operators.
//!
//! Handles: Do, BI/ID/EI, sh, BMC, BDC, EMC, MP, DP
//!
//! - Do: Run a form XObject or place an image XObject
//! - BI/ID/EI: Inline image (arrives as one token from the lexer)
//! - sh: Paint a shading over the current clip
//! - BMC/BDC/EMC: Marked content sequences
//! - MP/DP: Marked content points

use std::mem;

use bytes::Bytes;

use crate::error::{PdfError, Result};
use crate::interp::device::LetterSource;
use crate::interp::interpreter::{PDFPageInterpreter, rect_path};
use crate::interp::ops::path::empty_clip;
use crate::interp::resources::ResourceKind;
use crate::model::content::{ImageRecord, MarkedContent, ShadingFill};
use crate::model::objects::{ObjectResolver, PDFDict, PDFObjRef, PDFObject, PDFStream, dict_get};
use crate::model::path::{FillingRule, Path};
use crate::parser::PSToken;
use crate::utils::{MATRIX_IDENTITY, Matrix, Rect, apply_matrix_rect, mult_matrix, normalize_rect};

/// Full key names for inline image abbreviations.
const INLINE_KEYS: &[(&str, &str)] = &[
    ("BPC", "BitsPerComponent"),
    ("CS", "ColorSpace"),
    ("D", "Decode"),
    ("DP", "DecodeParms"),
    ("F", "Filter"),
    ("H", "Height"),
    ("IM", "ImageMask"),
    ("I", "Interpolate"),
    ("L", "Length"),
    ("W", "Width"),
];

/// Full names for abbreviated inline image values.
const INLINE_NAMES: &[(&str, &str)] = &[
    ("G", "DeviceGray"),
    ("RGB", "DeviceRGB"),
    ("CMYK", "DeviceCMYK"),
    ("I", "Indexed"),
    ("AHx", "ASCIIHexDecode"),
    ("A85", "ASCII85Decode"),
    ("LZW", "LZWDecode"),
    ("Fl", "FlateDecode"),
    ("RL", "RunLengthDecode"),
    ("CCF", "CCITTFaxDecode"),
    ("DCT", "DCTDecode"),
];

fn expand_key(key: String) -> String {
    INLINE_KEYS
        .iter()
        .find(|(short, _)| *short == key)
        .map_or(key, |(_, long)| (*long).to_string())
}

fn expand_value(value: PDFObject) -> PDFObject {
    match value {
        PDFObject::Name(n) => PDFObject::Name(
            INLINE_NAMES
                .iter()
                .find(|(short, _)| *short == n)
                .map_or(n, |(_, long)| (*long).to_string()),
        ),
        PDFObject::Array(items) => PDFObject::Array(items.into_iter().map(expand_value).collect()),
        other => other,
    }
}

/// Inline image dictionary with abbreviations spelled out.
pub(crate) fn expand_inline_dict(dict: PDFDict) -> PDFDict {
    dict.into_iter()
        .map(|(k, v)| (expand_key(k), expand_value(v)))
        .collect()
}

fn read_matrix(resolver: &dyn ObjectResolver, dict: &PDFDict) -> Result<Matrix> {
    let Some(obj) = dict_get(resolver, dict, "Matrix")? else {
        return Ok(MATRIX_IDENTITY);
    };
    match obj.as_num_array()?.as_slice() {
        &[a, b, c, d, e, f] => Ok((a, b, c, d, e, f)),
        other => Err(PdfError::format(format!("form Matrix has {} entries", other.len()))),
    }
}

fn read_bbox(resolver: &dyn ObjectResolver, dict: &PDFDict) -> Result<Option<Rect>> {
    let Some(obj) = dict_get(resolver, dict, "BBox")? else {
        return Ok(None);
    };
    match obj.as_num_array()?.as_slice() {
        &[x0, y0, x1, y1] => Ok(Some(normalize_rect((x0, y0, x1, y1)))),
        _ => Err(PdfError::format("BBox is not four numbers")),
    }
}

#[allow(non_snake_case)]
impl<L: LetterSource> PDFPageInterpreter<'_, L> {
    // ========================================================================
    // XObject Operators
    // ========================================================================

    /// Paints the named XObject.
    ///
    /// Forms run in a nested scope; images are recorded with the unit
    /// square mapped through the CTM. PostScript XObjects are skipped.
    ///
    /// PDF operator: `Do`
    pub fn do_Do(&mut self, name: &str) -> Result<()> {
        let resolver = self.resolver;
        let (objref, obj) = self
            .resources
            .xobject(name, resolver)?
            .ok_or_else(|| PdfError::KeyError(format!("XObject /{name}")))?;
        let stream = obj
            .as_stream()
            .map_err(|_| PdfError::format(format!("XObject /{name} is not a stream")))?;
        let subtype = dict_get(resolver, &stream.attrs, "Subtype")?;
        match subtype.as_ref().map(PDFObject::as_name).transpose()? {
            Some("Form") => self.run_form(name, objref, stream),
            Some("Image") => {
                let record =
                    self.image_record(Some(name), stream.attrs.clone(), stream.data_bytes(), false)?;
                self.emit_image(record);
                Ok(())
            }
            Some("PS") => {
                tracing::debug!(name, "skipping PostScript XObject");
                Ok(())
            }
            Some(other) => Err(PdfError::UnsupportedFeature(format!("XObject subtype /{other}"))),
            None => Err(PdfError::format(format!("XObject /{name} has no Subtype"))),
        }
    }

    /// Execute a form XObject.
    ///
    /// The form sees a fresh q/Q stack; the graphics state, current path
    /// and marked-content depth are restored afterwards, also on error.
    fn run_form(&mut self, name: &str, objref: Option<PDFObjRef>, form: &PDFStream) -> Result<()> {
        if objref.is_some() && self.form_stack.contains(&objref) {
            return Err(PdfError::format(format!("form XObject /{name} invokes itself")));
        }
        if self.form_stack.len() >= self.options.max_form_depth {
            return Err(PdfError::format(format!(
                "form XObjects nested deeper than {}",
                self.options.max_form_depth
            )));
        }
        let resolver = self.resolver;
        let matrix = read_matrix(resolver, &form.attrs)?;
        let bbox = read_bbox(resolver, &form.attrs)?;
        let resources = match dict_get(resolver, &form.attrs, "Resources")? {
            Some(PDFObject::Dict(d)) => Some(d),
            Some(other) => {
                return Err(PdfError::TypeError {
                    expected: "dict",
                    got: other.type_name(),
                });
            }
            None => None,
        };
        tracing::trace!(name, depth = self.form_stack.len(), "running form XObject");

        let saved = self.get_current_state();
        let outer_gstack = mem::take(&mut self.gstack);
        let outer_path = mem::take(&mut self.curpath);
        let outer_clip_rule = self.pending_clip.take();
        let outer_floor = mem::replace(&mut self.marked_floor, self.marked.len());
        self.form_stack.push(objref);

        self.ctm = mult_matrix(matrix, self.ctm);
        let result = self.execute_form(bbox, resources.as_ref(), form.data_bytes());

        self.form_stack.pop();
        while self.marked.len() > self.marked_floor {
            self.close_marked_content();
        }
        self.marked_floor = outer_floor;
        self.pending_clip = outer_clip_rule;
        self.curpath = outer_path;
        self.gstack = outer_gstack;
        self.set_current_state(saved);
        result
    }

    fn execute_form(&mut self, bbox: Option<Rect>, resources: Option<&PDFDict>, data: Bytes) -> Result<()> {
        if let Some(bbox) = bbox {
            let mut clip = rect_path(self.ctm, bbox)?;
            clip.mark_as_clip(FillingRule::NonZeroWinding);
            self.intersect_clip(&clip)?;
        }
        self.with_resources(resources, |interp| interp.execute(&[data]))
    }

    /// Build an image record from a (full-key) image dictionary.
    fn image_record(
        &self,
        name: Option<&str>,
        attrs: PDFDict,
        data: Bytes,
        is_inline: bool,
    ) -> Result<ImageRecord> {
        let resolver = self.resolver;
        let int = |key: &str| -> Result<Option<i64>> {
            dict_get(resolver, &attrs, key)?.map(|o| o.as_int()).transpose()
        };
        let width = int("Width")?.ok_or_else(|| PdfError::format("image has no Width"))?;
        let height = int("Height")?.ok_or_else(|| PdfError::format("image has no Height"))?;
        let bits_per_component = int("BitsPerComponent")?;
        let is_image_mask = dict_get(resolver, &attrs, "ImageMask")?
            .map(|o| o.as_bool())
            .transpose()?
            .unwrap_or(false);

        let color_space = match attrs.get("ColorSpace") {
            Some(cs) if !is_image_mask => {
                match self.resources.colorspace_from_object(cs, resolver) {
                    Ok(space) => Some(space),
                    Err(err) => {
                        tracing::warn!(image = name, error = %err, "unresolved image color space");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(ImageRecord {
            name: name.map(str::to_string),
            bounds: apply_matrix_rect(self.ctm, (0.0, 0.0, 1.0, 1.0)),
            ctm: self.ctm,
            width,
            height,
            bits_per_component,
            color_space,
            is_image_mask,
            is_inline,
            attrs,
            data,
        })
    }

    /// Records an inline image.
    ///
    /// PDF operators: `BI`, `ID`, `EI`
    pub fn do_inline_image(&mut self, dict: PDFDict, data: Bytes) -> Result<()> {
        let record = self.image_record(None, expand_inline_dict(dict), data, true)?;
        self.emit_image(record);
        Ok(())
    }

    // ========================================================================
    // Shading Operator
    // ========================================================================

    /// Paints the named shading over the current clip, limited to the
    /// shading's BBox when it has one.
    ///
    /// PDF operator: `sh`
    pub fn do_sh(&mut self, name: &str) -> Result<()> {
        let shading = self
            .resources
            .shading(name, self.resolver)?
            .ok_or_else(|| PdfError::KeyError(format!("Shading /{name}")))?;

        let bbox_region = match shading.bbox {
            Some(bbox) => {
                let mut path = rect_path(self.ctm, bbox)?;
                path.mark_as_clip(FillingRule::NonZeroWinding);
                Some(path)
            }
            None => None,
        };
        let region: Option<Path> = match (&self.graphicstate.clip, bbox_region) {
            (Some(clip), Some(bbox)) => Some(crate::clip::clip(clip, &bbox)?.unwrap_or_else(empty_clip)),
            (Some(clip), None) => Some(clip.clone()),
            (None, bbox) => bbox,
        };
        if region.as_ref().is_some_and(Path::is_empty) {
            tracing::trace!(name, "shading lies outside the clip");
            return Ok(());
        }

        let end_colors = match shading.end_colors() {
            Some(Ok(colors)) => Some(colors),
            Some(Err(err)) => {
                tracing::debug!(name, error = %err, "shading colors could not be evaluated");
                None
            }
            None => None,
        };
        self.output.shading_fills.push(ShadingFill {
            name: name.to_string(),
            shading,
            ctm: self.ctm,
            region,
            end_colors,
        });
        Ok(())
    }

    // ========================================================================
    // Marked Content Operators
    // ========================================================================

    /// Property list given inline or as a `/Properties` resource name.
    fn marked_properties(&self, props: Option<PSToken>) -> Result<Option<PDFDict>> {
        match props {
            None => Ok(None),
            Some(PSToken::Literal(name)) => self
                .resources
                .dict(ResourceKind::Properties, &name, self.resolver)?
                .map(Some)
                .ok_or_else(|| PdfError::KeyError(format!("Properties /{name}"))),
            Some(token @ PSToken::Dict(_)) => match token.to_object() {
                Some(PDFObject::Dict(d)) => Ok(Some(d)),
                _ => Err(PdfError::SyntaxError("unreadable property list".into())),
            },
            Some(_) => Err(PdfError::SyntaxError("property list must be a dict or a name".into())),
        }
    }

    fn marked_element(&self, tag: &str, props: Option<PSToken>, is_point: bool) -> Result<MarkedContent> {
        let properties = self.marked_properties(props)?;
        let mcid = properties
            .as_ref()
            .and_then(|p| p.get("MCID"))
            .and_then(|m| m.as_int().ok());
        Ok(MarkedContent {
            tag: tag.to_string(),
            mcid,
            properties,
            is_point,
            ..MarkedContent::default()
        })
    }

    /// PDF operator: `BMC`
    pub fn do_BMC(&mut self, tag: &str) {
        self.marked.push(MarkedContent {
            tag: tag.to_string(),
            ..MarkedContent::default()
        });
    }

    /// Begins a marked-content sequence with a property list.
    ///
    /// PDF operator: `BDC`
    pub fn do_BDC(&mut self, tag: &str, props: Option<PSToken>) -> Result<()> {
        let element = self.marked_element(tag, props, false)?;
        self.marked.push(element);
        Ok(())
    }

    /// PDF operator: `EMC`
    pub fn do_EMC(&mut self) -> Result<()> {
        if self.marked.len() <= self.marked_floor {
            return Err(PdfError::InvalidArgument("EMC without matching BMC/BDC".into()));
        }
        self.close_marked_content();
        Ok(())
    }

    /// PDF operator: `MP`
    pub fn do_MP(&mut self, tag: &str) {
        self.marked.push(MarkedContent {
            tag: tag.to_string(),
            is_point: true,
            ..MarkedContent::default()
        });
        self.close_marked_content();
    }

    /// PDF operator: `DP`
    pub fn do_DP(&mut self, tag: &str, props: Option<PSToken>) -> Result<()> {
        let element = self.marked_element(tag, props, true)?;
        self.marked.push(element);
        self.close_marked_content();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::params::InterpreterOptions;
    use crate::model::objects::{MemoryResolver, NoResolver};

    fn name(s: &str) -> PDFObject {
        PDFObject::Name(s.into())
    }

    fn nums(values: &[f64]) -> PDFObject {
        PDFObject::Array(values.iter().map(|&v| PDFObject::Real(v)).collect())
    }

    fn xobjects(entries: Vec<(&str, PDFObject)>) -> PDFDict {
        let table: PDFDict = entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let mut res = PDFDict::new();
        res.insert("XObject".into(), PDFObject::Dict(table));
        res
    }

    fn form(data: &[u8], extra: Vec<(&str, PDFObject)>) -> PDFObject {
        let mut attrs = PDFDict::new();
        attrs.insert("Subtype".into(), name("Form"));
        for (k, v) in extra {
            attrs.insert(k.into(), v);
        }
        PDFObject::Stream(Box::new(PDFStream::new(attrs, data.to_vec())))
    }

    #[test]
    fn test_form_applies_matrix_and_restores_state() {
        let fx = form(
            b"5 w 0 0 m 1 1 l S",
            vec![("Matrix", nums(&[2.0, 0.0, 0.0, 2.0, 10.0, 10.0]))],
        );
        let res = xobjects(vec![("Fx", fx)]);
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp
            .with_resources(Some(&res), |i| i.execute(&[b"/Fx Do".as_slice()]))
            .unwrap();
        assert_eq!(interp.graphicstate().linewidth, 1.0);
        assert_eq!(interp.ctm(), MATRIX_IDENTITY);
        let out = interp.finish();
        assert_eq!(out.paths[0].bounding_rectangle(), Some((10.0, 10.0, 12.0, 12.0)));
        assert_eq!(out.paths[0].line_width, 10.0);
    }

    #[test]
    fn test_form_bbox_clips() {
        let fx = form(b"", vec![("BBox", nums(&[0.0, 0.0, 5.0, 5.0]))]);
        let res = xobjects(vec![("Fx", fx)]);
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp
            .with_resources(Some(&res), |i| i.execute(&[b"/Fx Do".as_slice()]))
            .unwrap();
        // clip set inside the form does not leak out
        assert!(interp.graphicstate().clip.is_none());
    }

    #[test]
    fn test_self_invoking_form_is_rejected() {
        let mut resolver = MemoryResolver::new();
        let mut inner = PDFDict::new();
        inner.insert("Fx".into(), PDFObject::Ref(PDFObjRef::new(1, 0)));
        let mut form_res = PDFDict::new();
        form_res.insert("XObject".into(), PDFObject::Dict(inner));
        let fx = form(b"/Fx Do", vec![("Resources", PDFObject::Dict(form_res))]);
        let objref = resolver.insert(1, fx);

        let res = xobjects(vec![("Fx", PDFObject::Ref(objref))]);
        let mut interp = PDFPageInterpreter::new(&resolver, InterpreterOptions::strict());
        let err = interp
            .with_resources(Some(&res), |i| i.execute(&[b"/Fx Do".as_slice()]))
            .unwrap_err();
        assert!(matches!(err, PdfError::DocumentFormat(_)));
        assert_eq!(interp.resources().depth(), 0);
    }

    #[test]
    fn test_image_xobject_bounds() {
        let mut attrs = PDFDict::new();
        attrs.insert("Subtype".into(), name("Image"));
        attrs.insert("Width".into(), PDFObject::Int(4));
        attrs.insert("Height".into(), PDFObject::Int(2));
        attrs.insert("ColorSpace".into(), name("DeviceRGB"));
        attrs.insert("BitsPerComponent".into(), PDFObject::Int(8));
        let img = PDFObject::Stream(Box::new(PDFStream::new(attrs, vec![0u8; 24])));
        let res = xobjects(vec![("Im1", img)]);

        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp
            .with_resources(Some(&res), |i| i.execute(&[b"q 40 0 0 20 100 200 cm /Im1 Do Q".as_slice()]))
            .unwrap();
        let out = interp.finish();
        let image = &out.images[0];
        assert_eq!(image.name.as_deref(), Some("Im1"));
        assert_eq!(image.bounds, (100.0, 200.0, 140.0, 220.0));
        assert_eq!((image.width, image.height), (4, 2));
        assert!(!image.is_inline);
    }

    #[test]
    fn test_inline_image_keys_expanded() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp
            .execute(&[b"BI /W 2 /H 2 /CS /G /BPC 8 /F /AHx ID 00ff00ff> EI".as_slice()])
            .unwrap();
        let out = interp.finish();
        let image = &out.images[0];
        assert!(image.is_inline);
        assert_eq!(image.width, 2);
        assert_eq!(image.attrs.get("Filter"), Some(&name("ASCIIHexDecode")));
        assert_eq!(
            image.color_space.as_deref(),
            Some(&crate::model::colorspace::ColorSpace::DeviceGray)
        );
    }

    #[test]
    fn test_marked_content_tree() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        interp
            .execute(&[b"/Span <</MCID 3>> BDC 0 0 1 1 re f /Inner BMC 0 0 2 2 re S EMC /Pt MP EMC"
                .as_slice()])
            .unwrap();
        let out = interp.finish();
        assert_eq!(out.marked_content.len(), 1);
        let span = &out.marked_content[0];
        assert_eq!(span.tag, "Span");
        assert_eq!(span.mcid, Some(3));
        assert_eq!(span.paths, vec![0, 1]);
        assert_eq!(span.children.len(), 2);
        assert_eq!(span.children[0].paths, vec![1]);
        assert!(span.children[1].is_point);
    }

    #[test]
    fn test_unbalanced_emc() {
        let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
        assert!(interp.execute(&[b"EMC".as_slice()]).is_err());
    }
}
