//! PDF function objects (ISO 32000-1, 7.10).
//!
//! Functions are parsed once from the object graph and evaluated many
//! times, typically while converting Separation/DeviceN tints or sampling
//! shadings. Evaluation clips inputs to the Domain and, when a Range is
//! declared, outputs to the Range.

pub mod calculator;
pub mod sampled;

use smallvec::SmallVec;

use crate::error::{PdfError, Result};
use crate::model::objects::{ObjectResolver, PDFDict, PDFObject, resolve_object};

pub use calculator::CalculatorFunction;
pub use sampled::SampledFunction;

/// Nesting limit for stitching functions built from the object graph.
const MAX_FUNCTION_DEPTH: usize = 8;

/// Output components of a function call.
pub type FunctionOutput = SmallVec<[f64; 4]>;

/// Linear interpolation of `x` from [x0, x1] into [y0, y1].
#[inline]
pub fn interpolate(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    if x1 == x0 {
        return y0;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Clip value i to [bounds[2i], bounds[2i + 1]] where bounds exist.
fn clip_to_bounds(values: &mut [f64], bounds: &[f64]) {
    for (i, v) in values.iter_mut().enumerate() {
        if let (Some(&lo), Some(&hi)) = (bounds.get(2 * i), bounds.get(2 * i + 1)) {
            *v = if *v < lo {
                lo
            } else if *v > hi {
                hi
            } else {
                *v
            };
        }
    }
}

/// Type 2 function: `C0 + x^N * (C1 - C0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialFunction {
    pub c0: Vec<f64>,
    pub c1: Vec<f64>,
    pub exponent: f64,
}

impl ExponentialFunction {
    pub fn new(c0: Vec<f64>, c1: Vec<f64>, exponent: f64) -> Result<Self> {
        if c0.len() != c1.len() {
            return Err(PdfError::format("C0 and C1 differ in length"));
        }
        Ok(Self { c0, c1, exponent })
    }

    fn eval(&self, x: f64) -> FunctionOutput {
        let xn = x.powf(self.exponent);
        self.c0
            .iter()
            .zip(&self.c1)
            .map(|(c0, c1)| c0 + xn * (c1 - c0))
            .collect()
    }
}

/// Type 3 function: one-input function stitched from sub-functions.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchingFunction {
    pub functions: Vec<PdfFunction>,
    pub bounds: Vec<f64>,
    pub encode: Vec<f64>,
    /// The single input interval
    pub domain: (f64, f64),
}

impl StitchingFunction {
    pub fn new(
        functions: Vec<PdfFunction>,
        bounds: Vec<f64>,
        encode: Vec<f64>,
        domain: &[f64],
    ) -> Result<Self> {
        let &[d0, d1] = domain else {
            return Err(PdfError::UnsupportedFeature(
                "stitching function with more than one input".into(),
            ));
        };
        let k = functions.len();
        if k == 0 {
            return Err(PdfError::format("stitching function without sub-functions"));
        }
        if bounds.len() != k - 1 {
            return Err(PdfError::format(format!(
                "stitching function has {} bounds for {} functions",
                bounds.len(),
                k
            )));
        }
        if encode.len() != 2 * k {
            return Err(PdfError::format(format!(
                "stitching function has {} encode values for {} functions",
                encode.len(),
                k
            )));
        }
        if bounds.windows(2).any(|w| w[0] > w[1]) {
            return Err(PdfError::UnsupportedFeature(
                "stitching bounds are not increasing".into(),
            ));
        }
        Ok(Self {
            functions,
            bounds,
            encode,
            domain: (d0, d1),
        })
    }

    fn eval(&self, x: f64) -> Result<FunctionOutput> {
        let k = self.functions.len();
        let i = self.bounds.iter().take_while(|&&b| x >= b).count().min(k - 1);
        let low = if i == 0 { self.domain.0 } else { self.bounds[i - 1] };
        let high = if i == k - 1 {
            self.domain.1
        } else {
            self.bounds[i]
        };
        let t = interpolate(x, low, high, self.encode[2 * i], self.encode[2 * i + 1]);
        self.functions[i].evaluate(&[t])
    }
}

/// Function body by type.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionKind {
    Sampled(SampledFunction),
    Exponential(ExponentialFunction),
    Stitching(StitchingFunction),
    Calculator(CalculatorFunction),
}

/// A PDF function: sampled, exponential, stitching, calculator, or identity.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfFunction {
    /// Domain/Range bounded function of types 0, 2, 3 or 4
    Bounded {
        domain: Vec<f64>,
        range: Option<Vec<f64>>,
        kind: FunctionKind,
    },
    /// `/Identity`: returns its inputs, no Domain/Range processing
    Identity,
}

impl PdfFunction {
    /// Build a bounded function, validating Domain and Range shapes.
    pub fn new(domain: Vec<f64>, range: Option<Vec<f64>>, kind: FunctionKind) -> Result<Self> {
        if domain.is_empty() || domain.len() % 2 != 0 {
            return Err(PdfError::format("function Domain must hold pairs of bounds"));
        }
        if let Some(r) = &range
            && (r.is_empty() || r.len() % 2 != 0)
        {
            return Err(PdfError::format("function Range must hold pairs of bounds"));
        }
        match &kind {
            FunctionKind::Calculator(_) | FunctionKind::Sampled(_) if range.is_none() => {
                return Err(PdfError::format("function type requires a Range"));
            }
            FunctionKind::Stitching(f) if domain != [f.domain.0, f.domain.1] => {
                return Err(PdfError::format("stitching Domain differs from its function"));
            }
            FunctionKind::Sampled(f) if f.input_count() != domain.len() / 2 => {
                return Err(PdfError::format("sampled function Size does not match Domain"));
            }
            _ => {}
        }
        Ok(Self::Bounded {
            domain,
            range,
            kind,
        })
    }

    pub fn domain(&self) -> Option<&[f64]> {
        match self {
            Self::Bounded { domain, .. } => Some(domain),
            Self::Identity => None,
        }
    }

    pub fn range(&self) -> Option<&[f64]> {
        match self {
            Self::Bounded { range, .. } => range.as_deref(),
            Self::Identity => None,
        }
    }

    /// Number of inputs, if fixed.
    pub fn input_count(&self) -> Option<usize> {
        self.domain().map(|d| d.len() / 2)
    }

    /// Number of outputs, if known without evaluating.
    pub fn output_count(&self) -> Option<usize> {
        match self {
            Self::Bounded { range: Some(r), .. } => Some(r.len() / 2),
            Self::Bounded {
                kind: FunctionKind::Exponential(f),
                ..
            } => Some(f.c0.len()),
            _ => None,
        }
    }

    /// Evaluate the function.
    pub fn evaluate(&self, inputs: &[f64]) -> Result<FunctionOutput> {
        let (domain, range, kind) = match self {
            Self::Identity => return Ok(inputs.iter().copied().collect()),
            Self::Bounded {
                domain,
                range,
                kind,
            } => (domain, range, kind),
        };

        let mut x: FunctionOutput = inputs.iter().copied().collect();
        let n_in = domain.len() / 2;
        if x.len() < n_in {
            x.resize(n_in, 0.0);
        }
        x.truncate(n_in);
        clip_to_bounds(&mut x, domain);

        let mut out = match kind {
            FunctionKind::Exponential(f) => f.eval(x[0]),
            FunctionKind::Stitching(f) => f.eval(x[0])?,
            FunctionKind::Sampled(f) => f.eval(&x, domain)?,
            FunctionKind::Calculator(f) => {
                let n_out = range.as_ref().map_or(0, |r| r.len() / 2);
                f.execute(&x, n_out)?
            }
        };

        if let Some(range) = range {
            clip_to_bounds(&mut out, range);
        }
        Ok(out)
    }

    /// Parse a function from the object graph.
    pub fn from_object(obj: &PDFObject, resolver: &dyn ObjectResolver) -> Result<Self> {
        parse_function(obj, resolver, 0)
    }
}

fn num_array(dict: &PDFDict, key: &str, resolver: &dyn ObjectResolver) -> Result<Option<Vec<f64>>> {
    match dict.get(key) {
        None => Ok(None),
        Some(obj) => {
            let obj = resolve_object(resolver, obj)?;
            obj.as_num_array()
                .map(Some)
                .map_err(|_| PdfError::format(format!("function entry {key} is not a number array")))
        }
    }
}

fn parse_function(obj: &PDFObject, resolver: &dyn ObjectResolver, depth: usize) -> Result<PdfFunction> {
    if depth > MAX_FUNCTION_DEPTH {
        return Err(PdfError::format("function nesting too deep"));
    }
    let obj = resolve_object(resolver, obj)?;
    if let PDFObject::Name(name) = &obj {
        return if name == "Identity" {
            Ok(PdfFunction::Identity)
        } else {
            Err(PdfError::format(format!("unknown function name /{name}")))
        };
    }

    let dict = obj
        .as_dict()
        .map_err(|_| PdfError::format("function is not a dictionary or stream"))?;

    let function_type = dict
        .get("FunctionType")
        .map(|o| resolve_object(resolver, o))
        .transpose()?
        .ok_or_else(|| PdfError::format("function has no FunctionType"))?
        .as_int()
        .map_err(|_| PdfError::format("FunctionType is not an integer"))?;

    let domain = num_array(dict, "Domain", resolver)?
        .ok_or_else(|| PdfError::format("function has no Domain"))?;
    let range = num_array(dict, "Range", resolver)?;

    let kind = match function_type {
        0 => {
            let stream = obj
                .as_stream()
                .map_err(|_| PdfError::format("sampled function must be a stream"))?;
            let range = range
                .as_deref()
                .ok_or_else(|| PdfError::format("sampled function has no Range"))?;
            FunctionKind::Sampled(SampledFunction::from_stream(stream, &domain, range, resolver)?)
        }
        2 => {
            let c0 = num_array(dict, "C0", resolver)?.unwrap_or_else(|| vec![0.0]);
            let c1 = num_array(dict, "C1", resolver)?.unwrap_or_else(|| vec![1.0]);
            let exponent = dict
                .get("N")
                .map(|o| resolve_object(resolver, o))
                .transpose()?
                .ok_or_else(|| PdfError::format("exponential function has no N"))?
                .as_num()
                .map_err(|_| PdfError::format("N is not a number"))?;
            FunctionKind::Exponential(ExponentialFunction::new(c0, c1, exponent)?)
        }
        3 => {
            let functions_obj = dict
                .get("Functions")
                .map(|o| resolve_object(resolver, o))
                .transpose()?
                .ok_or_else(|| PdfError::format("stitching function has no Functions"))?;
            let functions = functions_obj
                .as_array()
                .map_err(|_| PdfError::format("Functions is not an array"))?
                .iter()
                .map(|f| parse_function(f, resolver, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            let bounds = num_array(dict, "Bounds", resolver)?
                .ok_or_else(|| PdfError::format("stitching function has no Bounds"))?;
            let encode = num_array(dict, "Encode", resolver)?
                .ok_or_else(|| PdfError::format("stitching function has no Encode"))?;
            FunctionKind::Stitching(StitchingFunction::new(functions, bounds, encode, &domain)?)
        }
        4 => {
            let stream = obj
                .as_stream()
                .map_err(|_| PdfError::format("calculator function must be a stream"))?;
            FunctionKind::Calculator(CalculatorFunction::parse(stream.get_data())?)
        }
        other => {
            return Err(PdfError::format(format!("invalid FunctionType {other}")));
        }
    };

    PdfFunction::new(domain, range, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::objects::NoResolver;

    fn exponential_dict(n: f64) -> PDFObject {
        let mut d = PDFDict::new();
        d.insert("FunctionType".into(), PDFObject::Int(2));
        d.insert(
            "Domain".into(),
            PDFObject::Array(vec![PDFObject::Int(0), PDFObject::Int(1)]),
        );
        d.insert("N".into(), PDFObject::Real(n));
        PDFObject::Dict(d)
    }

    #[test]
    fn test_parse_exponential_defaults() {
        let f = PdfFunction::from_object(&exponential_dict(1.0), &NoResolver).unwrap();
        assert_eq!(f.evaluate(&[0.25]).unwrap().as_slice(), &[0.25]);
        assert_eq!(f.output_count(), Some(1));
    }

    #[test]
    fn test_missing_function_type() {
        let mut d = PDFDict::new();
        d.insert(
            "Domain".into(),
            PDFObject::Array(vec![PDFObject::Int(0), PDFObject::Int(1)]),
        );
        let err = PdfFunction::from_object(&PDFObject::Dict(d), &NoResolver).unwrap_err();
        assert!(matches!(err, PdfError::DocumentFormat(_)));
    }

    #[test]
    fn test_identity_name() {
        let f = PdfFunction::from_object(&PDFObject::Name("Identity".into()), &NoResolver).unwrap();
        assert_eq!(f.evaluate(&[7.0, -3.0]).unwrap().as_slice(), &[7.0, -3.0]);
    }

    #[test]
    fn test_stitching_keeps_its_domain() {
        let parts = vec![
            PdfFunction::from_object(&exponential_dict(1.0), &NoResolver).unwrap(),
            PdfFunction::from_object(&exponential_dict(1.0), &NoResolver).unwrap(),
        ];
        let f = StitchingFunction::new(parts.clone(), vec![3.0], vec![0.0, 1.0, 0.0, 1.0], &[2.0, 4.0])
            .unwrap();
        assert_eq!(f.domain, (2.0, 4.0));
        let f = PdfFunction::new(vec![2.0, 4.0], None, FunctionKind::Stitching(f)).unwrap();
        assert!((f.evaluate(&[2.5]).unwrap()[0] - 0.5).abs() < 1e-9);

        let err = StitchingFunction::new(parts, vec![], vec![0.0, 1.0], &[0.0, 1.0, 0.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, PdfError::UnsupportedFeature(_)));
    }

    #[test]
    fn test_sampled_domain_must_match_size() {
        let sampled = SampledFunction::new(vec![2, 2], 8, None, vec![0.0, 1.0], vec![0; 4]).unwrap();
        let err = PdfFunction::new(vec![0.0, 1.0], Some(vec![0.0, 1.0]), FunctionKind::Sampled(sampled))
            .unwrap_err();
        assert!(matches!(err, PdfError::DocumentFormat(_)));
    }

    #[test]
    fn test_interpolate_degenerate() {
        assert_eq!(interpolate(5.0, 1.0, 1.0, 3.0, 9.0), 3.0);
        assert_eq!(interpolate(0.5, 0.0, 1.0, 0.0, 10.0), 5.0);
    }
}
