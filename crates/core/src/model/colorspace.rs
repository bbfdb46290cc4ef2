//! Resolved color spaces and component-to-RGB conversion.
//!
//! Resolution of names against page resources lives in
//! `interp::colorspace`; this module only knows the closed set of color
//! space families and how each converts its components.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use smallvec::{SmallVec, smallvec};

use crate::error::{PdfError, Result};
use crate::function::PdfFunction;
use crate::model::color::{Color, RgbColor, clamp_unit, cmyk_to_rgb};

/// Color components as stored in the graphics state.
pub type Components = SmallVec<[f64; 4]>;

/// D65 reference white used as the sRGB adaptation target.
const D65: [f64; 3] = [0.9505, 1.0, 1.089];

/// Parameters shared by the CIE-based families.
#[derive(Debug, Clone, PartialEq)]
pub struct CieParams {
    pub white_point: [f64; 3],
    pub black_point: [f64; 3],
}

impl Default for CieParams {
    fn default() -> Self {
        Self {
            white_point: D65,
            black_point: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalRgbParams {
    pub cie: CieParams,
    pub gamma: [f64; 3],
    /// Column-major XYZ matrix: X = m[0]*A + m[3]*B + m[6]*C
    pub matrix: [f64; 9],
}

impl Default for CalRgbParams {
    fn default() -> Self {
        Self {
            cie: CieParams::default(),
            gamma: [1.0; 3],
            matrix: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// A fully resolved color space.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRGB,
    DeviceCMYK,
    CalGray { cie: CieParams, gamma: f64 },
    CalRGB(CalRgbParams),
    /// `range` is [amin amax bmin bmax]
    Lab { cie: CieParams, range: [f64; 4] },
    ICCBased {
        components: usize,
        alternate: Box<ColorSpace>,
        range: Vec<f64>,
    },
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Bytes,
    },
    Separation {
        name: String,
        alternate: Box<ColorSpace>,
        tint_transform: Arc<PdfFunction>,
    },
    DeviceN {
        names: Vec<String>,
        alternate: Box<ColorSpace>,
        tint_transform: Arc<PdfFunction>,
    },
    Pattern { underlying: Option<Box<ColorSpace>> },
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family_name())
    }
}

impl ColorSpace {
    /// Device or parameterless family for a bare name, including the
    /// inline-image abbreviations.
    pub fn from_family_name(name: &str) -> Option<Self> {
        Some(match name {
            "DeviceGray" | "G" => Self::DeviceGray,
            "DeviceRGB" | "RGB" => Self::DeviceRGB,
            "DeviceCMYK" | "CMYK" => Self::DeviceCMYK,
            "CalGray" => Self::CalGray {
                cie: CieParams::default(),
                gamma: 1.0,
            },
            "CalRGB" => Self::CalRGB(CalRgbParams::default()),
            "Lab" => Self::Lab {
                cie: CieParams::default(),
                range: [-100.0, 100.0, -100.0, 100.0],
            },
            "Pattern" => Self::Pattern { underlying: None },
            _ => return None,
        })
    }

    /// Device space with `n` components, as used for ICC fallbacks.
    pub fn device_for_components(n: usize) -> Result<Self> {
        match n {
            1 => Ok(Self::DeviceGray),
            3 => Ok(Self::DeviceRGB),
            4 => Ok(Self::DeviceCMYK),
            other => Err(PdfError::format(format!(
                "no device color space has {other} components"
            ))),
        }
    }

    pub const fn family_name(&self) -> &'static str {
        match self {
            Self::DeviceGray => "DeviceGray",
            Self::DeviceRGB => "DeviceRGB",
            Self::DeviceCMYK => "DeviceCMYK",
            Self::CalGray { .. } => "CalGray",
            Self::CalRGB(_) => "CalRGB",
            Self::Lab { .. } => "Lab",
            Self::ICCBased { .. } => "ICCBased",
            Self::Indexed { .. } => "Indexed",
            Self::Separation { .. } => "Separation",
            Self::DeviceN { .. } => "DeviceN",
            Self::Pattern { .. } => "Pattern",
        }
    }

    /// Number of color components an `sc`/`scn` call supplies.
    pub fn ncomponents(&self) -> usize {
        match self {
            Self::DeviceGray | Self::CalGray { .. } => 1,
            Self::DeviceRGB | Self::CalRGB(_) | Self::Lab { .. } => 3,
            Self::DeviceCMYK => 4,
            Self::ICCBased { components, .. } => *components,
            Self::Indexed { .. } | Self::Separation { .. } => 1,
            Self::DeviceN { names, .. } => names.len(),
            Self::Pattern { underlying } => underlying.as_ref().map_or(0, |u| u.ncomponents()),
        }
    }

    /// Color set when this space is selected.
    pub fn initial_components(&self) -> Components {
        match self {
            Self::DeviceCMYK => smallvec![0.0, 0.0, 0.0, 1.0],
            Self::Lab { range, .. } => {
                smallvec![0.0, 0.0f64.clamp(range[0], range[1]), 0.0f64.clamp(range[2], range[3])]
            }
            Self::ICCBased {
                components, range, ..
            } => (0..*components)
                .map(|i| match (range.get(2 * i), range.get(2 * i + 1)) {
                    (Some(&lo), Some(&hi)) if lo <= hi => 0.0f64.clamp(lo, hi),
                    _ => 0.0,
                })
                .collect(),
            Self::Separation { .. } => smallvec![1.0],
            Self::DeviceN { names, .. } => SmallVec::from_elem(1.0, names.len()),
            Self::Pattern { .. } => SmallVec::new(),
            other => SmallVec::from_elem(0.0, other.ncomponents()),
        }
    }

    pub fn initial_color(&self) -> Color {
        self.to_color(&self.initial_components())
            .unwrap_or_default()
    }

    /// Convert components to a graphics-state color.
    ///
    /// Device spaces keep their components, all others convert to RGB.
    pub fn to_color(&self, components: &[f64]) -> Result<Color> {
        let c = |i: usize| components.get(i).copied().unwrap_or(0.0);
        Ok(match self {
            Self::DeviceGray => Color::Gray(c(0)),
            Self::DeviceRGB => Color::Rgb(c(0), c(1), c(2)),
            Self::DeviceCMYK => Color::Cmyk(c(0), c(1), c(2), c(3)),
            other => Color::from(other.to_rgb(components)?),
        })
    }

    /// Deterministic conversion of a component tuple to RGB.
    ///
    /// Missing components read as zero.
    pub fn to_rgb(&self, components: &[f64]) -> Result<RgbColor> {
        let c = |i: usize| components.get(i).copied().unwrap_or(0.0);
        match self {
            Self::DeviceGray => Ok(RgbColor::gray(clamp_unit(c(0)))),
            Self::DeviceRGB => Ok(RgbColor::clamped(c(0), c(1), c(2))),
            Self::DeviceCMYK => Ok(cmyk_to_rgb(c(0), c(1), c(2), c(3))),
            Self::CalGray { cie, gamma } => {
                let ag = clamp_unit(c(0)).powf(*gamma);
                let w = cie.white_point;
                Ok(xyz_to_srgb([w[0] * ag, w[1] * ag, w[2] * ag], &w))
            }
            Self::CalRGB(p) => {
                let a = clamp_unit(c(0)).powf(p.gamma[0]);
                let b = clamp_unit(c(1)).powf(p.gamma[1]);
                let cc = clamp_unit(c(2)).powf(p.gamma[2]);
                let m = &p.matrix;
                let xyz = [
                    m[0] * a + m[3] * b + m[6] * cc,
                    m[1] * a + m[4] * b + m[7] * cc,
                    m[2] * a + m[5] * b + m[8] * cc,
                ];
                Ok(xyz_to_srgb(xyz, &p.cie.white_point))
            }
            Self::Lab { cie, range } => {
                let l = c(0).clamp(0.0, 100.0);
                let a = c(1).clamp(range[0], range[1]);
                let b = c(2).clamp(range[2], range[3]);
                let m = (l + 16.0) / 116.0;
                let w = cie.white_point;
                let xyz = [
                    w[0] * lab_g(m + a / 500.0),
                    w[1] * lab_g(m),
                    w[2] * lab_g(m - b / 200.0),
                ];
                Ok(xyz_to_srgb(xyz, &w))
            }
            Self::ICCBased { alternate, .. } => alternate.to_rgb(components),
            Self::Indexed {
                base,
                hival,
                lookup,
            } => {
                let index = c(0).round().clamp(0.0, f64::from(*hival)) as usize;
                let n = base.ncomponents();
                let entry: Components = (0..n)
                    .map(|k| {
                        let byte = lookup.get(index * n + k).copied().unwrap_or(0);
                        base.decode_palette_byte(k, byte)
                    })
                    .collect();
                base.to_rgb(&entry)
            }
            Self::Separation {
                alternate,
                tint_transform,
                ..
            }
            | Self::DeviceN {
                alternate,
                tint_transform,
                ..
            } => {
                let tinted = tint_transform.evaluate(components)?;
                alternate.to_rgb(&tinted)
            }
            Self::Pattern { underlying } => match underlying {
                Some(u) => u.to_rgb(components),
                None => Err(PdfError::UnsupportedFeature(
                    "colored pattern has no direct RGB value".into(),
                )),
            },
        }
    }

    /// Map a palette byte to the base space's component range.
    fn decode_palette_byte(&self, k: usize, byte: u8) -> f64 {
        let t = f64::from(byte) / 255.0;
        match self {
            Self::Lab { range, .. } => match k {
                0 => t * 100.0,
                1 => range[0] + t * (range[1] - range[0]),
                _ => range[2] + t * (range[3] - range[2]),
            },
            Self::ICCBased { range, .. } => match (range.get(2 * k), range.get(2 * k + 1)) {
                (Some(&lo), Some(&hi)) => lo + t * (hi - lo),
                _ => t,
            },
            _ => t,
        }
    }
}

fn lab_g(x: f64) -> f64 {
    if x >= 6.0 / 29.0 {
        x * x * x
    } else {
        108.0 / 841.0 * (x - 4.0 / 29.0)
    }
}

/// CIE XYZ relative to `white` to gamma-encoded sRGB.
fn xyz_to_srgb(xyz: [f64; 3], white: &[f64; 3]) -> RgbColor {
    // von Kries scaling from the source white to D65
    let scale = |i: usize| if white[i] > 0.0 { D65[i] / white[i] } else { 1.0 };
    let (x, y, z) = (xyz[0] * scale(0), xyz[1] * scale(1), xyz[2] * scale(2));
    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;
    RgbColor::clamped(srgb_gamma(r), srgb_gamma(g), srgb_gamma(b))
}

fn srgb_gamma(v: f64) -> f64 {
    if v <= 0.003_130_8 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}
