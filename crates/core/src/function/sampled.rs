//! Type 0 (sampled) functions.

use crate::error::{PdfError, Result};
use crate::function::{FunctionOutput, interpolate};
use crate::model::objects::{ObjectResolver, PDFObject, PDFStream, resolve_object};

/// Input dimensions above this would need 2^m corner lookups per call.
const MAX_INPUTS: usize = 16;

/// A sample table with multilinear interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFunction {
    size: Vec<usize>,
    bits_per_sample: u32,
    encode: Vec<f64>,
    decode: Vec<f64>,
    n_out: usize,
    /// Raw sample values, first input dimension varying fastest
    samples: Vec<u32>,
}

impl SampledFunction {
    /// Build from explicit parts. `samples` holds raw integer values.
    pub fn new(
        size: Vec<usize>,
        bits_per_sample: u32,
        encode: Option<Vec<f64>>,
        decode: Vec<f64>,
        samples: Vec<u32>,
    ) -> Result<Self> {
        check_bits(bits_per_sample)?;
        if size.is_empty() || size.len() > MAX_INPUTS || size.contains(&0) {
            return Err(PdfError::format("invalid sampled function Size"));
        }
        let n_out = decode.len() / 2;
        if n_out == 0 {
            return Err(PdfError::format("sampled function without outputs"));
        }
        let encode = encode.unwrap_or_else(|| {
            size.iter()
                .flat_map(|&s| [0.0, (s - 1) as f64])
                .collect()
        });
        if encode.len() != 2 * size.len() {
            return Err(PdfError::format("Encode does not match Size"));
        }
        let expected = sample_count(&size, n_out)?;
        if samples.len() < expected {
            return Err(PdfError::format(format!(
                "sample table has {} values, Size needs {expected}",
                samples.len()
            )));
        }
        Ok(Self {
            size,
            bits_per_sample,
            encode,
            decode,
            n_out,
            samples,
        })
    }

    /// Parse from the function stream. `domain` and `range` come from the
    /// common function dictionary.
    pub fn from_stream(
        stream: &PDFStream,
        domain: &[f64],
        range: &[f64],
        resolver: &dyn ObjectResolver,
    ) -> Result<Self> {
        let get = |key: &str| -> Result<Option<PDFObject>> {
            stream
                .get(key)
                .map(|o| resolve_object(resolver, o))
                .transpose()
        };

        let size = get("Size")?
            .ok_or_else(|| PdfError::format("sampled function has no Size"))?
            .as_array()
            .map_err(|_| PdfError::format("Size is not an array"))?
            .iter()
            .map(|o| o.as_int().map(|v| v.max(0) as usize))
            .collect::<Result<Vec<_>>>()?;
        if size.len() != domain.len() / 2 {
            return Err(PdfError::format("Size does not match Domain"));
        }
        let bits_per_sample = get("BitsPerSample")?
            .ok_or_else(|| PdfError::format("sampled function has no BitsPerSample"))?
            .as_int()?;
        let bits_per_sample = u32::try_from(bits_per_sample)
            .map_err(|_| PdfError::format("negative BitsPerSample"))?;
        check_bits(bits_per_sample)?;
        if let Some(order) = get("Order")?
            && order.as_int().unwrap_or(1) == 3
        {
            tracing::debug!("cubic sample order requested, using linear interpolation");
        }
        let encode = get("Encode")?.map(|o| o.as_num_array()).transpose()?;
        let decode = match get("Decode")? {
            Some(o) => o.as_num_array()?,
            None => range.to_vec(),
        };

        let n_out = decode.len() / 2;
        let count = sample_count(&size, n_out)?;
        let data = stream.get_data();
        let available = data.len() * 8 / bits_per_sample as usize;
        if count > available {
            return Err(PdfError::format(format!(
                "sampled function needs {count} samples, stream holds {available}"
            )));
        }
        let samples = read_samples(data, bits_per_sample, count);
        Self::new(size, bits_per_sample, encode, decode, samples)
    }

    pub fn input_count(&self) -> usize {
        self.size.len()
    }

        pub fn output_count(&self) -> usize {
        self.n_out
    }

    fn sample(&self, index: usize, output: usize) -> f64 {
        self.samples
            .get(index * self.n_out + output)
            .copied()
            .unwrap_or(0) as f64
    }

    pub(crate) fn eval(&self, x: &[f64], domain: &[f64]) -> Result<FunctionOutput> {
        let m = self.size.len();
        if x.len() < m {
            return Err(PdfError::FunctionEvaluation(format!(
                "sampled function needs {m} inputs, got {}",
                x.len()
            )));
        }

        // Lower corner index and fractional offset per dimension.
        let mut base = Vec::with_capacity(m);
        let mut frac = Vec::with_capacity(m);
        for i in 0..m {
            let last = (self.size[i] - 1) as f64;
            let e = interpolate(
                x[i],
                domain[2 * i],
                domain[2 * i + 1],
                self.encode[2 * i],
                self.encode[2 * i + 1],
            )
            .clamp(0.0, last);
            let lo = e.floor().min((last - 1.0).max(0.0));
            base.push(lo as usize);
            frac.push(e - lo);
        }

        let mut acc = FunctionOutput::from_elem(0.0, self.n_out);
        for corner in 0..(1usize << m) {
            let mut weight = 1.0;
            let mut index = 0;
            let mut stride = 1;
            for i in 0..m {
                let upper = corner & (1 << i) != 0;
                weight *= if upper { frac[i] } else { 1.0 - frac[i] };
                let idx = (base[i] + usize::from(upper)).min(self.size[i] - 1);
                index += idx * stride;
                stride *= self.size[i];
            }
            if weight == 0.0 {
                continue;
            }
            for (j, slot) in acc.iter_mut().enumerate() {
                *slot += weight * self.sample(index, j);
            }
        }

        let max = ((1u64 << self.bits_per_sample) - 1) as f64;
        for (j, v) in acc.iter_mut().enumerate() {
            *v = interpolate(*v, 0.0, max, self.decode[2 * j], self.decode[2 * j + 1]);
        }
        Ok(acc)
    }
}

fn check_bits(bits_per_sample: u32) -> Result<()> {
    if matches!(bits_per_sample, 1 | 2 | 4 | 8 | 12 | 16 | 24 | 32) {
        Ok(())
    } else {
        Err(PdfError::format(format!(
            "invalid BitsPerSample {bits_per_sample}"
        )))
    }
}

/// Total samples in the table; an overflowing product is malformed.
fn sample_count(size: &[usize], n_out: usize) -> Result<usize> {
    size.iter()
        .try_fold(n_out, |acc, &s| acc.checked_mul(s))
        .ok_or_else(|| PdfError::format("sampled function Size overflows"))
}

/// Unpack `count` big-endian samples of `bits` width.
fn read_samples(data: &[u8], bits: u32, count: usize) -> Vec<u32> {
    let mut out = Vec::with_capacity(count);
    let mut bit_pos: usize = 0;
    let total_bits = data.len() * 8;
    let bits = bits as usize;
    while out.len() < count && bit_pos + bits <= total_bits {
        let mut v: u32 = 0;
        if bits % 8 == 0 {
            for k in 0..bits / 8 {
                v = (v << 8) | u32::from(data[bit_pos / 8 + k]);
            }
        } else {
            for k in 0..bits {
                let p = bit_pos + k;
                let bit = (data[p / 8] >> (7 - p % 8)) & 1;
                v = (v << 1) | u32::from(bit);
            }
        }
        out.push(v);
        bit_pos += bits;
    }
    out
}
