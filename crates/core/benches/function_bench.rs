//! Benchmarks for PDF function evaluation.
//!
//! Shading and tint transforms evaluate a function per sample, so these
//! measure single evaluations in a tight loop.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use trazo_core::function::PdfFunction;
use trazo_core::model::objects::{NoResolver, PDFDict, PDFObject, PDFStream};

fn nums(values: &[f64]) -> PDFObject {
    PDFObject::Array(values.iter().map(|&v| PDFObject::Real(v)).collect())
}

fn exponential() -> PDFObject {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(2));
    d.insert("Domain".into(), nums(&[0.0, 1.0]));
    d.insert("C0".into(), nums(&[0.0, 0.0, 0.0]));
    d.insert("C1".into(), nums(&[1.0, 0.5, 0.25]));
    d.insert("N".into(), PDFObject::Real(2.2));
    PDFObject::Dict(d)
}

fn stitching(parts: usize) -> PDFObject {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(3));
    d.insert("Domain".into(), nums(&[0.0, 1.0]));
    d.insert("Functions".into(), PDFObject::Array(vec![exponential(); parts]));
    let bounds: Vec<f64> = (1..parts).map(|i| i as f64 / parts as f64).collect();
    d.insert("Bounds".into(), nums(&bounds));
    d.insert("Encode".into(), nums(&[0.0, 1.0].repeat(parts)));
    PDFObject::Dict(d)
}

/// 2-in, 3-out sampled function on a `side` x `side` grid.
fn sampled(side: usize) -> PDFObject {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(0));
    d.insert("Domain".into(), nums(&[0.0, 1.0, 0.0, 1.0]));
    d.insert("Range".into(), nums(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]));
    d.insert(
        "Size".into(),
        PDFObject::Array(vec![PDFObject::Int(side as i64), PDFObject::Int(side as i64)]),
    );
    d.insert("BitsPerSample".into(), PDFObject::Int(8));
    let data: Vec<u8> = (0..side * side * 3).map(|i| (i * 31 % 256) as u8).collect();
    PDFObject::Stream(Box::new(PDFStream::new(d, data)))
}

fn calculator() -> PDFObject {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(4));
    d.insert("Domain".into(), nums(&[0.0, 1.0]));
    d.insert("Range".into(), nums(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]));
    let program = b"{ dup 0.5 gt { 1 exch sub } if dup 0.3 mul exch dup 0.6 mul exch 0 exch }";
    PDFObject::Stream(Box::new(PDFStream::new(d, program.to_vec())))
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("function_evaluate");
    let inputs: Vec<f64> = (0..1024).map(|i| i as f64 / 1023.0).collect();

    let cases = [
        ("exponential", exponential()),
        ("stitching_8", stitching(8)),
        ("calculator", calculator()),
    ];
    for (name, obj) in cases {
        let f = PdfFunction::from_object(&obj, &NoResolver).unwrap();
        group.bench_with_input(BenchmarkId::new(name, inputs.len()), &inputs, |b, inputs| {
            b.iter(|| {
                for &x in inputs {
                    black_box(f.evaluate(black_box(&[x])).unwrap());
                }
            })
        });
    }

    for side in [4usize, 64] {
        let f = PdfFunction::from_object(&sampled(side), &NoResolver).unwrap();
        group.bench_with_input(BenchmarkId::new("sampled_2d", side), &inputs, |b, inputs| {
            b.iter(|| {
                for &x in inputs {
                    black_box(f.evaluate(black_box(&[x, 1.0 - x])).unwrap());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
