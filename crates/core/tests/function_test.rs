//! Tests for PDF functions - exponential, stitching, sampled and calculator
//! functions, and their Domain/Range handling.

use trazo_core::error::PdfError;
use trazo_core::function::{
    CalculatorFunction, ExponentialFunction, FunctionKind, PdfFunction,
};
use trazo_core::model::objects::{NoResolver, PDFDict, PDFObject, PDFStream};

fn nums(values: &[f64]) -> PDFObject {
    PDFObject::Array(values.iter().map(|&v| PDFObject::Real(v)).collect())
}

fn exponential(c0: f64, c1: f64, n: f64, domain: &[f64], range: Option<&[f64]>) -> PdfFunction {
    let kind = FunctionKind::Exponential(ExponentialFunction::new(vec![c0], vec![c1], n).unwrap());
    PdfFunction::new(domain.to_vec(), range.map(<[f64]>::to_vec), kind).unwrap()
}

fn exponential_dict(c0: f64, c1: f64) -> PDFObject {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(2));
    d.insert("Domain".into(), nums(&[0.0, 1.0]));
    d.insert("C0".into(), nums(&[c0]));
    d.insert("C1".into(), nums(&[c1]));
    d.insert("N".into(), PDFObject::Int(1));
    PDFObject::Dict(d)
}

fn calculator(program: &[u8], domain: &[f64], range: &[f64]) -> PdfFunction {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(4));
    d.insert("Domain".into(), nums(domain));
    d.insert("Range".into(), nums(range));
    let obj = PDFObject::Stream(Box::new(PDFStream::new(d, program.to_vec())));
    PdfFunction::from_object(&obj, &NoResolver).unwrap()
}

// ============================================================================
// Exponential functions
// ============================================================================

#[test]
fn test_exponential_exactness() {
    let linear = exponential(0.0, 1.0, 1.0, &[0.0, 1.0], None);
    assert_eq!(linear.evaluate(&[0.5]).unwrap().as_slice(), &[0.5]);

    let square = exponential(0.0, 1.0, 2.0, &[0.0, 1.0], None);
    assert_eq!(square.evaluate(&[0.5]).unwrap().as_slice(), &[0.25]);
}

#[test]
fn test_input_clipped_to_domain() {
    let f = exponential(0.0, 1.0, 1.0, &[0.2, 1.0], None);
    assert_eq!(f.evaluate(&[-3.0]).unwrap().as_slice(), &[0.2]);
    assert_eq!(f.evaluate(&[7.0]).unwrap().as_slice(), &[1.0]);
}

#[test]
fn test_output_clipped_only_with_range() {
    let unclipped = exponential(0.0, 2.0, 1.0, &[0.0, 1.0], None);
    assert_eq!(unclipped.evaluate(&[1.0]).unwrap().as_slice(), &[2.0]);

    let clipped = exponential(0.0, 2.0, 1.0, &[0.0, 1.0], Some(&[0.0, 1.5]));
    assert_eq!(clipped.evaluate(&[1.0]).unwrap().as_slice(), &[1.5]);
}

#[test]
fn test_identity_returns_inputs() {
    let f = PdfFunction::from_object(&PDFObject::Name("Identity".into()), &NoResolver).unwrap();
    assert_eq!(f.evaluate(&[3.0, -1.0]).unwrap().as_slice(), &[3.0, -1.0]);
}

// ============================================================================
// Construction errors
// ============================================================================

#[test]
fn test_missing_function_type() {
    let mut d = PDFDict::new();
    d.insert("Domain".into(), nums(&[0.0, 1.0]));
    let err = PdfFunction::from_object(&PDFObject::Dict(d), &NoResolver).unwrap_err();
    assert!(matches!(err, PdfError::DocumentFormat(_)));
}

#[test]
fn test_missing_domain() {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(2));
    d.insert("N".into(), PDFObject::Int(1));
    let err = PdfFunction::from_object(&PDFObject::Dict(d), &NoResolver).unwrap_err();
    assert!(matches!(err, PdfError::DocumentFormat(_)));
}

#[test]
fn test_calculator_requires_range() {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(4));
    d.insert("Domain".into(), nums(&[0.0, 1.0]));
    let obj = PDFObject::Stream(Box::new(PDFStream::new(d, b"{ }".to_vec())));
    let err = PdfFunction::from_object(&obj, &NoResolver).unwrap_err();
    assert!(matches!(err, PdfError::DocumentFormat(_)));
}

// ============================================================================
// Stitching and sampled functions
// ============================================================================

#[test]
fn test_stitching_selects_and_encodes() {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(3));
    d.insert("Domain".into(), nums(&[0.0, 1.0]));
    d.insert(
        "Functions".into(),
        PDFObject::Array(vec![exponential_dict(0.0, 1.0), exponential_dict(1.0, 0.0)]),
    );
    d.insert("Bounds".into(), nums(&[0.5]));
    d.insert("Encode".into(), nums(&[0.0, 1.0, 0.0, 1.0]));
    let f = PdfFunction::from_object(&PDFObject::Dict(d), &NoResolver).unwrap();

    assert!((f.evaluate(&[0.25]).unwrap()[0] - 0.5).abs() < 1e-9);
    assert!((f.evaluate(&[0.6]).unwrap()[0] - 0.8).abs() < 1e-9);
}

#[test]
fn test_sampled_interpolates() {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(0));
    d.insert("Domain".into(), nums(&[0.0, 1.0]));
    d.insert("Range".into(), nums(&[0.0, 1.0]));
    d.insert("Size".into(), PDFObject::Array(vec![PDFObject::Int(2)]));
    d.insert("BitsPerSample".into(), PDFObject::Int(8));
    let obj = PDFObject::Stream(Box::new(PDFStream::new(d, vec![0u8, 255])));
    let f = PdfFunction::from_object(&obj, &NoResolver).unwrap();

    assert!((f.evaluate(&[0.5]).unwrap()[0] - 0.5).abs() < 1e-9);
    assert_eq!(f.evaluate(&[1.0]).unwrap()[0], 1.0);
}

fn sampled_stream(size: &[i64], data: Vec<u8>) -> PDFObject {
    let mut d = PDFDict::new();
    d.insert("FunctionType".into(), PDFObject::Int(0));
    d.insert("Domain".into(), nums(&[0.0, 1.0].repeat(size.len())));
    d.insert("Range".into(), nums(&[0.0, 1.0]));
    d.insert(
        "Size".into(),
        PDFObject::Array(size.iter().map(|&s| PDFObject::Int(s)).collect()),
    );
    d.insert("BitsPerSample".into(), PDFObject::Int(8));
    PDFObject::Stream(Box::new(PDFStream::new(d, data)))
}

#[test]
fn test_sampled_size_larger_than_data() {
    let obj = sampled_stream(&[1 << 20, 1 << 20], vec![0, 1, 2, 3]);
    let err = PdfFunction::from_object(&obj, &NoResolver).unwrap_err();
    assert!(matches!(err, PdfError::DocumentFormat(_)));
}

#[test]
fn test_sampled_size_overflow() {
    let side = 1 << 30;
    let obj = sampled_stream(&[side, side, side], vec![0; 8]);
    let err = PdfFunction::from_object(&obj, &NoResolver).unwrap_err();
    assert!(matches!(err, PdfError::DocumentFormat(_)));
}

#[test]
fn test_sampled_short_data() {
    // 2x2 grid needs four samples
    let obj = sampled_stream(&[2, 2], vec![0, 255, 255]);
    let err = PdfFunction::from_object(&obj, &NoResolver).unwrap_err();
    assert!(matches!(err, PdfError::DocumentFormat(_)));
}

#[test]
fn test_sampled_zero_bits_per_sample() {
    let mut obj = sampled_stream(&[2], vec![0, 255]);
    if let PDFObject::Stream(s) = &mut obj {
        s.attrs.insert("BitsPerSample".into(), PDFObject::Int(0));
    }
    let err = PdfFunction::from_object(&obj, &NoResolver).unwrap_err();
    assert!(matches!(err, PdfError::DocumentFormat(_)));
}

// ============================================================================
// Calculator functions
// ============================================================================

#[test]
fn test_calculator_max_of_two() {
    let f = calculator(b"{ 2 copy lt { exch } if pop }", &[0.0, 1.0, 0.0, 1.0], &[0.0, 1.0]);
    assert_eq!(f.evaluate(&[0.3, 0.7]).unwrap().as_slice(), &[0.7]);
    assert_eq!(f.evaluate(&[0.9, 0.2]).unwrap().as_slice(), &[0.9]);
}

#[test]
fn test_calculator_outputs_clipped_to_range() {
    let f = calculator(b"{ 10 mul }", &[0.0, 1.0], &[0.0, 2.0]);
    assert_eq!(f.evaluate(&[0.5]).unwrap().as_slice(), &[2.0]);
}

#[test]
fn test_calculator_ifelse() {
    let f = calculator(
        b"{ dup 0.5 gt { pop 1 } { pop 0 } ifelse }",
        &[0.0, 1.0],
        &[0.0, 1.0],
    );
    assert_eq!(f.evaluate(&[0.8]).unwrap().as_slice(), &[1.0]);
    assert_eq!(f.evaluate(&[0.1]).unwrap().as_slice(), &[0.0]);
}

#[test]
fn test_calculator_underflow_is_fatal() {
    let f = calculator(b"{ pop }", &[0.0, 1.0], &[0.0, 1.0]);
    let err = f.evaluate(&[0.5]).unwrap_err();
    assert!(matches!(err, PdfError::FunctionEvaluation(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn test_calculator_two_outputs_in_order() {
    let f = calculator(b"{ dup 1 exch sub }", &[0.0, 1.0], &[0.0, 1.0, 0.0, 1.0]);
    assert_eq!(f.evaluate(&[0.25]).unwrap().as_slice(), &[0.25, 0.75]);
}

#[test]
fn test_calculator_rejects_bad_program() {
    assert!(CalculatorFunction::parse(b"1 2 add").is_err());
    assert!(CalculatorFunction::parse(b"{ 1 frobnicate }").is_err());
}
