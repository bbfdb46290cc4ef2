//! Tests for page interpretation - page setup, painting, clipping, form
//! XObjects, marked content and the error policy.

use std::sync::Arc;

use trazo_core::error::PdfError;
use trazo_core::interp::{InterpreterOptions, PDFPageInterpreter, PDFResourceManager, WidthsLetterSource};
use trazo_core::model::color::{Color, RgbColor};
use trazo_core::model::objects::{MemoryResolver, NoResolver, PDFDict, PDFObject, PDFStream};
use trazo_core::model::page::PageInput;

fn page(content: &'static str) -> PageInput {
    PageInput::new((0.0, 0.0, 200.0, 100.0), content)
}

fn run(page: &PageInput, options: InterpreterOptions) -> trazo_core::Result<trazo_core::PageContent> {
    PDFPageInterpreter::new(&NoResolver, options).process_page(page)
}

fn nums(values: &[f64]) -> PDFObject {
    PDFObject::Array(values.iter().map(|&v| PDFObject::Real(v)).collect())
}

fn form(content: &str, matrix: Option<&[f64]>, resources: Option<PDFDict>) -> PDFObject {
    let mut attrs = PDFDict::new();
    attrs.insert("Subtype".into(), PDFObject::Name("Form".into()));
    attrs.insert("BBox".into(), nums(&[0.0, 0.0, 50.0, 50.0]));
    if let Some(m) = matrix {
        attrs.insert("Matrix".into(), nums(m));
    }
    if let Some(r) = resources {
        attrs.insert("Resources".into(), PDFObject::Dict(r));
    }
    PDFObject::Stream(Box::new(PDFStream::new(attrs, content.as_bytes().to_vec())))
}

fn xobjects(entries: Vec<(&str, PDFObject)>) -> PDFDict {
    let table: PDFDict = entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    let mut res = PDFDict::new();
    res.insert("XObject".into(), PDFObject::Dict(table));
    res
}

// ============================================================================
// Page setup
// ============================================================================

#[test]
fn test_crop_box_becomes_initial_clip() {
    let mut p = page("");
    p.crop_box = Some((10.0, 10.0, 110.0, 60.0));
    let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::strict());
    interp.process_page(&p).unwrap();
    let clip = interp.graphicstate().clip.as_ref().unwrap();
    assert!(clip.is_clipping());
    assert_eq!(clip.bounding_rectangle(), Some((10.0, 10.0, 110.0, 60.0)));
}

#[test]
fn test_media_box_origin_moves_to_zero() {
    let p = PageInput::new((50.0, 50.0, 250.0, 150.0), "50 50 m 60 50 l S");
    let content = run(&p, InterpreterOptions::strict()).unwrap();
    assert_eq!(content.paths[0].bounding_rectangle(), Some((0.0, 0.0, 10.0, 0.0)));
}

#[test]
fn test_user_unit_scales_device_space() {
    let mut p = page("0 0 m 10 0 l S");
    p.user_unit = 2.0;
    let content = run(&p, InterpreterOptions::strict()).unwrap();
    assert_eq!(content.paths[0].bounding_rectangle(), Some((0.0, 0.0, 20.0, 0.0)));
    assert_eq!(content.paths[0].line_width, 2.0);
}

// ============================================================================
// Painting and clipping
// ============================================================================

#[test]
fn test_painted_paths_snapshot() {
    let content = run(
        &page("q 2 0 0 2 5 5 cm 0 0 10 5 re f Q 1 1 m 4 1 l 4 3 4 4 1 4 c h S"),
        InterpreterOptions::strict(),
    )
    .unwrap();
    let dump: Vec<String> = content.paths.iter().map(ToString::to_string).collect();
    insta::assert_snapshot!(dump.join("\n"), @r"
    M 5 5 L 25 5 L 25 15 L 5 15 L 5 5 Z
    M 1 1 L 4 1 C 4 3 4 4 1 4 Z
    ");
    assert!(content.paths[0].is_filled());
    assert!(!content.paths[0].is_stroked());
    assert!(content.paths[1].is_stroked());
}

#[test]
fn test_clip_paths_trims_to_page() {
    let p = page("10 50 m 300 50 l S");
    let unclipped = run(&p, InterpreterOptions::strict()).unwrap();
    assert_eq!(unclipped.paths[0].bounding_rectangle(), Some((10.0, 50.0, 300.0, 50.0)));

    let clipped = run(&p, InterpreterOptions::strict().with_clip_paths(true)).unwrap();
    assert_eq!(clipped.paths[0].bounding_rectangle(), Some((10.0, 50.0, 200.0, 50.0)));
}

#[test]
fn test_clip_paths_drops_invisible_fill() {
    let content = run(
        &page("0 0 20 20 re W n 50 50 10 10 re f 5 5 10 10 re f"),
        InterpreterOptions::strict().with_clip_paths(true),
    )
    .unwrap();
    assert_eq!(content.paths.len(), 1);
    assert_eq!(content.paths[0].bounding_rectangle(), Some((5.0, 5.0, 15.0, 15.0)));
}

#[test]
fn test_stroke_attributes_follow_ctm() {
    let content = run(
        &page("3 0 0 3 0 0 cm 2 w [1 2] 0 d 1 J 1 0 0 RG 0 0 m 10 0 l S"),
        InterpreterOptions::strict(),
    )
    .unwrap();
    let path = &content.paths[0];
    assert_eq!(path.line_width, 6.0);
    assert_eq!(path.dash_pattern.as_ref().map(|d| d.array.clone()), Some(vec![3.0, 6.0]));
    assert_eq!(path.stroke_color, Some(Color::Rgb(1.0, 0.0, 0.0)));
    assert_eq!(path.fill_color, None);
}

// ============================================================================
// Form XObjects
// ============================================================================

#[test]
fn test_form_runs_with_matrix_and_inherited_resources() {
    let mut resolver = MemoryResolver::new();
    let inner = resolver.insert(11, form("0 0 m 10 0 l S", None, None));
    let outer = resolver.insert(
        10,
        form("/Inner Do", Some(&[1.0, 0.0, 0.0, 1.0, 100.0, 20.0]), None),
    );
    let res = xobjects(vec![("Outer", PDFObject::Ref(outer)), ("Inner", PDFObject::Ref(inner))]);
    let p = page("/Outer Do 0 0 m 1 1 l S").with_resources(res);

    let mut interp = PDFPageInterpreter::new(&resolver, InterpreterOptions::strict());
    let content = interp.process_page(&p).unwrap();
    assert_eq!(content.paths.len(), 2);
    assert_eq!(content.paths[0].bounding_rectangle(), Some((100.0, 20.0, 110.0, 20.0)));
    // page state is back after the form
    assert_eq!(content.paths[1].bounding_rectangle(), Some((0.0, 0.0, 1.0, 1.0)));
    assert_eq!(interp.gstack_depth(), 0);
}

#[test]
fn test_form_own_resources_shadow_page() {
    let mut colors = PDFDict::new();
    colors.insert(
        "CS0".into(),
        PDFObject::Array(vec![
            PDFObject::Name("Indexed".into()),
            PDFObject::Name("DeviceRGB".into()),
            PDFObject::Int(0),
            PDFObject::String(vec![0, 0, 255]),
        ]),
    );
    let mut form_res = PDFDict::new();
    form_res.insert("ColorSpace".into(), PDFObject::Dict(colors));
    let res = xobjects(vec![("Fm", form("/CS0 cs 0 sc 0 0 5 5 re f", None, Some(form_res)))]);
    let p = page("/Fm Do /CS0 cs").with_resources(res);

    let mut interp = PDFPageInterpreter::new(&NoResolver, InterpreterOptions::default());
    let content = interp.process_page(&p).unwrap();
    assert_eq!(content.paths[0].fill_color, Some(Color::Rgb(0.0, 0.0, 1.0)));
    // the form's ColorSpace table is gone once the form returns
    assert_eq!(content.diagnostics.len(), 1);
    assert!(content.diagnostics[0].message.contains("CS0"));
}

#[test]
fn test_form_depth_limit() {
    let mut resolver = MemoryResolver::new();
    let deep = resolver.insert(3, form("0 0 m 1 0 l S", None, None));
    let mid = resolver.insert(2, form("/C Do", None, None));
    let top = resolver.insert(1, form("/B Do", None, None));
    let res = xobjects(vec![
        ("A", PDFObject::Ref(top)),
        ("B", PDFObject::Ref(mid)),
        ("C", PDFObject::Ref(deep)),
    ]);
    let p = page("/A Do").with_resources(res);

    let mut options = InterpreterOptions::strict();
    options.max_form_depth = 2;
    let err = PDFPageInterpreter::new(&resolver, options.clone())
        .process_page(&p)
        .unwrap_err();
    assert!(matches!(err, PdfError::DocumentFormat(_)));

    options.max_form_depth = 3;
    let content = PDFPageInterpreter::new(&resolver, options).process_page(&p).unwrap();
    assert_eq!(content.paths.len(), 1);
}

// ============================================================================
// Shadings
// ============================================================================

/// Axial red-to-blue shading with the given BBox.
fn axial_shading(bbox: &[f64]) -> PDFDict {
    let mut function = PDFDict::new();
    function.insert("FunctionType".into(), PDFObject::Int(2));
    function.insert("Domain".into(), nums(&[0.0, 1.0]));
    function.insert("C0".into(), nums(&[1.0, 0.0, 0.0]));
    function.insert("C1".into(), nums(&[0.0, 0.0, 1.0]));
    function.insert("N".into(), PDFObject::Int(1));
    let mut shading = PDFDict::new();
    shading.insert("ShadingType".into(), PDFObject::Int(2));
    shading.insert("ColorSpace".into(), PDFObject::Name("DeviceRGB".into()));
    shading.insert("Coords".into(), nums(&[0.0, 0.0, 100.0, 0.0]));
    shading.insert("Function".into(), PDFObject::Dict(function));
    shading.insert("BBox".into(), nums(bbox));
    let mut table = PDFDict::new();
    table.insert("Sh0".into(), PDFObject::Dict(shading));
    let mut res = PDFDict::new();
    res.insert("Shading".into(), PDFObject::Dict(table));
    res
}

#[test]
fn test_sh_records_region_and_end_colors() {
    let p = page("/Sh0 sh").with_resources(axial_shading(&[0.0, 0.0, 50.0, 50.0]));
    let content = run(&p, InterpreterOptions::strict()).unwrap();
    assert_eq!(content.shading_fills.len(), 1);
    let fill = &content.shading_fills[0];
    assert_eq!(fill.name, "Sh0");
    let region = fill.region.as_ref().unwrap();
    assert_eq!(region.bounding_rectangle(), Some((0.0, 0.0, 50.0, 50.0)));
    assert_eq!(
        fill.end_colors,
        Some((RgbColor::new(1.0, 0.0, 0.0), RgbColor::new(0.0, 0.0, 1.0)))
    );
}

#[test]
fn test_sh_outside_clip_paints_nothing() {
    let p = page("/Sh0 sh").with_resources(axial_shading(&[300.0, 300.0, 400.0, 400.0]));
    let content = run(&p, InterpreterOptions::strict()).unwrap();
    assert!(content.shading_fills.is_empty());
}

// ============================================================================
// Marked content and text
// ============================================================================

#[test]
fn test_marked_content_collects_page_objects() {
    let content = run(
        &page("/P <</MCID 0>> BDC 0 0 5 5 re f /Span BMC 1 1 m 2 2 l S EMC EMC /Artifact MP"),
        InterpreterOptions::strict(),
    )
    .unwrap();
    assert_eq!(content.marked_content.len(), 2);
    let p = &content.marked_content[0];
    assert_eq!(p.tag, "P");
    assert_eq!(p.mcid, Some(0));
    assert_eq!(p.paths, vec![0, 1]);
    assert_eq!(p.children.len(), 1);
    assert_eq!(p.children[0].tag, "Span");
    assert_eq!(p.children[0].paths, vec![1]);
    assert!(content.marked_content[1].is_point);
}

#[test]
fn test_text_through_page() {
    let mut font = PDFDict::new();
    font.insert("BaseFont".into(), PDFObject::Name("Fixed".into()));
    font.insert("FirstChar".into(), PDFObject::Int(65));
    font.insert("Widths".into(), PDFObject::Array(vec![PDFObject::Int(600); 26]));
    let mut fonts = PDFDict::new();
    fonts.insert("F1".into(), PDFObject::Dict(font));
    let mut res = PDFDict::new();
    res.insert("Font".into(), PDFObject::Dict(fonts));
    let p = page("BT /F1 10 Tf 20 50 Td (AB) Tj 12 TL (C) ' ET").with_resources(res);

    let manager = Arc::new(PDFResourceManager::new());
    let mut interp = PDFPageInterpreter::with_letter_source(
        &NoResolver,
        manager,
        WidthsLetterSource::new(),
        InterpreterOptions::strict(),
    );
    let content = interp.process_page(&p).unwrap();
    assert_eq!(content.text(), "ABC");
    assert_eq!(content.letters[1].origin, (26.0, 50.0));
    assert_eq!(content.letters[2].origin, (20.0, 38.0));
    assert_eq!(content.letters[0].font_name.as_deref(), Some("Fixed"));
}

// ============================================================================
// Error policy
// ============================================================================

#[test]
fn test_lenient_records_diagnostics() {
    let p = page("1 0 0 RG /Missing gs 5 m 0 0 m 10 0 l S");
    let content = run(&p, InterpreterOptions::default()).unwrap();
    let ops: Vec<&str> = content.diagnostics.iter().map(|d| d.operator.as_str()).collect();
    assert_eq!(ops, vec!["gs", "m"]);
    assert_eq!(content.paths.len(), 1);
    assert_eq!(content.paths[0].stroke_color, Some(Color::Rgb(1.0, 0.0, 0.0)));
}

#[test]
fn test_strict_stops_at_first_error() {
    let err = run(&page("/Missing gs 0 0 m 10 0 l S"), InterpreterOptions::strict()).unwrap_err();
    assert!(matches!(err, PdfError::KeyError(_)));
}

#[test]
fn test_unknown_operator_inside_compatibility_section() {
    let p = page("BX 1 2 frob EX 0 0 m 1 0 l S");
    let content = run(&p, InterpreterOptions::strict()).unwrap();
    assert_eq!(content.paths.len(), 1);
    assert!(run(&page("frob"), InterpreterOptions::strict()).is_err());
}
