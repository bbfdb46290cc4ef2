//! Page interpretation entry points.
//!
//! - `interpret_page()` - One page, text ignored
//! - `interpret_page_with()` - One page with a letter source and a shared manager
//! - `interpret_pages()` / `interpret_pages_with()` - Many pages on the rayon pool

use std::sync::Arc;

use rayon::prelude::*;

use crate::error::Result;
use crate::interp::{
    InterpreterOptions, LetterSource, NoLetters, PDFPageInterpreter, PDFResourceManager,
};
use crate::model::content::PageContent;
use crate::model::objects::ObjectResolver;
use crate::model::page::PageInput;

/// Interpret one page, discarding text.
pub fn interpret_page(
    page: &PageInput,
    resolver: &dyn ObjectResolver,
    options: &InterpreterOptions,
) -> Result<PageContent> {
    let manager = Arc::new(PDFResourceManager::with_caching(options.caching));
    interpret_page_with(page, resolver, manager, NoLetters, options)
}

/// Interpret one page with a letter source.
///
/// Pages of one document should share `manager` so fonts, color spaces and
/// shadings behind references are resolved once.
pub fn interpret_page_with<L: LetterSource>(
    page: &PageInput,
    resolver: &dyn ObjectResolver,
    manager: Arc<PDFResourceManager>,
    letters: L,
    options: &InterpreterOptions,
) -> Result<PageContent> {
    let mut interpreter =
        PDFPageInterpreter::with_letter_source(resolver, manager, letters, options.clone());
    interpreter.process_page(page)
}

/// Interpret pages in parallel, discarding text.
///
/// Results are in page order; a failing page does not affect the others.
pub fn interpret_pages<R>(
    pages: &[PageInput],
    resolver: &R,
    options: &InterpreterOptions,
) -> Vec<Result<PageContent>>
where
    R: ObjectResolver + Sync,
{
    interpret_pages_with(pages, resolver, options, || NoLetters)
}

/// Interpret pages in parallel with one letter source per worker thread.
pub fn interpret_pages_with<R, L, F>(
    pages: &[PageInput],
    resolver: &R,
    options: &InterpreterOptions,
    make_letters: F,
) -> Vec<Result<PageContent>>
where
    R: ObjectResolver + Sync,
    L: LetterSource,
    F: Fn() -> L + Sync + Send,
{
    let manager = Arc::new(PDFResourceManager::with_caching(options.caching));
    pages
        .par_iter()
        .enumerate()
        .map_init(&make_letters, |letters, (page_idx, page)| {
            tracing::trace!(page = page_idx, "interpreting page");
            let result = interpret_page_with(page, resolver, Arc::clone(&manager), &mut *letters, options);
            if let Err(err) = &result {
                tracing::warn!(page = page_idx, error = %err, "page interpretation failed");
            }
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::objects::NoResolver;

    #[test]
    fn test_interpret_page_applies_page_ctm() {
        let page = PageInput::new((0.0, 0.0, 100.0, 200.0), &b"0 0 m 10 0 l S"[..]).with_rotation(90);
        let content = interpret_page(&page, &NoResolver, &InterpreterOptions::default()).unwrap();
        assert_eq!(content.paths[0].bounding_rectangle(), Some((0.0, 90.0, 0.0, 100.0)));
    }

    #[test]
    fn test_interpret_pages_keeps_order_and_isolates_errors() {
        let pages: Vec<PageInput> = (1..=8)
            .map(|i| {
                let ops = if i == 3 {
                    "Q".to_string()
                } else {
                    format!("0 0 {i} {i} re f")
                };
                PageInput::new((0.0, 0.0, 100.0, 100.0), ops.into_bytes())
            })
            .collect();
        let results = interpret_pages(&pages, &NoResolver, &InterpreterOptions::strict());
        assert_eq!(results.len(), 8);
        assert!(results[2].is_err());
        let side = |idx: usize| {
            let content = results[idx].as_ref().unwrap();
            content.paths[0].bounding_rectangle().map(|r| r.2)
        };
        assert_eq!(side(0), Some(1.0));
        assert_eq!(side(7), Some(8.0));
    }
}
