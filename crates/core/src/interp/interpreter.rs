//! Page interpreter - the content-stream state machine.
//!
//! `PDFPageInterpreter` owns the graphics state stack, the resource scope
//! stack and the path under construction for one run. Operators are
//! implemented in `ops/*` as `do_*` methods grouped by category; this file
//! holds the state, the token loop and operator dispatch.

use std::sync::Arc;

use super::device::{LetterSource, NoLetters, TextSeq, TextSeqItem};
use super::params::InterpreterOptions;
use super::resources::{PDFResourceManager, ResourceStack};
use crate::error::{PdfError, Result};
use crate::model::content::{Diagnostic, ImageRecord, Letter, MarkedContent, PageContent};
use crate::model::objects::{ObjectResolver, PDFDict, PDFObjRef};
use crate::model::page::PageInput;
use crate::model::path::{FillingRule, Path};
use crate::model::state::{PDFGraphicState, PDFTextState};
use crate::parser::{ContentToken, Keyword, PDFContentParser, PSToken};
use crate::utils::{MATRIX_IDENTITY, Matrix, Point, Rect, apply_matrix_pt};

/// Saved graphics state for q/Q operators.
pub(crate) type SavedState = (Matrix, PDFTextState, PDFGraphicState);

/// PDF Page Interpreter - executes content stream operators.
///
/// Paths are built in device space: every point is mapped through the CTM
/// as it is added. Painted paths, letters, images and shading fills are
/// collected into a [`PageContent`].
///
/// Method names like `do_Q`, `do_S`, `do_B` use uppercase to match the
/// operator names (q/Q, s/S, b/B, etc.).
pub struct PDFPageInterpreter<'a, L: LetterSource = NoLetters> {
    pub(crate) options: InterpreterOptions,
    pub(crate) resolver: &'a dyn ObjectResolver,
    /// Resource scopes of the page and any forms being executed
    pub(crate) resources: ResourceStack,
    pub(crate) letters: L,
    /// Graphics state stack for q/Q operators
    pub(crate) gstack: Vec<SavedState>,
    /// Current transformation matrix
    pub(crate) ctm: Matrix,
    pub(crate) textstate: PDFTextState,
    pub(crate) graphicstate: PDFGraphicState,
    /// Current path being constructed, in device space
    pub(crate) curpath: Path,
    /// Rule recorded by W/W*, applied by the next painting operator
    pub(crate) pending_clip: Option<FillingRule>,
    /// Inside BT/ET
    pub(crate) in_text: bool,
    /// Nesting depth of BX/EX sections
    pub(crate) compat_depth: usize,
    /// Open marked-content elements, innermost last
    pub(crate) marked: Vec<MarkedContent>,
    /// Elements below this depth belong to an enclosing stream
    pub(crate) marked_floor: usize,
    /// Form XObjects being executed, to stop recursion
    pub(crate) form_stack: Vec<Option<PDFObjRef>>,
    pub(crate) output: PageContent,
}

impl<'a> PDFPageInterpreter<'a, NoLetters> {
    /// Interpreter that ignores text.
    pub fn new(resolver: &'a dyn ObjectResolver, options: InterpreterOptions) -> Self {
        let manager = Arc::new(PDFResourceManager::with_caching(options.caching));
        Self::with_letter_source(resolver, manager, NoLetters, options)
    }
}

#[allow(non_snake_case)]
impl<'a, L: LetterSource> PDFPageInterpreter<'a, L> {
    pub fn with_letter_source(
        resolver: &'a dyn ObjectResolver,
        manager: Arc<PDFResourceManager>,
        letters: L,
        options: InterpreterOptions,
    ) -> Self {
        Self {
            options,
            resolver,
            resources: ResourceStack::new(manager),
            letters,
            gstack: Vec::new(),
            ctm: MATRIX_IDENTITY,
            textstate: PDFTextState::new(),
            graphicstate: PDFGraphicState::new(),
            curpath: Path::new(),
            pending_clip: None,
            in_text: false,
            compat_depth: 0,
            marked: Vec::new(),
            marked_floor: 0,
            form_stack: Vec::new(),
            output: PageContent::default(),
        }
    }

    /// Initialize graphics state for a new run.
    pub fn init_state(&mut self, ctm: Matrix) {
        self.gstack.clear();
        self.ctm = ctm;
        self.textstate = PDFTextState::new();
        self.graphicstate = PDFGraphicState::new();
        self.curpath = Path::new();
        self.pending_clip = None;
        self.in_text = false;
        self.compat_depth = 0;
    }

    pub const fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    pub const fn ctm(&self) -> Matrix {
        self.ctm
    }

    pub const fn graphicstate(&self) -> &PDFGraphicState {
        &self.graphicstate
    }

    pub const fn textstate(&self) -> &PDFTextState {
        &self.textstate
    }

    /// Path under construction.
    pub const fn current_path(&self) -> &Path {
        &self.curpath
    }

    pub const fn resources(&self) -> &ResourceStack {
        &self.resources
    }

    /// Depth of the q/Q stack.
    pub fn gstack_depth(&self) -> usize {
        self.gstack.len()
    }

    pub(crate) fn get_current_state(&self) -> SavedState {
        (self.ctm, self.textstate.clone(), self.graphicstate.clone())
    }

    pub(crate) fn set_current_state(&mut self, state: SavedState) {
        let (ctm, textstate, graphicstate) = state;
        self.ctm = ctm;
        self.textstate = textstate;
        self.graphicstate = graphicstate;
    }

    // ========================================================================
    // Page Processing
    // ========================================================================

    /// Interpret a page and return what it painted.
    ///
    /// Sets up the CTM from the media box, rotation and UserUnit, clips to
    /// the crop box, and runs the content streams inside the page's
    /// resource scope.
    pub fn process_page(&mut self, page: &PageInput) -> Result<PageContent> {
        let ctm = page.ctm();
        self.init_state(ctm);
        self.graphicstate.clip = Some(page_clip(ctm, page.clip_box())?);

        let result = self.with_resources(Some(&page.resources), |interp| {
            interp.execute(&page.contents)
        });
        let content = self.finish();
        result.map(|()| content)
    }

    /// Execute content streams in the current state.
    ///
    /// Streams are lexed as one continuous stream, so an operator may
    /// straddle a stream boundary.
    pub fn execute<B: AsRef<[u8]>>(&mut self, streams: &[B]) -> Result<()> {
        if streams.is_empty() {
            return Ok(());
        }
        self.execute_tokens(PDFContentParser::new(streams))
    }

    /// Execute an already tokenized content stream.
    pub fn execute_tokens<I>(&mut self, tokens: I) -> Result<()>
    where
        I: IntoIterator<Item = ContentToken>,
    {
        let mut operand_stack: Vec<PSToken> = Vec::new();
        for token in tokens {
            match token {
                ContentToken::Operand(op) => operand_stack.push(op),
                ContentToken::Keyword(kw) => {
                    let result = self.dispatch_operator(&kw, &mut operand_stack);
                    operand_stack.clear();
                    self.settle(kw.as_str(), result)?;
                }
                ContentToken::InlineImage { dict, data } => {
                    operand_stack.clear();
                    let result = self.do_inline_image(dict, data);
                    self.settle("BI", result)?;
                }
            }
        }
        Ok(())
    }

    /// Take everything emitted so far, closing unterminated marked content.
    pub fn finish(&mut self) -> PageContent {
        if !self.marked.is_empty() {
            tracing::debug!(open = self.marked.len(), "closing unterminated marked content");
        }
        while !self.marked.is_empty() {
            self.close_marked_content();
        }
        std::mem::take(&mut self.output)
    }

    /// Run `f` inside a resource scope, popping it on every exit.
    pub(crate) fn with_resources<T>(
        &mut self,
        resources: Option<&PDFDict>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let Some(resources) = resources else {
            return f(self);
        };
        self.resources.push(resources, self.resolver);
        let result = f(self);
        self.resources.pop();
        result
    }

    /// Apply the error policy to an operator result.
    fn settle(&mut self, operator: &str, result: Result<()>) -> Result<()> {
        let Err(err) = result else {
            return Ok(());
        };
        if !self.options.lenient {
            return Err(err);
        }
        if err.is_recoverable() {
            tracing::debug!(operator, error = %err, "ignoring operator");
        } else {
            tracing::warn!(operator, error = %err, "skipping operator");
        }
        self.output.diagnostics.push(Diagnostic {
            operator: operator.to_string(),
            message: err.to_string(),
        });
        Ok(())
    }

    // ========================================================================
    // Output
    // ========================================================================

    pub(crate) fn emit_path(&mut self, path: Path) {
        let idx = self.output.paths.len();
        self.output.paths.push(path);
        for mc in &mut self.marked {
            mc.paths.push(idx);
        }
    }

    pub(crate) fn emit_letters(&mut self, letters: Vec<Letter>) {
        let start = self.output.letters.len();
        self.output.letters.extend(letters);
        let end = self.output.letters.len();
        for mc in &mut self.marked {
            mc.letters.extend(start..end);
        }
    }

    pub(crate) fn emit_image(&mut self, image: ImageRecord) {
        let idx = self.output.images.len();
        self.output.images.push(image);
        for mc in &mut self.marked {
            mc.images.push(idx);
        }
    }

    /// Pop the innermost marked-content element into its parent.
    pub(crate) fn close_marked_content(&mut self) -> bool {
        let Some(done) = self.marked.pop() else {
            return false;
        };
        match self.marked.last_mut() {
            Some(parent) => parent.children.push(done),
            None => self.output.marked_content.push(done),
        }
        true
    }

    #[inline]
    pub(crate) fn to_device(&self, x: f64, y: f64) -> Point {
        apply_matrix_pt(self.ctm, (x, y))
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Dispatch an operator to the appropriate do_* method.
    fn dispatch_operator(&mut self, op: &Keyword, args: &mut Vec<PSToken>) -> Result<()> {
        match op {
            // Graphics state operators
            Keyword::Qq => self.do_q(),
            Keyword::Q => self.do_Q(),
            Keyword::Cm => {
                let (a, b, c, d, e, f) = Self::pop_matrix(args)?;
                self.do_cm(a, b, c, d, e, f);
                Ok(())
            }
            Keyword::Ww => self.do_w(Self::pop_number(args)?),
            Keyword::J => self.do_J(Self::pop_int(args)?),
            Keyword::Jj => self.do_j(Self::pop_int(args)?),
            Keyword::M => self.do_M(Self::pop_number(args)?),
            Keyword::D => {
                let phase = Self::pop_number(args)?;
                let array = Self::pop_array(args)?;
                self.do_d(array, phase)
            }
            Keyword::Ri => {
                let intent = Self::pop_name(args)?;
                self.do_ri(&intent);
                Ok(())
            }
            Keyword::I => self.do_i(Self::pop_number(args)?),
            Keyword::Gs => {
                let name = Self::pop_name(args)?;
                self.do_gs(&name)
            }

            // Path construction
            Keyword::Mm => {
                let (x, y) = Self::pop_point(args)?;
                self.do_m(x, y)
            }
            Keyword::L => {
                let (x, y) = Self::pop_point(args)?;
                self.do_l(x, y)
            }
            Keyword::C => {
                let (x3, y3) = Self::pop_point(args)?;
                let (x2, y2) = Self::pop_point(args)?;
                let (x1, y1) = Self::pop_point(args)?;
                self.do_c(x1, y1, x2, y2, x3, y3)
            }
            Keyword::V => {
                let (x3, y3) = Self::pop_point(args)?;
                let (x2, y2) = Self::pop_point(args)?;
                self.do_v(x2, y2, x3, y3)
            }
            Keyword::Y => {
                let (x3, y3) = Self::pop_point(args)?;
                let (x1, y1) = Self::pop_point(args)?;
                self.do_y(x1, y1, x3, y3)
            }
            Keyword::H => self.do_h(),
            Keyword::Re => {
                let (w, h) = Self::pop_point(args)?;
                let (x, y) = Self::pop_point(args)?;
                self.do_re(x, y, w, h)
            }

            // Path painting
            Keyword::S => self.do_S(),
            Keyword::Ss => self.do_s(),
            Keyword::Ff | Keyword::F => self.do_f(),
            Keyword::FStar => self.do_f_star(),
            Keyword::B => self.do_B(),
            Keyword::BStar => self.do_B_star(),
            Keyword::Bb => self.do_b(),
            Keyword::BbStar => self.do_b_star(),
            Keyword::N => self.do_n(),

            // Clipping
            Keyword::WClip => {
                self.do_W();
                Ok(())
            }
            Keyword::WStar => {
                self.do_W_star();
                Ok(())
            }

            // Text objects and state
            Keyword::BT => {
                self.do_BT();
                Ok(())
            }
            Keyword::ET => {
                self.do_ET();
                Ok(())
            }
            Keyword::Tc => {
                self.do_Tc(Self::pop_number(args)?);
                Ok(())
            }
            Keyword::Tw => {
                self.do_Tw(Self::pop_number(args)?);
                Ok(())
            }
            Keyword::Tz => {
                self.do_Tz(Self::pop_number(args)?);
                Ok(())
            }
            Keyword::TL => {
                self.do_TL(Self::pop_number(args)?);
                Ok(())
            }
            Keyword::Tf => {
                let size = Self::pop_number(args)?;
                let name = Self::pop_name(args)?;
                self.do_Tf(&name, size)
            }
            Keyword::Tr => self.do_Tr(Self::pop_int(args)?),
            Keyword::Ts => {
                self.do_Ts(Self::pop_number(args)?);
                Ok(())
            }

            // Text positioning
            Keyword::Td => {
                let (tx, ty) = Self::pop_point(args)?;
                self.do_Td(tx, ty);
                Ok(())
            }
            Keyword::TD => {
                let (tx, ty) = Self::pop_point(args)?;
                self.do_TD(tx, ty);
                Ok(())
            }
            Keyword::Tm => {
                let (a, b, c, d, e, f) = Self::pop_matrix(args)?;
                self.do_Tm(a, b, c, d, e, f);
                Ok(())
            }
            Keyword::TStar => {
                self.do_T_star();
                Ok(())
            }

            // Text showing
            Keyword::Tj => {
                let s = Self::pop_string(args)?;
                self.do_Tj(&s);
                Ok(())
            }
            Keyword::TJ => {
                let seq = Self::pop_text_seq(args)?;
                self.do_TJ(&seq);
                Ok(())
            }
            Keyword::Quote => {
                let s = Self::pop_string(args)?;
                self.do_quote(&s);
                Ok(())
            }
            Keyword::DoubleQuote => {
                let s = Self::pop_string(args)?;
                let ac = Self::pop_number(args)?;
                let aw = Self::pop_number(args)?;
                self.do_doublequote(aw, ac, &s);
                Ok(())
            }

            // Type 3 glyph metrics carry no drawing
            Keyword::D0 | Keyword::D1 => Ok(()),

            // Color
            Keyword::CS => {
                let name = Self::pop_name(args)?;
                self.do_CS(&name)
            }
            Keyword::Cs => {
                let name = Self::pop_name(args)?;
                self.do_cs(&name)
            }
            Keyword::SC | Keyword::SCN => self.do_SCN(std::mem::take(args)),
            Keyword::Sc | Keyword::Scn => self.do_scn(std::mem::take(args)),
            Keyword::G => self.do_G(Self::pop_number(args)?),
            Keyword::Gg => self.do_g(Self::pop_number(args)?),
            Keyword::RG => {
                let b = Self::pop_number(args)?;
                let (r, g) = Self::pop_point(args)?;
                self.do_RG(r, g, b)
            }
            Keyword::Rg => {
                let b = Self::pop_number(args)?;
                let (r, g) = Self::pop_point(args)?;
                self.do_rg(r, g, b)
            }
            Keyword::K => {
                let (y, k) = Self::pop_point(args)?;
                let (c, m) = Self::pop_point(args)?;
                self.do_K(c, m, y, k)
            }
            Keyword::Kk => {
                let (y, k) = Self::pop_point(args)?;
                let (c, m) = Self::pop_point(args)?;
                self.do_k(c, m, y, k)
            }

            // Shading and XObjects
            Keyword::Sh => {
                let name = Self::pop_name(args)?;
                self.do_sh(&name)
            }
            Keyword::Do => {
                let name = Self::pop_name(args)?;
                self.do_Do(&name)
            }

            // Marked content
            Keyword::BMC => {
                let tag = Self::pop_name(args)?;
                self.do_BMC(&tag);
                Ok(())
            }
            Keyword::BDC => {
                let props = args.pop();
                let tag = Self::pop_name(args)?;
                self.do_BDC(&tag, props)
            }
            Keyword::EMC => self.do_EMC(),
            Keyword::MP => {
                let tag = Self::pop_name(args)?;
                self.do_MP(&tag);
                Ok(())
            }
            Keyword::DP => {
                let props = args.pop();
                let tag = Self::pop_name(args)?;
                self.do_DP(&tag, props)
            }

            // Compatibility sections
            Keyword::BX => {
                self.compat_depth += 1;
                Ok(())
            }
            Keyword::EX => {
                self.compat_depth = self.compat_depth.saturating_sub(1);
                Ok(())
            }

            // Inline images arrive whole from the parser
            Keyword::BI | Keyword::ID | Keyword::EI => {
                tracing::debug!(operator = op.as_str(), "stray inline image operator");
                Ok(())
            }

            Keyword::ArrayStart
            | Keyword::ArrayEnd
            | Keyword::DictStart
            | Keyword::DictEnd
            | Keyword::BraceOpen
            | Keyword::BraceClose
            | Keyword::Null => Ok(()),

            Keyword::Unknown(_) => {
                if self.compat_depth > 0 {
                    tracing::trace!(operator = op.as_str(), "unknown operator inside BX/EX");
                    Ok(())
                } else {
                    Err(PdfError::SyntaxError(format!("unknown operator {}", op.as_str())))
                }
            }
        }
    }

    // Helper functions to pop values from operand stack

    fn missing() -> PdfError {
        PdfError::SyntaxError("missing operand".into())
    }

    pub(crate) fn pop_number(args: &mut Vec<PSToken>) -> Result<f64> {
        let token = args.pop().ok_or_else(Self::missing)?;
        token.as_num().ok_or(PdfError::TypeError {
            expected: "number",
            got: token_type(&token),
        })
    }

    fn pop_int(args: &mut Vec<PSToken>) -> Result<i64> {
        match args.pop().ok_or_else(Self::missing)? {
            PSToken::Int(n) => Ok(n),
            PSToken::Real(n) => Ok(n.round() as i64),
            other => Err(PdfError::TypeError {
                expected: "integer",
                got: token_type(&other),
            }),
        }
    }

    fn pop_string(args: &mut Vec<PSToken>) -> Result<Vec<u8>> {
        match args.pop().ok_or_else(Self::missing)? {
            PSToken::String(s) => Ok(s),
            other => Err(PdfError::TypeError {
                expected: "string",
                got: token_type(&other),
            }),
        }
    }

    pub(crate) fn pop_name(args: &mut Vec<PSToken>) -> Result<String> {
        match args.pop().ok_or_else(Self::missing)? {
            PSToken::Literal(s) => Ok(s),
            other => Err(PdfError::TypeError {
                expected: "name",
                got: token_type(&other),
            }),
        }
    }

    fn pop_array(args: &mut Vec<PSToken>) -> Result<Vec<f64>> {
        match args.pop().ok_or_else(Self::missing)? {
            PSToken::Array(arr) => arr
                .iter()
                .map(|x| {
                    x.as_num().ok_or(PdfError::TypeError {
                        expected: "number",
                        got: token_type(x),
                    })
                })
                .collect(),
            other => Err(PdfError::TypeError {
                expected: "array",
                got: token_type(&other),
            }),
        }
    }

    fn pop_point(args: &mut Vec<PSToken>) -> Result<Point> {
        let y = Self::pop_number(args)?;
        let x = Self::pop_number(args)?;
        Ok((x, y))
    }

    fn pop_matrix(args: &mut Vec<PSToken>) -> Result<Matrix> {
        let (e, f) = Self::pop_point(args)?;
        let (c, d) = Self::pop_point(args)?;
        let (a, b) = Self::pop_point(args)?;
        Ok((a, b, c, d, e, f))
    }

    fn pop_text_seq(args: &mut Vec<PSToken>) -> Result<TextSeq> {
        match args.pop().ok_or_else(Self::missing)? {
            PSToken::Array(arr) => Ok(arr
                .into_iter()
                .filter_map(|item| match item {
                    PSToken::Int(n) => Some(TextSeqItem::Number(n as f64)),
                    PSToken::Real(n) => Some(TextSeqItem::Number(n)),
                    PSToken::String(s) => Some(TextSeqItem::Bytes(s)),
                    _ => None,
                })
                .collect()),
            other => Err(PdfError::TypeError {
                expected: "array",
                got: token_type(&other),
            }),
        }
    }
}

const fn token_type(token: &PSToken) -> &'static str {
    match token {
        PSToken::Int(_) => "int",
        PSToken::Real(_) => "real",
        PSToken::Bool(_) => "bool",
        PSToken::Literal(_) => "name",
        PSToken::Keyword(_) => "keyword",
        PSToken::String(_) => "string",
        PSToken::Array(_) => "array",
        PSToken::Dict(_) => "dict",
    }
}

/// Clipping path for the visible page area in device space.
pub(crate) fn page_clip(ctm: Matrix, rect: Rect) -> Result<Path> {
    let mut clip = rect_path(ctm, rect)?;
    clip.mark_as_clip(FillingRule::NonZeroWinding);
    Ok(clip)
}

/// Rectangle mapped through `ctm` as a closed polygon.
pub(crate) fn rect_path(ctm: Matrix, rect: Rect) -> Result<Path> {
    let (x0, y0, x1, y1) = rect;
    let mut path = Path::new();
    path.polygon(&[
        apply_matrix_pt(ctm, (x0, y0)),
        apply_matrix_pt(ctm, (x1, y0)),
        apply_matrix_pt(ctm, (x1, y1)),
        apply_matrix_pt(ctm, (x0, y1)),
    ])?;
    Ok(path)
}
