//! Content stream tokenizer and operand grouper.
//!
//! `ContentLexer` splits raw bytes into [`PSToken`]s. `PDFContentParser`
//! builds arrays and dictionaries from them, groups operands with their
//! operator and cuts inline image data out of the byte stream.

use std::collections::{HashMap, VecDeque};

use bytes::{Bytes, BytesMut};

use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject};

/// Content stream operators. Lowercase variants of letters that also exist
/// in uppercase carry a doubled name (`q` is `Qq`, `w` is `Ww`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Structural
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    BraceOpen,
    BraceClose,
    Null,

    // General graphics state
    Qq, // q (save)
    Q,  // Q (restore)
    Cm,
    Ww, // w
    J,
    Jj, // j
    M,
    D,
    Ri,
    I,
    Gs,

    // Path construction
    Mm, // m
    L,
    C,
    V,
    Y,
    H,
    Re,

    // Path painting
    S,
    Ss, // s
    F,
    Ff, // f
    FStar,
    B,
    BStar,
    Bb, // b
    BbStar,
    N,

    // Clipping
    WClip,
    WStar,

    // Text
    BT,
    ET,
    Tc,
    Tw,
    Tz,
    TL,
    Tf,
    Tr,
    Ts,
    Td,
    TD,
    Tm,
    TStar,
    Tj,
    TJ,
    Quote,
    DoubleQuote,

    // Type 3 glyph metrics
    D0,
    D1,

    // Color
    CS,
    Cs,
    SC,
    SCN,
    Sc,
    Scn,
    G,
    Gg,
    RG,
    Rg,
    K,
    Kk,

    // Shading, XObjects, inline images
    Sh,
    Do,
    BI,
    ID,
    EI,

    // Marked content
    MP,
    DP,
    BMC,
    BDC,
    EMC,

    // Compatibility
    BX,
    EX,

    Unknown(Vec<u8>),
}

impl Keyword {
    pub fn from_bytes(b: &[u8]) -> Self {
        match b {
            b"[" => Self::ArrayStart,
            b"]" => Self::ArrayEnd,
            b"<<" => Self::DictStart,
            b">>" => Self::DictEnd,
            b"{" => Self::BraceOpen,
            b"}" => Self::BraceClose,
            b"null" => Self::Null,

            b"q" => Self::Qq,
            b"Q" => Self::Q,
            b"cm" => Self::Cm,
            b"w" => Self::Ww,
            b"J" => Self::J,
            b"j" => Self::Jj,
            b"M" => Self::M,
            b"d" => Self::D,
            b"ri" => Self::Ri,
            b"i" => Self::I,
            b"gs" => Self::Gs,

            b"m" => Self::Mm,
            b"l" => Self::L,
            b"c" => Self::C,
            b"v" => Self::V,
            b"y" => Self::Y,
            b"h" => Self::H,
            b"re" => Self::Re,

            b"S" => Self::S,
            b"s" => Self::Ss,
            b"F" => Self::F,
            b"f" => Self::Ff,
            b"f*" => Self::FStar,
            b"B" => Self::B,
            b"B*" => Self::BStar,
            b"b" => Self::Bb,
            b"b*" => Self::BbStar,
            b"n" => Self::N,

            b"W" => Self::WClip,
            b"W*" => Self::WStar,

            b"BT" => Self::BT,
            b"ET" => Self::ET,
            b"Tc" => Self::Tc,
            b"Tw" => Self::Tw,
            b"Tz" => Self::Tz,
            b"TL" => Self::TL,
            b"Tf" => Self::Tf,
            b"Tr" => Self::Tr,
            b"Ts" => Self::Ts,
            b"Td" => Self::Td,
            b"TD" => Self::TD,
            b"Tm" => Self::Tm,
            b"T*" => Self::TStar,
            b"Tj" => Self::Tj,
            b"TJ" => Self::TJ,
            b"'" => Self::Quote,
            b"\"" => Self::DoubleQuote,

            b"d0" => Self::D0,
            b"d1" => Self::D1,

            b"CS" => Self::CS,
            b"cs" => Self::Cs,
            b"SC" => Self::SC,
            b"SCN" => Self::SCN,
            b"sc" => Self::Sc,
            b"scn" => Self::Scn,
            b"G" => Self::G,
            b"g" => Self::Gg,
            b"RG" => Self::RG,
            b"rg" => Self::Rg,
            b"K" => Self::K,
            b"k" => Self::Kk,

            b"sh" => Self::Sh,
            b"Do" => Self::Do,
            b"BI" => Self::BI,
            b"ID" => Self::ID,
            b"EI" => Self::EI,

            b"MP" => Self::MP,
            b"DP" => Self::DP,
            b"BMC" => Self::BMC,
            b"BDC" => Self::BDC,
            b"EMC" => Self::EMC,

            b"BX" => Self::BX,
            b"EX" => Self::EX,

            other => Self::Unknown(other.to_vec()),
        }
    }

    /// Operator text as it appears in the content stream.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ArrayStart => "[",
            Self::ArrayEnd => "]",
            Self::DictStart => "<<",
            Self::DictEnd => ">>",
            Self::BraceOpen => "{",
            Self::BraceClose => "}",
            Self::Null => "null",
            Self::Qq => "q",
            Self::Q => "Q",
            Self::Cm => "cm",
            Self::Ww => "w",
            Self::J => "J",
            Self::Jj => "j",
            Self::M => "M",
            Self::D => "d",
            Self::Ri => "ri",
            Self::I => "i",
            Self::Gs => "gs",
            Self::Mm => "m",
            Self::L => "l",
            Self::C => "c",
            Self::V => "v",
            Self::Y => "y",
            Self::H => "h",
            Self::Re => "re",
            Self::S => "S",
            Self::Ss => "s",
            Self::F => "F",
            Self::Ff => "f",
            Self::FStar => "f*",
            Self::B => "B",
            Self::BStar => "B*",
            Self::Bb => "b",
            Self::BbStar => "b*",
            Self::N => "n",
            Self::WClip => "W",
            Self::WStar => "W*",
            Self::BT => "BT",
            Self::ET => "ET",
            Self::Tc => "Tc",
            Self::Tw => "Tw",
            Self::Tz => "Tz",
            Self::TL => "TL",
            Self::Tf => "Tf",
            Self::Tr => "Tr",
            Self::Ts => "Ts",
            Self::Td => "Td",
            Self::TD => "TD",
            Self::Tm => "Tm",
            Self::TStar => "T*",
            Self::Tj => "Tj",
            Self::TJ => "TJ",
            Self::Quote => "'",
            Self::DoubleQuote => "\"",
            Self::D0 => "d0",
            Self::D1 => "d1",
            Self::CS => "CS",
            Self::Cs => "cs",
            Self::SC => "SC",
            Self::SCN => "SCN",
            Self::Sc => "sc",
            Self::Scn => "scn",
            Self::G => "G",
            Self::Gg => "g",
            Self::RG => "RG",
            Self::Rg => "rg",
            Self::K => "K",
            Self::Kk => "k",
            Self::Sh => "sh",
            Self::Do => "Do",
            Self::BI => "BI",
            Self::ID => "ID",
            Self::EI => "EI",
            Self::MP => "MP",
            Self::DP => "DP",
            Self::BMC => "BMC",
            Self::BDC => "BDC",
            Self::EMC => "EMC",
            Self::BX => "BX",
            Self::EX => "EX",
            Self::Unknown(b) => std::str::from_utf8(b).unwrap_or("?"),
        }
    }
}

/// A content stream token.
#[derive(Debug, Clone, PartialEq)]
pub enum PSToken {
    Int(i64),
    Real(f64),
    Bool(bool),
    /// Name object without the leading slash
    Literal(String),
    Keyword(Keyword),
    /// Literal or hex string bytes
    String(Vec<u8>),
    Array(Vec<PSToken>),
    Dict(HashMap<String, PSToken>),
}

impl PSToken {
    /// Convert an operand to a PDF object. Keywords other than `null`
    /// have no object form.
    pub fn to_object(&self) -> Option<PDFObject> {
        Some(match self {
            Self::Int(i) => PDFObject::Int(*i),
            Self::Real(r) => PDFObject::Real(*r),
            Self::Bool(b) => PDFObject::Bool(*b),
            Self::Literal(n) => PDFObject::Name(n.clone()),
            Self::String(s) => PDFObject::String(s.clone()),
            Self::Array(items) => {
                PDFObject::Array(items.iter().filter_map(Self::to_object).collect())
            }
            Self::Dict(d) => PDFObject::Dict(
                d.iter()
                    .filter_map(|(k, v)| v.to_object().map(|o| (k.clone(), o)))
                    .collect::<PDFDict>(),
            ),
            Self::Keyword(Keyword::Null) => PDFObject::Null,
            Self::Keyword(_) => return None,
        })
    }

    pub const fn as_num(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }
}

/// Token types produced by [`PDFContentParser`].
#[derive(Debug, Clone, PartialEq)]
pub enum ContentToken {
    /// An operand (number, string, array, dict, name)
    Operand(PSToken),
    /// An operator
    Keyword(Keyword),
    /// An inline image: BI dictionary and the raw bytes between ID and EI
    InlineImage { dict: PDFDict, data: Bytes },
}

// ============================================================================
// Lexer
// ============================================================================

/// Byte-level tokenizer over concatenated content streams.
pub struct ContentLexer {
    data: Bytes,
    pos: usize,
}

impl ContentLexer {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Concatenate several content streams, separated by whitespace.
    pub fn from_streams<I, B>(streams: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut buf = BytesMut::new();
        for (i, s) in streams.into_iter().enumerate() {
            if i > 0 {
                buf.extend_from_slice(b"\n");
            }
            buf.extend_from_slice(s.as_ref());
        }
        Self::new(buf.freeze())
    }

    pub const fn tell(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn advance_one(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Next token and its byte offset, `None` at end of input.
    pub fn next_token(&mut self) -> Option<Result<(usize, PSToken)>> {
        self.skip_whitespace();
        let token_pos = self.pos;
        let b = self.peek()?;

        let result = match b {
            b'/' => Ok(self.parse_literal()),
            b'(' => self.parse_string(),
            b'<' => {
                if self.peek_at(1) == Some(b'<') {
                    self.pos += 2;
                    Ok(PSToken::Keyword(Keyword::DictStart))
                } else {
                    self.parse_hex_string()
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'>') {
                    self.pos += 2;
                    Ok(PSToken::Keyword(Keyword::DictEnd))
                } else {
                    self.pos += 1;
                    Ok(PSToken::Keyword(Keyword::Unknown(b">".to_vec())))
                }
            }
            b'[' | b']' | b'{' | b'}' => {
                self.pos += 1;
                Ok(PSToken::Keyword(Keyword::from_bytes(&[b])))
            }
            b')' => {
                self.pos += 1;
                Err(PdfError::TokenError {
                    pos: token_pos,
                    msg: "unbalanced ')'".into(),
                })
            }
            b'+' | b'-' if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit() || c == b'.') => {
                self.parse_number(token_pos)
            }
            b'.' if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) => {
                self.parse_number(token_pos)
            }
            c if c.is_ascii_digit() => self.parse_number(token_pos),
            _ => Ok(self.parse_keyword()),
        };

        Some(result.map(|token| (token_pos, token)))
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'%' {
                while let Some(c) = self.advance_one() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                }
            } else if is_whitespace(b) {
                self.pos += 1;
            } else {
                return;
            }
        }
    }

    fn parse_literal(&mut self) -> PSToken {
        self.pos += 1; // '/'
        let mut name = Vec::with_capacity(16);
        while let Some(b) = self.peek() {
            if is_keyword_end(b) {
                break;
            }
            if b == b'#'
                && let (Some(h1), Some(h2)) = (
                    self.peek_at(1).and_then(hex_value),
                    self.peek_at(2).and_then(hex_value),
                )
            {
                self.pos += 3;
                name.push((h1 << 4) | h2);
                continue;
            }
            name.push(b);
            self.pos += 1;
        }
        PSToken::Literal(String::from_utf8_lossy(&name).into_owned())
    }

    fn parse_number(&mut self, start_pos: usize) -> Result<PSToken> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut has_digit = false;
        let mut has_dot = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => has_digit = true,
                b'.' if !has_dot => has_dot = true,
                // Some producers emit "1.5-2" or doubled signs; stop at them.
                _ => break,
            }
            self.pos += 1;
        }
        if !has_digit {
            return Err(PdfError::TokenError {
                pos: start_pos,
                msg: "invalid number".into(),
            });
        }
        let text = std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| {
            PdfError::TokenError {
                pos: start_pos,
                msg: "invalid number".into(),
            }
        })?;
        if has_dot {
            text.parse::<f64>().map(PSToken::Real).map_err(|_| PdfError::TokenError {
                pos: start_pos,
                msg: format!("invalid real {text:?}"),
            })
        } else {
            // Integers too large for i64 degrade to reals.
            Ok(text
                .parse::<i64>()
                .map(PSToken::Int)
                .unwrap_or_else(|_| PSToken::Real(text.parse::<f64>().unwrap_or(0.0))))
        }
    }

    fn parse_string(&mut self) -> Result<PSToken> {
        self.pos += 1; // '('
        let mut result = Vec::with_capacity(32);
        let mut depth = 1;

        while depth > 0 {
            match self.advance_one() {
                Some(b'(') => {
                    depth += 1;
                    result.push(b'(');
                }
                Some(b')') => {
                    depth -= 1;
                    if depth > 0 {
                        result.push(b')');
                    }
                }
                Some(b'\\') => match self.advance_one() {
                    Some(b'n') => result.push(b'\n'),
                    Some(b'r') => result.push(b'\r'),
                    Some(b't') => result.push(b'\t'),
                    Some(b'b') => result.push(0x08),
                    Some(b'f') => result.push(0x0c),
                    Some(b'\r') => {
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                    }
                    Some(b'\n') => {}
                    Some(c @ b'0'..=b'7') => {
                        let mut octal = u32::from(c - b'0');
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d @ b'0'..=b'7') => {
                                    self.pos += 1;
                                    octal = octal * 8 + u32::from(d - b'0');
                                }
                                _ => break,
                            }
                        }
                        result.push((octal & 0xFF) as u8);
                    }
                    Some(c) => result.push(c),
                    None => return Err(PdfError::UnexpectedEof),
                },
                Some(c) => result.push(c),
                None => return Err(PdfError::UnexpectedEof),
            }
        }
        Ok(PSToken::String(result))
    }

    fn parse_hex_string(&mut self) -> Result<PSToken> {
        self.pos += 1; // '<'
        let mut result = Vec::new();
        let mut pending: Option<u8> = None;
        loop {
            match self.advance_one() {
                Some(b'>') => break,
                Some(c) if c.is_ascii_hexdigit() => {
                    let nibble = hex_value(c).unwrap_or(0);
                    match pending.take() {
                        Some(high) => result.push((high << 4) | nibble),
                        None => pending = Some(nibble),
                    }
                }
                Some(c) if is_whitespace(c) => {}
                Some(c) => {
                    return Err(PdfError::TokenError {
                        pos: self.pos - 1,
                        msg: format!("invalid hex digit {:?}", c as char),
                    });
                }
                None => return Err(PdfError::UnexpectedEof),
            }
        }
        // An odd final digit is followed by an implicit 0.
        if let Some(high) = pending {
            result.push(high << 4);
        }
        Ok(PSToken::String(result))
    }

    fn parse_keyword(&mut self) -> PSToken {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_keyword_end(b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            // Lone delimiter such as ')' handled elsewhere; always make progress.
            self.pos += 1;
        }
        match &self.data[start..self.pos] {
            b"true" => PSToken::Bool(true),
            b"false" => PSToken::Bool(false),
            bytes => PSToken::Keyword(Keyword::from_bytes(bytes)),
        }
    }

    /// Raw bytes up to the `EI` that ends an inline image.
    ///
    /// `EI` counts only when surrounded by whitespace (or end of input).
    /// With a known data length the search starts after that many bytes.
    fn read_inline_data(&mut self, known_len: Option<usize>) -> Bytes {
        // One whitespace byte separates ID from the data.
        if matches!(self.peek(), Some(b) if is_whitespace(b)) {
            self.pos += 1;
        }
        let start = self.pos;
        let search_from = known_len
            .map(|n| (start + n).min(self.data.len()))
            .unwrap_or(start);

        let mut i = search_from;
        while i + 1 < self.data.len() {
            if &self.data[i..i + 2] == b"EI"
                && (i == start || is_whitespace(self.data[i - 1]))
                && self.data.get(i + 2).is_none_or(|&b| is_whitespace(b))
            {
                let mut end = i;
                if end > start && is_whitespace(self.data[end - 1]) && known_len.is_none() {
                    end -= 1;
                }
                let data = self.data.slice(start..end.max(start));
                self.pos = i + 2;
                return data;
            }
            i += 1;
        }
        let data = self.data.slice(start..);
        self.pos = self.data.len();
        data
    }
}

// ============================================================================
// Content parser
// ============================================================================

/// Context frame for array/dict construction.
#[derive(Debug)]
enum Context {
    Array(usize, Vec<PSToken>),
    Dict(usize, Vec<PSToken>),
}

/// Parser for PDF content streams.
///
/// Operands precede their operator; each call yields operands in order and
/// then the operator. Inline images (BI/ID/EI) come out as a single
/// [`ContentToken::InlineImage`].
pub struct PDFContentParser {
    lexer: ContentLexer,
    pending: VecDeque<(usize, ContentToken)>,
    operand_stack: Vec<(usize, PSToken)>,
    context_stack: Vec<Context>,
    in_inline_dict: bool,
}

impl PDFContentParser {
    /// Create a parser over one or more content streams.
    pub fn new<I, B>(streams: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self {
            lexer: ContentLexer::from_streams(streams),
            pending: VecDeque::new(),
            operand_stack: Vec::new(),
            context_stack: Vec::new(),
            in_inline_dict: false,
        }
    }

    /// Next token with its byte offset.
    pub fn next_with_pos(&mut self) -> Option<(usize, ContentToken)> {
        if let Some(tok) = self.pending.pop_front() {
            return Some(tok);
        }

        loop {
            let (pos, token) = match self.lexer.next_token() {
                Some(Ok(t)) => t,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "skipping bad content token");
                    continue;
                }
                None => {
                    // Unclosed arrays/dicts are dropped, stray operands flushed.
                    self.context_stack.clear();
                    self.pending.extend(
                        self.operand_stack
                            .drain(..)
                            .map(|(p, op)| (p, ContentToken::Operand(op))),
                    );
                    return self.pending.pop_front();
                }
            };

            let kw = match token {
                PSToken::Keyword(kw) => kw,
                other => {
                    self.push_operand(pos, other);
                    continue;
                }
            };

            match kw {
                Keyword::ArrayStart => {
                    self.context_stack.push(Context::Array(pos, Vec::new()));
                }
                Keyword::DictStart => {
                    self.context_stack.push(Context::Dict(pos, Vec::new()));
                }
                Keyword::ArrayEnd => match self.context_stack.pop() {
                    Some(Context::Array(p, items)) => self.push_operand(p, PSToken::Array(items)),
                    Some(other) => {
                        tracing::debug!(pos, "']' closes a dictionary, ignoring");
                        self.context_stack.push(other);
                    }
                    None => tracing::debug!(pos, "unbalanced ']'"),
                },
                Keyword::DictEnd => match self.context_stack.pop() {
                    Some(Context::Dict(p, items)) => {
                        self.push_operand(p, PSToken::Dict(build_dict(items)));
                    }
                    Some(other) => {
                        tracing::debug!(pos, "'>>' closes an array, ignoring");
                        self.context_stack.push(other);
                    }
                    None => tracing::debug!(pos, "unbalanced '>>'"),
                },
                Keyword::Null => {
                    self.push_operand(pos, PSToken::Keyword(Keyword::Null));
                }
                Keyword::BI if self.context_stack.is_empty() => {
                    self.in_inline_dict = true;
                    self.operand_stack.clear();
                }
                Keyword::ID if self.in_inline_dict => {
                    self.in_inline_dict = false;
                    let dict = self.build_inline_dict();
                    let known_len = dict
                        .get("L")
                        .or_else(|| dict.get("Length"))
                        .and_then(|o| o.as_int().ok())
                        .and_then(|n| usize::try_from(n).ok());
                    let data = self.lexer.read_inline_data(known_len);
                    return Some((pos, ContentToken::InlineImage { dict, data }));
                }
                kw if self.in_inline_dict || !self.context_stack.is_empty() => {
                    self.push_operand(pos, PSToken::Keyword(kw));
                }
                kw => {
                    self.pending.extend(
                        self.operand_stack
                            .drain(..)
                            .map(|(p, op)| (p, ContentToken::Operand(op))),
                    );
                    self.pending.push_back((pos, ContentToken::Keyword(kw)));
                    return self.pending.pop_front();
                }
            }
        }
    }

    fn push_operand(&mut self, pos: usize, token: PSToken) {
        match self.context_stack.last_mut() {
            Some(Context::Array(_, items) | Context::Dict(_, items)) => items.push(token),
            None => self.operand_stack.push((pos, token)),
        }
    }

    /// Inline image dictionary with abbreviated keys as written.
    fn build_inline_dict(&mut self) -> PDFDict {
        let mut dict = PDFDict::new();
        let mut iter = self.operand_stack.drain(..).map(|(_, t)| t);
        while let Some(key) = iter.next() {
            if let PSToken::Literal(name) = key
                && let Some(value) = iter.next()
                && let Some(obj) = value.to_object()
            {
                dict.insert(name, obj);
            }
        }
        dict
    }
}

impl Iterator for PDFContentParser {
    type Item = ContentToken;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_with_pos().map(|(_, token)| token)
    }
}

fn build_dict(items: Vec<PSToken>) -> HashMap<String, PSToken> {
    let mut dict = HashMap::new();
    let mut iter = items.into_iter();
    while let Some(key) = iter.next() {
        if let PSToken::Literal(name) = key
            && let Some(value) = iter.next()
        {
            dict.insert(name, value);
        }
    }
    dict
}

/// PDF whitespace.
const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
}

const fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

const fn is_keyword_end(b: u8) -> bool {
    is_whitespace(b) || is_delimiter(b)
}

const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &[u8]) -> Vec<ContentToken> {
        PDFContentParser::new([src]).collect()
    }

    #[test]
    fn test_operands_then_operator() {
        assert_eq!(
            tokens(b"1 0 0 1 10.5 -2 cm"),
            vec![
                ContentToken::Operand(PSToken::Int(1)),
                ContentToken::Operand(PSToken::Int(0)),
                ContentToken::Operand(PSToken::Int(0)),
                ContentToken::Operand(PSToken::Int(1)),
                ContentToken::Operand(PSToken::Real(10.5)),
                ContentToken::Operand(PSToken::Int(-2)),
                ContentToken::Keyword(Keyword::Cm),
            ]
        );
    }

    #[test]
    fn test_name_escape_and_hex_string() {
        assert_eq!(
            tokens(b"/A#20B <48 65 6>"),
            vec![
                ContentToken::Operand(PSToken::Literal("A B".into())),
                ContentToken::Operand(PSToken::String(vec![0x48, 0x65, 0x60])),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(b"(a\\(b\\)\\101) Tj"),
            vec![
                ContentToken::Operand(PSToken::String(b"a(b)A".to_vec())),
                ContentToken::Keyword(Keyword::Tj),
            ]
        );
    }

    #[test]
    fn test_inline_image() {
        let toks = tokens(b"BI /W 2 /H 1 /BPC 8 /CS /G ID \x00\xff EI Q");
        let ContentToken::InlineImage { dict, data } = &toks[0] else {
            panic!("expected inline image, got {toks:?}");
        };
        assert_eq!(dict.get("W"), Some(&PDFObject::Int(2)));
        assert_eq!(dict.get("CS"), Some(&PDFObject::Name("G".into())));
        assert_eq!(data.as_ref(), b"\x00\xff");
        assert_eq!(toks[1], ContentToken::Keyword(Keyword::Q));
    }

    #[test]
    fn test_comment_skipped() {
        assert_eq!(
            tokens(b"% comment\nq"),
            vec![ContentToken::Keyword(Keyword::Qq)]
        );
    }

    #[test]
    fn test_keyword_round_trip_text() {
        for kw in ["b*", "T*", "'", "\"", "scn", "BDC"] {
            assert_eq!(Keyword::from_bytes(kw.as_bytes()).as_str(), kw);
        }
    }
}
