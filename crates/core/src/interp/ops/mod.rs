//! PDF content stream operator implementations.
//!
//! Operators are grouped by category:
//! - `graphics_state` - State stack and transforms (q, Q, cm, w, J, j, M, d, ri, i, gs)
//! - `color` - Color space and values (G, g, RG, rg, K, k, CS, cs, SC, SCN, sc, scn)
//! - `path` - Path construction, painting and clipping (m, l, c, v, y, h, re, S, s, f, F, f\*, B, B\*, b, b\*, n, W, W\*)
//! - `text` - Text state, positioning and showing (BT, ET, Tc, Tw, Tz, TL, Tf, Tr, Ts, Td, TD, Tm, T\*, Tj, TJ, ', ")
//! - `xobject` - XObjects, inline images, shadings and marked content (Do, BI, ID, EI, sh, BMC, BDC, EMC, MP, DP)
//!
//! Each file adds an `impl` block to `PDFPageInterpreter`, so the methods
//! are available on the type without re-exports.

mod color;
mod graphics_state;
mod path;
mod text;
mod xobject;
