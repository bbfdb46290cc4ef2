//! Type 4 (PostScript calculator) functions.
//!
//! The program text is compiled once into flat bytecode: procedure blocks
//! of `if`/`ifelse` become conditional and unconditional jumps, so
//! evaluation is a single loop over a `Vec<Instruction>`.

use std::fmt;

use crate::error::{PdfError, Result};
use crate::function::FunctionOutput;

/// Operand stack depth allowed by the calculator language.
pub const STACK_LIMIT: usize = 100;

/// Stack value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Int(i64),
    Real(f64),
    Bool(bool),
}

impl Operand {
    fn as_num(self) -> Result<f64> {
        match self {
            Self::Int(i) => Ok(i as f64),
            Self::Real(r) => Ok(r),
            Self::Bool(_) => Err(type_error("number", "bool")),
        }
    }

    fn as_int(self) -> Result<i64> {
        match self {
            Self::Int(i) => Ok(i),
            Self::Real(_) => Err(type_error("integer", "real")),
            Self::Bool(_) => Err(type_error("integer", "bool")),
        }
    }

    fn as_bool(self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(b),
            Self::Int(_) => Err(type_error("boolean", "integer")),
            Self::Real(_) => Err(type_error("boolean", "real")),
        }
    }
}

fn type_error(expected: &str, got: &str) -> PdfError {
    PdfError::FunctionEvaluation(format!("type check: expected {expected}, got {got}"))
}

fn eval_error(msg: &str) -> PdfError {
    PdfError::FunctionEvaluation(msg.to_string())
}

/// Calculator operators (ISO 32000-1, table 42), minus `if`/`ifelse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Abs,
    Add,
    Atan,
    Ceiling,
    Cos,
    Cvi,
    Cvr,
    Div,
    Exp,
    Floor,
    Idiv,
    Ln,
    Log,
    Mod,
    Mul,
    Neg,
    Round,
    Sin,
    Sqrt,
    Sub,
    Truncate,
    And,
    Bitshift,
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
    Not,
    Or,
    Xor,
    Copy,
    Dup,
    Exch,
    Index,
    Pop,
    Roll,
}

impl Operator {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Self::Abs,
            "add" => Self::Add,
            "atan" => Self::Atan,
            "ceiling" => Self::Ceiling,
            "cos" => Self::Cos,
            "cvi" => Self::Cvi,
            "cvr" => Self::Cvr,
            "div" => Self::Div,
            "exp" => Self::Exp,
            "floor" => Self::Floor,
            "idiv" => Self::Idiv,
            "ln" => Self::Ln,
            "log" => Self::Log,
            "mod" => Self::Mod,
            "mul" => Self::Mul,
            "neg" => Self::Neg,
            "round" => Self::Round,
            "sin" => Self::Sin,
            "sqrt" => Self::Sqrt,
            "sub" => Self::Sub,
            "truncate" => Self::Truncate,
            "and" => Self::And,
            "bitshift" => Self::Bitshift,
            "eq" => Self::Eq,
            "ge" => Self::Ge,
            "gt" => Self::Gt,
            "le" => Self::Le,
            "lt" => Self::Lt,
            "ne" => Self::Ne,
            "not" => Self::Not,
            "or" => Self::Or,
            "xor" => Self::Xor,
            "copy" => Self::Copy,
            "dup" => Self::Dup,
            "exch" => Self::Exch,
            "index" => Self::Index,
            "pop" => Self::Pop,
            "roll" => Self::Roll,
            _ => return None,
        })
    }
}

/// One bytecode instruction. Jump targets are absolute instruction indices.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Push(Operand),
    Op(Operator),
    /// Pop a boolean, jump when it is false
    JumpIfFalse(usize),
    Jump(usize),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(Operand::Int(i)) => write!(f, "push {i}"),
            Self::Push(Operand::Real(r)) => write!(f, "push {r:?}"),
            Self::Push(Operand::Bool(b)) => write!(f, "push {b}"),
            Self::Op(op) => write!(f, "{}", format!("{op:?}").to_lowercase()),
            Self::JumpIfFalse(t) => write!(f, "jf {t}"),
            Self::Jump(t) => write!(f, "jmp {t}"),
        }
    }
}

// ============================================================================
// Tokenizer and compiler
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Number(Operand),
    Word(String),
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'{' | b'}' | b'%') || b.is_ascii_whitespace() || b == 0
}

fn tokenize(text: &[u8]) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let b = text[pos];
        match b {
            b'{' => {
                tokens.push(Token::Open);
                pos += 1;
            }
            b'}' => {
                tokens.push(Token::Close);
                pos += 1;
            }
            b'%' => {
                while pos < text.len() && !matches!(text[pos], b'\r' | b'\n') {
                    pos += 1;
                }
            }
            _ if b.is_ascii_whitespace() || b == 0 => pos += 1,
            _ => {
                let start = pos;
                while pos < text.len() && !is_delimiter(text[pos]) {
                    pos += 1;
                }
                let word = std::str::from_utf8(&text[start..pos]).map_err(|_| {
                    PdfError::TokenError {
                        pos: start,
                        msg: "non-ASCII calculator token".into(),
                    }
                })?;
                tokens.push(parse_word(word, start)?);
            }
        }
    }
    Ok(tokens)
}

fn parse_word(word: &str, pos: usize) -> Result<Token> {
    let first = word.as_bytes()[0];
    if !(first.is_ascii_digit() || matches!(first, b'-' | b'+' | b'.')) {
        return Ok(Token::Word(word.to_string()));
    }
    let is_real = word.bytes().any(|b| matches!(b, b'.' | b'e' | b'E'));
    if !is_real && let Ok(i) = word.parse::<i64>() {
        return Ok(Token::Number(Operand::Int(i)));
    }
    word.parse::<f64>()
        .map(|r| Token::Number(Operand::Real(r)))
        .map_err(|_| PdfError::TokenError {
            pos,
            msg: format!("invalid number {word:?}"),
        })
}

/// Parsed program tree before jump lowering.
#[derive(Debug)]
enum Node {
    Value(Operand),
    Op(Operator),
    Block(Vec<Node>),
    If,
    IfElse,
}

fn parse_block(tokens: &[Token], pos: &mut usize) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    while let Some(token) = tokens.get(*pos) {
        *pos += 1;
        match token {
            Token::Open => nodes.push(Node::Block(parse_block(tokens, pos)?)),
            Token::Close => return Ok(nodes),
            Token::Number(n) => nodes.push(Node::Value(*n)),
            Token::Word(w) => nodes.push(match w.as_str() {
                "true" => Node::Value(Operand::Bool(true)),
                "false" => Node::Value(Operand::Bool(false)),
                "if" => Node::If,
                "ifelse" => Node::IfElse,
                other => Node::Op(Operator::from_name(other).ok_or_else(|| {
                    PdfError::SyntaxError(format!("unknown calculator operator {other}"))
                })?),
            }),
        }
    }
    Err(PdfError::SyntaxError("unterminated calculator procedure".into()))
}

fn emit(nodes: Vec<Node>, code: &mut Vec<Instruction>) -> Result<()> {
    let mut iter = nodes.into_iter().peekable();
    while let Some(node) = iter.next() {
        match node {
            Node::Value(v) => code.push(Instruction::Push(v)),
            Node::Op(op) => code.push(Instruction::Op(op)),
            Node::Block(then_block) => match iter.next() {
                Some(Node::If) => {
                    let jf = code.len();
                    code.push(Instruction::JumpIfFalse(0));
                    emit(then_block, code)?;
                    code[jf] = Instruction::JumpIfFalse(code.len());
                }
                Some(Node::Block(else_block)) => {
                    if !matches!(iter.next(), Some(Node::IfElse)) {
                        return Err(PdfError::SyntaxError(
                            "two procedures not followed by ifelse".into(),
                        ));
                    }
                    let jf = code.len();
                    code.push(Instruction::JumpIfFalse(0));
                    emit(then_block, code)?;
                    let jmp = code.len();
                    code.push(Instruction::Jump(0));
                    code[jf] = Instruction::JumpIfFalse(code.len());
                    emit(else_block, code)?;
                    code[jmp] = Instruction::Jump(code.len());
                }
                _ => {
                    return Err(PdfError::SyntaxError(
                        "procedure not followed by if or ifelse".into(),
                    ));
                }
            },
            Node::If | Node::IfElse => {
                return Err(PdfError::SyntaxError(
                    "if/ifelse without a procedure".into(),
                ));
            }
        }
    }
    Ok(())
}

// ============================================================================
// Virtual machine
// ============================================================================

/// A compiled calculator program.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorFunction {
    code: Vec<Instruction>,
}

impl CalculatorFunction {
    /// Compile program text of the form `{ ... }`.
    pub fn parse(text: &[u8]) -> Result<Self> {
        let tokens = tokenize(text)?;
        let mut pos = 0;
        match tokens.first() {
            Some(Token::Open) => pos += 1,
            _ => {
                return Err(PdfError::SyntaxError(
                    "calculator program must start with {".into(),
                ));
            }
        }
        let program = parse_block(&tokens, &mut pos)?;
        if pos != tokens.len() {
            tracing::debug!(
                trailing = tokens.len() - pos,
                "ignoring tokens after calculator program"
            );
        }
        let mut code = Vec::new();
        emit(program, &mut code)?;
        Ok(Self { code })
    }

    /// Compiled instructions.
    pub fn instructions(&self) -> &[Instruction] {
        &self.code
    }

    /// Run the program over `inputs` and pop `n_out` results.
    ///
    /// The top of the stack becomes the last output.
    pub fn execute(&self, inputs: &[f64], n_out: usize) -> Result<FunctionOutput> {
        let mut stack: Vec<Operand> = inputs.iter().map(|&x| Operand::Real(x)).collect();
        if stack.len() > STACK_LIMIT {
            return Err(eval_error("stack overflow"));
        }
        self.run(&mut stack)?;

        if stack.len() < n_out {
            return Err(eval_error("stack underflow collecting outputs"));
        }
        let mut out = FunctionOutput::from_elem(0.0, n_out);
        for slot in out.iter_mut().rev() {
            match stack.pop() {
                Some(v) => *slot = v.as_num()?,
                None => return Err(eval_error("stack underflow collecting outputs")),
            }
        }
        Ok(out)
    }

    fn run(&self, stack: &mut Vec<Operand>) -> Result<()> {
        let mut pc = 0;
        while let Some(instr) = self.code.get(pc) {
            pc += 1;
            match instr {
                Instruction::Push(v) => push(stack, *v)?,
                Instruction::Op(op) => apply(*op, stack)?,
                Instruction::JumpIfFalse(target) => {
                    if !pop(stack)?.as_bool()? {
                        pc = *target;
                    }
                }
                Instruction::Jump(target) => pc = *target,
            }
        }
        Ok(())
    }
}

#[inline]
fn push(stack: &mut Vec<Operand>, v: Operand) -> Result<()> {
    if stack.len() >= STACK_LIMIT {
        return Err(eval_error("stack overflow"));
    }
    stack.push(v);
    Ok(())
}

#[inline]
fn pop(stack: &mut Vec<Operand>) -> Result<Operand> {
    stack.pop().ok_or_else(|| eval_error("stack underflow"))
}

fn pop2(stack: &mut Vec<Operand>) -> Result<(Operand, Operand)> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    Ok((a, b))
}

fn int_or_real(
    a: Operand,
    b: Operand,
    int_op: fn(i64, i64) -> Option<i64>,
    real_op: fn(f64, f64) -> f64,
) -> Result<Operand> {
    if let (Operand::Int(x), Operand::Int(y)) = (a, b)
        && let Some(v) = int_op(x, y)
    {
        return Ok(Operand::Int(v));
    }
    Ok(Operand::Real(real_op(a.as_num()?, b.as_num()?)))
}

fn round_like(a: Operand, f: fn(f64) -> f64) -> Result<Operand> {
    match a {
        Operand::Int(_) => Ok(a),
        Operand::Real(r) => Ok(Operand::Real(f(r))),
        Operand::Bool(_) => Err(type_error("number", "bool")),
    }
}

fn compare(a: Operand, b: Operand, f: fn(f64, f64) -> bool) -> Result<Operand> {
    Ok(Operand::Bool(f(a.as_num()?, b.as_num()?)))
}

fn values_equal(a: Operand, b: Operand) -> bool {
    match (a, b) {
        (Operand::Bool(x), Operand::Bool(y)) => x == y,
        (Operand::Bool(_), _) | (_, Operand::Bool(_)) => false,
        _ => a.as_num().ok() == b.as_num().ok(),
    }
}

fn logical(
    a: Operand,
    b: Operand,
    bool_op: fn(bool, bool) -> bool,
    int_op: fn(i64, i64) -> i64,
) -> Result<Operand> {
    match (a, b) {
        (Operand::Bool(x), Operand::Bool(y)) => Ok(Operand::Bool(bool_op(x, y))),
        (Operand::Int(x), Operand::Int(y)) => Ok(Operand::Int(int_op(x, y))),
        _ => Err(type_error("two booleans or two integers", "mixed operands")),
    }
}

fn stack_index(stack: &[Operand], n: i64) -> Result<usize> {
    usize::try_from(n)
        .ok()
        .filter(|&n| n <= stack.len())
        .ok_or_else(|| eval_error("range check on stack operand"))
}

fn apply(op: Operator, stack: &mut Vec<Operand>) -> Result<()> {
    use Operator as O;
    let result = match op {
        O::Abs => match pop(stack)? {
            Operand::Int(i) => i.checked_abs().map_or(Operand::Real((i as f64).abs()), Operand::Int),
            other => Operand::Real(other.as_num()?.abs()),
        },
        O::Neg => match pop(stack)? {
            Operand::Int(i) => i.checked_neg().map_or(Operand::Real(-(i as f64)), Operand::Int),
            other => Operand::Real(-other.as_num()?),
        },
        O::Add => {
            let (a, b) = pop2(stack)?;
            int_or_real(a, b, i64::checked_add, |x, y| x + y)?
        }
        O::Sub => {
            let (a, b) = pop2(stack)?;
            int_or_real(a, b, i64::checked_sub, |x, y| x - y)?
        }
        O::Mul => {
            let (a, b) = pop2(stack)?;
            int_or_real(a, b, i64::checked_mul, |x, y| x * y)?
        }
        O::Div => {
            let (a, b) = pop2(stack)?;
            let d = b.as_num()?;
            if d == 0.0 {
                return Err(eval_error("undefined result: division by zero"));
            }
            Operand::Real(a.as_num()? / d)
        }
        O::Idiv => {
            let (a, b) = pop2(stack)?;
            let d = b.as_int()?;
            if d == 0 {
                return Err(eval_error("undefined result: division by zero"));
            }
            Operand::Int(a.as_int()?.wrapping_div(d))
        }
        O::Mod => {
            let (a, b) = pop2(stack)?;
            let d = b.as_int()?;
            if d == 0 {
                return Err(eval_error("undefined result: modulo by zero"));
            }
            Operand::Int(a.as_int()?.wrapping_rem(d))
        }
        O::Ceiling => round_like(pop(stack)?, f64::ceil)?,
        O::Floor => round_like(pop(stack)?, f64::floor)?,
        O::Round => round_like(pop(stack)?, |r| (r + 0.5).floor())?,
        O::Truncate => round_like(pop(stack)?, f64::trunc)?,
        O::Sqrt => {
            let x = pop(stack)?.as_num()?;
            if x < 0.0 {
                return Err(eval_error("range check: sqrt of negative number"));
            }
            Operand::Real(x.sqrt())
        }
        O::Sin => Operand::Real(pop(stack)?.as_num()?.to_radians().sin()),
        O::Cos => Operand::Real(pop(stack)?.as_num()?.to_radians().cos()),
        O::Atan => {
            let (num, den) = pop2(stack)?;
            let (num, den) = (num.as_num()?, den.as_num()?);
            if num == 0.0 && den == 0.0 {
                return Err(eval_error("undefined result: atan of 0/0"));
            }
            let deg = num.atan2(den).to_degrees();
            Operand::Real(if deg < 0.0 { deg + 360.0 } else { deg })
        }
        O::Exp => {
            let (base, exponent) = pop2(stack)?;
            Operand::Real(base.as_num()?.powf(exponent.as_num()?))
        }
        O::Ln | O::Log => {
            let x = pop(stack)?.as_num()?;
            if x <= 0.0 {
                return Err(eval_error("range check: logarithm of non-positive number"));
            }
            Operand::Real(if op == O::Ln { x.ln() } else { x.log10() })
        }
        O::Cvi => {
            let x = pop(stack)?.as_num()?.trunc();
            if !(i64::MIN as f64..=i64::MAX as f64).contains(&x) {
                return Err(eval_error("range check: cvi out of range"));
            }
            Operand::Int(x as i64)
        }
        O::Cvr => Operand::Real(pop(stack)?.as_num()?),
        O::Eq => {
            let (a, b) = pop2(stack)?;
            Operand::Bool(values_equal(a, b))
        }
        O::Ne => {
            let (a, b) = pop2(stack)?;
            Operand::Bool(!values_equal(a, b))
        }
        O::Ge => {
            let (a, b) = pop2(stack)?;
            compare(a, b, |x, y| x >= y)?
        }
        O::Gt => {
            let (a, b) = pop2(stack)?;
            compare(a, b, |x, y| x > y)?
        }
        O::Le => {
            let (a, b) = pop2(stack)?;
            compare(a, b, |x, y| x <= y)?
        }
        O::Lt => {
            let (a, b) = pop2(stack)?;
            compare(a, b, |x, y| x < y)?
        }
        O::And => {
            let (a, b) = pop2(stack)?;
            logical(a, b, |x, y| x && y, |x, y| x & y)?
        }
        O::Or => {
            let (a, b) = pop2(stack)?;
            logical(a, b, |x, y| x || y, |x, y| x | y)?
        }
        O::Xor => {
            let (a, b) = pop2(stack)?;
            logical(a, b, |x, y| x ^ y, |x, y| x ^ y)?
        }
        O::Not => match pop(stack)? {
            Operand::Bool(b) => Operand::Bool(!b),
            Operand::Int(i) => Operand::Int(!i),
            Operand::Real(_) => return Err(type_error("boolean or integer", "real")),
        },
        O::Bitshift => {
            let (a, shift) = pop2(stack)?;
            let (a, shift) = (a.as_int()?, shift.as_int()?);
            let amount = shift.unsigned_abs().min(63) as u32;
            Operand::Int(if shift >= 0 { a << amount } else { a >> amount })
        }
        O::Dup => *stack.last().ok_or_else(|| eval_error("stack underflow"))?,
        O::Pop => {
            pop(stack)?;
            return Ok(());
        }
        O::Exch => {
            let (a, b) = pop2(stack)?;
            stack.push(b);
            a
        }
        O::Index => {
            let n = pop(stack)?.as_int()?;
            let n = stack_index(stack, n)?;
            if n >= stack.len() {
                return Err(eval_error("stack underflow in index"));
            }
            stack[stack.len() - 1 - n]
        }
        O::Copy => {
            let n = pop(stack)?.as_int()?;
            let n = stack_index(stack, n)?;
            if stack.len() + n > STACK_LIMIT {
                return Err(eval_error("stack overflow"));
            }
            let start = stack.len() - n;
            stack.extend_from_within(start..);
            return Ok(());
        }
        O::Roll => {
            let (n, j) = pop2(stack)?;
            let (n, j) = (n.as_int()?, j.as_int()?);
            let n = stack_index(stack, n)?;
            if n > 0 {
                let start = stack.len() - n;
                let shift = j.rem_euclid(n as i64) as usize;
                stack[start..].rotate_right(shift);
            }
            return Ok(());
        }
    };
    push(stack, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(program: &str, inputs: &[f64], n_out: usize) -> Result<Vec<f64>> {
        CalculatorFunction::parse(program.as_bytes())?
            .execute(inputs, n_out)
            .map(|v| v.to_vec())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("{ 2 mul 1 add }", &[3.0], 1).unwrap(), vec![7.0]);
        assert_eq!(run("{ 7 2 idiv }", &[], 1).unwrap(), vec![3.0]);
        assert_eq!(run("{ -7 2 mod }", &[], 1).unwrap(), vec![-1.0]);
    }

    #[test]
    fn test_outputs_in_stack_order() {
        assert_eq!(run("{ pop 1 2 3 }", &[0.0], 3).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ifelse_compiles_to_jumps() {
        let f = CalculatorFunction::parse(b"{ 0.5 gt { 1 } { 0 } ifelse }").unwrap();
        let listing: Vec<String> = f.instructions().iter().map(ToString::to_string).collect();
        assert_eq!(
            listing,
            vec!["push 0.5", "gt", "jf 5", "push 1", "jmp 6", "push 0"]
        );
        assert_eq!(f.execute(&[0.7], 1).unwrap().as_slice(), &[1.0]);
        assert_eq!(f.execute(&[0.2], 1).unwrap().as_slice(), &[0.0]);
    }

    #[test]
    fn test_if_without_else() {
        assert_eq!(run("{ dup 0 lt { neg } if }", &[-4.0], 1).unwrap(), vec![4.0]);
        assert_eq!(run("{ dup 0 lt { neg } if }", &[4.0], 1).unwrap(), vec![4.0]);
    }

    #[test]
    fn test_roll_and_index() {
        assert_eq!(
            run("{ pop 1 2 3 3 1 roll }", &[0.0], 3).unwrap(),
            vec![3.0, 1.0, 2.0]
        );
        assert_eq!(run("{ pop 1 2 3 2 index }", &[0.0], 4).unwrap(), vec![1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_underflow_is_evaluation_error() {
        let err = run("{ add }", &[1.0], 1).unwrap_err();
        assert!(matches!(err, PdfError::FunctionEvaluation(_)));
    }

    #[test]
    fn test_stack_overflow() {
        let err = run("{ 1 100 copy }", &[0.0], 1).unwrap_err();
        assert!(matches!(err, PdfError::FunctionEvaluation(_)));
    }

    #[test]
    fn test_unknown_operator() {
        let err = CalculatorFunction::parse(b"{ 1 frobnicate }").unwrap_err();
        assert!(matches!(err, PdfError::SyntaxError(_)));
    }

    #[test]
    fn test_atan_degrees() {
        let out = run("{ pop 1 1 atan }", &[0.0], 1).unwrap();
        assert!((out[0] - 45.0).abs() < 1e-9);
        let out = run("{ pop -1 0 atan }", &[0.0], 1).unwrap();
        assert!((out[0] - 270.0).abs() < 1e-9);
    }
}
