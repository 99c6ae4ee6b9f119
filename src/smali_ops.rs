use crate::dex::{Op, Opcode, OpcodeClass, ReferenceType, RegisterShape};
use crate::types::{parse_methodsignature, parse_typesignature, MethodSignature, SmaliError};
use nom::{
    branch::alt,
    bytes::complete::{escaped, tag, take_until, take_while1},
    character::complete::{char, digit1, none_of, one_of, space0, space1},
    combinator::{opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(pub String);

// A helper function to determine valid characters for a label.
fn is_label_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Parse a label in smali syntax, e.g. ":cond_0"
pub fn parse_label(input: &str) -> IResult<&str, Label> {
    // Expect a colon first, then one or more valid characters.
    let (input, _) = tag(":")(input)?;
    let (input, label_body) = take_while1(is_label_char)(input)?;
    Ok((input, Label(label_body.to_string())))
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

/// A symbolic reference to a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    /// The fully qualified class name, e.g. "Lcom/example/MyClass;".
    pub class: String,
    /// The method name.
    pub name: String,
    /// The method descriptor (signature), e.g. "(I)V".
    pub descriptor: String,
}

impl MethodRef {
    /// Parses `Lcls;->name(args)result`.
    ///
    /// # Examples
    ///
    /// ```
    ///  use smali_patcher::smali_ops::MethodRef;
    ///
    ///  let m = MethodRef::parse("Lapp/Hooks;->hide(Landroid/view/View;Z)V").unwrap();
    ///  assert_eq!(m.name, "hide");
    ///  assert_eq!(m.descriptor, "(Landroid/view/View;Z)V");
    /// ```
    pub fn parse(s: &str) -> Result<MethodRef, SmaliError> {
        match parse_method_ref(s.trim()) {
            Ok(("", m)) => Ok(m),
            _ => Err(SmaliError::new(&format!("Could not parse method reference: {s}"))),
        }
    }

    pub fn signature(&self) -> Result<MethodSignature, SmaliError> {
        MethodSignature::from_jni(&self.descriptor)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Example: Lkotlin/jvm/internal/Intrinsics;->checkNotNullParameter(Ljava/lang/Object;Ljava/lang/String;)V
        write!(f, "{}->{}{}", self.class, self.name, self.descriptor)
    }
}

/// A symbolic reference to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// The fully qualified class name, e.g. "Lcom/example/MyClass;".
    pub class: String,
    /// The field name.
    pub name: String,
    /// The field descriptor (type), e.g. "I" for int.
    pub descriptor: String,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Example: Lcom/example/MyClass;->myField:I
        write!(f, "{}->{}:{}", self.class, self.name, self.descriptor)
    }
}

/// The constant pool item an instruction refers to, stored symbolically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// String contents as written in smali, escapes included.
    String(String),
    Type(String),
    Field(FieldRef),
    Method(MethodRef),
    /// Method prototype descriptor, e.g. `(I)V`.
    MethodProto(String),
    /// `kind@member` as written, e.g. `invoke-static@LFoo;->bar()V`.
    MethodHandle(String),
    /// `name(args)@bootstrap` as written.
    CallSite(String),
}

impl Reference {
    fn kind(&self) -> ReferenceType {
        match self {
            Reference::String(_) => ReferenceType::String,
            Reference::Type(_) => ReferenceType::Type,
            Reference::Field(_) => ReferenceType::Field,
            Reference::Method(_) => ReferenceType::Method,
            Reference::MethodProto(_) => ReferenceType::MethodProto,
            Reference::MethodHandle(_) => ReferenceType::MethodHandle,
            Reference::CallSite(_) => ReferenceType::CallSite,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::String(s) => write!(f, "\"{s}\""),
            Reference::Type(t) => write!(f, "{t}"),
            Reference::Field(field) => write!(f, "{field}"),
            Reference::Method(method) => write!(f, "{method}"),
            Reference::MethodProto(s) | Reference::MethodHandle(s) | Reference::CallSite(s) => {
                write!(f, "{s}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SmaliRegister {
    Parameter(u16),
    Local(u16),
}

pub fn p(u: u16) -> SmaliRegister {
    SmaliRegister::Parameter(u)
}
pub fn v(u: u16) -> SmaliRegister {
    SmaliRegister::Local(u)
}

impl SmaliRegister {
    /// The number as written, without the method context.
    pub fn number(&self) -> u16 {
        match self {
            SmaliRegister::Parameter(n) | SmaliRegister::Local(n) => *n,
        }
    }

    /// The following register of the same kind, `None` past the last register number.
    fn next(&self) -> Option<SmaliRegister> {
        match self {
            SmaliRegister::Parameter(n) => n.checked_add(1).map(p),
            SmaliRegister::Local(n) => n.checked_add(1).map(v),
        }
    }
}

impl fmt::Display for SmaliRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmaliRegister::Parameter(n) => write!(f, "p{n}"),
            SmaliRegister::Local(n) => write!(f, "v{n}"),
        }
    }
}

/// A single Dalvik instruction.
///
/// Literal operands are stored as the value the instruction loads, so `const/high16 v0, 0x7f0a0000`
/// holds `0x7f0a0000`, not the encoded high half. Instances are validated on construction and
/// never change afterwards; patching inserts new instructions instead of editing old ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    op: Op,
    registers: Vec<SmaliRegister>,
    literal: Option<i64>,
    reference: Option<Reference>,
    proto: Option<String>,
    target: Option<Label>,
}

impl Instruction {
    pub fn new(
        op: Op,
        registers: Vec<SmaliRegister>,
        literal: Option<i64>,
        reference: Option<Reference>,
        target: Option<Label>,
    ) -> Result<Instruction, SmaliError> {
        Instruction::build(op, registers, literal, reference, None, target)
    }

    fn build(
        op: Op,
        registers: Vec<SmaliRegister>,
        literal: Option<i64>,
        reference: Option<Reference>,
        proto: Option<String>,
        target: Option<Label>,
    ) -> Result<Instruction, SmaliError> {
        let info = op.info();
        check_registers(info, &registers)?;
        check_literal(info, literal)?;

        match (&reference, info.reference_type) {
            (None, ReferenceType::None) => {}
            (Some(r), expected) if r.kind() == expected => {}
            (r, expected) => {
                return Err(SmaliError::new(&format!(
                    "{} expects a {:?} reference, got {:?}",
                    info.name, expected, r
                )))
            }
        }

        if proto.is_some() != info.format.has_proto_reference() {
            return Err(SmaliError::new(&format!(
                "{} {} a method prototype",
                info.name,
                if proto.is_some() { "does not take" } else { "requires" }
            )));
        }

        if target.is_some() != info.format.has_branch_target() {
            return Err(SmaliError::new(&format!(
                "{} {} a branch target",
                info.name,
                if target.is_some() { "does not take" } else { "requires" }
            )));
        }

        if let Some(Reference::Method(method)) = &reference {
            check_invoke_arity(op, method, proto.as_deref(), registers.len())?;
        }

        Ok(Instruction {
            op,
            registers,
            literal,
            reference,
            proto,
            target,
        })
    }

    /// An instruction without literal, reference or target, e.g. `move-object v0, v1`.
    pub fn simple(op: Op, registers: Vec<SmaliRegister>) -> Result<Instruction, SmaliError> {
        Instruction::new(op, registers, None, None, None)
    }

    /// `const/4 dest, value`
    pub fn const4(dest: SmaliRegister, value: i8) -> Result<Instruction, SmaliError> {
        Instruction::new(Op::Const4, vec![dest], Some(value.into()), None, None)
    }

    /// Loads a 32-bit value using the smallest `const` form the register and value allow.
    pub fn const_literal(dest: SmaliRegister, value: i32) -> Result<Instruction, SmaliError> {
        let op = if dest.number() <= 0xf && (-8..=7).contains(&value) {
            Op::Const4
        } else if i16::try_from(value).is_ok() {
            Op::Const16
        } else if value & 0xffff == 0 {
            Op::ConstHigh16
        } else {
            Op::Const
        };
        Instruction::new(op, vec![dest], Some(value.into()), None, None)
    }

    /// `invoke-static {registers}, method`, switching to the range form when needed.
    pub fn invoke_static(
        registers: Vec<SmaliRegister>,
        method: MethodRef,
    ) -> Result<Instruction, SmaliError> {
        let fits_list = registers.len() <= 5 && registers.iter().all(|r| r.number() <= 0xf);
        let op = if fits_list { Op::InvokeStatic } else { Op::InvokeStaticRange };
        Instruction::new(op, registers, None, Some(Reference::Method(method)), None)
    }

    /// `invoke-polymorphic {registers}, method, proto`, switching to the range form when needed.
    pub fn invoke_polymorphic(
        registers: Vec<SmaliRegister>,
        method: MethodRef,
        proto: &str,
    ) -> Result<Instruction, SmaliError> {
        let fits_list = registers.len() <= 5 && registers.iter().all(|r| r.number() <= 0xf);
        let op = if fits_list { Op::InvokePolymorphic } else { Op::InvokePolymorphicRange };
        let proto = MethodSignature::from_jni(proto)?.to_jni();
        Instruction::build(op, registers, None, Some(Reference::Method(method)), Some(proto), None)
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn opcode(&self) -> &'static Opcode {
        self.op.info()
    }

    pub fn registers(&self) -> &[SmaliRegister] {
        &self.registers
    }

    /// Register A of the one-, two- and three-register forms, usually the destination.
    pub fn register_a(&self) -> Option<SmaliRegister> {
        match self.op.format().register_shape() {
            RegisterShape::One | RegisterShape::Two | RegisterShape::Three => {
                self.registers.first().copied()
            }
            _ => None,
        }
    }

    /// Register B of the two- and three-register forms.
    pub fn register_b(&self) -> Option<SmaliRegister> {
        match self.op.format().register_shape() {
            RegisterShape::Two | RegisterShape::Three => self.registers.get(1).copied(),
            _ => None,
        }
    }

    pub fn literal(&self) -> Option<i64> {
        self.literal
    }

    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    /// The prototype of an `invoke-polymorphic` call.
    pub fn proto(&self) -> Option<&str> {
        self.proto.as_deref()
    }

    pub fn target(&self) -> Option<&Label> {
        self.target.as_ref()
    }

    pub fn byte_size(&self) -> usize {
        self.op.format().size()
    }

    pub fn code_units(&self) -> usize {
        self.byte_size() / 2
    }

    pub fn is_literal_load(&self) -> bool {
        self.opcode().is_literal_load()
    }

    /// True when this is a `const*` instruction loading `value`.
    pub fn loads_literal(&self, value: i64) -> bool {
        self.is_literal_load() && self.literal == Some(value)
    }

    /// Checks the register slots against the format limits after mapping each register to its
    /// raw number, e.g. with [`crate::types::SmaliMethod::raw_register`].
    pub fn check_raw_registers(
        &self,
        raw: impl Fn(SmaliRegister) -> u16,
    ) -> Result<(), SmaliError> {
        let format = self.op.format();
        let limits = format.register_limits();
        let too_big = match format.register_shape() {
            RegisterShape::Range => self.registers.first().map_or(false, |r| raw(*r) > limits[0]),
            _ => self
                .registers
                .iter()
                .zip(limits.iter())
                .any(|(r, limit)| raw(*r) > *limit),
        };
        if too_big {
            return Err(SmaliError::new(&format!(
                "Register out of range for {} in `{}`",
                self.op, self
            )));
        }
        Ok(())
    }
}

fn check_registers(info: &Opcode, registers: &[SmaliRegister]) -> Result<(), SmaliError> {
    let limits = info.format.register_limits();
    match info.format.register_shape() {
        RegisterShape::List => {
            if registers.len() > limits.len() {
                return Err(SmaliError::new(&format!(
                    "{} takes at most {} registers, got {}",
                    info.name,
                    limits.len(),
                    registers.len()
                )));
            }
        }
        RegisterShape::Range => {
            if registers.len() > 255 {
                return Err(SmaliError::new(&format!("{} range too long", info.name)));
            }
            if registers.windows(2).any(|w| w[0].next() != Some(w[1])) {
                return Err(SmaliError::new(&format!(
                    "{} needs contiguous registers",
                    info.name
                )));
            }
        }
        _ => {
            if registers.len() != limits.len() {
                return Err(SmaliError::new(&format!(
                    "{} takes {} registers, got {}",
                    info.name,
                    limits.len(),
                    registers.len()
                )));
            }
        }
    }

    // Parameter registers are checked later against the method frame.
    let too_big = match info.format.register_shape() {
        RegisterShape::Range => registers
            .first()
            .map_or(false, |r| matches!(r, SmaliRegister::Local(n) if *n > limits[0])),
        _ => registers
            .iter()
            .zip(limits.iter())
            .any(|(r, limit)| matches!(r, SmaliRegister::Local(n) if n > limit)),
    };
    if too_big {
        return Err(SmaliError::new(&format!(
            "Register out of range for {}: {:?}",
            info.name, registers
        )));
    }
    Ok(())
}

fn check_literal(info: &Opcode, literal: Option<i64>) -> Result<(), SmaliError> {
    let bits = match (info.format.literal_bits(), literal) {
        (None, None) => return Ok(()),
        (Some(bits), Some(_)) => bits,
        (None, Some(_)) => {
            return Err(SmaliError::new(&format!("{} does not take a literal", info.name)))
        }
        (Some(_), None) => {
            return Err(SmaliError::new(&format!("{} requires a literal", info.name)))
        }
    };
    let value = literal.unwrap_or_default();
    let fits = bits >= 64 || {
        let half = 1i64 << (bits - 1);
        (-half..half).contains(&value)
    };
    let aligned = match info.format {
        crate::dex::Format::Format21ih => value & 0xffff == 0,
        crate::dex::Format::Format21lh => value & 0xffff_ffff_ffff == 0,
        _ => true,
    };
    if !fits || !aligned {
        return Err(SmaliError::new(&format!(
            "Literal {value:#x} does not fit {}",
            info.name
        )));
    }
    Ok(())
}

fn check_invoke_arity(
    op: Op,
    method: &MethodRef,
    proto: Option<&str>,
    count: usize,
) -> Result<(), SmaliError> {
    if op.class() != OpcodeClass::Invoke {
        return Ok(());
    }
    // invoke-polymorphic passes arguments as its prototype declares them
    let signature = match proto {
        Some(proto) => MethodSignature::from_jni(proto)?,
        None => method.signature()?,
    };
    let this = !matches!(op, Op::InvokeStatic | Op::InvokeStaticRange);
    let expected = signature.arg_registers() as usize + usize::from(this);
    if expected != count {
        return Err(SmaliError::new(&format!(
            "{op} {method} expects {expected} registers, got {count}"
        )));
    }
    Ok(())
}

fn fmt_literal(op: Op, value: i64) -> String {
    let wide = op.info().sets_wide_register() && op.info().is_literal_load();
    let suffix = if wide { "L" } else { "" };
    if value < 0 {
        format!("-0x{:x}{suffix}", value.unsigned_abs())
    } else {
        format!("0x{value:x}{suffix}")
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        let mut sep = " ";
        match self.op.format().register_shape() {
            RegisterShape::None => {}
            RegisterShape::List => {
                let regs: Vec<String> = self.registers.iter().map(|r| r.to_string()).collect();
                write!(f, " {{{}}}", regs.join(", "))?;
                sep = ", ";
            }
            RegisterShape::Range => {
                match (self.registers.first(), self.registers.last()) {
                    (Some(first), Some(last)) => write!(f, " {{{first} .. {last}}}")?,
                    _ => write!(f, " {{}}")?,
                }
                sep = ", ";
            }
            _ => {
                for r in &self.registers {
                    write!(f, "{sep}{r}")?;
                    sep = ", ";
                }
            }
        }
        if let Some(literal) = self.literal {
            write!(f, "{sep}{}", fmt_literal(self.op, literal))?;
        }
        if let Some(reference) = &self.reference {
            write!(f, "{sep}{reference}")?;
        }
        if let Some(proto) = &self.proto {
            write!(f, "{sep}{proto}")?;
        }
        if let Some(target) = &self.target {
            write!(f, "{sep}{target}")?;
        }
        Ok(())
    }
}

impl FromStr for Instruction {
    type Err = SmaliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_instruction(s)
    }
}

/// Parses one line of smali, e.g. `const/4 v0, 0x1`, into a validated instruction.
pub fn parse_instruction(line: &str) -> Result<Instruction, SmaliError> {
    let line = strip_comment(line).trim();
    let (input, name) = take_while1::<_, _, nom::error::Error<&str>>(|c: char| {
        c.is_alphanumeric() || c == '-' || c == '/'
    })(line)
    .map_err(|_| SmaliError::new(&format!("Expected an instruction: `{line}`")))?;
    let op = Op::from_name(name)
        .ok_or_else(|| SmaliError::new(&format!("Unsupported operation {name}")))?;

    let (rest, operands) = parse_operands(op, input)
        .map_err(|e| SmaliError::new(&format!("Error parsing operation `{line}`: {e}")))?;
    if !rest.trim().is_empty() {
        return Err(SmaliError::new(&format!(
            "Unexpected trailing input `{}` in `{line}`",
            rest.trim()
        )));
    }

    Instruction::build(
        op,
        operands.registers,
        operands.literal,
        operands.reference,
        operands.proto,
        operands.target,
    )
}

/// Parses a block of smali instructions, one per line. Blank lines and `#` comments are skipped.
///
/// # Examples
///
/// ```
///  use smali_patcher::smali_ops::parse_block;
///
///  let block = parse_block("
///      const/4 v1, 0x1
///      invoke-static {v0, v1}, Lapp/Hooks;->hide(Landroid/view/View;Z)V
///  ").unwrap();
///  assert_eq!(block.len(), 2);
/// ```
pub fn parse_block(smali: &str) -> Result<Vec<Instruction>, SmaliError> {
    smali
        .lines()
        .map(|l| strip_comment(l).trim())
        .filter(|l| !l.is_empty())
        .map(parse_instruction)
        .collect()
}

// Strips a trailing `# comment`, leaving `#` inside string literals alone.
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '\\' if in_string => escaped = !escaped,
            '"' if !escaped => {
                in_string = !in_string;
                escaped = false;
            }
            '#' if !in_string => return &line[..i],
            _ => escaped = false,
        }
    }
    line
}

#[derive(Default)]
struct Operands {
    registers: Vec<SmaliRegister>,
    literal: Option<i64>,
    reference: Option<Reference>,
    proto: Option<String>,
    target: Option<Label>,
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(space0, char(','), space0)(input)
}

// A space separates the mnemonic from the first operand, commas separate the rest.
fn next_operand<'a>(input: &'a str, operands: &str) -> IResult<&'a str, &'a str> {
    if input.len() == operands.len() {
        space1(input)
    } else {
        recognize(comma)(input)
    }
}

fn parse_operands(op: Op, operands_input: &str) -> IResult<&str, Operands> {
    let info = op.info();
    let format = info.format;
    let mut operands = Operands::default();
    let mut input = operands_input;

    match format.register_shape() {
        RegisterShape::None => {}
        RegisterShape::List => {
            input = next_operand(input, operands_input)?.0;
            let (rest, regs) = parse_register_list(input)?;
            operands.registers = regs;
            input = rest;
        }
        RegisterShape::Range => {
            input = next_operand(input, operands_input)?.0;
            let (rest, regs) = parse_register_range(input)?;
            operands.registers = regs;
            input = rest;
        }
        _ => {
            for _ in format.register_limits() {
                input = next_operand(input, operands_input)?.0;
                let (rest, reg) = parse_register(input)?;
                operands.registers.push(reg);
                input = rest;
            }
        }
    }

    if format.literal_bits().is_some() {
        input = next_operand(input, operands_input)?.0;
        let (rest, literal) = parse_literal(input)?;
        operands.literal = Some(literal);
        input = rest;
    }

    if info.reference_type != ReferenceType::None {
        input = next_operand(input, operands_input)?.0;
        let (rest, reference) = parse_reference(info.reference_type, input)?;
        operands.reference = Some(reference);
        input = rest;
    }

    if format.has_proto_reference() {
        input = next_operand(input, operands_input)?.0;
        let (rest, proto) = parse_method_proto(input)?;
        operands.proto = Some(proto);
        input = rest;
    }

    if format.has_branch_target() {
        input = next_operand(input, operands_input)?.0;
        let (rest, label) = parse_label(input)?;
        operands.target = Some(label);
        input = rest;
    }

    Ok((input, operands))
}

fn parse_register(input: &str) -> IResult<&str, SmaliRegister> {
    // We accept either 'v' or 'p' followed by one or more digits.
    let (input, t) = alt((char('v'), char('p')))(input)?;
    let (rest, num_str) = digit1(input)?;
    let num = num_str.parse::<u16>().map_err(|_| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    Ok((rest, if t == 'v' { v(num) } else { p(num) }))
}

/// Parse a comma-separated list of registers inside curly braces.
fn parse_register_list(input: &str) -> IResult<&str, Vec<SmaliRegister>> {
    delimited(
        pair(char('{'), space0),
        separated_list0(comma, parse_register),
        pair(space0, char('}')),
    )(input)
}

/// Parses a register range enclosed in braces, e.g. "{v0 .. v6}", and expands it.
fn parse_register_range(input: &str) -> IResult<&str, Vec<SmaliRegister>> {
    let (input, _) = pair(char('{'), space0)(input)?;
    if let Ok((input, _)) = char::<_, nom::error::Error<&str>>('}')(input) {
        return Ok((input, vec![]));
    }
    let (input, start) = parse_register(input)?;
    let (input, end) = opt(preceded(delimited(space0, tag(".."), space0), parse_register))(input)?;
    let (input, _) = pair(space0, char('}'))(input)?;

    let end = end.unwrap_or(start);
    let same_kind = matches!(
        (start, end),
        (SmaliRegister::Local(_), SmaliRegister::Local(_))
            | (SmaliRegister::Parameter(_), SmaliRegister::Parameter(_))
    );
    if !same_kind || end.number() < start.number() {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    let mut regs = vec![start];
    let mut last = start;
    while last != end {
        match last.next() {
            Some(next) => {
                regs.push(next);
                last = next;
            }
            None => break,
        }
    }
    Ok((input, regs))
}

/// Parses an integer literal in smali syntax: decimal or hex, optional sign, and an optional
/// `L`, `t` or `s` width suffix. Hex values are read as raw bits of the suffix width.
pub(crate) fn parse_literal(input: &str) -> IResult<&str, i64> {
    let start = input;
    let (input, sign) = opt(char('-'))(input)?;
    let (input, hex) = opt(alt((tag("0x"), tag("0X"))))(input)?;
    let (input, digits) = if hex.is_some() {
        take_while1(|c: char| c.is_ascii_hexdigit())(input)?
    } else {
        digit1(input)?
    };
    let (input, suffix) = opt(one_of("Lts"))(input)?;

    let fail = || nom::Err::Failure(nom::error::Error::new(start, nom::error::ErrorKind::Digit));
    let magnitude = u64::from_str_radix(digits, if hex.is_some() { 16 } else { 10 })
        .map_err(|_| fail())?;

    let value = if sign.is_some() {
        if magnitude > i64::MAX as u64 + 1 {
            return Err(fail());
        }
        (magnitude as i64).wrapping_neg()
    } else if hex.is_some() {
        // 0xffffffff means -1 for an int, like baksmali prints it
        let bits = match suffix {
            Some('L') => 64,
            Some('s') => 16,
            Some('t') => 8,
            _ if magnitude <= u32::MAX as u64 => 32,
            _ => 64,
        };
        if bits == 64 {
            magnitude as i64
        } else if magnitude >> (bits - 1) == 1 && magnitude < 1 << bits {
            magnitude as i64 - (1i64 << bits)
        } else if magnitude < 1 << bits {
            magnitude as i64
        } else {
            return Err(fail());
        }
    } else {
        i64::try_from(magnitude).map_err(|_| fail())?
    };
    Ok((input, value))
}

/// Parses a string literal that may be empty, keeping escapes as written.
fn parse_string_literal(input: &str) -> IResult<&str, String> {
    let esc = escaped(none_of("\\\""), '\\', one_of("'\"tbnrfu\\0123456789abcdefABCDEF"));
    let esc_or_empty = alt((esc, tag("")));
    let (i, s) = delimited(char('"'), esc_or_empty, char('"'))(input)?;
    Ok((i, s.to_string()))
}

fn parse_type_descriptor(input: &str) -> IResult<&str, String> {
    let (rest, _) = parse_typesignature(input)?;
    Ok((rest, input[..input.len() - rest.len()].to_string()))
}

/// Parse a method reference of the form:
///    L<class>;-><method>(<args>)<ret>
fn parse_method_ref(input: &str) -> IResult<&str, MethodRef> {
    // Parse until the "->"
    let (input, class) = take_until("->")(input)?;
    let (input, _) = tag("->")(input)?;
    // Parse the method name (up to the opening parenthesis)
    let (input, name) = take_until("(")(input)?;
    let (rest, _) = parse_methodsignature(input)?;
    let descriptor = &input[..input.len() - rest.len()];

    Ok((
        rest,
        MethodRef {
            class: class.trim().to_owned(),
            name: name.trim().to_owned(),
            descriptor: descriptor.to_owned(),
        },
    ))
}

fn parse_field_ref(input: &str) -> IResult<&str, FieldRef> {
    let (input, class) = take_until("->")(input)?;
    let (input, _) = tag("->")(input)?;
    let (input, name) = take_until(":")(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, descriptor) = parse_type_descriptor(input)?;

    Ok((
        input,
        FieldRef {
            class: class.trim().to_owned(),
            name: name.trim().to_owned(),
            descriptor,
        },
    ))
}

fn parse_method_proto(input: &str) -> IResult<&str, String> {
    let (rest, _) = parse_methodsignature(input)?;
    Ok((rest, input[..input.len() - rest.len()].to_string()))
}

/// `invoke-static@Lcls;->name(args)result` or `static-get@Lcls;->name:type`, kept as written.
fn parse_method_handle(input: &str) -> IResult<&str, String> {
    let (rest, _) = take_while1(|c: char| c.is_ascii_lowercase() || c == '-')(input)?;
    let (rest, _) = char('@')(rest)?;
    let (rest, _) = alt((recognize(parse_method_ref), recognize(parse_field_ref)))(rest)?;
    Ok((rest, input[..input.len() - rest.len()].to_string()))
}

// Consumes `(...)` up to the matching parenthesis, skipping string literals.
fn balanced_parens(input: &str) -> IResult<&str, &str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            _ if depth == 0 && c != '(' => break,
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], &input[..i + 1]));
                }
            }
            _ => {}
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)))
}

/// `call_site_0("run", ()Ljava/lang/Runnable;)@Lboot;->bsm(...)Ljava/lang/invoke/CallSite;`,
/// kept as written.
fn parse_call_site(input: &str) -> IResult<&str, String> {
    let (rest, _) = take_while1(is_label_char)(input)?;
    let (rest, _) = balanced_parens(rest)?;
    let (rest, _) = char('@')(rest)?;
    let (rest, _) = parse_method_ref(rest)?;
    Ok((rest, input[..input.len() - rest.len()].to_string()))
}

fn parse_reference(kind: ReferenceType, input: &str) -> IResult<&str, Reference> {
    match kind {
        ReferenceType::String => {
            let (input, s) = parse_string_literal(input)?;
            Ok((input, Reference::String(s)))
        }
        ReferenceType::Type => {
            let (input, t) = parse_type_descriptor(input)?;
            Ok((input, Reference::Type(t)))
        }
        ReferenceType::Field => {
            let (input, field) = parse_field_ref(input)?;
            Ok((input, Reference::Field(field)))
        }
        ReferenceType::Method => {
            let (input, method) = parse_method_ref(input)?;
            Ok((input, Reference::Method(method)))
        }
        ReferenceType::MethodProto => {
            let (input, proto) = parse_method_proto(input)?;
            Ok((input, Reference::MethodProto(proto)))
        }
        ReferenceType::MethodHandle => {
            let (input, handle) = parse_method_handle(input)?;
            Ok((input, Reference::MethodHandle(handle)))
        }
        ReferenceType::CallSite => {
            let (input, site) = parse_call_site(input)?;
            Ok((input, Reference::CallSite(site)))
        }
        ReferenceType::None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Fail,
        ))),
    }
}
