use nom::bytes::complete::{escaped, tag, take_while1};
use nom::branch::alt;
use nom::character::complete::{char, none_of, one_of, space0, space1};
use nom::sequence::{delimited, terminated};
use nom::IResult;
use std::str::FromStr;
use crate::smali_ops::{parse_instruction, parse_label, strip_comment, Label};
use crate::types::*;

/// Directives that only carry debug information; kept bound to the next instruction.
const DEBUG_DIRECTIVES: [&str; 7] = [".line", ".prologue", ".epilogue", ".local ", ".end local", ".restart local", ".source"];

const PAYLOADS: [(&str, &str); 3] = [
    (".packed-switch", ".end packed-switch"),
    (".sparse-switch", ".end sparse-switch"),
    (".array-data", ".end array-data"),
];

fn quoted(input: &str) -> IResult<&str, &str>
{
    let esc = escaped(none_of("\\\""), '\\', one_of("'\"tbnrfu\\"));
    let esc_or_empty = alt((esc, tag("")));

    delimited(char('"'), esc_or_empty, char('"'))(input)
}

fn modifier_word(input: &str) -> IResult<&str, &str>
{
    take_while1(|c: char| c.is_ascii_lowercase() || c == '-')(input)
}

// Reads `word word ... ` as long as each word is a known modifier.
fn parse_modifiers(smali: &str) -> IResult<&str, Vec<Modifier>>
{
    let mut input = smali;
    let mut mods = vec![];
    loop
    {
        let r: IResult<&str, &str> = terminated(modifier_word, space1)(input);
        match r
        {
            Ok((o, word)) =>
            {
                match Modifier::from_str(word)
                {
                    Ok(m) => { mods.push(m); input = o; }
                    Err(_) => break,
                }
            }
            Err(_) => break,
        }
    }
    Ok((input, mods))
}

fn parse_class_line(smali: &str) -> IResult<&str, (Vec<Modifier>, ObjectIdentifier)>
{
    let (input, _) = terminated(tag(".class"), space1)(smali)?;
    let (input, modifiers) = parse_modifiers(input)?;
    let (input, class_type) = take_while1(|c: char| !c.is_whitespace())(input)?;
    Ok((input, (modifiers, ObjectIdentifier::from_jni_type(class_type))))
}

fn parse_super_line(smali: &str) -> IResult<&str, ObjectIdentifier>
{
    let (input, _) = terminated(tag(".super"), space1)(smali)?;
    let (input, class_type) = take_while1(|c: char| !c.is_whitespace())(input)?;
    Ok((input, ObjectIdentifier::from_jni_type(class_type)))
}

fn parse_source_line(smali: &str) -> IResult<&str, String>
{
    let (input, _) = terminated(tag(".source"), space1)(smali)?;
    let (input, source) = quoted(input)?;
    Ok((input, source.to_string()))
}

fn parse_method_line(smali: &str) -> IResult<&str, (Vec<Modifier>, String, MethodSignature)>
{
    let (input, _) = terminated(tag(".method"), space1)(smali)?;
    let (input, modifiers) = parse_modifiers(input)?;
    let (input, name) = take_while1(|c: char| c != '(' && !c.is_whitespace())(input)?;
    let (input, signature) = parse_methodsignature(input)?;
    Ok((input, (modifiers, name.to_string(), signature)))
}

fn parse_register_count<'a>(smali: &'a str, directive: &'static str) -> IResult<&'a str, u16>
{
    let (input, _) = terminated(tag(directive), space1)(smali)?;
    let (input, n) = take_while1(|c: char| c.is_ascii_digit())(input)?;
    let (input, _) = space0(input)?;
    match n.parse::<u16>()
    {
        Ok(n) => Ok((input, n)),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(smali, nom::error::ErrorKind::Digit))),
    }
}

// Only a bare label is accepted, not a label used as an operand.
fn parse_label_line(smali: &str) -> Option<Label>
{
    match parse_label(smali)
    {
        Ok(("", label)) => Some(label),
        _ => None,
    }
}

fn is_debug_directive(line: &str) -> bool
{
    DEBUG_DIRECTIVES.iter().any(|d| line == d.trim_end() || line.starts_with(d))
}

/// Line cursor over a smali document; `next` skips blanks and comment-only lines.
struct Lines<'a>
{
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Lines<'a>
{
    fn new(smali: &'a str) -> Self
    {
        let lines = smali
            .lines()
            .enumerate()
            .map(|(n, l)| (n + 1, strip_comment(l).trim()))
            .filter(|(_, l)| !l.is_empty())
            .collect();
        Lines { lines, pos: 0 }
    }

    fn next(&mut self) -> Option<(usize, &'a str)>
    {
        let l = self.lines.get(self.pos).copied();
        self.pos += 1;
        l
    }

    fn peek(&self) -> Option<&'a str>
    {
        self.lines.get(self.pos).map(|(_, l)| *l)
    }

    /// Collects `first` and every line up to and including `end`.
    fn block(&mut self, first: &str, line_no: usize, end: &str) -> Result<Vec<String>, SmaliError>
    {
        let mut out = vec![first.to_string()];
        loop
        {
            match self.next()
            {
                Some((_, l)) =>
                {
                    out.push(l.to_string());
                    if l == end { return Ok(out); }
                }
                None => return Err(SmaliError::new(&format!("line {line_no}: `{first}` has no matching {end}"))),
            }
        }
    }

    /// Like `block`, but the end marker is only required when annotations follow, as for
    /// `.field` and `.param`.
    fn optional_block(&mut self, first: &str, line_no: usize, end: &str) -> Result<String, SmaliError>
    {
        if self.peek().map_or(false, |l| l.starts_with(".annotation"))
        {
            Ok(self.block(first, line_no, end)?.join("\n"))
        }
        else
        {
            if self.peek() == Some(end) { self.next(); }
            Ok(first.to_string())
        }
    }
}

fn err_at(line_no: usize, msg: impl std::fmt::Display) -> SmaliError
{
    SmaliError::new(&format!("line {line_no}: {msg}"))
}

fn parse_method(header: &str, header_no: usize, lines: &mut Lines) -> Result<SmaliMethod, SmaliError>
{
    let (rest, (modifiers, name, signature)) = parse_method_line(header)
        .map_err(|_| err_at(header_no, format!("bad method declaration `{header}`")))?;
    if !rest.trim().is_empty()
    {
        return Err(err_at(header_no, format!("unexpected `{}` after method signature", rest.trim())));
    }

    let mut method = SmaliMethod::new(&name, modifiers, signature, 0);
    let mut pending: Vec<Label> = vec![];

    loop
    {
        let (n, line) = lines
            .next()
            .ok_or_else(|| err_at(header_no, format!("method {name} has no .end method")))?;

        if line == ".end method"
        {
            for l in pending.drain(..) { method.push_label(l); }
            method.validate().map_err(|e| err_at(header_no, e))?;
            return Ok(method);
        }

        if let Ok((_, locals)) = parse_register_count(line, ".locals")
        {
            method.locals = locals;
        }
        else if let Ok((_, registers)) = parse_register_count(line, ".registers")
        {
            method.locals = registers.checked_sub(method.ins_size()).ok_or_else(|| {
                err_at(n, format!(".registers {registers} is smaller than the {} argument registers", method.ins_size()))
            })?;
        }
        else if line.starts_with(".param")
        {
            let directive = lines.optional_block(line, n, ".end param")?;
            method.directives.push(directive);
        }
        else if line.starts_with(".annotation")
        {
            method.directives.push(lines.block(line, n, ".end annotation")?.join("\n"));
        }
        else if line.starts_with(".catch")
        {
            method.catches.push(line.to_string());
        }
        else if is_debug_directive(line)
        {
            method.push_debug(line);
        }
        else if let Some((_, end)) = PAYLOADS.iter().find(|(start, _)| line.starts_with(start))
        {
            let body = lines.block(line, n, end)?;
            method.payloads.push(SmaliPayload { labels: std::mem::take(&mut pending), lines: body });
        }
        else if let Some(label) = parse_label_line(line)
        {
            pending.push(label);
        }
        else
        {
            let insn = parse_instruction(line).map_err(|e| err_at(n, e))?;
            for l in pending.drain(..) { method.push_label(l); }
            method.push(insn);
        }
    }
}

pub(crate) fn parse_class(smali: &str) -> Result<SmaliClass, SmaliError>
{
    let mut lines = Lines::new(smali);
    let mut name = None;
    let mut class = SmaliClass {
        name: ObjectIdentifier::from_java_type("java.lang.Object"),
        super_class: ObjectIdentifier::from_java_type("java.lang.Object"),
        source: None,
        directives: vec![],
        methods: vec![],
        modifiers: vec![],
        file_path: None
    };

    while let Some((n, line)) = lines.next()
    {
        if let Ok((_, (m, c))) = parse_class_line(line)
        {
            class.modifiers = m;
            name = Some(c);
        }
        else if let Ok((_, c)) = parse_super_line(line)
        {
            class.super_class = c;
        }
        else if let Ok((_, s)) = parse_source_line(line)
        {
            class.source = Some(s);
        }
        else if line.starts_with(".implements")
        {
            class.directives.push(line.to_string());
        }
        else if line.starts_with(".field")
        {
            let field = lines.optional_block(line, n, ".end field")?;
            class.directives.push(field);
        }
        else if line.starts_with(".annotation")
        {
            class.directives.push(lines.block(line, n, ".end annotation")?.join("\n"));
        }
        else if line.starts_with(".method")
        {
            class.methods.push(parse_method(line, n, &mut lines)?);
        }
        else
        {
            return Err(err_at(n, format!("unexpected `{line}`")));
        }
    }

    class.name = name.ok_or_else(|| SmaliError::new("Missing .class line"))?;
    Ok(class)
}
