/* Types describing smali classes and methods as the patcher sees them. */
/* Type names are kept in the smali native (also JNI) format e.g. Ljava/lang/Object; */

use crate::error::PatchError;
use crate::smali_ops::{Instruction, Label, SmaliRegister};
use crate::smali_parse::parse_class;
use crate::smali_write::write_class;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::char;
use nom::multi::many0;
use nom::IResult;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{fmt, fs};

/* Custom error for smali text that can't be parsed or instructions that don't validate */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmaliError {
    pub details: String,
}

impl SmaliError {
    pub fn new(msg: &str) -> SmaliError {
        SmaliError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for SmaliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for SmaliError {}

/// Represents a Java object identifier
///
/// # Examples
///
/// ```
///  use smali_patcher::types::ObjectIdentifier;
///
///  let o = ObjectIdentifier::from_java_type("com.google.android.Search");
///  assert_eq!(o.as_jni_type(), "Lcom/google/android/Search;");
///  assert_eq!(o.as_java_type(), "com.google.android.Search");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentifier {
    pub(crate) class_name: String,
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_jni_type())
    }
}

impl ObjectIdentifier {
    pub fn from_jni_type(t: &str) -> ObjectIdentifier {
        let t = t.trim();
        let class_name = t
            .strip_prefix('L')
            .and_then(|s| s.strip_suffix(';'))
            .unwrap_or(t);
        ObjectIdentifier {
            class_name: class_name.to_string(),
        }
    }

    pub fn from_java_type(t: &str) -> ObjectIdentifier {
        ObjectIdentifier {
            class_name: t.replace('.', "/"),
        }
    }

    pub fn as_jni_type(&self) -> String {
        format!("L{};", self.class_name)
    }

    pub fn as_java_type(&self) -> String {
        self.class_name.replace('/', ".")
    }
}

/// A field or parameter type in descriptor form.
///
/// # Examples
///
/// ```
///  use smali_patcher::types::TypeSignature;
///
///  let t = TypeSignature::from_jni("[Landroid/view/View;").unwrap();
///  assert_eq!(t.to_jni(), "[Landroid/view/View;");
///  assert_eq!(TypeSignature::Bool.to_jni(), "Z");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeSignature {
    Array(Box<TypeSignature>),
    Object(ObjectIdentifier),
    Int,
    Bool,
    Byte,
    Char,
    Short,
    Long,
    Float,
    Double,
    Void,
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_jni())
    }
}

impl TypeSignature {
    pub fn from_jni(s: &str) -> Result<TypeSignature, SmaliError> {
        match parse_typesignature(s) {
            Ok(("", ts)) => Ok(ts),
            _ => Err(SmaliError::new(&format!("Could not parse TypeSignature: {s}"))),
        }
    }

    pub fn to_jni(&self) -> String {
        match self {
            TypeSignature::Array(a) => "[".to_string() + &a.to_jni(),
            TypeSignature::Bool => "Z".to_string(),
            TypeSignature::Byte => "B".to_string(),
            TypeSignature::Char => "C".to_string(),
            TypeSignature::Short => "S".to_string(),
            TypeSignature::Int => "I".to_string(),
            TypeSignature::Long => "J".to_string(),
            TypeSignature::Float => "F".to_string(),
            TypeSignature::Double => "D".to_string(),
            TypeSignature::Object(o) => o.as_jni_type(),
            TypeSignature::Void => "V".to_string(),
        }
    }

    /// Number of registers a value of this type occupies.
    pub fn register_width(&self) -> u16 {
        match self {
            TypeSignature::Long | TypeSignature::Double => 2,
            TypeSignature::Void => 0,
            _ => 1,
        }
    }
}

/// Represents a Java method signature consisting of arguments and a return type
///
/// # Examples
///
/// ```
///  use smali_patcher::types::{MethodSignature, TypeSignature};
///
///  let m = MethodSignature::from_jni("(Landroid/widget/ImageView;Z)V").unwrap();
///  assert_eq!(m.result, TypeSignature::Void);
///  assert_eq!(m.args.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub args: Vec<TypeSignature>,
    pub result: TypeSignature,
}

impl MethodSignature {
    pub fn from_jni(s: &str) -> Result<MethodSignature, SmaliError> {
        match parse_methodsignature(s) {
            Ok(("", m)) => Ok(m),
            _ => Err(SmaliError::new(&format!("Could not parse MethodSignature: {s}"))),
        }
    }

    pub fn to_jni(&self) -> String {
        let mut s = String::from("(");
        for t in &self.args {
            s.push_str(&t.to_jni());
        }
        s.push(')');
        s.push_str(&self.result.to_jni());
        s
    }

    /// Registers taken by the arguments, not counting `this`.
    pub fn arg_registers(&self) -> u16 {
        self.args.iter().map(TypeSignature::register_width).sum()
    }
}

pub(crate) fn parse_typesignature(smali: &str) -> IResult<&str, TypeSignature> {
    // Object
    if let Ok((o, _)) = char::<_, nom::error::Error<&str>>('L')(smali) {
        let (o, t) = take_while1(|x| x != ';')(o)?;
        let (o, _) = char(';')(o)?;
        let object = ObjectIdentifier {
            class_name: t.to_string(),
        };
        return Ok((o, TypeSignature::Object(object)));
    }

    // Array
    if let Ok((o, _)) = char::<_, nom::error::Error<&str>>('[')(smali) {
        let (o, t) = parse_typesignature(o)?;
        return Ok((o, TypeSignature::Array(Box::new(t))));
    }

    //Primitive Type
    let (o, t) = alt((
        tag("Z"),
        tag("B"),
        tag("C"),
        tag("S"),
        tag("I"),
        tag("J"),
        tag("F"),
        tag("D"),
        tag("V"),
    ))(smali)?;
    let ts = match t {
        "Z" => TypeSignature::Bool,
        "B" => TypeSignature::Byte,
        "C" => TypeSignature::Char,
        "S" => TypeSignature::Short,
        "I" => TypeSignature::Int,
        "J" => TypeSignature::Long,
        "F" => TypeSignature::Float,
        "D" => TypeSignature::Double,
        _ => TypeSignature::Void,
    };
    Ok((o, ts))
}

pub(crate) fn parse_methodsignature(smali: &str) -> IResult<&str, MethodSignature> {
    let (o, _) = tag("(")(smali)?;
    let (o, args) = many0(parse_typesignature)(o)?;
    let (o, _) = tag(")")(o)?;
    let (o, result) = parse_typesignature(o)?;
    Ok((o, MethodSignature { args, result }))
}

/// Simple enum to represent Java method, field and class modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Static,
    Final,
    Synchronized,
    Volatile,
    Bridge,
    Transient,
    Varargs,
    Native,
    Interface,
    Abstract,
    Strict,
    Synthetic,
    Annotation,
    Enum,
    Constructor,
    DeclaredSynchronized,
}

impl FromStr for Modifier {
    type Err = SmaliError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "public" => Self::Public,
            "protected" => Self::Protected,
            "private" => Self::Private,
            "static" => Self::Static,
            "final" => Self::Final,
            "abstract" => Self::Abstract,
            "interface" => Self::Interface,
            "synthetic" => Self::Synthetic,
            "transient" => Self::Transient,
            "volatile" => Self::Volatile,
            "synchronized" => Self::Synchronized,
            "declared-synchronized" => Self::DeclaredSynchronized,
            "native" => Self::Native,
            "varargs" => Self::Varargs,
            "annotation" => Self::Annotation,
            "enum" => Self::Enum,
            "strict" => Self::Strict,
            "bridge" => Self::Bridge,
            "constructor" => Self::Constructor,
            _ => {
                return Err(SmaliError {
                    details: format!("Unknown modifier {s}"),
                });
            }
        })
    }
}

impl Modifier {
    pub fn to_str(&self) -> &str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
            Self::Static => "static",
            Self::Final => "final",
            Self::Abstract => "abstract",
            Self::Interface => "interface",
            Self::Synthetic => "synthetic",
            Self::Transient => "transient",
            Self::Volatile => "volatile",
            Self::Synchronized => "synchronized",
            Self::Native => "native",
            Self::Varargs => "varargs",
            Self::Annotation => "annotation",
            Self::Enum => "enum",
            Self::Strict => "strict",
            Self::Bridge => "bridge",
            Self::Constructor => "constructor",
            Self::DeclaredSynchronized => "declared-synchronized",
        }
    }
}

/// A payload block (`.packed-switch`, `.sparse-switch`, `.array-data`) kept verbatim with
/// the labels that name it.
#[derive(Debug, Clone, PartialEq)]
pub struct SmaliPayload {
    pub labels: Vec<Label>,
    pub lines: Vec<String>,
}

/// Struct representing a Java method
///
/// Instructions are addressed by index. Labels and debug directives (`.line`, `.local`,
/// `.prologue` ...) are bound to the index of the instruction they precede; they move with
/// that instruction when code is inserted in front of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SmaliMethod {
    /// Method name
    pub name: String,
    /// Method modifiers
    pub modifiers: Vec<Modifier>,
    /// Method signature
    pub signature: MethodSignature,
    /// Number of local (non-parameter) registers
    pub locals: u16,
    /// Annotations, `.param` blocks and other directives, written back untouched
    pub directives: Vec<String>,
    /// `.catch` / `.catchall` directives, written back untouched
    pub catches: Vec<String>,
    pub payloads: Vec<SmaliPayload>,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) labels: Vec<(Label, usize)>,
    pub(crate) debug: Vec<(String, usize)>,
}

impl SmaliMethod {
    pub fn new(name: &str, modifiers: Vec<Modifier>, signature: MethodSignature, locals: u16) -> SmaliMethod {
        SmaliMethod {
            name: name.to_string(),
            modifiers,
            signature,
            locals,
            directives: vec![],
            catches: vec![],
            payloads: vec![],
            instructions: vec![],
            labels: vec![],
            debug: vec![],
        }
    }

    /// Appends an instruction to the end of the method.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Binds a label to the next instruction pushed.
    pub fn push_label(&mut self, label: Label) {
        self.labels.push((label, self.instructions.len()));
    }

    /// Binds a debug directive to the next instruction pushed.
    pub fn push_debug(&mut self, directive: &str) {
        self.debug.push((directive.to_string(), self.instructions.len()));
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, index: usize) -> Result<&Instruction, PatchError> {
        self.instructions.get(index).ok_or(PatchError::IndexOutOfBounds {
            index,
            len: self.instructions.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn labels(&self) -> &[(Label, usize)] {
        &self.labels
    }

    pub fn label_index(&self, label: &Label) -> Option<usize> {
        self.labels.iter().find(|(l, _)| l == label).map(|(_, i)| *i)
    }

    /// Labels bound to the instruction at `index`.
    pub fn labels_at(&self, index: usize) -> impl Iterator<Item = &Label> {
        self.labels.iter().filter(move |(_, i)| *i == index).map(|(l, _)| l)
    }

    pub fn debug_directives(&self) -> &[(String, usize)] {
        &self.debug
    }

    /// Debug directives bound to the instruction at `index`, in source order.
    pub fn debug_at(&self, index: usize) -> impl Iterator<Item = &str> {
        self.debug.iter().filter(move |(_, i)| *i == index).map(|(d, _)| d.as_str())
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }

    /// Registers holding the incoming arguments, including `this`.
    pub fn ins_size(&self) -> u16 {
        self.signature.arg_registers() + u16::from(!self.is_static())
    }

    pub fn registers_size(&self) -> u16 {
        self.locals + self.ins_size()
    }

    /// The raw Dalvik register number a smali register refers to in this method.
    pub fn raw_register(&self, reg: SmaliRegister) -> u16 {
        match reg {
            SmaliRegister::Local(n) => n,
            SmaliRegister::Parameter(n) => self.locals + n,
        }
    }

    /// True when the register exists in this method's frame.
    pub fn has_register(&self, reg: SmaliRegister) -> bool {
        match reg {
            SmaliRegister::Local(n) => n < self.locals,
            SmaliRegister::Parameter(n) => n < self.ins_size(),
        }
    }

    /// `name(args)result`, unique within a class.
    pub fn id(&self) -> String {
        format!("{}{}", self.name, self.signature.to_jni())
    }

    /// Checks that every branch target names a bound label and every label is in range.
    pub fn validate(&self) -> Result<(), SmaliError> {
        for (label, index) in &self.labels {
            if *index > self.instructions.len() {
                return Err(SmaliError::new(&format!(
                    "Label {label} bound past the end of {}",
                    self.id()
                )));
            }
        }
        for (i, insn) in self.instructions.iter().enumerate() {
            if let Some(target) = insn.target() {
                let bound = self.label_index(target).is_some()
                    || self.payloads.iter().any(|p| p.labels.contains(target));
                if !bound {
                    return Err(SmaliError::new(&format!(
                        "Instruction {i} ({insn}) branches to unknown label {target} in {}",
                        self.id()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Represents a smali class i.e. the whole .smali file
///
/// # Examples
///
/// ```no_run
///  use std::path::Path;
///  use smali_patcher::types::SmaliClass;
///
///  let c = SmaliClass::read_from_file(Path::new("smali/com/cool/Class.smali")).expect("Uh oh, does the file exist?");
///  println!("Java class: {}", c.name.as_java_type());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SmaliClass {
    /// The name of this class
    pub name: ObjectIdentifier,
    /// Class modifiers
    pub modifiers: Vec<Modifier>,
    /// The source filename if included in the smali doc
    pub source: Option<String>,
    /// The class' superclass (every Java class has one)
    pub super_class: ObjectIdentifier,
    /// Interfaces, annotations and fields, written back untouched
    pub directives: Vec<String>,
    /// All the methods defined by the class
    pub methods: Vec<SmaliMethod>,

    // Internal
    /// The file path where this class was loaded from (.smali file)
    pub file_path: Option<PathBuf>,
}

impl SmaliClass {
    /// Creates a SmaliClass from a String containing a valid smali document
    pub fn from_smali(s: &str) -> Result<SmaliClass, SmaliError> {
        parse_class(s)
    }

    /// Creates a SmaliClass from a file containing a valid smali document
    pub fn read_from_file(path: &Path) -> Result<SmaliClass, SmaliError> {
        match fs::read_to_string(path) {
            Ok(s) => {
                let mut c = SmaliClass::from_smali(&s)?;
                c.file_path = Some(PathBuf::from(path));
                Ok(c)
            }
            Err(e) => Err(SmaliError {
                details: format!("Error loading file {}: {}", path.display(), e),
            }),
        }
    }

    /// Creates a smali document string from the current class
    pub fn to_smali(&self) -> String {
        write_class(self)
    }

    /// Writes the current SmaliClass to the specified file path as a smali document
    pub fn write_to_file(&self, path: &Path) -> Result<(), SmaliError> {
        fs::write(path, self.to_smali()).map_err(|e| SmaliError {
            details: e.to_string(),
        })
    }

    /// Writes the class back to the file it was loaded from
    pub fn save(&self) -> Result<(), SmaliError> {
        if let Some(p) = &self.file_path {
            self.write_to_file(p)
        } else {
            Err(SmaliError {
                details: format!(
                    "Unable to save, no file_path set for class: {}",
                    self.name.as_java_type()
                ),
            })
        }
    }

    pub fn find_method(&self, name: &str) -> Option<&SmaliMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smali_ops::{p, v};

    #[test]
    fn test_method_signature() {
        let ts = "(Landroid/content/Context;[IJ)Landroid/view/View;";
        let m = MethodSignature::from_jni(ts).unwrap();
        assert_eq!(m.to_jni(), ts);
        assert_eq!(m.arg_registers(), 4);
    }

    #[test]
    fn test_bad_signature() {
        assert!(MethodSignature::from_jni("(Lfoo").is_err());
        assert!(TypeSignature::from_jni("Q").is_err());
    }

    #[test]
    fn register_frame() {
        let sig = MethodSignature::from_jni("(Landroid/view/ViewGroup;J)V").unwrap();
        let m = SmaliMethod::new("bind", vec![Modifier::Public], sig, 4);
        assert_eq!(m.ins_size(), 4);
        assert_eq!(m.registers_size(), 8);
        assert_eq!(m.raw_register(p(0)), 4);
        assert!(m.has_register(v(3)));
        assert!(!m.has_register(v(4)));
        assert!(m.has_register(p(3)));
        assert!(!m.has_register(p(4)));
    }

    #[test]
    fn modifiers_round_trip() {
        for s in ["public", "strict", "declared-synchronized", "constructor"] {
            assert_eq!(Modifier::from_str(s).unwrap().to_str(), s);
        }
        assert!(Modifier::from_str("sealed").is_err());
    }
}
