//! Structural fingerprints: locate a method, and a window inside it, by what the code looks
//! like rather than by name, since names are obfuscated differently in every app release.

use crate::dex::{Op, OpcodeClass};
use crate::smali_ops::{Instruction, Reference, SmaliRegister};
use crate::types::{Modifier, SmaliClass, SmaliMethod};
use log::debug;
use std::fmt;
use std::ops::Range;

/// Predicate for one instruction of a fingerprint pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Matches any instruction.
    Any,
    Op(Op),
    /// Any opcode of the class, e.g. every `iget*` variant.
    Class(OpcodeClass),
    /// A `const*` load of this value.
    Literal(i64),
}

impl Slot {
    pub fn matches(&self, insn: &Instruction) -> bool {
        match self {
            Slot::Any => true,
            Slot::Op(op) => insn.op() == *op,
            Slot::Class(class) => insn.op().class() == *class,
            Slot::Literal(value) => insn.loads_literal(*value),
        }
    }
}

impl From<Op> for Slot {
    fn from(op: Op) -> Self {
        Slot::Op(op)
    }
}

pub type WindowValidator = Box<dyn Fn(&[Instruction]) -> bool + Send + Sync>;
pub type MethodPredicate = Box<dyn Fn(&SmaliMethod, &SmaliClass) -> bool + Send + Sync>;

/// A reusable description of the method to patch.
///
/// Method level filters are checked first; then a window the length of the pattern slides
/// over the instructions and the first window where every slot holds (and the validator, if
/// any, accepts) is the match.
///
/// # Examples
///
/// ```
///  use smali_patcher::dex::{Op, OpcodeClass};
///  use smali_patcher::fingerprint::{Fingerprint, Slot};
///  use smali_patcher::types::Modifier;
///
///  let fp = Fingerprint::new("BindIcon")
///      .returns("Landroid/view/View;")
///      .modifiers(vec![Modifier::Public, Modifier::Final])
///      .pattern(vec![Slot::Class(OpcodeClass::InstanceField), Slot::Op(Op::Const), Slot::Any]);
///  assert_eq!(fp.name(), "BindIcon");
/// ```
pub struct Fingerprint {
    name: String,
    returns: Option<String>,
    modifiers: Vec<Modifier>,
    parameters: Option<Vec<String>>,
    strings: Vec<String>,
    pattern: Vec<Slot>,
    validator: Option<WindowValidator>,
    custom: Option<MethodPredicate>,
    scan_limit: Option<usize>,
}

impl Fingerprint {
    pub fn new(name: &str) -> Fingerprint {
        Fingerprint {
            name: name.to_string(),
            returns: None,
            modifiers: vec![],
            parameters: None,
            strings: vec![],
            pattern: vec![],
            validator: None,
            custom: None,
            scan_limit: None,
        }
    }

    /// Return type descriptor, compared as a prefix so `L` matches any object.
    pub fn returns(mut self, descriptor: &str) -> Self {
        self.returns = Some(descriptor.to_string());
        self
    }

    /// Modifiers the method must have; others are allowed.
    pub fn modifiers(mut self, modifiers: Vec<Modifier>) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Parameter descriptors. The count must be equal and each descriptor a prefix of the
    /// method's.
    pub fn parameters(mut self, parameters: &[&str]) -> Self {
        self.parameters = Some(parameters.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Strings the method must load with `const-string`.
    pub fn strings(mut self, strings: &[&str]) -> Self {
        self.strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn pattern(mut self, pattern: Vec<Slot>) -> Self {
        self.pattern = pattern;
        self
    }

    /// Extra check over a candidate window, e.g. comparing registers of two slots.
    pub fn validator(mut self, f: impl Fn(&[Instruction]) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Box::new(f));
        self
    }

    pub fn custom(
        mut self,
        f: impl Fn(&SmaliMethod, &SmaliClass) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.custom = Some(Box::new(f));
        self
    }

    pub fn scan_limit(mut self, limit: usize) -> Self {
        self.scan_limit = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The method level filters, without scanning the pattern.
    pub fn matches_method(&self, method: &SmaliMethod, class: &SmaliClass) -> bool {
        if let Some(r) = &self.returns {
            if !method.signature.result.to_jni().starts_with(r.as_str()) {
                return false;
            }
        }

        if !self.modifiers.iter().all(|m| method.modifiers.contains(m)) {
            return false;
        }

        if let Some(params) = &self.parameters {
            let args = &method.signature.args;
            if args.len() != params.len()
                || !args.iter().zip(params).all(|(a, p)| a.to_jni().starts_with(p.as_str()))
            {
                return false;
            }
        }

        let loads_string = |s: &String| {
            method
                .instructions()
                .iter()
                .any(|i| matches!(i.reference(), Some(Reference::String(r)) if r == s))
        };
        if !self.strings.iter().all(loads_string) {
            return false;
        }

        self.custom.as_ref().map_or(true, |f| f(method, class))
    }

    /// Finds the first window in `method` matching the pattern. An empty pattern matches the
    /// whole method. `default_limit` applies when the fingerprint sets no scan limit.
    pub fn scan(&self, method: &SmaliMethod, default_limit: Option<usize>) -> Option<Range<usize>> {
        let insns = method.instructions();
        if self.pattern.is_empty() {
            return Some(0..insns.len());
        }
        if insns.len() < self.pattern.len() {
            return None;
        }

        let mut starts = insns.len() - self.pattern.len() + 1;
        if let Some(limit) = self.scan_limit.or(default_limit) {
            starts = starts.min(limit);
        }

        (0..starts)
            .find(|&start| {
                let window = &insns[start..start + self.pattern.len()];
                self.pattern.iter().zip(window).all(|(slot, insn)| slot.matches(insn))
                    && self.validator.as_ref().map_or(true, |f| f(window))
            })
            .map(|start| start..start + self.pattern.len())
    }

    /// Filters and scan for a single method.
    pub fn match_method(
        &self,
        method: &SmaliMethod,
        class: &SmaliClass,
        default_limit: Option<usize>,
    ) -> Option<Range<usize>> {
        if !self.matches_method(method, class) {
            return None;
        }
        self.scan(method, default_limit)
    }

    /// Returns the first matching method across `classes`, in order.
    pub fn resolve(&self, classes: &[SmaliClass]) -> Option<MatchResult> {
        self.resolve_with_limit(classes, None)
    }

    pub fn resolve_with_limit(
        &self,
        classes: &[SmaliClass],
        default_limit: Option<usize>,
    ) -> Option<MatchResult> {
        for (class_index, class) in classes.iter().enumerate() {
            for (method_index, method) in class.methods.iter().enumerate() {
                if let Some(region) = self.match_method(method, class, default_limit) {
                    debug!(
                        "[fingerprint] {} matched {}->{} at {}..{}",
                        self.name,
                        class.name.as_jni_type(),
                        method.id(),
                        region.start,
                        region.end
                    );
                    return Some(MatchResult {
                        fingerprint: self.name.clone(),
                        class_index,
                        method_index,
                        class_name: class.name.as_jni_type(),
                        method_name: method.id(),
                        start: region.start,
                        end: region.end,
                        captured: method.instructions()[region].to_vec(),
                    });
                }
            }
        }
        None
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprint")
            .field("name", &self.name)
            .field("returns", &self.returns)
            .field("modifiers", &self.modifiers)
            .field("parameters", &self.parameters)
            .field("strings", &self.strings)
            .field("pattern", &self.pattern)
            .field("validator", &self.validator.is_some())
            .field("custom", &self.custom.is_some())
            .field("scan_limit", &self.scan_limit)
            .finish()
    }
}

/// Where a fingerprint matched. Indices are only valid until the method is patched.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub fingerprint: String,
    pub class_index: usize,
    pub method_index: usize,
    pub class_name: String,
    /// `name(args)result` of the matched method
    pub method_name: String,
    pub start: usize,
    pub end: usize,
    /// The instructions of the window as they were when matched.
    pub captured: Vec<Instruction>,
}

impl MatchResult {
    pub fn region(&self) -> Range<usize> {
        self.start..self.end
    }

    /// `class->name(args)result`, used in error messages.
    pub fn method_id(&self) -> String {
        format!("{}->{}", self.class_name, self.method_name)
    }

    /// Registers of the captured instruction at `slot`, counted from the window start.
    pub fn registers(&self, slot: usize) -> Option<&[SmaliRegister]> {
        self.captured.get(slot).map(|i| i.registers())
    }

    pub fn register_a(&self, slot: usize) -> Option<SmaliRegister> {
        self.captured.get(slot).and_then(|i| i.register_a())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smali_ops::parse_block;
    use crate::types::MethodSignature;

    fn method(body: &str) -> SmaliMethod {
        let sig = MethodSignature::from_jni("(Landroid/content/Context;I)Landroid/view/View;").unwrap();
        let mut m = SmaliMethod::new("bind", vec![Modifier::Public, Modifier::Final], sig, 8);
        for i in parse_block(body).unwrap() {
            m.push(i);
        }
        m
    }

    fn class(methods: Vec<SmaliMethod>) -> SmaliClass {
        let mut c = SmaliClass::from_smali(".class public LHost;\n.super Ljava/lang/Object;\n").unwrap();
        c.methods = methods;
        c
    }

    const BODY: &str = "
        const/4 v0, 0x0
        iget-object v1, p0, LHost;->icon:Landroid/widget/ImageView;
        const v2, 0x7f080123
        const-string v3, \"search\"
        iget-object v1, p0, LHost;->icon:Landroid/widget/ImageView;
        const v2, 0x7f080123
        return-object v1
    ";

    #[test]
    fn earliest_window_wins() {
        let fp = Fingerprint::new("Icon")
            .pattern(vec![Slot::Class(OpcodeClass::InstanceField), Slot::Literal(0x7f080123)]);
        let m = method(BODY);
        assert_eq!(fp.scan(&m, None), Some(1..3));
    }

    #[test]
    fn no_window_is_none() {
        let fp = Fingerprint::new("Icon").pattern(vec![Op::Const4.into(), Op::ReturnObject.into()]);
        assert_eq!(fp.scan(&method(BODY), None), None);
        assert_eq!(fp.scan(&method(""), None), None);
    }

    #[test]
    fn scan_limit_bounds_window_starts() {
        let fp = Fingerprint::new("Icon")
            .pattern(vec![Slot::Class(OpcodeClass::InstanceField), Slot::Literal(0x7f080123)]);
        let m = method(BODY);
        assert_eq!(fp.scan(&m, Some(1)), None);
        assert_eq!(fp.scan(&m, Some(2)), Some(1..3));
    }

    #[test]
    fn validator_rejects_windows() {
        let fp = Fingerprint::new("Icon")
            .pattern(vec![Op::ConstString.into(), Slot::Any])
            .validator(|w| w[1].op() == Op::Const);
        assert_eq!(fp.scan(&method(BODY), None), None);
    }

    #[test]
    fn method_filters() {
        let m = method(BODY);
        let c = class(vec![]);
        assert!(Fingerprint::new("a").returns("Landroid/view/View;").matches_method(&m, &c));
        assert!(!Fingerprint::new("b").returns("V").matches_method(&m, &c));
        assert!(!Fingerprint::new("c").modifiers(vec![Modifier::Static]).matches_method(&m, &c));
        assert!(Fingerprint::new("d").parameters(&["Landroid/content/", "I"]).matches_method(&m, &c));
        assert!(!Fingerprint::new("e").parameters(&["Landroid/content/"]).matches_method(&m, &c));
        assert!(Fingerprint::new("f").strings(&["search"]).matches_method(&m, &c));
        assert!(!Fingerprint::new("g").strings(&["trending"]).matches_method(&m, &c));
        assert!(!Fingerprint::new("h").custom(|m, _| m.name == "other").matches_method(&m, &c));
    }

    #[test]
    fn resolve_reports_location() {
        let c = class(vec![method("return-object p0"), method(BODY)]);
        let fp = Fingerprint::new("Icon").pattern(vec![Slot::Literal(0x7f080123)]);
        let r = fp.resolve(&[c]).unwrap();
        assert_eq!(r.method_index, 1);
        assert_eq!(r.region(), 2..3);
        assert_eq!(r.register_a(0), Some(crate::smali_ops::v(2)));
        assert_eq!(r.method_id(), "LHost;->bind(Landroid/content/Context;I)Landroid/view/View;");
    }

    #[test]
    fn empty_pattern_covers_method() {
        let fp = Fingerprint::new("Any");
        assert_eq!(fp.scan(&method(BODY), None), Some(0..7));
    }
}
