use crate::smali_ops::SmaliRegister;
use crate::types::SmaliError;
use std::fmt;

/// Everything that can abort a single patch.
///
/// None of these are retried: the bytecode does not change between attempts, and
/// carrying on after one of them would write instructions against the wrong
/// registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError
{
    /// The anchor pattern matched no method, usually an incompatible app version.
    FingerprintNotFound { fingerprint: String },
    /// An expected literal is missing from an otherwise matched method.
    LiteralNotFound { literal: i64, method: String },
    /// A literal occurs more than once and the configuration asked for exactly one.
    DuplicateLiteral { literal: i64, method: String, indices: Vec<usize> },
    /// The instruction at `index` does not have the operand layout the analyzer relies on.
    RegisterShape { index: usize, expected: &'static str, found: String },
    IndexOutOfBounds { index: usize, len: usize },
    /// An injected instruction names a register outside the method frame.
    InvalidRegister { register: SmaliRegister, frame: String },
    /// Two patch points of one pass share an index.
    DuplicatePatchPoint { index: usize },
    ResourceNotFound { kind: String, name: String },
    UnknownPatch { name: String },
    DependencyCycle { patch: String },
    DependencyFailed { patch: String, dependency: String },
    Smali(SmaliError),
    Context { context: String, source: Box<PatchError> },
}

impl PatchError
{
    /// Wraps the error with a description of what was being done, e.g. the patch name.
    pub fn with_context(self, context: impl Into<String>) -> Self
    {
        PatchError::Context { context: context.into(), source: Box::new(self) }
    }

    /// Strips any context wrappers and returns the underlying error.
    pub fn root(&self) -> &PatchError
    {
        match self
        {
            PatchError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for PatchError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self
        {
            PatchError::FingerprintNotFound { fingerprint } =>
                write!(f, "Failed to resolve fingerprint {fingerprint}"),
            PatchError::LiteralNotFound { literal, method } =>
                write!(f, "Literal 0x{literal:x} not found in {method}"),
            PatchError::DuplicateLiteral { literal, method, indices } =>
                write!(f, "Literal 0x{literal:x} occurs {} times in {method} (indices {indices:?})", indices.len()),
            PatchError::RegisterShape { index, expected, found } =>
                write!(f, "Expected {expected} instruction at index {index}, found {found}"),
            PatchError::IndexOutOfBounds { index, len } =>
                write!(f, "Instruction index {index} out of bounds for method of {len} instructions"),
            PatchError::InvalidRegister { register, frame } =>
                write!(f, "Register {register} is outside the method frame ({frame})"),
            PatchError::DuplicatePatchPoint { index } =>
                write!(f, "Instruction index {index} patched more than once in a single pass"),
            PatchError::ResourceNotFound { kind, name } =>
                write!(f, "Resource {kind}/{name} has no id"),
            PatchError::UnknownPatch { name } => write!(f, "Unknown patch {name}"),
            PatchError::DependencyCycle { patch } =>
                write!(f, "Dependency cycle through patch {patch}"),
            PatchError::DependencyFailed { patch, dependency } =>
                write!(f, "Patch {patch} skipped because dependency {dependency} failed"),
            PatchError::Smali(e) => write!(f, "{e}"),
            PatchError::Context { context, source } => write!(f, "{source} for {context}"),
        }
    }
}

impl std::error::Error for PatchError
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)>
    {
        match self
        {
            PatchError::Smali(e) => Some(e),
            PatchError::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<SmaliError> for PatchError
{
    fn from(e: SmaliError) -> Self
    {
        PatchError::Smali(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_chains_like_dex_errors() {
        let e = PatchError::FingerprintNotFound { fingerprint: "SearchBarEntry".into() }
            .with_context("hide-trending-searches");
        assert_eq!(
            e.to_string(),
            "Failed to resolve fingerprint SearchBarEntry for hide-trending-searches"
        );
        assert_eq!(
            e.root(),
            &PatchError::FingerprintNotFound { fingerprint: "SearchBarEntry".into() }
        );
    }

    #[test]
    fn literal_errors_print_hex() {
        let e = PatchError::LiteralNotFound { literal: 0x7f080123, method: "a->b".into() };
        assert_eq!(e.to_string(), "Literal 0x7f080123 not found in a->b");
    }
}
