//! Register choice at a patch point.
//!
//! The analysis is positional: a literal load at `i` writes a register that is overwritten
//! anyway, so it is free to reuse before `i`; and the instruction at `i - 1` is expected to
//! have put the object of interest into its register A. Nothing here tracks liveness, so a
//! layout that doesn't match is an error rather than a guess.

use crate::dex::RegisterShape;
use crate::error::PatchError;
use crate::smali_ops::SmaliRegister;
use crate::types::SmaliMethod;

/// Registers to use for a block inserted at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBinding {
    pub index: usize,
    /// Written by the instruction at `index`, so safe to clobber before it.
    pub free: SmaliRegister,
    /// Register A of the instruction at `index - 1`.
    pub source: SmaliRegister,
}

fn register_a(method: &SmaliMethod, index: usize, min_registers: usize, expected: &'static str) -> Result<SmaliRegister, PatchError> {
    let insn = method.instruction(index)?;
    let explicit = match insn.op().format().register_shape() {
        RegisterShape::One => 1,
        RegisterShape::Two => 2,
        RegisterShape::Three => 3,
        _ => 0,
    };
    match insn.register_a() {
        Some(reg) if explicit >= min_registers => Ok(reg),
        _ => Err(PatchError::RegisterShape { index, expected, found: insn.to_string() }),
    }
}

/// Register A of an instruction with at least one explicit register.
pub fn one_register(method: &SmaliMethod, index: usize) -> Result<SmaliRegister, PatchError> {
    register_a(method, index, 1, "one-register")
}

/// Register A of an instruction with at least two explicit registers.
pub fn two_register(method: &SmaliMethod, index: usize) -> Result<SmaliRegister, PatchError> {
    register_a(method, index, 2, "two-register")
}

pub fn bind(method: &SmaliMethod, index: usize) -> Result<RegisterBinding, PatchError> {
    let free = one_register(method, index)?;
    if index == 0 {
        return Err(PatchError::RegisterShape {
            index,
            expected: "two-register",
            found: "start of method".to_string(),
        });
    }
    let source = two_register(method, index - 1)?;
    Ok(RegisterBinding { index, free, source })
}

/// True when [`bind`] would succeed at `index`.
pub fn has_binding_layout(method: &SmaliMethod, index: usize) -> bool {
    bind(method, index).is_ok()
}
