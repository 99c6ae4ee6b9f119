use bitflags::bitflags;

/// Represents different types of references used by opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    None,
    String,
    Type,
    Field,
    Method,
    /// A method prototype, e.g. `(I)V`
    MethodProto,
    MethodHandle,
    CallSite,
}

// Defines various flags that can be associated with an opcode.
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpcodeFlags: u32 {
        const CAN_THROW = 0x1;
        const CAN_CONTINUE = 0x4;
        const SETS_RESULT = 0x8;
        const SETS_REGISTER = 0x10;
        const SETS_WIDE_REGISTER = 0x20;
        const STATIC_FIELD_ACCESSOR = 0x100;
    }
}

/// Coarse grouping of opcodes, used by fingerprints that don't care about the exact variant
/// (e.g. any `iget*` rather than `iget-object`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeClass {
    Nop,
    Move,
    MoveResult,
    Return,
    Const,
    ConstRef,
    Monitor,
    TypeCheck,
    Allocation,
    Throw,
    Goto,
    Switch,
    Compare,
    If,
    IfZero,
    ArrayAccess,
    InstanceField,
    StaticField,
    Invoke,
    Unary,
    Conversion,
    Binary,
    Binary2Addr,
    BinaryLiteral,
}

/// How many explicit registers an instruction format carries and how they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterShape {
    None,
    One,
    Two,
    Three,
    /// `{v0, v1, ...}`, at most five registers
    List,
    /// `{v0 .. vN}`
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Format10t,
    Format10x,
    Format11n,
    Format11x,
    Format12x,
    Format20t,
    Format21c,
    Format21ih,
    Format21lh,
    Format21s,
    Format21t,
    Format22b,
    Format22c,
    Format22s,
    Format22t,
    Format22x,
    Format23x,
    Format30t,
    Format31c,
    Format31i,
    Format31t,
    Format32x,
    Format35c,
    Format3rc,
    Format45cc,
    Format4rcc,
    Format51l,
}

impl Format {
    /// Returns the size in bytes of an instruction with this format.
    pub const fn size(&self) -> usize {
        match self {
            Format::Format10t
            | Format::Format10x
            | Format::Format11n
            | Format::Format11x
            | Format::Format12x => 2,

            Format::Format20t
            | Format::Format21c
            | Format::Format21ih
            | Format::Format21lh
            | Format::Format21s
            | Format::Format21t
            | Format::Format22b
            | Format::Format22c
            | Format::Format22s
            | Format::Format22t
            | Format::Format22x
            | Format::Format23x => 4,

            Format::Format30t
            | Format::Format31c
            | Format::Format31i
            | Format::Format31t
            | Format::Format32x
            | Format::Format35c
            | Format::Format3rc => 6,

            Format::Format45cc | Format::Format4rcc => 8,

            Format::Format51l => 10,
        }
    }

    pub const fn register_shape(&self) -> RegisterShape {
        match self {
            Format::Format10t | Format::Format10x | Format::Format20t | Format::Format30t => {
                RegisterShape::None
            }
            Format::Format11n
            | Format::Format11x
            | Format::Format21c
            | Format::Format21ih
            | Format::Format21lh
            | Format::Format21s
            | Format::Format21t
            | Format::Format31c
            | Format::Format31i
            | Format::Format31t
            | Format::Format51l => RegisterShape::One,
            Format::Format12x
            | Format::Format22b
            | Format::Format22c
            | Format::Format22s
            | Format::Format22t
            | Format::Format22x
            | Format::Format32x => RegisterShape::Two,
            Format::Format23x => RegisterShape::Three,
            Format::Format35c | Format::Format45cc => RegisterShape::List,
            Format::Format3rc | Format::Format4rcc => RegisterShape::Range,
        }
    }

    /// Largest register number each explicit register slot can encode.
    pub const fn register_limits(&self) -> &'static [u16] {
        match self {
            Format::Format11n => &[0xf],
            Format::Format12x | Format::Format22c | Format::Format22s | Format::Format22t => {
                &[0xf, 0xf]
            }
            Format::Format11x
            | Format::Format21c
            | Format::Format21ih
            | Format::Format21lh
            | Format::Format21s
            | Format::Format21t
            | Format::Format31c
            | Format::Format31i
            | Format::Format31t
            | Format::Format51l => &[0xff],
            Format::Format22b => &[0xff, 0xff],
            Format::Format23x => &[0xff, 0xff, 0xff],
            Format::Format22x => &[0xff, 0xffff],
            Format::Format32x => &[0xffff, 0xffff],
            Format::Format35c | Format::Format45cc => &[0xf, 0xf, 0xf, 0xf, 0xf],
            Format::Format3rc | Format::Format4rcc => &[0xffff],
            Format::Format10t | Format::Format10x | Format::Format20t | Format::Format30t => &[],
        }
    }

    /// Literal operand width in bits, if the format carries a literal.
    ///
    /// The high16 forms carry 16 bits of payload but the literal is kept as the full
    /// value, so they report the width of the register they load.
    pub const fn literal_bits(&self) -> Option<u32> {
        match self {
            Format::Format11n => Some(4),
            Format::Format22b => Some(8),
            Format::Format21s | Format::Format22s => Some(16),
            Format::Format21ih | Format::Format31i => Some(32),
            Format::Format21lh | Format::Format51l => Some(64),
            _ => None,
        }
    }

    /// The `invoke-polymorphic` forms carry a method prototype after the method reference.
    pub const fn has_proto_reference(&self) -> bool {
        matches!(self, Format::Format45cc | Format::Format4rcc)
    }

    pub const fn has_branch_target(&self) -> bool {
        matches!(
            self,
            Format::Format10t
                | Format::Format20t
                | Format::Format30t
                | Format::Format21t
                | Format::Format22t
                | Format::Format31t
        )
    }
}

/// Static description of one Dalvik opcode.
pub struct Opcode {
    pub value: u8,
    pub name: &'static str,
    pub format: Format,
    pub class: OpcodeClass,
    pub reference_type: ReferenceType,
    pub flags: OpcodeFlags,
}

impl Opcode {
    pub fn can_throw(&self) -> bool {
        self.flags.contains(OpcodeFlags::CAN_THROW)
    }

    pub fn can_continue(&self) -> bool {
        self.flags.contains(OpcodeFlags::CAN_CONTINUE)
    }

    pub fn sets_result(&self) -> bool {
        self.flags.contains(OpcodeFlags::SETS_RESULT)
    }

    pub fn sets_register(&self) -> bool {
        self.flags.contains(OpcodeFlags::SETS_REGISTER)
    }

    pub fn sets_wide_register(&self) -> bool {
        self.flags.contains(OpcodeFlags::SETS_WIDE_REGISTER)
    }

    pub fn is_static_field_accessor(&self) -> bool {
        self.flags.contains(OpcodeFlags::STATIC_FIELD_ACCESSOR)
    }

    /// True for the `const*` family that loads a plain number into a register.
    pub fn is_literal_load(&self) -> bool {
        self.class == OpcodeClass::Const
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_code_units() {
        assert_eq!(Format::Format11n.size(), 2);
        assert_eq!(Format::Format31i.size(), 6);
        assert_eq!(Format::Format45cc.size(), 8);
        assert_eq!(Format::Format51l.size(), 10);
    }

    #[test]
    fn shapes_and_limits_agree() {
        for f in [
            Format::Format11n,
            Format::Format12x,
            Format::Format22b,
            Format::Format22c,
            Format::Format23x,
            Format::Format11x,
        ] {
            let explicit = match f.register_shape() {
                RegisterShape::One => 1,
                RegisterShape::Two => 2,
                RegisterShape::Three => 3,
                _ => unreachable!(),
            };
            assert_eq!(f.register_limits().len(), explicit, "{f:?}");
        }
    }
}
