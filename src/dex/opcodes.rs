//! The Dalvik opcode table.
//!
//! Only opcodes that can appear in smali produced for current ART are listed; odex-only and
//! quickened forms and payload pseudo-opcodes are not.

use crate::dex::opcode_format::{Format, Opcode, OpcodeClass, OpcodeFlags, ReferenceType};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

macro_rules! opcodes {
    ($( $variant:ident = $value:literal, $name:literal, $format:ident, $class:ident, $reference:ident, [$($flag:ident)|*]; )*) => {
        /// Identifies one Dalvik opcode. Metadata lives in the static table, see [`Op::info`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Op {
            $($variant,)*
        }

        // Same order as `Op` so that `op as usize` indexes it.
        static OPCODES: Lazy<Vec<Opcode>> = Lazy::new(|| {
            vec![
                $(
                    Opcode {
                        value: $value,
                        name: $name,
                        format: Format::$format,
                        class: OpcodeClass::$class,
                        reference_type: ReferenceType::$reference,
                        flags: OpcodeFlags::empty() $(| OpcodeFlags::$flag)*,
                    },
                )*
            ]
        });

        static ALL_OPS: &[Op] = &[$(Op::$variant,)*];
    };
}

opcodes! {
    Nop = 0x00, "nop", Format10x, Nop, None, [CAN_CONTINUE];
    Move = 0x01, "move", Format12x, Move, None, [CAN_CONTINUE | SETS_REGISTER];
    MoveFrom16 = 0x02, "move/from16", Format22x, Move, None, [CAN_CONTINUE | SETS_REGISTER];
    Move16 = 0x03, "move/16", Format32x, Move, None, [CAN_CONTINUE | SETS_REGISTER];
    MoveWide = 0x04, "move-wide", Format12x, Move, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    MoveWideFrom16 = 0x05, "move-wide/from16", Format22x, Move, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    MoveWide16 = 0x06, "move-wide/16", Format32x, Move, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    MoveObject = 0x07, "move-object", Format12x, Move, None, [CAN_CONTINUE | SETS_REGISTER];
    MoveObjectFrom16 = 0x08, "move-object/from16", Format22x, Move, None, [CAN_CONTINUE | SETS_REGISTER];
    MoveObject16 = 0x09, "move-object/16", Format32x, Move, None, [CAN_CONTINUE | SETS_REGISTER];
    MoveResult = 0x0a, "move-result", Format11x, MoveResult, None, [CAN_CONTINUE | SETS_REGISTER];
    MoveResultWide = 0x0b, "move-result-wide", Format11x, MoveResult, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    MoveResultObject = 0x0c, "move-result-object", Format11x, MoveResult, None, [CAN_CONTINUE | SETS_REGISTER];
    MoveException = 0x0d, "move-exception", Format11x, MoveResult, None, [CAN_CONTINUE | SETS_REGISTER];
    ReturnVoid = 0x0e, "return-void", Format10x, Return, None, [];
    Return = 0x0f, "return", Format11x, Return, None, [];
    ReturnWide = 0x10, "return-wide", Format11x, Return, None, [];
    ReturnObject = 0x11, "return-object", Format11x, Return, None, [];
    Const4 = 0x12, "const/4", Format11n, Const, None, [CAN_CONTINUE | SETS_REGISTER];
    Const16 = 0x13, "const/16", Format21s, Const, None, [CAN_CONTINUE | SETS_REGISTER];
    Const = 0x14, "const", Format31i, Const, None, [CAN_CONTINUE | SETS_REGISTER];
    ConstHigh16 = 0x15, "const/high16", Format21ih, Const, None, [CAN_CONTINUE | SETS_REGISTER];
    ConstWide16 = 0x16, "const-wide/16", Format21s, Const, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    ConstWide32 = 0x17, "const-wide/32", Format31i, Const, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    ConstWide = 0x18, "const-wide", Format51l, Const, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    ConstWideHigh16 = 0x19, "const-wide/high16", Format21lh, Const, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    ConstString = 0x1a, "const-string", Format21c, ConstRef, String, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    ConstStringJumbo = 0x1b, "const-string/jumbo", Format31c, ConstRef, String, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    ConstClass = 0x1c, "const-class", Format21c, ConstRef, Type, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    MonitorEnter = 0x1d, "monitor-enter", Format11x, Monitor, None, [CAN_THROW | CAN_CONTINUE];
    MonitorExit = 0x1e, "monitor-exit", Format11x, Monitor, None, [CAN_THROW | CAN_CONTINUE];
    CheckCast = 0x1f, "check-cast", Format21c, TypeCheck, Type, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    InstanceOf = 0x20, "instance-of", Format22c, TypeCheck, Type, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    ArrayLength = 0x21, "array-length", Format12x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    NewInstance = 0x22, "new-instance", Format21c, Allocation, Type, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    NewArray = 0x23, "new-array", Format22c, Allocation, Type, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    FilledNewArray = 0x24, "filled-new-array", Format35c, Allocation, Type, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    FilledNewArrayRange = 0x25, "filled-new-array/range", Format3rc, Allocation, Type, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    FillArrayData = 0x26, "fill-array-data", Format31t, Allocation, None, [CAN_THROW | CAN_CONTINUE];
    Throw = 0x27, "throw", Format11x, Throw, None, [CAN_THROW];
    Goto = 0x28, "goto", Format10t, Goto, None, [];
    Goto16 = 0x29, "goto/16", Format20t, Goto, None, [];
    Goto32 = 0x2a, "goto/32", Format30t, Goto, None, [];
    PackedSwitch = 0x2b, "packed-switch", Format31t, Switch, None, [CAN_CONTINUE];
    SparseSwitch = 0x2c, "sparse-switch", Format31t, Switch, None, [CAN_CONTINUE];
    CmplFloat = 0x2d, "cmpl-float", Format23x, Compare, None, [CAN_CONTINUE | SETS_REGISTER];
    CmpgFloat = 0x2e, "cmpg-float", Format23x, Compare, None, [CAN_CONTINUE | SETS_REGISTER];
    CmplDouble = 0x2f, "cmpl-double", Format23x, Compare, None, [CAN_CONTINUE | SETS_REGISTER];
    CmpgDouble = 0x30, "cmpg-double", Format23x, Compare, None, [CAN_CONTINUE | SETS_REGISTER];
    CmpLong = 0x31, "cmp-long", Format23x, Compare, None, [CAN_CONTINUE | SETS_REGISTER];
    IfEq = 0x32, "if-eq", Format22t, If, None, [CAN_CONTINUE];
    IfNe = 0x33, "if-ne", Format22t, If, None, [CAN_CONTINUE];
    IfLt = 0x34, "if-lt", Format22t, If, None, [CAN_CONTINUE];
    IfGe = 0x35, "if-ge", Format22t, If, None, [CAN_CONTINUE];
    IfGt = 0x36, "if-gt", Format22t, If, None, [CAN_CONTINUE];
    IfLe = 0x37, "if-le", Format22t, If, None, [CAN_CONTINUE];
    IfEqz = 0x38, "if-eqz", Format21t, IfZero, None, [CAN_CONTINUE];
    IfNez = 0x39, "if-nez", Format21t, IfZero, None, [CAN_CONTINUE];
    IfLtz = 0x3a, "if-ltz", Format21t, IfZero, None, [CAN_CONTINUE];
    IfGez = 0x3b, "if-gez", Format21t, IfZero, None, [CAN_CONTINUE];
    IfGtz = 0x3c, "if-gtz", Format21t, IfZero, None, [CAN_CONTINUE];
    IfLez = 0x3d, "if-lez", Format21t, IfZero, None, [CAN_CONTINUE];
    AGet = 0x44, "aget", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    AGetWide = 0x45, "aget-wide", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    AGetObject = 0x46, "aget-object", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    AGetBoolean = 0x47, "aget-boolean", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    AGetByte = 0x48, "aget-byte", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    AGetChar = 0x49, "aget-char", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    AGetShort = 0x4a, "aget-short", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    APut = 0x4b, "aput", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE];
    APutWide = 0x4c, "aput-wide", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE];
    APutObject = 0x4d, "aput-object", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE];
    APutBoolean = 0x4e, "aput-boolean", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE];
    APutByte = 0x4f, "aput-byte", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE];
    APutChar = 0x50, "aput-char", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE];
    APutShort = 0x51, "aput-short", Format23x, ArrayAccess, None, [CAN_THROW | CAN_CONTINUE];
    IGet = 0x52, "iget", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    IGetWide = 0x53, "iget-wide", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    IGetObject = 0x54, "iget-object", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    IGetBoolean = 0x55, "iget-boolean", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    IGetByte = 0x56, "iget-byte", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    IGetChar = 0x57, "iget-char", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    IGetShort = 0x58, "iget-short", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    IPut = 0x59, "iput", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE];
    IPutWide = 0x5a, "iput-wide", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE];
    IPutObject = 0x5b, "iput-object", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE];
    IPutBoolean = 0x5c, "iput-boolean", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE];
    IPutByte = 0x5d, "iput-byte", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE];
    IPutChar = 0x5e, "iput-char", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE];
    IPutShort = 0x5f, "iput-short", Format22c, InstanceField, Field, [CAN_THROW | CAN_CONTINUE];
    SGet = 0x60, "sget", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | STATIC_FIELD_ACCESSOR];
    SGetWide = 0x61, "sget-wide", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER | STATIC_FIELD_ACCESSOR];
    SGetObject = 0x62, "sget-object", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | STATIC_FIELD_ACCESSOR];
    SGetBoolean = 0x63, "sget-boolean", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | STATIC_FIELD_ACCESSOR];
    SGetByte = 0x64, "sget-byte", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | STATIC_FIELD_ACCESSOR];
    SGetChar = 0x65, "sget-char", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | STATIC_FIELD_ACCESSOR];
    SGetShort = 0x66, "sget-short", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | STATIC_FIELD_ACCESSOR];
    SPut = 0x67, "sput", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | STATIC_FIELD_ACCESSOR];
    SPutWide = 0x68, "sput-wide", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | STATIC_FIELD_ACCESSOR];
    SPutObject = 0x69, "sput-object", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | STATIC_FIELD_ACCESSOR];
    SPutBoolean = 0x6a, "sput-boolean", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | STATIC_FIELD_ACCESSOR];
    SPutByte = 0x6b, "sput-byte", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | STATIC_FIELD_ACCESSOR];
    SPutChar = 0x6c, "sput-char", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | STATIC_FIELD_ACCESSOR];
    SPutShort = 0x6d, "sput-short", Format21c, StaticField, Field, [CAN_THROW | CAN_CONTINUE | STATIC_FIELD_ACCESSOR];
    InvokeVirtual = 0x6e, "invoke-virtual", Format35c, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeSuper = 0x6f, "invoke-super", Format35c, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeDirect = 0x70, "invoke-direct", Format35c, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeStatic = 0x71, "invoke-static", Format35c, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeInterface = 0x72, "invoke-interface", Format35c, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeVirtualRange = 0x74, "invoke-virtual/range", Format3rc, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeSuperRange = 0x75, "invoke-super/range", Format3rc, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeDirectRange = 0x76, "invoke-direct/range", Format3rc, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeStaticRange = 0x77, "invoke-static/range", Format3rc, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeInterfaceRange = 0x78, "invoke-interface/range", Format3rc, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    NegInt = 0x7b, "neg-int", Format12x, Unary, None, [CAN_CONTINUE | SETS_REGISTER];
    NotInt = 0x7c, "not-int", Format12x, Unary, None, [CAN_CONTINUE | SETS_REGISTER];
    NegLong = 0x7d, "neg-long", Format12x, Unary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    NotLong = 0x7e, "not-long", Format12x, Unary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    NegFloat = 0x7f, "neg-float", Format12x, Unary, None, [CAN_CONTINUE | SETS_REGISTER];
    NegDouble = 0x80, "neg-double", Format12x, Unary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    IntToLong = 0x81, "int-to-long", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    IntToFloat = 0x82, "int-to-float", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER];
    IntToDouble = 0x83, "int-to-double", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    LongToInt = 0x84, "long-to-int", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER];
    LongToFloat = 0x85, "long-to-float", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER];
    LongToDouble = 0x86, "long-to-double", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    FloatToInt = 0x87, "float-to-int", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER];
    FloatToLong = 0x88, "float-to-long", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    FloatToDouble = 0x89, "float-to-double", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    DoubleToInt = 0x8a, "double-to-int", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER];
    DoubleToLong = 0x8b, "double-to-long", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    DoubleToFloat = 0x8c, "double-to-float", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER];
    IntToByte = 0x8d, "int-to-byte", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER];
    IntToChar = 0x8e, "int-to-char", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER];
    IntToShort = 0x8f, "int-to-short", Format12x, Conversion, None, [CAN_CONTINUE | SETS_REGISTER];
    AddInt = 0x90, "add-int", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    SubInt = 0x91, "sub-int", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    MulInt = 0x92, "mul-int", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    DivInt = 0x93, "div-int", Format23x, Binary, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    RemInt = 0x94, "rem-int", Format23x, Binary, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    AndInt = 0x95, "and-int", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    OrInt = 0x96, "or-int", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    XorInt = 0x97, "xor-int", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    ShlInt = 0x98, "shl-int", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    ShrInt = 0x99, "shr-int", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    UshrInt = 0x9a, "ushr-int", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    AddLong = 0x9b, "add-long", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    SubLong = 0x9c, "sub-long", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    MulLong = 0x9d, "mul-long", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    DivLong = 0x9e, "div-long", Format23x, Binary, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    RemLong = 0x9f, "rem-long", Format23x, Binary, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    AndLong = 0xa0, "and-long", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    OrLong = 0xa1, "or-long", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    XorLong = 0xa2, "xor-long", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    ShlLong = 0xa3, "shl-long", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    ShrLong = 0xa4, "shr-long", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    UshrLong = 0xa5, "ushr-long", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    AddFloat = 0xa6, "add-float", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    SubFloat = 0xa7, "sub-float", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    MulFloat = 0xa8, "mul-float", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    DivFloat = 0xa9, "div-float", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    RemFloat = 0xaa, "rem-float", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER];
    AddDouble = 0xab, "add-double", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    SubDouble = 0xac, "sub-double", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    MulDouble = 0xad, "mul-double", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    DivDouble = 0xae, "div-double", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    RemDouble = 0xaf, "rem-double", Format23x, Binary, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    AddInt2Addr = 0xb0, "add-int/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    SubInt2Addr = 0xb1, "sub-int/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    MulInt2Addr = 0xb2, "mul-int/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    DivInt2Addr = 0xb3, "div-int/2addr", Format12x, Binary2Addr, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    RemInt2Addr = 0xb4, "rem-int/2addr", Format12x, Binary2Addr, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    AndInt2Addr = 0xb5, "and-int/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    OrInt2Addr = 0xb6, "or-int/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    XorInt2Addr = 0xb7, "xor-int/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    ShlInt2Addr = 0xb8, "shl-int/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    ShrInt2Addr = 0xb9, "shr-int/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    UshrInt2Addr = 0xba, "ushr-int/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    AddLong2Addr = 0xbb, "add-long/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    SubLong2Addr = 0xbc, "sub-long/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    MulLong2Addr = 0xbd, "mul-long/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    DivLong2Addr = 0xbe, "div-long/2addr", Format12x, Binary2Addr, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    RemLong2Addr = 0xbf, "rem-long/2addr", Format12x, Binary2Addr, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    AndLong2Addr = 0xc0, "and-long/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    OrLong2Addr = 0xc1, "or-long/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    XorLong2Addr = 0xc2, "xor-long/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    ShlLong2Addr = 0xc3, "shl-long/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    ShrLong2Addr = 0xc4, "shr-long/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    UshrLong2Addr = 0xc5, "ushr-long/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    AddFloat2Addr = 0xc6, "add-float/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    SubFloat2Addr = 0xc7, "sub-float/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    MulFloat2Addr = 0xc8, "mul-float/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    DivFloat2Addr = 0xc9, "div-float/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    RemFloat2Addr = 0xca, "rem-float/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER];
    AddDouble2Addr = 0xcb, "add-double/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    SubDouble2Addr = 0xcc, "sub-double/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    MulDouble2Addr = 0xcd, "mul-double/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    DivDouble2Addr = 0xce, "div-double/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    RemDouble2Addr = 0xcf, "rem-double/2addr", Format12x, Binary2Addr, None, [CAN_CONTINUE | SETS_REGISTER | SETS_WIDE_REGISTER];
    AddIntLit16 = 0xd0, "add-int/lit16", Format22s, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    RSubInt = 0xd1, "rsub-int", Format22s, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    MulIntLit16 = 0xd2, "mul-int/lit16", Format22s, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    DivIntLit16 = 0xd3, "div-int/lit16", Format22s, BinaryLiteral, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    RemIntLit16 = 0xd4, "rem-int/lit16", Format22s, BinaryLiteral, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    AndIntLit16 = 0xd5, "and-int/lit16", Format22s, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    OrIntLit16 = 0xd6, "or-int/lit16", Format22s, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    XorIntLit16 = 0xd7, "xor-int/lit16", Format22s, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    AddIntLit8 = 0xd8, "add-int/lit8", Format22b, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    RSubIntLit8 = 0xd9, "rsub-int/lit8", Format22b, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    MulIntLit8 = 0xda, "mul-int/lit8", Format22b, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    DivIntLit8 = 0xdb, "div-int/lit8", Format22b, BinaryLiteral, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    RemIntLit8 = 0xdc, "rem-int/lit8", Format22b, BinaryLiteral, None, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    AndIntLit8 = 0xdd, "and-int/lit8", Format22b, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    OrIntLit8 = 0xde, "or-int/lit8", Format22b, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    XorIntLit8 = 0xdf, "xor-int/lit8", Format22b, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    ShlIntLit8 = 0xe0, "shl-int/lit8", Format22b, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    ShrIntLit8 = 0xe1, "shr-int/lit8", Format22b, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    UshrIntLit8 = 0xe2, "ushr-int/lit8", Format22b, BinaryLiteral, None, [CAN_CONTINUE | SETS_REGISTER];
    InvokePolymorphic = 0xfa, "invoke-polymorphic", Format45cc, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokePolymorphicRange = 0xfb, "invoke-polymorphic/range", Format4rcc, Invoke, Method, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeCustom = 0xfc, "invoke-custom", Format35c, Invoke, CallSite, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    InvokeCustomRange = 0xfd, "invoke-custom/range", Format3rc, Invoke, CallSite, [CAN_THROW | CAN_CONTINUE | SETS_RESULT];
    ConstMethodHandle = 0xfe, "const-method-handle", Format21c, ConstRef, MethodHandle, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
    ConstMethodType = 0xff, "const-method-type", Format21c, ConstRef, MethodProto, [CAN_THROW | CAN_CONTINUE | SETS_REGISTER];
}

static OPS_BY_NAME: Lazy<HashMap<&'static str, Op>> =
    Lazy::new(|| ALL_OPS.iter().map(|op| (op.name(), *op)).collect());

impl Op {
    pub fn info(self) -> &'static Opcode {
        &OPCODES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn value(self) -> u8 {
        self.info().value
    }

    pub fn format(self) -> Format {
        self.info().format
    }

    pub fn class(self) -> OpcodeClass {
        self.info().class
    }

    /// Looks up an opcode by its smali mnemonic, e.g. `"iget-object"`.
    pub fn from_name(name: &str) -> Option<Op> {
        OPS_BY_NAME.get(name).copied()
    }

    pub fn all() -> &'static [Op] {
        ALL_OPS
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_in_enum_order() {
        for op in Op::all() {
            assert_eq!(Op::from_name(op.name()), Some(*op));
        }
        // values strictly increase through the table
        for pair in Op::all().windows(2) {
            assert!(pair[0].value() < pair[1].value(), "{} / {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(Op::from_name("const/4"), Some(Op::Const4));
        assert_eq!(Op::from_name("invoke-static/range"), Some(Op::InvokeStaticRange));
        assert_eq!(Op::from_name("ushr-int/lit8").map(Op::value), Some(0xe2));
        assert_eq!(Op::from_name("invoke-polymorphic/range").map(Op::value), Some(0xfb));
        assert_eq!(Op::from_name("const-method-type"), Some(Op::ConstMethodType));
        assert_eq!(Op::from_name("invoke-quick"), None);
    }

    #[test]
    fn metadata() {
        assert_eq!(Op::Const.format(), Format::Format31i);
        assert!(Op::ConstWide.info().sets_wide_register());
        assert!(Op::SGetObject.info().is_static_field_accessor());
        assert_eq!(Op::IGetObject.info().reference_type, ReferenceType::Field);
        assert!(!Op::ReturnVoid.info().can_continue());
        assert_eq!(Op::AddInt2Addr.class(), OpcodeClass::Binary2Addr);
        assert!(Op::InvokePolymorphic.format().has_proto_reference());
        assert_eq!(Op::InvokeCustom.info().reference_type, ReferenceType::CallSite);
    }
}
