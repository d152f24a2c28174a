//! The builtin operator tag set.
//!
//! Tags are carried as constants in callee position and dispatched by the
//! specializer, which verifies operand types and produces the result type.
//! The arithmetic groups below mirror the code generator's instruction
//! selection one to one.

/// A builtin operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Introspection and staging support
    Dump,
    Undef,
    TypeOf,
    /// Select between two values on a bool or bool vector.
    Tertiary,

    // Conversions
    Bitcast,
    IntToPtr,
    PtrToInt,
    ITrunc,
    ZExt,
    SExt,
    FPTrunc,
    FPExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,

    // Aggregates
    ExtractValue,
    InsertValue,
    GetElementPtr,

    // Memory
    Load,
    VolatileLoad,
    Store,
    VolatileStore,
    Alloca,
    AllocaArray,
    Malloc,
    MallocArray,
    Free,

    // Integer comparisons
    ICmpEq,
    ICmpNe,
    ICmpUGt,
    ICmpUGe,
    ICmpULt,
    ICmpULe,
    ICmpSGt,
    ICmpSGe,
    ICmpSLt,
    ICmpSLe,

    // Real comparisons, ordered and unordered
    FCmpOEq,
    FCmpONe,
    FCmpOrd,
    FCmpOGt,
    FCmpOGe,
    FCmpOLt,
    FCmpOLe,
    FCmpUEq,
    FCmpUNe,
    FCmpUno,
    FCmpUGt,
    FCmpUGe,
    FCmpULt,
    FCmpULe,

    // Integer arithmetic; the NUW/NSW variants assert no unsigned/signed wrap
    Add,
    AddNuw,
    AddNsw,
    Sub,
    SubNuw,
    SubNsw,
    Mul,
    MulNuw,
    MulNsw,
    SDiv,
    UDiv,
    SRem,
    URem,
    BAnd,
    BOr,
    BXor,
    Shl,
    LShr,
    AShr,

    // Real arithmetic
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,

    // Unary
    FAbs,
    SSign,
    FSign,
    Radians,
    Degrees,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Exp,
    Log,
    Exp2,
    Log2,
    Trunc,
    Floor,
    Step,
    Pow,
    Sqrt,
    InverseSqrt,

    /// Linear blend of two values by a third.
    FMix,

    /// Count of variadic arguments. Folded by the expander, never typed
    /// here.
    VaCountOf,
}

impl Builtin {
    /// Binary operators over integers or integer vectors.
    pub fn is_integer_binary(self) -> bool {
        use Builtin::*;
        matches!(
            self,
            Add | AddNuw
                | AddNsw
                | Sub
                | SubNuw
                | SubNsw
                | Mul
                | MulNuw
                | MulNsw
                | SDiv
                | UDiv
                | SRem
                | URem
                | BAnd
                | BOr
                | BXor
                | Shl
                | LShr
                | AShr
        )
    }

    /// Binary operators over reals or real vectors.
    pub fn is_real_binary(self) -> bool {
        use Builtin::*;
        matches!(self, FAdd | FSub | FMul | FDiv | FRem | Atan2 | Step | Pow)
    }

    /// Unary operators over integers or integer vectors.
    pub fn is_integer_unary(self) -> bool {
        matches!(self, Builtin::SSign)
    }

    /// Unary operators over reals or real vectors.
    pub fn is_real_unary(self) -> bool {
        use Builtin::*;
        matches!(
            self,
            FAbs | FSign
                | Radians
                | Degrees
                | Sin
                | Cos
                | Tan
                | Asin
                | Acos
                | Atan
                | Exp
                | Log
                | Exp2
                | Log2
                | Trunc
                | Floor
                | Sqrt
                | InverseSqrt
        )
    }

    /// Ternary operators over reals or real vectors.
    pub fn is_real_ternary(self) -> bool {
        matches!(self, Builtin::FMix)
    }

    pub fn is_icmp(self) -> bool {
        use Builtin::*;
        matches!(
            self,
            ICmpEq | ICmpNe | ICmpUGt | ICmpUGe | ICmpULt | ICmpULe | ICmpSGt | ICmpSGe
                | ICmpSLt | ICmpSLe
        )
    }

    pub fn is_fcmp(self) -> bool {
        use Builtin::*;
        matches!(
            self,
            FCmpOEq | FCmpONe | FCmpOrd | FCmpOGt | FCmpOGe | FCmpOLt | FCmpOLe | FCmpUEq
                | FCmpUNe | FCmpUno | FCmpUGt | FCmpUGe | FCmpULt | FCmpULe
        )
    }

    pub fn name(self) -> &'static str {
        use Builtin::*;
        match self {
            Dump => "dump",
            Undef => "undef",
            TypeOf => "typeof",
            Tertiary => "?",
            Bitcast => "bitcast",
            IntToPtr => "inttoptr",
            PtrToInt => "ptrtoint",
            ITrunc => "itrunc",
            ZExt => "zext",
            SExt => "sext",
            FPTrunc => "fptrunc",
            FPExt => "fpext",
            FPToUI => "fptoui",
            FPToSI => "fptosi",
            UIToFP => "uitofp",
            SIToFP => "sitofp",
            ExtractValue => "extractvalue",
            InsertValue => "insertvalue",
            GetElementPtr => "getelementptr",
            Load => "load",
            VolatileLoad => "volatile-load",
            Store => "store",
            VolatileStore => "volatile-store",
            Alloca => "alloca",
            AllocaArray => "alloca-array",
            Malloc => "malloc",
            MallocArray => "malloc-array",
            Free => "free",
            ICmpEq => "icmp==",
            ICmpNe => "icmp!=",
            ICmpUGt => "icmp-u>",
            ICmpUGe => "icmp-u>=",
            ICmpULt => "icmp-u<",
            ICmpULe => "icmp-u<=",
            ICmpSGt => "icmp-s>",
            ICmpSGe => "icmp-s>=",
            ICmpSLt => "icmp-s<",
            ICmpSLe => "icmp-s<=",
            FCmpOEq => "fcmp-o==",
            FCmpONe => "fcmp-o!=",
            FCmpOrd => "fcmp-ord",
            FCmpOGt => "fcmp-o>",
            FCmpOGe => "fcmp-o>=",
            FCmpOLt => "fcmp-o<",
            FCmpOLe => "fcmp-o<=",
            FCmpUEq => "fcmp-u==",
            FCmpUNe => "fcmp-u!=",
            FCmpUno => "fcmp-uno",
            FCmpUGt => "fcmp-u>",
            FCmpUGe => "fcmp-u>=",
            FCmpULt => "fcmp-u<",
            FCmpULe => "fcmp-u<=",
            Add => "add",
            AddNuw => "add-nuw",
            AddNsw => "add-nsw",
            Sub => "sub",
            SubNuw => "sub-nuw",
            SubNsw => "sub-nsw",
            Mul => "mul",
            MulNuw => "mul-nuw",
            MulNsw => "mul-nsw",
            SDiv => "sdiv",
            UDiv => "udiv",
            SRem => "srem",
            URem => "urem",
            BAnd => "band",
            BOr => "bor",
            BXor => "bxor",
            Shl => "shl",
            LShr => "lshr",
            AShr => "ashr",
            FAdd => "fadd",
            FSub => "fsub",
            FMul => "fmul",
            FDiv => "fdiv",
            FRem => "frem",
            FAbs => "fabs",
            SSign => "ssign",
            FSign => "fsign",
            Radians => "radians",
            Degrees => "degrees",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Asin => "asin",
            Acos => "acos",
            Atan => "atan",
            Atan2 => "atan2",
            Exp => "exp",
            Log => "log",
            Exp2 => "exp2",
            Log2 => "log2",
            Trunc => "trunc",
            Floor => "floor",
            Step => "step",
            Pow => "pow",
            Sqrt => "sqrt",
            InverseSqrt => "inversesqrt",
            FMix => "fmix",
            VaCountOf => "va-countof",
        }
    }
}

impl std::fmt::Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
