//! Opcode table: the static description of every instruction the reference
//! bytecode dialect can express, independent of which ones this core
//! actually executes.

/// Instruction word layout selected by an opcode's table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    IABC,
    IABx,
    IAsBx,
    IAx,
}

/// How an operand field is meant to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    /// Argument is not used.
    N,
    /// Argument is used as an unsigned literal.
    U,
    /// Argument is a register index.
    R,
    /// Argument is a register index or a constant index (RK operand).
    K,
}

/// The full reference opcode set, in numeric order. Not every variant has a
/// handler in this core's dispatcher; see [`crate::interpreter::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Move = 0,
    LoadK,
    LoadKx,
    LoadBool,
    LoadNil,
    GetUpval,
    GetTabUp,
    GetTable,
    SetTabUp,
    SetUpval,
    SetTable,
    NewTable,
    Self_,
    Add,
    Sub,
    Mul,
    Mod,
    Pow,
    Div,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Unm,
    BNot,
    Not,
    Len,
    Concat,
    Jmp,
    Eq,
    Lt,
    Le,
    Test,
    TestSet,
    Call,
    TailCall,
    Return,
    ForLoop,
    ForPrep,
    TForCall,
    TForLoop,
    SetList,
    Closure,
    VarArg,
    ExtraArg,
}

/// A single row of the opcode table.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub name: &'static str,
    pub mode: OpMode,
    pub b_mode: ArgMode,
    pub c_mode: ArgMode,
    /// Whether this opcode writes register `A`.
    pub set_a: bool,
    /// Whether this opcode is always immediately followed by a jump
    /// instruction that must be executed unconditionally.
    pub test_flag: bool,
}

const fn info(
    name: &'static str,
    mode: OpMode,
    b_mode: ArgMode,
    c_mode: ArgMode,
    set_a: bool,
    test_flag: bool,
) -> OpcodeInfo {
    OpcodeInfo {
        name,
        mode,
        b_mode,
        c_mode,
        set_a,
        test_flag,
    }
}

use ArgMode::{K, N, R, U};
use OpMode::{IABC, IABx, IAsBx, IAx};

/// The opcode table, indexed by [`Opcode as u8`].
pub static OPCODES: [OpcodeInfo; 47] = [
    info("MOVE", IABC, R, N, true, false),
    info("LOADK", IABx, K, N, true, false),
    info("LOADKX", IABx, N, N, true, false),
    info("LOADBOOL", IABC, U, U, true, false),
    info("LOADNIL", IABC, U, N, true, false),
    info("GETUPVAL", IABC, U, N, true, false),
    info("GETTABUP", IABC, U, K, true, false),
    info("GETTABLE", IABC, R, K, true, false),
    info("SETTABUP", IABC, K, K, false, false),
    info("SETUPVAL", IABC, U, N, false, false),
    info("SETTABLE", IABC, K, K, false, false),
    info("NEWTABLE", IABC, U, U, true, false),
    info("SELF", IABC, R, K, true, false),
    info("ADD", IABC, K, K, true, false),
    info("SUB", IABC, K, K, true, false),
    info("MUL", IABC, K, K, true, false),
    info("MOD", IABC, K, K, true, false),
    info("POW", IABC, K, K, true, false),
    info("DIV", IABC, K, K, true, false),
    info("IDIV", IABC, K, K, true, false),
    info("BAND", IABC, K, K, true, false),
    info("BOR", IABC, K, K, true, false),
    info("BXOR", IABC, K, K, true, false),
    info("SHL", IABC, K, K, true, false),
    info("SHR", IABC, K, K, true, false),
    info("UNM", IABC, R, N, true, false),
    info("BNOT", IABC, R, N, true, false),
    info("NOT", IABC, R, N, true, false),
    info("LEN", IABC, R, N, true, false),
    info("CONCAT", IABC, R, R, true, false),
    info("JMP", IAsBx, N, N, false, false),
    info("EQ", IABC, K, K, false, true),
    info("LT", IABC, K, K, false, true),
    info("LE", IABC, K, K, false, true),
    info("TEST", IABC, N, U, false, true),
    info("TESTSET", IABC, R, U, true, true),
    info("CALL", IABC, U, U, true, false),
    info("TAILCALL", IABC, U, U, true, false),
    info("RETURN", IABC, U, N, false, false),
    info("FORLOOP", IAsBx, N, N, true, false),
    info("FORPREP", IAsBx, N, N, true, false),
    info("TFORCALL", IABC, N, U, false, false),
    info("TFORLOOP", IAsBx, N, N, true, false),
    info("SETLIST", IABC, U, U, false, false),
    info("CLOSURE", IABx, U, N, true, false),
    info("VARARG", IABC, U, N, true, false),
    info("EXTRAARG", IAx, N, N, false, false),
];

impl Opcode {
    /// Decode the low 6 bits of an instruction word into an [`Opcode`].
    pub fn from_byte(byte: u8) -> Option<Self> {
        use Opcode::*;
        Some(match byte {
            0 => Move,
            1 => LoadK,
            2 => LoadKx,
            3 => LoadBool,
            4 => LoadNil,
            5 => GetUpval,
            6 => GetTabUp,
            7 => GetTable,
            8 => SetTabUp,
            9 => SetUpval,
            10 => SetTable,
            11 => NewTable,
            12 => Self_,
            13 => Add,
            14 => Sub,
            15 => Mul,
            16 => Mod,
            17 => Pow,
            18 => Div,
            19 => IDiv,
            20 => BAnd,
            21 => BOr,
            22 => BXor,
            23 => Shl,
            24 => Shr,
            25 => Unm,
            26 => BNot,
            27 => Not,
            28 => Len,
            29 => Concat,
            30 => Jmp,
            31 => Eq,
            32 => Lt,
            33 => Le,
            34 => Test,
            35 => TestSet,
            36 => Call,
            37 => TailCall,
            38 => Return,
            39 => ForLoop,
            40 => ForPrep,
            41 => TForCall,
            42 => TForLoop,
            43 => SetList,
            44 => Closure,
            45 => VarArg,
            46 => ExtraArg,
            _ => return None,
        })
    }

    pub fn info(self) -> &'static OpcodeInfo {
        &OPCODES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn mode(self) -> OpMode {
        self.info().mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_total_over_the_reference_opcode_set() {
        assert_eq!(OPCODES.len(), 47);
        for byte in 0u8..47 {
            let op = Opcode::from_byte(byte).expect("every byte in range decodes");
            assert_eq!(op as u8, byte);
        }
    }

    #[test]
    fn out_of_range_byte_does_not_decode() {
        assert!(Opcode::from_byte(47).is_none());
        assert!(Opcode::from_byte(255).is_none());
    }

    #[test]
    fn move_is_register_in_register_out() {
        let info = Opcode::Move.info();
        assert_eq!(info.b_mode, ArgMode::R);
        assert!(info.set_a);
    }
}
