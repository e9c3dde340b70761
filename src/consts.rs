//! Chunk format and VM parameters

/* CHUNK HEADER */

/// Leading signature of every precompiled chunk.
pub const HEADER_SIGNATURE: [u8; 4] = [0x1b, b'L', b'u', b'a'];

/// Byte identifying the bytecode dialect this loader accepts.
pub const HEADER_VERSION: u8 = 0x53;

/// Format byte of the reference compiler ("official" format).
pub const HEADER_FORMAT: u8 = 0x00;

/// Fixed tag bytes used to detect data corruption in transfer.
pub const HEADER_DATA_TAG: [u8; 6] = [0x19, 0x93, 0x0D, 0x0A, 0x1A, 0x0A];

/// Expected `sizeof(int)` recorded in the header.
pub const HEADER_SIZE_INT: u8 = 4;

/// Expected `sizeof(size_t)` recorded in the header.
pub const HEADER_SIZE_SIZE_T: u8 = 8;

/// Expected `sizeof(Instruction)` recorded in the header.
pub const HEADER_SIZE_INSTRUCTION: u8 = 4;

/// Expected `sizeof(lua_Integer)` recorded in the header.
pub const HEADER_SIZE_INTEGER: u8 = 8;

/// Expected `sizeof(lua_Number)` recorded in the header.
pub const HEADER_SIZE_NUMBER: u8 = 8;

/// Literal value the endianness probe integer must decode to.
pub const HEADER_INT_PROBE: i64 = 0x5678;

/// Literal value the float probe must decode to.
pub const HEADER_NUMBER_PROBE: f64 = 370.5;

/// Total byte length of the fixed chunk header, up to and including the
/// number probe.
pub const HEADER_LEN: usize = 4 + 1 + 1 + 6 + 1 + 1 + 1 + 1 + 1 + 8 + 8;

/* STRING ENCODING */

/// A first length byte of this value marks an empty string.
pub const STRING_EMPTY_MARKER: u8 = 0x00;

/// A first length byte of this value marks a size_t-prefixed long string.
pub const STRING_LONG_MARKER: u8 = 0xFF;

/* CONSTANT TAGS */

pub const CONST_TAG_NIL: u8 = 0x00;
pub const CONST_TAG_BOOLEAN: u8 = 0x01;
pub const CONST_TAG_FLOAT: u8 = 0x03;
pub const CONST_TAG_INTEGER: u8 = 0x13;
pub const CONST_TAG_STRING_SHORT: u8 = 0x04;
pub const CONST_TAG_STRING_LONG: u8 = 0x14;

/* INSTRUCTION ENCODING */

/// Width, in bits, of the opcode field shared by every instruction layout.
pub const SIZE_OP: u32 = 6;

/// Width, in bits, of the `A` operand.
pub const SIZE_A: u32 = 8;

/// Width, in bits, of the `B`/`C` operands in the `IABC` layout.
pub const SIZE_BC: u32 = 9;

/// Width, in bits, of the combined `Bx`/`Ax` operand.
pub const SIZE_BX: u32 = 32 - SIZE_OP - SIZE_A;
pub const SIZE_AX: u32 = 32 - SIZE_OP;

/// Bias subtracted from `Bx` to recover a signed `sBx` operand.
pub const MAXARG_SBX: i32 = ((1i32 << SIZE_BX) - 1) >> 1;

/// High bit of the 9-bit RK field; when set, the low 8 bits index the
/// constant pool rather than a register.
pub const BITRK: u32 = 1 << (SIZE_BC - 1);

/// Number of list elements flushed per `SETLIST` batch.
pub const FIELDS_PER_FLUSH: u32 = 50;

/* VM PARAMETERS */

/// Extra stack slots reserved above a prototype's declared `max_stack_size`,
/// giving handlers room for transient pushes (e.g. `CONCAT`, `EQ`/`LT`/`LE`
/// temporaries) without growing the stack.
pub const DEFAULT_STACK_MARGIN: usize = 16;

/// Default ceiling on recursive prototype nesting while decoding a chunk,
/// guarding the reader against a corrupt or adversarial length field driving
/// unbounded recursion.
pub const DEFAULT_MAX_PROTO_DEPTH: usize = 200;
