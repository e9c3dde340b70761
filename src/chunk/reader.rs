//! Byte-exact parser for the precompiled chunk format.

use std::rc::Rc;
use tracing::{trace, warn};

use crate::config::VmLimits;
use crate::consts::*;
use crate::error::{ErrorKind, VmError, VmResult};
use crate::prototype::{LocVar, Prototype, UpvalDesc};
use crate::value::{LuaStr, Value};

/// Decode `bytes` into the top-level [`Prototype`], under the default
/// [`VmLimits`].
pub fn load(bytes: &[u8]) -> VmResult<Rc<Prototype>> {
    load_with_limits(bytes, &VmLimits::default())
}

/// Decode `bytes` into the top-level [`Prototype`], bounding recursive
/// prototype nesting by `limits.max_proto_depth`.
pub fn load_with_limits(bytes: &[u8], limits: &VmLimits) -> VmResult<Rc<Prototype>> {
    let mut reader = ChunkReader::new(bytes, limits.max_proto_depth);
    reader.check_header()?;
    reader.read_u8()?; // size of upvalues at the top level; unused by this loader
    let proto = reader.read_proto(None)?;
    Ok(Rc::new(proto))
}

struct ChunkReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

fn corrupted(reason: impl Into<String>) -> VmError {
    VmError::loader(ErrorKind::ChunkCorrupted { reason: reason.into() })
}

impl<'a> ChunkReader<'a> {
    fn new(bytes: &'a [u8], max_depth: usize) -> Self {
        Self {
            bytes,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    fn take(&mut self, n: usize) -> VmResult<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(corrupted(format!(
                "unexpected end of chunk: wanted {n} byte(s) at offset {}, {} remaining",
                self.pos,
                self.bytes.len() - self.pos
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> VmResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_bool(&mut self) -> VmResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> VmResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes(b.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> VmResult<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes(b.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> VmResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    fn read_f64(&mut self) -> VmResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// `size==0` => empty; `size==0xFF` => a following u64 gives the real
    /// length; otherwise `size` itself is the length. In all non-empty
    /// cases the length counts a trailing NUL that is not payload.
    fn read_string(&mut self) -> VmResult<LuaStr> {
        let first = self.read_u8()?;
        let len = if first == STRING_EMPTY_MARKER {
            return Ok(Rc::from(Vec::new().into_boxed_slice()));
        } else if first == STRING_LONG_MARKER {
            self.read_u64()? as usize
        } else {
            first as usize
        };
        let payload_len = len.checked_sub(1).ok_or_else(|| corrupted("string length underflow"))?;
        let bytes = self.take(payload_len)?;
        Ok(Rc::from(bytes.to_vec().into_boxed_slice()))
    }

    fn read_vec<T>(&mut self, mut f: impl FnMut(&mut Self) -> VmResult<T>) -> VmResult<Vec<T>> {
        let n = self.read_u32()? as usize;
        let mut out = Vec::with_capacity(n.min(1 << 16));
        for _ in 0..n {
            out.push(f(self)?);
        }
        Ok(out)
    }

    fn expect_bytes(&mut self, field: &'static str, expected: &[u8]) -> VmResult<()> {
        let found = self.take(expected.len())?;
        if found != expected {
            warn!(field, "chunk header mismatch");
            return Err(VmError::loader(ErrorKind::ChunkHeaderMismatch {
                field,
                expected: expected.to_vec(),
                found: found.to_vec(),
            }));
        }
        Ok(())
    }

    fn check_header(&mut self) -> VmResult<()> {
        self.expect_bytes("signature", &HEADER_SIGNATURE)?;
        self.expect_bytes("version", &[HEADER_VERSION])?;
        self.expect_bytes("format", &[HEADER_FORMAT])?;
        self.expect_bytes("data_tag", &HEADER_DATA_TAG)?;
        self.expect_bytes("size_int", &[HEADER_SIZE_INT])?;
        self.expect_bytes("size_size_t", &[HEADER_SIZE_SIZE_T])?;
        self.expect_bytes("size_instruction", &[HEADER_SIZE_INSTRUCTION])?;
        self.expect_bytes("size_integer", &[HEADER_SIZE_INTEGER])?;
        self.expect_bytes("size_number", &[HEADER_SIZE_NUMBER])?;

        let probe_int = self.read_i64()?;
        if probe_int != HEADER_INT_PROBE {
            return Err(VmError::loader(ErrorKind::ChunkHeaderMismatch {
                field: "integer_probe",
                expected: HEADER_INT_PROBE.to_le_bytes().to_vec(),
                found: probe_int.to_le_bytes().to_vec(),
            }));
        }
        let probe_num = self.read_f64()?;
        if probe_num != HEADER_NUMBER_PROBE {
            return Err(VmError::loader(ErrorKind::ChunkHeaderMismatch {
                field: "number_probe",
                expected: HEADER_NUMBER_PROBE.to_le_bytes().to_vec(),
                found: probe_num.to_le_bytes().to_vec(),
            }));
        }
        Ok(())
    }

    fn read_constant(&mut self) -> VmResult<Value> {
        let tag = self.read_u8()?;
        Ok(match tag {
            CONST_TAG_NIL => Value::Nil,
            CONST_TAG_BOOLEAN => Value::Boolean(self.read_bool()?),
            CONST_TAG_FLOAT => Value::Float(self.read_f64()?),
            CONST_TAG_INTEGER => Value::Integer(self.read_i64()?),
            CONST_TAG_STRING_SHORT | CONST_TAG_STRING_LONG => Value::String(self.read_string()?),
            other => return Err(corrupted(format!("unknown constant tag {other:#x}"))),
        })
    }

    fn read_upvalue(&mut self) -> VmResult<UpvalDesc> {
        Ok(UpvalDesc {
            in_stack: self.read_bool()?,
            index: self.read_u8()?,
        })
    }

    fn read_loc_var(&mut self) -> VmResult<LocVar> {
        Ok(LocVar {
            name: self.read_string()?,
            start_pc: self.read_u32()?,
            end_pc: self.read_u32()?,
        })
    }

    fn read_proto(&mut self, parent_source: Option<&LuaStr>) -> VmResult<Prototype> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(corrupted("prototype nesting exceeds the depth limit"));
        }

        let source = self.read_string()?;
        let source = if source.is_empty() {
            parent_source.cloned().unwrap_or_else(|| Rc::from(Vec::new().into_boxed_slice()))
        } else {
            source
        };
        let line_defined = self.read_u32()?;
        let last_line_defined = self.read_u32()?;
        let num_params = self.read_u8()?;
        let is_vararg = self.read_bool()?;
        let max_stack_size = self.read_u8()?;

        let code = self.read_vec(|r| r.read_u32())?;
        let constants = self.read_vec(|r| r.read_constant())?;
        let upvalues = self.read_vec(|r| r.read_upvalue())?;
        let proto_source = source.clone();
        let protos = self.read_vec(|r| r.read_proto(Some(&proto_source)).map(Rc::new))?;
        let line_info = self.read_vec(|r| r.read_u32())?;
        let loc_vars = self.read_vec(|r| r.read_loc_var())?;
        let upvalue_names = self.read_vec(|r| r.read_string())?;

        self.depth -= 1;

        trace!(
            source = %String::from_utf8_lossy(&source),
            instructions = code.len(),
            constants = constants.len(),
            "parsed prototype"
        );

        Ok(Prototype {
            source,
            line_defined,
            last_line_defined,
            num_params,
            is_vararg,
            max_stack_size,
            code,
            constants,
            upvalues,
            protos,
            line_info,
            loc_vars,
            upvalue_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(&HEADER_SIGNATURE);
        h.push(HEADER_VERSION);
        h.push(HEADER_FORMAT);
        h.extend_from_slice(&HEADER_DATA_TAG);
        h.push(HEADER_SIZE_INT);
        h.push(HEADER_SIZE_SIZE_T);
        h.push(HEADER_SIZE_INSTRUCTION);
        h.push(HEADER_SIZE_INTEGER);
        h.push(HEADER_SIZE_NUMBER);
        h.extend_from_slice(&HEADER_INT_PROBE.to_le_bytes());
        h.extend_from_slice(&HEADER_NUMBER_PROBE.to_le_bytes());
        h
    }

    fn empty_proto_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        b.push(0); // empty source
        b.extend_from_slice(&0u32.to_le_bytes()); // line_defined
        b.extend_from_slice(&0u32.to_le_bytes()); // last_line_defined
        b.push(0); // num_params
        b.push(0); // is_vararg
        b.push(2); // max_stack_size
        b.extend_from_slice(&0u32.to_le_bytes()); // code count
        b.extend_from_slice(&0u32.to_le_bytes()); // constants count
        b.extend_from_slice(&0u32.to_le_bytes()); // upvalues count
        b.extend_from_slice(&0u32.to_le_bytes()); // protos count
        b.extend_from_slice(&0u32.to_le_bytes()); // line_info count
        b.extend_from_slice(&0u32.to_le_bytes()); // loc_vars count
        b.extend_from_slice(&0u32.to_le_bytes()); // upvalue_names count
        b
    }

    #[test]
    fn loads_minimal_chunk() {
        let mut bytes = header();
        bytes.push(0); // size of upvalues at top level
        bytes.extend(empty_proto_bytes());
        let proto = load(&bytes).unwrap();
        assert_eq!(proto.max_stack_size, 2);
        assert!(proto.code.is_empty());
    }

    #[test]
    fn wrong_version_byte_is_header_mismatch() {
        let mut bytes = header();
        bytes[4] = 0x52; // version offset
        bytes.push(0);
        bytes.extend(empty_proto_bytes());
        let err = load(&bytes).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ChunkHeaderMismatch { field: "version", .. }));
    }

    #[test]
    fn truncated_chunk_is_corrupted_not_a_panic() {
        let bytes = header();
        assert!(load(&bytes).is_err());
    }

    #[test]
    fn empty_string_marker_yields_empty_source() {
        let mut r = ChunkReader::new(&[0x00], DEFAULT_MAX_PROTO_DEPTH);
        let s = r.read_string().unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn short_string_payload_excludes_trailing_nul_length_byte() {
        // length byte 4 => payload is 3 bytes ("foo")
        let mut r = ChunkReader::new(&[4, b'f', b'o', b'o'], DEFAULT_MAX_PROTO_DEPTH);
        let s = r.read_string().unwrap();
        assert_eq!(&*s, b"foo");
    }
}
