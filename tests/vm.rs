//! End-to-end tests: hand-built chunk bytes driven through the public
//! loader and dispatcher, mirroring how an embedder would exercise this
//! crate against a real compiler's output.

use chunk_vm::consts::*;
use chunk_vm::prelude::*;

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

fn write_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.is_empty() {
        buf.push(0x00);
        return;
    }
    buf.push((bytes.len() + 1) as u8);
    buf.extend_from_slice(bytes);
}

fn write_u32_vec(buf: &mut Vec<u8>, n: u32) {
    buf.extend_from_slice(&n.to_le_bytes());
}

enum ConstLit {
    Int(i64),
    Float(f64),
    Str(&'static [u8]),
}

fn write_constant(buf: &mut Vec<u8>, lit: &ConstLit) {
    match lit {
        ConstLit::Int(i) => {
            buf.push(0x13);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        ConstLit::Float(f) => {
            buf.push(0x03);
            buf.extend_from_slice(&f.to_le_bytes());
        }
        ConstLit::Str(s) => {
            buf.push(0x04);
            write_string(buf, s);
        }
    }
}

/// Build a complete chunk: fixed header, top-level upvalue-size byte, and a
/// single prototype with no nested functions or debug info.
fn chunk(code: &[u32], constants: &[ConstLit], max_stack_size: u8) -> Vec<u8> {
    let mut b = header();
    b.push(0); // top-level upvalue count

    write_string(&mut b, b"test"); // source
    write_u32_vec(&mut b, 0); // line_defined
    write_u32_vec(&mut b, 0); // last_line_defined
    b.push(0); // num_params
    b.push(0); // is_vararg
    b.push(max_stack_size);

    write_u32_vec(&mut b, code.len() as u32);
    for word in code {
        b.extend_from_slice(&word.to_le_bytes());
    }

    write_u32_vec(&mut b, constants.len() as u32);
    for c in constants {
        write_constant(&mut b, c);
    }

    write_u32_vec(&mut b, 0); // upvalues
    write_u32_vec(&mut b, 0); // nested protos
    write_u32_vec(&mut b, 0); // line_info
    write_u32_vec(&mut b, 0); // loc_vars
    write_u32_vec(&mut b, 0); // upvalue_names
    b
}

fn abc(op: Opcode, a: u32, b: u32, c: u32) -> u32 {
    (op as u32) | (a << 6) | (c << 14) | (b << 23)
}

fn abx(op: Opcode, a: u32, bx: u32) -> u32 {
    (op as u32) | (a << 6) | (bx << 14)
}

fn asbx(op: Opcode, a: u32, sbx: i32) -> u32 {
    abx(op, a, (sbx + MAXARG_SBX) as u32)
}

fn run(code: &[u32], constants: &[ConstLit], max_stack_size: u8) -> Vm {
    let bytes = chunk(code, constants, max_stack_size);
    let proto = load(&bytes).expect("chunk loads");
    let mut vm = Vm::new(proto);
    vm.run().expect("program runs to completion");
    vm
}

#[test]
fn integer_add_stays_an_integer() {
    let code = [
        abx(Opcode::LoadK, 0, 0),
        abx(Opcode::LoadK, 1, 1),
        abc(Opcode::Add, 2, 0, 1),
        abc(Opcode::Return, 0, 1, 0),
    ];
    let constants = [ConstLit::Int(1), ConstLit::Int(2)];
    let vm = run(&code, &constants, 3);
    assert!(matches!(vm.state().get_register(2).unwrap(), Value::Integer(3)));
}

#[test]
fn mixed_integer_and_float_add_promotes_to_float() {
    let code = [
        abx(Opcode::LoadK, 0, 0),
        abx(Opcode::LoadK, 1, 1),
        abc(Opcode::Add, 2, 0, 1),
        abc(Opcode::Return, 0, 1, 0),
    ];
    let constants = [ConstLit::Int(1), ConstLit::Float(2.5)];
    let vm = run(&code, &constants, 3);
    match vm.state().get_register(2).unwrap() {
        Value::Float(f) => assert_eq!(f, 3.5),
        other => panic!("expected a float result, got {other:?}"),
    }
}

#[test]
fn concat_coerces_numbers_to_their_display_string() {
    let code = [
        abx(Opcode::LoadK, 0, 0),
        abx(Opcode::LoadK, 1, 1),
        abc(Opcode::Concat, 2, 0, 1),
        abc(Opcode::Return, 0, 1, 0),
    ];
    let constants = [ConstLit::Str(b"foo"), ConstLit::Int(42)];
    let vm = run(&code, &constants, 3);
    let Value::String(s) = vm.state().get_register(2).unwrap() else {
        panic!("expected a string result");
    };
    assert_eq!(&*s, b"foo42");

    // CONCAT coerces its source registers in place, same as real `luaV_concat`.
    let Value::String(r0) = vm.state().get_register(0).unwrap() else {
        panic!("R(0) should still hold a string");
    };
    assert_eq!(&*r0, b"foo");
    let Value::String(r1) = vm.state().get_register(1).unwrap() else {
        panic!("R(1) should have been coerced to its string form");
    };
    assert_eq!(&*r1, b"42");
}

#[test]
fn newtable_settable_gettable_round_trip() {
    let code = [
        abc(Opcode::NewTable, 0, 0, 0),
        abx(Opcode::LoadK, 1, 0), // key
        abx(Opcode::LoadK, 2, 1), // value
        abc(Opcode::SetTable, 0, 1, 2),
        abc(Opcode::GetTable, 3, 0, 1),
        abc(Opcode::Return, 0, 1, 0),
    ];
    let constants = [ConstLit::Int(1), ConstLit::Int(7)];
    let vm = run(&code, &constants, 4);
    assert!(matches!(vm.state().get_register(3).unwrap(), Value::Integer(7)));
}

#[test]
fn numeric_for_loop_sums_one_through_three() {
    // R0..R2 = init/limit/step, R3 = FORLOOP's visible loop-variable copy,
    // R4 = the running sum.
    let code = [
        abx(Opcode::LoadK, 0, 0),             // 0: R0 = 1  (init)
        abx(Opcode::LoadK, 1, 1),             // 1: R1 = 3  (limit)
        abx(Opcode::LoadK, 2, 2),             // 2: R2 = 1  (step)
        abx(Opcode::LoadK, 4, 3),             // 3: R4 = 0  (sum)
        asbx(Opcode::ForPrep, 0, 1),          // 4: -> 6
        abc(Opcode::Add, 4, 4, 3),            // 5: R4 += R3
        asbx(Opcode::ForLoop, 0, -2),         // 6: -> 5 while continuing
        abc(Opcode::Return, 0, 1, 0),         // 7
    ];
    let constants = [ConstLit::Int(1), ConstLit::Int(3), ConstLit::Int(1), ConstLit::Int(0)];
    let vm = run(&code, &constants, 5);
    assert!(matches!(vm.state().get_register(4).unwrap(), Value::Integer(6)));
}

#[test]
fn wrong_version_byte_fails_before_any_prototype_is_produced() {
    let mut bytes = chunk(&[abc(Opcode::Return, 0, 1, 0)], &[], 1);
    bytes[4] = 0x52; // version offset in the fixed header
    let err = load(&bytes).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::ChunkHeaderMismatch { field: "version", .. }
    ));
}
