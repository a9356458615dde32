//! Stream reading, packing and pretty-printing.

use bitstrings::{pack, pack_with, BitStream, Bits, ConstBitStream, Value};

fn bits(fmt: &str) -> Bits {
    Bits::new(fmt).expect("literal format")
}

// ==================== reading ====================

#[test]
fn read_advances_the_position() {
    let mut s = ConstBitStream::new("0x0102").expect("stream");
    assert_eq!(s.pos(), 0);
    assert_eq!(s.read("uint:8").expect("read"), Value::Uint(1));
    assert_eq!(s.pos(), 8);
    assert_eq!(s.read("uint:8").expect("read"), Value::Uint(2));
    assert_eq!(s.bits_remaining(), 0);
}

#[test]
fn reading_past_the_end_fails_without_moving() {
    let mut s = ConstBitStream::new("0xff").expect("stream");
    s.read_bits(4).expect("read");
    let err = s.read("uint:8").expect_err("off the end");
    assert!(err.to_string().contains("cannot read"), "{}", err);
    assert_eq!(s.pos(), 4);
}

#[test]
fn readlist_mixed_tokens() {
    let mut s = ConstBitStream::new("uint:12=400, 0b110, int:8=-3").expect("stream");
    let values = s.readlist("uint:12, bin:3, int:8", &[]).expect("readlist");
    assert_eq!(
        values,
        vec![Value::Uint(400), Value::Bin("110".to_string()), Value::Int(-3)]
    );
    assert_eq!(s.bits_remaining(), 0);
}

#[test]
fn readlist_keyword_lengths() {
    let mut s = ConstBitStream::new("0xabcd").expect("stream");
    let values = s.readlist("hex:n, uint:m", &[("n", 8), ("m", 8)]).expect("readlist");
    assert_eq!(values, vec![Value::Hex("ab".to_string()), Value::Uint(0xcd)]);
}

#[test]
fn stretchy_token_takes_the_leftovers() {
    let mut s = ConstBitStream::new("0x01ffff02").expect("stream");
    let values = s.readlist("uint:8, bits, uint:8", &[]).expect("readlist");
    assert_eq!(values.len(), 3);
    assert_eq!(values[0], Value::Uint(1));
    assert_eq!(values[2], Value::Uint(2));
    match &values[1] {
        Value::Bits(middle) => assert_eq!(middle.to_hex().expect("hex"), "ffff"),
        other => panic!("expected bits, got {:?}", other),
    }
}

#[test]
fn variable_length_token_after_stretchy_fails() {
    let mut s = ConstBitStream::new("0xffff").expect("stream");
    assert!(s.readlist("bits, ue", &[]).is_err());
}

#[test]
fn golomb_codes_read_from_streams() {
    let mut s = ConstBitStream::from_bits(Bits::from_ue(3).expect("ue"));
    assert_eq!(s.read("ue").expect("read"), Value::Uint(3));
    assert_eq!(s.bits_remaining(), 0);
}

// ==================== peeking ====================

#[test]
fn peek_never_moves_the_position() {
    let mut s = ConstBitStream::new("0xabcd").expect("stream");
    assert_eq!(s.peek("uint:8").expect("peek"), Value::Uint(0xab));
    assert_eq!(s.pos(), 0);

    // Still restored when the peek fails.
    assert!(s.peek("uint:64").is_err());
    assert_eq!(s.pos(), 0);

    let peeked = s.peek_bits(4).expect("peek");
    assert_eq!(peeked.to_hex().expect("hex"), "a");
    assert_eq!(s.pos(), 0);
}

// ==================== position bookkeeping ====================

#[test]
fn position_and_byte_position() {
    let mut s = ConstBitStream::new("0xabcdef").expect("stream");
    s.set_pos(8).expect("set_pos");
    assert_eq!(s.bytepos().expect("bytepos"), 1);
    s.set_pos(10).expect("set_pos");
    assert!(s.bytepos().is_err());
    assert_eq!(s.bytealign(), 6);
    assert_eq!(s.pos(), 16);
    assert_eq!(s.bytealign(), 0);
    assert!(s.set_pos(25).is_err());
    s.set_bytepos(2).expect("set_bytepos");
    assert_eq!(s.pos(), 16);
}

#[test]
fn find_moves_the_position_on_success_only() {
    let mut s = ConstBitStream::new("0xc3e").expect("stream");
    assert_eq!(
        s.find(&bits("0b1111"), None, None, Some(false)).expect("find"),
        Some(6)
    );
    assert_eq!(s.pos(), 6);
    assert_eq!(
        s.find(&bits("0b010101"), None, None, Some(false)).expect("find"),
        None
    );
    assert_eq!(s.pos(), 6);
}

#[test]
fn find_searches_the_whole_bitstring_regardless_of_position() {
    let mut s = ConstBitStream::new("0x0ff000").expect("stream");
    s.set_pos(12).expect("set_pos");
    assert_eq!(
        s.find(&bits("0xff"), None, None, Some(false)).expect("find"),
        Some(4)
    );
    assert_eq!(s.pos(), 4);

    s.set_pos(0).expect("set_pos");
    assert_eq!(
        s.rfind(&bits("0xff"), None, None, Some(false)).expect("rfind"),
        Some(4)
    );
    assert_eq!(s.pos(), 4);

    // An explicit window still narrows the search.
    assert_eq!(
        s.find(&bits("0xff"), Some(12), None, Some(false)).expect("find"),
        None
    );
}

#[test]
fn readto_includes_the_delimiter() {
    let mut s = ConstBitStream::new("0x47000047").expect("stream");
    let first = s.readto(&bits("0x47"), Some(true)).expect("readto");
    assert_eq!(first.to_hex().expect("hex"), "47");
    assert_eq!(s.pos(), 8);
    let second = s.readto(&bits("0x47"), Some(true)).expect("readto");
    assert_eq!(second.to_hex().expect("hex"), "000047");
    assert!(s.readto(&bits("0x47"), Some(true)).is_err());
}

// ==================== mutable streams ====================

#[test]
fn length_changing_mutation_resets_the_position() {
    let mut s = BitStream::new("0x0103").expect("stream");
    s.set_pos(8).expect("set_pos");
    s.insert(&bits("0x02"), None).expect("insert");
    assert_eq!(s.to_hex().expect("hex"), "010203");
    assert_eq!(s.pos(), 0);

    s.set_pos(16).expect("set_pos");
    s.append(&bits("0x11"));
    assert_eq!(s.to_hex().expect("hex"), "01020311");
    assert_eq!(s.pos(), 0);

    s.set_pos(8).expect("set_pos");
    s.delete(0, 8).expect("delete");
    assert_eq!(s.to_hex().expect("hex"), "020311");
    assert_eq!(s.pos(), 0);
}

#[test]
fn length_preserving_mutators_keep_the_position() {
    let mut s = BitStream::new("0x0f0f").expect("stream");
    s.set_pos(8).expect("set_pos");

    s.set_bit(0, true).expect("set_bit");
    s.set(true, &[1, 2]).expect("set");
    assert_eq!(s.to_hex().expect("hex"), "ef0f");
    assert_eq!(s.pos(), 8);

    s.invert(&[0]).expect("invert");
    s.invert_all();
    s.reverse(None, None).expect("reverse");
    s.ror(4, None, None).expect("ror");
    s.rol(4, None, None).expect("rol");
    s.byteswap(&[2], None, None, true).expect("byteswap");
    assert_eq!(s.pos(), 8);
    assert_eq!(s.len(), 16);

    // A slice assignment of a different length rewinds the stream.
    s.set_slice(0, 8, &bits("0b1")).expect("set_slice");
    assert_eq!(s.pos(), 0);
    assert_eq!(s.len(), 9);

    s.clear();
    assert_eq!(s.pos(), 0);
    assert!(s.is_empty());
}

#[test]
fn overwrite_keeps_the_length_and_advances() {
    let mut s = BitStream::new("0x0000").expect("stream");
    s.overwrite(&bits("0xff"), Some(8)).expect("overwrite");
    assert_eq!(s.to_hex().expect("hex"), "00ff");
    assert_eq!(s.pos(), 16);
}

#[test]
fn bitstream_reads_after_mutation() {
    let mut s = BitStream::from_bytes(vec![0x0f]);
    s.append(&bits("0xf0"));
    assert_eq!(s.read("uint:16").expect("read"), Value::Uint(0x0ff0));
}

// ==================== packing ====================

#[test]
fn pack_positional_values() {
    let s = pack("uint:8, uint:8", &[Value::Uint(3), Value::Uint(4)]).expect("pack");
    assert_eq!(s.to_hex().expect("hex"), "0304");
    assert_eq!(s.pos(), 0);
}

#[test]
fn pack_counts_its_parameters() {
    let err = pack("uint:8, uint:8", &[Value::Uint(1)]).expect_err("missing");
    assert!(err.to_string().contains("not enough parameters"), "{}", err);

    let err = pack("uint:8", &[Value::Uint(1), Value::Uint(2)]).expect_err("extra");
    assert!(err.to_string().contains("too many parameters"), "{}", err);
}

#[test]
fn pack_embedded_values_and_literals_take_no_parameters() {
    let s = pack("uint:8=5, 0xff, pad:4", &[]).expect("pack");
    assert_eq!(s.len(), 20);
    assert_eq!(s.slice(0, 16).expect("slice").to_hex().expect("hex"), "05ff");
    assert!(!s.slice(16, 20).expect("slice").any(true, None).expect("any"));
}

#[test]
fn pack_with_keyword_lengths() {
    let s = pack_with("uint:n", &[Value::Uint(5)], &[("n", Value::Uint(12))]).expect("pack");
    assert_eq!(s.len(), 12);
    assert_eq!(s.to_bits().to_uint().expect("uint"), 5);
}

#[test]
fn pack_with_keyword_tokens() {
    let payload = bits("0b101");
    let s = pack_with(
        "uint:8, data",
        &[Value::Uint(9)],
        &[("data", Value::Bits(payload))],
    )
    .expect("pack");
    assert_eq!(s.len(), 11);
    assert_eq!(s.to_bin(), "00001001101");
}

#[test]
fn pack_repetition_consumes_one_value_per_copy() {
    let s = pack(
        "3*uint:4",
        &[Value::Uint(1), Value::Uint(2), Value::Uint(3)],
    )
    .expect("pack");
    assert_eq!(s.to_bin(), "000100100011");
}

#[test]
fn pack_then_unpack_round_trip() {
    let s = pack(
        "uint:12, bool, pad:3, intle:16, ue",
        &[
            Value::Uint(1000),
            Value::Bool(true),
            Value::Int(-42),
            Value::Uint(7),
        ],
    )
    .expect("pack");
    let values = s
        .to_bits()
        .unpack("uint:12, bool, pad:3, intle:16, ue")
        .expect("unpack");
    assert_eq!(
        values,
        vec![
            Value::Uint(1000),
            Value::Bool(true),
            Value::Int(-42),
            Value::Uint(7),
        ]
    );
}

// ==================== pretty printing ====================

#[test]
fn pp_writes_header_and_groups() {
    let mut out = Vec::new();
    bits("0x4142").pp("hex:8, bin:8", None, &mut out).expect("pp");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.starts_with("<Bits, fmt='hex:8, bin:8', length=16 bits>"), "{}", text);
    assert!(text.contains("41 42"), "{}", text);
    assert!(text.contains("01000001 01000010"), "{}", text);
}

#[test]
fn pp_reports_trailing_bits() {
    let mut out = Vec::new();
    bits("0xff, 0b101").pp("bin:8", None, &mut out).expect("pp");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("0b101 (3 trailing bits)"), "{}", text);
}

#[test]
fn pp_rejects_mismatched_views() {
    let mut out = Vec::new();
    assert!(bits("0xff").pp("hex:8, bin:4", None, &mut out).is_err());
    assert!(bits("0xff").pp("hex:6", None, &mut out).is_err());
}
