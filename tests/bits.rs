//! Bits and BitArray behaviour: construction, interpretation,
//! searching, slicing, operators and mutation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;

use bitstrings::{BitArray, Bits, Value};

fn bits(fmt: &str) -> Bits {
    Bits::new(fmt).expect("literal format")
}

// ==================== construction ====================

#[test]
fn empty_formats_make_empty_bits() {
    assert_eq!(bits("").len(), 0);
    assert!(Bits::empty().is_empty());
}

#[test]
fn hex_literal_round_trip() {
    let b = bits("0xa1");
    assert_eq!(b.len(), 8);
    assert_eq!(b.to_bin(), "10100001");
    assert_eq!(b.to_hex().expect("hex"), "a1");
    assert_eq!(b.to_uint().expect("uint"), 161);
    assert_eq!(b.to_int().expect("int"), -95);
}

#[test]
fn oct_literal_is_three_bits_per_digit() {
    let b = Bits::from_oct("17").expect("oct");
    assert_eq!(b.to_bin(), "001111");
}

#[test]
fn token_values_in_formats() {
    let b = bits("uint:12=400, 0b110");
    assert_eq!(b.len(), 15);
    let head = b.slice(0, 12).expect("slice");
    assert_eq!(head.to_uint().expect("uint"), 400);
}

#[test]
fn tokens_without_values_cannot_construct() {
    assert!(Bits::new("uint:8").is_err());
    // pad needs no value, only a length.
    assert_eq!(bits("pad:4").len(), 4);
    assert!(!bits("pad:4").any(true, None).expect("any"));
}

#[test]
fn integer_constructors() {
    assert_eq!(Bits::from_uint(400, 12).expect("uint").len(), 12);
    assert_eq!(Bits::from_int(-1, 4).expect("int").to_bin(), "1111");
    assert_eq!(
        Bits::from_uintle(0x1234, 16).expect("uintle").to_hex().expect("hex"),
        "3412"
    );
    assert_eq!(
        Bits::from_uintbe(0x1234, 16).expect("uintbe").to_hex().expect("hex"),
        "1234"
    );
}

#[test]
fn out_of_range_integers_fail() {
    assert!(Bits::from_uint(256, 8).is_err());
    assert!(Bits::from_int(128, 8).is_err());
    assert!(Bits::from_int(-129, 8).is_err());
    // Byte-wise formats need whole bytes.
    assert!(Bits::from_intbe(0, 12).is_err());
    assert!(Bits::from_uintle(0, 4).is_err());
}

#[test]
fn float_constructors() {
    let b = Bits::from_float(0.25, 32).expect("f32");
    assert_eq!(b.len(), 32);
    assert_eq!(b.to_float().expect("read"), 0.25);

    let h = Bits::from_float(1.5, 16).expect("f16");
    assert_eq!(h.to_float().expect("read"), 1.5);

    let bf = Bits::from_bfloat(1.0).expect("bfloat");
    assert_eq!(bf.len(), 16);
    assert_eq!(bf.to_bfloat().expect("read"), 1.0);
}

#[test]
fn bool_bits() {
    assert_eq!(Bits::from_bool(true).to_bin(), "1");
    assert_eq!(bits("bool=True").to_bin(), "1");
    assert_eq!(bits("bool=0").to_bin(), "0");
    assert!(bits("0b10").to_bool().is_err());
}

#[test]
fn from_bools_iterator() {
    let b = Bits::from_bools([true, false, true]);
    assert_eq!(b.to_bin(), "101");
}

// ==================== indexing and slicing ====================

#[test]
fn indexing_with_negative_positions() {
    let b = bits("0b1001");
    assert!(b.get(0).expect("get"));
    assert!(!b.get(1).expect("get"));
    assert!(b.get(-1).expect("get"));
    assert!(!b.get(-3).expect("get"));
    assert!(b.get(4).is_err());
    assert!(b.get(-5).is_err());
}

#[test]
fn slicing() {
    let b = bits("0b11110000");
    assert_eq!(b.slice(2, 6).expect("slice").to_bin(), "1100");
    assert_eq!(b.slice(0, 0).expect("slice").len(), 0);
    assert!(b.slice(2, 9).is_err());
    assert!(b.slice(6, 2).is_err());
}

#[test]
fn slices_of_slices_stay_cheap_and_correct() {
    let b = bits("0xdeadbeef");
    let mid = b.slice(4, 28).expect("slice");
    assert_eq!(mid.to_hex().expect("hex"), "eadbee");
    let inner = mid.slice(4, 12).expect("slice");
    assert_eq!(inner.to_hex().expect("hex"), "ad");
}

// ==================== interpretation ====================

#[test]
fn interpret_single_formats() {
    let b = bits("0xff01");
    assert_eq!(b.interpret("uint").expect("uint"), Value::Uint(0xff01));
    assert_eq!(b.interpret("uintle:16").expect("le"), Value::Uint(0x01ff));
    assert_eq!(b.interpret("hex").expect("hex"), Value::Hex("ff01".to_string()));
    assert!(b.interpret("uint:8").is_err());
}

#[test]
fn unpack_walks_the_whole_string() {
    let b = bits("uint:8=5, int:8=-3, 0b11");
    let values = b.unpack("uint:8, int:8, bin").expect("unpack");
    assert_eq!(
        values,
        vec![Value::Uint(5), Value::Int(-3), Value::Bin("11".to_string())]
    );
}

#[test]
fn unpack_with_pad_skips_values() {
    let b = bits("0xab, pad:4, 0xc");
    let values = b.unpack("hex:8, pad:4, hex:4").expect("unpack");
    assert_eq!(
        values,
        vec![Value::Hex("ab".to_string()), Value::Hex("c".to_string())]
    );
}

#[test]
fn bytes_interpretation_needs_whole_bytes() {
    assert_eq!(
        bits("0x4142").to_bytes().expect("bytes"),
        vec![0x41, 0x42]
    );
    assert!(bits("0b110").to_bytes().is_err());
    assert_eq!(bits("0b110").to_padded_bytes(), vec![0xc0]);
}

// ==================== searching ====================

#[test]
fn find_unaligned_and_aligned() {
    let b = bits("0b00011000");
    assert_eq!(b.find(&bits("0b11"), None, None, Some(false)).expect("find"), Some(3));
    assert_eq!(b.find(&bits("0b11"), None, None, Some(true)).expect("find"), None);

    let aligned = bits("0x0023122312");
    assert_eq!(
        aligned.find(&bits("0x23"), None, None, Some(true)).expect("find"),
        Some(8)
    );
}

#[test]
fn find_honours_the_search_range() {
    let b = bits("0b110110");
    assert_eq!(b.find(&bits("0b11"), Some(1), None, Some(false)).expect("find"), Some(3));
    assert_eq!(b.find(&bits("0b11"), Some(4), None, Some(false)).expect("find"), None);
    assert!(b.find(&bits("0b1"), Some(3), Some(2), Some(false)).is_err());
}

#[test]
fn rfind_returns_the_last_match() {
    let b = bits("0b110110");
    assert_eq!(b.rfind(&bits("0b11"), None, None, Some(false)).expect("rfind"), Some(3));
    assert_eq!(
        b.rfind(&bits("0b11"), None, Some(3), Some(false)).expect("rfind"),
        Some(0)
    );
}

#[test]
fn findall_yields_overlapping_matches() {
    let b = bits("0b10101");
    let positions: Vec<usize> = b
        .findall(&bits("0b101"), None, Some(false))
        .expect("findall")
        .collect();
    assert_eq!(positions, vec![0, 2]);

    let limited: Vec<usize> = b
        .findall(&bits("0b101"), Some(1), Some(false))
        .expect("findall")
        .collect();
    assert_eq!(limited, vec![0]);
}

#[test]
fn empty_needles_are_rejected() {
    let b = bits("0xff");
    assert!(b.find(&Bits::empty(), None, None, None).is_err());
    assert!(b.rfind(&Bits::empty(), None, None, None).is_err());
    assert!(b.findall(&Bits::empty(), None, None).is_err());
}

#[test]
fn split_keeps_the_delimiter_at_chunk_starts() {
    let b = bits("0b001100110011");
    let parts: Vec<String> = b
        .split(&bits("0b11"), None, None, None, Some(false))
        .expect("split")
        .map(|p| p.to_bin())
        .collect();
    assert_eq!(parts, vec!["00", "1100", "1100", "11"]);
}

#[test]
fn cut_drops_the_final_partial_chunk() {
    let b = bits("0b1111100");
    let chunks: Vec<String> = b.cut(3, None, None, None).expect("cut").map(|c| c.to_bin()).collect();
    assert_eq!(chunks, vec!["111", "110"]);

    let whole = bits("0xff00ff");
    assert_eq!(whole.cut(8, None, None, None).expect("cut").count(), 3);
}

#[test]
fn join_with_separator() {
    let sep = bits("0b0");
    let items = [bits("0b1"), bits("0b1")];
    assert_eq!(sep.join(items.iter()).to_bin(), "101");
    assert_eq!(Bits::empty().join(items.iter()).to_bin(), "11");
}

#[test]
fn startswith_and_endswith() {
    let b = bits("0xdead");
    assert!(b.startswith(&bits("0xd"), None, None));
    assert!(b.endswith(&bits("0xad"), None, None));
    assert!(!b.startswith(&bits("0xe"), None, None));
    assert!(b.startswith(&bits("0xe"), Some(4), None));
}

// ==================== counting and testing ====================

#[test]
fn count_all_any() {
    let b = bits("0b11110000");
    assert_eq!(b.count(true), 4);
    assert_eq!(b.count(false), 4);
    assert!(b.all(true, Some(&[0, 1, 2, 3])).expect("all"));
    assert!(!b.all(true, None).expect("all"));
    assert!(b.any(true, None).expect("any"));
    assert!(!b.any(true, Some(&[4, 5])).expect("any"));
    assert!(Bits::zeros(9).all(false, None).expect("all"));
    assert!(Bits::ones(9).all(true, None).expect("all"));
}

// ==================== operators ====================

#[test]
fn bitwise_operators() {
    let a = bits("0b1100");
    let b = bits("0b1010");
    assert_eq!((&a & &b).to_bin(), "1000");
    assert_eq!((&a | &b).to_bin(), "1110");
    assert_eq!((&a ^ &b).to_bin(), "0110");
    assert_eq!((!&a).to_bin(), "0011");
}

#[test]
fn mismatched_lengths_fail_bitwise_ops() {
    let a = bits("0b1100");
    let b = bits("0b10");
    assert!(a.and(&b).is_err());
    assert!(a.or(&b).is_err());
    assert!(a.xor(&b).is_err());
    assert!(Bits::empty().inverted().is_err());
}

#[test]
fn concatenation_and_repetition() {
    let a = bits("0b10");
    assert_eq!((&a + &bits("0b01")).to_bin(), "1001");
    assert_eq!((&a * 3).to_bin(), "101010");
    assert_eq!((&a * 0).len(), 0);
    assert_eq!(a.repeat(1), a);
}

#[test]
fn shifts_fill_with_zeros() {
    let b = bits("0b1110");
    assert_eq!((&b << 1).to_bin(), "1100");
    assert_eq!((&b >> 1).to_bin(), "0111");
    assert_eq!((&b << 10).to_bin(), "0000");
    assert!(Bits::empty().shifted_left(1).is_err());
}

#[test]
fn reversed_copies() {
    assert_eq!(bits("0b100").reversed().to_bin(), "001");
    assert_eq!(bits("0xabcd").reversed().reversed(), bits("0xabcd"));
}

// ==================== equality, hashing, display ====================

#[test]
fn equality_is_content_based() {
    assert_eq!(bits("0xf0"), Bits::from_bin("11110000").expect("bin"));
    assert_ne!(bits("0b00"), bits("0b000"));
}

fn hash_of(b: &Bits) -> u64 {
    let mut hasher = DefaultHasher::new();
    b.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn equal_bits_hash_equal() {
    assert_eq!(hash_of(&bits("0xf0")), hash_of(&Bits::from_bin("11110000").expect("bin")));
    assert_ne!(hash_of(&bits("0b01")), hash_of(&bits("0b10")));

    // Long bitstrings hash from their ends plus the length.
    let long_a = Bits::zeros(5000);
    let long_b = Bits::zeros(5000);
    assert_eq!(hash_of(&long_a), hash_of(&long_b));
    assert_ne!(hash_of(&Bits::zeros(5000)), hash_of(&Bits::zeros(5001)));
}

#[test]
fn display_prefers_hex_and_truncates() {
    assert_eq!(bits("0xff").to_string(), "0xff");
    assert_eq!(bits("0b111").to_string(), "0b111");
    assert_eq!(Bits::empty().to_string(), "");

    let long = Bits::zeros(4100).to_string();
    assert!(long.ends_with("..."));
    assert_eq!(long.len(), 2 + 250 + 3);
}

// ==================== files ====================

#[test]
fn tofile_and_from_file_with_windows() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    bits("0x0123456789abcdef").tofile(&mut file).expect("tofile");
    file.flush().expect("flush");

    let whole = Bits::from_file(file.path(), None, None).expect("map");
    assert_eq!(whole.to_hex().expect("hex"), "0123456789abcdef");

    let window = Bits::from_file(file.path(), Some(8), Some(16)).expect("map");
    assert_eq!(window.to_hex().expect("hex"), "2345");

    // Slices of a mapping stay readable after the handle is dropped.
    let tail = whole.slice(48, 64).expect("slice");
    drop(whole);
    assert_eq!(tail.to_hex().expect("hex"), "cdef");
}

// ==================== BitArray mutation ====================

#[test]
fn append_prepend_insert() {
    let mut a = BitArray::new("0b01").expect("new");
    a.append(&bits("0b11"));
    assert_eq!(a.to_bin(), "0111");
    a.prepend(&bits("0b10"));
    assert_eq!(a.to_bin(), "100111");
    a.insert(&bits("0b00"), 2).expect("insert");
    assert_eq!(a.to_bin(), "10000111");
    assert!(a.insert(&bits("0b1"), 99).is_err());
}

#[test]
fn overwrite_and_delete() {
    let mut a = BitArray::new("0x0000").expect("new");
    a.overwrite(&bits("0xff"), 4).expect("overwrite");
    assert_eq!(a.to_hex().expect("hex"), "0ff0");
    a.delete(0, 4).expect("delete");
    assert_eq!(a.to_hex().expect("hex"), "ff0");
    assert!(a.overwrite(&bits("0xffff"), 4).is_err());
}

#[test]
fn set_slice_changes_length() {
    let mut a = BitArray::new("0b111111").expect("new");
    a.set_slice(2, 4, &bits("0b0000")).expect("set_slice");
    assert_eq!(a.to_bin(), "11000011");
    a.set_slice(0, 8, &Bits::empty()).expect("set_slice");
    assert!(a.is_empty());
}

#[test]
fn replace_counts_and_replaces_leftmost_first() {
    let mut a = BitArray::new("0b010101").expect("new");
    let n = a
        .replace(&bits("0b01"), &bits("0b1"), None, None, None, Some(false))
        .expect("replace");
    assert_eq!(n, 3);
    assert_eq!(a.to_bin(), "111");

    let mut b = BitArray::new("0b0101").expect("new");
    let n = b
        .replace(&bits("0b01"), &bits("0b10"), None, None, Some(1), Some(false))
        .expect("replace");
    assert_eq!(n, 1);
    assert_eq!(b.to_bin(), "1001");
}

#[test]
fn set_and_invert_bits() {
    let mut a = BitArray::zeros(8);
    a.set(true, &[0, -1]).expect("set");
    assert_eq!(a.to_bin(), "10000001");
    a.invert(&[1]).expect("invert");
    assert_eq!(a.to_bin(), "11000001");
    a.invert_all();
    assert_eq!(a.to_bin(), "00111110");
    a.set_all(true);
    assert_eq!(a.count(false), 0);
}

#[test]
fn reverse_ranges() {
    let mut a = BitArray::new("0b100110").expect("new");
    a.reverse(None, None).expect("reverse");
    assert_eq!(a.to_bin(), "011001");
    a.reverse(Some(0), Some(2)).expect("reverse");
    assert_eq!(a.to_bin(), "101001");
}

#[test]
fn rotations_wrap_around() {
    let mut a = BitArray::new("0b1011").expect("new");
    a.ror(1, None, None).expect("ror");
    assert_eq!(a.to_bin(), "1101");
    a.rol(1, None, None).expect("rol");
    assert_eq!(a.to_bin(), "1011");
    a.rol(4, None, None).expect("rol");
    assert_eq!(a.to_bin(), "1011");
    assert!(BitArray::empty().ror(1, None, None).is_err());
}

#[test]
fn byteswap_patterns() {
    let mut a = BitArray::new("0x0102030405060708").expect("new");
    let n = a.byteswap(&[2], None, None, true).expect("byteswap");
    assert_eq!(n, 4);
    assert_eq!(a.to_hex().expect("hex"), "0201040306050807");

    let mut b = BitArray::new("0x010203").expect("new");
    let n = b.byteswap(&[2], None, None, false).expect("byteswap");
    assert_eq!(n, 1);
    assert_eq!(b.to_hex().expect("hex"), "020103");

    assert!(BitArray::new("0b110").expect("new").byteswap(&[1], None, None, true).is_err());
}

#[test]
fn bitarray_derefs_to_bits() {
    let a = BitArray::new("0xf0").expect("new");
    assert_eq!(a.to_uint().expect("uint"), 240);
    assert_eq!(a, bits("0xf0"));
}
