//! Exponential-Golomb codes: canonical encodings, round trips and
//! error handling at the edges.

use bitstrings::{Bits, ConstBitStream, Error, Value};

// ==================== canonical encodings ====================

#[test]
fn ue_canonical_table() {
    let table: &[(u128, &str)] = &[
        (0, "1"),
        (1, "010"),
        (2, "011"),
        (3, "00100"),
        (4, "00101"),
        (5, "00110"),
        (6, "00111"),
        (7, "0001000"),
        (8, "0001001"),
    ];
    for &(value, encoding) in table {
        assert_eq!(
            Bits::from_ue(value).expect("ue").to_bin(),
            encoding,
            "ue({})",
            value
        );
    }
}

#[test]
fn se_canonical_table() {
    let table: &[(i128, &str)] = &[
        (0, "1"),
        (1, "010"),
        (-1, "011"),
        (2, "00100"),
        (-2, "00101"),
        (3, "00110"),
        (-3, "00111"),
    ];
    for &(value, encoding) in table {
        assert_eq!(
            Bits::from_se(value).expect("se").to_bin(),
            encoding,
            "se({})",
            value
        );
    }
}

#[test]
fn uie_canonical_table() {
    let table: &[(u128, &str)] = &[
        (0, "1"),
        (1, "001"),
        (2, "011"),
        (3, "00001"),
        (4, "00011"),
        (5, "01001"),
        (6, "01011"),
    ];
    for &(value, encoding) in table {
        assert_eq!(
            Bits::from_uie(value).expect("uie").to_bin(),
            encoding,
            "uie({})",
            value
        );
    }
}

#[test]
fn sie_appends_a_sign_bit() {
    assert_eq!(Bits::from_sie(0).expect("sie").to_bin(), "1");
    assert_eq!(Bits::from_sie(1).expect("sie").to_bin(), "0010");
    assert_eq!(Bits::from_sie(-1).expect("sie").to_bin(), "0011");
    assert_eq!(Bits::from_sie(2).expect("sie").to_bin(), "0110");
    assert_eq!(Bits::from_sie(-2).expect("sie").to_bin(), "0111");
}

// ==================== round trips ====================

#[test]
fn ue_round_trips() {
    for value in [0u128, 1, 2, 100, 255, 1 << 20, (1 << 32) + 3, 1 << 100] {
        let b = Bits::from_ue(value).expect("ue");
        assert_eq!(b.to_ue().expect("read"), value, "ue({})", value);
    }
}

#[test]
fn se_round_trips() {
    for value in [0i128, 1, -1, 63, -64, 1 << 40, -(1 << 40)] {
        let b = Bits::from_se(value).expect("se");
        assert_eq!(b.to_se().expect("read"), value, "se({})", value);
    }
}

#[test]
fn uie_and_sie_round_trips() {
    for value in [0u128, 1, 2, 3, 4, 5, 1000, 1 << 60] {
        let b = Bits::from_uie(value).expect("uie");
        assert_eq!(b.to_uie().expect("read"), value, "uie({})", value);
    }
    for value in [0i128, 7, -7, 1 << 50, -(1 << 50)] {
        let b = Bits::from_sie(value).expect("sie");
        assert_eq!(b.to_sie().expect("read"), value, "sie({})", value);
    }
}

#[test]
fn consecutive_codes_stream_back_out() {
    let mut b = Bits::from_ue(3).expect("ue");
    b = &b + &Bits::from_ue(0).expect("ue");
    b = &b + &Bits::from_se(-2).expect("se");
    let mut s = ConstBitStream::from_bits(b);
    assert_eq!(s.read("ue").expect("read"), Value::Uint(3));
    assert_eq!(s.read("ue").expect("read"), Value::Uint(0));
    assert_eq!(s.read("se").expect("read"), Value::Int(-2));
    assert_eq!(s.bits_remaining(), 0);
}

// ==================== edges and errors ====================

#[test]
fn truncated_codes_report_running_off_the_end() {
    for fmt in ["0b00", "0b0010", "0b000"] {
        let b = Bits::new(fmt).expect("bits");
        let err = b.to_ue().expect_err("truncated");
        assert!(matches!(err, Error::Read(_)), "{}: {}", fmt, err);
    }
    // A sign bit missing from an sie code is also a truncation.
    let err = Bits::new("0b001").expect("bits").to_sie().expect_err("no sign");
    assert!(matches!(err, Error::Read(_)), "{}", err);
}

#[test]
fn whole_string_decodes_reject_trailing_bits() {
    let b = Bits::new("0b0101").expect("bits");
    let err = b.to_ue().expect_err("trailing");
    assert!(err.to_string().contains("not a single"), "{}", err);
}

#[test]
fn values_past_the_integer_cap_fail_to_encode() {
    assert!(Bits::from_ue(u128::MAX).is_err());
    assert!(Bits::from_uie(u128::MAX).is_err());
    assert!(Bits::from_se(i128::MIN).is_err());
    // Near the cap still works.
    let big = (1u128 << 127) - 1;
    assert_eq!(
        Bits::from_ue(big).expect("ue").to_ue().expect("read"),
        big
    );
}

#[test]
fn empty_bits_cannot_hold_a_code() {
    assert!(Bits::empty().to_ue().is_err());
    assert!(Bits::empty().to_uie().is_err());
}
