//! Format mini-language tests: token shapes, struct expansion,
//! repetition, keyword lengths and rejection of malformed formats.

use bitstrings::dtype::{Dtype, DtypeName};
use bitstrings::parser::{parse_format, parse_name_length, Token, TokenKind, TokenLength};

fn only_token(fmt: &str) -> Token {
    let parsed = parse_format(fmt, &[]).expect("parse");
    assert_eq!(parsed.tokens.len(), 1, "format '{}' should be one token", fmt);
    parsed.tokens[0].clone()
}

// ==================== single tokens ====================

#[test]
fn plain_token_with_colon() {
    let t = only_token("uint:12");
    assert_eq!(t.kind, TokenKind::Dtype(DtypeName::Uint));
    assert_eq!(t.length, Some(TokenLength::Bits(12)));
    assert_eq!(t.value, None);
}

#[test]
fn plain_token_without_colon() {
    let t = only_token("int5");
    assert_eq!(t.kind, TokenKind::Dtype(DtypeName::Int));
    assert_eq!(t.length, Some(TokenLength::Bits(5)));
}

#[test]
fn token_names_are_case_insensitive() {
    let t = only_token("UiNtLe:16");
    assert_eq!(t.kind, TokenKind::Dtype(DtypeName::UintLe));
}

#[test]
fn longest_name_wins() {
    // "uintle16" must not parse as "uint" with garbage after it.
    let t = only_token("uintle16");
    assert_eq!(t.kind, TokenKind::Dtype(DtypeName::UintLe));
    assert_eq!(t.length, Some(TokenLength::Bits(16)));
}

#[test]
fn short_forms_expand() {
    assert_eq!(only_token("u8").kind, TokenKind::Dtype(DtypeName::Uint));
    assert_eq!(only_token("i12").kind, TokenKind::Dtype(DtypeName::Int));
    assert_eq!(only_token("f32").kind, TokenKind::Dtype(DtypeName::Float));
    assert_eq!(only_token("b3").kind, TokenKind::Dtype(DtypeName::Bin));
    assert_eq!(only_token("o3").kind, TokenKind::Dtype(DtypeName::Oct));
    assert_eq!(only_token("h4").kind, TokenKind::Dtype(DtypeName::Hex));
}

#[test]
fn token_with_value() {
    let t = only_token("uint:8=255");
    assert_eq!(t.length, Some(TokenLength::Bits(8)));
    assert_eq!(t.value.as_deref(), Some("255"));
}

#[test]
fn bare_length_means_bits() {
    let t = only_token("12");
    assert_eq!(t.kind, TokenKind::Dtype(DtypeName::Bits));
    assert_eq!(t.length, Some(TokenLength::Bits(12)));
}

// ==================== literals ====================

#[test]
fn literal_tokens() {
    let t = only_token("0x1f");
    assert_eq!(t.kind, TokenKind::HexLiteral);
    assert_eq!(t.value.as_deref(), Some("1f"));

    let t = only_token("0b1101");
    assert_eq!(t.kind, TokenKind::BinLiteral);
    assert_eq!(t.value.as_deref(), Some("1101"));

    let t = only_token("0o755");
    assert_eq!(t.kind, TokenKind::OctLiteral);
    assert_eq!(t.value.as_deref(), Some("755"));
}

#[test]
fn literal_digits_may_contain_underscores() {
    let t = only_token("0b1111_0000");
    assert_eq!(t.value.as_deref(), Some("1111_0000"));
}

// ==================== fixed and variable lengths ====================

#[test]
fn fixed_length_names_fill_in_their_length() {
    assert_eq!(only_token("bool").length, Some(TokenLength::Bits(1)));
    assert_eq!(only_token("bfloat").length, Some(TokenLength::Bits(16)));
    assert_eq!(only_token("float8_143").length, Some(TokenLength::Bits(8)));
    assert_eq!(only_token("float8_152").length, Some(TokenLength::Bits(8)));
}

#[test]
fn fixed_length_names_reject_other_lengths() {
    assert!(parse_format("bool:2", &[]).is_err());
    assert!(parse_format("bfloat:32", &[]).is_err());
}

#[test]
fn golomb_names_reject_lengths() {
    for fmt in ["ue:8", "se:4", "uie:2", "sie:16"] {
        let err = parse_format(fmt, &[]).expect_err("golomb length must fail");
        assert!(err.to_string().contains("exponential-Golomb"), "{}", err);
    }
}

#[test]
fn bytes_length_is_counted_in_bytes() {
    let t = only_token("bytes:3");
    assert_eq!(t.length, Some(TokenLength::Bits(24)));
}

#[test]
fn negative_length_is_rejected() {
    let err = parse_format("uint:-4", &[]).expect_err("negative length");
    assert!(err.to_string().contains("negative length"), "{}", err);
}

// ==================== multi-token formats ====================

#[test]
fn comma_separated_tokens() {
    let parsed = parse_format("uint:8, hex:4, bool", &[]).expect("parse");
    assert_eq!(parsed.tokens.len(), 3);
    assert!(!parsed.stretchy);
}

#[test]
fn trailing_comma_and_spaces_are_fine() {
    let parsed = parse_format(" uint:8 , bin:3 , ", &[]).expect("parse");
    assert_eq!(parsed.tokens.len(), 2);
}

#[test]
fn repetition_factor_duplicates_tokens() {
    let parsed = parse_format("3*uint:8", &[]).expect("parse");
    assert_eq!(parsed.tokens.len(), 3);
    for t in &parsed.tokens {
        assert_eq!(t.kind, TokenKind::Dtype(DtypeName::Uint));
        assert_eq!(t.length, Some(TokenLength::Bits(8)));
    }
}

#[test]
fn repetition_applies_to_groups() {
    let parsed = parse_format("2*(uint:4, bin:2)", &[]).expect("parse");
    assert_eq!(parsed.tokens.len(), 4);
    assert_eq!(parsed.tokens[2].kind, TokenKind::Dtype(DtypeName::Uint));
}

#[test]
fn one_stretchy_token_is_allowed() {
    let parsed = parse_format("uint:8, bits", &[]).expect("parse");
    assert!(parsed.stretchy);
    assert!(parsed.tokens[1].is_stretchy());
}

#[test]
fn two_stretchy_tokens_are_rejected() {
    let err = parse_format("bits, uint:8, bin", &[]).expect_err("two stretchy");
    assert!(err.to_string().contains("only one token"), "{}", err);
}

// ==================== struct-style formats ====================

#[test]
fn struct_format_big_endian() {
    let parsed = parse_format(">HH", &[]).expect("parse");
    assert_eq!(parsed.tokens.len(), 2);
    for t in &parsed.tokens {
        assert_eq!(t.kind, TokenKind::Dtype(DtypeName::UintBe));
        assert_eq!(t.length, Some(TokenLength::Bits(16)));
    }
}

#[test]
fn struct_format_little_endian_mixed() {
    let parsed = parse_format("<bBhlq", &[]).expect("parse");
    let kinds: Vec<_> = parsed.tokens.iter().map(|t| t.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Dtype(DtypeName::Int),
            TokenKind::Dtype(DtypeName::Uint),
            TokenKind::Dtype(DtypeName::IntLe),
            TokenKind::Dtype(DtypeName::IntLe),
            TokenKind::Dtype(DtypeName::IntLe),
        ]
    );
    assert_eq!(parsed.tokens[4].length, Some(TokenLength::Bits(64)));
}

#[test]
fn struct_format_floats_and_repeats() {
    let parsed = parse_format("=2e", &[]).expect("parse");
    assert_eq!(parsed.tokens.len(), 2);
    assert_eq!(parsed.tokens[0].kind, TokenKind::Dtype(DtypeName::FloatNe));
    assert_eq!(parsed.tokens[0].length, Some(TokenLength::Bits(16)));
}

// ==================== keywords ====================

#[test]
fn key_length_resolves_against_supplied_keys() {
    let parsed = parse_format("uint:n", &["n"]).expect("parse");
    assert_eq!(parsed.tokens[0].length, Some(TokenLength::Key("n".to_string())));
}

#[test]
fn key_length_without_key_is_an_error() {
    let err = parse_format("uint:n", &[]).expect_err("unknown length key");
    assert!(err.to_string().contains("length"), "{}", err);
}

#[test]
fn whole_token_keyword() {
    let parsed = parse_format("payload", &["payload"]).expect("parse");
    assert_eq!(
        parsed.tokens[0].kind,
        TokenKind::Keyword("payload".to_string())
    );
}

// ==================== parse_name_length and Dtype ====================

#[test]
fn name_length_parsing() {
    assert_eq!(parse_name_length("uint:12").expect("ok"), (DtypeName::Uint, 12));
    assert_eq!(parse_name_length("int5").expect("ok"), (DtypeName::Int, 5));
    assert_eq!(parse_name_length("ue").expect("ok"), (DtypeName::Ue, 0));
    assert_eq!(parse_name_length(">H").expect("ok"), (DtypeName::UintBe, 16));
}

#[test]
fn name_length_rejects_values_and_multiple_tokens() {
    assert!(parse_name_length("uint:8=3").is_err());
    assert!(parse_name_length("uint:8, int:8").is_err());
}

#[test]
fn dtype_construction() {
    let d = Dtype::new("uint12").expect("dtype");
    assert_eq!(d.name(), DtypeName::Uint);
    assert_eq!(d.length(), 12);
    assert_eq!(d.to_string(), "uint12");

    let d = Dtype::new("bfloat").expect("dtype");
    assert_eq!(d.length(), 16);
    assert_eq!(d.to_string(), "bfloat");
}

#[test]
fn dtype_value_ranges() {
    let d = Dtype::new("int5").expect("dtype");
    assert_eq!(d.min_value(), Some(-16));
    assert_eq!(d.max_value(), Some(15));

    let d = Dtype::new("uint8").expect("dtype");
    assert_eq!(d.min_value(), Some(0));
    assert_eq!(d.max_value(), Some(255));

    let d = Dtype::new("float32").expect("dtype");
    assert_eq!(d.min_value(), None);
}

// ==================== garbage ====================

#[test]
fn nonsense_formats_are_rejected() {
    for fmt in ["uint:8=", "totallynotaname:4", "3*", "(uint:8", "uint::8"] {
        assert!(parse_format(fmt, &[]).is_err(), "'{}' should not parse", fmt);
    }
}

#[test]
fn repeated_parses_hit_the_cache_consistently() {
    // Same format parsed many times must give identical tokens; this
    // exercises the memoised path after the first call.
    let first = parse_format("uint:8, 0xff, 2*bool", &[]).expect("parse");
    for _ in 0..300 {
        let again = parse_format("uint:8, 0xff, 2*bool", &[]).expect("parse");
        assert_eq!(again.tokens, first.tokens);
    }
}
