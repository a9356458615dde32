//! Process-wide defaults: bit addressing mode and byte-aligned search.
//!
//! Both flags are intended to be set once at startup. Changing them
//! affects all existing and future bitstrings at once, so they must not
//! be toggled mid-operation in concurrent code. Operations that take an
//! explicit [`Addressing`](crate::store::Addressing) parameter ignore
//! the global mode.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::store::Addressing;

static LSB0: AtomicBool = AtomicBool::new(false);
static BYTEALIGNED: AtomicBool = AtomicBool::new(false);

/// Switch the global bit-addressing convention. `false` selects MSB0
/// (bit 0 is the first, most significant bit), `true` selects LSB0
/// (bit 0 is the last, least significant bit).
pub fn set_lsb0(on: bool) {
    LSB0.store(on, Ordering::SeqCst);
}

/// True if the global addressing convention is LSB0.
pub fn lsb0() -> bool {
    LSB0.load(Ordering::SeqCst)
}

/// The global addressing convention as a strategy value.
pub fn addressing() -> Addressing {
    if lsb0() {
        Addressing::Lsb0
    } else {
        Addressing::Msb0
    }
}

/// Set the default for the `byte_aligned` argument of find/replace/split
/// when the caller passes `None`.
pub fn set_bytealigned(on: bool) {
    BYTEALIGNED.store(on, Ordering::SeqCst);
}

/// The default byte-aligned-search flag.
pub fn bytealigned() -> bool {
    BYTEALIGNED.load(Ordering::SeqCst)
}
