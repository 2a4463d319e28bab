//! Validation of user-supplied timing values and derivation of the data delays.

use log::debug;
use crate::registers::DelayPair;
use crate::{BscError, BscResult, TimingField};

/// Timing values that are safe to write to a BSC controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timing {
    /// Clock divider, always even.
    pub cdiv: u16,
    /// Clock stretch timeout in SCL cycles. `0` disables the timeout.
    pub tout: u16,
    /// Data delays derived from `cdiv`.
    pub delay: DelayPair,
}

/// Largest accepted raw `CDIV`.
pub const CDIV_MAX: i64 = 0xFFFF;
/// Largest accepted raw `TOUT`.
pub const TOUT_MAX: i64 = 0xFFFF;

/// Rounds a clock divider down to an even number.
///
/// The controller ignores the lowest bit of `CDIV`, so this is the value it will actually use.
pub fn round_cdiv(cdiv: u16) -> u16 {
    cdiv & 0xFFFE
}

/// Derives `FEDL` and `REDL` from a clock divider, exactly like the `i2c-bcm2835` kernel driver.
///
/// Neither value may exceed `cdiv / 2`, and both are at least one core clock cycle.
pub fn derive_delay(cdiv: u16) -> DelayPair {
    DelayPair {
        fedl: (cdiv / 16).max(1),
        redl: (cdiv / 4).max(1),
    }
}

/// Validates raw `CDIV` and `TOUT` values and derives the matching delays.
///
/// `cdiv_raw` must be in `(0, 65535]` and is rounded down to an even number, which must still be
/// non-zero. `tout_raw` must be in `[0, 65535]`. The delays are derived from the rounded divider.
///
/// # Errors
/// - [BscError::OutOfRange] if either value is outside its range.
pub fn validate_and_derive(cdiv_raw: i64, tout_raw: i64) -> BscResult<Timing> {
    let cdiv_error = BscError::OutOfRange {
        field: TimingField::ClockDivider,
        value: cdiv_raw,
        min: 0,
        max: CDIV_MAX,
    };
    if cdiv_raw <= 0 || cdiv_raw > CDIV_MAX {
        return Err(cdiv_error);
    }
    let cdiv = round_cdiv(cdiv_raw as u16);
    if cdiv == 0 {
        return Err(cdiv_error);
    }

    if !(0..=TOUT_MAX).contains(&tout_raw) {
        return Err(BscError::OutOfRange {
            field: TimingField::ClockStretchTimeout,
            value: tout_raw,
            min: 0,
            max: TOUT_MAX,
        });
    }
    let tout = tout_raw as u16;

    let delay = derive_delay(cdiv);
    debug!("CDIV {} -> {}, FEDL={}, REDL={}", cdiv_raw, cdiv, delay.fedl, delay.redl);

    Ok(Timing { cdiv, tout, delay })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{read_cdiv, read_delay, read_tout, write_timing, RegisterBlock};
    use proptest::prelude::*;

    fn out_of_range(result: BscResult<Timing>) -> Option<TimingField> {
        match result {
            Err(BscError::OutOfRange { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn small_dividers_floor_delays_at_one() {
        assert_eq!(derive_delay(4), DelayPair::new(1, 1));
        assert_eq!(derive_delay(2), DelayPair::new(1, 1));
        assert_eq!(derive_delay(16), DelayPair::new(1, 4));
        assert_eq!(derive_delay(32), DelayPair::new(2, 8));
    }

    #[test]
    fn odd_maximum_rounds_down() {
        let timing = validate_and_derive(65535, 0).unwrap();
        assert_eq!(timing.cdiv, 65534);
        assert_eq!(timing.delay, DelayPair::new(65534 / 16, 65534 / 4));
    }

    #[test]
    fn one_rounds_to_zero_and_is_rejected() {
        assert_eq!(
            out_of_range(validate_and_derive(1, 0)),
            Some(TimingField::ClockDivider)
        );
    }

    #[test]
    fn delays_use_the_rounded_divider() {
        // 33 / 4 = 8, but the controller sees 32.
        let timing = validate_and_derive(33, 0).unwrap();
        assert_eq!(timing.cdiv, 32);
        assert_eq!(timing.delay, DelayPair::new(2, 8));
    }

    #[test]
    fn cdiv_bounds() {
        assert_eq!(out_of_range(validate_and_derive(0, 0)), Some(TimingField::ClockDivider));
        assert_eq!(out_of_range(validate_and_derive(-5, 0)), Some(TimingField::ClockDivider));
        assert_eq!(
            out_of_range(validate_and_derive(65536, 0)),
            Some(TimingField::ClockDivider)
        );
        assert!(validate_and_derive(2, 0).is_ok());
    }

    #[test]
    fn tout_bounds() {
        assert_eq!(
            out_of_range(validate_and_derive(100, -1)),
            Some(TimingField::ClockStretchTimeout)
        );
        assert_eq!(
            out_of_range(validate_and_derive(100, 65536)),
            Some(TimingField::ClockStretchTimeout)
        );
        assert_eq!(validate_and_derive(100, 0).unwrap().tout, 0);
        assert_eq!(validate_and_derive(100, 65535).unwrap().tout, 65535);
    }

    #[test]
    fn cdiv_is_checked_before_tout() {
        assert_eq!(
            out_of_range(validate_and_derive(0, -1)),
            Some(TimingField::ClockDivider)
        );
    }

    #[test]
    fn writes_expected_bit_patterns() {
        let timing = validate_and_derive(100, 355).unwrap();
        assert_eq!(timing.cdiv, 100);
        assert_eq!(timing.delay, DelayPair::new(6, 25));

        let mut block = RegisterBlock::default();
        write_timing(&mut block, &timing);
        assert_eq!(block.div, 0x0000_0064);
        assert_eq!(block.clkt, 0x0000_0163);
        assert_eq!(block.del, 0x0006_0019);

        assert_eq!(read_cdiv(&block), 100);
        assert_eq!(read_tout(&block), 355);
        assert_eq!(read_delay(&block), timing.delay);
    }

    proptest! {
        #[test]
        fn delays_follow_the_driver_formula(half in 1u16..=32767) {
            let cdiv = half * 2;
            let timing = validate_and_derive(cdiv as i64, 0).unwrap();
            prop_assert_eq!(timing.cdiv, cdiv);
            prop_assert_eq!(timing.delay.fedl, (cdiv / 16).max(1));
            prop_assert_eq!(timing.delay.redl, (cdiv / 4).max(1));
            prop_assert!(timing.delay.fedl <= cdiv / 2);
            prop_assert!(timing.delay.redl <= cdiv / 2);
        }

        #[test]
        fn accepted_dividers_are_even(cdiv in 2i64..=CDIV_MAX) {
            let timing = validate_and_derive(cdiv, 0).unwrap();
            prop_assert_eq!(timing.cdiv % 2, 0);
            prop_assert!(timing.cdiv as i64 == cdiv || timing.cdiv as i64 == cdiv - 1);
        }
    }
}
