use chrono::{DateTime, Duration, Utc};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PricingError {
    #[error("Amounts must not be negative")]
    NegativeAmount,

    #[error("Rental end must be after its start")]
    InvalidRentalPeriod,

    #[error("Guest count must be at least {0}")]
    TooFewGuests(i32),

    #[error("Price calculation overflowed")]
    Overflow,
}

/// Final booking price in minor units, clamped at zero.
pub fn final_price(base_price: i64, discount_amount: i64) -> Result<i64, PricingError> {
    if base_price < 0 || discount_amount < 0 {
        return Err(PricingError::NegativeAmount);
    }
    Ok((base_price - discount_amount).max(0))
}

/// Number of billable days, any started day counts as a full one.
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, PricingError> {
    let span = end - start;
    if span <= Duration::zero() {
        return Err(PricingError::InvalidRentalPeriod);
    }
    // Sub-millisecond spans still start a day
    let millis = span.num_milliseconds().max(1);
    Ok((millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalQuote {
    pub days: i64,
    pub total_price: i64,
}

/// Equipment rental total: `daily_rate * ceil((end - start) / 1 day)`.
pub fn rental_quote(
    daily_rate: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<RentalQuote, PricingError> {
    if daily_rate < 0 {
        return Err(PricingError::NegativeAmount);
    }
    let days = rental_days(start, end)?;
    let total_price = daily_rate
        .checked_mul(days)
        .ok_or(PricingError::Overflow)?;

    Ok(RentalQuote { days, total_price })
}

/// Catering total: per-person price times guest count.
pub fn catering_total(
    price_per_person: i64,
    guest_count: i32,
    min_guests: i32,
) -> Result<i64, PricingError> {
    if price_per_person < 0 {
        return Err(PricingError::NegativeAmount);
    }
    if guest_count < min_guests.max(1) {
        return Err(PricingError::TooFewGuests(min_guests.max(1)));
    }
    price_per_person
        .checked_mul(i64::from(guest_count))
        .ok_or(PricingError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_discount_larger_than_price_clamps_to_zero() {
        assert_eq!(final_price(1000, 1500), Ok(0));
    }

    #[test]
    fn test_regular_discount() {
        assert_eq!(final_price(1000, 250), Ok(750));
        assert_eq!(final_price(1000, 0), Ok(1000));
    }

    #[test]
    fn test_negative_amounts_rejected() {
        assert_eq!(final_price(-1, 0), Err(PricingError::NegativeAmount));
        assert_eq!(final_price(100, -1), Err(PricingError::NegativeAmount));
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let start = at(9);
        assert_eq!(rental_days(start, start + Duration::hours(1)), Ok(1));
        assert_eq!(rental_days(start, start + Duration::hours(24)), Ok(1));
        assert_eq!(rental_days(start, start + Duration::hours(25)), Ok(2));
    }

    #[test]
    fn test_sub_second_period_is_one_day() {
        let start = at(9);
        assert_eq!(rental_days(start, start + Duration::milliseconds(500)), Ok(1));
        assert_eq!(rental_days(start, start + Duration::microseconds(1)), Ok(1));
        assert_eq!(
            rental_days(start, start - Duration::milliseconds(500)),
            Err(PricingError::InvalidRentalPeriod)
        );
    }

    #[test]
    fn test_empty_or_reversed_period_rejected() {
        let start = at(9);
        assert_eq!(
            rental_days(start, start),
            Err(PricingError::InvalidRentalPeriod)
        );
        assert_eq!(
            rental_days(start, at(8)),
            Err(PricingError::InvalidRentalPeriod)
        );
    }

    #[test]
    fn test_rental_quote() {
        let start = at(9);
        let quote = rental_quote(5000, start, start + Duration::hours(50)).unwrap();
        assert_eq!(quote.days, 3);
        assert_eq!(quote.total_price, 15000);
    }

    #[test]
    fn test_catering_total() {
        assert_eq!(catering_total(2500, 40, 20), Ok(100_000));
        assert_eq!(catering_total(2500, 10, 20), Err(PricingError::TooFewGuests(20)));
        assert_eq!(catering_total(2500, 0, 0), Err(PricingError::TooFewGuests(1)));
    }
}
