// Valores monetários sempre com 2 casas (NUMERIC(12,2) no banco)

use rust_decimal::{Decimal, RoundingStrategy};

pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Soma valores opcionais; extração falha deixa `None`, que conta como zero.
pub fn sum_amounts<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    round_money(values.into_iter().flatten().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn missing_amounts_count_as_zero() {
        let total = sum_amounts(vec![
            Some(Decimal::from_str("45.00").unwrap()),
            None,
            Some(Decimal::from_str("3.93").unwrap()),
        ]);
        assert_eq!(total, Decimal::from_str("48.93").unwrap());
        assert_eq!(sum_amounts(Vec::new()), Decimal::ZERO);
    }

    #[test]
    fn always_renders_two_places() {
        assert_eq!(round_money(Decimal::from(45)).to_string(), "45.00");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(
            round_money(Decimal::from_str("10.005").unwrap()),
            Decimal::from_str("10.01").unwrap()
        );
    }
}
