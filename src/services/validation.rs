//! Custom field validators used by the service input types

use rust_decimal::Decimal;
use std::borrow::Cow;
use validator::ValidationError;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn price_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("price", "O preço não pode ser negativo"));
    }
    Ok(())
}

pub fn finance_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid(
            "finance",
            "Valores de financiamento não podem ser negativos",
        ));
    }
    Ok(())
}

pub fn amount_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(invalid("amount", "O valor deve ser maior que zero"));
    }
    Ok(())
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "Campo obrigatório não informado"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0), true)]
    #[case(dec!(0.01), true)]
    #[case(dec!(-0.01), false)]
    fn prices(#[case] value: Decimal, #[case] ok: bool) {
        assert_eq!(price_non_negative(&value).is_ok(), ok);
    }

    #[rstest]
    #[case(dec!(0), false)]
    #[case(dec!(-10), false)]
    #[case(dec!(0.01), true)]
    fn amounts(#[case] value: Decimal, #[case] ok: bool) {
        assert_eq!(amount_positive(&value).is_ok(), ok);
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(not_blank("  ").is_err());
        assert!(not_blank("Honda").is_ok());
    }
}
