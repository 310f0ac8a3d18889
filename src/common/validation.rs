// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

// Limites das colunas NUMERIC(12,3) e NUMERIC(14,2)
const MAX_QTY_EXCLUSIVE: i64 = 1_000_000_000;
const MAX_MONEY_EXCLUSIVE: i64 = 1_000_000_000_000;
const QTY_SCALE: u32 = 3;
const MONEY_SCALE: u32 = 2;

fn range_error(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("range");
    err.message = Some(message.into());
    err
}

fn scale_error(max_scale: u32) -> ValidationError {
    let mut err = ValidationError::new("scale");
    err.message = Some(format!("No máximo {max_scale} casas decimais.").into());
    err.add_param("max_scale".into(), &max_scale);
    err
}

// "2.500" e "2.5" são o mesmo valor: zeros à direita não contam
fn ensure_scale(val: &Decimal, max_scale: u32) -> Result<(), ValidationError> {
    if val.normalize().scale() > max_scale {
        return Err(scale_error(max_scale));
    }
    Ok(())
}

fn ensure_below(val: &Decimal, limit: i64, message: &'static str) -> Result<(), ValidationError> {
    if *val >= Decimal::from(limit) {
        let mut err = range_error(message);
        err.add_param("max".into(), &limit);
        return Err(err);
    }
    Ok(())
}

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = range_error("O valor não pode ser negativo.");
        err.add_param("min".into(), &0.0);
        return Err(err);
    }
    Ok(())
}

pub fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        return Err(range_error("O valor deve ser maior que zero."));
    }
    Ok(())
}

// Taxa de IVA/TVA em percentual: 0..=100
pub fn validate_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::ONE_HUNDRED {
        return Err(range_error("A taxa deve estar entre 0 e 100."));
    }
    ensure_scale(val, MONEY_SCALE)
}

/// Quantidade de uma linha de fatura: `0 < qty < 10^9`, até 3 casas.
pub fn validate_quantity(val: &Decimal) -> Result<(), ValidationError> {
    validate_positive(val)?;
    ensure_below(val, MAX_QTY_EXCLUSIVE, "Quantidade acima do limite permitido.")?;
    ensure_scale(val, QTY_SCALE)
}

/// Preço unitário: `0 <= preço < 10^12`, até 2 casas.
pub fn validate_unit_price(val: &Decimal) -> Result<(), ValidationError> {
    validate_not_negative(val)?;
    ensure_below(val, MAX_MONEY_EXCLUSIVE, "Valor acima do limite permitido.")?;
    ensure_scale(val, MONEY_SCALE)
}

/// Valor de pagamento: `0 < valor < 10^12`, até 2 casas.
pub fn validate_amount(val: &Decimal) -> Result<(), ValidationError> {
    validate_positive(val)?;
    ensure_below(val, MAX_MONEY_EXCLUSIVE, "Valor acima do limite permitido.")?;
    ensure_scale(val, MONEY_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn percentage_bounds_are_inclusive() {
        assert!(validate_percentage(&Decimal::ZERO).is_ok());
        assert!(validate_percentage(&Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_percentage(&dec("5.5")).is_ok());
        assert!(validate_percentage(&Decimal::from(101)).is_err());
        assert!(validate_percentage(&Decimal::from(-1)).is_err());
        assert!(validate_percentage(&dec("5.555")).is_err());
    }

    #[test]
    fn positive_rejects_zero() {
        assert!(validate_positive(&Decimal::ZERO).is_err());
        assert!(validate_not_negative(&Decimal::ZERO).is_ok());
    }

    #[test]
    fn quantity_is_bounded_by_the_column_precision() {
        assert!(validate_quantity(&dec("1.5")).is_ok());
        assert!(validate_quantity(&dec("999999999.999")).is_ok());
        assert!(validate_quantity(&dec("2.5000")).is_ok());

        let err = validate_quantity(&dec("1000000000")).unwrap_err();
        assert_eq!(err.code, "range");
        let err = validate_quantity(&dec("100000000000000000")).unwrap_err();
        assert_eq!(err.code, "range");
        let err = validate_quantity(&dec("0.0005")).unwrap_err();
        assert_eq!(err.code, "scale");
        assert!(validate_quantity(&Decimal::ZERO).is_err());
    }

    #[test]
    fn unit_price_is_bounded_by_the_column_precision() {
        assert!(validate_unit_price(&Decimal::ZERO).is_ok());
        assert!(validate_unit_price(&dec("19.99")).is_ok());
        assert!(validate_unit_price(&dec("999999999999.99")).is_ok());

        assert_eq!(validate_unit_price(&dec("1000000000000")).unwrap_err().code, "range");
        assert_eq!(validate_unit_price(&dec("0.005")).unwrap_err().code, "scale");
        assert_eq!(validate_unit_price(&dec("12.345")).unwrap_err().code, "scale");
        assert!(validate_unit_price(&dec("-1")).is_err());
    }

    #[test]
    fn payment_amounts_are_positive_cents() {
        assert!(validate_amount(&dec("240.00")).is_ok());
        assert!(validate_amount(&Decimal::ZERO).is_err());
        assert_eq!(validate_amount(&dec("0.001")).unwrap_err().code, "scale");
        assert_eq!(validate_amount(&dec("1000000000000")).unwrap_err().code, "range");
    }
}
