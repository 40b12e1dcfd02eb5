//! Reading numbers typed into the options page.

/// Parse an options-page field. Anything that is not a finite number reads
/// as `minimum`, which the store then clamps like any other value.
pub fn option_value(raw: &str, minimum: f64) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(minimum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_read_as_is() {
        assert_eq!(option_value("1.75", 0.25), 1.75);
        assert_eq!(option_value(" 250 ", 0.0), 250.0);
    }

    #[test]
    fn garbage_reads_as_minimum() {
        assert_eq!(option_value("fast", 0.25), 0.25);
        assert_eq!(option_value("NaN", 0.0), 0.0);
        assert_eq!(option_value("", 0.0), 0.0);
    }
}
