// Value reserved for "missing or unparseable" in a typed column.
pub trait Sentinel: Copy {
    fn sentinel() -> Self;
}

impl Sentinel for i8 {
    fn sentinel() -> Self {
        -1
    }
}

impl Sentinel for i16 {
    fn sentinel() -> Self {
        -1
    }
}

impl Sentinel for i32 {
    fn sentinel() -> Self {
        -1
    }
}

impl Sentinel for f64 {
    fn sentinel() -> Self {
        f64::NAN
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced<T> {
    Value(T),
    Sentinel,
}

impl<T: Sentinel> Coerced<T> {
    pub fn resolve(self) -> T {
        match self {
            Coerced::Value(value) => value,
            Coerced::Sentinel => T::sentinel(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Coerced::Sentinel)
    }
}

pub fn strip_quotes(raw: &str) -> &str {
    let raw = raw.strip_prefix('"').unwrap_or(raw);
    raw.strip_suffix('"').unwrap_or(raw)
}

pub fn normalize_field(raw: &str) -> String {
    raw.replace(';', "-")
}

pub fn coerce_text(raw: &str, width: usize) -> String {
    strip_quotes(raw).chars().take(width).collect()
}

pub fn coerce_int<T>(raw: &str) -> Coerced<T>
where
    T: Sentinel + TryFrom<i64>,
{
    let value = strip_quotes(raw).trim();
    if value.is_empty() {
        return Coerced::Sentinel;
    }
    match value.parse::<i64>() {
        Ok(parsed) => T::try_from(parsed).map_or(Coerced::Sentinel, Coerced::Value),
        Err(_) => Coerced::Sentinel,
    }
}

pub fn coerce_float(raw: &str) -> Coerced<f64> {
    let value = strip_quotes(raw).trim().replace(',', ".");
    if value.is_empty() {
        return Coerced::Sentinel;
    }
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Coerced::Value(parsed),
        _ => Coerced::Sentinel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_integer_is_sentinel() {
        assert_eq!(coerce_int::<i8>("").resolve(), -1);
        assert_eq!(coerce_int::<i16>("\"\"").resolve(), -1);
    }

    #[test]
    fn invalid_integer_is_sentinel() {
        for raw in ["abc", "1.5", "XX", "--2", "1,0"] {
            assert_eq!(coerce_int::<i8>(raw).resolve(), -1, "{raw}");
        }
    }

    #[test]
    fn out_of_range_integer_is_sentinel() {
        assert!(coerce_int::<i8>("300").is_sentinel());
        assert_eq!(coerce_int::<i16>("300").resolve(), 300);
    }

    #[test]
    fn integer_tolerates_padding() {
        assert_eq!(coerce_int::<i8>(" 12 ").resolve(), 12);
        assert_eq!(coerce_int::<i8>("-7").resolve(), -7);
    }

    #[test]
    fn comma_decimal_is_accepted() {
        assert_eq!(coerce_float("1,5").resolve(), 1.5);
        assert_eq!(coerce_float("-742015,52").resolve(), -742015.52);
    }

    #[test]
    fn invalid_float_is_nan() {
        assert!(coerce_float("abc").resolve().is_nan());
        assert!(coerce_float("").resolve().is_nan());
        assert!(coerce_float("1,2,3").resolve().is_nan());
    }

    #[test]
    fn non_finite_float_is_nan() {
        for raw in ["inf", "-inf", "-infinity", "1e999", "NaN"] {
            assert!(coerce_float(raw).is_sentinel(), "{raw}");
        }
    }

    #[test]
    fn text_is_unquoted_and_truncated() {
        assert_eq!(coerce_text("\"2016-01-01\"", 12), "2016-01-01");
        assert_eq!(coerce_text("0123456789", 6), "012345");
        assert_eq!(coerce_text("Žďár", 3), "Žďá");
    }

    #[test]
    fn separators_inside_fields_become_hyphens() {
        assert_eq!(normalize_field("a;b;c"), "a-b-c");
    }
}
