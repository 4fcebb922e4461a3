//! Comparison and array operators understood by the filter compiler.
//!
//! The table is static and read-only. Tokens are the dialect-neutral stems;
//! the active [`Dialect`](crate::Dialect) adds its prefix when rendering.

/// How an operand is laid out after the operator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// `field=op.value`; sequences are comma-joined without delimiters
    Scalar,
    /// `field=op.(a,b,c)`
    Parenthesized,
    /// `field=op.{a,b,c}` with array-literal escaping for strings
    Braced,
}

/// A single operator entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub symbol: &'static str,
    pub token: &'static str,
    pub format: ValueFormat,
}

const fn op(symbol: &'static str, token: &'static str, format: ValueFormat) -> Operator {
    Operator {
        symbol,
        token,
        format,
    }
}

/// Symbol of the implicit equality operator used for scalar leaves.
pub const EQUALITY: &str = "$eq";

/// Logical combinator keys. These are structural, not table entries.
pub const AND: &str = "$and";
pub const OR: &str = "$or";
pub const NOT: &str = "$not";

pub static OPERATORS: &[Operator] = &[
    op("$eq", "eq", ValueFormat::Scalar),
    op("$gt", "gt", ValueFormat::Scalar),
    op("$gte", "gte", ValueFormat::Scalar),
    op("$lt", "lt", ValueFormat::Scalar),
    op("$lte", "lte", ValueFormat::Scalar),
    op("$neq", "neq", ValueFormat::Scalar),
    op("$like", "like", ValueFormat::Scalar),
    op("$ilike", "ilike", ValueFormat::Scalar),
    op("$is", "is", ValueFormat::Scalar),
    op("$in", "in", ValueFormat::Parenthesized),
    op("$not.in", "not.in", ValueFormat::Parenthesized),
    // Array and range operators
    op("$cs", "cs", ValueFormat::Braced),
    op("$cd", "cd", ValueFormat::Braced),
    op("$ov", "ov", ValueFormat::Braced),
    op("$sl", "sl", ValueFormat::Braced),
    op("$sr", "sr", ValueFormat::Braced),
    op("$nxr", "nxr", ValueFormat::Braced),
    op("$nxl", "nxl", ValueFormat::Braced),
    op("$adj", "adj", ValueFormat::Braced),
];

impl Operator {
    /// Find the operator registered under `symbol`.
    pub fn lookup(symbol: &str) -> Option<&'static Operator> {
        OPERATORS.iter().find(|o| o.symbol == symbol)
    }

    /// The implicit equality operator.
    pub fn equality() -> &'static Operator {
        // The table always contains `$eq`.
        &OPERATORS[0]
    }
}

/// Keys beginning with `$` are reserved for operators and combinators.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with('$')
}

/// `$and` / `$or`.
pub fn is_combinator(key: &str) -> bool {
    key == AND || key == OR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_operators() {
        let gt = Operator::lookup("$gt").unwrap();
        assert_eq!(gt.token, "gt");
        assert_eq!(gt.format, ValueFormat::Scalar);

        let not_in = Operator::lookup("$not.in").unwrap();
        assert_eq!(not_in.token, "not.in");
        assert_eq!(not_in.format, ValueFormat::Parenthesized);

        assert_eq!(Operator::lookup("$ov").unwrap().format, ValueFormat::Braced);
    }

    #[test]
    fn test_lookup_rejects_logical_and_unknown() {
        assert!(Operator::lookup("$or").is_none());
        assert!(Operator::lookup("$not").is_none());
        assert!(Operator::lookup("$between").is_none());
        assert!(Operator::lookup("gt").is_none());
    }

    #[test]
    fn test_equality_entry() {
        assert_eq!(Operator::equality().symbol, EQUALITY);
        assert_eq!(Operator::equality().token, "eq");
    }

    #[test]
    fn test_symbols_are_unique_and_reserved() {
        for (i, a) in OPERATORS.iter().enumerate() {
            assert!(is_reserved(a.symbol));
            assert!(!is_combinator(a.symbol));
            for b in &OPERATORS[i + 1..] {
                assert_ne!(a.symbol, b.symbol);
            }
        }
    }
}
