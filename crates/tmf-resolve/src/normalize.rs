//! Value comparison policy.
//!
//! Values are stored exactly as written. Normalization only decides whether
//! two values count as equal when computing the custom flag.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// How setting values are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Byte-for-byte comparison: "0.20" and "0.2" differ.
    #[default]
    Exact,

    /// Trimmed; decimals lose trailing zeros ("0.20" == "0.2", "3.0" == "3");
    /// "true"/"false" become "1"/"0"; applied per element of comma lists.
    Canonical,
}

impl Normalization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Normalization::Exact => "exact",
            Normalization::Canonical => "canonical",
        }
    }

    /// Comparison form of a value.
    pub fn normalize<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            Normalization::Exact => Cow::Borrowed(value),
            Normalization::Canonical => Cow::Owned(
                value
                    .split(',')
                    .map(canonical_scalar)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }

    /// Whether two values are equal under this policy.
    pub fn same(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Normalization::Exact),
            "canonical" => Ok(Normalization::Canonical),
            other => Err(format!(
                "unknown normalization '{}' (expected exact or canonical)",
                other
            )),
        }
    }
}

fn canonical_scalar(raw: &str) -> String {
    let value = raw.trim();

    if value.eq_ignore_ascii_case("true") {
        return "1".to_string();
    }
    if value.eq_ignore_ascii_case("false") {
        return "0".to_string();
    }

    if let Some(number) = value.strip_suffix('%') {
        if let Some(canon) = canonical_number(number.trim()) {
            return format!("{}%", canon);
        }
    }

    canonical_number(value).unwrap_or_else(|| value.to_string())
}

/// Plain decimal literal without trailing fractional zeros. None if `s` is
/// not a plain decimal.
fn canonical_number(s: &str) -> Option<String> {
    let (sign, body) = match s.as_bytes().first()? {
        b'-' => ("-", &s[1..]),
        b'+' => ("", &s[1..]),
        _ => ("", s),
    };

    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };

    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !frac_part.map_or(true, all_digits) {
        return None;
    }
    if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
        return None;
    }

    let frac = frac_part.unwrap_or("").trim_end_matches('0');
    let int = if int_part.is_empty() { "0" } else { int_part };
    let canon = if frac.is_empty() {
        format!("{}{}", sign, int)
    } else {
        format!("{}{}.{}", sign, int, frac)
    };
    Some(canon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_keeps_formatting_differences() {
        let n = Normalization::Exact;
        assert!(!n.same("0.20", "0.2"));
        assert!(!n.same("1", "true"));
        assert!(n.same("gyroid", "gyroid"));
    }

    #[test]
    fn test_canonical_trailing_zeros() {
        let n = Normalization::Canonical;
        assert!(n.same("0.20", "0.2"));
        assert!(n.same("3.0", "3"));
        assert!(n.same("3.", "3"));
        assert!(n.same(".5", "0.5"));
        assert!(n.same("+2", "2"));
        assert!(!n.same("0.21", "0.2"));
        assert!(!n.same("-1", "1"));
    }

    #[test]
    fn test_canonical_percent() {
        let n = Normalization::Canonical;
        assert!(n.same("15.0%", "15%"));
        assert!(!n.same("15%", "15"));
    }

    #[test]
    fn test_canonical_booleans() {
        let n = Normalization::Canonical;
        assert!(n.same("true", "1"));
        assert!(n.same("FALSE", "0"));
        assert!(!n.same("true", "0"));
    }

    #[test]
    fn test_canonical_lists_and_whitespace() {
        let n = Normalization::Canonical;
        assert!(n.same("0.20, 0.30", "0.2,0.3"));
        assert!(n.same(" back ", "back"));
        assert_eq!(n.normalize("220,230.0"), "220,230");
    }

    #[test]
    fn test_canonical_leaves_words_alone() {
        let n = Normalization::Canonical;
        assert_eq!(n.normalize("no_brim"), "no_brim");
        assert_eq!(n.normalize("1.2.3"), "1.2.3");
        assert_eq!(n.normalize("-"), "-");
        assert_eq!(n.normalize(""), "");
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("exact".parse::<Normalization>().unwrap(), Normalization::Exact);
        assert_eq!("Canonical".parse::<Normalization>().unwrap(), Normalization::Canonical);
        assert!("fuzzy".parse::<Normalization>().is_err());
    }
}
