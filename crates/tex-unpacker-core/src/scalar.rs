//! Brace-tuple scalars used inside descriptor strings: `{A,B}` and
//! `{{A,B},{C,D}}`. Whitespace is ignored; decimal components are truncated
//! toward zero.

/// Parses `{A,B}`.
pub fn parse_pair(s: &str) -> Option<(i64, i64)> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    pair_body(compact.strip_prefix('{')?.strip_suffix('}')?)
}

/// Parses `{{A,B},{C,D}}`.
pub fn parse_rect(s: &str) -> Option<(i64, i64, i64, i64)> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let inner = compact.strip_prefix("{{")?.strip_suffix("}}")?;
    let (first, second) = inner.split_once("},{")?;
    let (a, b) = pair_body(first)?;
    let (c, d) = pair_body(second)?;
    Some((a, b, c, d))
}

fn pair_body(body: &str) -> Option<(i64, i64)> {
    let (a, b) = body.split_once(',')?;
    Some((number(a)?, number(b)?))
}

fn number(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if !f.is_finite() || f.abs() > i64::MAX as f64 {
        return None;
    }
    Some(f.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs() {
        assert_eq!(parse_pair("{3,-4}"), Some((3, -4)));
        assert_eq!(parse_pair(" { 64 , 32 } "), Some((64, 32)));
        assert_eq!(parse_pair("{0.5,-1.75}"), Some((0, -1)));
        assert_eq!(parse_pair("{1,2,3}"), None);
        assert_eq!(parse_pair("{1}"), None);
        assert_eq!(parse_pair("1,2"), None);
        assert_eq!(parse_pair("{a,b}"), None);
        assert_eq!(parse_pair("{inf,1}"), None);
    }

    #[test]
    fn rects() {
        assert_eq!(parse_rect("{{2,4},{30,40}}"), Some((2, 4, 30, 40)));
        assert_eq!(parse_rect("{{2, 4}, {30, 40}}"), Some((2, 4, 30, 40)));
        assert_eq!(parse_rect("{2,4}"), None);
        assert_eq!(parse_rect("{{2,4},{30}}"), None);
        assert_eq!(parse_rect(""), None);
    }
}
