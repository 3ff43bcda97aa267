use std::fmt;

/// Which of a block's matches are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    All,
    First,
    Last,
    /// First and last.
    Outer,
    /// All but first and last.
    Inner,
    /// 2nd, 4th, ...
    Even,
    /// 1st, 3rd, ...
    Odd,
    /// Component-wise child descent for multi-dot visits.
    Path,
    /// Pass the matched source text through unchanged.
    Select,
    /// 1-based.
    Nth(usize),
}

impl Position {
    pub fn parse(text: &str) -> Option<Position> {
        let position = match text {
            "all" => Position::All,
            "first" => Position::First,
            "last" => Position::Last,
            "outer" => Position::Outer,
            "inner" => Position::Inner,
            "even" => Position::Even,
            "odd" => Position::Odd,
            "path" => Position::Path,
            "select" => Position::Select,
            _ => match text.parse::<usize>() {
                Ok(n) if n > 0 => Position::Nth(n),
                _ => return None,
            },
        };
        Some(position)
    }

    /// Whether the match at 0-based `index` of `count` matches is kept.
    pub fn keeps(self, index: usize, count: usize) -> bool {
        if index >= count {
            return false;
        }
        match self {
            Position::All | Position::Path | Position::Select => true,
            Position::First => index == 0,
            Position::Last => index + 1 == count,
            Position::Outer => index == 0 || index + 1 == count,
            Position::Inner => index != 0 && index + 1 != count,
            Position::Even => index % 2 == 1,
            Position::Odd => index % 2 == 0,
            Position::Nth(n) => index + 1 == n,
        }
    }

    /// Filter `items` in order.
    pub fn select<T>(self, items: Vec<T>) -> Vec<T> {
        let count = items.len();
        items
            .into_iter()
            .enumerate()
            .filter(|(index, _)| self.keeps(*index, count))
            .map(|(_, item)| item)
            .collect()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::All => write!(f, "all"),
            Position::First => write!(f, "first"),
            Position::Last => write!(f, "last"),
            Position::Outer => write!(f, "outer"),
            Position::Inner => write!(f, "inner"),
            Position::Even => write!(f, "even"),
            Position::Odd => write!(f, "odd"),
            Position::Path => write!(f, "path"),
            Position::Select => write!(f, "select"),
            Position::Nth(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_and_inner_partition() {
        for n in 0..7 {
            let items: Vec<usize> = (0..n).collect();
            let outer = Position::Outer.select(items.clone());
            let inner = Position::Inner.select(items.clone());
            match n {
                0 => assert!(outer.is_empty()),
                1 => assert_eq!(outer, vec![0]),
                _ => assert_eq!(outer, vec![0, n - 1]),
            }
            assert_eq!(inner.len(), n.saturating_sub(2));
            if n >= 2 {
                assert_eq!(inner, (1..n - 1).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn even_and_odd_cover_everything_once() {
        let items: Vec<usize> = (0..9).collect();
        let mut both = Position::Even.select(items.clone());
        let odd = Position::Odd.select(items.clone());
        assert!(both.iter().all(|i| !odd.contains(i)));
        both.extend(odd);
        both.sort();
        assert_eq!(both, items);
    }

    #[test]
    fn nth_and_ends() {
        let items = vec!["a", "b", "c"];
        assert_eq!(Position::First.select(items.clone()), vec!["a"]);
        assert_eq!(Position::Last.select(items.clone()), vec!["c"]);
        assert_eq!(Position::Nth(2).select(items.clone()), vec!["b"]);
        assert!(Position::Nth(4).select(items).is_empty());
    }

    #[test]
    fn parses_policies() {
        assert_eq!(Position::parse("outer"), Some(Position::Outer));
        assert_eq!(Position::parse("3"), Some(Position::Nth(3)));
        assert_eq!(Position::parse("0"), None);
        assert_eq!(Position::parse("middle"), None);
    }
}
