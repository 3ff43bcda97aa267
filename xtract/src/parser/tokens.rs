use crate::operation::{
    COMPARISONS, Command, EXTRACTIONS, FORMATS, LEVELS, Level, TESTS,
};
use crate::parser::CommandLine;
use crate::parser::error::ParseError;

/// Broad role of a command-line token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Exploration,
    Conditional,
    Extraction,
    Customization,
    Variable,
    Accumulator,
    /// Element names, values, and literals.
    Argument,
}

/// The classification of one token.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub category: Category,
    pub command: Option<Command>,
}

impl Classified {
    fn new(category: Category, command: Command) -> Self {
        Classified {
            category,
            command: Some(command),
        }
    }

    fn argument() -> Self {
        Classified {
            category: Category::Argument,
            command: None,
        }
    }

    pub fn is_extraction(&self) -> bool {
        self.category == Category::Extraction
    }

    pub fn is_flag(&self) -> bool {
        self.category != Category::Argument
    }
}

/// `NAME` in `-NAME`, `--NAME`, and `&NAME`: an uppercase letter followed by
/// uppercase letters and digits.
pub fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn lookup<T: Copy>(table: &[(&'static str, T)], token: &str) -> Option<T> {
    table
        .iter()
        .find(|(flag, _)| *flag == token)
        .map(|(_, value)| *value)
}

/// Classify a single token. Unknown dash-prefixed tokens are an error.
pub fn classify(token: &str) -> Result<Classified, String> {
    let Some(rest) = token.strip_prefix('-') else {
        return Ok(Classified::argument());
    };
    // lone dashes and negative numbers are values
    if rest.is_empty()
        || rest == "-"
        || rest.starts_with(|c: char| c.is_ascii_digit() || c == '.')
    {
        return Ok(Classified::argument());
    }

    if let Some(level) = lookup(LEVELS, token) {
        return Ok(Classified::new(Category::Exploration, Command::Explore(level)));
    }
    if token == "-position" {
        return Ok(Classified::new(Category::Exploration, Command::Position));
    }
    if let Some(test) = lookup(TESTS, token) {
        return Ok(Classified::new(Category::Conditional, Command::Test(test)));
    }
    if let Some(comparison) = lookup(COMPARISONS, token) {
        return Ok(Classified::new(
            Category::Conditional,
            Command::Compare(comparison),
        ));
    }
    if token == "-else" {
        return Ok(Classified::new(Category::Conditional, Command::Else));
    }
    if let Some(extraction) = lookup(EXTRACTIONS, token) {
        return Ok(Classified::new(
            Category::Extraction,
            Command::Extract(extraction),
        ));
    }
    if let Some(format) = lookup(FORMATS, token) {
        return Ok(Classified::new(Category::Customization, Command::Format(format)));
    }
    if let Some(name) = rest.strip_prefix('-') {
        if is_variable_name(name) {
            return Ok(Classified::new(
                Category::Accumulator,
                Command::Assign {
                    name: name.to_string(),
                    accumulate: true,
                },
            ));
        }
    } else if is_variable_name(rest) {
        return Ok(Classified::new(
            Category::Variable,
            Command::Assign {
                name: rest.to_string(),
                accumulate: false,
            },
        ));
    }

    Err(format!("unrecognized argument '{}'", token))
}

/// A classified token and its index in the command line.
#[derive(Debug, Clone)]
pub struct Lexeme {
    pub index: usize,
    pub class: Classified,
}

impl Lexeme {
    pub fn level(&self) -> Option<Level> {
        match self.class.command {
            Some(Command::Explore(level)) => Some(level),
            _ => None,
        }
    }

    pub fn is_argument(&self) -> bool {
        !self.class.is_flag()
    }
}

/// Classify every token. Operands of formatting flags are taken verbatim,
/// so `-sep -` or `-lbl -X` are read as values.
pub fn lex(line: &CommandLine, file_id: usize) -> Result<Vec<Lexeme>, ParseError> {
    let mut lexemes = Vec::with_capacity(line.len());
    let mut literal = 0usize;

    for (index, token) in line.tokens().iter().enumerate() {
        if literal > 0 {
            literal -= 1;
            lexemes.push(Lexeme {
                index,
                class: Classified::argument(),
            });
            continue;
        }

        let class = classify(token).map_err(|message| {
            ParseError::error(message, line.span(index), file_id)
                .with_note("variables are written -NAME, accumulators --NAME, in uppercase")
        })?;
        literal = match &class.command {
            Some(Command::Format(format)) => format.arity(),
            _ => 0,
        };
        lexemes.push(Lexeme { index, class });
    }

    Ok(lexemes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Comparison, Extraction, Format, Test};

    #[test]
    fn flags_by_category() {
        let c = classify("-pattern").unwrap();
        assert_eq!(c.category, Category::Exploration);
        assert_eq!(c.command, Some(Command::Explore(Level::Pattern)));

        let c = classify("-unless").unwrap();
        assert_eq!(c.command, Some(Command::Test(Test::Unless)));

        let c = classify("-starts-with").unwrap();
        assert_eq!(c.command, Some(Command::Compare(Comparison::StartsWith)));

        let c = classify("-sum").unwrap();
        assert!(c.is_extraction());
        assert_eq!(c.command, Some(Command::Extract(Extraction::Sum)));

        let c = classify("-sep").unwrap();
        assert_eq!(c.command, Some(Command::Format(Format::Sep)));
    }

    #[test]
    fn variables_and_accumulators() {
        let c = classify("-PMID").unwrap();
        assert_eq!(c.category, Category::Variable);
        assert_eq!(
            c.command,
            Some(Command::Assign {
                name: "PMID".into(),
                accumulate: false
            })
        );

        let c = classify("--STATS2").unwrap();
        assert_eq!(c.category, Category::Accumulator);
    }

    #[test]
    fn values_that_look_like_flags() {
        assert_eq!(classify("-").unwrap().category, Category::Argument);
        assert_eq!(classify("-5").unwrap().category, Category::Argument);
        assert_eq!(classify("Author").unwrap().category, Category::Argument);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = classify("-elemnt").unwrap_err();
        assert!(err.contains("unrecognized argument '-elemnt'"));
        assert!(classify("-Pmid").is_err());
    }

    #[test]
    fn literal_operands_skip_classification() {
        let tokens: Vec<String> = ["-pattern", "Rec", "-sep", "-X", "-element", "A"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let line = CommandLine::new(&tokens);
        let lexemes = lex(&line, 0).unwrap();
        assert!(lexemes[1].is_argument());
        assert!(lexemes[3].is_argument());
        assert!(lexemes[4].class.is_extraction());
    }
}
