pub mod slice;
pub mod step;

use std::ops::Range;

use crate::operation::step::Step;

/// Group-starting and group-continuing condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Test {
    If,
    Unless,
    And,
    Or,
    /// Synonym of `-if`.
    Select,
    /// Deprecated `-if` accepting `element:value`.
    Match,
    /// Deprecated `-unless` accepting `element:value`.
    Avoid,
}

impl Test {
    /// True for the flags that open a new condition group.
    pub fn starts_group(self) -> bool {
        !matches!(self, Test::And | Test::Or)
    }

    /// True for the flags whose group suppresses the block when a test matches.
    pub fn is_negated(self) -> bool {
        matches!(self, Test::Unless | Test::Avoid)
    }
}

/// Right-hand side tests attached to a condition step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equals,
    Contains,
    Includes,
    IsWithin,
    StartsWith,
    EndsWith,
    IsNot,
    IsBefore,
    IsAfter,
    Matches,
    Resembles,
    IsEqualTo,
    DiffersFrom,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Comparison {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Comparison::Gt
                | Comparison::Ge
                | Comparison::Lt
                | Comparison::Le
                | Comparison::Eq
                | Comparison::Ne
        )
    }

    /// Comparisons whose right-hand side names another element of the current node.
    pub fn is_element_relative(self) -> bool {
        matches!(self, Comparison::IsEqualTo | Comparison::DiffersFrom)
    }
}

/// Value-producing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extraction {
    // selection
    Element,
    First,
    Last,
    Even,
    Odd,
    Backward,
    // string transforms
    Encode,
    Decode,
    Upper,
    Lower,
    Chain,
    Title,
    Mirror,
    Alpha,
    Alnum,
    Plain,
    Trim,
    Basic,
    Order,
    Wct,
    Doi,
    Translate,
    Replace,
    // numeric
    Num,
    Len,
    Sum,
    Acc,
    Min,
    Max,
    Inc,
    Dec,
    Sub,
    Avg,
    Dev,
    Med,
    Mul,
    Div,
    Mod,
    Bin,
    Oct,
    Hex,
    Bit,
    Pad,
    Log,
    Ln,
    Lg2,
    // indexing and word streams
    Indices,
    Article,
    Abstract,
    Paragraph,
    Stemmed,
    Terms,
    Words,
    Pairs,
    Reverse,
    Clauses,
    Letters,
    // citation formatting
    Year,
    Month,
    Date,
    Auth,
    Initials,
    Jour,
    Prop,
    Page,
    // sequence formatting
    Revcomp,
    Nucleic,
    Fasta,
    Ncbi2na,
    Ncbi4na,
    Molwt,
    Hgvs,
    // lookups and side effects
    Classify,
    Meshcode,
    Matrix,
    Histogram,
    Test,
    Scan,
}

/// Commands that change how later values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Pfx,
    Sfx,
    Sep,
    Tab,
    Ret,
    Lbl,
    Clr,
    Pfc,
    Deq,
    Plg,
    Elg,
    Rst,
    Def,
    Wrp,
    Enc,
    Pkg,
    Reg,
    Exp,
    Color,
    Tag,
    Att,
    Atr,
    Cls,
    Slf,
    End,
    Fwd,
    Awd,
}

impl Format {
    /// Number of literal tokens consumed after the flag.
    pub fn arity(self) -> usize {
        match self {
            Format::Clr | Format::Rst | Format::Cls | Format::Slf => 0,
            Format::Att | Format::Atr => 2,
            _ => 1,
        }
    }
}

/// The exploration levels, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Unit,
    Subset,
    Section,
    Block,
    Branch,
    Group,
    Division,
    Path,
    Pattern,
    /// The synthetic scope that owns the `-pattern` block.
    Root,
}

/// Every command-line flag the compiler understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Explore(Level),
    Position,
    Test(Test),
    Compare(Comparison),
    Extract(Extraction),
    Format(Format),
    Else,
    /// `-NAME` or `--NAME`.
    Assign { name: String, accumulate: bool },
}

pub const LEVELS: &[(&str, Level)] = &[
    ("-unit", Level::Unit),
    ("-subset", Level::Subset),
    ("-section", Level::Section),
    ("-block", Level::Block),
    ("-branch", Level::Branch),
    ("-group", Level::Group),
    ("-division", Level::Division),
    ("-path", Level::Path),
    ("-pattern", Level::Pattern),
];

pub const TESTS: &[(&str, Test)] = &[
    ("-if", Test::If),
    ("-unless", Test::Unless),
    ("-and", Test::And),
    ("-or", Test::Or),
    ("-select", Test::Select),
    ("-match", Test::Match),
    ("-avoid", Test::Avoid),
];

pub const COMPARISONS: &[(&str, Comparison)] = &[
    ("-equals", Comparison::Equals),
    ("-contains", Comparison::Contains),
    ("-includes", Comparison::Includes),
    ("-is-within", Comparison::IsWithin),
    ("-starts-with", Comparison::StartsWith),
    ("-ends-with", Comparison::EndsWith),
    ("-is-not", Comparison::IsNot),
    ("-is-before", Comparison::IsBefore),
    ("-is-after", Comparison::IsAfter),
    ("-matches", Comparison::Matches),
    ("-resembles", Comparison::Resembles),
    ("-is-equal-to", Comparison::IsEqualTo),
    ("-differs-from", Comparison::DiffersFrom),
    ("-gt", Comparison::Gt),
    ("-ge", Comparison::Ge),
    ("-lt", Comparison::Lt),
    ("-le", Comparison::Le),
    ("-eq", Comparison::Eq),
    ("-ne", Comparison::Ne),
];

pub const EXTRACTIONS: &[(&str, Extraction)] = &[
    ("-element", Extraction::Element),
    ("-first", Extraction::First),
    ("-last", Extraction::Last),
    ("-even", Extraction::Even),
    ("-odd", Extraction::Odd),
    ("-backward", Extraction::Backward),
    ("-encode", Extraction::Encode),
    ("-decode", Extraction::Decode),
    ("-upper", Extraction::Upper),
    ("-lower", Extraction::Lower),
    ("-chain", Extraction::Chain),
    ("-title", Extraction::Title),
    ("-mirror", Extraction::Mirror),
    ("-alpha", Extraction::Alpha),
    ("-alnum", Extraction::Alnum),
    ("-plain", Extraction::Plain),
    ("-trim", Extraction::Trim),
    ("-basic", Extraction::Basic),
    ("-order", Extraction::Order),
    ("-wct", Extraction::Wct),
    ("-doi", Extraction::Doi),
    ("-translate", Extraction::Translate),
    ("-replace", Extraction::Replace),
    ("-num", Extraction::Num),
    ("-len", Extraction::Len),
    ("-sum", Extraction::Sum),
    ("-acc", Extraction::Acc),
    ("-min", Extraction::Min),
    ("-max", Extraction::Max),
    ("-inc", Extraction::Inc),
    ("-dec", Extraction::Dec),
    ("-sub", Extraction::Sub),
    ("-avg", Extraction::Avg),
    ("-dev", Extraction::Dev),
    ("-med", Extraction::Med),
    ("-mul", Extraction::Mul),
    ("-div", Extraction::Div),
    ("-mod", Extraction::Mod),
    ("-bin", Extraction::Bin),
    ("-oct", Extraction::Oct),
    ("-hex", Extraction::Hex),
    ("-bit", Extraction::Bit),
    ("-pad", Extraction::Pad),
    ("-log", Extraction::Log),
    ("-ln", Extraction::Ln),
    ("-lg2", Extraction::Lg2),
    ("-indices", Extraction::Indices),
    ("-article", Extraction::Article),
    ("-abstract", Extraction::Abstract),
    ("-paragraph", Extraction::Paragraph),
    ("-stemmed", Extraction::Stemmed),
    ("-terms", Extraction::Terms),
    ("-words", Extraction::Words),
    ("-pairs", Extraction::Pairs),
    ("-reverse", Extraction::Reverse),
    ("-clauses", Extraction::Clauses),
    ("-letters", Extraction::Letters),
    ("-year", Extraction::Year),
    ("-month", Extraction::Month),
    ("-date", Extraction::Date),
    ("-auth", Extraction::Auth),
    ("-initials", Extraction::Initials),
    ("-jour", Extraction::Jour),
    ("-prop", Extraction::Prop),
    ("-page", Extraction::Page),
    ("-revcomp", Extraction::Revcomp),
    ("-nucleic", Extraction::Nucleic),
    ("-fasta", Extraction::Fasta),
    ("-ncbi2na", Extraction::Ncbi2na),
    ("-ncbi4na", Extraction::Ncbi4na),
    ("-molwt", Extraction::Molwt),
    ("-hgvs", Extraction::Hgvs),
    ("-classify", Extraction::Classify),
    ("-meshcode", Extraction::Meshcode),
    ("-matrix", Extraction::Matrix),
    ("-histogram", Extraction::Histogram),
    ("-test", Extraction::Test),
    ("-scan", Extraction::Scan),
];

pub const FORMATS: &[(&str, Format)] = &[
    ("-pfx", Format::Pfx),
    ("-sfx", Format::Sfx),
    ("-sep", Format::Sep),
    ("-tab", Format::Tab),
    ("-ret", Format::Ret),
    ("-lbl", Format::Lbl),
    ("-clr", Format::Clr),
    ("-pfc", Format::Pfc),
    ("-deq", Format::Deq),
    ("-plg", Format::Plg),
    ("-elg", Format::Elg),
    ("-rst", Format::Rst),
    ("-def", Format::Def),
    ("-wrp", Format::Wrp),
    ("-enc", Format::Enc),
    ("-pkg", Format::Pkg),
    ("-reg", Format::Reg),
    ("-exp", Format::Exp),
    ("-color", Format::Color),
    ("-tag", Format::Tag),
    ("-att", Format::Att),
    ("-atr", Format::Atr),
    ("-cls", Format::Cls),
    ("-slf", Format::Slf),
    ("-end", Format::End),
    ("-fwd", Format::Fwd),
    ("-awd", Format::Awd),
];

fn flag_of<T: PartialEq + Copy>(table: &[(&'static str, T)], value: T) -> &'static str {
    table
        .iter()
        .find(|(_, v)| *v == value)
        .map(|(flag, _)| *flag)
        .unwrap_or("?")
}

impl Level {
    pub fn flag(self) -> &'static str {
        match self {
            Level::Root => "(root)",
            level => flag_of(LEVELS, level),
        }
    }
}

impl Test {
    pub fn flag(self) -> &'static str {
        flag_of(TESTS, self)
    }
}

impl Comparison {
    pub fn flag(self) -> &'static str {
        flag_of(COMPARISONS, self)
    }
}

impl Extraction {
    pub fn flag(self) -> &'static str {
        flag_of(EXTRACTIONS, self)
    }
}

impl Format {
    pub fn flag(self) -> &'static str {
        flag_of(FORMATS, self)
    }
}

/// Where an extracted value goes instead of the output stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub name: String,
    /// `--NAME` appends with the current separator.
    pub accumulate: bool,
}

/// What a compiled operation does.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    Test(Test),
    Extract(Extraction),
    Format(Format),
}

/// One compiled command with its operand steps.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    /// Operands. For condition operations, a second step holds the comparison.
    pub steps: Vec<Step>,
    /// Literal argument of a formatting command, with escapes resolved.
    pub value: String,
    /// Second literal argument (`-att key value`).
    pub extra: String,
    /// Value source for `-atr key element`.
    pub attribute: Option<Box<Operation>>,
    pub target: Option<Target>,
    /// Byte span in the reconstructed command line.
    pub span: Range<usize>,
}

impl Operation {
    pub fn new(kind: OperationKind, span: Range<usize>) -> Self {
        Operation {
            kind,
            steps: Vec::new(),
            value: String::new(),
            extra: String::new(),
            attribute: None,
            target: None,
            span,
        }
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// The comparison step of a condition operation, if any.
    pub fn constraint(&self) -> Option<&Step> {
        self.steps.get(1)
    }

    pub fn flag(&self) -> &'static str {
        match &self.kind {
            OperationKind::Test(t) => t.flag(),
            OperationKind::Extract(e) => e.flag(),
            OperationKind::Format(f) => f.flag(),
        }
    }
}
