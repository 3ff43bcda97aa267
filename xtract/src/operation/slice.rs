/// One end of a numeric slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    Open,
    /// 1-based; negative counts back from the end.
    Fixed(i64),
    /// `&NAME+offset`, resolved against the variable table at run time.
    Variable { name: String, offset: i64 },
}

/// The optional `[...]` suffix of an item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Slice {
    #[default]
    Whole,
    /// `[min:max]`, inclusive.
    Bounds { min: Bound, max: Bound },
    /// `[after|before]`, keeping the text between the two markers.
    Delimited {
        after: Option<String>,
        before: Option<String>,
    },
}

impl Slice {
    pub fn is_whole(&self) -> bool {
        matches!(self, Slice::Whole)
    }

    /// Both numeric bounds are written out.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Slice::Bounds { min, max } if *min != Bound::Open && *max != Bound::Open
        )
    }
}
