use super::gast::{ContainsDatum as _, FoldCase, List};

/// Keywords the syntax layer treats specially when they head a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Quote,
    Define,
    SetBang,
    If,
    Lambda,
    Let,
}

impl SpecialForm {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "quote" => Some(Self::Quote),
            "define" => Some(Self::Define),
            "set!" => Some(Self::SetBang),
            "if" => Some(Self::If),
            "lambda" => Some(Self::Lambda),
            "let" => Some(Self::Let),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Define => "define",
            Self::SetBang => "set!",
            Self::If => "if",
            Self::Lambda => "lambda",
            Self::Let => "let",
        }
    }
}

impl List {
    /// Which special form this list invokes, judged only by its head symbol.
    ///
    /// This does not check that the rest of the list has the right shape; that is
    /// left to the syntax layer so it can report what exactly is wrong.
    pub fn special_form(&self, fold_case: &FoldCase) -> Option<SpecialForm> {
        let head = self.head()?.as_symbol()?;
        SpecialForm::from_keyword(&head.identifier_in(fold_case)?)
    }
}
