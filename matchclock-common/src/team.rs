use derivative::Derivative;
use serde::{Deserialize, Serialize};

#[derive(Derivative, Serialize, Deserialize, PartialOrd, Ord, Hash)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum Team {
    #[derivative(Default)]
    Home,
    Away,
}

impl core::fmt::Display for Team {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Self::Home => write!(f, "Home"),
            Self::Away => write!(f, "Away"),
        }
    }
}
