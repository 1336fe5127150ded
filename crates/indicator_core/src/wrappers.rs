use derive_more::{AsRef, Debug, Display, From, FromStr};
use serde::{Deserialize, Serialize};

/// The name of an icon. Unique within one [`crate::IndicatorState`].
#[repr(transparent)]
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AsRef, From, FromStr, Display, Debug)]
#[debug("IconName({})", _0)]
pub struct IconName(pub String);

impl std::borrow::Borrow<str> for IconName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IconName {
    fn from(s: &str) -> Self {
        IconName(s.to_owned())
    }
}

impl IconName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
