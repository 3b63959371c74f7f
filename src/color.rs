use enum_map::Enum;
use serde::{Deserialize, Serialize};
use strum::EnumIter;


// Side of the board. Also identifies the seat a participant occupies in a session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[derive(Enum, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Red => Color::Blue,
            Color::Blue => Color::Red,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_string(&Color::Red).unwrap(), r#""red""#);
        assert_eq!(serde_json::from_str::<Color>(r#""blue""#).unwrap(), Color::Blue);
        assert!(serde_json::from_str::<Color>(r#""Blue""#).is_err());
    }

    #[test]
    fn opponent_is_involution() {
        use strum::IntoEnumIterator;
        for color in Color::iter() {
            assert_ne!(color.opponent(), color);
            assert_eq!(color.opponent().opponent(), color);
        }
    }
}
