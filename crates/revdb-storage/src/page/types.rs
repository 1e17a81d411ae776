//! Page types.

use std::fmt;

/// Types of pages in a revdb store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PageType {
    /// Store root of one revision.
    Uber = 1,
    /// Radix node of an indirect tree.
    Indirect = 2,
    /// Per-revision root.
    RevisionRoot = 3,
    /// Node slots.
    Node = 4,
    /// Interned names.
    Name = 5,
}

impl PageType {
    /// Creates a PageType from a raw byte value.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Uber),
            2 => Some(Self::Indirect),
            3 => Some(Self::RevisionRoot),
            4 => Some(Self::Node),
            5 => Some(Self::Name),
            _ => None,
        }
    }

    /// Returns true if pages of this type hold child references.
    #[inline]
    pub const fn has_children(self) -> bool {
        matches!(self, Self::Uber | Self::Indirect | Self::RevisionRoot)
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uber => write!(f, "Uber"),
            Self::Indirect => write!(f, "Indirect"),
            Self::RevisionRoot => write!(f, "RevisionRoot"),
            Self::Node => write!(f, "Node"),
            Self::Name => write!(f, "Name"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_type_round_trip() {
        for ty in [
            PageType::Uber,
            PageType::Indirect,
            PageType::RevisionRoot,
            PageType::Node,
            PageType::Name,
        ] {
            assert_eq!(PageType::from_u8(ty as u8), Some(ty));
        }
        assert_eq!(PageType::from_u8(0), None);
        assert_eq!(PageType::from_u8(42), None);
    }

    #[test]
    fn test_has_children() {
        assert!(PageType::Indirect.has_children());
        assert!(!PageType::Node.has_children());
        assert!(!PageType::Name.has_children());
    }
}
