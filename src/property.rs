use std::fmt::Display;
use std::str::FromStr;

/// Wildcard that expands to every reportable property
pub const WILDCARD: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKind {
    /// `E`: normal (Young's) modulus
    ElasticModulus,
    /// `G`: shear modulus
    ShearModulus,
    /// `v`: Poisson's ratio
    PoissonsRatio,
}

impl PropertyKind {
    fn symbol(&self) -> char {
        match self {
            PropertyKind::ElasticModulus => 'E',
            PropertyKind::ShearModulus => 'G',
            PropertyKind::PoissonsRatio => 'v',
        }
    }
}

/// An effective elastic constant to report for a load case, e.g. `E11`, `G12`, `v31`.
///
/// Direction indices are 1-based, as written in the document. Tags are only
/// built by parsing or from [`ALL_PROPERTIES`], so both indices are always 1-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyTag {
    kind: PropertyKind,
    i: u8,
    j: u8,
}

/// Every property `all` expands to, in reporting order
pub const ALL_PROPERTIES: [PropertyTag; 12] = [
    PropertyTag::new(PropertyKind::ElasticModulus, 1, 1),
    PropertyTag::new(PropertyKind::ElasticModulus, 2, 2),
    PropertyTag::new(PropertyKind::ElasticModulus, 3, 3),
    PropertyTag::new(PropertyKind::ShearModulus, 1, 2),
    PropertyTag::new(PropertyKind::ShearModulus, 2, 3),
    PropertyTag::new(PropertyKind::ShearModulus, 3, 1),
    PropertyTag::new(PropertyKind::PoissonsRatio, 1, 2),
    PropertyTag::new(PropertyKind::PoissonsRatio, 1, 3),
    PropertyTag::new(PropertyKind::PoissonsRatio, 2, 1),
    PropertyTag::new(PropertyKind::PoissonsRatio, 2, 3),
    PropertyTag::new(PropertyKind::PoissonsRatio, 3, 1),
    PropertyTag::new(PropertyKind::PoissonsRatio, 3, 2),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagError {
    /// Not `E`/`G`/`v` followed by two digits from 1-3
    Pattern,
    /// Lexically valid, but names no elastic constant (`E12`, `G11`, `v33`, ...)
    Impossible,
}

impl PropertyTag {
    const fn new(kind: PropertyKind, i: u8, j: u8) -> PropertyTag {
        PropertyTag { kind, i, j }
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// First direction, 1-3
    pub fn i(&self) -> u8 {
        self.i
    }

    /// Second direction, 1-3
    pub fn j(&self) -> u8 {
        self.j
    }

    /// Whether this tag names an elastic constant. Normal moduli live on the
    /// diagonal; shear moduli and Poisson's ratios pair two different directions.
    pub fn is_physical(&self) -> bool {
        match self.kind {
            PropertyKind::ElasticModulus => self.i == self.j,
            PropertyKind::ShearModulus | PropertyKind::PoissonsRatio => self.i != self.j,
        }
    }

    /// Zero-based diagonal strain cell that must be prescribed to extract this
    /// property, if any.
    ///
    /// `Eii` is driven by the normal strain in direction `i`, and so is `vij`
    /// (`-e_jj / e_ii`). Shear moduli have no diagonal requirement.
    pub fn required_diagonal(&self) -> Option<usize> {
        match self.kind {
            PropertyKind::ElasticModulus | PropertyKind::PoissonsRatio => {
                Some(self.i as usize - 1)
            }
            PropertyKind::ShearModulus => None,
        }
    }
}

impl FromStr for PropertyTag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 3 {
            return Err(TagError::Pattern);
        }

        let kind = match chars[0] {
            'E' => PropertyKind::ElasticModulus,
            'G' => PropertyKind::ShearModulus,
            'v' => PropertyKind::PoissonsRatio,
            _ => return Err(TagError::Pattern),
        };

        let direction = |c: char| match c {
            '1'..='3' => Ok(c as u8 - b'0'),
            _ => Err(TagError::Pattern),
        };

        let tag = PropertyTag::new(kind, direction(chars[1])?, direction(chars[2])?);
        if !tag.is_physical() {
            return Err(TagError::Impossible);
        }

        Ok(tag)
    }
}

impl Display for PropertyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.kind.symbol(), self.i, self.j)
    }
}

/// One entry of an `expectedProperties` list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyRequest {
    All,
    Tag(PropertyTag),
}

impl FromStr for PropertyRequest {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == WILDCARD {
            return Ok(PropertyRequest::All);
        }
        Ok(PropertyRequest::Tag(s.parse()?))
    }
}

impl Display for PropertyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyRequest::All => write!(f, "{}", WILDCARD),
            PropertyRequest::Tag(tag) => write!(f, "{}", tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_tags() {
        let tag: PropertyTag = "v31".parse().unwrap();
        assert_eq!(tag, PropertyTag::new(PropertyKind::PoissonsRatio, 3, 1));
        assert_eq!(tag.to_string(), "v31");

        assert_eq!("G23".parse::<PropertyTag>().unwrap().required_diagonal(), None);
        assert_eq!("E22".parse::<PropertyTag>().unwrap().required_diagonal(), Some(1));
        assert_eq!("v13".parse::<PropertyTag>().unwrap().required_diagonal(), Some(0));
    }

    #[test]
    fn rejects_malformed_tags() {
        for raw in ["", "E1", "E111", "e11", "V12", "E14", "G01", "all1", "ALL", " E11"] {
            assert_eq!(raw.parse::<PropertyTag>(), Err(TagError::Pattern), "{raw}");
        }
    }

    #[test]
    fn rejects_tags_that_name_no_constant() {
        for raw in ["E12", "E31", "G11", "G33", "v22"] {
            assert_eq!(raw.parse::<PropertyTag>(), Err(TagError::Impossible), "{raw}");
        }
    }

    #[test]
    fn required_diagonal_stays_inside_the_tensor() {
        for kind in ['E', 'G', 'v'] {
            for i in '0'..='9' {
                for j in '0'..='9' {
                    let Ok(tag) = format!("{kind}{i}{j}").parse::<PropertyTag>() else {
                        continue;
                    };
                    assert!((1..=3).contains(&tag.i()) && (1..=3).contains(&tag.j()));
                    if let Some(d) = tag.required_diagonal() {
                        assert!(d < 3, "{tag}");
                    }
                }
            }
        }
    }

    #[test]
    fn wildcard_is_a_request_not_a_tag() {
        assert_eq!("all".parse::<PropertyRequest>(), Ok(PropertyRequest::All));
        assert_eq!("all".parse::<PropertyTag>(), Err(TagError::Pattern));
    }

    #[test]
    fn full_set_is_physical_and_distinct() {
        let mut seen = std::collections::HashSet::new();
        for tag in ALL_PROPERTIES {
            assert!(tag.is_physical());
            assert!(seen.insert(tag));
        }
        let rendered: Vec<String> = ALL_PROPERTIES.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            ["E11", "E22", "E33", "G12", "G23", "G31", "v12", "v13", "v21", "v23", "v31", "v32"]
        );
    }
}
