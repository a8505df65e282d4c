// src/flavor/mod.rs
//! Flavor specification parsing and the frozen storage form
//!
//! Flavors describe build-time variations like architecture and features.
//! The human form follows Conary syntax: `[ssl, !debug, ~vmware, is: x86_64]`.
//!
//! The repository database stores flavors frozen, one dependency class per
//! section, each section prefixed by its class tag:
//!
//! ```text
//! 1#x86:x86_64|5#use:!debug:ssl:~vmware
//! ```
//!
//! Both forms are canonical: items sorted by name, architectures sorted and
//! deduplicated. Two flavors are only ever compared after canonicalization,
//! so the frozen strings can be matched byte for byte in SQL.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Class tag for the instruction set section of a frozen flavor
const ARCH_CLASS: &str = "1";
/// Class tag for the use flag section of a frozen flavor
const USE_CLASS: &str = "5";
/// Dependency name carried by the use flag section
const USE_DEP: &str = "use";

/// Characters reserved by the human or frozen syntax
const RESERVED: &[char] = &[':', '|', '#', '[', ']', ',', ' '];

/// Prefix operator of a flavor item
///
/// Items sort by name first; the operator, in declaration order, only
/// breaks ties between items of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlavorOp {
    Required,
    /// `!`
    Not,
    /// `~`
    Prefers,
    /// `~!`
    PrefersNot,
}

impl FlavorOp {
    pub fn as_prefix(&self) -> &'static str {
        match self {
            Self::Required => "",
            Self::Not => "!",
            Self::Prefers => "~",
            Self::PrefersNot => "~!",
        }
    }

    /// Split `~!xen` into its operator and `xen`
    pub fn parse_with_name(s: &str) -> Result<(Self, &str)> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ParseError("Empty flavor item".to_string()));
        }

        // Longer operators first
        let (op, name) = if let Some(rest) = s.strip_prefix("~!") {
            (Self::PrefersNot, rest.trim())
        } else if let Some(rest) = s.strip_prefix('~') {
            (Self::Prefers, rest.trim())
        } else if let Some(rest) = s.strip_prefix('!') {
            (Self::Not, rest.trim())
        } else {
            (Self::Required, s)
        };

        if name.is_empty() {
            return Err(Error::ParseError(format!(
                "Missing name after {} operator",
                op.as_prefix()
            )));
        }
        validate_name(name)?;

        Ok((op, name))
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.contains(RESERVED) {
        return Err(Error::ParseError(format!(
            "Invalid character in flavor name '{name}'"
        )));
    }
    Ok(())
}

/// One use flag of a flavor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlavorItem {
    pub op: FlavorOp,
    pub name: String,
}

impl FlavorItem {
    pub fn parse(s: &str) -> Result<Self> {
        let (op, name) = FlavorOp::parse_with_name(s)?;
        Ok(Self {
            op,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for FlavorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_prefix(), self.name)
    }
}

/// Instruction sets, written `is: x86 x86_64`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchSpec {
    pub architectures: Vec<String>,
}

impl fmt::Display for ArchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "is: {}", self.architectures.join(" "))
    }
}

/// A whole flavor: use flags plus optional instruction sets
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlavorSpec {
    pub items: Vec<FlavorItem>,
    pub arch: Option<ArchSpec>,
}

impl FlavorSpec {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.arch.is_none()
    }

    /// Sort items by name then operator; dedup items and instruction sets
    pub fn canonicalize(&mut self) {
        self.items
            .sort_by(|a, b| a.name.cmp(&b.name).then(a.op.cmp(&b.op)));
        self.items.dedup();

        if let Some(arch) = &mut self.arch {
            arch.architectures.sort();
            arch.architectures.dedup();
        }
    }

    /// Parse the human form, with or without brackets
    ///
    /// `[ssl, !debug, is: x86_64]`, `ssl,!debug`, `is:x86` and `[]` are all
    /// accepted. The result is already canonical.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        let inner = if s.starts_with('[') && s.ends_with(']') {
            &s[1..s.len() - 1]
        } else {
            s
        };

        let mut items = Vec::new();
        let mut arch = None;

        for part in inner.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some(arch_str) = part.strip_prefix("is:") {
                let architectures = arch_str
                    .split_whitespace()
                    .map(|a| validate_name(a).map(|_| a.to_string()))
                    .collect::<Result<Vec<_>>>()?;

                if architectures.is_empty() {
                    return Err(Error::ParseError(
                        "Empty architecture specification after 'is:'".to_string(),
                    ));
                }
                arch = Some(ArchSpec { architectures });
            } else {
                items.push(FlavorItem::parse(part)?);
            }
        }

        let mut spec = Self { items, arch };
        spec.canonicalize();
        Ok(spec)
    }

    /// The canonical flavor text without surrounding brackets
    ///
    /// This is the form carried in documents and inside trove keys
    /// (`name=version[body]`).
    pub fn body(&self) -> String {
        let mut parts: Vec<String> = self.items.iter().map(|item| item.to_string()).collect();

        // Architecture always goes last
        if let Some(ref arch) = self.arch {
            parts.push(arch.to_string());
        }

        parts.join(", ")
    }

    /// Freeze into the storage form used by the `Flavors` table
    pub fn freeze(&self) -> String {
        let mut sections = Vec::new();

        if let Some(ref arch) = self.arch {
            sections.push(format!("{ARCH_CLASS}#{}", arch.architectures.join(":")));
        }

        if !self.items.is_empty() {
            let flags: Vec<String> = self.items.iter().map(|item| item.to_string()).collect();
            sections.push(format!("{USE_CLASS}#{USE_DEP}:{}", flags.join(":")));
        }

        sections.join("|")
    }

    /// Thaw a frozen flavor back into a canonical spec
    pub fn thaw(frozen: &str) -> Result<Self> {
        let mut items = Vec::new();
        let mut arch = None;

        for section in frozen.split('|').filter(|s| !s.is_empty()) {
            let (class, body) = section.split_once('#').ok_or_else(|| {
                Error::ParseError(format!("Frozen flavor section without class: {section}"))
            })?;

            match class {
                ARCH_CLASS => {
                    let architectures: Vec<String> = body
                        .split(':')
                        .filter(|a| !a.is_empty())
                        .map(str::to_string)
                        .collect();
                    if architectures.is_empty() {
                        return Err(Error::ParseError(format!(
                            "Empty instruction set section in '{frozen}'"
                        )));
                    }
                    arch = Some(ArchSpec { architectures });
                }
                USE_CLASS => {
                    let mut flags = body.split(':');
                    if flags.next() != Some(USE_DEP) {
                        return Err(Error::ParseError(format!(
                            "Use section without '{USE_DEP}' name in '{frozen}'"
                        )));
                    }
                    for flag in flags {
                        items.push(FlavorItem::parse(flag)?);
                    }
                }
                other => {
                    return Err(Error::ParseError(format!(
                        "Unknown flavor class '{other}' in '{frozen}'"
                    )));
                }
            }
        }

        let mut spec = Self { items, arch };
        spec.canonicalize();
        Ok(spec)
    }
}

impl fmt::Display for FlavorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "[{}]", self.body())
    }
}

impl FromStr for FlavorSpec {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FlavorSpec::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_op_parse() {
        assert_eq!(
            FlavorOp::parse_with_name("ssl").unwrap(),
            (FlavorOp::Required, "ssl")
        );
        assert_eq!(
            FlavorOp::parse_with_name("!debug").unwrap(),
            (FlavorOp::Not, "debug")
        );
        assert_eq!(
            FlavorOp::parse_with_name("~vmware").unwrap(),
            (FlavorOp::Prefers, "vmware")
        );
        assert_eq!(
            FlavorOp::parse_with_name("  ~! xen  ").unwrap(),
            (FlavorOp::PrefersNot, "xen")
        );
    }

    #[test]
    fn test_flavor_op_parse_errors() {
        assert!(FlavorOp::parse_with_name("").is_err());
        assert!(FlavorOp::parse_with_name("!").is_err());
        assert!(FlavorOp::parse_with_name("~!").is_err());
        assert!(FlavorOp::parse_with_name("a|b").is_err());
    }

    #[test]
    fn test_parse_arch_without_space() {
        let spec = FlavorSpec::parse("is:x86").unwrap();
        assert!(spec.items.is_empty());
        assert_eq!(spec.arch.unwrap().architectures, vec!["x86".to_string()]);
    }

    #[test]
    fn test_parse_mixed_is_canonical() {
        let spec = FlavorSpec::parse("[ssl, !debug, is: x86_64 x86 x86_64]").unwrap();
        assert_eq!(spec.items[0].name, "debug");
        assert_eq!(spec.items[1].name, "ssl");
        assert_eq!(spec.body(), "!debug, ssl, is: x86 x86_64");
        assert_eq!(spec.to_string(), "[!debug, ssl, is: x86 x86_64]");
    }

    #[test]
    fn test_same_name_items_have_one_canonical_form() {
        let a = FlavorSpec::parse("[ssl, ~ssl]").unwrap();
        let b = FlavorSpec::parse("[~ssl, ssl]").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.freeze(), "5#use:ssl:~ssl");
        assert_eq!(b.freeze(), a.freeze());

        let dup = FlavorSpec::parse("[ssl, !debug, ssl]").unwrap();
        assert_eq!(dup.body(), "!debug, ssl");
    }

    #[test]
    fn test_empty_flavor() {
        let spec = FlavorSpec::parse("[]").unwrap();
        assert!(spec.is_empty());
        assert_eq!(spec.body(), "");
        assert_eq!(spec.freeze(), "");
        assert_eq!(FlavorSpec::thaw("").unwrap(), spec);
    }

    #[test]
    fn test_freeze_layout() {
        let spec = FlavorSpec::parse("[~vmware, ssl, !debug, is: x86_64 x86]").unwrap();
        assert_eq!(spec.freeze(), "1#x86:x86_64|5#use:!debug:ssl:~vmware");
        assert_eq!(FlavorSpec::parse("is: x86").unwrap().freeze(), "1#x86");
    }

    #[test]
    fn test_freeze_thaw_roundtrip() {
        for text in [
            "",
            "[is: x86]",
            "[ssl]",
            "[!dom0, ~!domU, ~vmware, ~!xen, is: x86 x86_64]",
        ] {
            let spec = FlavorSpec::parse(text).unwrap();
            let thawed = FlavorSpec::thaw(&spec.freeze()).unwrap();
            assert_eq!(spec, thawed, "round trip of {text}");
            assert_eq!(FlavorSpec::parse(&spec.body()).unwrap(), spec);
        }
    }

    #[test]
    fn test_thaw_rejects_garbage() {
        assert!(FlavorSpec::thaw("x86").is_err());
        assert!(FlavorSpec::thaw("9#whatever").is_err());
        assert!(FlavorSpec::thaw("5#ssl").is_err());
        assert!(FlavorSpec::thaw("1#").is_err());
    }
}
