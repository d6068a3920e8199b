use std::fmt;

use serde::{Serialize, Serializer};
use uuid::Uuid;

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

macro_rules! serialize_as_display {
    ($($ty:ty),*) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }
        )*
    };
}

serialize_as_display!(EventId, ThreadId, SpanId, TraceId, DebugId, CodeId, Addr);

/// A UUID rendered as 32 lowercase hex characters without dashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Accepts only the canonical form.
    pub fn parse_canonical(s: &str) -> Option<Self> {
        if s.len() != 32 || !s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return None;
        }
        Uuid::try_parse(s).ok().map(Self)
    }

    /// Accepts anything the uuid crate understands: dashed, braced, urn, any case.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        Uuid::try_parse(s.trim()).ok().map(Self)
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Thread ids arrive as numbers or strings, we only ever compare them as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 16-character lowercase hex string (W3C trace context).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanId(String);

impl SpanId {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        (s.len() == 16 && is_hex(s)).then(|| Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 32-character lowercase hex string (W3C trace context).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        // SDKs occasionally send the uuid form of a trace id
        let s = s.replace('-', "");
        (s.len() == 32 && is_hex(&s)).then(|| Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Debug identifier of a native image: a UUID plus an optional age (PDB images).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebugId {
    pub uuid: Uuid,
    pub age: u32,
}

impl DebugId {
    /// Accepts `c0bcc3f1-9827-fe65-3058-404b2831d9e6`, `...-1` (age suffix), and the
    /// breakpad form of 32 hex digits followed directly by the hex age.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        let (uuid, rest) = match s.get(..36).map(Uuid::try_parse) {
            Some(Ok(uuid)) => (uuid, &s[36..]),
            _ => {
                let head = s.get(..32)?;
                if !is_hex(head) {
                    return None;
                }
                (Uuid::try_parse(head).ok()?, &s[32..])
            }
        };

        let rest = rest.strip_prefix('-').unwrap_or(rest);
        let age = if rest.is_empty() {
            0
        } else if is_hex(rest) && rest.len() <= 8 {
            u32::from_str_radix(rest, 16).ok()?
        } else {
            return None;
        };

        Some(Self { uuid, age })
    }
}

impl fmt::Display for DebugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid.hyphenated())?;
        if self.age > 0 {
            write!(f, "-{:x}", self.age)?;
        }
        Ok(())
    }
}

/// Identifier of a code file, lowercase hex without dashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeId(String);

impl CodeId {
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s.trim().chars().filter(|c| *c != '-').collect();
        is_hex(&s).then(|| Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A memory address, rendered as lowercase `0x` hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(pub u64);

impl Addr {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok().map(Self),
            None => s.parse::<u64>().ok().map(Self),
        }
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn event_ids() {
        let canonical = "fc6d8c0c43fc4630ad850ee518f1b9d0";
        assert_eq!(
            EventId::parse_canonical(canonical).unwrap().to_string(),
            canonical
        );
        assert!(EventId::parse_canonical("FC6D8C0C43FC4630AD850EE518F1B9D0").is_none());
        assert!(EventId::parse_canonical("fc6d8c0c-43fc-4630-ad85-0ee518f1b9d0").is_none());

        let lenient = EventId::parse_lenient("FC6D8C0C-43FC-4630-AD85-0EE518F1B9D0").unwrap();
        assert_eq!(lenient.to_string(), canonical);
        assert!(EventId::parse_lenient("not-an-id").is_none());

        assert_eq!(EventId::new().to_string().len(), 32);
    }

    #[test]
    fn trace_and_span_ids() {
        assert_eq!(
            TraceId::parse("4C79F60C11214EB38604F4AE0781BFB2")
                .unwrap()
                .as_str(),
            "4c79f60c11214eb38604f4ae0781bfb2"
        );
        assert!(TraceId::parse("4c79f60c").is_none());
        assert_eq!(
            SpanId::parse("FA90FDEAD5F74052").unwrap().as_str(),
            "fa90fdead5f74052"
        );
        assert!(SpanId::parse("fa90fdead5f7405z").is_none());
    }

    #[test]
    fn debug_ids() {
        let id = DebugId::parse("9c2a902b-6fdf-40ad-8308-588a41d572a0-1").unwrap();
        assert_eq!(id.age, 1);
        assert_eq!(id.to_string(), "9c2a902b-6fdf-40ad-8308-588a41d572a0-1");

        let id = DebugId::parse("E20A2268-5DC6-C165-B6AA-A12FA6765A6E").unwrap();
        assert_eq!(id.to_string(), "e20a2268-5dc6-c165-b6aa-a12fa6765a6e");

        let id = DebugId::parse("9C2A902B6FDF40AD8308588A41D572A0a").unwrap();
        assert_eq!(id.to_string(), "9c2a902b-6fdf-40ad-8308-588a41d572a0-a");

        assert!(DebugId::parse("dbghelp.pdb").is_none());
        assert!(DebugId::parse("9c2a902b-6fdf-40ad-8308-588a41d572a0-zz").is_none());
    }

    #[test]
    fn code_ids_and_addrs() {
        assert_eq!(
            CodeId::parse("57898E12145000").unwrap().as_str(),
            "57898e12145000"
        );
        assert!(CodeId::parse("").is_none());

        assert_eq!(Addr::parse("0x7F5140527000").unwrap().to_string(), "0x7f5140527000");
        assert_eq!(Addr::parse("4096").unwrap().to_string(), "0x1000");
        assert!(Addr::parse("0xnope").is_none());
    }
}
