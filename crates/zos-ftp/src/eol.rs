//! End-of-line policy for ASCII transfers.
//!
//! z/OS inserts the line terminator server-side when sending ASCII
//! data; `SITE SBSENDEOL=…` / `SITE MBSENDEOL=…` pick which one.

/// End-of-line sequence selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Eol {
    /// `\r\n` pairs.
    Crlf,
    /// Bare `\n`.
    Lf,
    /// Bare `\r` (legacy).
    Cr,
    /// Whatever the client platform uses natively.
    #[default]
    System,
}

impl Eol {
    /// The identifier sent on the wire in the `SITE` sub-command.
    pub fn wire(&self) -> &'static str {
        match self.resolve() {
            Eol::Crlf => "CRLF",
            Eol::Lf => "LF",
            Eol::Cr => "CR",
            Eol::System => unreachable!(),
        }
    }

    /// The byte sequence the identifier stands for.
    pub fn sequence(&self) -> &'static str {
        match self.resolve() {
            Eol::Crlf => "\r\n",
            Eol::Lf => "\n",
            Eol::Cr => "\r",
            Eol::System => unreachable!(),
        }
    }

    /// Parse a wire identifier as reported by the server.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CRLF" => Some(Eol::Crlf),
            "LF" => Some(Eol::Lf),
            "CR" => Some(Eol::Cr),
            _ => None,
        }
    }

    fn resolve(self) -> Eol {
        match self {
            Eol::System => {
                if cfg!(windows) {
                    Eol::Crlf
                } else {
                    Eol::Lf
                }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_identifiers() {
        assert_eq!(Eol::Crlf.wire(), "CRLF");
        assert_eq!(Eol::Lf.wire(), "LF");
        assert_eq!(Eol::Cr.wire(), "CR");
    }

    #[test]
    fn sequences() {
        assert_eq!(Eol::Crlf.sequence(), "\r\n");
        assert_eq!(Eol::Lf.sequence(), "\n");
        assert_eq!(Eol::Cr.sequence(), "\r");
    }

    #[test]
    fn system_resolves_to_platform_default() {
        let wire = Eol::System.wire();
        assert!(wire == "LF" || wire == "CRLF");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Eol::parse(" crlf "), Some(Eol::Crlf));
        assert_eq!(Eol::parse("TAB"), None);
    }
}
