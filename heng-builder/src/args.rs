use crate::error::{Error, Result};

use once_cell::sync::Lazy;
use regex::Regex;

static POSITIONAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^=]+$").unwrap());
static KEY_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^([^=]+)=(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument<'a> {
    Positional(&'a str),
    KeyValue { key: &'a str, value: &'a str },
}

impl<'a> Argument<'a> {
    pub fn parse(arg: &'a str) -> Result<Self> {
        if POSITIONAL.is_match(arg) {
            return Ok(Argument::Positional(arg));
        }
        match KEY_VALUE.captures(arg) {
            Some(caps) => {
                let key = caps.get(1).map_or("", |m| m.as_str());
                let value = caps.get(2).map_or("", |m| m.as_str());
                Ok(Argument::KeyValue { key, value })
            }
            None => Err(Error::invalid_argument(arg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional() {
        assert_eq!(Argument::parse("foo").unwrap(), Argument::Positional("foo"));
        assert_eq!(
            Argument::parse("-Xss64m").unwrap(),
            Argument::Positional("-Xss64m")
        );
    }

    #[test]
    fn key_value() {
        assert_eq!(
            Argument::parse("lang=3").unwrap(),
            Argument::KeyValue {
                key: "lang",
                value: "3"
            }
        );
        assert_eq!(
            Argument::parse("a=b=c").unwrap(),
            Argument::KeyValue {
                key: "a",
                value: "b=c"
            }
        );
        assert_eq!(
            Argument::parse("configuration=").unwrap(),
            Argument::KeyValue {
                key: "configuration",
                value: ""
            }
        );
    }

    #[test]
    fn malformed() {
        for arg in &["", "=bad", "="] {
            match Argument::parse(arg) {
                Err(Error::InvalidArgument { argument }) => assert_eq!(argument, *arg),
                other => panic!("unexpected: {:?}", other),
            }
        }
    }
}
