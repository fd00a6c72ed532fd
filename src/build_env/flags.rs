use std::ops::Range;

use regex::Regex;

use crate::BuildEnv;

/// The C, C++ and Objective-C flag variables, always edited together.
pub const CFLAGS_FAMILY: [&str; 4] = ["CFLAGS", "CXXFLAGS", "OBJCFLAGS", "OBJCXXFLAGS"];

/// What to look for when removing or replacing part of a variable.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Pattern::Literal(value.to_string())
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        Pattern::Literal(value)
    }
}

impl From<Regex> for Pattern {
    fn from(value: Regex) -> Self {
        Pattern::Regex(value)
    }
}

impl From<&Regex> for Pattern {
    fn from(value: &Regex) -> Self {
        Pattern::Regex(value.clone())
    }
}

impl Pattern {
    /// Byte range of the first match.
    ///
    /// Literals prefer an occurrence that stands as its own word so that
    /// removing `-O2` never eats into `-O2x`.
    pub fn find(&self, haystack: &str) -> Option<Range<usize>> {
        self.find_with(haystack, " ")
    }

    /// Like [`Pattern::find`], with words delimited by `separator`.
    pub fn find_with(&self, haystack: &str, separator: &str) -> Option<Range<usize>> {
        match self {
            Pattern::Literal(needle) if needle.is_empty() => None,
            Pattern::Literal(needle) => {
                let bounded = haystack.match_indices(needle.as_str()).find(|(i, _)| {
                    let end = i + needle.len();
                    if is_blank(separator) {
                        let before = haystack[..*i]
                            .chars()
                            .next_back()
                            .map_or(true, char::is_whitespace);
                        let after = haystack[end..]
                            .chars()
                            .next()
                            .map_or(true, char::is_whitespace);
                        before && after
                    } else {
                        let (head, tail) = (&haystack[..*i], &haystack[end..]);
                        (head.is_empty() || head.ends_with(separator))
                            && (tail.is_empty() || tail.starts_with(separator))
                    }
                });
                bounded
                    .or_else(|| haystack.match_indices(needle.as_str()).next())
                    .map(|(i, _)| i..i + needle.len())
            }
            Pattern::Regex(re) => re.find(haystack).map(|m| m.range()),
        }
    }

    /// Replaces the first match. Regex replacements may refer to groups
    /// with `$1` or `${1}`.
    pub fn replace_first(&self, haystack: &str, replacement: &str) -> Option<String> {
        match self {
            Pattern::Regex(re) => {
                re.find(haystack)?;
                Some(re.replacen(haystack, 1, replacement).into_owned())
            }
            Pattern::Literal(_) => {
                let range = self.find(haystack)?;
                let mut s = String::with_capacity(haystack.len() + replacement.len());
                s.push_str(&haystack[..range.start]);
                s.push_str(replacement);
                s.push_str(&haystack[range.end..]);
                Some(s)
            }
        }
    }
}

fn is_blank(separator: &str) -> bool {
    separator.trim().is_empty()
}

/// Drops `range` from `value`, closing the gap with a single `separator`.
fn cut(value: &str, range: Range<usize>, separator: &str) -> String {
    let (head, tail) = if is_blank(separator) {
        (
            value[..range.start].trim_end(),
            value[range.end..].trim_start(),
        )
    } else {
        (
            value[..range.start].trim_end_matches(separator),
            value[range.end..].trim_start_matches(separator),
        )
    };
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{}{}{}", head, separator, tail),
    }
}

impl BuildEnv {
    pub fn append<V: AsRef<str>>(&mut self, key: &str, value: V) {
        self.append_with(key, value, " ")
    }

    pub fn append_with<V: AsRef<str>>(&mut self, key: &str, value: V, separator: &str) {
        let value = value.as_ref();
        if value.is_empty() {
            return;
        }
        let new = match self.get(key) {
            Some(old) if !old.is_empty() => format!("{}{}{}", old, separator, value),
            _ => value.to_string(),
        };
        self.set(key, new);
    }

    pub fn prepend<V: AsRef<str>>(&mut self, key: &str, value: V) {
        self.prepend_with(key, value, " ")
    }

    pub fn prepend_with<V: AsRef<str>>(&mut self, key: &str, value: V, separator: &str) {
        let value = value.as_ref();
        if value.is_empty() {
            return;
        }
        let new = match self.get(key) {
            Some(old) if !old.is_empty() => format!("{}{}{}", value, separator, old),
            _ => value.to_string(),
        };
        self.set(key, new);
    }

    /// Strips the first match of `pattern` from `key`, unsetting the key if
    /// nothing is left.
    pub fn remove<P: Into<Pattern>>(&mut self, key: &str, pattern: P) {
        self.remove_pattern(key, &pattern.into());
    }

    /// Like [`BuildEnv::remove`] for lists joined with `separator`, such as
    /// `PATH` with `:`.
    pub fn remove_with<P: Into<Pattern>>(&mut self, key: &str, pattern: P, separator: &str) {
        self.remove_pattern_with(key, &pattern.into(), separator);
    }

    pub(crate) fn remove_pattern(&mut self, key: &str, pattern: &Pattern) -> bool {
        self.remove_pattern_with(key, pattern, " ")
    }

    fn remove_pattern_with(&mut self, key: &str, pattern: &Pattern, separator: &str) -> bool {
        let Some(value) = self.get(key) else {
            return false;
        };
        let Some(range) = pattern.find_with(value, separator) else {
            return false;
        };
        let new = cut(value, range, separator);
        self.set(key, new);
        true
    }

    /// Strips every match of `pattern` from `key`.
    pub(crate) fn remove_all_pattern(&mut self, key: &str, pattern: &Pattern) {
        while self.remove_pattern(key, pattern) {}
    }

    pub fn append_to_cflags<V: AsRef<str>>(&mut self, flags: V) {
        for key in CFLAGS_FAMILY {
            self.append(key, flags.as_ref());
        }
    }

    pub fn remove_from_cflags<P: Into<Pattern>>(&mut self, pattern: P) {
        let pattern = pattern.into();
        for key in CFLAGS_FAMILY {
            self.remove_pattern(key, &pattern);
        }
    }

    /// Substitutes the first match in each of the C flag variables that has one.
    pub fn replace_in_cflags<P: Into<Pattern>>(&mut self, pattern: P, replacement: &str) {
        let pattern = pattern.into();
        for key in CFLAGS_FAMILY {
            let new = self
                .get(key)
                .and_then(|value| pattern.replace_first(value, replacement));
            if let Some(new) = new {
                self.set(key, new);
            }
        }
    }

    /// Overwrites all of the C flag variables.
    pub fn set_cflags<V: AsRef<str>>(&mut self, flags: V) {
        for key in CFLAGS_FAMILY {
            self.set(key, flags.as_ref());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::build_env::test::empty_env;

    #[test]
    fn append_and_remove() {
        let mut env = empty_env();
        env.append("CFLAGS", "-O2");
        assert_eq!(env.get("CFLAGS"), Some("-O2"));
        env.append("CFLAGS", "-g");
        assert_eq!(env.get("CFLAGS"), Some("-O2 -g"));
        env.remove("CFLAGS", "-O2");
        assert_eq!(env.get("CFLAGS"), Some("-g"));
        env.remove("CFLAGS", "-g");
        assert_eq!(env.get("CFLAGS"), None);
        assert!(!env.vars().contains_key("CFLAGS"));
    }

    #[test]
    fn append_round_trips() {
        let mut env = empty_env();
        for (prior, value) in [("-O2x -pipe", "-O2"), ("-w", "-arch i386 -arch x86_64")] {
            env.set("LDFLAGS", prior);
            env.append("LDFLAGS", value);
            env.remove("LDFLAGS", value);
            assert_eq!(env.get("LDFLAGS"), Some(prior));

            env.prepend("LDFLAGS", value);
            env.remove("LDFLAGS", value);
            assert_eq!(env.get("LDFLAGS"), Some(prior));
        }
    }

    #[test]
    fn separators() {
        let mut env = empty_env();
        env.append_with("CMAKE_PREFIX_PATH", "/usr/X11", ":");
        env.append_with("CMAKE_PREFIX_PATH", "/opt/x", ":");
        assert_eq!(env.get("CMAKE_PREFIX_PATH"), Some("/usr/X11:/opt/x"));
        env.prepend_with("CMAKE_PREFIX_PATH", "/first", ":");
        assert_eq!(env.get("CMAKE_PREFIX_PATH"), Some("/first:/usr/X11:/opt/x"));
    }

    #[test]
    fn remove_from_path_list() {
        let mut env = empty_env();
        env.set("PATH", "/usr/X11/bin:/usr/bin");
        env.remove_with("PATH", "/usr/X11/bin", ":");
        assert_eq!(env.get("PATH"), Some("/usr/bin"));

        env.set("PATH", "/usr/bin:/usr/X11/bin:/bin");
        env.remove_with("PATH", "/usr/X11/bin", ":");
        assert_eq!(env.get("PATH"), Some("/usr/bin:/bin"));

        // prefers the whole entry over a longer one containing it
        env.set("PATH", "/opt/bin/x:/opt/bin");
        env.remove_with("PATH", "/opt/bin", ":");
        assert_eq!(env.get("PATH"), Some("/opt/bin/x"));

        env.prepend_with("PATH", "/usr/X11/bin", ":");
        env.remove_with("PATH", "/usr/X11/bin", ":");
        assert_eq!(env.get("PATH"), Some("/opt/bin/x"));
        env.remove_with("PATH", "/opt/bin/x", ":");
        assert_eq!(env.get("PATH"), None);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut env = empty_env();
        env.remove("CFLAGS", "-O2");
        assert_eq!(env.get("CFLAGS"), None);
        env.set("CFLAGS", "-pipe");
        env.remove("CFLAGS", "-O2");
        assert_eq!(env.get("CFLAGS"), Some("-pipe"));
    }

    #[test]
    fn remove_regex() {
        let mut env = empty_env();
        env.set("MAKEFLAGS", "-k -j12 -s");
        env.remove("MAKEFLAGS", Regex::new(r"-j\d+").unwrap());
        assert_eq!(env.get("MAKEFLAGS"), Some("-k -s"));
    }

    #[test]
    fn cflags_stay_in_sync() {
        let mut env = empty_env();
        env.set("CFLAGS", "-Os");
        env.append_to_cflags("-fPIC");
        assert_eq!(env.get("CFLAGS"), Some("-Os -fPIC"));
        for key in &CFLAGS_FAMILY[1..] {
            assert_eq!(env.get(key), Some("-fPIC"));
        }

        env.remove_from_cflags("-fPIC");
        assert_eq!(env.get("CFLAGS"), Some("-Os"));
        for key in &CFLAGS_FAMILY[1..] {
            assert_eq!(env.get(key), None);
            assert!(!env.vars().contains_key(*key));
        }
    }

    #[test]
    fn replace() {
        let mut env = empty_env();
        env.set_cflags("-O4 -pipe");
        env.set("OBJCXXFLAGS", "-pipe");
        env.replace_in_cflags("-O4", "-O3");
        assert_eq!(env.get("CFLAGS"), Some("-O3 -pipe"));
        assert_eq!(env.get("OBJCXXFLAGS"), Some("-pipe"));

        env.set_cflags("-Xarch_i386 -march=core2 -w");
        env.replace_in_cflags(Regex::new(r"-Xarch_i386 (-march=\S*)").unwrap(), "$1");
        for key in CFLAGS_FAMILY {
            assert_eq!(env.get(key), Some("-march=core2 -w"));
        }
    }

    #[test]
    fn literal_prefers_whole_words() {
        let p = Pattern::from("-w");
        assert_eq!(p.find("-Wall -wfoo -w"), Some(12..14));
        assert_eq!(p.find("-wfoo"), Some(0..2));
        assert_eq!(Pattern::from("").find("abc"), None);
    }
}
