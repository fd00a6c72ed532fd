use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of the environment the build was started with.
///
/// Deleting a key here does not touch the real process environment, it is
/// recorded and replayed onto the build command by [`BuildEnv::apply`](super::BuildEnv::apply).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Ambient {
    vars: BTreeMap<String, String>,
    deleted: BTreeSet<String>,
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Ambient {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Ambient {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            deleted: BTreeSet::new(),
        }
    }
}

impl Ambient {
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// Removes `key`, returning what it held.
    pub fn delete(&mut self, key: &str) -> Option<String> {
        self.deleted.insert(key.to_string());
        self.vars.remove(key)
    }

    pub fn deleted(&self) -> impl Iterator<Item = &str> {
        self.deleted.iter().map(|s| s.as_str())
    }

    pub(crate) fn restore(&mut self, key: &str, value: String) {
        self.deleted.remove(key);
        self.vars.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn delete_is_recorded() {
        let mut ambient = [("CDPATH", ".:/home"), ("HOME", "/root")]
            .into_iter()
            .collect::<Ambient>();

        assert_eq!(ambient.delete("CDPATH").as_deref(), Some(".:/home"));
        assert_eq!(ambient.delete("GREP_OPTIONS"), None);
        assert_eq!(ambient.get("CDPATH"), None);
        assert_eq!(ambient.get("HOME"), Some("/root"));
        assert_eq!(
            ambient.deleted().collect::<Vec<_>>(),
            ["CDPATH", "GREP_OPTIONS"]
        );

        ambient.restore("CDPATH", ".".into());
        assert_eq!(ambient.get("CDPATH"), Some("."));
        assert_eq!(ambient.deleted().collect::<Vec<_>>(), ["GREP_OPTIONS"]);
    }
}
