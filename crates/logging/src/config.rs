//! Verbosity configuration: per-flag levels and `-v`-style presets.

use std::collections::HashMap;

use crate::flags::{DebugFlag, InfoFlag};

fn parse_token<F>(token: &str, from_name: F) -> Result<(String, u8), String>
where
    F: Fn(&str) -> Option<()>,
{
    if token.is_empty() {
        return Err("empty flag token".to_string());
    }

    let split_at = token
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit())
        .map(|(i, _)| i);

    let (name, level) = match split_at {
        None => (token, 1u8),
        Some(i) => {
            if i == 0 {
                return Err(format!("invalid flag token: {token}"));
            }
            let (name, digits) = token.split_at(i);
            let level: u8 = digits
                .parse()
                .map_err(|_| format!("invalid level in flag token: {token}"))?;
            (name, level)
        }
    };

    if from_name(name).is_none() {
        return Err(format!("unknown flag: {name}"));
    }

    Ok((name.to_string(), level))
}

/// Per-[`DebugFlag`] verbosity levels.
///
/// A level of `0` means the flag is silent; higher levels are more verbose.
/// There is no fixed ceiling, but callers generally only distinguish `0`,
/// `1`, and `2`.
#[derive(Debug, Clone, Default)]
pub struct DebugConfig {
    levels: HashMap<&'static str, u8>,
}

impl DebugConfig {
    /// Returns the configured level for `flag`, or `0` if unset.
    #[must_use]
    pub fn level(&self, flag: DebugFlag) -> u8 {
        self.levels.get(Self::key(flag)).copied().unwrap_or(0)
    }

    /// Sets the level for `flag` directly.
    pub fn set(&mut self, flag: DebugFlag, level: u8) {
        self.levels.insert(Self::key(flag), level);
    }

    /// Sets every known flag to `level`, matching the donor's "set all
    /// debug flags" behavior for a bare `--debug=all`-equivalent request.
    pub fn set_all(&mut self, level: u8) {
        for flag in DebugFlag::all() {
            self.set(flag, level);
        }
    }

    /// Applies a single `name` or `nameN` token, such as `"docket"` or
    /// `"docket2"`.
    ///
    /// # Errors
    ///
    /// Returns an error describing the problem when the token is empty,
    /// names an unknown flag, or has a malformed level suffix.
    pub fn apply_flag(&mut self, token: &str) -> Result<(), String> {
        let (name, level) = parse_token(token, |n| DebugFlag::from_name(n).map(|_| ()))?;
        let flag = DebugFlag::from_name(&name).expect("validated above");
        self.set(flag, level);
        Ok(())
    }

    fn key(flag: DebugFlag) -> &'static str {
        match flag {
            DebugFlag::Docket => "docket",
            DebugFlag::Node => "node",
            DebugFlag::Tree => "tree",
            DebugFlag::Overlay => "overlay",
            DebugFlag::Writer => "writer",
            DebugFlag::Status => "status",
            DebugFlag::Ignore => "ignore",
            DebugFlag::Mmap => "mmap",
        }
    }
}

/// Per-[`InfoFlag`] verbosity levels.
#[derive(Debug, Clone, Default)]
pub struct InfoConfig {
    levels: HashMap<&'static str, u8>,
}

impl InfoConfig {
    /// Returns the configured level for `flag`, or `0` if unset.
    #[must_use]
    pub fn level(&self, flag: InfoFlag) -> u8 {
        self.levels.get(Self::key(flag)).copied().unwrap_or(0)
    }

    /// Sets the level for `flag` directly.
    pub fn set(&mut self, flag: InfoFlag, level: u8) {
        self.levels.insert(Self::key(flag), level);
    }

    /// Sets every known flag to `level`.
    pub fn set_all(&mut self, level: u8) {
        for flag in InfoFlag::all() {
            self.set(flag, level);
        }
    }

    /// Applies a single `name` or `nameN` token, such as `"commit"` or
    /// `"commit2"`.
    ///
    /// # Errors
    ///
    /// Returns an error describing the problem when the token is empty,
    /// names an unknown flag, or has a malformed level suffix.
    pub fn apply_flag(&mut self, token: &str) -> Result<(), String> {
        let (name, level) = parse_token(token, |n| InfoFlag::from_name(n).map(|_| ()))?;
        let flag = InfoFlag::from_name(&name).expect("validated above");
        self.set(flag, level);
        Ok(())
    }

    fn key(flag: InfoFlag) -> &'static str {
        match flag {
            InfoFlag::Commit => "commit",
            InfoFlag::Rewrite => "rewrite",
            InfoFlag::Mtime => "mtime",
            InfoFlag::Corrupt => "corrupt",
            InfoFlag::Readdir => "readdir",
            InfoFlag::Stats => "stats",
            InfoFlag::Skip => "skip",
            InfoFlag::Legacy => "legacy",
        }
    }
}

/// Combined debug/info verbosity configuration.
#[derive(Debug, Clone, Default)]
pub struct VerbosityConfig {
    /// Debug-category levels.
    pub debug: DebugConfig,
    /// Info-category levels.
    pub info: InfoConfig,
}

impl VerbosityConfig {
    /// Builds a preset configuration for a bare `-v` repeat count.
    ///
    /// `0` leaves everything silent. `1` turns on the user-facing info
    /// categories most people want (commits, rewrites, corruption
    /// recovery). `2` and above additionally turns on every debug category
    /// at a matching level, for deep troubleshooting.
    #[must_use]
    pub fn from_verbose_level(level: u8) -> Self {
        let mut config = Self::default();
        if level == 0 {
            return config;
        }

        config.info.set(InfoFlag::Commit, 1);
        config.info.set(InfoFlag::Rewrite, 1);
        config.info.set(InfoFlag::Corrupt, 1);
        config.info.set(InfoFlag::Legacy, 1);

        if level >= 2 {
            config.info.set_all(level - 1);
            config.debug.set_all(level - 1);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_flag_defaults_to_level_one() {
        let mut config = DebugConfig::default();
        config.apply_flag("docket").unwrap();
        assert_eq!(config.level(DebugFlag::Docket), 1);
    }

    #[test]
    fn apply_flag_parses_explicit_level() {
        let mut config = DebugConfig::default();
        config.apply_flag("tree2").unwrap();
        assert_eq!(config.level(DebugFlag::Tree), 2);
    }

    #[test]
    fn apply_flag_rejects_unknown_name() {
        let mut config = DebugConfig::default();
        assert!(config.apply_flag("bogus").is_err());
    }

    #[test]
    fn apply_flag_rejects_empty_token() {
        let mut config = DebugConfig::default();
        assert!(config.apply_flag("").is_err());
    }

    #[test]
    fn apply_flag_rejects_uppercase_name() {
        let mut config = DebugConfig::default();
        assert!(config.apply_flag("Docket").is_err());
    }

    #[test]
    fn apply_flag_rejects_name_starting_with_digit() {
        let mut config = DebugConfig::default();
        assert!(config.apply_flag("2docket").is_err());
    }

    #[test]
    fn set_all_covers_every_debug_flag() {
        let mut config = DebugConfig::default();
        config.set_all(3);
        for flag in DebugFlag::all() {
            assert_eq!(config.level(flag), 3);
        }
    }

    #[test]
    fn from_verbose_level_zero_is_silent() {
        let config = VerbosityConfig::from_verbose_level(0);
        assert_eq!(config.info.level(InfoFlag::Commit), 0);
        assert_eq!(config.debug.level(DebugFlag::Docket), 0);
    }

    #[test]
    fn from_verbose_level_one_enables_info_only() {
        let config = VerbosityConfig::from_verbose_level(1);
        assert_eq!(config.info.level(InfoFlag::Commit), 1);
        assert_eq!(config.debug.level(DebugFlag::Docket), 0);
    }

    #[test]
    fn from_verbose_level_two_enables_debug_too() {
        let config = VerbosityConfig::from_verbose_level(2);
        assert_eq!(config.debug.level(DebugFlag::Docket), 1);
        assert_eq!(config.info.level(InfoFlag::Readdir), 1);
    }
}
