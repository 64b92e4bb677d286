//! Topic pattern matching and the closed legacy command set.

/// The legacy commands, one variant per logical action.
///
/// The keyword set is closed: anything not in [`Command::from_keyword`] is
/// silently ignored by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PermitJoin,
    Reset,
    LastSeen,
    Elapsed,
    LogLevel,
    Devices,
    Groups,
    Rename,
    RenameLast,
    Remove,
    ForceRemove,
    Ban,
    DeviceOptions,
    AddGroup,
    RemoveGroup,
    ForceRemoveGroup,
    Whitelist,
    TouchlinkFactoryReset,
}

impl Command {
    /// Look up a matched keyword in the closed command table
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "permit_join" => Self::PermitJoin,
            "reset" => Self::Reset,
            "last_seen" => Self::LastSeen,
            "elapsed" => Self::Elapsed,
            "log_level" => Self::LogLevel,
            "devices" | "devices/get" => Self::Devices,
            "groups" => Self::Groups,
            "rename" => Self::Rename,
            "rename_last" => Self::RenameLast,
            "remove" => Self::Remove,
            "force_remove" => Self::ForceRemove,
            "ban" => Self::Ban,
            "device_options" => Self::DeviceOptions,
            "add_group" => Self::AddGroup,
            "remove_group" => Self::RemoveGroup,
            "force_remove_group" => Self::ForceRemoveGroup,
            "whitelist" => Self::Whitelist,
            "touchlink/factory_reset" => Self::TouchlinkFactoryReset,
            _ => return None,
        })
    }
}

/// Extract the command keyword from a legacy config topic.
///
/// Accepts `<base>/bridge/config/<word>`, `<word>/get` and
/// `<word>/factory_reset`, where `<word>` is `[A-Za-z0-9_]+`. Anything
/// else yields `None`.
pub fn match_topic<'a>(base_topic: &str, topic: &'a str) -> Option<&'a str> {
    let rest = topic
        .strip_prefix(base_topic)?
        .strip_prefix("/bridge/config/")?;

    let mut segments = rest.splitn(3, '/');
    let word = segments.next()?;
    if !is_word(word) {
        return None;
    }

    match (segments.next(), segments.next()) {
        (None, _) => Some(rest),
        (Some("get"), None) | (Some("factory_reset"), None) => Some(rest),
        _ => None,
    }
}

fn is_word(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "meshbridge";

    #[test]
    fn matches_bare_word() {
        assert_eq!(
            match_topic(BASE, "meshbridge/bridge/config/permit_join"),
            Some("permit_join")
        );
    }

    #[test]
    fn matches_get_and_factory_reset_suffixes() {
        assert_eq!(
            match_topic(BASE, "meshbridge/bridge/config/devices/get"),
            Some("devices/get")
        );
        assert_eq!(
            match_topic(BASE, "meshbridge/bridge/config/touchlink/factory_reset"),
            Some("touchlink/factory_reset")
        );
    }

    #[test]
    fn rejects_foreign_base_and_namespace() {
        assert!(match_topic(BASE, "other/bridge/config/devices").is_none());
        assert!(match_topic(BASE, "meshbridgeother/bridge/config/devices").is_none());
        assert!(match_topic(BASE, "meshbridge/bridge/devices").is_none());
        assert!(match_topic(BASE, "meshbridge/devices").is_none());
    }

    #[test]
    fn rejects_malformed_rest() {
        assert!(match_topic(BASE, "meshbridge/bridge/config/").is_none());
        assert!(match_topic(BASE, "meshbridge/bridge/config/devices/get/extra").is_none());
        assert!(match_topic(BASE, "meshbridge/bridge/config/devices/set").is_none());
        assert!(match_topic(BASE, "meshbridge/bridge/config/has-dash").is_none());
        assert!(match_topic(BASE, "meshbridge/bridge/config//get").is_none());
    }

    #[test]
    fn keyword_table_is_closed() {
        assert_eq!(Command::from_keyword("devices"), Some(Command::Devices));
        assert_eq!(Command::from_keyword("devices/get"), Some(Command::Devices));
        assert_eq!(
            Command::from_keyword("touchlink/factory_reset"),
            Some(Command::TouchlinkFactoryReset)
        );
        assert_eq!(Command::from_keyword("groups/get"), None);
        assert_eq!(Command::from_keyword("unknown"), None);
        assert_eq!(Command::from_keyword(""), None);
    }
}
