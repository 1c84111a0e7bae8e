//! Help command handler

/// Help text shared by every platform
pub fn help_text() -> String {
    [
        "GatherBuddy finds a time that works for your group.",
        "",
        "/connect <event> - show the live dashboard of an event in this chat",
        "Paste a voting link (…/e/<event>) in a group to connect it too.",
        "/start login - get a link to manage your events",
    ]
    .join("\n")
}
