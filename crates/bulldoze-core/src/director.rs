//! City lifecycle and keyboard shortcuts of the plugin's COM director.
//!
//! ```text
//! PostAppInit (hooks installed) ──▶ subscribe PostCityInit, PreCityShutdown
//! PostCityInit ──▶ attach the 3D view
//!   city established ──▶ register shortcuts
//!   otherwise        ──▶ subscribe CityEstablished
//! CityEstablished ──▶ register shortcuts, unsubscribe CityEstablished
//! flora / network shortcut ──▶ open the bulldoze tool with that cursor
//! PreCityShutdown ──▶ unsubscribe shortcuts, release the view, end the session
//! ```
//!
//! Shortcuts come from a private KeyConfig resource loaded into the view's
//! key accelerator, so the city's own KeyConfig stays untouched.

use tracing::{debug, info, warn};

use crate::colors::ResourceKey;
use crate::host::BulldozeCursor;
use crate::host::messages;

/// KeyConfig holding the bulldoze shortcuts
pub const SHORTCUT_KEY_CONFIG: ResourceKey =
    ResourceKey::new(0xA2E3_D533, 0x6930_B865, 0x3A80_C2A5);

/// Messages the director subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorMessage {
    PostCityInit,
    PreCityShutdown,
    CityEstablished,
    /// Open the bulldoze tool in the mode of the cursor
    Shortcut(BulldozeCursor),
}

impl DirectorMessage {
    pub fn from_type(message_type: u32) -> Option<Self> {
        match message_type {
            messages::POST_CITY_INIT => Some(Self::PostCityInit),
            messages::PRE_CITY_SHUTDOWN => Some(Self::PreCityShutdown),
            messages::CITY_ESTABLISHED => Some(Self::CityEstablished),
            _ => shortcut_cursor(message_type).map(Self::Shortcut),
        }
    }
}

/// Cursor a shortcut message opens the bulldoze tool with
pub fn shortcut_cursor(message_type: u32) -> Option<BulldozeCursor> {
    match message_type {
        messages::FLORA_SHORTCUT => Some(BulldozeCursor::Flora),
        messages::NETWORK_SHORTCUT => Some(BulldozeCursor::Network),
        _ => None,
    }
}

/// Host services the director drives.
pub trait DirectorHost {
    /// Subscribe to `message_type`; `false` when there is no message server
    fn add_notification(&mut self, message_type: u32) -> bool;

    fn remove_notification(&mut self, message_type: u32);

    /// Find and hold the city's 3D view window
    fn attach_view(&mut self) -> bool;

    fn release_view(&mut self);

    /// `None` when there is no city
    fn is_city_established(&self) -> Option<bool>;

    /// Load `key` into the view's key accelerator
    fn register_key_config(&mut self, key: &ResourceKey) -> bool;

    /// Whether the view's current input control is the bulldoze tool
    fn is_bulldoze_tool_active(&self) -> bool;

    /// Make a new bulldoze control showing `cursor` the view's only control
    fn activate_bulldoze_tool(&mut self, cursor: BulldozeCursor) -> bool;

    /// Drop per-city tool state
    fn end_session(&mut self);
}

/// Director state for one game session.
#[derive(Debug, Default)]
pub struct Director {
    view_attached: bool,
    shortcuts_registered: bool,
}

impl Director {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_view(&self) -> bool {
        self.view_attached
    }

    pub fn shortcuts_registered(&self) -> bool {
        self.shortcuts_registered
    }

    /// After the hooks were installed (or not).
    pub fn post_app_init<H: DirectorHost + ?Sized>(&mut self, host: &mut H, hooks_installed: bool) {
        if !hooks_installed {
            warn!("Bulldoze hooks not installed, shortcuts disabled");
            return;
        }
        if host.add_notification(messages::POST_CITY_INIT) {
            host.add_notification(messages::PRE_CITY_SHUTDOWN);
        } else {
            warn!("No message server, city notifications unavailable");
        }
    }

    /// Handle a subscribed message; unknown types are ignored.
    pub fn handle_message<H: DirectorHost + ?Sized>(&mut self, host: &mut H, message_type: u32) {
        match DirectorMessage::from_type(message_type) {
            Some(DirectorMessage::PostCityInit) => self.post_city_init(host),
            Some(DirectorMessage::CityEstablished) => {
                self.register_shortcuts(host);
                host.remove_notification(messages::CITY_ESTABLISHED);
            }
            Some(DirectorMessage::PreCityShutdown) => self.pre_city_shutdown(host),
            Some(DirectorMessage::Shortcut(cursor)) => self.activate_tool(host, cursor),
            None => debug!("Ignoring message {:#010x}", message_type),
        }
    }

    fn post_city_init<H: DirectorHost + ?Sized>(&mut self, host: &mut H) {
        if !host.attach_view() {
            warn!("City view not found, shortcuts disabled");
            return;
        }
        self.view_attached = true;

        match host.is_city_established() {
            Some(true) => self.register_shortcuts(host),
            Some(false) => {
                host.add_notification(messages::CITY_ESTABLISHED);
            }
            None => {}
        }
    }

    fn register_shortcuts<H: DirectorHost + ?Sized>(&mut self, host: &mut H) {
        if !self.view_attached || self.shortcuts_registered {
            return;
        }
        if !host.register_key_config(&SHORTCUT_KEY_CONFIG) {
            warn!("Bulldoze shortcut KeyConfig not loaded");
            return;
        }
        host.add_notification(messages::FLORA_SHORTCUT);
        host.add_notification(messages::NETWORK_SHORTCUT);
        self.shortcuts_registered = true;
        info!("Registered the bulldoze shortcuts");
    }

    fn activate_tool<H: DirectorHost + ?Sized>(&mut self, host: &mut H, cursor: BulldozeCursor) {
        if !self.view_attached || host.is_bulldoze_tool_active() {
            return;
        }
        if !host.activate_bulldoze_tool(cursor) {
            warn!("Failed to open the bulldoze tool ({})", cursor);
        }
    }

    fn pre_city_shutdown<H: DirectorHost + ?Sized>(&mut self, host: &mut H) {
        host.remove_notification(messages::FLORA_SHORTCUT);
        host.remove_notification(messages::NETWORK_SHORTCUT);
        self.shortcuts_registered = false;

        if std::mem::take(&mut self.view_attached) {
            host.release_view();
        }
        host.end_session();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    struct FakeHost {
        message_server: bool,
        view: bool,
        established: Option<bool>,
        key_config: bool,
        tool_active: bool,
        subscribed: BTreeSet<u32>,
        view_held: bool,
        activated: Vec<BulldozeCursor>,
        sessions_ended: usize,
    }

    impl Default for FakeHost {
        fn default() -> Self {
            Self {
                message_server: true,
                view: true,
                established: Some(true),
                key_config: true,
                tool_active: false,
                subscribed: BTreeSet::new(),
                view_held: false,
                activated: Vec::new(),
                sessions_ended: 0,
            }
        }
    }

    impl DirectorHost for FakeHost {
        fn add_notification(&mut self, message_type: u32) -> bool {
            if self.message_server {
                self.subscribed.insert(message_type);
            }
            self.message_server
        }

        fn remove_notification(&mut self, message_type: u32) {
            self.subscribed.remove(&message_type);
        }

        fn attach_view(&mut self) -> bool {
            self.view_held = self.view;
            self.view
        }

        fn release_view(&mut self) {
            self.view_held = false;
        }

        fn is_city_established(&self) -> Option<bool> {
            self.established
        }

        fn register_key_config(&mut self, key: &ResourceKey) -> bool {
            assert_eq!(*key, SHORTCUT_KEY_CONFIG);
            self.key_config
        }

        fn is_bulldoze_tool_active(&self) -> bool {
            self.tool_active
        }

        fn activate_bulldoze_tool(&mut self, cursor: BulldozeCursor) -> bool {
            self.activated.push(cursor);
            true
        }

        fn end_session(&mut self) {
            self.sessions_ended += 1;
        }
    }

    fn subscribed(host: &FakeHost) -> Vec<u32> {
        host.subscribed.iter().copied().collect()
    }

    fn started(host: &mut FakeHost) -> Director {
        let mut director = Director::new();
        director.post_app_init(host, true);
        director.handle_message(host, messages::POST_CITY_INIT);
        director
    }

    #[test]
    fn test_message_routing() {
        assert_eq!(
            DirectorMessage::from_type(messages::FLORA_SHORTCUT),
            Some(DirectorMessage::Shortcut(BulldozeCursor::Flora))
        );
        assert_eq!(
            DirectorMessage::from_type(messages::NETWORK_SHORTCUT),
            Some(DirectorMessage::Shortcut(BulldozeCursor::Network))
        );
        assert_eq!(
            DirectorMessage::from_type(messages::CITY_ESTABLISHED),
            Some(DirectorMessage::CityEstablished)
        );
        assert_eq!(DirectorMessage::from_type(0xDEAD_BEEF), None);
        assert_eq!(shortcut_cursor(messages::POST_CITY_INIT), None);
    }

    #[test]
    fn test_post_app_init_subscribes_only_when_installed() {
        let mut host = FakeHost::default();
        Director::new().post_app_init(&mut host, false);
        assert!(host.subscribed.is_empty());

        Director::new().post_app_init(&mut host, true);
        let mut expected = vec![messages::POST_CITY_INIT, messages::PRE_CITY_SHUTDOWN];
        expected.sort();
        assert_eq!(subscribed(&host), expected);
    }

    #[test]
    fn test_established_city_registers_shortcuts() {
        let mut host = FakeHost::default();
        let director = started(&mut host);

        assert!(director.has_view());
        assert!(director.shortcuts_registered());
        assert!(host.subscribed.contains(&messages::FLORA_SHORTCUT));
        assert!(host.subscribed.contains(&messages::NETWORK_SHORTCUT));
        assert!(!host.subscribed.contains(&messages::CITY_ESTABLISHED));
    }

    #[test]
    fn test_new_city_waits_for_establishment() {
        let mut host = FakeHost {
            established: Some(false),
            ..Default::default()
        };
        let mut director = started(&mut host);

        assert!(!director.shortcuts_registered());
        assert!(host.subscribed.contains(&messages::CITY_ESTABLISHED));

        director.handle_message(&mut host, messages::CITY_ESTABLISHED);
        assert!(director.shortcuts_registered());
        assert!(!host.subscribed.contains(&messages::CITY_ESTABLISHED));
        assert!(host.subscribed.contains(&messages::FLORA_SHORTCUT));
    }

    #[test]
    fn test_missing_key_config_skips_shortcuts() {
        let mut host = FakeHost {
            key_config: false,
            ..Default::default()
        };
        let director = started(&mut host);

        assert!(!director.shortcuts_registered());
        assert!(!host.subscribed.contains(&messages::FLORA_SHORTCUT));
    }

    #[test]
    fn test_shortcut_opens_tool_with_cursor() {
        let mut host = FakeHost::default();
        let mut director = started(&mut host);

        director.handle_message(&mut host, messages::NETWORK_SHORTCUT);
        director.handle_message(&mut host, messages::FLORA_SHORTCUT);
        assert_eq!(host.activated, [BulldozeCursor::Network, BulldozeCursor::Flora]);
    }

    #[test]
    fn test_shortcut_ignored_when_tool_open_or_no_view() {
        let mut host = FakeHost {
            tool_active: true,
            ..Default::default()
        };
        let mut director = started(&mut host);
        director.handle_message(&mut host, messages::FLORA_SHORTCUT);
        assert!(host.activated.is_empty());

        let mut host = FakeHost {
            view: false,
            ..Default::default()
        };
        let mut director = started(&mut host);
        assert!(!director.has_view());
        director.handle_message(&mut host, messages::FLORA_SHORTCUT);
        assert!(host.activated.is_empty());
    }

    #[test]
    fn test_pre_city_shutdown_releases_everything() {
        let mut host = FakeHost::default();
        let mut director = started(&mut host);
        assert!(host.view_held);

        director.handle_message(&mut host, messages::PRE_CITY_SHUTDOWN);
        assert!(!director.has_view());
        assert!(!director.shortcuts_registered());
        assert!(!host.view_held);
        assert_eq!(host.sessions_ended, 1);
        assert!(!host.subscribed.contains(&messages::FLORA_SHORTCUT));
        assert!(!host.subscribed.contains(&messages::NETWORK_SHORTCUT));
        // Still listening for the next city
        assert!(host.subscribed.contains(&messages::POST_CITY_INIT));

        // The next city registers again
        director.handle_message(&mut host, messages::POST_CITY_INIT);
        assert!(director.shortcuts_registered());
    }
}
