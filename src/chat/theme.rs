use std::env;

use crate::store::{self, KeyValueStore};
use crate::types::Theme;

/// The persisted colour theme.
///
/// Reads the stored preference once and writes through on every change.
pub struct ThemePreference<S: KeyValueStore> {
    store: S,
    theme: Theme,
}

impl<S: KeyValueStore> ThemePreference<S> {
    /// Loads the stored theme, falling back to `hint` and then to dark.
    pub fn load(store: S, hint: Option<Theme>) -> Self {
        let theme = store::load_theme(&store).or(hint).unwrap_or_default();
        Self { store, theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Switches to the other theme and returns it.
    pub fn toggle(&mut self) -> Theme {
        self.set(self.theme.toggled());
        self.theme
    }

    /// Switches to `theme` and persists it.
    pub fn set(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(err) = store::save_theme(&mut self.store, theme) {
            tracing::warn!(error = %err, "failed to persist theme");
        }
    }
}

/// The theme suggested by the terminal's `COLORFGBG` variable, if any.
pub fn terminal_hint() -> Option<Theme> {
    env::var("COLORFGBG")
        .ok()
        .and_then(|value| Theme::from_colorfgbg(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, THEME_KEY};

    #[test]
    fn stored_preference_wins() {
        let mut store = MemoryStore::new();
        store::save_theme(&mut store, Theme::Light).unwrap();
        let pref = ThemePreference::load(store, Some(Theme::Dark));
        assert_eq!(pref.theme(), Theme::Light);
    }

    #[test]
    fn hint_then_default() {
        let pref = ThemePreference::load(MemoryStore::new(), Some(Theme::Light));
        assert_eq!(pref.theme(), Theme::Light);

        let pref = ThemePreference::load(MemoryStore::new(), None);
        assert_eq!(pref.theme(), Theme::Dark);
    }

    #[test]
    fn toggle_writes_through() {
        let store = MemoryStore::new();
        let mut pref = ThemePreference::load(store.clone(), None);
        assert_eq!(pref.toggle(), Theme::Light);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("light"));
        assert_eq!(pref.toggle(), Theme::Dark);
        assert_eq!(store::load_theme(&store), Some(Theme::Dark));

        pref.set(Theme::Light);
        let reloaded = ThemePreference::load(store, None);
        assert_eq!(reloaded.theme(), Theme::Light);
    }
}
