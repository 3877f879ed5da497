//! Page language and theme
//!
//! Both are presentation attributes for the stylesheet; the field itself
//! ignores them. Each is resolved from, in order: the query string,
//! LocalStorage, the browser's own preference, and finally a built-in
//! default. Unknown tags are skipped at every level.

/// A document attribute chosen from a fixed set of tags.
pub trait Preference: Copy + Default {
    /// Query string parameter
    const PARAM: &'static str;
    /// LocalStorage key
    const STORAGE_KEY: &'static str;
    /// Attribute written on `<body>`
    const ATTRIBUTE: &'static str;

    fn from_tag(tag: &str) -> Option<Self>;
    fn tag(&self) -> &'static str;
}

/// Pick the first recognised tag: requested, then stored, then host default.
pub fn resolve<P: Preference>(requested: Option<&str>, stored: Option<&str>, host: Option<&str>) -> P {
    [requested, stored, host]
        .into_iter()
        .flatten()
        .find_map(P::from_tag)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Ja,
    En,
}

impl Preference for Language {
    const PARAM: &'static str = "lang";
    const STORAGE_KEY: &'static str = "language";
    const ATTRIBUTE: &'static str = "data-language";

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ja" => Some(Language::Ja),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Preference for Theme {
    const PARAM: &'static str = "theme";
    const STORAGE_KEY: &'static str = "theme";
    const ATTRIBUTE: &'static str = "data-theme";

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl Theme {
    /// Development shortcut: `l` and `d` switch the theme.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "l" => Some(Theme::Light),
            "d" => Some(Theme::Dark),
            _ => None,
        }
    }
}

/// Resolved page preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub language: Language,
    pub theme: Theme,
}

impl Preferences {
    /// Read the query string, LocalStorage and browser preferences (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn detect() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };

        let params = window
            .location()
            .search()
            .ok()
            .and_then(|search| web_sys::UrlSearchParams::new_with_str(&search).ok());
        let storage = window.local_storage().ok().flatten();

        let requested = |key: &str| params.as_ref().and_then(|p| p.get(key));
        let stored = |key: &str| storage.as_ref().and_then(|s| s.get_item(key).ok().flatten());

        let browser_language = window.navigator().language();
        let prefers_dark = window
            .match_media("(prefers-color-scheme: dark)")
            .ok()
            .flatten()
            .is_some_and(|m| m.matches());

        let language = resolve::<Language>(
            requested(Language::PARAM).as_deref(),
            stored(Language::STORAGE_KEY).as_deref(),
            browser_language.as_deref(),
        );
        let theme = resolve::<Theme>(
            requested(Theme::PARAM).as_deref(),
            stored(Theme::STORAGE_KEY).as_deref(),
            prefers_dark.then_some(Theme::Dark.tag()),
        );

        Self { language, theme }
    }

    /// Write both attributes onto `<body>` (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn apply(&self) {
        if let Some(body) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.body())
        {
            set_attribute(&body, self.language);
            set_attribute(&body, self.theme);
            log::info!(
                "Preferences: language={}, theme={}",
                self.language.tag(),
                self.theme.tag()
            );
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn detect() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn apply(&self) {
        // No document on native
    }
}

/// Set one preference attribute on an element (WASM only)
#[cfg(target_arch = "wasm32")]
pub fn set_attribute<P: Preference>(element: &web_sys::Element, value: P) {
    if let Err(e) = element.set_attribute(P::ATTRIBUTE, value.tag()) {
        log::warn!("Failed to set {}: {:?}", P::ATTRIBUTE, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_beats_storage_and_host() {
        let lang: Language = resolve(Some("en"), Some("ja"), Some("ja"));
        assert_eq!(lang, Language::En);
        let theme: Theme = resolve(Some("dark"), Some("light"), None);
        assert_eq!(theme, Theme::Dark);
    }

    #[test]
    fn test_storage_beats_host() {
        let lang: Language = resolve(None, Some("en"), Some("ja"));
        assert_eq!(lang, Language::En);
    }

    #[test]
    fn test_unknown_tags_fall_through() {
        let lang: Language = resolve(Some("fr"), Some("de"), Some("en"));
        assert_eq!(lang, Language::En);
        let theme: Theme = resolve(Some("sepia"), None, Some("dark"));
        assert_eq!(theme, Theme::Dark);
    }

    #[test]
    fn test_regional_browser_language_is_not_matched() {
        // Only exact tags count: en-US falls back to the default
        let lang: Language = resolve(None, None, Some("en-US"));
        assert_eq!(lang, Language::Ja);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(resolve::<Language>(None, None, None), Language::Ja);
        assert_eq!(resolve::<Theme>(None, None, None), Theme::Light);
        assert_eq!(
            Preferences::default(),
            Preferences {
                language: Language::Ja,
                theme: Theme::Light
            }
        );
    }

    #[test]
    fn test_tags_round_trip() {
        for lang in [Language::Ja, Language::En] {
            assert_eq!(Language::from_tag(lang.tag()), Some(lang));
        }
        for theme in [Theme::Light, Theme::Dark] {
            assert_eq!(Theme::from_tag(theme.tag()), Some(theme));
        }
    }

    #[test]
    fn test_theme_keys() {
        assert_eq!(Theme::from_key("l"), Some(Theme::Light));
        assert_eq!(Theme::from_key("d"), Some(Theme::Dark));
        assert_eq!(Theme::from_key("x"), None);
    }
}
