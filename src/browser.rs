//! Session de navigation et cycle de vie des chargements.
//!
//! ## Flux d'un chargement
//!
//! ```text
//! load_url / reload (PageHost)
//!         │
//!         ▼
//!   begin_load()  →  LoadInterceptor (valeur du blocage figée)
//!         │              └─ load_web_resource() pour chaque requête,
//!         │                 depuis n'importe quel thread réseau
//!         ▼
//!   finish_load(target)  →  placeholders si le blocage est actif
//! ```
//!
//! ## Bascule du blocage
//!
//! `toggle_media_blocking()` inverse le drapeau, le persiste, puis recharge
//! la page : aucun document ne mélange des ressources décidées sous deux
//! valeurs différentes.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::blocking::BlockingState;
use crate::bookmarks::{Bookmark, BookmarkManager};
use crate::config::Config;
use crate::gate::{InterceptionGate, LoadInterceptor};
use crate::host::{ContentTarget, PageHost};
use crate::placeholder::{Coverage, PlaceholderInjector, PlaceholderStyle};
use crate::preferences::Preferences;
use crate::store::{KeyValueStore, StoreError};
use crate::urlbar;

/// Titre enregistré pour une page sans `<title>`.
pub const UNTITLED_BOOKMARK: &str = "No Title";

// ─────────────────────────────────────────────────────────────────────────────
// BrowserSession
// ─────────────────────────────────────────────────────────────────────────────

/// Une session de navigation : une vue web, ses préférences, son drapeau de
/// blocage.
pub struct BrowserSession<H, S> {
    host: H,
    preferences: Preferences<S>,
    bookmarks: BookmarkManager<S>,
    blocking: BlockingState,
    gate: Arc<InterceptionGate>,
    injector: PlaceholderInjector,
    search_url: String,
    /// Nombre de chargements commencés.
    generation: u64,
}

impl<H: PageHost, S: KeyValueStore> BrowserSession<H, S> {
    /// Crée la session. Le drapeau de blocage est initialisé depuis les
    /// préférences enregistrées.
    pub fn new(host: H, store: Arc<S>, config: &Config) -> Self {
        let preferences = Preferences::with_defaults(
            Arc::clone(&store),
            &config.general.homepage,
            config.blocking.enabled_by_default,
        );
        let blocking = BlockingState::new(preferences.is_media_blocking_enabled());
        info!(media_blocking = blocking.get(), "Session started");

        Self {
            host,
            preferences,
            bookmarks: BookmarkManager::new(store),
            blocking,
            gate: Arc::new(InterceptionGate::new(config.blocking.classifier())),
            injector: PlaceholderInjector::new(PlaceholderStyle::from(&config.placeholder)),
            search_url: config.general.search_engine_url.clone(),
            generation: 0,
        }
    }

    /// Charge la page d'accueil.
    pub fn start(&mut self) -> Option<Url> {
        self.go_home()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Poignée partagée sur le drapeau de blocage.
    pub fn blocking(&self) -> BlockingState {
        self.blocking.clone()
    }

    pub fn media_blocking_enabled(&self) -> bool {
        self.blocking.get()
    }

    pub fn injector(&self) -> &PlaceholderInjector {
        &self.injector
    }

    // ── Cycle de vie d'un chargement ───────────────────────────────────

    /// Appelé par l'hôte quand un document commence à charger. Toutes les
    /// requêtes de ce document passent par l'intercepteur retourné.
    pub fn begin_load(&mut self) -> LoadInterceptor {
        self.generation += 1;
        let enabled = self.blocking.get();
        debug!(generation = self.generation, media_blocking = enabled, "Load started");
        LoadInterceptor::new(Arc::clone(&self.gate), self.generation, enabled)
    }

    /// Appelé par l'hôte quand le document a fini de charger.
    pub fn finish_load(&self, target: &mut dyn ContentTarget) -> Coverage {
        if !self.blocking.get() {
            debug!(generation = self.generation, "Media blocking off, no placeholders");
            return Coverage::Skipped;
        }
        target.apply_placeholders(&self.injector)
    }

    // ── Actions utilisateur ─────────────────────────────────────────────

    /// Inverse le blocage, le persiste et recharge la page courante.
    /// Retourne la nouvelle valeur.
    pub fn toggle_media_blocking(&mut self) -> bool {
        let enabled = self.blocking.toggle();
        info!(media_blocking = enabled, "Media blocking toggled");
        if let Err(e) = self.preferences.save_media_blocking(enabled) {
            warn!(error = %e, "Cannot persist media blocking setting");
        }
        self.host.reload();
        enabled
    }

    /// Navigue vers la saisie de la barre d'URL.
    pub fn navigate(&mut self, input: &str) -> Option<Url> {
        let url = urlbar::resolve_input(input, &self.search_url)?;
        self.host.load_url(&url);
        Some(url)
    }

    pub fn go_home(&mut self) -> Option<Url> {
        let homepage = self.preferences.load_homepage();
        self.navigate(&homepage)
    }

    /// Enregistre la page courante comme page d'accueil.
    /// Retourne l'URL enregistrée, `None` si aucune page n'est chargée.
    pub fn set_home(&self) -> Result<Option<Url>, StoreError> {
        let Some(url) = self.host.current_url() else {
            return Ok(None);
        };
        self.preferences.save_homepage(url.as_str())?;
        Ok(Some(url))
    }

    /// Ajoute la page courante aux favoris. `Ok(false)` si aucune page n'est
    /// chargée ou si elle est déjà en favori.
    pub fn add_bookmark(&self) -> Result<bool, StoreError> {
        let Some(url) = self.host.current_url() else {
            return Ok(false);
        };
        let title = self
            .host
            .title()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNTITLED_BOOKMARK.to_string());
        self.bookmarks.add(Bookmark::new(title, url.as_str()))
    }

    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks.list()
    }

    pub fn open_bookmark(&mut self, bookmark: &Bookmark) -> Option<Url> {
        let url = Url::parse(&bookmark.url).ok()?;
        self.host.load_url(&url);
        Some(url)
    }

    pub fn delete_bookmark(&self, url: &str) -> Result<bool, StoreError> {
        self.bookmarks.delete(url)
    }

    pub fn go_back(&mut self) -> bool {
        if !self.host.can_go_back() {
            return false;
        }
        self.host.go_back();
        true
    }

    pub fn go_forward(&mut self) -> bool {
        if !self.host.can_go_forward() {
            return false;
        }
        self.host.go_forward();
        true
    }

    pub fn reload(&mut self) {
        self.host.reload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ResourceRequest;
    use crate::dom::Document;
    use crate::gate::SyntheticResponse;
    use crate::placeholder::{is_processed, PlaceholderRecord};
    use crate::store::MemoryStore;

    /// Hôte factice : historique linéaire, enregistre les rechargements.
    #[derive(Default)]
    struct RecordingHost {
        history: Vec<Url>,
        position: usize,
        reloads: usize,
        title: Option<String>,
    }

    impl PageHost for RecordingHost {
        fn load_url(&mut self, url: &Url) {
            self.history.truncate(self.position + usize::from(!self.history.is_empty()));
            self.history.push(url.clone());
            self.position = self.history.len() - 1;
        }

        fn reload(&mut self) {
            self.reloads += 1;
        }

        fn can_go_back(&self) -> bool {
            self.position > 0
        }

        fn can_go_forward(&self) -> bool {
            self.position + 1 < self.history.len()
        }

        fn go_back(&mut self) {
            self.position -= 1;
        }

        fn go_forward(&mut self) {
            self.position += 1;
        }

        fn current_url(&self) -> Option<Url> {
            self.history.get(self.position).cloned()
        }

        fn title(&self) -> Option<String> {
            self.title.clone()
        }
    }

    fn session() -> BrowserSession<RecordingHost, MemoryStore> {
        BrowserSession::new(RecordingHost::default(), Arc::new(MemoryStore::new()), &Config::default())
    }

    /// Document avec `<img src="a.png">` et `<video src="b.mp4">`.
    fn media_page() -> Document {
        let mut doc = Document::new();
        let body = doc.body();
        let img = doc.create_element_with("img", &[("src", "a.png")]);
        let video = doc.create_element_with("video", &[("src", "b.mp4")]);
        doc.append_child(body, img).unwrap();
        doc.append_child(body, video).unwrap();
        doc
    }

    fn media_requests() -> [ResourceRequest; 2] {
        [
            ResourceRequest::new("https://example.com/a.png").with_accept("image/avif,image/webp,*/*"),
            ResourceRequest::new("https://example.com/b.mp4"),
        ]
    }

    #[test]
    fn test_blocking_seeded_from_preferences() {
        let store = Arc::new(MemoryStore::new());
        Preferences::new(Arc::clone(&store)).save_media_blocking(false).unwrap();
        let session = BrowserSession::new(RecordingHost::default(), store, &Config::default());
        assert!(!session.media_blocking_enabled());
    }

    #[test]
    fn test_blocking_seeded_from_config_when_unsaved() {
        let mut config = Config::default();
        config.blocking.enabled_by_default = false;
        let session = BrowserSession::new(RecordingHost::default(), Arc::new(MemoryStore::new()), &config);
        assert!(!session.media_blocking_enabled());
    }

    #[test]
    fn test_start_loads_homepage() {
        let mut session = session();
        let url = session.start().unwrap();
        assert_eq!(url.as_str(), "https://lite.duckduckgo.com/");
        assert_eq!(session.host().current_url(), Some(url));
    }

    #[test]
    fn test_toggle_flips_persists_and_reloads() {
        let store = Arc::new(MemoryStore::new());
        let mut session = BrowserSession::new(RecordingHost::default(), Arc::clone(&store), &Config::default());

        assert!(!session.toggle_media_blocking());
        assert_eq!(session.host().reloads, 1);
        assert!(!Preferences::new(Arc::clone(&store)).is_media_blocking_enabled());

        assert!(session.toggle_media_blocking());
        assert_eq!(session.host().reloads, 2);
        assert!(Preferences::new(store).is_media_blocking_enabled());
    }

    #[test]
    fn test_toggle_applies_to_next_load_only() {
        let mut session = session();
        let in_flight = session.begin_load();
        let [image, _] = media_requests();

        session.toggle_media_blocking();
        // The old document keeps its policy until it is replaced.
        assert_eq!(in_flight.load_web_resource(&image), Some(SyntheticResponse::EMPTY));

        let reloaded = session.begin_load();
        assert!(reloaded.generation() > in_flight.generation());
        assert!(!reloaded.blocking_enabled());
        assert_eq!(reloaded.load_web_resource(&image), None);
    }

    #[test]
    fn test_every_request_of_a_load_sees_one_value() {
        let mut session = session();
        let interceptor = session.begin_load();
        let blocking = session.blocking();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let interceptor = interceptor.clone();
                let blocking = blocking.clone();
                scope.spawn(move || {
                    if i % 2 == 0 {
                        blocking.toggle();
                    }
                    let request = ResourceRequest::new(format!("https://cdn.example/{i}.jpg"));
                    assert!(interceptor.load_web_resource(&request).is_some());
                });
            }
        });
    }

    #[test]
    fn test_end_to_end_block_then_allow() {
        let mut session = session();
        session.start();

        // Blocking on: both media fetches are replaced, both elements converted.
        let interceptor = session.begin_load();
        for request in media_requests() {
            assert_eq!(interceptor.load_web_resource(&request), Some(SyntheticResponse::EMPTY));
        }
        let page = ResourceRequest::new("https://example.com/").with_accept("text/html");
        assert_eq!(interceptor.load_web_resource(&page), None);

        let mut doc = media_page();
        assert_eq!(session.finish_load(&mut doc), Coverage::Watching);
        let media = doc.tree().elements_by_tags(doc.root(), &["img", "video"]);
        assert_eq!(media.len(), 2);
        for &node in &media {
            let record = PlaceholderRecord::read(doc.tree(), node).unwrap();
            assert!(record.id.starts_with("media-"));
            assert_eq!(doc.tree().style_property(node, "background-color"), Some("#f0f0f0"));
        }

        // Blocking off and reload: everything proceeds, nothing converted.
        session.toggle_media_blocking();
        doc.teardown();
        let interceptor = session.begin_load();
        for request in media_requests() {
            assert_eq!(interceptor.load_web_resource(&request), None);
        }
        let mut doc = media_page();
        assert_eq!(session.finish_load(&mut doc), Coverage::Skipped);
        let media = doc.tree().elements_by_tags(doc.root(), &["img", "video"]);
        assert!(media.iter().all(|&node| !is_processed(doc.tree(), node)));
    }

    #[test]
    fn test_finish_load_reads_live_flag() {
        let mut session = session();
        let _interceptor = session.begin_load();
        session.blocking().set(false);
        let mut doc = media_page();
        assert_eq!(session.finish_load(&mut doc), Coverage::Skipped);
    }

    #[test]
    fn test_navigate_fixes_up_input() {
        let mut session = session();
        let url = session.navigate("servo.org").unwrap();
        assert_eq!(url.as_str(), "https://servo.org/");
        let url = session.navigate("rust ownership").unwrap();
        assert!(url.as_str().starts_with("https://lite.duckduckgo.com/lite/?q="));
        assert!(session.navigate("  ").is_none());
    }

    #[test]
    fn test_set_home_saves_current_page() {
        let mut session = session();
        assert_eq!(session.set_home().unwrap(), None);

        session.navigate("https://servo.org/").unwrap();
        session.set_home().unwrap();
        session.navigate("https://example.com/").unwrap();

        let home = session.go_home().unwrap();
        assert_eq!(home.as_str(), "https://servo.org/");
    }

    #[test]
    fn test_add_bookmark_uses_title_or_default() {
        let mut session = session();
        assert!(!session.add_bookmark().unwrap());

        session.navigate("https://example.com/").unwrap();
        assert!(session.add_bookmark().unwrap());
        assert!(!session.add_bookmark().unwrap());

        session.navigate("https://servo.org/").unwrap();
        session.host_mut().title = Some("Servo".into());
        session.add_bookmark().unwrap();

        let bookmarks = session.bookmarks();
        assert_eq!(
            bookmarks,
            vec![
                Bookmark::new("Servo", "https://servo.org/"),
                Bookmark::new(UNTITLED_BOOKMARK, "https://example.com/"),
            ]
        );
    }

    #[test]
    fn test_open_and_delete_bookmark() {
        let mut session = session();
        let bookmark = Bookmark::new("Example", "https://example.com/");
        assert_eq!(session.open_bookmark(&bookmark).unwrap().as_str(), "https://example.com/");
        session.add_bookmark().unwrap();
        assert!(session.delete_bookmark("https://example.com/").unwrap());
        assert!(session.bookmarks().is_empty());

        assert!(session.open_bookmark(&Bookmark::new("Broken", "not a url")).is_none());
    }

    #[test]
    fn test_back_forward_respect_history() {
        let mut session = session();
        assert!(!session.go_back());
        session.navigate("https://a.example/").unwrap();
        session.navigate("https://b.example/").unwrap();

        assert!(session.go_back());
        assert_eq!(session.host().current_url().unwrap().as_str(), "https://a.example/");
        assert!(!session.go_back());
        assert!(session.go_forward());
        assert!(!session.go_forward());

        session.reload();
        assert_eq!(session.host().reloads, 1);
    }
}
