//! Points de contact avec le moteur de rendu hôte.
//!
//! Le moteur (chargement, historique, exécution de scripts) est un
//! collaborateur externe. Ce module décrit ce que la session attend de lui :
//!
//! 1. **[`PageHost`]** : navigation et état de la page courante.
//!
//! 2. **[`ScriptHost`]** : exécution d'un script dans le document chargé.
//!
//! 3. **[`ContentTarget`]** : cible de l'injection des placeholders à la fin
//!    d'un chargement, soit un [`Document`] natif, soit un hôte JavaScript
//!    via [`ScriptTarget`].

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::dom::Document;
use crate::placeholder::{Coverage, PlaceholderInjector};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("script evaluation failed: {0}")]
    Script(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// PageHost : navigation
// ─────────────────────────────────────────────────────────────────────────────

/// Navigation de la vue web.
///
/// Chaque appel à [`load_url`](Self::load_url) ou [`reload`](Self::reload)
/// démarre un nouveau chargement ; l'hôte appelle ensuite
/// `BrowserSession::begin_load` puis `BrowserSession::finish_load`.
pub trait PageHost {
    fn load_url(&mut self, url: &Url);

    fn reload(&mut self);

    fn can_go_back(&self) -> bool;

    fn can_go_forward(&self) -> bool;

    fn go_back(&mut self);

    fn go_forward(&mut self);

    /// URL du document affiché, `None` avant le premier chargement.
    fn current_url(&self) -> Option<Url>;

    /// Titre du document affiché (balise `<title>`), s'il y en a un.
    fn title(&self) -> Option<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// ScriptHost : exécution JavaScript
// ─────────────────────────────────────────────────────────────────────────────

/// Hôte capable d'évaluer un script dans le document courant.
///
/// Le résultat est la valeur de retour du script, sérialisée en texte,
/// ou `None` si le script ne retourne rien.
pub trait ScriptHost {
    fn evaluate_script(&mut self, source: &str) -> Result<Option<String>, HostError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// ContentTarget : où appliquer les placeholders
// ─────────────────────────────────────────────────────────────────────────────

/// Document qui vient de finir de charger.
///
/// Un échec d'application ne remonte jamais comme erreur : la page reste
/// utilisable, seule la couverture est réduite.
pub trait ContentTarget {
    fn apply_placeholders(&mut self, injector: &PlaceholderInjector) -> Coverage;
}

impl ContentTarget for Document {
    fn apply_placeholders(&mut self, injector: &PlaceholderInjector) -> Coverage {
        injector.run(self).coverage
    }
}

/// Adaptateur pour les hôtes qui n'exposent que l'exécution de scripts :
/// le comportement est injecté sous forme de script.
pub struct ScriptTarget<'a, H: ?Sized> {
    host: &'a mut H,
}

impl<'a, H: ScriptHost + ?Sized> ScriptTarget<'a, H> {
    pub fn new(host: &'a mut H) -> Self {
        Self { host }
    }
}

impl<H: ScriptHost + ?Sized> ContentTarget for ScriptTarget<'_, H> {
    fn apply_placeholders(&mut self, injector: &PlaceholderInjector) -> Coverage {
        match self.host.evaluate_script(&injector.script()) {
            Ok(result) => {
                let coverage = coverage_from_script(result.as_deref());
                debug!(?coverage, "Placeholder script injected");
                coverage
            }
            Err(e) => {
                warn!(error = %e, "Placeholder script failed, page left as loaded");
                Coverage::Skipped
            }
        }
    }
}

/// Le script retourne `"sweep-only"` quand il n'a pas pu installer son
/// observateur. Tout autre résultat signifie que l'observateur est actif.
fn coverage_from_script(result: Option<&str>) -> Coverage {
    // Les hôtes renvoient parfois la chaîne sérialisée en JSON.
    match result.map(|r| r.trim_matches('"')) {
        Some("sweep-only") => Coverage::SweepOnly,
        _ => Coverage::Watching,
    }
}
