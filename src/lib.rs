//! # LightBrowser : navigateur léger sans médias
//!
//! Cœur d'un navigateur qui économise la bande passante : les requêtes
//! d'images et de vidéos sont remplacées par une réponse vide, et les
//! éléments `<img>`/`<video>` du document deviennent des placeholders
//! neutres qui gardent la taille de l'original.
//!
//! ## Architecture des modules
//!
//! - [`classifier`] : Heuristique "cette requête est-elle un média ?"
//!   (en-tête `Accept`, puis extension du chemin).
//!
//! - [`gate`] : Middleware d'interception réseau. Retourne une réponse
//!   synthétique vide pour les requêtes bloquées ; un [`gate::LoadInterceptor`]
//!   fige la valeur du blocage pour tout un chargement.
//!
//! - [`blocking`] : Drapeau de blocage partagé entre l'interface et les
//!   threads réseau.
//!
//! - [`dom`] : Modèle de document minimal avec abonnements aux insertions.
//!
//! - [`placeholder`] : Balayage initial, observateur, conversion des éléments.
//!
//! - [`resources`] : Le même comportement sous forme de script injecté.
//!
//! - [`host`] : Contrats attendus du moteur de rendu hôte.
//!
//! - [`store`], [`preferences`], [`bookmarks`] : Persistance clé-valeur,
//!   page d'accueil, réglage du blocage, favoris.
//!
//! - [`browser`] : Session de navigation, bascule du blocage avec rechargement.
//!
//! - [`urlbar`] : Résolution de la saisie en URL.
//!
//! - [`config`] : Configuration TOML.

pub mod blocking;
pub mod bookmarks;
pub mod browser;
pub mod classifier;
pub mod config;
pub mod dom;
pub mod gate;
pub mod host;
pub mod placeholder;
pub mod preferences;
pub mod resources;
pub mod store;
pub mod urlbar;
