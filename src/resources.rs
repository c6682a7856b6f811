//! Script de placeholders injecté dans le document.
//!
//! Le comportement « balayage + observateur + conversion » est livré à
//! l'hôte sous forme de script (`resources/placeholder.js`). Le modèle est
//! embarqué dans le binaire ; un fichier `placeholder.js` trouvé dans un
//! dossier `resources/` le remplace, ce qui permet d'ajuster le script sans
//! recompiler.
//!
//! Ordre de recherche du dossier `resources/` :
//! 1. Variable d'environnement `LIGHTBROWSER_RESOURCES_PATH`
//! 2. À côté de l'exécutable (`<exe_dir>/resources/`)
//! 3. Dans le répertoire courant (`./resources/`)
//!
//! Les valeurs de style proviennent de la configuration utilisateur : elles
//! sont insérées sous forme de littéraux JSON, jamais telles quelles.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::{env, fs};

use tracing::{debug, warn};

use crate::placeholder::PlaceholderStyle;

/// Modèle embarqué du script.
pub const PLACEHOLDER_SCRIPT_TEMPLATE: &str = include_str!("../resources/placeholder.js");

const SCRIPT_FILE: &str = "placeholder.js";

/// Chemin vers le dossier resources/, résolu une seule fois.
static RESOURCES_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Construit le script final pour un style donné.
pub fn placeholder_script(style: &PlaceholderStyle) -> String {
    render(&template(), style)
}

fn render(template: &str, style: &PlaceholderStyle) -> String {
    template
        .replace("__BACKGROUND__", &js_string(&style.background))
        .replace("__BORDER__", &js_string(&style.border))
        .replace("__MIN_WIDTH__", &js_string(&format!("{}px", style.min_width)))
        .replace("__MIN_HEIGHT__", &js_string(&format!("{}px", style.min_height)))
}

/// Littéral de chaîne JavaScript (JSON est un sous-ensemble valide).
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

/// Modèle depuis `resources/` si présent, sinon la version embarquée.
fn template() -> Cow<'static, str> {
    let Some(dir) = resources_dir_path() else {
        return Cow::Borrowed(PLACEHOLDER_SCRIPT_TEMPLATE);
    };
    let path = dir.join(SCRIPT_FILE);
    if !path.is_file() {
        return Cow::Borrowed(PLACEHOLDER_SCRIPT_TEMPLATE);
    }
    match fs::read_to_string(&path) {
        Ok(content) => {
            debug!(path = %path.display(), "Placeholder script loaded from resources");
            Cow::Owned(content)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read placeholder script, using embedded copy");
            Cow::Borrowed(PLACEHOLDER_SCRIPT_TEMPLATE)
        }
    }
}

fn resources_dir_path() -> Option<&'static PathBuf> {
    RESOURCES_DIR.get_or_init(find_resources_dir).as_ref()
}

fn find_resources_dir() -> Option<PathBuf> {
    // 1. Variable d'environnement
    if let Ok(path) = env::var("LIGHTBROWSER_RESOURCES_PATH") {
        let path = PathBuf::from(path);
        if path.is_dir() {
            return Some(path);
        }
    }

    // 2. À côté de l'exécutable
    if let Ok(exe_path) = env::current_exe()
        && let Ok(canonical) = exe_path.canonicalize()
        && let Some(exe_dir) = canonical.parent()
    {
        let path = exe_dir.join("resources");
        if path.is_dir() {
            return Some(path);
        }
    }

    // 3. Répertoire courant
    let path = PathBuf::from("resources");
    if path.is_dir() {
        return Some(path);
    }

    None
}
