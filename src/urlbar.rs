//! Barre d'URL : résolution de la saisie utilisateur.
//!
//! Aucune dépendance graphique, ce module est purement logique.

use url::Url;

/// Résolution de l'entrée utilisateur en URL.
///
/// - Si l'entrée a déjà un schéma http(s), on l'utilise directement.
/// - Si l'entrée contient un point et pas d'espace (ex: `wikipedia.org`),
///   on la traite comme une URL et on ajoute `https://`.
/// - Sinon, on fait une recherche avec le préfixe `search_url`.
///
/// Retourne `None` pour une saisie vide.
pub fn resolve_input(input: &str, search_url: &str) -> Option<Url> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    // Déjà une URL valide avec schéma ?
    if let Ok(url) = Url::parse(input)
        && (url.scheme() == "http" || url.scheme() == "https")
    {
        return Some(url);
    }

    // Ressemble à un domaine ? (contient un point, pas d'espace)
    if input.contains('.')
        && !input.contains(char::is_whitespace)
        && let Ok(url) = Url::parse(&format!("https://{input}"))
    {
        return Some(url);
    }

    // Recherche
    let encoded: String = url::form_urlencoded::byte_serialize(input.as_bytes()).collect();
    Url::parse(&format!("{search_url}{encoded}")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = "https://lite.duckduckgo.com/lite/?q=";

    #[test]
    fn test_resolve_input_keeps_scheme() {
        let result = resolve_input("http://example.com/a?b=c", SEARCH).unwrap();
        assert_eq!(result.as_str(), "http://example.com/a?b=c");
    }

    #[test]
    fn test_resolve_input_https() {
        let result = resolve_input("google.com", SEARCH).unwrap();
        assert_eq!(result.scheme(), "https");
        assert_eq!(result.host_str(), Some("google.com"));
    }

    #[test]
    fn test_resolve_input_trims() {
        let result = resolve_input("  servo.org/blog  ", SEARCH).unwrap();
        assert_eq!(result.as_str(), "https://servo.org/blog");
    }

    #[test]
    fn test_resolve_input_search() {
        let result = resolve_input("hello world", SEARCH).unwrap();
        assert_eq!(result.as_str(), "https://lite.duckduckgo.com/lite/?q=hello+world");
    }

    #[test]
    fn test_resolve_input_non_http_scheme_is_searched() {
        let result = resolve_input("javascript:alert(1)", SEARCH).unwrap();
        assert!(result.as_str().starts_with(SEARCH));
    }

    #[test]
    fn test_resolve_input_empty() {
        assert!(resolve_input("", SEARCH).is_none());
        assert!(resolve_input("   ", SEARCH).is_none());
    }
}
