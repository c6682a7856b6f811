//! Point d'entrée de LightBrowser : outil de diagnostic du blocage média.
//!
//! Usage :
//!   lightbrowser [URL...] [--accept TYPE] [--no-media-blocking] [--toggle]
//!                [--script] [--ephemeral] [--write-config]
//!
//! Chaque URL est classée telle quelle, comme une requête de sous-ressource :
//! pas de correction `https://` ni de recherche (`a.png` reste `a.png`).
//!
//! Exemples :
//!   cargo run -- https://example.com/a.png                → BLOCK
//!   cargo run -- img/a.png                                → BLOCK
//!   cargo run -- --accept text/html https://example.com/  → ALLOW
//!   cargo run -- --toggle                                 → inverse le réglage enregistré
//!   cargo run -- --script                                 → affiche le script injecté
//!   cargo run -- --write-config                           → écrit la configuration courante

use std::env;
use std::error::Error;
use std::sync::Arc;

use url::Url;

use lightbrowser::browser::BrowserSession;
use lightbrowser::classifier::ResourceRequest;
use lightbrowser::config::Config;
use lightbrowser::gate::LoadInterceptor;
use lightbrowser::host::PageHost;
use lightbrowser::store::{FileStore, KeyValueStore, MemoryStore};

/// Options de la ligne de commande.
#[derive(Debug, Default)]
struct Options {
    inputs: Vec<String>,
    accept: Option<String>,
    no_media_blocking: bool,
    toggle: bool,
    script: bool,
    ephemeral: bool,
    write_config: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    // ── 1. Logging / Tracing ───────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ── 2. Arguments et configuration ──────────────────────────────────
    let options = parse_args(env::args().skip(1))?;
    let config = Config::load();
    if options.write_config {
        let path = config.save()?;
        println!("configuration written to {}", path.display());
    }

    // ── 3. Préférences ─────────────────────────────────────────────────
    if options.ephemeral {
        run(Arc::new(MemoryStore::new()), &config, &options)
    } else {
        run(Arc::new(FileStore::open(config.storage.preferences_path())), &config, &options)
    }
}

fn run<S: KeyValueStore>(store: Arc<S>, config: &Config, options: &Options) -> Result<(), Box<dyn Error>> {
    let mut session = BrowserSession::new(HeadlessHost::default(), store, config);

    if options.toggle {
        let enabled = session.toggle_media_blocking();
        println!("media blocking {}", if enabled { "enabled" } else { "disabled" });
    }
    if options.no_media_blocking {
        session.blocking().set(false);
    }

    if options.script {
        println!("{}", session.injector().script());
    }

    let interceptor = session.begin_load();
    for input in &options.inputs {
        let request = resource_request(input, options.accept.as_deref());
        println!("{}\t{input}", verdict(&interceptor, &request));
    }
    Ok(())
}

/// Requête de sous-ressource pour une entrée de la ligne de commande.
fn resource_request(input: &str, accept: Option<&str>) -> ResourceRequest {
    let request = ResourceRequest::new(input.trim());
    match accept {
        Some(accept) => request.with_accept(accept),
        None => request,
    }
}

fn verdict(interceptor: &LoadInterceptor, request: &ResourceRequest) -> String {
    match interceptor.load_web_resource(request) {
        Some(response) => format!("BLOCK ({}, {} bytes)", response.mime_type(), response.content_length()),
        None => "ALLOW".to_string(),
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--accept" => {
                let value = args.next().ok_or("--accept attend un type MIME")?;
                options.accept = Some(value);
            }
            "--no-media-blocking" => options.no_media_blocking = true,
            "--toggle" => options.toggle = true,
            "--script" => options.script = true,
            "--ephemeral" => options.ephemeral = true,
            "--write-config" => options.write_config = true,
            flag if flag.starts_with("--") => return Err(format!("option inconnue '{flag}'")),
            input => options.inputs.push(input.to_string()),
        }
    }
    Ok(options)
}

// ─────────────────────────────────────────────────────────────────────────────
// HeadlessHost : hôte sans rendu
// ─────────────────────────────────────────────────────────────────────────────

/// Hôte minimal : retient la dernière URL, ne charge rien.
#[derive(Debug, Default)]
struct HeadlessHost {
    current: Option<Url>,
}

impl PageHost for HeadlessHost {
    fn load_url(&mut self, url: &Url) {
        self.current = Some(url.clone());
    }

    fn reload(&mut self) {}

    fn can_go_back(&self) -> bool {
        false
    }

    fn can_go_forward(&self) -> bool {
        false
    }

    fn go_back(&mut self) {}

    fn go_forward(&mut self) {}

    fn current_url(&self) -> Option<Url> {
        self.current.clone()
    }

    fn title(&self) -> Option<String> {
        None
    }
}
