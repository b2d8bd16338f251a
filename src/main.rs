// src/main.rs
use std::env;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use podshelf::app::auth::AuthState;
use podshelf::app::catalog::CatalogClient;
use podshelf::app::data::{all_genres, genre_id, genre_names, Credentials};
use podshelf::app::detail::ShowViewer;
use podshelf::app::filters::{filter_and_sort, ShowFilter};
use podshelf::app::types::{LoadState, SortOrder};
use podshelf::app::AppContext;
use podshelf::config::{load_config, AppConfig};

const USAGE: &str = "\
Usage: podshelf <command> [args]
  shows [--search T] [--letter L] [--genre ID|NAME] [--order asc|desc] [--desc]
  genres
  show <id> [season] [episode]
  favorites
  toggle <id>
  signup
Credentials for favorites/toggle/signup come from PODSHELF_EMAIL and PODSHELF_PASSWORD.";

const LOAD_WAIT: Duration = Duration::from_secs(30);

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn credentials_from_env() -> Result<Credentials, String> {
    match (env::var("PODSHELF_EMAIL"), env::var("PODSHELF_PASSWORD")) {
        (Ok(email), Ok(password)) => Ok(Credentials::new(email, password)),
        _ => Err("Set PODSHELF_EMAIL and PODSHELF_PASSWORD first.".into()),
    }
}

fn cmd_shows(cfg: &AppConfig, args: &[String]) -> Result<(), String> {
    let mut filter = ShowFilter {
        search_term: flag_value(args, "--search").unwrap_or_default().to_string(),
        ..ShowFilter::default()
    };
    filter.set_letter(flag_value(args, "--letter").and_then(|l| l.chars().next()));
    if let Some(raw) = flag_value(args, "--genre") {
        let genre = raw
            .parse()
            .ok()
            .or_else(|| genre_id(raw))
            .ok_or_else(|| format!("unknown genre `{raw}`; see `podshelf genres`"))?;
        filter.set_genre(Some(genre));
    }
    if let Some(raw) = flag_value(args, "--order") {
        filter.order = SortOrder::from_str(raw).ok_or_else(|| format!("bad order `{raw}`"))?;
    }
    if args.iter().any(|a| a == "--desc") {
        filter.order = SortOrder::Descending;
    }

    let catalog = CatalogClient::new(&cfg.catalog_url).map_err(|e| e.user_message())?;
    let shows = catalog.fetch_shows().map_err(|e| e.user_message())?;
    let visible = filter_and_sort(&shows, &filter);
    for show in &visible {
        println!(
            "{:>6}  {}  [{}]",
            show.id,
            show.title,
            genre_names(&show.genres).iter().join(", ")
        );
    }
    println!("{} of {} shows ({})", visible.len(), shows.len(), filter.order.as_str());
    Ok(())
}

fn cmd_genres() -> Result<(), String> {
    for (id, name) in all_genres() {
        println!("{id:>3}  {name}");
    }
    Ok(())
}

fn cmd_show(cfg: &AppConfig, args: &[String]) -> Result<(), String> {
    let id = args.first().ok_or_else(|| USAGE.to_string())?;
    let catalog = CatalogClient::new(&cfg.catalog_url).map_err(|e| e.user_message())?;
    let detail = catalog.fetch_show(id).map_err(|e| e.user_message())?;

    println!("{} ({})", detail.title, detail.genre_labels.iter().join(", "));
    if let Some(updated) = detail.updated {
        println!("Last updated {}", updated.format("%Y-%m-%d"));
    }
    println!("{}\n", detail.description);

    let mut viewer = ShowViewer::new(detail);
    if let Some(season) = args.get(1) {
        if !viewer.toggle_season(season) {
            return Err(format!("no season `{season}`"));
        }
    }
    if let Some(raw) = args.get(2) {
        let n: usize = raw.parse().map_err(|_| format!("bad episode `{raw}`"))?;
        if n == 0 || !viewer.select_episode(n - 1) {
            return Err(format!("no episode {n} in this season"));
        }
    }

    for season in &viewer.detail().seasons {
        println!("[{}] {} ({} episodes)", season.id, season.title, season.episodes.len());
    }
    if let Some(season) = viewer.open_season() {
        println!("\n{}", season.title);
        for ep in &season.episodes {
            println!("  {:>3}. {}", ep.episode, ep.title);
        }
    }
    if let Some(ep) = viewer.now_playing() {
        println!("\nNow playing: {} ({})", ep.title, ep.file);
    }
    Ok(())
}

/// Mount, sign in, and wait for the user's favorites to load.
fn signed_in(cfg: AppConfig) -> Result<AppContext, String> {
    let creds = credentials_from_env()?;
    let mut ctx = AppContext::mount(cfg).map_err(|e| e.to_string())?;
    let deadline = Instant::now() + LOAD_WAIT;

    if !ctx.run_until(deadline, |c| c.auth().state() != &AuthState::Initializing) {
        return Err("Timed out resolving the session.".into());
    }
    if ctx.require_user().is_err() {
        ctx.login(&creds).map_err(|e| e.reason().to_string())?;
    }

    let settled = ctx.run_until(deadline, |c| {
        c.require_user().is_ok()
            && matches!(
                c.favorites().load_state(),
                LoadState::Ready | LoadState::Failed(_)
            )
    });
    if let LoadState::Failed(msg) = ctx.favorites().load_state() {
        return Err(msg.clone());
    }
    if !settled {
        return Err("Timed out loading favorites.".into());
    }
    let user = ctx.require_user().map_err(|e| e.user_message())?;
    info!("Signed in as {}", user.email.as_deref().unwrap_or(&user.id));
    Ok(ctx)
}

fn cmd_favorites(cfg: AppConfig) -> Result<(), String> {
    let mut ctx = signed_in(cfg)?;
    let rows = ctx.favorites().rows();
    if rows.is_empty() {
        println!("No favorites yet.");
    }
    for row in rows {
        println!(
            "{:>6}  {}  [{}]",
            row.show_id,
            row.title,
            genre_names(&row.genres).iter().join(", ")
        );
    }
    ctx.teardown();
    Ok(())
}

fn cmd_toggle(cfg: AppConfig, args: &[String]) -> Result<(), String> {
    let id = args.first().ok_or_else(|| USAGE.to_string())?;
    let mut ctx = signed_in(cfg)?;
    ctx.load_shows().map_err(|e| e.user_message())?;
    let show = ctx
        .browser()
        .shows()
        .iter()
        .find(|s| &s.id == id)
        .cloned()
        .ok_or_else(|| "Show not found".to_string())?;

    let now = Instant::now();
    let result = ctx.toggle_favorite(&show, now);
    if let Some(notice) = ctx.favorites_mut().notice(now) {
        println!("{}", notice.message);
    }
    ctx.teardown();
    result.map(|_| ()).map_err(|e| e.to_string())
}

fn cmd_signup(cfg: AppConfig) -> Result<(), String> {
    let creds = credentials_from_env()?;
    let mut ctx = AppContext::mount(cfg).map_err(|e| e.to_string())?;
    ctx.sign_up(&creds).map_err(|e| e.reason().to_string())?;
    println!("Sign-up successful. Check your inbox, then sign in.");
    ctx.teardown();
    Ok(())
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(cmd) = args.first() else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let cfg = load_config();
    let rest = &args[1..];
    let result = match cmd.as_str() {
        "shows" => cmd_shows(&cfg, rest),
        "show" => cmd_show(&cfg, rest),
        "genres" => cmd_genres(),
        "favorites" => cmd_favorites(cfg),
        "toggle" => cmd_toggle(cfg, rest),
        "signup" => cmd_signup(cfg),
        _ => Err(USAGE.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            error!("{cmd} failed: {msg}");
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
