mod app;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::AppSettings;
use crate::state::bookings::BookingStore;
use crate::state::events::{EventSink, StoreEvent};
use crate::state::local_store::{
    JsonDirStore, KeyValueStore, LOCAL_BOOKINGS_KEY, LOCAL_MATCHES_KEY, LocalEntities,
};
use crate::state::location::{FileLocation, LocationProvider, StaticLocation, resolve_location};
use crate::state::matches::MatchStore;
use crate::state::messages::{SyncRequest, SyncResponse, UiEvent};
use crate::state::network::{LoadingState, SyncWorker};
use crate::state::refresher::PeriodicRefresher;
use crate::state::stadiums::StadiumStore;
use anyhow::Context;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::{error, warn};
use pitchside_api::User;
use pitchside_api::client::PitchsideApi;
use pitchside_api::tokens::FileTokenStore;
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc};
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (settings, settings_warnings) = AppSettings::load();
    let api = PitchsideApi::new(
        settings.api_url.clone(),
        settings.timeout,
        Arc::new(FileTokenStore::new(settings.tokens_path())),
    );

    // Subcommands never start the logger.
    if std::env::args().len() > 1 {
        for warning in &settings_warnings {
            eprintln!("warning: {warning}");
        }
    }
    if handle_cli_args(&api).await? {
        return Ok(());
    }

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal();

    tui_logger::init_logger(settings.log_level)?;
    tui_logger::set_default_level(settings.log_level);
    for warning in &settings_warnings {
        warn!("{warning}");
    }

    let api = Arc::new(api);
    let events = EventSink::new();
    let store_events = events.subscribe();

    let location: Arc<dyn LocationProvider> = match settings.device_location {
        Some(fixed) => Arc::new(StaticLocation(Some(fixed))),
        None => Arc::new(FileLocation::new(settings.location_path())),
    };
    let origin = resolve_location(location.as_ref(), settings.default_location).await;

    let kv: Arc<dyn KeyValueStore> = Arc::new(JsonDirStore::new(settings.data_dir.clone()));
    let stadiums = StadiumStore::new(api.clone(), events.clone(), origin, settings.radius_km);
    let matches = MatchStore::new(
        api.clone(),
        LocalEntities::new(kv.clone(), LOCAL_MATCHES_KEY),
        events.clone(),
        settings.slot_policy,
    );
    let bookings = BookingStore::new(api.clone(), LocalEntities::new(kv, LOCAL_BOOKINGS_KEY), events);

    let player_name = settings.player_name.clone();
    let app = Arc::new(Mutex::new(App::new(settings)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (sync_req_tx, sync_req_rx) = mpsc::channel::<SyncRequest>(100);
    let (sync_resp_tx, sync_resp_rx) = mpsc::channel::<SyncResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Sync thread: owns every store
    let sync_worker = SyncWorker::new(stadiums, matches, bookings, api, sync_req_rx, sync_resp_tx)
        .with_player_name(player_name);
    let sync_task = tokio::spawn(sync_worker.run());

    // Location poll thread
    let periodic_updater = PeriodicRefresher::new(location, sync_req_tx.clone(), Some(origin));
    let periodic_task = tokio::spawn(periodic_updater.run());

    // Trigger the first stadium search on startup
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(terminal, app, ui_event_rx, sync_req_tx, sync_resp_rx, store_events).await;

    input_handler.abort();
    sync_task.abort();
    periodic_task.abort();

    Ok(())
}

/// Runs a one-shot subcommand. Returns true when the TUI should not start.
async fn handle_cli_args(api: &PitchsideApi) -> anyhow::Result<bool> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        return Ok(false);
    };

    match command.as_str() {
        "-h" | "--help" => println!("{}", usage_text()),
        "-V" | "--version" => println!("pitchside {}", env!("CARGO_PKG_VERSION")),
        "login" => {
            let (Some(email), Some(password)) = (args.get(1), args.get(2)) else {
                eprintln!("Usage: pitchside login <email> <password>");
                std::process::exit(2);
            };
            let user = api.login(email, password).await.context("login failed")?;
            println!("Logged in as {}", describe_user(&user));
        }
        "signup" => {
            let (Some(name), Some(email), Some(password)) = (args.get(1), args.get(2), args.get(3)) else {
                eprintln!("Usage: pitchside signup <name> <email> <password>");
                std::process::exit(2);
            };
            let user = api.signup(name, email, password).await.context("signup failed")?;
            println!("Signed up as {}", describe_user(&user));
        }
        "logout" => {
            let user_id = api.current_user().await.ok().map(|u| u.id);
            if let Err(e) = api.logout(user_id.as_deref()).await {
                warn!("server logout failed: {e}");
            }
            println!("Logged out");
        }
        "whoami" => {
            let user = api.current_user().await.context("not logged in")?;
            println!("{}", describe_user(&user));
        }
        _ => {
            eprintln!("Unknown argument: {command}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
    Ok(true)
}

fn describe_user(user: &User) -> String {
    match (user.name.as_deref(), user.email.as_deref()) {
        (Some(name), Some(email)) => format!("{name} <{email}>"),
        (Some(name), None) => name.to_string(),
        (None, Some(email)) => email.to_string(),
        (None, None) => user.id.clone(),
    }
}

fn usage_text() -> &'static str {
    "pitchside - find a pitch, book it, fill your match

Usage:
  pitchside
  pitchside login <email> <password>
  pitchside signup <name> <email> <password>
  pitchside logout
  pitchside whoami
  pitchside --help
  pitchside --version

Environment:
  PITCHSIDE_API_URL           API base URL (default http://localhost:3000)
  PITCHSIDE_TIMEOUT_SECS      Request timeout in seconds (default 30)
  PITCHSIDE_RADIUS_KM         Stadium search radius (default 10)
  PITCHSIDE_LOCATION          Fixed position as lat,lon (default: read <data dir>/location)
  PITCHSIDE_DEFAULT_LOCATION  Position used while none is known (default Algiers)
  PITCHSIDE_DATA_DIR          Tokens and offline entities (default ~/.config/pitchside)
  PITCHSIDE_SLOT_POLICY       optimistic | server (join/leave when the server fails)
  PITCHSIDE_PLAYER_NAME       Name sent when joining matches (default $USER)
  PITCHSIDE_LOG               error | warn | info | debug | trace"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    sync_requests: mpsc::Sender<SyncRequest>,
    mut sync_responses: mpsc::Receiver<SyncResponse>,
    mut store_events: broadcast::Receiver<StoreEvent>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &sync_requests).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = sync_responses.recv() => {
                let should_redraw = handle_sync_response(response, &app, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            event = store_events.recv() => {
                match event {
                    Ok(event) => {
                        let mut app_guard = app.lock().await;
                        app_guard.on_store_event(event);
                        if !loading.is_loading {
                            draw::draw(&mut terminal, &mut app_guard, loading);
                        }
                    }
                    Err(RecvError::Lagged(missed)) => warn!("ui skipped {missed} store events"),
                    Err(RecvError::Closed) => {
                        error!("store events closed");
                        break;
                    }
                }
            }
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    sync_requests: &mpsc::Sender<SyncRequest>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let _ = sync_requests.send(SyncRequest::RefreshStadiums).await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, sync_requests).await;
            true
        }
        UiEvent::Resize => true,
    }
}

async fn handle_sync_response(
    response: SyncResponse,
    app: &Arc<Mutex<App>>,
    loading: &mut LoadingState,
) -> bool {
    let mut guard = app.lock().await;
    match response {
        SyncResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        SyncResponse::StadiumDetailLoaded { stadium, availability, reviews } => {
            guard.on_stadium_detail(stadium, availability, reviews);
        }
        SyncResponse::ReviewAdded { stadium_id, review } => guard.on_review_added(&stadium_id, review),
        SyncResponse::MatchDetailLoaded { detail } => guard.on_match_detail(detail),
        SyncResponse::BookingDetailLoaded { booking } => guard.on_booking_detail(booking),
        SyncResponse::PaymentCompleted { booking_id, receipt } => {
            guard.on_payment_completed(&booking_id, receipt);
        }
        SyncResponse::ChatReplied { reply } => guard.on_chat_reply(reply),
        SyncResponse::Notice { message } => guard.on_notice(message),
        SyncResponse::Error { message } => {
            error!("Sync error: {message}");
            guard.on_error(message);
        }
    }
    !loading.is_loading
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::Hide);
    let _ = execute!(stdout, terminal::EnterAlternateScreen);
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    if let Err(e) = terminal::enable_raw_mode() {
        eprintln!("could not enable raw mode: {e}");
    }
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
