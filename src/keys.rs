use crate::app::{App, MenuItem};
use crate::state::messages::SyncRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pitchside_api::{MatchType, PaymentMethod};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    sync_requests: &mpsc::Sender<SyncRequest>,
) {
    let mut guard = app.lock().await;

    if guard.state.active_tab == MenuItem::Chat && guard.state.chat.composing {
        let request = match key_event.code {
            KeyCode::Enter => guard.submit_chat(),
            KeyCode::Esc => {
                guard.state.chat.composing = false;
                None
            }
            KeyCode::Backspace => {
                guard.state.chat.input.pop();
                None
            }
            Char('c') if key_event.modifiers == KeyModifiers::CONTROL => {
                crate::cleanup_terminal();
                std::process::exit(0);
            }
            Char(c) => {
                guard.state.chat.input.push(c);
                None
            }
            _ => None,
        };
        drop(guard);
        send(sync_requests, request).await;
        return;
    }

    if guard.state.review.is_some() {
        let request = match key_event.code {
            KeyCode::Enter => guard.submit_review(),
            KeyCode::Esc => {
                guard.state.review = None;
                None
            }
            code => {
                if let Some(composer) = guard.state.review.as_mut() {
                    match code {
                        KeyCode::Left => composer.adjust_rating(-1),
                        KeyCode::Right => composer.adjust_rating(1),
                        KeyCode::Backspace => {
                            composer.comment.pop();
                        }
                        Char(c) => composer.comment.push(c),
                        _ => {}
                    }
                }
                None
            }
        };
        drop(guard);
        send(sync_requests, request).await;
        return;
    }

    let request = match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Stadiums),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Matches),
        (_, Char('3'), _) => guard.update_tab(MenuItem::Bookings),
        (_, Char('4'), _) => guard.update_tab(MenuItem::Chat),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => {
            guard.exit_help();
            None
        }

        // Stadium search
        (MenuItem::Stadiums, Char('j') | KeyCode::Down, _) => {
            guard.state.stadiums.move_selection(1);
            None
        }
        (MenuItem::Stadiums, Char('k') | KeyCode::Up, _) => {
            guard.state.stadiums.move_selection(-1);
            None
        }
        (MenuItem::Stadiums, KeyCode::Enter, _) => guard.stadium_details(),
        (MenuItem::Stadiums, KeyCode::Esc, _) => {
            guard.close_stadium_details();
            None
        }
        (MenuItem::Stadiums, Char('s'), _) => Some(guard.cycle_field_size_filter()),
        (MenuItem::Stadiums, Char('p'), _) => Some(guard.cycle_max_price_filter()),
        (MenuItem::Stadiums, Char('d'), _) => Some(guard.cycle_max_distance_filter()),
        (MenuItem::Stadiums, Char('o'), _) => Some(guard.cycle_sort()),
        (MenuItem::Stadiums, Char('x'), _) => Some(SyncRequest::ClearStadiumFilters),
        (MenuItem::Stadiums, Char('b'), _) => guard.book_selected_stadium(),
        (MenuItem::Stadiums, Char('m'), _) => guard.organize_at_selected_stadium(MatchType::Player),
        (MenuItem::Stadiums, Char('t'), _) => guard.organize_at_selected_stadium(MatchType::Team),
        (MenuItem::Stadiums, Char('w'), _) => {
            guard.start_review();
            None
        }

        // Matchmaking
        (MenuItem::Matches, Char('j') | KeyCode::Down, _) => {
            guard.state.matches.move_selection(1);
            None
        }
        (MenuItem::Matches, Char('k') | KeyCode::Up, _) => {
            guard.state.matches.move_selection(-1);
            None
        }
        (MenuItem::Matches, KeyCode::Enter, _) => guard.join_selected_match(),
        (MenuItem::Matches, Char('i'), _) => guard.match_details(),
        (MenuItem::Matches, KeyCode::Esc, _) => {
            guard.close_match_details();
            None
        }
        (MenuItem::Matches, Char('x'), _) => Some(SyncRequest::ClearMatchFilters),
        (MenuItem::Matches, Char('l'), _) => guard.leave_selected_match(),
        (MenuItem::Matches, Char('D'), _) => guard.discard_selected_match(),
        (MenuItem::Matches, Char('s'), _) => Some(guard.cycle_skill_filter()),
        (MenuItem::Matches, Char('t'), _) => Some(guard.cycle_match_type_filter()),

        // Bookings
        (MenuItem::Bookings, Char('j') | KeyCode::Down, _) => {
            guard.state.bookings.move_selection(1);
            None
        }
        (MenuItem::Bookings, Char('k') | KeyCode::Up, _) => {
            guard.state.bookings.move_selection(-1);
            None
        }
        (MenuItem::Bookings, KeyCode::Enter, _) => guard.booking_details(),
        (MenuItem::Bookings, KeyCode::Esc, _) => {
            guard.close_booking_details();
            None
        }
        (MenuItem::Bookings, Char('s'), _) => Some(guard.cycle_booking_status()),
        (MenuItem::Bookings, Char('c'), _) => guard.cancel_selected_booking(),
        (MenuItem::Bookings, Char('p'), _) => guard.pay_selected_booking(PaymentMethod::Card),
        (MenuItem::Bookings, Char('e'), _) => guard.pay_selected_booking(PaymentMethod::Edahabia),
        (MenuItem::Bookings, Char('$'), _) => guard.pay_selected_booking(PaymentMethod::Cash),

        // Chat
        (MenuItem::Chat, Char('i') | KeyCode::Enter, _) => {
            guard.state.chat.composing = true;
            None
        }
        (MenuItem::Chat, Char('k') | KeyCode::Up, _) => {
            guard.state.chat.scroll_up();
            None
        }
        (MenuItem::Chat, Char('j') | KeyCode::Down, _) => {
            guard.state.chat.scroll_down();
            None
        }

        // Global
        (_, Char('r'), _) => guard.refresh_active_tab(),
        (_, Char('z'), _) => Some(guard.dismiss_errors()),
        (_, Char('f'), _) => {
            guard.toggle_full_screen();
            None
        }
        (_, Char('"'), _) => {
            guard.toggle_show_logs();
            None
        }

        _ => None,
    };

    drop(guard);
    send(sync_requests, request).await;
}

async fn send(sync_requests: &mpsc::Sender<SyncRequest>, request: Option<SyncRequest>) {
    if let Some(request) = request
        && sync_requests.send(request).await.is_err()
    {
        log::error!("sync worker is gone, dropping request");
    }
}
