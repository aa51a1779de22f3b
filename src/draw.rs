use log::error;
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Paragraph, Tabs, Wrap};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::state::app_state::StadiumDetail;
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use pitchside_api::{Booking, Match, MatchDetail, MatchKind, Stadium, is_local_id};

static TABS: &[&str; 4] = &["Stadiums", "Matches", "Bookings", "Assistant"];

const HELP_TEXT: &str = "\
Global     1-4 switch tab   r refresh   z dismiss errors   f full screen   \" logs
           ? help   q quit

Stadiums   j/k move   Enter details   Esc close   b book 20:00 today
           m organize player match   t organize team match   w write review
           s field size   p max price   d max distance   o sort   x clear filters

Review     Left/Right rating   type comment   Enter post   Esc cancel

Matches    j/k move   Enter join   l leave   i details   Esc close
           D discard local match   s skill level   t match type   x clear filters

Bookings   j/k move   Enter details   s status   c cancel
           p pay by card   e pay by Edahabia   $ pay cash

Assistant  i/Enter type   Enter send   Esc stop typing   j/k scroll";

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let result = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
            draw_status(f, layout.status, app);
        }

        match app.state.active_tab {
            MenuItem::Stadiums => draw_stadiums(f, layout.main, app),
            MenuItem::Matches => draw_matches(f, layout.main, app),
            MenuItem::Bookings => draw_bookings(f, layout.main, app),
            MenuItem::Chat => draw_chat(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main),
        }

        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }

        draw_loading_spinner(f, f.area(), app, loading);
    });
    if let Err(e) = result {
        error!("draw failed: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Stadiums => 0,
        MenuItem::Matches => 1,
        MenuItem::Bookings => 2,
        MenuItem::Chat => 3,
        MenuItem::Help => 0,
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let line = if let Some(review) = app.state.review.as_ref() {
        Line::from(Span::styled(
            format!(
                " Review {}: {}* {}_   Left/Right rating  Enter post  Esc cancel",
                review.stadium_name,
                review.rating,
                review.comment
            ),
            Style::default().fg(Color::Yellow),
        ))
    } else if let Some(err) = app.state.last_error.as_deref() {
        Line::from(Span::styled(format!(" {err}"), Style::default().fg(Color::Red)))
    } else if let Some(notice) = app.state.notice.as_deref() {
        Line::from(Span::styled(format!(" {notice}"), Style::default().fg(Color::Green)))
    } else {
        Line::from("")
    };
    f.render_widget(Paragraph::new(line), area);
}

/// Rows of `items` that fit `height`, keeping `selected` on screen.
fn window<T>(items: &[T], selected: usize, height: usize) -> (usize, &[T]) {
    if height == 0 || items.is_empty() {
        return (0, &items[..0]);
    }
    let start = selected.saturating_sub(height - 1);
    let end = (start + height).min(items.len());
    (start, &items[start..end])
}

fn row_style(is_selected: bool) -> Style {
    if is_selected {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return format!("{s:<width$}");
    }
    let mut clipped: String = s.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

fn empty_message(f: &mut Frame, area: Rect, msg: &str) {
    f.render_widget(
        Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        area,
    );
}

// ---------------------------------------------------------------------------
// Stadiums
// ---------------------------------------------------------------------------

fn draw_stadiums(f: &mut Frame, area: Rect, app: &App) {
    let view = &app.state.stadiums;
    let (list_area, detail_area) = match &view.detail {
        Some(_) if area.width >= 90 => {
            let [left, right] =
                Layout::horizontal([Constraint::Percentage(58), Constraint::Percentage(42)]).areas(area);
            (left, Some(right))
        }
        Some(_) => (Rect::ZERO, Some(area)),
        None => (area, None),
    };

    if let (Some(detail), Some(detail_area)) = (&view.detail, detail_area) {
        draw_stadium_detail(f, detail_area, detail);
    }
    if list_area.is_empty() {
        return;
    }

    let block = default_border(Color::White).title(" Stadiums ");
    let inner = block.inner(list_area);
    f.render_widget(block, list_area);

    let Some(snapshot) = view.snapshot.as_ref() else {
        empty_message(f, inner, "Looking for stadiums nearby...");
        return;
    };

    let [header, legend, content] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1), Constraint::Fill(1)]).areas(inner);

    let source = if snapshot.using_remote_data { "live" } else { "no server data" };
    let header_text = format!(
        "near {:.4},{:.4} | {} of {} | sort {} | {}",
        snapshot.origin.latitude,
        snapshot.origin.longitude,
        snapshot.visible.len(),
        snapshot.total,
        snapshot.filters.sort_by.label(),
        source,
    );
    f.render_widget(Paragraph::new(header_text), header);

    let filters = &snapshot.filters;
    let mut chips = Vec::new();
    if let Some(size) = filters.field_size {
        chips.push(size.label().to_string());
    }
    if let Some(max) = filters.max_price {
        chips.push(format!("<= {max} DA"));
    }
    if let Some(max) = filters.max_distance {
        chips.push(format!("<= {max} km"));
    }
    let legend_text = if !filters.is_active() {
        "Filters: none   s size  p price  d distance  o sort".to_string()
    } else {
        format!("Filters: {}   x clear", chips.join(", "))
    };
    f.render_widget(
        Paragraph::new(legend_text).style(Style::default().fg(Color::DarkGray)),
        legend,
    );

    if snapshot.visible.is_empty() {
        let msg = snapshot.error.as_deref().unwrap_or("No stadiums match these filters");
        empty_message(f, content, msg);
        return;
    }

    let (start, rows) = window(&snapshot.visible, view.selected, content.height as usize);
    let name_width = (content.width as usize).saturating_sub(36).max(10);
    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(i, stadium)| {
            Line::from(Span::styled(
                stadium_row(stadium, name_width),
                row_style(start + i == view.selected),
            ))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), content);
}

fn stadium_row(stadium: &Stadium, name_width: usize) -> String {
    format!(
        "{} {:>6.1} km  {:<5} {:>6} DA/h  {:.1}*",
        clip(&stadium.name, name_width),
        stadium.distance,
        stadium.field_size.label(),
        stadium.price_per_hour,
        stadium.rating,
    )
}

fn draw_stadium_detail(f: &mut Frame, area: Rect, detail: &StadiumDetail) {
    let block = default_border(Color::Cyan).title(format!(" {} ", detail.stadium.name));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let stadium = &detail.stadium;
    let mut lines = vec![
        Line::from(stadium.address.clone()),
        Line::from(format!(
            "{} | {} DA/h | rated {:.1}",
            stadium.field_size.label(),
            stadium.price_per_hour,
            stadium.rating
        )),
    ];
    if !stadium.amenities.is_empty() {
        lines.push(Line::from(format!("Amenities: {}", stadium.amenities.join(", "))));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Today", Style::default().add_modifier(Modifier::BOLD))));
    if detail.availability.is_empty() {
        lines.push(Line::from(Span::styled("no slots published", Style::default().fg(Color::DarkGray))));
    }
    for slot in &detail.availability {
        let (mark, color) = if slot.available { ("free", Color::Green) } else { ("taken", Color::Red) };
        lines.push(Line::from(vec![
            Span::raw(format!("{:<6} {:>6} DA  ", slot.time, slot.price)),
            Span::styled(mark, Style::default().fg(color)),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Reviews", Style::default().add_modifier(Modifier::BOLD))));
    if detail.reviews.is_empty() {
        lines.push(Line::from(Span::styled("no reviews yet", Style::default().fg(Color::DarkGray))));
    }
    for review in &detail.reviews {
        let author = review.author.as_deref().unwrap_or("anonymous");
        lines.push(Line::from(format!("{:.1}* {author}: {}", review.rating, review.comment)));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

fn draw_matches(f: &mut Frame, area: Rect, app: &App) {
    let view = &app.state.matches;
    let (list_area, detail_area) = match &view.detail {
        Some(_) if area.width >= 90 => {
            let [left, right] =
                Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(area);
            (left, Some(right))
        }
        Some(_) => (Rect::ZERO, Some(area)),
        None => (area, None),
    };

    if let (Some(detail), Some(detail_area)) = (&view.detail, detail_area) {
        draw_match_detail(f, detail_area, detail);
    }
    if list_area.is_empty() {
        return;
    }

    let block = default_border(Color::White).title(" Matches ");
    let inner = block.inner(list_area);
    f.render_widget(block, list_area);

    let Some(snapshot) = view.snapshot.as_ref() else {
        empty_message(f, inner, "Loading matches...");
        return;
    };

    let [header, content] = Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(inner);

    let skill = snapshot.filters.skill_level.map_or("any level", |s| s.as_str());
    let kind = match snapshot.filters.match_type {
        None => "all",
        Some(pitchside_api::MatchType::Player) => "player",
        Some(pitchside_api::MatchType::Team) => "team",
    };
    let mut header_spans = vec![Span::raw(format!(
        "{} of {} | {skill} | {kind}",
        snapshot.visible.len(),
        snapshot.total
    ))];
    if snapshot.filters.is_active() {
        header_spans.push(Span::styled("  x clear", Style::default().fg(Color::DarkGray)));
    }
    if let Some(err) = snapshot.error.as_deref() {
        header_spans.push(Span::styled(format!("  {err}"), Style::default().fg(Color::Yellow)));
    }
    f.render_widget(Paragraph::new(Line::from(header_spans)), header);

    if snapshot.visible.is_empty() {
        empty_message(f, content, "No matches yet. Organize one from the Stadiums tab.");
        return;
    }

    let (start, rows) = window(&snapshot.visible, view.selected, content.height as usize);
    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(i, m)| Line::from(Span::styled(match_row(m), row_style(start + i == view.selected))))
        .collect();
    f.render_widget(Paragraph::new(lines), content);
}

fn match_row(m: &Match) -> String {
    let origin = if is_local_id(&m.id) { "device" } else { "server" };
    let detail = match &m.kind {
        MatchKind::Player(slots) => format!(
            "{}/{} players, {} DA each",
            slots.current_players, slots.max_players, slots.price_per_player
        ),
        MatchKind::Team(team) => format!("team {}", team.team_name),
    };
    format!(
        "{} {} {} {:<5} {:<12} {:<9} {:<7} {}",
        m.date.format("%d/%m"),
        m.time.format("%H:%M"),
        clip(&m.stadium.name, 20),
        m.field_size.label(),
        m.skill_level.as_str(),
        m.status.as_str(),
        origin,
        detail,
    )
}

fn draw_match_detail(f: &mut Frame, area: Rect, detail: &MatchDetail) {
    let game = &detail.game;
    let block = default_border(Color::Cyan).title(format!(" {} ", game.stadium.name));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = Vec::new();
    if let Some(address) = game.stadium.address.as_deref() {
        lines.push(Line::from(address.to_string()));
    }
    lines.push(Line::from(format!(
        "{} at {} | {} | {}",
        game.date.format("%A %d %B"),
        game.time.format("%H:%M"),
        game.field_size.label(),
        game.skill_level.as_str()
    )));
    if let Some(organizer) = game.organizer_name.as_deref() {
        lines.push(Line::from(format!("Organized by {organizer}")));
    }
    match &game.kind {
        MatchKind::Player(slots) => lines.push(Line::from(format!(
            "{}/{} players, {} needed, {} DA each",
            slots.current_players, slots.max_players, slots.slots_needed, slots.price_per_player
        ))),
        MatchKind::Team(team) => lines.push(Line::from(format!("Team {} looking for opponents", team.team_name))),
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Players", Style::default().add_modifier(Modifier::BOLD))));
    if detail.players.is_empty() {
        let note = if game.is_local { "kept on this device" } else { "no roster published" };
        lines.push(Line::from(Span::styled(note, Style::default().fg(Color::DarkGray))));
    }
    for player in &detail.players {
        let joined = player
            .joined_at
            .map(|at| format!("  joined {}", at.format("%d/%m")))
            .unwrap_or_default();
        lines.push(Line::from(format!("{}{joined}", player.name)));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

fn draw_bookings(f: &mut Frame, area: Rect, app: &App) {
    let view = &app.state.bookings;
    let (list_area, detail_area) = match &view.detail {
        Some(_) => {
            let [top, bottom] = Layout::vertical([Constraint::Fill(1), Constraint::Length(8)]).areas(area);
            (top, Some(bottom))
        }
        None => (area, None),
    };

    let block = default_border(Color::White).title(" Bookings ");
    let inner = block.inner(list_area);
    f.render_widget(block, list_area);

    if let (Some(booking), Some(detail_area)) = (&view.detail, detail_area) {
        draw_booking_detail(f, detail_area, booking);
    }

    let Some(snapshot) = view.snapshot.as_ref() else {
        empty_message(f, inner, "Loading bookings...");
        return;
    };

    let [header, content] = Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(inner);
    let status = view.status.map_or("all", |s| s.as_str());
    let mut header_spans = vec![Span::raw(format!("{} bookings | {status}", snapshot.bookings.len()))];
    if let Some(err) = snapshot.error.as_deref() {
        header_spans.push(Span::styled(format!("  {err}"), Style::default().fg(Color::Yellow)));
    }
    f.render_widget(Paragraph::new(Line::from(header_spans)), header);

    if snapshot.bookings.is_empty() {
        empty_message(f, content, "No bookings. Press b on a stadium to book it.");
        return;
    }

    let (start, rows) = window(&snapshot.bookings, view.selected, content.height as usize);
    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(i, b)| Line::from(Span::styled(booking_row(b), row_style(start + i == view.selected))))
        .collect();
    f.render_widget(Paragraph::new(lines), content);
}

/// End time, marked when it falls on the next day.
fn end_label(b: &Booking) -> String {
    let end = b.end_time.format("%H:%M");
    if b.ends_next_day() { format!("{end}+1") } else { end.to_string() }
}

fn booking_row(b: &Booking) -> String {
    let offline = if is_local_id(&b.id) { " (offline)" } else { "" };
    format!(
        "{} {}-{} {} {:>7} DA  {:<9} {:?}{offline}",
        b.date.format("%d/%m"),
        b.start_time.format("%H:%M"),
        end_label(b),
        clip(&b.stadium.name, 22),
        b.total_price,
        b.status.as_str(),
        b.payment_status,
    )
}

fn draw_booking_detail(f: &mut Frame, area: Rect, booking: &Booking) {
    let block = default_border(Color::Cyan).title(format!(" Booking {} ", booking.id));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![
        Line::from(booking.stadium.name.clone()),
        Line::from(format!(
            "{} from {} to {} ({}h)",
            booking.date.format("%A %d %B %Y"),
            booking.start_time.format("%H:%M"),
            end_label(booking),
            booking.duration_hours
        )),
        Line::from(format!(
            "{} DA | {} | payment {:?}",
            booking.total_price,
            booking.status.as_str(),
            booking.payment_status
        )),
    ];
    if let Some(address) = booking.stadium.address.as_deref() {
        lines.insert(1, Line::from(address.to_string()));
    }
    if let Some(created) = booking.created_at {
        lines.push(Line::from(Span::styled(
            format!("booked {}", created.format("%d/%m %H:%M")),
            Style::default().fg(Color::DarkGray),
        )));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

// ---------------------------------------------------------------------------
// Assistant chat
// ---------------------------------------------------------------------------

fn draw_chat(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Assistant ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.width == 0 || inner.height < 3 {
        return;
    }

    let [messages_area, input_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(3)]).areas(inner);

    let mut lines = Vec::new();
    for msg in &app.state.chat.messages {
        let prefix = format!("[{}] {}: ", msg.timestamp, msg.author);
        let style = if msg.is_system {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        let body_width = messages_area
            .width
            .saturating_sub(prefix.chars().count() as u16)
            .max(8) as usize;
        let clipped: String = msg.body.chars().take(body_width).collect();
        lines.push(Line::from(vec![Span::styled(prefix, style), Span::styled(clipped, style)]));
    }
    if app.state.chat.awaiting_reply {
        lines.push(Line::from(Span::styled("assistant is typing...", Style::default().fg(Color::DarkGray))));
    }

    let visible = messages_area.height as usize;
    let total = lines.len();
    let offset = app.state.chat.scroll_offset as usize;
    let end = total.saturating_sub(offset);
    let start = end.saturating_sub(visible);
    let window = if start < end { lines[start..end].to_vec() } else { Vec::new() };
    f.render_widget(Paragraph::new(window), messages_area);

    let mode = if app.state.chat.composing { "typing" } else { "idle" };
    let input = if app.state.chat.composing {
        format!("> {}_", app.state.chat.input)
    } else {
        "Press Enter/i to ask. Esc cancel. j/k scroll.".to_string()
    };
    let input_style = if app.state.chat.composing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input_block = default_border(Color::DarkGray).title(format!(" {mode} "));
    let input_inner = input_block.inner(input_area);
    f.render_widget(input_block, input_area);
    f.render_widget(Paragraph::new(input).style(input_style), input_inner);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::DarkGray).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(Paragraph::new(HELP_TEXT).style(Style::default().fg(Color::Gray)), inner);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logs = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Gray))
        .style_debug(Style::default().fg(Color::DarkGray))
        .output_target(false);
    f.render_widget(logs, area);
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(11), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_selection_visible() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(window(&items, 0, 4), (0, &items[0..4]));
        assert_eq!(window(&items, 6, 4), (3, &items[3..7]));
        assert_eq!(window(&items, 9, 20), (0, &items[..]));
        assert_eq!(window(&items, 3, 0).1.len(), 0);
    }

    #[test]
    fn overnight_bookings_are_marked() {
        use chrono::{NaiveDate, NaiveTime};
        use pitchside_api::{BookingStatus, PaymentStatus, StadiumRef};

        let mut booking = Booking {
            id: "b1".into(),
            stadium: StadiumRef::default(),
            date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(1, 0, 0).unwrap(),
            duration_hours: 3,
            total_price: 9000,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            created_at: None,
        };
        assert_eq!(end_label(&booking), "01:00+1");
        booking.end_time = NaiveTime::MIN;
        assert_eq!(end_label(&booking), "00:00");
    }

    #[test]
    fn clip_pads_and_truncates() {
        assert_eq!(clip("abc", 5), "abc  ");
        assert_eq!(clip("Stade Olympique", 6), "Stade…");
    }
}
