use tui::layout::{Constraint, Layout, Rect, Size};
pub const TAB_BAR_HEIGHT: u16 = 3;
pub const STATUS_HEIGHT: u16 = 1;
pub const LOG_PANE_HEIGHT: u16 = 8;

/// Pre-computed layout areas for the main draw loop.
pub struct LayoutAreas {
    pub tab_bar: [Rect; 2],
    pub main: Rect,
    pub status: Rect,
    pub logs: Option<Rect>,
}

impl LayoutAreas {
    pub fn new(size: Size) -> Self {
        let rect = Rect::new(0, 0, size.width, size.height);
        Self::from_rect(rect, false, false)
    }

    pub fn update(&mut self, area: Rect, full_screen: bool, show_logs: bool) {
        *self = Self::from_rect(area, full_screen, show_logs);
    }

    fn from_rect(area: Rect, full_screen: bool, show_logs: bool) -> Self {
        if full_screen {
            let [main] = Layout::vertical([Constraint::Fill(1)]).areas(area);
            return LayoutAreas {
                tab_bar: [Rect::ZERO, Rect::ZERO],
                main,
                status: Rect::ZERO,
                logs: None,
            };
        }

        let log_height = if show_logs { LOG_PANE_HEIGHT } else { 0 };
        let [tab, main, status, logs] = Layout::vertical([
            Constraint::Length(TAB_BAR_HEIGHT),
            Constraint::Fill(1),
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Length(log_height),
        ])
        .areas(area);

        LayoutAreas {
            tab_bar: Self::split_tab_bar(tab),
            main,
            status,
            logs: show_logs.then_some(logs),
        }
    }

    fn split_tab_bar(area: Rect) -> [Rect; 2] {
        Layout::horizontal([Constraint::Percentage(85), Constraint::Percentage(15)]).areas(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_pane_takes_the_bottom_rows() {
        let area = Rect::new(0, 0, 100, 40);
        let with_logs = LayoutAreas::from_rect(area, false, true);
        let logs = with_logs.logs.unwrap();
        assert_eq!(logs.height, LOG_PANE_HEIGHT);
        assert_eq!(logs.y + logs.height, 40);
        assert_eq!(with_logs.status.y + STATUS_HEIGHT, logs.y);

        let without = LayoutAreas::from_rect(area, false, false);
        assert!(without.logs.is_none());
        assert_eq!(without.main.height, 40 - TAB_BAR_HEIGHT - STATUS_HEIGHT);
    }

    #[test]
    fn full_screen_is_all_main() {
        let area = Rect::new(0, 0, 80, 24);
        let layout = LayoutAreas::from_rect(area, true, true);
        assert_eq!(layout.main, area);
        assert!(layout.logs.is_none());
    }
}
