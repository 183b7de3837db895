// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ScreenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuVisibility {
    Hidden,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub active_screen: ScreenKind,
    pub menu: MenuVisibility,
    pub menu_cursor: usize,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::starting_at(ScreenKind::CreateClient)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextScreen,
    PrevScreen,
    OpenMenu,
    CloseMenu,
    MenuUp,
    MenuDown,
    PickMenuEntry,
    Navigate(ScreenKind),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ScreenChanged(ScreenKind),
    MenuVisibilityChanged(MenuVisibility),
    MenuCursorMoved(usize),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn starting_at(screen: ScreenKind) -> Self {
        Self {
            active_screen: screen,
            menu: MenuVisibility::Hidden,
            menu_cursor: 0,
            status_line: None,
        }
    }

    pub fn menu_open(&self) -> bool {
        self.menu == MenuVisibility::Visible
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextScreen => self.rotate_screen(1),
            AppCommand::PrevScreen => self.rotate_screen(-1),
            AppCommand::OpenMenu => {
                self.menu = MenuVisibility::Visible;
                self.menu_cursor = screen_position(self.active_screen);
                vec![AppEvent::MenuVisibilityChanged(self.menu)]
            }
            AppCommand::CloseMenu => {
                self.menu = MenuVisibility::Hidden;
                vec![AppEvent::MenuVisibilityChanged(self.menu)]
            }
            AppCommand::MenuUp => self.move_cursor(-1),
            AppCommand::MenuDown => self.move_cursor(1),
            AppCommand::PickMenuEntry => {
                let picked = ScreenKind::ALL
                    .get(self.menu_cursor)
                    .copied()
                    .unwrap_or(self.active_screen);
                self.menu = MenuVisibility::Hidden;
                let mut events = vec![AppEvent::MenuVisibilityChanged(self.menu)];
                events.extend(self.navigate(picked));
                events
            }
            AppCommand::Navigate(screen) => {
                let mut events = Vec::new();
                if self.menu_open() {
                    self.menu = MenuVisibility::Hidden;
                    events.push(AppEvent::MenuVisibilityChanged(self.menu));
                }
                events.extend(self.navigate(screen));
                events
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn navigate(&mut self, screen: ScreenKind) -> Vec<AppEvent> {
        self.active_screen = screen;
        vec![
            AppEvent::ScreenChanged(screen),
            self.set_status(screen.label()),
        ]
    }

    fn rotate_screen(&mut self, delta: isize) -> Vec<AppEvent> {
        let screens = ScreenKind::ALL;
        let current = screen_position(self.active_screen) as isize;
        let len = screens.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_screen = screens[next];
        vec![AppEvent::ScreenChanged(self.active_screen)]
    }

    fn move_cursor(&mut self, delta: isize) -> Vec<AppEvent> {
        let last = ScreenKind::ALL.len().saturating_sub(1) as isize;
        self.menu_cursor = (self.menu_cursor as isize + delta).clamp(0, last) as usize;
        vec![AppEvent::MenuCursorMoved(self.menu_cursor)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

fn screen_position(screen: ScreenKind) -> usize {
    ScreenKind::ALL
        .iter()
        .position(|candidate| *candidate == screen)
        .unwrap_or(0)
}
