// SPDX-License-Identifier: GPL-3.0-only

//! Terminal presentation surface
//!
//! Renders the session preview with Unicode half-block characters (two
//! vertical pixels per cell), a control bar, a status bar and modal alerts.

use crate::app::{Alert, Controls, PresentationSurface, SurfaceAction};
use crate::backends::camera::CameraFrame;
use crate::constants::timing;
use crate::session::{self, CaptureSessionController, PreviewLayer, source_point};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use std::io::{self, stdout};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// How long quitting waits for an in-flight recording to be saved
const SHUTDOWN_SAVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Key press decoded for the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Surface(SurfaceAction),
    Quit,
}

/// Map a key press to an action. Enter dismisses an open alert instead of capturing.
pub fn map_key(key: KeyEvent, alert_open: bool) -> Option<KeyAction> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(KeyAction::Quit);
    }

    let action = match key.code {
        KeyCode::Enter | KeyCode::Esc if alert_open => SurfaceAction::DismissAlert,
        KeyCode::Char(' ') | KeyCode::Enter => SurfaceAction::Capture,
        KeyCode::Char('s') => SurfaceAction::SwitchCamera,
        KeyCode::Char('m') => SurfaceAction::ToggleMode,
        KeyCode::Char('g') => SurfaceAction::CycleGravity,
        KeyCode::Char('f') => SurfaceAction::ToggleMirror,
        KeyCode::Char('q') => return Some(KeyAction::Quit),
        _ => return None,
    };
    Some(KeyAction::Surface(action))
}

/// Run the terminal surface until the user quits
pub fn run(
    mut surface: PresentationSurface,
    runtime: Handle,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut surface);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Never drop an in-flight recording on the floor
    let controller = surface.coordinator().controller().clone();
    let mut events = controller.subscribe();
    let recording = controller.recording_path();
    if let Some(stopped) = surface.shutdown()
        && let Some(recording) = recording
    {
        println!("Finishing recording...");
        let outcome = runtime.block_on(async {
            let _ = stopped.await;
            tokio::time::timeout(
                SHUTDOWN_SAVE_TIMEOUT,
                session::next_recording_outcome(&mut events, &recording),
            )
            .await
            .ok()
            .flatten()
        });
        match outcome {
            Some(event) => info!(?event, "Recording finalized on exit"),
            None => warn!("Recording was not saved before exit"),
        }
    }
    controller.stop_session();

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    surface: &mut PresentationSurface,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut frame_widget = FrameWidget::new();

    loop {
        surface.process_events();
        if let Some(frame) = surface.preview_mut().latest_frame_if_new() {
            frame_widget.update_frame(frame);
        }

        let controls = surface.controls();
        let alert = surface.alert();
        let status = status_line(surface);
        let preview = surface.preview().clone();

        terminal.draw(|f| {
            let area = f.area();
            let preview_area = Rect {
                height: area.height.saturating_sub(2),
                ..area
            };
            let controls_area = Rect {
                y: area.y + area.height.saturating_sub(2),
                height: area.height.min(1),
                ..area
            };
            let status_area = Rect {
                y: area.y + area.height.saturating_sub(1),
                height: area.height.min(1),
                ..area
            };

            f.render_widget(
                PreviewWidget {
                    frame: &frame_widget,
                    layer: &preview,
                },
                preview_area,
            );
            f.render_widget(ControlBar { controls: &controls }, controls_area);
            f.render_widget(StatusBar { message: &status }, status_area);

            if let Some(alert) = alert {
                let popup = centered_rect(area, 44, 5);
                f.render_widget(Clear, popup);
                f.render_widget(alert_widget(alert), popup);
            }
        })?;

        if event::poll(timing::UI_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match map_key(key, surface.alert().is_some()) {
                Some(KeyAction::Quit) => break,
                Some(KeyAction::Surface(action)) => surface.handle(action),
                None => {}
            }
        }
    }

    Ok(())
}

fn status_line(surface: &PresentationSurface) -> String {
    let controller: &CaptureSessionController = surface.coordinator().controller();
    let camera = controller
        .current_position()
        .map(|p| p.display_name())
        .unwrap_or("No camera");

    let mut line = match surface.status() {
        Some(status) => status.to_string(),
        None => "space: capture | s: switch | m: mode | g: fit | f: mirror | q: quit".to_string(),
    };
    line.push_str(&format!(" | {}", camera));
    if let Some(elapsed) = controller.recording_elapsed() {
        let secs = elapsed.as_secs();
        line.push_str(&format!(" | REC {:02}:{:02}", secs / 60, secs % 60));
    }
    line
}

/// Latest preview frame
struct FrameWidget {
    frame: Option<CameraFrame>,
}

impl FrameWidget {
    fn new() -> Self {
        Self { frame: None }
    }

    fn update_frame(&mut self, frame: CameraFrame) {
        self.frame = Some(frame);
    }
}

struct PreviewWidget<'a> {
    frame: &'a FrameWidget,
    layer: &'a PreviewLayer,
}

impl Widget for PreviewWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = &self.frame.frame else {
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Each cell shows two stacked pixels: upper half as fg, lower as bg
        let surface = (area.width as u32, area.height as u32 * 2);
        let size = (frame.width, frame.height);
        let gravity = self.layer.gravity();
        let mirrored = self.layer.is_mirrored();

        for ty in 0..area.height {
            for tx in 0..area.width {
                let top = source_point(gravity, mirrored, size, surface, tx as u32, ty as u32 * 2);
                let bottom =
                    source_point(gravity, mirrored, size, surface, tx as u32, ty as u32 * 2 + 1);
                if top.is_none() && bottom.is_none() {
                    continue;
                }

                let color = |point: Option<(u32, u32)>| match point {
                    Some((x, y)) => {
                        let (r, g, b) = frame.rgb_at(x, y);
                        Color::Rgb(r, g, b)
                    }
                    None => Color::Reset,
                };

                if let Some(cell) = buf.cell_mut((area.x + tx, area.y + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(color(top));
                    cell.set_bg(color(bottom));
                }
            }
        }
    }
}

struct ControlBar<'a> {
    controls: &'a Controls,
}

impl Widget for ControlBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut items = vec![format!("[{}] capture", self.controls.capture_icon.glyph())];
        if self.controls.show_switch_camera {
            items.push("[s] switch camera".to_string());
        }
        if self.controls.show_mode_toggle {
            items.push(format!("[m] {}", self.controls.mode.label()));
        }
        let text = items.join("   ");

        let x = area.x + area.width.saturating_sub(text.chars().count() as u16) / 2;
        let style = Style::default().add_modifier(Modifier::BOLD);
        buf.set_stringn(x, area.y, &text, area.width as usize, style);
    }
}

struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_style(style);
            }
        }
        buf.set_stringn(area.x, area.y, self.message, area.width as usize, style);
    }
}

fn alert_widget(alert: Alert) -> Paragraph<'static> {
    let color = if alert.is_error() {
        Color::Red
    } else {
        Color::Green
    };
    Paragraph::new(format!("{}\n\n[Enter] OK", alert.message))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(alert.title)
                .border_style(Style::default().fg(color)),
        )
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
