//! Terminal UI rendering for taskman.
//!
//! Layout: one header line, the body (organization list or a three-column
//! board), one notification line, one status line. Board geometry comes
//! from [`crate::board`], the same code the update function hit-tests
//! against, so a card is clicked exactly where it is drawn.
//!
//! This module renders from RenderState (immutable snapshot) - it never
//! mutates application state.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Clear, Paragraph},
    Frame,
};

use crate::board::{self, Card};
use crate::core::{Lifecycle, Project, Task, User};
use crate::render::{DragView, RenderState};
use crate::tea::{Form, InputKind, Mode, Notification, NotificationLevel, Screen};
use crate::transition::is_authorized;

// Color tokens (selection uses REVERSED modifier to adapt to terminal theme)
const COLOR_TEXT_DIMMED: Color = Color::Gray;
const COLOR_TEXT_MUTED: Color = Color::DarkGray;
const COLOR_ACCENT: Color = Color::Cyan;
const COLOR_BANNER: Color = Color::Red;

// -----------------------------------------------------------------------------
// Context-sensitive keymap system
// -----------------------------------------------------------------------------

/// Context for determining which keybindings to display.
/// Derived from RenderState - this is the "view model" for the statusbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeymapContext {
    Organizations,
    /// A project or task board
    Board {
        screen: Screen,
        step_back: Option<&'static str>,
        step_forward: Option<&'static str>,
        dragging: bool,
    },
    /// Text input mode (any form)
    TextInput { multi_field: bool },
}

impl KeymapContext {
    /// Derive keymap context from render state.
    pub fn from_render_state(state: &RenderState) -> Self {
        match state.mode {
            Mode::Input(form, kind) => KeymapContext::TextInput {
                multi_field: kind.next(form).is_some(),
            },
            Mode::List => match state.screen {
                Screen::Organizations => KeymapContext::Organizations,
                screen => KeymapContext::Board {
                    screen,
                    step_back: state.step_back,
                    step_forward: state.step_forward,
                    dragging: state.drag.is_some(),
                },
            },
        }
    }
}

/// A single keybinding entry for display.
struct Keybinding(&'static str, String);

fn kb(key: &'static str, desc: &str) -> Keybinding {
    Keybinding(key, desc.to_string())
}

/// A group of related keybindings (separated by │).
struct KeybindingGroup(Vec<Keybinding>);

/// Get keybindings for a given context.
fn keybindings_for_context(ctx: KeymapContext) -> Vec<KeybindingGroup> {
    match ctx {
        KeymapContext::Organizations => vec![
            KeybindingGroup(vec![
                kb("Enter", "open"),
                kb("n", "new"),
                kb("i", "join"),
            ]),
            KeybindingGroup(vec![kb("r", "reload"), kb("x", "dismiss errors")]),
            KeybindingGroup(vec![kb("q", "quit")]),
        ],
        KeymapContext::Board { dragging: true, .. } => vec![KeybindingGroup(vec![
            kb("release", "drop"),
            kb("Esc", "cancel"),
        ])],
        KeymapContext::Board {
            screen,
            step_back,
            step_forward,
            ..
        } => {
            let mut actions = Vec::new();
            if screen == Screen::Projects {
                actions.push(kb("Enter", "tasks"));
            } else {
                actions.push(kb("Space", "mark"));
            }
            actions.push(kb("n", "new"));

            let mut moves = Vec::new();
            if let Some(label) = step_back {
                moves.push(Keybinding("[", format!("← {}", label)));
            }
            if let Some(label) = step_forward {
                moves.push(Keybinding("]", format!("→ {}", label)));
            }
            moves.push(kb("1-3", "move to"));

            vec![
                KeybindingGroup(actions),
                KeybindingGroup(moves),
                KeybindingGroup(vec![
                    kb("Esc", "back"),
                    kb("r", "reload"),
                    kb("x", "dismiss errors"),
                ]),
                KeybindingGroup(vec![kb("q", "quit")]),
            ]
        }
        KeymapContext::TextInput { .. } => vec![KeybindingGroup(vec![
            kb("Enter", "submit"),
            kb("Esc", "cancel"),
        ])],
    }
}

/// Main render function - entry point for all UI drawing.
/// Takes an immutable RenderState snapshot.
pub fn draw(frame: &mut Frame, state: &RenderState) {
    let areas = board::screen(frame.area());

    render_header(frame, state, areas.header);
    match state.screen {
        Screen::Organizations => render_org_list(frame, state, areas.body),
        Screen::Projects => render_board(
            frame,
            areas.body,
            &state.projects,
            state,
            state.selected_project,
            |_| false,
        ),
        Screen::Tasks => render_board(
            frame,
            areas.body,
            &state.tasks,
            state,
            state.selected_task,
            |t| state.marked.contains(&t.id),
        ),
    }
    if let Some(drag) = &state.drag {
        render_drag(frame, drag, areas.body);
    }
    if let Some(notification) = &state.notification {
        render_notification(frame, notification, areas.notification);
    }
    render_statusbar(frame, state, areas.status);
}

/// Breadcrumb: who, which organization, which project.
fn render_header(frame: &mut Frame, state: &RenderState, area: Rect) {
    let muted = Style::default().fg(COLOR_TEXT_MUTED);
    let mut spans = vec![
        Span::styled("taskman", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(" │ ", muted),
        Span::styled(state.principal_name.clone(), Style::default().fg(COLOR_TEXT_DIMMED)),
    ];

    if let Some(org) = &state.org {
        spans.push(Span::styled(" │ ", muted));
        spans.push(Span::raw(org.name.clone()));
        spans.push(Span::styled(format!(" ({})", org.invite_code), muted));
        if let Some(members) = &org.members {
            spans.push(Span::styled(format!(" · {}", members.join(", ")), muted));
        }
    }
    if let Some(project) = &state.project_name {
        spans.push(Span::styled(" │ ", muted));
        spans.push(Span::raw(project.clone()));
    }
    if state.loading {
        spans.push(Span::styled("  loading…", Style::default().fg(COLOR_ACCENT)));
    } else if state.in_flight > 0 {
        spans.push(Span::styled(format!("  syncing {}", state.in_flight), muted));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_org_list(frame: &mut Frame, state: &RenderState, body: Rect) {
    frame.render_widget(Block::bordered().title(" Organizations "), body);
    let area = board::list_area(body);

    // The list is cleared on a failed load, so the banner stands alone.
    if let Some(error) = &state.org_load_error {
        let lines = vec![
            Line::from(Span::styled(
                truncate(error, area.width as usize),
                Style::default().fg(COLOR_BANNER).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Press 'r' to retry.",
                Style::default().fg(COLOR_TEXT_DIMMED),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), area);
        return;
    }

    if state.organizations.is_empty() {
        let msg = if state.loading {
            "Loading organizations…"
        } else {
            "No organizations. Press 'n' to create one or 'i' to join with a code."
        };
        frame.render_widget(
            Paragraph::new(Span::styled(msg, Style::default().fg(COLOR_TEXT_DIMMED))),
            area,
        );
        return;
    }

    let offset = board::list_offset(state.org_cursor, area.height);
    let lines: Vec<Line> = state
        .organizations
        .iter()
        .enumerate()
        .skip(offset)
        .take(area.height as usize)
        .map(|(idx, org)| {
            let text = format!("{:<8}  {}", org.invite_code, org.name);
            let style = if idx == state.org_cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Line::from(Span::styled(
                format!("{:<width$}", truncate(&text, area.width as usize), width = area.width as usize),
                style,
            ))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

/// Extra fields shown on a card.
trait CardDetails: Card {
    fn assignees(&self) -> &[User];
    fn deadline(&self) -> Option<DateTime<Utc>>;
}

impl CardDetails for Project {
    fn assignees(&self) -> &[User] {
        &self.assignees
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }
}

impl CardDetails for Task {
    fn assignees(&self) -> &[User] {
        &self.assignees
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }
}

fn render_board<E: CardDetails>(
    frame: &mut Frame,
    area: Rect,
    entities: &[E],
    state: &RenderState,
    selected: Option<E::Key>,
    is_marked: impl Fn(&E) -> bool,
) {
    let refs: Vec<&E> = entities.iter().collect();
    let layout = board::layout(area, &refs, state.principal, selected);
    let hovered = state.drag.as_ref().and_then(|d| d.over);

    for (idx, column) in layout.columns.iter().enumerate() {
        let border_style = if hovered == Some(idx) {
            Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_MUTED)
        };
        let mut title = format!(" {} {} ", column.status.label(), column.total);
        if column.offset > 0 {
            title.push_str("↑ ");
        }
        if column.offset + column.cards.len() < column.total {
            title.push_str("↓ ");
        }
        frame.render_widget(
            Block::bordered().title(title).border_style(border_style),
            column.rect,
        );

        for slot in &column.cards {
            let Some(entity) = entities.iter().find(|e| e.key() == slot.key) else {
                continue;
            };
            let movable = is_authorized(entity, state.principal);
            let style = if Some(slot.key) == selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else if movable {
                Style::default()
            } else {
                Style::default().fg(COLOR_TEXT_MUTED)
            };
            let lines = card_lines(entity, is_marked(entity), slot.rect.width.saturating_sub(2));
            frame.render_widget(
                Paragraph::new(lines).style(style).block(Block::bordered().border_style(style)),
                slot.rect,
            );
        }
    }

    if entities.is_empty() && !state.loading {
        if let Some(first) = layout.columns.first() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "Nothing here yet. 'n' adds one.",
                    Style::default().fg(COLOR_TEXT_DIMMED),
                )),
                board::list_area(first.rect),
            );
        }
    }
}

/// Two content rows: title (with mark), then assignees and deadline.
fn card_lines<E: CardDetails>(entity: &E, marked: bool, width: u16) -> Vec<Line<'static>> {
    let width = width as usize;
    let mark = if marked { "● " } else { "" };
    let title = format!("{}{}", mark, entity.title());

    let people: Vec<&str> = entity.assignees().iter().map(User::short_name).collect();
    let mut detail = if people.is_empty() {
        "unassigned".to_string()
    } else {
        people.join(", ")
    };
    if let Some(deadline) = entity.deadline() {
        detail = format!("{} · due {}", detail, deadline.format("%Y-%m-%d"));
    }

    vec![
        Line::from(Span::styled(
            truncate(&title, width),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            truncate(&detail, width),
            Style::default().fg(COLOR_TEXT_DIMMED),
        )),
    ]
}

/// The dragged card follows the pointer, drawn over the columns.
fn render_drag(frame: &mut Frame, drag: &DragView, body: Rect) {
    let rect = drag.rect.intersection(body);
    if rect.is_empty() {
        return;
    }
    frame.render_widget(Clear, rect);
    let style = Style::default().fg(COLOR_ACCENT);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            truncate(&drag.title, rect.width.saturating_sub(2) as usize),
            style.add_modifier(Modifier::BOLD),
        )))
        .block(
            Block::bordered()
                .border_type(BorderType::Thick)
                .border_style(style),
        ),
        rect,
    );
}

/// Render the status bar - single bottom line with conditional display.
/// Shows either:
/// - Input prompt (when in Input mode - no '?' shown)
/// - "?" indicator only (when keymap is collapsed)
/// - "? │ <full keymap>" (when keymap is expanded via '?' toggle)
///
/// On a board, the stepper for the selected card sits on the right.
fn render_statusbar(frame: &mut Frame, state: &RenderState, area: Rect) {
    let line = match state.mode {
        Mode::Input(form, kind) => render_input_line(state, form, kind),
        Mode::List => render_keymap_line(state, area.width),
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Render keybindings legend for the bottom line.
/// When show_keymap is false: Shows just "?" (grayed out)
/// When show_keymap is true: Shows "? │ <full keymap legend>" with bright "?"
fn render_keymap_line(state: &RenderState, width: u16) -> Line<'static> {
    let ctx = KeymapContext::from_render_state(state);
    let groups = keybindings_for_context(ctx);

    let key_style = Style::default().fg(COLOR_TEXT_DIMMED);
    let desc_style = Style::default().fg(COLOR_TEXT_MUTED);
    let sep_style = Style::default().fg(COLOR_TEXT_MUTED);

    let mut spans: Vec<Span> = Vec::new();

    let help_style = if state.show_keymap {
        Style::default()
    } else {
        Style::default().fg(COLOR_TEXT_MUTED)
    };
    spans.push(Span::styled("?", help_style));

    if state.show_keymap {
        for group in groups {
            if group.0.is_empty() {
                continue;
            }
            spans.push(Span::styled(" │ ", sep_style));
            for (key_idx, keybinding) in group.0.into_iter().enumerate() {
                if key_idx > 0 {
                    spans.push(Span::styled(" • ", sep_style));
                }
                spans.push(Span::styled(keybinding.0, key_style));
                spans.push(Span::styled(format!(" {}", keybinding.1), desc_style));
            }
        }
    }

    if let KeymapContext::Board {
        step_back,
        step_forward,
        dragging: false,
        ..
    } = ctx
    {
        let stepper = stepper_spans(step_back, step_forward);
        let content_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let stepper_width: usize = stepper.iter().map(|s| s.content.chars().count()).sum();
        let spacer_width = (width as usize)
            .saturating_sub(content_width)
            .saturating_sub(stepper_width);
        if spacer_width > 0 {
            spans.push(Span::raw(" ".repeat(spacer_width)));
        }
        spans.extend(stepper);
    }

    Line::from(spans)
}

/// "[ ← Idea  ] → Finished", with a disabled side muted.
fn stepper_spans(back: Option<&'static str>, forward: Option<&'static str>) -> Vec<Span<'static>> {
    let enabled = Style::default().fg(COLOR_ACCENT);
    let disabled = Style::default().fg(COLOR_TEXT_MUTED);
    let side = |key: &str, arrow: &str, target: Option<&'static str>| match target {
        Some(label) => Span::styled(format!("{} {} {}", key, arrow, label), enabled),
        None => Span::styled(format!("{} {}", key, arrow), disabled),
    };
    vec![
        side("[", "←", back),
        Span::raw("  "),
        side("]", "→", forward),
        Span::raw(" "),
    ]
}

/// Render input prompt for the bottom line (replaces keymap when in input mode).
fn render_input_line(state: &RenderState, form: Form, kind: InputKind) -> Line<'static> {
    let hint_style = Style::default().fg(COLOR_TEXT_MUTED);
    let label_style = Style::default().fg(Color::Reset);
    let input_style = Style::default().fg(Color::White);
    let cursor_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::SLOW_BLINK);

    let mut spans = vec![
        Span::styled("Enter ", hint_style),
        Span::styled("• ", hint_style),
    ];
    if kind.next(form).is_some() {
        spans.push(Span::styled("Tab ", hint_style));
        spans.push(Span::styled("• ", hint_style));
    }
    spans.push(Span::styled("Esc  ", hint_style));

    spans.push(Span::styled(format!("{} › ", form.title()), hint_style));
    spans.push(Span::styled(format!("{}: ", kind.label()), label_style));
    spans.push(Span::styled(state.input_buffer.clone(), input_style));
    spans.push(Span::styled("_", cursor_style));

    Line::from(spans)
}

/// Render notification message on its own line above the status bar.
///
/// Displays a single-line notification with appropriate styling based on the notification level:
/// - Error: Red text with "Error:" prefix and bold styling
/// - Info: Green text without prefix
fn render_notification(frame: &mut Frame, notification: &Notification, area: Rect) {
    frame.render_widget(Clear, area);

    let line = match notification.level {
        NotificationLevel::Error => Line::from(vec![
            Span::styled(
                "Error: ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                notification.message.clone(),
                Style::default().fg(Color::Red),
            ),
        ]),
        NotificationLevel::Info => Line::from(Span::styled(
            notification.message.clone(),
            Style::default().fg(Color::Green),
        )),
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 1).collect();
        format!("{}~", truncated)
    }
}
