//! Board geometry shared by the renderer and pointer hit-testing.
//!
//! Both sides call the same pure functions with the same terminal area, so a
//! card is hit exactly where it was drawn.

use ratatui::layout::{Constraint, Layout, Margin, Rect};

use crate::core::{Lifecycle, Project, ProjectId, Task, TaskId, UserId};
use crate::drag::DropRegion;
use crate::transition::{is_authorized, Transitionable};

/// Rows taken by one card, borders included.
pub const CARD_HEIGHT: u16 = 4;

/// Something drawn as a card on a status board.
pub trait Card: Transitionable + Clone {
    type Key: Copy + Eq + std::fmt::Debug;

    fn key(&self) -> Self::Key;
    fn title(&self) -> &str;
}

impl Card for Project {
    type Key = ProjectId;

    fn key(&self) -> ProjectId {
        self.id
    }

    fn title(&self) -> &str {
        &self.name
    }
}

impl Card for Task {
    type Key = TaskId;

    fn key(&self) -> TaskId {
        self.id
    }

    fn title(&self) -> &str {
        &self.name
    }
}

/// Fixed screen regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenAreas {
    pub header: Rect,
    pub body: Rect,
    pub notification: Rect,
    pub status: Rect,
}

pub fn screen(area: Rect) -> ScreenAreas {
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(area);
    ScreenAreas {
        header: chunks[0],
        body: chunks[1],
        notification: chunks[2],
        status: chunks[3],
    }
}

/// Group `entities` into columns in lifecycle order.
///
/// Within a column, cards the principal created or is assigned to come
/// first; otherwise the cached order is kept.
pub fn columns<'a, E: Card>(entities: &[&'a E], principal: UserId) -> Vec<Vec<&'a E>> {
    <E::Status as Lifecycle>::ORDER
        .iter()
        .map(|status| {
            let (mut mine, others): (Vec<&E>, Vec<&E>) = entities
                .iter()
                .copied()
                .filter(|e| e.status() == *status)
                .partition(|e| is_authorized(*e, principal));
            mine.extend(others);
            mine
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSlot<K> {
    pub key: K,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout<S, K> {
    pub status: S,
    pub rect: Rect,
    /// Visible cards only.
    pub cards: Vec<CardSlot<K>>,
    /// Index of the first visible card.
    pub offset: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardLayout<S, K> {
    pub columns: Vec<ColumnLayout<S, K>>,
}

/// Lay out a board in `area`, scrolling each column so `selected` is visible.
pub fn layout<E: Card>(
    area: Rect,
    entities: &[&E],
    principal: UserId,
    selected: Option<E::Key>,
) -> BoardLayout<E::Status, E::Key> {
    let order = <E::Status as Lifecycle>::ORDER;
    let rects = Layout::horizontal(vec![Constraint::Ratio(1, order.len() as u32); order.len()])
        .split(area);

    let laid_out = columns(entities, principal)
        .into_iter()
        .zip(order.iter().copied())
        .zip(rects.iter().copied())
        .map(|((cards, status), rect)| {
            let inner_height = rect.height.saturating_sub(2);
            let visible = (inner_height / CARD_HEIGHT) as usize;
            let selected_row = selected.and_then(|k| cards.iter().position(|c| c.key() == k));
            let offset = match selected_row {
                Some(row) if visible > 0 && row >= visible => row + 1 - visible,
                _ => 0,
            };
            let slots = cards
                .iter()
                .skip(offset)
                .take(visible)
                .enumerate()
                .map(|(i, card)| CardSlot {
                    key: card.key(),
                    rect: Rect {
                        x: rect.x + 1,
                        y: rect.y + 1 + i as u16 * CARD_HEIGHT,
                        width: rect.width.saturating_sub(2),
                        height: CARD_HEIGHT,
                    },
                })
                .collect();
            ColumnLayout {
                status,
                rect,
                cards: slots,
                offset,
                total: cards.len(),
            }
        })
        .collect();

    BoardLayout { columns: laid_out }
}

impl<S: Copy, K: Copy + Eq> BoardLayout<S, K> {
    pub fn card_at(&self, x: u16, y: u16) -> Option<&CardSlot<K>> {
        self.columns
            .iter()
            .flat_map(|c| c.cards.iter())
            .find(|slot| contains(slot.rect, x, y))
    }

    pub fn column_at(&self, x: u16, y: u16) -> Option<usize> {
        self.columns.iter().position(|c| contains(c.rect, x, y))
    }

    /// Every column is a drop region.
    pub fn regions(&self) -> Vec<DropRegion<S>> {
        self.columns
            .iter()
            .map(|c| DropRegion {
                status: c.status,
                rect: c.rect,
            })
            .collect()
    }
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Rows of the organization list: the body inside its border.
pub fn list_area(body: Rect) -> Rect {
    body.inner(Margin::new(1, 1))
}

/// First visible row so that `selected` fits in `height` rows.
pub fn list_offset(selected: usize, height: u16) -> usize {
    let visible = height as usize;
    if visible > 0 && selected >= visible {
        selected + 1 - visible
    } else {
        0
    }
}

/// Index of the list row under (x, y).
pub fn list_row_at(area: Rect, offset: usize, len: usize, x: u16, y: u16) -> Option<usize> {
    if !contains(area, x, y) {
        return None;
    }
    let row = offset + (y - area.y) as usize;
    (row < len).then_some(row)
}
