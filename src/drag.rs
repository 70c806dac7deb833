//! Pointer drag gestures over board cards.
//!
//! A press on a card arms a gesture; it becomes active only once the
//! pointer has moved more than the activation distance from the press
//! point, so a plain click never turns into a drag. While active, the
//! column nearest the dragged card (closest corners) is the candidate
//! target. Releasing over a candidate yields a [`DropCommand`] when the
//! transition check passes; everything else ends the gesture silently.

use ratatui::layout::Rect;

use crate::core::UserId;
use crate::transition::{check_transition, is_authorized, Transitionable};
use crate::tlog_debug;

pub const DEFAULT_ACTIVATION_DISTANCE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<(u16, u16)> for Point {
    fn from((x, y): (u16, u16)) -> Self {
        Self::new(x as f32, y as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropRegion<S> {
    pub status: S,
    pub rect: Rect,
}

fn corners(rect: Rect) -> [Point; 4] {
    let (x, y) = (rect.x as f32, rect.y as f32);
    let (r, b) = (x + rect.width as f32, y + rect.height as f32);
    [
        Point::new(x, y),
        Point::new(r, y),
        Point::new(x, b),
        Point::new(r, b),
    ]
}

/// Region whose corners are, on average, nearest the corners of `card`.
/// Ties go to the earlier region.
pub fn closest_corners<S: Copy>(card: Rect, regions: &[DropRegion<S>]) -> Option<S> {
    let card_corners = corners(card);
    let mut best: Option<(f32, S)> = None;
    for region in regions {
        let mean = corners(region.rect)
            .iter()
            .zip(card_corners.iter())
            .map(|(a, b)| a.distance(*b))
            .sum::<f32>()
            / 4.0;
        match best {
            Some((d, _)) if d <= mean => {}
            _ => best = Some((mean, region.status)),
        }
    }
    best.map(|(_, status)| status)
}

/// A gesture in progress.
#[derive(Debug, Clone)]
pub struct Gesture<T: Transitionable> {
    /// The entity as it was when pressed; drawn while dragging.
    pub snapshot: T,
    pub origin: Point,
    pub pointer: Point,
    /// Card rect at press time.
    pub card: Rect,
    pub active: bool,
    pub over: Option<T::Status>,
}

impl<T: Transitionable> Gesture<T> {
    /// Card rect moved along with the pointer.
    pub fn dragged_rect(&self) -> Rect {
        let dx = (self.pointer.x - self.origin.x).round() as i32;
        let dy = (self.pointer.y - self.origin.y).round() as i32;
        Rect {
            x: (self.card.x as i32 + dx).max(0) as u16,
            y: (self.card.y as i32 + dy).max(0) as u16,
            ..self.card
        }
    }
}

/// Emitted on a successful drop.
#[derive(Debug, Clone, PartialEq)]
pub struct DropCommand<T: Transitionable> {
    pub entity: T,
    pub target: T::Status,
}

#[derive(Debug, Clone)]
pub struct DragEngine<T: Transitionable> {
    activation_distance: f32,
    gesture: Option<Gesture<T>>,
}

impl<T: Transitionable + Clone> DragEngine<T> {
    pub fn new(activation_distance: f32) -> Self {
        Self {
            activation_distance,
            gesture: None,
        }
    }

    pub fn gesture(&self) -> Option<&Gesture<T>> {
        self.gesture.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.gesture.as_ref().is_some_and(|g| g.active)
    }

    /// Arm a gesture on `entity`. Returns false (and arms nothing) when the
    /// principal may not move it.
    pub fn press(&mut self, entity: &T, card: Rect, at: Point, principal: UserId) -> bool {
        if !is_authorized(entity, principal) {
            self.gesture = None;
            return false;
        }
        self.gesture = Some(Gesture {
            snapshot: entity.clone(),
            origin: at,
            pointer: at,
            card,
            active: false,
            over: None,
        });
        true
    }

    /// Track the pointer. Returns true when the visible drag state changed.
    pub fn motion(&mut self, at: Point, regions: &[DropRegion<T::Status>]) -> bool {
        let activation_distance = self.activation_distance;
        let Some(gesture) = self.gesture.as_mut() else {
            return false;
        };
        gesture.pointer = at;
        if !gesture.active {
            if gesture.origin.distance(at) <= activation_distance {
                return false;
            }
            gesture.active = true;
            tlog_debug!("drag activated at ({}, {})", at.x, at.y);
        }
        gesture.over = closest_corners(gesture.dragged_rect(), regions);
        true
    }

    /// End the gesture. Yields a command only for an active gesture whose
    /// candidate passes the transition check against the snapshot.
    pub fn release(
        &mut self,
        at: Point,
        regions: &[DropRegion<T::Status>],
        principal: UserId,
    ) -> Option<DropCommand<T>> {
        self.motion(at, regions);
        let gesture = self.gesture.take()?;
        if !gesture.active {
            return None;
        }
        let target = gesture.over?;
        if let Err(e) = check_transition(&gesture.snapshot, principal, target) {
            tlog_debug!("drop ignored: {}", e);
            return None;
        }
        Some(DropCommand {
            entity: gesture.snapshot,
            target,
        })
    }

    /// Abandon the gesture. Returns true if one was in progress.
    pub fn cancel(&mut self) -> bool {
        self.gesture.take().is_some()
    }
}
