// The canvas state store: single source of truth for one participant's grid.
//
// `CanvasStore` exclusively owns the cell matrix. The synchronization channel
// never touches cells directly — it calls `paint_local` / `apply_remote` /
// `apply_snapshot` and forwards whatever events those produce. All mutation
// happens on the caller's single control thread; there is no internal
// locking.
//
// Origin tagging is the echo-loop guard: `paint_local` returns a
// `Local`-origin event that the channel forwards to the relay exactly once;
// `apply_remote` applies a received event and produces nothing to forward.
//
// Conflict policy is last-write-wins per cell, by arrival order at this
// store. Events carry no version or timestamp; two participants painting the
// same cell concurrently may transiently disagree until one of them rejoins
// and receives a fresh snapshot.

use crate::color::Color;

/// Where a paint event came from. Remote events are never re-forwarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

/// A single cell-color-change notification exchanged between participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaintEvent {
    pub x: usize,
    pub y: usize,
    pub color: Color,
    pub origin: Origin,
}

/// Payload delivered to store observers on every successful cell change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellChange {
    pub x: usize,
    pub y: usize,
    pub color: Color,
}

type ObserverFn = Box<dyn FnMut(&CellChange)>;

/// Owns the grid for one session: paint/color state plus the fixed mask.
pub struct CanvasStore {
    size: usize,
    mask: Vec<Vec<bool>>,
    painted: Vec<Vec<bool>>,
    colors: Vec<Vec<Option<Color>>>,
    observers: Vec<ObserverFn>,
}

impl CanvasStore {
    /// Allocate an all-unpainted grid for the given mask.
    pub fn new(mask: Vec<Vec<bool>>) -> Self {
        let size = mask.len();
        Self {
            size,
            mask,
            painted: vec![vec![false; size]; size],
            colors: vec![vec![None; size]; size],
            observers: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// True if `(x, y)` is inside the grid and inside the egg mask.
    pub fn is_paintable(&self, x: usize, y: usize) -> bool {
        y < self.size && x < self.size && self.mask[y][x]
    }

    pub fn is_painted(&self, x: usize, y: usize) -> bool {
        y < self.size && x < self.size && self.painted[y][x]
    }

    /// Current color of a cell, `None` if unpainted or out of bounds.
    pub fn color(&self, x: usize, y: usize) -> Option<Color> {
        if y < self.size && x < self.size {
            self.colors[y][x]
        } else {
            None
        }
    }

    /// Full color matrix, row-major. Used for snapshots and audio derivation.
    pub fn matrix(&self) -> Vec<Vec<Option<Color>>> {
        self.colors.clone()
    }

    /// Register an observer called once per successful cell change.
    pub fn subscribe(&mut self, observer: ObserverFn) {
        self.observers.push(observer);
    }

    /// Paint a cell locally. Returns the event to forward to the relay, or
    /// `None` for an out-of-bounds or unpaintable target (a handled no-op,
    /// not an error).
    pub fn paint_local(&mut self, x: usize, y: usize, color: Color) -> Option<PaintEvent> {
        if !self.is_paintable(x, y) {
            return None;
        }
        self.painted[y][x] = true;
        self.colors[y][x] = Some(color);
        self.notify(CellChange { x, y, color });
        Some(PaintEvent {
            x,
            y,
            color,
            origin: Origin::Local,
        })
    }

    /// Apply a paint event received from the relay. Returns whether the cell
    /// was writable. Nothing is forwarded or acknowledged.
    pub fn apply_remote(&mut self, x: usize, y: usize, color: Color) -> bool {
        if !self.is_paintable(x, y) {
            return false;
        }
        self.painted[y][x] = true;
        self.colors[y][x] = Some(color);
        self.notify(CellChange { x, y, color });
        true
    }

    /// Apply a full-state snapshot: overwrite every cell whose incoming value
    /// is non-empty, leave the rest untouched. Used once, on connection.
    pub fn apply_snapshot(&mut self, matrix: &[Vec<Option<Color>>]) {
        for y in 0..self.size.min(matrix.len()) {
            for x in 0..self.size.min(matrix[y].len()) {
                if let Some(color) = matrix[y][x] {
                    if self.mask[y][x] {
                        self.painted[y][x] = true;
                        self.colors[y][x] = Some(color);
                        self.notify(CellChange { x, y, color });
                    }
                }
            }
        }
    }

    /// Recolor every paintable cell using a pattern function. `painted`
    /// flags are left as they are.
    pub fn reset_with_pattern<F>(&mut self, pattern: F)
    where
        F: FnOnce(&[Vec<bool>]) -> Vec<Vec<Option<Color>>>,
    {
        let fill = pattern(&self.mask);
        for y in 0..self.size.min(fill.len()) {
            for x in 0..self.size.min(fill[y].len()) {
                if self.mask[y][x] {
                    if let Some(color) = fill[y][x] {
                        self.colors[y][x] = Some(color);
                        self.notify(CellChange { x, y, color });
                    }
                }
            }
        }
    }

    fn notify(&mut self, change: CellChange) {
        for observer in &mut self.observers {
            observer(&change);
        }
    }
}
