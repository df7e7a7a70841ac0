//! Draw commands accepted by the renderer.
//!
//! Commands borrow caller-owned cell/text data for the duration of one
//! submit call; nothing is retained across frames.

use bitflags::bitflags;

bitflags! {
    /// Per-cell text attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u32 {
        const BOLD          = 1 << 0;
        const ITALIC        = 1 << 1;
        const UNDERLINE     = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
        const BLINK         = 1 << 4;
        const INVERSE       = 1 << 5;
        const INVISIBLE     = 1 << 6;
        const DIM           = 1 << 7;
    }
}

/// Integer pixel rectangle in window coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One grid cell: a codepoint plus packed 0xRRGGBBAA colors and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub codepoint: char,
    pub fg: u32,
    pub bg: u32,
    pub flags: CellFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
}

/// The closed set of draw commands. Cell and text payloads are borrowed
/// from the caller for one submit call only.
#[derive(Debug, Clone, Copy)]
pub enum RenderCommand<'a> {
    /// Fill a region with a flat color.
    Clear { region: Rect, color: u32 },
    /// Filled rectangle, or a border outline when `border_width > 0`.
    Rect {
        region: Rect,
        color: u32,
        border_width: i32,
    },
    /// A row-major grid of cells starting at a pixel origin.
    TextGrid {
        x: i32,
        y: i32,
        cells: &'a [Cell],
        columns: usize,
        rows: usize,
    },
    /// A shaped text run; `y` is the baseline.
    TextLine {
        x: i32,
        y: i32,
        text: &'a str,
        fg: u32,
        flags: CellFlags,
    },
    /// Cursor at a cell coordinate, sized from the current font metrics.
    Cursor {
        column: i32,
        row: i32,
        color: u32,
        shape: CursorShape,
        visible: bool,
    },
}
