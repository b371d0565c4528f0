//! Positions the statement's text, rules and boxes on a fixed-width sheet.
//!
//! Coordinates are layout units with the origin at the top left. Text is
//! set in an 8x8 bitmap font, so a run at size `n` is `8 * n` units tall
//! and every character is `8 * n` units wide.

use crate::domain::{BalanceDirection, TransactionKind};

use super::document::{Statement, StatementBody};

pub type Color = [u8; 3];

pub const SHEET_WIDTH: u32 = 840;
pub const PADDING: u32 = 20;
pub const GLYPH: u32 = 8;

const CONTENT_WIDTH: u32 = SHEET_WIDTH - 2 * PADDING;
const SECTION_GAP: u32 = 30;
const CELL_PADDING: u32 = 8;
const CARD_GAP: u32 = 20;
const CARD_PADDING: u32 = 15;

/// Column widths of the transaction table: date, type, amount, description.
const COLUMNS: [u32; 4] = [130, 90, 200, 380];

pub const WHITE: Color = [0xff, 0xff, 0xff];
pub const INK: Color = [0x33, 0x33, 0x33];
pub const MUTED: Color = [0x66, 0x66, 0x66];
pub const RULE: Color = [0xdd, 0xdd, 0xdd];
pub const PANEL: Color = [0xf8, 0xf9, 0xfa];
pub const CREDIT: Color = [0x28, 0xa7, 0x45];
pub const DEBIT: Color = [0x00, 0x7b, 0xff];
pub const NEGATIVE: Color = [0xdc, 0x35, 0x45];
const BLACK: Color = [0x00, 0x00, 0x00];

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: u32,
        y: u32,
        size: u32,
        color: Color,
        text: String,
    },
    Rect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: Color,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub elements: Vec<Element>,
}

impl Layout {
    /// All text runs in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            Element::Rect { .. } => None,
        })
    }
}

pub fn kind_color(kind: TransactionKind) -> Color {
    match kind {
        TransactionKind::Credit => CREDIT,
        TransactionKind::Debit => DEBIT,
    }
}

fn line_height(size: u32) -> u32 {
    (GLYPH + 4) * size
}

fn text_width(text: &str, size: u32) -> u32 {
    text.chars().count() as u32 * GLYPH * size
}

/// Greedy word wrap to at most `max_chars` per line.
/// Words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() {
            word.len()
        } else {
            current.chars().count() + 1 + word.len()
        };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

struct Builder {
    elements: Vec<Element>,
    y: u32,
}

impl Builder {
    fn rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        self.elements.push(Element::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn text(&mut self, x: u32, y: u32, size: u32, color: Color, text: impl Into<String>) {
        self.elements.push(Element::Text {
            x,
            y,
            size,
            color,
            text: text.into(),
        });
    }

    /// Wrapped text centered within `[left, left + width)`, starting at `y`.
    /// Returns the height used.
    fn centered(
        &mut self,
        left: u32,
        y: u32,
        width: u32,
        size: u32,
        color: Color,
        text: &str,
    ) -> u32 {
        let max_chars = (width / (GLYPH * size)) as usize;
        let lines = wrap_text(text, max_chars);
        for (i, line) in lines.iter().enumerate() {
            let x = left + width.saturating_sub(text_width(line, size)) / 2;
            self.text(x, y + i as u32 * line_height(size), size, color, line.as_str());
        }
        lines.len() as u32 * line_height(size)
    }

    /// A section heading with a hairline under it, at the cursor.
    fn heading(&mut self, text: &str) {
        self.text(PADDING, self.y, 2, INK, text);
        self.y += line_height(2) + 6;
        self.rect(PADDING, self.y, CONTENT_WIDTH, 1, RULE);
        self.y += 11;
    }
}

/// Lay out a statement. The sheet grows downwards with the number of
/// transactions; there is no height limit at this stage.
pub fn layout_statement(statement: &Statement) -> Layout {
    let mut b = Builder {
        elements: Vec::new(),
        y: PADDING,
    };

    // Title block
    let used = b.centered(PADDING, b.y, CONTENT_WIDTH, 3, INK, &statement.title);
    b.y += used + 10;
    let used = b.centered(PADDING, b.y, CONTENT_WIDTH, 2, MUTED, &statement.customer_name);
    b.y += used + 20;
    b.rect(PADDING, b.y, CONTENT_WIDTH, 2, INK);
    b.y += 2 + SECTION_GAP;

    // Customer information
    b.heading("Customer Information");
    let max_chars = (CONTENT_WIDTH / (GLYPH * 2)) as usize;
    for line in [
        format!("Customer ID: {}", statement.customer_id),
        format!("Mobile: {}", statement.mobile),
    ] {
        for wrapped in wrap_text(&line, max_chars) {
            b.text(PADDING, b.y, 2, BLACK, wrapped);
            b.y += line_height(2) + 5;
        }
    }
    b.y += SECTION_GAP;

    // Account summary cards
    b.heading("Account Summary");
    b.y += 4;
    let summary = &statement.summary;
    let balance_color = match summary.direction {
        BalanceDirection::YouOwe => NEGATIVE,
        BalanceDirection::OwesYou | BalanceDirection::Settled => CREDIT,
    };
    let cards = [
        ("Total Credit", summary.total_credit.as_str(), CREDIT, None),
        ("Total Debit", summary.total_debit.as_str(), DEBIT, None),
        (
            "Current Balance",
            summary.balance.as_str(),
            balance_color,
            Some(summary.direction.label()),
        ),
    ];
    let card_width = (CONTENT_WIDTH - 2 * CARD_GAP) / 3;
    let inner_width = card_width - 2 * CARD_PADDING;
    let card_top = b.y;

    // Cards share a height, so measure first
    let card_height = cards
        .iter()
        .map(|(_, amount, _, note)| {
            let amount_chars = (inner_width / (GLYPH * 2)) as usize;
            let amount_lines = wrap_text(amount, amount_chars).len() as u32;
            let note_height = note.map_or(0, |_| 5 + line_height(1));
            line_height(1) + 5 + amount_lines * line_height(2) + note_height
        })
        .max()
        .unwrap_or(0)
        + 2 * CARD_PADDING;

    for (i, (label, amount, color, note)) in cards.iter().enumerate() {
        let left = PADDING + i as u32 * (card_width + CARD_GAP);
        b.rect(left, card_top, card_width, card_height, PANEL);

        let mut y = card_top + CARD_PADDING;
        y += b.centered(left + CARD_PADDING, y, inner_width, 1, MUTED, label) + 5;
        y += b.centered(left + CARD_PADDING, y, inner_width, 2, *color, amount);
        if let Some(note) = note {
            b.centered(left + CARD_PADDING, y + 5, inner_width, 1, MUTED, note);
        }
    }
    b.y = card_top + card_height + SECTION_GAP;

    // Transaction history
    b.heading("Transaction History");
    b.y += 4;
    match &statement.body {
        StatementBody::Table(rows) => {
            let header =
                ["Date", "Type", "Amount", "Description"].map(|h| (h.to_string(), BLACK));
            layout_row(&mut b, &header, Some(PANEL));
            for row in rows {
                let color = kind_color(row.kind);
                let cells = [
                    (row.date.clone(), BLACK),
                    (row.kind.to_string(), color),
                    (row.amount.clone(), color),
                    (row.description.clone(), BLACK),
                ];
                layout_row(&mut b, &cells, None);
            }
        }
        StatementBody::Empty(message) => {
            b.y += 40;
            let used = b.centered(PADDING, b.y, CONTENT_WIDTH, 2, MUTED, message);
            b.y += used + 40;
        }
    }
    b.y += SECTION_GAP;

    // Footer
    b.rect(PADDING, b.y, CONTENT_WIDTH, 1, RULE);
    b.y += 20;
    let used = b.centered(PADDING, b.y, CONTENT_WIDTH, 1, MUTED, &statement.footer);
    b.y += used + PADDING;

    Layout {
        width: SHEET_WIDTH,
        height: b.y,
        elements: b.elements,
    }
}

/// One bordered table row; the row is as tall as its tallest wrapped cell.
fn layout_row(b: &mut Builder, cells: &[(String, Color); 4], background: Option<Color>) {
    let wrapped: Vec<Vec<String>> = cells
        .iter()
        .zip(COLUMNS)
        .map(|((text, _), width)| {
            wrap_text(text, ((width - 2 * CELL_PADDING) / GLYPH) as usize)
        })
        .collect();
    let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1) as u32;
    let row_height = lines * line_height(1) + 2 * CELL_PADDING;

    if let Some(color) = background {
        b.rect(PADDING, b.y, CONTENT_WIDTH, row_height, color);
    }

    let mut x = PADDING;
    for (((_, color), width), lines) in cells.iter().zip(COLUMNS).zip(&wrapped) {
        for (i, line) in lines.iter().enumerate() {
            let y = b.y + CELL_PADDING + i as u32 * line_height(1);
            b.text(x + CELL_PADDING, y, 1, *color, line.as_str());
        }
        b.rect(x, b.y, 1, row_height + 1, RULE);
        x += width;
    }

    // Right edge, top and bottom borders
    b.rect(PADDING + CONTENT_WIDTH - 1, b.y, 1, row_height + 1, RULE);
    b.rect(PADDING, b.y, CONTENT_WIDTH, 1, RULE);
    b.rect(PADDING, b.y + row_height, CONTENT_WIDTH, 1, RULE);
    b.y += row_height;
}
