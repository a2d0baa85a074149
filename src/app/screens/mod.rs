//! TUI screen components
//!
//! Contains individual screen implementations for different application states.

pub mod disk;
pub mod memory;
pub mod start;

pub use disk::{DiskFocus, DiskScreen};
pub use memory::MemoryScreen;
pub use start::{MenuItem, StartScreen};

/// Flatten a rendered buffer into text, one line per row
#[cfg(test)]
pub(crate) fn buffer_text(buffer: &ratatui::buffer::Buffer) -> String {
    let width = usize::from(buffer.area.width).max(1);
    buffer
        .content
        .chunks(width)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
