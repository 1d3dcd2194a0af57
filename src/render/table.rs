//! Objects table on top of `tabled`
//!
//! Cells may carry ANSI colors and OSC 8 links; `tabled` (feature `ansi`)
//! measures their display width without the escape sequences.

use tabled::builder::Builder;
use tabled::settings::object::{Columns, Rows};
use tabled::settings::{Alignment, Modify, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

pub struct Table {
    builder: Builder,
    aligns: Vec<Align>,
}

impl Table {
    /// Headers may already be styled.
    pub fn new(columns: &[(String, Align)]) -> Self {
        let mut builder = Builder::default();
        builder.push_record(columns.iter().map(|(header, _)| header.clone()));
        Self {
            builder,
            aligns: columns.iter().map(|(_, align)| *align).collect(),
        }
    }

    /// Append a row; missing cells are left blank.
    pub fn push(&mut self, mut cells: Vec<String>) {
        cells.resize(self.aligns.len(), String::new());
        self.builder.push_record(cells);
    }

    /// A row holding only `text`, in column `column`.
    pub fn push_note(&mut self, column: usize, text: String) {
        let mut cells = vec![String::new(); self.aligns.len()];
        if let Some(cell) = cells.get_mut(column) {
            *cell = text;
        }
        self.push(cells);
    }

    pub fn render(self) -> String {
        let mut table = self.builder.build();
        table.with(Style::rounded());
        for (index, align) in self.aligns.iter().enumerate() {
            let alignment = match align {
                Align::Left => Alignment::left(),
                Align::Center => Alignment::center(),
            };
            table.with(Modify::new(Columns::single(index)).with(alignment));
        }
        table.with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }
}
