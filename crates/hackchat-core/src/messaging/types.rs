/// Inline keyboard laid out as rows of buttons.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    /// One button per row.
    pub fn column(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// Lay buttons out left-to-right, `per_row` at a time.
    pub fn grid(buttons: Vec<InlineButton>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let mut rows = Vec::new();
        let mut row = Vec::with_capacity(per_row);
        for b in buttons {
            row.push(b);
            if row.len() == per_row {
                rows.push(std::mem::take(&mut row));
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
        Self { rows }
    }

    pub fn push_row(mut self, row: Vec<InlineButton>) -> Self {
        self.rows.push(row);
        self
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub supports_edit: bool,
    pub supports_inline_keyboards: bool,
    pub max_message_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buttons(n: usize) -> Vec<InlineButton> {
        (0..n)
            .map(|i| InlineButton::new(format!("b{i}"), format!("d{i}")))
            .collect()
    }

    #[test]
    fn grid_fills_rows_and_keeps_remainder() {
        let kb = InlineKeyboard::grid(buttons(10), 4);
        let lens: Vec<usize> = kb.rows.iter().map(|r| r.len()).collect();
        assert_eq!(lens, vec![4, 4, 2]);
        assert_eq!(kb.rows[2][1].callback_data, "d9");
    }

    #[test]
    fn column_puts_one_button_per_row() {
        let kb = InlineKeyboard::column(buttons(3)).push_row(buttons(2));
        let lens: Vec<usize> = kb.rows.iter().map(|r| r.len()).collect();
        assert_eq!(lens, vec![1, 1, 1, 2]);
    }
}
