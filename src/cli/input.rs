use crossterm::event::KeyCode;

/// Minimal single-line editor for form fields.
#[derive(Default, Clone, Debug)]
pub struct LineEdit {
    pub value: String,
    /// Cursor position in chars, not bytes.
    pub cursor: usize,
    pub password: bool,
}

impl LineEdit {
    pub fn masked() -> Self {
        Self {
            password: true,
            ..Self::default()
        }
    }

    pub fn with(s: impl Into<String>) -> Self {
        let mut edit = Self::default();
        edit.set(s);
        edit
    }

    pub fn set(&mut self, s: impl Into<String>) {
        self.value = s.into();
        self.cursor = self.value.chars().count();
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map_or(self.value.len(), |(i, _)| i)
    }

    pub fn push(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }
    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }
    pub fn left(&mut self) {
        if self.cursor > 0 { self.cursor -= 1; }
    }
    pub fn right(&mut self) {
        if self.cursor < self.value.chars().count() { self.cursor += 1; }
    }
    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
    pub fn rendered(&self) -> String {
        if self.password { "*".repeat(self.value.chars().count()) } else { self.value.clone() }
    }
    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }

    /// Applies an editing key; returns false if the key is not an edit.
    pub fn handle(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => self.push(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.left(),
            KeyCode::Right => self.right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.chars().count(),
            _ => return false,
        }
        true
    }
}
