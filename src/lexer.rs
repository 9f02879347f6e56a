//! Splitting of a raw console line into command tokens.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Runs the machine over the whole input.
    ///
    /// A token is either a maximal run of non-whitespace characters or the text
    /// between a matching pair of double quotes. Quote characters never survive
    /// into a token; a quote without a partner is dropped and the run around it
    /// is read as an ordinary word.
    fn make_tokens(&mut self) -> Vec<String> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingQuote => self.handle_quote(ch, &mut out),
            }
        }

        if self.state != LexingState::Start {
            out.push(std::mem::take(&mut self.buffer));
        }

        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn has_closing_quote(&self) -> bool {
        self.input[self.pos..].contains(&'"')
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            c if c.is_whitespace() => {}
            '"' if self.has_closing_quote() => self.state = LexingState::ReadingQuote,
            '"' => self.state = LexingState::ReadingWord,
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            c if c.is_whitespace() => {
                out.push(std::mem::take(&mut self.buffer));
                self.state = LexingState::Start;
            }
            '"' => {}
            c => self.buffer.push(c),
        }
    }

    fn handle_quote(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            '"' => {
                out.push(std::mem::take(&mut self.buffer));
                self.state = LexingState::Start;
            }
            c => self.buffer.push(c),
        }
    }
}

/// Tokenizes a console line.
///
/// Pure: the result depends on `line` alone. Empty or all-blank input yields
/// no tokens.
pub fn split_into_tokens(line: &str) -> Vec<String> {
    LexingFSM::new(line).make_tokens()
}
