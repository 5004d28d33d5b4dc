//! Line-addressed drawing of a fixed block of progress lines.
//!
//! The canvas only ever knows one thing about the physical cursor: the row of
//! the block it last wrote. Every redraw moves from that row to the target,
//! erases the row and writes one full line, so updates for different lines
//! can arrive in any order without one line bleeding into another.

use std::io::{self, IsTerminal, Stderr, Write};

use progress_bar::BarState;
use tracing::warn;
use worker_pool::Offset;

pub const CURSOR_HIDE: &[u8] = b"\x1b[?25l";
pub const CURSOR_SHOW: &[u8] = b"\x1b[?25h";
pub const CLEAR_EOL: &[u8] = b"\x1b[K";

/// Vertical movement from the last written row to a target row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Movement {
    None,
    Up(usize),
    Down(usize),
}

impl Movement {
    pub fn between(current: usize, target: usize) -> Self {
        match target.cmp(&current) {
            std::cmp::Ordering::Less => Movement::Up(current - target),
            std::cmp::Ordering::Greater => Movement::Down(target - current),
            std::cmp::Ordering::Equal => Movement::None,
        }
    }

    /// Signed row delta, positive downwards.
    pub fn delta(self) -> isize {
        match self {
            Movement::None => 0,
            Movement::Up(rows) => -(rows as isize),
            Movement::Down(rows) => rows as isize,
        }
    }

    /// Emit the movement, landing in the first column of the target row.
    ///
    /// Moving down uses line feeds rather than a cursor-down sequence so the
    /// rows of a block that has not been drawn yet get created.
    pub fn encode(self, out: &mut Vec<u8>) {
        out.push(b'\r');
        match self {
            Movement::None => {}
            Movement::Up(rows) => out.extend_from_slice(format!("\x1b[{rows}A").as_bytes()),
            Movement::Down(rows) => out.extend(std::iter::repeat_n(b'\n', rows)),
        }
    }
}

/// Owner of the output stream and of the cursor row within the block.
pub struct Canvas<W: Write> {
    out: W,
    interactive: bool,
    current: usize,
    drawn: Vec<bool>,
    cursor_hidden: bool,
}

impl Canvas<Stderr> {
    /// Canvas over stderr, drawing only when stderr is a terminal.
    pub fn stderr() -> Self {
        let err = io::stderr();
        let interactive = err.is_terminal();
        Self::new(err, interactive)
    }
}

impl<W: Write> Canvas<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            interactive,
            current: 0,
            drawn: Vec::new(),
            cursor_hidden: false,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Row of the block the cursor sits on: the row written last, or one
    /// past the last row once the block is closed.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Whether the line at `offset` has been physically written in this block.
    pub fn is_drawn(&self, offset: Offset) -> bool {
        self.drawn.get(offset.index()).copied().unwrap_or(false)
    }

    pub fn is_cursor_hidden(&self) -> bool {
        self.cursor_hidden
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Start a new block at the cursor's current row.
    pub fn open_block(&mut self, lines: usize) {
        self.current = 0;
        self.drawn = vec![false; lines];
    }

    /// Redraw the line at `offset`. Returns whether anything was written.
    ///
    /// Without a terminal nothing is written unless `force` is set, and the
    /// cursor row is left as it was.
    pub fn print_line<B: BarState>(
        &mut self,
        bars: &[B],
        offset: Offset,
        force: bool,
    ) -> io::Result<bool> {
        let Some(bar) = bars.get(offset.index()) else {
            warn!("no line at {} in a block of {}", offset, bars.len());
            return Ok(false);
        };
        if !self.interactive && !force {
            return Ok(false);
        }

        let text = bar.render();
        let mut buf = Vec::with_capacity(text.len() + 16);
        Movement::between(self.current, offset.index()).encode(&mut buf);
        buf.extend_from_slice(CLEAR_EOL);
        buf.extend_from_slice(text.as_bytes());
        self.out.write_all(&buf)?;
        self.out.flush()?;

        self.current = offset.index();
        if self.drawn.len() < bars.len() {
            self.drawn.resize(bars.len(), false);
        }
        self.drawn[offset.index()] = true;
        Ok(true)
    }

    /// Redraw every line, top to bottom.
    pub fn print_lines<B: BarState>(&mut self, bars: &[B], force: bool) -> io::Result<()> {
        for index in 0..bars.len() {
            self.print_line(bars, Offset(index), force)?;
        }
        Ok(())
    }

    /// Leave the cursor on the row below the block, if any of it was drawn.
    pub fn close_block(&mut self) -> io::Result<()> {
        let below = self.drawn.len();
        if self.current >= below || !self.drawn.iter().any(|drawn| *drawn) {
            return Ok(());
        }
        let mut buf = Vec::new();
        Movement::between(self.current, below).encode(&mut buf);
        self.out.write_all(&buf)?;
        self.out.flush()?;
        self.current = below;
        Ok(())
    }

    pub fn hide_cursor(&mut self) -> io::Result<()> {
        if !self.interactive || self.cursor_hidden {
            return Ok(());
        }
        self.out.write_all(CURSOR_HIDE)?;
        self.out.flush()?;
        self.cursor_hidden = true;
        Ok(())
    }

    pub fn show_cursor(&mut self) -> io::Result<()> {
        if !self.cursor_hidden {
            return Ok(());
        }
        self.out.write_all(CURSOR_SHOW)?;
        self.out.flush()?;
        self.cursor_hidden = false;
        Ok(())
    }
}

impl<W: Write> Drop for Canvas<W> {
    fn drop(&mut self) {
        if self.cursor_hidden {
            let _ = self.out.write_all(CURSOR_SHOW);
            let _ = self.out.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Bar whose rendering is just its label.
    struct Label(String);

    impl BarState for Label {
        fn match_line(&mut self, text: &str) -> bool {
            self.0 = text.to_string();
            true
        }
        fn reset(&mut self) {}
        fn is_complete(&self) -> bool {
            false
        }
        fn set_complete(&mut self, _complete: bool) {}
        fn set_duration(&mut self, _duration: Option<Duration>) {}
        fn render(&self) -> String {
            self.0.clone()
        }
    }

    fn labels(count: usize) -> Vec<Label> {
        (0..count).map(|i| Label(format!("line {i}"))).collect()
    }

    fn output(canvas: &Canvas<Vec<u8>>) -> String {
        String::from_utf8_lossy(canvas.get_ref()).into_owned()
    }

    #[test]
    fn movement_between_rows() {
        assert_eq!(Movement::between(2, 2), Movement::None);
        assert_eq!(Movement::between(3, 1), Movement::Up(2));
        assert_eq!(Movement::between(0, 4), Movement::Down(4));
    }

    #[test]
    fn movement_encoding() {
        let encode = |m: Movement| {
            let mut buf = Vec::new();
            m.encode(&mut buf);
            String::from_utf8(buf).unwrap()
        };
        assert_eq!(encode(Movement::None), "\r");
        assert_eq!(encode(Movement::Up(3)), "\r\x1b[3A");
        assert_eq!(encode(Movement::Down(2)), "\r\n\n");
    }

    #[test]
    fn print_lines_draws_block_top_down() {
        let bars = labels(3);
        let mut canvas = Canvas::new(Vec::new(), true);
        canvas.open_block(bars.len());

        canvas.print_lines(&bars, false).unwrap();

        assert_eq!(
            output(&canvas),
            "\r\x1b[Kline 0\r\n\x1b[Kline 1\r\n\x1b[Kline 2"
        );
        assert_eq!(canvas.current(), 2);
    }

    #[test]
    fn print_line_moves_up_to_earlier_row() {
        let mut bars = labels(3);
        let mut canvas = Canvas::new(Vec::new(), true);
        canvas.open_block(bars.len());
        canvas.print_lines(&bars, false).unwrap();
        let before = output(&canvas).len();

        bars[0].match_line("updated");
        canvas.print_line(&bars, Offset(0), false).unwrap();

        assert_eq!(&output(&canvas)[before..], "\r\x1b[2A\x1b[Kupdated");
        assert_eq!(canvas.current(), 0);
    }

    #[test]
    fn non_interactive_output_is_suppressed_unless_forced() {
        let bars = labels(2);
        let mut canvas = Canvas::new(Vec::new(), false);
        canvas.open_block(bars.len());

        canvas.hide_cursor().unwrap();
        assert!(!canvas.print_line(&bars, Offset(1), false).unwrap());
        canvas.print_lines(&bars, false).unwrap();
        assert!(canvas.get_ref().is_empty());
        assert_eq!(canvas.current(), 0);
        assert!(!canvas.is_drawn(Offset(1)));

        canvas.print_lines(&bars, true).unwrap();
        assert_eq!(output(&canvas), "\r\x1b[Kline 0\r\n\x1b[Kline 1");
    }

    #[test]
    fn unknown_offset_is_ignored() {
        let bars = labels(2);
        let mut canvas = Canvas::new(Vec::new(), true);
        canvas.open_block(bars.len());

        assert!(!canvas.print_line(&bars, Offset(5), true).unwrap());
        assert!(canvas.get_ref().is_empty());
    }

    #[test]
    fn close_block_moves_below_last_row() {
        let bars = labels(3);
        let mut canvas = Canvas::new(Vec::new(), true);
        canvas.open_block(bars.len());
        canvas.print_lines(&bars, false).unwrap();
        canvas.print_line(&bars, Offset(1), false).unwrap();
        let before = output(&canvas).len();

        canvas.close_block().unwrap();

        assert_eq!(&output(&canvas)[before..], "\r\n\n");
        assert_eq!(canvas.current(), 3);
    }

    #[test]
    fn redraw_after_close_lands_on_its_row() {
        let mut bars = labels(3);
        let mut canvas = Canvas::new(Vec::new(), true);
        canvas.open_block(bars.len());
        canvas.print_lines(&bars, false).unwrap();
        canvas.close_block().unwrap();
        let before = output(&canvas).len();

        bars[2].match_line("late");
        canvas.print_line(&bars, Offset(2), false).unwrap();

        assert_eq!(&output(&canvas)[before..], "\r\x1b[1A\x1b[Klate");
        assert_eq!(canvas.current(), 2);
    }

    #[test]
    fn closing_twice_moves_once() {
        let bars = labels(2);
        let mut canvas = Canvas::new(Vec::new(), true);
        canvas.open_block(bars.len());
        canvas.print_lines(&bars, false).unwrap();
        canvas.close_block().unwrap();
        let before = output(&canvas).len();

        canvas.close_block().unwrap();
        assert_eq!(output(&canvas).len(), before);
    }

    #[test]
    fn close_block_without_drawing_writes_nothing() {
        let mut canvas = Canvas::new(Vec::new(), false);
        canvas.open_block(2);
        canvas.close_block().unwrap();
        assert!(canvas.get_ref().is_empty());
    }

    #[test]
    fn cursor_bracket_only_on_terminal() {
        let mut canvas = Canvas::new(Vec::new(), true);
        canvas.hide_cursor().unwrap();
        canvas.hide_cursor().unwrap();
        assert!(canvas.is_cursor_hidden());
        canvas.show_cursor().unwrap();
        canvas.show_cursor().unwrap();
        assert_eq!(output(&canvas), "\x1b[?25l\x1b[?25h");

        let mut quiet = Canvas::new(Vec::new(), false);
        quiet.hide_cursor().unwrap();
        quiet.show_cursor().unwrap();
        assert!(quiet.get_ref().is_empty());
    }

    #[test]
    fn dropping_canvas_restores_cursor() {
        struct Shared(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.borrow_mut().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sink = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        {
            let mut canvas = Canvas::new(Shared(sink.clone()), true);
            canvas.hide_cursor().unwrap();
        }
        assert!(sink.borrow().ends_with(CURSOR_SHOW));
    }
}
