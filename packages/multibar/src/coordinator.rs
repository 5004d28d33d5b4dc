use std::io::{self, Stderr, Write};
use std::time::Duration;

use progress_bar::BarState;
use tracing::{debug, warn};
use worker_pool::{Message, MessageHandler, Offset, WorkerPool};

use crate::canvas::Canvas;
use crate::error::MultiBarError;
use crate::router::{self, Directive};

/// One progress line per worker, kept in sync on a [`Canvas`].
pub struct MultiBar<B, W: Write = Stderr> {
    bars: Vec<B>,
    canvas: Canvas<W>,
}

impl<B: BarState> MultiBar<B> {
    /// `count` bars drawn on stderr, built by `make` for each offset.
    pub fn new(count: usize, make: impl FnMut(Offset) -> B) -> Self {
        let bars = (0..count).map(Offset).map(make).collect();
        Self::with_canvas(bars, Canvas::stderr())
    }
}

impl<B: BarState, W: Write> MultiBar<B, W> {
    pub fn with_canvas(bars: Vec<B>, canvas: Canvas<W>) -> Self {
        Self { bars, canvas }
    }

    pub fn bars(&self) -> &[B] {
        &self.bars
    }

    pub fn canvas(&self) -> &Canvas<W> {
        &self.canvas
    }

    /// Run `pool` to completion with every bar on screen.
    ///
    /// The final redraw and cursor restore happen whether or not the pool
    /// succeeds; a pool error takes precedence over a terminal error.
    pub async fn execute<D, R>(
        &mut self,
        pool: &mut WorkerPool<D, R>,
    ) -> Result<Vec<R>, MultiBarError>
    where
        D: Send + 'static,
        R: Send + 'static,
    {
        let started = self.execute_run();
        let outcome = match started {
            Ok(()) => pool.run(&mut *self).await.map_err(MultiBarError::from),
            Err(e) => Err(e.into()),
        };
        let finished = self.finalize(&pool.durations());

        let results = outcome?;
        finished?;
        Ok(results)
    }

    /// Hide the cursor and draw every bar in its initial state.
    pub fn execute_run(&mut self) -> io::Result<()> {
        debug!("drawing {} progress lines", self.bars.len());
        self.canvas.open_block(self.bars.len());
        self.canvas.hide_cursor()?;
        self.canvas.print_lines(&self.bars, false)
    }

    /// Stamp durations, draw the final block even without a terminal and
    /// show the cursor again.
    pub fn finalize(&mut self, durations: &[Option<Duration>]) -> io::Result<()> {
        debug!("drawing final progress lines");
        for (bar, duration) in self.bars.iter_mut().zip(durations) {
            bar.set_duration(*duration);
        }
        let drawn = self
            .canvas
            .print_lines(&self.bars, true)
            .and_then(|()| self.canvas.close_block());
        let shown = self.canvas.show_cursor();
        drawn.and(shown)
    }

    fn dispatch(&mut self, offset: Offset, text: &str) -> io::Result<()> {
        let Some(bar) = self.bars.get_mut(offset.index()) else {
            warn!(
                "dropping message for unknown {} (have {} bars): {}",
                offset,
                self.bars.len(),
                text
            );
            return Ok(());
        };

        match Directive::parse(text) {
            Directive::Reset => {
                debug!("resetting progress bar at {}", offset);
                bar.reset();
            }
            Directive::ResetComplete => {
                debug!("{} marked every progress bar complete", offset);
                for bar in &mut self.bars {
                    bar.set_complete(true);
                }
            }
            Directive::Content(line) => {
                if bar.match_line(line) {
                    self.canvas.print_line(&self.bars, offset, false)?;
                }
            }
        }
        Ok(())
    }
}

impl<B: BarState, W: Write> MessageHandler for MultiBar<B, W> {
    fn get_message(&mut self, message: Message) -> Message {
        router::route(message)
    }

    fn process_message(&mut self, message: Message) {
        let Some(offset) = message.offset else {
            warn!(
                "unable to write {:?} to terminal because offset is unknown",
                message.text
            );
            return;
        };
        if let Err(e) = self.dispatch(offset, &message.text) {
            warn!("failed to redraw line {}: {}", offset, e);
        }
    }

    fn complete_process(&mut self, offset: Offset) {
        let Some(bar) = self.bars.get_mut(offset.index()) else {
            warn!("completion for unknown {}", offset);
            return;
        };
        bar.set_complete(true);
        if let Err(e) = self.canvas.print_line(&self.bars, offset, false) {
            warn!("failed to redraw line {}: {}", offset, e);
        }
    }
}
